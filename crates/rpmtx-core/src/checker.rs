//! The dependency checker (spec.md §4.4): `check`, `check_package_deps`,
//! `unsatisfied`, and the dependent-package re-derivation used by
//! `check_dependent_packages`/`check_dependent_conflicts` (restored from
//! `checkPackageSet` per SPEC_FULL.md §4.4).

use crate::database::DbQueryTag;
use crate::depset::{DepRole, Dependency, DependencySet};
use crate::error::Result;
use crate::flags::Flags;
use crate::problem;
use crate::rpmlib;
use crate::transaction::Transaction;

impl Transaction {
    /// `check(ts)` (spec.md §4.4 entry point). Resets the problem set,
    /// (re)builds both added-package indices, then walks ADD elements
    /// (deps, then dependent-conflict sweep per provide) and REMOVE
    /// elements (dependent-package sweep per provide and per owned file).
    /// The first dependent hit aborts the whole scan early, matching the
    /// original's `goto exit` on any non-zero inner result; the problems
    /// already recorded remain the diagnostic.
    pub fn check(&mut self) -> Result<()> {
        self.probs.reset();
        self.added_packages.make_index();
        self.available_packages.make_index();

        let add_indices: Vec<usize> = (0..self.order.len()).filter(|&i| self.order[i].is_add()).collect();
        for idx in add_indices {
            let nevr = self.order[idx].nevr.clone();
            let requires = self.order[idx].requires.clone();
            let conflicts = self.order[idx].conflicts.clone();
            let multilib = self.order[idx].multilib_mask;
            self.check_package_deps(&nevr, &requires, &conflicts, None, multilib)?;

            let provide_names: Vec<String> = self.order[idx]
                .provides
                .iter()
                .map(|(_, dep)| dep.name.clone())
                .collect();
            for name in provide_names {
                if self.check_dependent_conflicts(&name)? {
                    return Ok(());
                }
            }
        }

        let remove_indices: Vec<usize> = (0..self.order.len()).filter(|&i| self.order[i].is_remove()).collect();
        for idx in remove_indices {
            let mut names: Vec<String> = self.order[idx].provides.iter().map(|(_, dep)| dep.name.clone()).collect();
            names.extend(self.order[idx].header.files.iter().cloned());
            for name in names {
                if self.check_dependent_packages(&name)? {
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// `check_package_deps(ts, NEVR, requires, conflicts, filter, multilib)`
    /// (spec.md §4.4). `filter`, when set, restricts the scan to the one
    /// named dependency -- used by `check_dependent_*` to re-derive a
    /// single installed package's problem report for just the name in
    /// question.
    pub fn check_package_deps(
        &mut self,
        nevr: &str,
        requires: &DependencySet,
        conflicts: &DependencySet,
        filter: Option<&str>,
        multilib: u32,
    ) -> Result<()> {
        for (_, dep) in requires.iter() {
            if let Some(f) = filter {
                if dep.name != f {
                    continue;
                }
            }
            if multilib != 0 && !dep.flags.intersects(Flags::MULTILIB) {
                continue;
            }
            let satisfied = self.unsatisfied(dep, DepRole::Requires)?;
            if !satisfied {
                let suggestions = self.available_packages.all_satisfies(dep);
                self.probs
                    .push(problem::missing(dep, dep.dnevr(DepRole::Requires), nevr, suggestions));
            }
        }

        for (_, dep) in conflicts.iter() {
            if let Some(f) = filter {
                if dep.name != f {
                    continue;
                }
            }
            // unsatisfied() returning true here means a provider of the
            // conflicting name/version exists -- i.e. the conflict holds.
            let conflict_present = self.unsatisfied(dep, DepRole::Conflicts)?;
            if conflict_present {
                self.probs.push(problem::conflict(dep.dnevr(DepRole::Conflicts), nevr));
            }
        }

        Ok(())
    }

    /// `unsatisfied(dep)` (spec.md §4.4): cache, `rpmlib()`, added-package
    /// index, installed-DB files, installed-DB provides, advisory solver,
    /// cache write-through, in that order.
    pub fn unsatisfied(&mut self, dep: &Dependency, role: DepRole) -> Result<bool> {
        let dnevr = dep.dnevr(role);

        if self.cache.enabled() {
            if let Some(cached) = self.cache.get(&dnevr) {
                tracing::trace!(%dnevr, cached = true, "dependency cache hit");
                return Ok(cached);
            }
        }

        if dep.is_rpmlib() {
            let satisfied = rpmlib::provides(&dep.name);
            tracing::trace!(%dnevr, rpmlib = true, satisfied, "rpmlib() capability check");
            self.cache.put(&dnevr, satisfied);
            return Ok(satisfied);
        }

        if self.added_packages.satisfies(dep).is_some() {
            tracing::trace!(%dnevr, source = "added", "dependency satisfied");
            self.cache.put(&dnevr, true);
            return Ok(true);
        }

        if dep.is_file_path() {
            let hits = match &self.db {
                Some(db) => self.removed_offsets.prune(db.query(DbQueryTag::BaseNames, &dep.name)),
                None => Vec::new(),
            };
            if !hits.is_empty() {
                tracing::trace!(%dnevr, source = "db files", "dependency satisfied");
                self.cache.put(&dnevr, true);
                return Ok(true);
            }
        }

        let provide_hits = match &self.db {
            Some(db) => self.removed_offsets.prune(db.query(DbQueryTag::ProvideName, &dep.name)),
            None => Vec::new(),
        };
        for rec in &provide_hits {
            if let Some(p) = rec.header.provides.iter().find(|p| p.name == dep.name) {
                if dep.matches(p.evr.as_ref(), p.flags) {
                    tracing::trace!(%dnevr, source = "db provides", "dependency satisfied");
                    self.cache.put(&dnevr, true);
                    return Ok(true);
                }
            }
        }

        self.consult_solver(dep);

        tracing::debug!(%dnevr, "dependency unsatisfied");
        self.cache.put(&dnevr, false);
        Ok(false)
    }

    /// `checkDependentConflicts`: does adding `name` (one of an ADD
    /// element's provides) break an installed package's own Conflicts?
    pub fn check_dependent_conflicts(&mut self, name: &str) -> Result<bool> {
        self.check_dependent(DbQueryTag::ConflictName, name)
    }

    /// `checkDependentPackages`: does removing `name` (a REMOVE element's
    /// provide or owned file) break an installed package's own Requires?
    pub fn check_dependent_packages(&mut self, name: &str) -> Result<bool> {
        self.check_dependent(DbQueryTag::RequireName, name)
    }

    fn check_dependent(&mut self, tag: DbQueryTag, name: &str) -> Result<bool> {
        let hits = match &self.db {
            Some(db) => self.removed_offsets.prune(db.query(tag, name)),
            None => Vec::new(),
        };
        for rec in hits {
            let requires = DependencySet::new(DepRole::Requires, rec.header.requires.clone());
            let conflicts = DependencySet::new(DepRole::Conflicts, rec.header.conflicts.clone());
            let nevr = rec.header.nevr();
            let before = self.probs.len();
            self.check_package_deps(&nevr, &requires, &conflicts, Some(name), 0)?;
            if self.probs.len() > before {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::evr::Evr;
    use crate::header::Header;
    use crate::problem::ProblemKind;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn evr(v: &str) -> Evr {
        Evr::new(None, v, None)
    }

    #[test]
    fn missing_requirement_is_recorded() {
        let mut ts = Transaction::new(None);
        let h = Rc::new(
            Header::new("app", evr("1.0")).with_requires(vec![Dependency::unversioned("libfoo")]),
        );
        ts.add_package(h, None, false, vec![]).unwrap();
        ts.check().unwrap();
        assert_eq!(ts.probs.len(), 1);
        assert_eq!(ts.probs.iter().next().unwrap().kind, ProblemKind::Missing);
    }

    #[test]
    fn requirement_satisfied_by_another_add_clears_problem() {
        let mut ts = Transaction::new(None);
        let app = Rc::new(
            Header::new("app", evr("1.0")).with_requires(vec![Dependency::unversioned("libfoo")]),
        );
        let lib = Rc::new(Header::new("libfoo", evr("1.0")).with_provides(vec![Dependency::new(
            "libfoo",
            Flags::EQUAL,
            Some(evr("1.0")),
        )]));
        ts.add_package(app, None, false, vec![]).unwrap();
        ts.add_package(lib, None, false, vec![]).unwrap();
        ts.check().unwrap();
        assert!(ts.probs.is_empty());
    }

    #[test]
    fn file_path_requirement_satisfied_by_provided_file() {
        let mut ts = Transaction::new(None);
        let p = Rc::new(Header::new("p", evr("1.0")).with_files(vec!["/usr/bin/foo".into()]));
        let q = Rc::new(
            Header::new("q", evr("1.0"))
                .with_requires(vec![Dependency::unversioned("/usr/bin/foo")]),
        );
        ts.add_package(p, None, false, vec![]).unwrap();
        ts.add_package(q, None, false, vec![]).unwrap();
        ts.check().unwrap();
        assert!(ts.probs.is_empty());
    }

    #[test]
    fn conflict_with_installed_package_is_reported() {
        let mut db = MemoryDatabase::new();
        let installed = Rc::new(Header::new("old", evr("1.0")).with_provides(vec![Dependency::new(
            "old",
            Flags::EQUAL,
            Some(evr("1.0")),
        )]));
        db.install(installed);
        let mut ts = Transaction::new(Some(Box::new(db)));

        let app = Rc::new(Header::new("app", evr("1.0")).with_conflicts(vec![Dependency::unversioned("old")]));
        ts.add_package(app, None, false, vec![]).unwrap();
        ts.check().unwrap();
        assert_eq!(ts.probs.len(), 1);
        assert_eq!(ts.probs.iter().next().unwrap().kind, ProblemKind::Conflict);
    }

    #[test]
    fn rpmlib_capability_never_reported_missing() {
        let mut ts = Transaction::new(None);
        let h = Rc::new(Header::new("app", evr("1.0")).with_requires(vec![Dependency::unversioned(
            "rpmlib(CompressedFileNames)",
        )]));
        ts.add_package(h, None, false, vec![]).unwrap();
        ts.check().unwrap();
        assert!(ts.probs.is_empty());
    }

    #[test]
    fn check_is_idempotent() {
        let mut ts = Transaction::new(None);
        let h = Rc::new(
            Header::new("app", evr("1.0")).with_requires(vec![Dependency::unversioned("missing")]),
        );
        ts.add_package(h, None, false, vec![]).unwrap();
        ts.check().unwrap();
        let first: Vec<_> = ts.probs.iter().cloned().collect();
        ts.check().unwrap();
        let second: Vec<_> = ts.probs.iter().cloned().collect();
        assert_eq!(first, second);
    }
}
