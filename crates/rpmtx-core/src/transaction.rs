//! Transaction set (TS): the struct tying every other component together,
//! plus the add/remove workflow.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::addindex::{AddedKey, AddedPackageIndex, ExternalKey};
use crate::cache::DependencyCache;
use crate::database::{DbQueryTag, PackageDatabase, RemovedOffsets};
use crate::depset::Dependency;
use crate::element::{ElementType, Relocation, TransactionElement};
use crate::error::{Error, Result};
use crate::flags::Flags;
use crate::header::Header;
use crate::macros::{MacroExpander, StaticMacroExpander};
use crate::problem::ProblemSet;
use crate::solver::{NullSolver, Solver};

/// Transaction-wide behavior flags: `chainsaw` disables
/// upgrade-locality/presentation-tie-break in the orderer; `no_suggests`
/// skips the advisory solver callback in `unsatisfied`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFlags {
    pub chainsaw: bool,
    pub no_suggests: bool,
}

/// The transaction set: ADD/REMOVE order, the added-package index, the
/// installed-database view, the dependency cache, the problem set, and the
/// external collaborators.
#[derive(Debug)]
pub struct Transaction {
    pub order: Vec<TransactionElement>,
    pub removed_offsets: RemovedOffsets,
    pub added_packages: AddedPackageIndex,
    pub available_packages: AddedPackageIndex,
    pub db: Option<Box<dyn PackageDatabase>>,
    pub cache: DependencyCache,
    pub probs: ProblemSet,
    pub solver: Option<Box<dyn Solver>>,
    pub macros: Box<dyn MacroExpander>,
    pub flags: TransactionFlags,
}

impl Transaction {
    #[must_use]
    pub fn new(db: Option<Box<dyn PackageDatabase>>) -> Self {
        Self {
            order: Vec::new(),
            removed_offsets: RemovedOffsets::new(),
            added_packages: AddedPackageIndex::new(),
            available_packages: AddedPackageIndex::new(),
            db,
            cache: DependencyCache::default(),
            probs: ProblemSet::new(),
            solver: None,
            macros: Box::new(StaticMacroExpander::new()),
            flags: TransactionFlags::default(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: DependencyCache) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solver = Some(solver);
        self
    }

    #[must_use]
    pub fn with_macros(mut self, macros: Box<dyn MacroExpander>) -> Self {
        self.macros = macros;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: TransactionFlags) -> Self {
        self.flags = flags;
        self
    }

    fn solver_or_null(&mut self) -> &mut dyn Solver {
        if self.solver.is_none() {
            self.solver = Some(Box::new(NullSolver));
        }
        self.solver.as_deref_mut().expect("just set above")
    }

    /// Add a package to the transaction. `upgrade` requests the same-name
    /// installed-DB sweep (removal of an older/equal-version installed
    /// package, multilib mixing, Obsoletes sweep); it is skipped outright
    /// for source packages, matching the original's early return.
    pub fn add_package(
        &mut self,
        header: Rc<Header>,
        external_key: Option<ExternalKey>,
        upgrade: bool,
        relocations: Vec<Relocation>,
    ) -> Result<()> {
        // An ADD element with the same name, whose EVR is <= the new one's,
        // is a duplicate; the prior (older-or-equal) slot is reused and the
        // new header replaces it in place (depends.c:150).
        let mut duplicate: Option<(usize, Option<AddedKey>)> = None;
        for (idx, te) in self.order.iter().enumerate() {
            if te.is_add() && te.name == header.name && te.header.evr.compare(&header.evr) != Ordering::Greater {
                duplicate = Some((idx, te.added_key));
                break;
            }
        }

        let oc = duplicate.map_or(self.order.len(), |(idx, _)| idx);
        let key_hint = duplicate.and_then(|(_, key)| key);

        if duplicate.is_some() {
            tracing::warn!(name = %header.name, nevr = %header.nevr(), "duplicate add, replacing package in the same slot");
        }

        let mut te = TransactionElement::new_add(Rc::clone(&header), external_key);
        te.relocations = relocations;

        let added_key = self
            .added_packages
            .add(key_hint, external_key, Rc::clone(&header))
            .ok_or_else(|| Error::IndexInsertionRefused {
                name: header.name.clone(),
            })?;
        te.added_key = Some(added_key);

        if oc == self.order.len() {
            self.order.push(te);
        } else {
            self.order[oc] = te;
        }

        if !upgrade || header.is_source_package {
            return Ok(());
        }

        let same_name_hits = match &self.db {
            Some(db) => self.removed_offsets.prune(db.query(DbQueryTag::ProvideName, &header.name)),
            None => Vec::new(),
        };

        for rec in same_name_hits {
            if rec.header.evr.compare(&header.evr) != Ordering::Equal {
                self.remove_package(Rc::clone(&rec.header), rec.offset, Some(added_key));
            } else if rec.header.multilib_mask != 0
                && header.multilib_mask != 0
                && (rec.header.multilib_mask & header.multilib_mask) == 0
            {
                // Multilib mixing rule: reassigns the multilib mask already
                // present on the header being added.
                if let Some(te) = self.order.get_mut(oc) {
                    te.multilib_mask = header.multilib_mask;
                }
            }
        }

        for obs in &header.obsoletes {
            if obs.name == header.name {
                // Self-obsoletion guard: a package never obsoletes itself.
                continue;
            }
            let obs_hits = match &self.db {
                Some(db) => self.removed_offsets.prune(db.query(DbQueryTag::ProvideName, &obs.name)),
                None => Vec::new(),
            };
            for rec in obs_hits {
                // An unversioned Obsoletes matches every provider by name alone.
                let matched = match &obs.evr {
                    None => true,
                    Some(_) => obs.matches(Some(&rec.header.evr), Flags::EQUAL),
                };
                if matched {
                    self.remove_package(Rc::clone(&rec.header), rec.offset, Some(added_key));
                }
            }
        }

        Ok(())
    }

    /// `add_available`: register a candidate the suggester domain can offer
    /// up via `all_satisfies`, without it participating in ordering.
    pub fn add_available(&mut self, header: Rc<Header>, external_key: ExternalKey) {
        self.available_packages.add(None, Some(external_key), header);
    }

    /// Remove an installed package. No-op if `db_offset` is already
    /// scheduled for removal.
    pub fn remove_package(&mut self, header: Rc<Header>, db_offset: u64, depends_on_key: Option<AddedKey>) {
        if !self.removed_offsets.insert(db_offset) {
            return;
        }
        let te = TransactionElement::new_remove(header, db_offset, depends_on_key);
        self.order.push(te);
    }

    /// Invoke the solver for an unsatisfied dependency, honoring
    /// `no_suggests`.
    pub(crate) fn consult_solver(&mut self, dep: &Dependency) {
        if self.flags.no_suggests {
            return;
        }
        let outcome = self.solver_or_null().solve(dep);
        tracing::debug!(dep = %dep, ?outcome, "solver consulted (advisory only)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evr::Evr;

    fn evr(v: &str) -> Evr {
        Evr::new(None, v, None)
    }

    /// depends.c:150 (spec.md §4.5): a same-name add whose EVR is `<=` an
    /// existing add's replaces it in the same slot rather than coexisting.
    #[test]
    fn newer_add_replaces_older_duplicate_in_place() {
        let mut ts = Transaction::new(None);
        ts.add_package(Rc::new(Header::new("foo", evr("1"))), None, false, vec![]).unwrap();
        ts.add_package(Rc::new(Header::new("foo", evr("2"))), None, false, vec![]).unwrap();

        let adds: Vec<&TransactionElement> = ts.order.iter().filter(|te| te.is_add()).collect();
        assert_eq!(adds.len(), 1, "duplicate add must replace, not coexist");
        assert_eq!(adds[0].header.evr.compare(&evr("2")), Ordering::Equal);
    }

    /// The same rule applies when the new add's EVR is equal, not just
    /// greater: `<=` covers both.
    #[test]
    fn equal_evr_duplicate_still_replaces_in_place() {
        let mut ts = Transaction::new(None);
        ts.add_package(Rc::new(Header::new("foo", evr("1"))), None, false, vec![]).unwrap();
        ts.add_package(Rc::new(Header::new("foo", evr("1"))), None, false, vec![]).unwrap();

        let adds: Vec<&TransactionElement> = ts.order.iter().filter(|te| te.is_add()).collect();
        assert_eq!(adds.len(), 1);
    }

    /// An older add arriving after a newer one is *not* a replacement
    /// target under this predicate (`existing.evr <= new.evr` fails when
    /// existing is newer) -- it is simply appended as a second ADD, same
    /// as the original's `dsCompare` leaving the newer existing entry alone.
    #[test]
    fn older_add_after_newer_does_not_replace() {
        let mut ts = Transaction::new(None);
        ts.add_package(Rc::new(Header::new("foo", evr("2"))), None, false, vec![]).unwrap();
        ts.add_package(Rc::new(Header::new("foo", evr("1"))), None, false, vec![]).unwrap();

        let adds: Vec<&TransactionElement> = ts.order.iter().filter(|te| te.is_add()).collect();
        assert_eq!(adds.len(), 2);
    }
}
