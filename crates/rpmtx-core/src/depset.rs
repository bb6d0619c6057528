//! Dependency sets (DS): the cursor over a header's Requires/Provides/
//! Conflicts/Obsoletes entries, and the canonical DNEVR string used as the
//! dependency-cache key (spec.md §4.2, §3 "DNEVR canonical form").

use std::fmt;

use crate::evr::Evr;
use crate::flags::Flags;

/// Which role a [`DependencySet`] plays on its owning header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepRole {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
}

impl DepRole {
    /// The role character used in the DNEVR canonical form (spec.md §3):
    /// `P`=Provides, `R`=Requires, `r`=reduced-prereq variant, `C`=Conflicts,
    /// `O`=Obsoletes.
    #[must_use]
    pub fn role_char(self, flags: Flags) -> char {
        match self {
            DepRole::Provides => 'P',
            DepRole::Requires => {
                if flags.is_install_prereq() || flags.is_erase_prereq() {
                    'r'
                } else {
                    'R'
                }
            }
            DepRole::Conflicts => 'C',
            DepRole::Obsoletes => 'O',
        }
    }
}

/// One `(name, EVR, flags)` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: String,
    pub evr: Option<Evr>,
    pub flags: Flags,
}

impl Dependency {
    #[must_use]
    pub fn new(name: impl Into<String>, flags: Flags, evr: Option<Evr>) -> Self {
        Self {
            name: name.into(),
            flags,
            evr,
        }
    }

    /// Unversioned dependency (no sense bits, no EVR) -- the common case for
    /// a bare `Requires: foo` or a file-path provide.
    #[must_use]
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evr: None,
            flags: Flags::NONE,
        }
    }

    /// The canonical DNEVR string for this dependency under `role`: stable
    /// across invocations, used verbatim as the dependency-cache key.
    #[must_use]
    pub fn dnevr(&self, role: DepRole) -> String {
        let role_char = role.role_char(self.flags);
        match (&self.evr, op_str(self.flags)) {
            (Some(evr), Some(op)) => format!("{role_char} {} {op} {evr}", self.name),
            _ => format!("{role_char} {}", self.name),
        }
    }

    /// Is this a `rpmlib(...)`-style internal feature dependency?
    #[must_use]
    pub fn is_rpmlib(&self) -> bool {
        self.name.starts_with("rpmlib(")
    }

    /// Is this a file-path provide/requirement (name starts with `/`)?
    #[must_use]
    pub fn is_file_path(&self) -> bool {
        self.name.starts_with('/')
    }

    /// VP.matches (spec.md §4.1): does `provided` satisfy this dependency?
    ///
    /// Sense bits are intersected first; a missing EVR on either side
    /// matches unconditionally (the legacy-obsoletes exception of spec.md
    /// §9 is implemented by callers passing `evr: None` for that case
    /// rather than here, since it only applies to Obsoletes processing).
    #[must_use]
    pub fn matches(&self, provided_evr: Option<&Evr>, provided_flags: Flags) -> bool {
        let dep_sense = self.flags.sense();
        let prov_sense = provided_flags.sense();

        let effective = if prov_sense.0 != 0 {
            Flags(dep_sense.0 & prov_sense.0)
        } else {
            dep_sense
        };

        if effective.0 == 0 {
            return true;
        }

        match (&self.evr, provided_evr) {
            (None, _) | (_, None) => true,
            (Some(d), Some(p)) => {
                use std::cmp::Ordering;
                match p.compare(d) {
                    Ordering::Less => effective.contains(Flags::LESS),
                    Ordering::Greater => effective.contains(Flags::GREATER),
                    Ordering::Equal => effective.contains(Flags::EQUAL),
                }
            }
        }
    }
}

fn op_str(flags: Flags) -> Option<&'static str> {
    let sense = flags.sense();
    if sense.contains(Flags::LESS) && sense.contains(Flags::EQUAL) {
        Some("<=")
    } else if sense.contains(Flags::GREATER) && sense.contains(Flags::EQUAL) {
        Some(">=")
    } else if sense.contains(Flags::LESS) {
        Some("<")
    } else if sense.contains(Flags::GREATER) {
        Some(">")
    } else if sense.contains(Flags::EQUAL) {
        Some("=")
    } else {
        None
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(op), Some(evr)) = (op_str(self.flags), &self.evr) {
            write!(f, " {op} {evr}")?;
        }
        Ok(())
    }
}

/// A cursor over a header's entries for one role. Two `DependencySet`
/// positions compare equal (for duplicate-add detection, spec.md §4.5) when
/// name, EVR, and sense bits match -- see [`Dependency::eq`] via derived
/// `PartialEq` on the underlying [`Dependency`].
#[derive(Debug, Clone)]
pub struct DependencySet {
    pub role: DepRole,
    entries: Vec<Dependency>,
    current_index: Option<usize>,
}

impl DependencySet {
    #[must_use]
    pub fn new(role: DepRole, entries: Vec<Dependency>) -> Self {
        Self {
            role,
            entries,
            current_index: None,
        }
    }

    #[must_use]
    pub fn empty(role: DepRole) -> Self {
        Self::new(role, Vec::new())
    }

    pub fn init(&mut self) {
        self.current_index = None;
    }

    /// Advance the cursor; returns the new index, or `None` at end.
    pub fn next(&mut self) -> Option<usize> {
        let next = match self.current_index {
            None => 0,
            Some(i) => i + 1,
        };
        if next < self.entries.len() {
            self.current_index = Some(next);
            Some(next)
        } else {
            self.current_index = None;
            None
        }
    }

    pub fn set_index(&mut self, i: usize) {
        self.current_index = Some(i);
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Dependency> {
        self.entries.get(i)
    }

    #[must_use]
    pub fn current(&self) -> Option<&Dependency> {
        self.current_index.and_then(|i| self.entries.get(i))
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Dependency)> {
        self.entries.iter().enumerate()
    }

    #[must_use]
    pub fn get_name(&self) -> Option<&str> {
        self.current().map(|d| d.name.as_str())
    }

    #[must_use]
    pub fn get_evr(&self) -> Option<&Evr> {
        self.current().and_then(|d| d.evr.as_ref())
    }

    #[must_use]
    pub fn get_flags(&self) -> Flags {
        self.current().map_or(Flags::NONE, |d| d.flags)
    }

    #[must_use]
    pub fn get_dnevr(&self) -> Option<String> {
        self.current().map(|d| d.dnevr(self.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dnevr_is_stable_and_role_prefixed() {
        let dep = Dependency::new(
            "libfoo",
            Flags::GREATER | Flags::EQUAL,
            Some(Evr::new(None, "1.2", None)),
        );
        assert_eq!(dep.dnevr(DepRole::Requires), "R libfoo >= 1.2");
        assert_eq!(dep.dnevr(DepRole::Provides), "P libfoo >= 1.2");
    }

    #[test]
    fn dnevr_reduced_prereq_variant() {
        let dep = Dependency::new("libbar", Flags::SCRIPT_PRE | Flags::EQUAL, None);
        assert_eq!(dep.dnevr(DepRole::Requires), "r libbar");
    }

    #[test]
    fn unversioned_matches_anything() {
        let dep = Dependency::unversioned("foo");
        assert!(dep.matches(Some(&Evr::new(None, "9.9", None)), Flags::EQUAL));
        assert!(dep.matches(None, Flags::NONE));
    }

    #[test]
    fn versioned_dep_rejects_lower_provide() {
        let dep = Dependency::new(
            "foo",
            Flags::GREATER | Flags::EQUAL,
            Some(Evr::new(None, "2.0", None)),
        );
        assert!(!dep.matches(Some(&Evr::new(None, "1.0", None)), Flags::EQUAL));
        assert!(dep.matches(Some(&Evr::new(None, "2.0", None)), Flags::EQUAL));
        assert!(dep.matches(Some(&Evr::new(None, "3.0", None)), Flags::EQUAL));
    }

    #[test]
    fn cursor_advances_and_resets() {
        let mut ds = DependencySet::new(
            DepRole::Requires,
            vec![Dependency::unversioned("a"), Dependency::unversioned("b")],
        );
        assert_eq!(ds.next(), Some(0));
        assert_eq!(ds.get_name(), Some("a"));
        assert_eq!(ds.next(), Some(1));
        assert_eq!(ds.get_name(), Some("b"));
        assert_eq!(ds.next(), None);
        ds.init();
        assert_eq!(ds.next(), Some(0));
    }
}
