//! Sense and script-phase flags carried on a dependency (spec.md §3
//! "Flags").
//!
//! Modeled as a thin newtype over `u32` rather than pulling in the
//! `bitflags` crate: the set is small, closed, and every bit combination
//! needs ad-hoc derived predicates (`is_install_prereq`, ...) that a
//! generated `bitflags` type would still need hand-written anyway.

use std::ops::{BitAnd, BitOr};

/// Sense and script-phase bits attached to a Requires/Provides/Conflicts/
/// Obsoletes entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(pub u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const LESS: Flags = Flags(1 << 1);
    pub const GREATER: Flags = Flags(1 << 2);
    pub const EQUAL: Flags = Flags(1 << 3);
    pub const PREREQ: Flags = Flags(1 << 6);
    pub const SCRIPT_PRE: Flags = Flags(1 << 10);
    pub const SCRIPT_POST: Flags = Flags(1 << 11);
    pub const SCRIPT_PREUN: Flags = Flags(1 << 12);
    pub const SCRIPT_POSTUN: Flags = Flags(1 << 13);
    pub const SCRIPT_VERIFY: Flags = Flags(1 << 14);
    pub const FIND_REQUIRES: Flags = Flags(1 << 25);
    pub const RPMLIB: Flags = Flags(1 << 24);
    pub const MULTILIB: Flags = Flags(1 << 27);

    /// Sense bits only (the ones that matter for EVR-match logic and for
    /// the DS/`DS` equality rule of spec.md §4.2).
    pub const SENSE_MASK: Flags = Flags(Self::LESS.0 | Self::GREATER.0 | Self::EQUAL.0);

    #[must_use]
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[must_use]
    pub const fn intersects(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn sense(self) -> Flags {
        Flags(self.0 & Self::SENSE_MASK.0)
    }

    /// `isInstallPreReq`: needed before a pre/post install script phase.
    #[must_use]
    pub const fn is_install_prereq(self) -> bool {
        self.intersects(Flags(Self::SCRIPT_PRE.0 | Self::SCRIPT_POST.0))
    }

    /// `isErasePreReq`: needed before a pre/post uninstall script phase.
    #[must_use]
    pub const fn is_erase_prereq(self) -> bool {
        self.intersects(Flags(Self::SCRIPT_PREUN.0 | Self::SCRIPT_POSTUN.0))
    }

    /// `isLegacyPreReq`: the older undifferentiated `PREREQ` bit.
    #[must_use]
    pub const fn is_legacy_prereq(self) -> bool {
        self.contains(Self::PREREQ)
    }
}

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitAnd for Flags {
    type Output = Flags;
    fn bitand(self, rhs: Flags) -> Flags {
        Flags(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_prereq_excludes_erase_prereq() {
        let f = Flags::SCRIPT_PREUN;
        assert!(f.is_erase_prereq());
        assert!(!f.is_install_prereq());
    }

    #[test]
    fn legacy_prereq_is_its_own_bit() {
        let f = Flags::PREREQ | Flags::EQUAL;
        assert!(f.is_legacy_prereq());
        assert!(!f.is_install_prereq());
        assert!(!f.is_erase_prereq());
    }

    #[test]
    fn sense_mask_strips_script_bits() {
        let f = Flags::EQUAL | Flags::SCRIPT_PRE;
        assert_eq!(f.sense(), Flags::EQUAL);
    }
}
