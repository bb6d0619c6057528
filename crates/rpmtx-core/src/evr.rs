//! Version predicate: the `(epoch, version, release)` triple and the RPM
//! string-compare rule used to order it.
//!
//! The compare function is kept separate from the type that owns the
//! fields, splitting "parse the string" from "compare two parsed values".

use std::cmp::Ordering;
use std::fmt;

/// A package revision: epoch, version, and optional release.
///
/// `epoch` is `None` when the package carries no explicit epoch tag, which
/// RPM treats as a default of `0` for display but compares specially in a
/// couple of legacy contexts (see [`crate::flags`] and the Obsoletes rule in
/// `add_package`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Evr {
    /// Explicit epoch, if the header carried one.
    pub epoch: Option<u32>,
    /// Upstream version string.
    pub version: String,
    /// Packaging release string, absent for a bare version-only predicate.
    pub release: Option<String>,
}

impl Evr {
    /// Build an EVR with no release (used for `this_dep`-style predicates
    /// built from just name+version).
    #[must_use]
    pub fn new(epoch: Option<u32>, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Compare two EVRs field by field: epoch numerically, then version and
    /// release using the RPM string-compare rule (tildes sort before
    /// nothing, carets after).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        let e1 = self.epoch.unwrap_or(0);
        let e2 = other.epoch.unwrap_or(0);
        if e1 != e2 {
            return e1.cmp(&e2);
        }
        let vc = rpm_vercmp(&self.version, &other.version);
        if vc != Ordering::Equal {
            return vc;
        }
        match (&self.release, &other.release) {
            (Some(r1), Some(r2)) => rpm_vercmp(r1, r2),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(e) = self.epoch {
            write!(f, "{e}:")?;
        }
        write!(f, "{}", self.version)?;
        if let Some(r) = &self.release {
            write!(f, "-{r}")?;
        }
        Ok(())
    }
}

fn is_boundary(c: u8) -> bool {
    !(c.is_ascii_alphanumeric() || c == b'~' || c == b'^')
}

/// RPM's `rpmvercmp`: compare two version (or release) strings by splitting
/// them into alternating numeric/alphabetic runs, with `~` sorting before
/// anything (including the empty string) and `^` sorting after.
#[must_use]
pub fn rpm_vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    loop {
        while i < a.len() && is_boundary(a[i]) {
            i += 1;
        }
        while j < b.len() && is_boundary(b[j]) {
            j += 1;
        }

        let one = i < a.len();
        let two = j < b.len();

        if (one && a[i] == b'~') || (two && b[j] == b'~') {
            let a_tilde = one && a[i] == b'~';
            let b_tilde = two && b[j] == b'~';
            if !a_tilde {
                return Ordering::Greater;
            }
            if !b_tilde {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if (one && a[i] == b'^') || (two && b[j] == b'^') {
            if !one {
                return Ordering::Less;
            }
            if !two {
                return Ordering::Greater;
            }
            let a_caret = a[i] == b'^';
            let b_caret = b[j] == b'^';
            if !a_caret {
                return Ordering::Greater;
            }
            if !b_caret {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if !one || !two {
            break;
        }

        let is_num = a[i].is_ascii_digit();
        let (a_start, b_start) = (i, j);
        if is_num {
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < a.len() && a[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        if j == b_start {
            // b has no segment of this type here: numeric beats alpha, and
            // a non-empty segment always beats an absent one of the other kind.
            return if is_num { Ordering::Greater } else { Ordering::Less };
        }

        if is_num {
            let a_seg = trim_leading_zeros(&a[a_start..i]);
            let b_seg = trim_leading_zeros(&b[b_start..j]);
            if a_seg.len() != b_seg.len() {
                return a_seg.len().cmp(&b_seg.len());
            }
            let cmp = a_seg.cmp(b_seg);
            if cmp != Ordering::Equal {
                return cmp;
            }
        } else {
            let cmp = a[a_start..i].cmp(&b[b_start..j]);
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
    }

    match (i < a.len(), j < b.len()) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => unreachable!("loop only exits early when one side is exhausted"),
    }
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let mut k = 0;
    while k + 1 < s.len() && s[k] == b'0' {
        k += 1;
    }
    &s[k..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        rpm_vercmp(a, b)
    }

    #[test]
    fn equal_strings() {
        assert_eq!(cmp("1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn numeric_runs_compare_numerically() {
        assert_eq!(cmp("1.2", "1.10"), Ordering::Less);
        assert_eq!(cmp("1.0010", "1.9"), Ordering::Greater);
        assert_eq!(cmp("1.05", "1.5"), Ordering::Equal);
    }

    #[test]
    fn alpha_runs_compare_lexicographically() {
        assert_eq!(cmp("1.0a", "1.0b"), Ordering::Less);
    }

    #[test]
    fn numeric_beats_alpha_segment() {
        assert_eq!(cmp("1.0", "1.0a"), Ordering::Greater);
    }

    #[test]
    fn tilde_sorts_before_everything() {
        assert_eq!(cmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(cmp("1.0~rc1", "1.0~rc2"), Ordering::Less);
        assert_eq!(cmp("1.0~~", "1.0~"), Ordering::Less);
    }

    #[test]
    fn caret_sorts_after_everything() {
        assert_eq!(cmp("1.0^", "1.0"), Ordering::Greater);
        assert_eq!(cmp("1.0^git1", "1.0^git2"), Ordering::Less);
    }

    #[test]
    fn trailing_extra_segment_wins() {
        assert_eq!(cmp("1.0.1", "1.0"), Ordering::Greater);
    }

    #[test]
    fn evr_compares_epoch_first() {
        let a = Evr::new(Some(1), "1.0", Some("1".into()));
        let b = Evr::new(Some(0), "99.0", Some("1".into()));
        assert_eq!(a.compare(&b), Ordering::Greater);
    }

    #[test]
    fn evr_missing_release_skips_release_compare() {
        let a = Evr::new(None, "1.0", None);
        let b = Evr::new(None, "1.0", Some("5".into()));
        assert_eq!(a.compare(&b), Ordering::Equal);
    }

    use rstest::rstest;

    #[rstest]
    #[case("1.0", "1.1", Ordering::Less)]
    #[case("1.1", "1.0", Ordering::Greater)]
    #[case("2.0", "2.0", Ordering::Equal)]
    #[case("5.5p1", "5.5p2", Ordering::Less)]
    #[case("5.5p10", "5.5p1", Ordering::Greater)]
    #[case("10", "9", Ordering::Greater)]
    #[case("xyz10", "xyz10.1", Ordering::Less)]
    #[case("xyz.4", "xyz.2", Ordering::Greater)]
    #[case("1.0", "1.0a", Ordering::Greater)]
    #[case("1.0a", "1.0b", Ordering::Less)]
    fn rpm_vercmp_matches_expected_ordering(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(rpm_vercmp(a, b), expected);
    }
}
