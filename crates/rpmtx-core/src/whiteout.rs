//! The cycle-ignore whitelist (spec.md §4.6, §9 "Process-wide whitelist").
//!
//! `_dependency_whiteout` is a whitespace-separated list of `P>Q` tokens:
//! when the orderer is about to add edge `p -> q` ("p requires q"), it is
//! suppressed if `(p.N, q.N)` appears here. The original keeps this as
//! process-global state, constructed on first reference and destroyed at
//! the end of a successful `order()`; modeled here as a lazily-initialized
//! container behind an explicit lifecycle so tests can reset it
//! deterministically, per spec.md §9's instruction to encapsulate it that
//! way.

use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::macros::MacroExpander;

/// A parsed `P>Q` whiteout list.
#[derive(Debug, Clone, Default)]
pub struct Whiteout {
    pairs: Vec<(String, String)>,
}

impl Whiteout {
    /// Parse the whitespace-separated `P>Q` token list.
    pub fn parse(tokens: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        for tok in tokens.split_whitespace() {
            let (p, q) = tok
                .split_once('>')
                .ok_or_else(|| Error::InvalidWhiteoutToken(tok.to_string()))?;
            pairs.push((p.to_string(), q.to_string()));
        }
        Ok(Self { pairs })
    }

    #[must_use]
    pub fn contains(&self, p: &str, q: &str) -> bool {
        self.pairs.iter().any(|(a, b)| a == p && b == q)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn cell() -> &'static Mutex<Option<Whiteout>> {
    static CELL: OnceLock<Mutex<Option<Whiteout>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

/// Construct the whitelist on first reference by expanding
/// `%{?_dependency_whiteout}` through `expander`; subsequent calls reuse the
/// already-parsed list until [`teardown`] or [`reset_for_tests`] runs.
pub fn init_on_first_use(expander: &dyn MacroExpander) -> Whiteout {
    let mut guard = cell().lock().expect("whiteout mutex poisoned");
    if guard.is_none() {
        let expanded = expander.expand("%{?_dependency_whiteout}");
        let parsed = Whiteout::parse(&expanded).unwrap_or_default();
        *guard = Some(parsed);
    }
    guard.clone().unwrap_or_default()
}

/// Free the process-wide whitelist at the end of a successful `order()`
/// (spec.md §4.6).
pub fn teardown() {
    let mut guard = cell().lock().expect("whiteout mutex poisoned");
    *guard = None;
}

/// Reset for deterministic tests (spec.md §9).
pub fn reset_for_tests() {
    teardown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::StaticMacroExpander;

    #[test]
    fn parses_pairs_and_suppresses_exact_match() {
        reset_for_tests();
        let expander = StaticMacroExpander::new().with("_dependency_whiteout", "A>B C>D");
        let w = init_on_first_use(&expander);
        assert!(w.contains("A", "B"));
        assert!(!w.contains("B", "A"));
        teardown();
    }

    #[test]
    fn malformed_token_falls_back_to_empty() {
        reset_for_tests();
        let expander = StaticMacroExpander::new().with("_dependency_whiteout", "garbage");
        let w = init_on_first_use(&expander);
        assert!(w.is_empty());
        teardown();
    }
}
