//! Macro expander (spec.md §6): the one string the engine ever asks the
//! macro layer to expand, `%{?_dependency_whiteout}`, feeding the
//! cycle-ignore whitelist of spec.md §4.6.

use std::collections::HashMap;
use std::fmt;

/// `expand("%{?_dependency_whiteout}") -> string` (spec.md §6). Real macro
/// expansion (conditionals, nested macros, built-ins) is out of scope --
/// non-goal, spec.md §1 lists "macro expansion" as an external collaborator
/// consulted through this one operation.
pub trait MacroExpander: fmt::Debug {
    fn expand(&self, name: &str) -> String;
}

/// A macro table keyed by bare name (without the `%{...}` wrapping), used
/// by tests and the CLI demo binary.
#[derive(Debug, Clone, Default)]
pub struct StaticMacroExpander {
    macros: HashMap<String, String>,
}

impl StaticMacroExpander {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.insert(name.into(), value.into());
        self
    }
}

impl MacroExpander for StaticMacroExpander {
    fn expand(&self, name: &str) -> String {
        let bare = name.trim_start_matches("%{?").trim_start_matches("%{").trim_end_matches('}');
        self.macros.get(bare).cloned().unwrap_or_default()
    }
}
