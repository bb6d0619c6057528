//! Dependency cache (DC): a persistent DNEVR -> satisfied/unsatisfied map
//! with write-through semantics and graceful degradation on write failure
//! (spec.md §4.4 step 1/8, §9 "cache write-through with graceful
//! degradation").

use std::collections::HashMap;
use std::fmt;

/// The `DEPENDS` secondary index contract (spec.md §6): get/put keyed by
/// DNEVR string, value is satisfied (`true`) or unsatisfied (`false`).
pub trait DependencyCacheBackend: fmt::Debug {
    fn get(&self, dnevr: &str) -> Option<bool>;
    fn put(&mut self, dnevr: &str, value: bool) -> Result<(), String>;
}

/// A backend that never fails -- the common case in tests and for the CLI
/// demo binary, which has no real secondary index to persist to.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: HashMap<String, bool>,
}

impl DependencyCacheBackend for MemoryCacheBackend {
    fn get(&self, dnevr: &str) -> Option<bool> {
        self.entries.get(dnevr).copied()
    }

    fn put(&mut self, dnevr: &str, value: bool) -> Result<(), String> {
        self.entries.insert(dnevr.to_string(), value);
        Ok(())
    }
}

/// Wraps a [`DependencyCacheBackend`] as an optional capability: the engine
/// models the backend as `Some` until the first write failure flips it
/// permanently to a disabled state (spec.md §4.4 step 8, §9). The gate is
/// a plain `bool` rather than actually dropping the backend, so a caller
/// can still inspect the last-known contents for diagnostics.
#[derive(Debug)]
pub struct DependencyCache {
    backend: Option<Box<dyn DependencyCacheBackend>>,
    enabled: bool,
}

impl DependencyCache {
    #[must_use]
    pub fn new(backend: Option<Box<dyn DependencyCacheBackend>>) -> Self {
        let enabled = backend.is_some();
        Self { backend, enabled }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: None,
            enabled: false,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Cache read (spec.md §4.4 step 1). Returns `None` on a miss or when
    /// caching is disabled.
    #[must_use]
    pub fn get(&self, dnevr: &str) -> Option<bool> {
        if !self.enabled {
            return None;
        }
        self.backend.as_ref().and_then(|b| b.get(dnevr))
    }

    /// Write-through (spec.md §4.4 step 8): on any write failure, disable
    /// caching for the remaining lifetime of the transaction.
    pub fn put(&mut self, dnevr: &str, value: bool) {
        if !self.enabled {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            self.enabled = false;
            return;
        };
        if backend.put(dnevr, value).is_err() {
            tracing::warn!(dnevr, "dependency cache write failed, disabling cache");
            self.enabled = false;
        }
    }
}

impl Default for DependencyCache {
    fn default() -> Self {
        Self::new(Some(Box::new(MemoryCacheBackend::default())))
    }
}
