//! Added-package index (AI): provide-name (and file-path) -> owning ADD
//! element (spec.md §4.3).
//!
//! Grounded on `libretto-resolver::index`'s inverted-map-plus-lookup shape
//! (there: `DashMap` keyed by package name; here: a single-threaded
//! `HashMap` keyed by provide name, since spec.md §5 makes the whole engine
//! synchronous and single-threaded).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::depset::Dependency;
use crate::evr::Evr;
use crate::header::{Header, HeaderAccessor};

/// Opaque slot identity for an ADD element inside the index. Stands in for
/// the sentinel `NOMATCH` integer of the original: absence is spelled
/// `Option::None` rather than a magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddedKey(pub u32);

/// The caller's own opaque identity for a package, round-tripped through
/// `add_package`/`add_available` and returned on lookups; meaningless to
/// the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalKey(pub u64);

/// A match returned by [`AddedPackageIndex::satisfies`] /
/// [`AddedPackageIndex::all_satisfies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiMatch {
    pub external_key: Option<ExternalKey>,
    pub added_key: AddedKey,
}

#[derive(Debug, Clone)]
struct Slot {
    external_key: Option<ExternalKey>,
    header: Rc<Header>,
}

/// Inverted index from provide name / file path to the set of ADD elements
/// that satisfy it.
#[derive(Debug, Default)]
pub struct AddedPackageIndex {
    next_key: u32,
    slots: HashMap<AddedKey, Slot>,
    by_provide: HashMap<String, Vec<AddedKey>>,
    by_file: HashMap<String, Vec<AddedKey>>,
}

impl AddedPackageIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `AI.add`: insert (or reuse, if `key_hint` is given) a slot for
    /// `header`. Returns the slot key, or `None` on failure (this
    /// in-memory implementation never fails, but the signature preserves
    /// the original's NOMATCH-on-failure contract for callers that roll
    /// back on it).
    pub fn add(
        &mut self,
        key_hint: Option<AddedKey>,
        external_key: Option<ExternalKey>,
        header: Rc<Header>,
    ) -> Option<AddedKey> {
        let key = key_hint.unwrap_or_else(|| self.alloc_key());
        self.slots.insert(key, Slot { external_key, header });
        Some(key)
    }

    /// Remove a slot (duplicate-add replacement, spec.md §4.5 / §9 "slot
    /// reuse on duplicate add").
    pub fn remove(&mut self, key: AddedKey) {
        self.slots.remove(&key);
    }

    fn alloc_key(&mut self) -> AddedKey {
        let key = AddedKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Rebuild the inverted maps from every slot's provides and files.
    /// Must be called (again) after any `add`/`remove` before `satisfies`
    /// or `all_satisfies` are trusted, matching the checker's workflow of
    /// calling `make_index` once up front (spec.md §4.4 step 3).
    pub fn make_index(&mut self) {
        self.by_provide.clear();
        self.by_file.clear();
        for (key, slot) in &self.slots {
            for p in slot.header.provides() {
                self.by_provide.entry(p.name.clone()).or_default().push(*key);
            }
            for f in slot.header.files() {
                self.by_file.entry(f.clone()).or_default().push(*key);
            }
        }
    }

    /// `AI.satisfies`: the single best match for `dep`, preferring a
    /// provide-name match over a file match, and the newest EVR on a tie.
    #[must_use]
    pub fn satisfies(&self, dep: &Dependency) -> Option<AiMatch> {
        if let Some(m) = self.best_provide_match(dep) {
            return Some(m);
        }
        if dep.is_file_path() {
            return self.best_file_match(dep);
        }
        None
    }

    /// `AI.all_satisfies`: every candidate that satisfies `dep`, for
    /// suggester lookups.
    #[must_use]
    pub fn all_satisfies(&self, dep: &Dependency) -> Vec<ExternalKey> {
        let mut out = Vec::new();
        if let Some(keys) = self.by_provide.get(&dep.name) {
            for &key in keys {
                if let Some(slot) = self.slots.get(&key) {
                    if provide_matches(slot, dep) {
                        if let Some(ek) = slot.external_key {
                            out.push(ek);
                        }
                    }
                }
            }
        }
        if dep.is_file_path() {
            if let Some(keys) = self.by_file.get(&dep.name) {
                for &key in keys {
                    if let Some(slot) = self.slots.get(&key) {
                        if let Some(ek) = slot.external_key {
                            if !out.contains(&ek) {
                                out.push(ek);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    #[must_use]
    pub fn lookup_exact(&self, key: AddedKey) -> Option<&Header> {
        self.slots.get(&key).map(|s| s.header.as_ref())
    }

    fn best_provide_match(&self, dep: &Dependency) -> Option<AiMatch> {
        let keys = self.by_provide.get(&dep.name)?;
        let mut best: Option<(AddedKey, Option<Evr>)> = None;
        for &key in keys {
            let slot = self.slots.get(&key)?;
            if !provide_matches(slot, dep) {
                continue;
            }
            let provided_evr = slot.header.provides().iter().find(|p| p.name == dep.name).and_then(|p| p.evr.clone());
            if best.as_ref().is_none_or(|(_, cur)| newer(cur.as_ref(), provided_evr.as_ref())) {
                best = Some((key, provided_evr));
            }
        }
        best.map(|(key, _)| AiMatch {
            external_key: self.slots[&key].external_key,
            added_key: key,
        })
    }

    fn best_file_match(&self, dep: &Dependency) -> Option<AiMatch> {
        let keys = self.by_file.get(&dep.name)?;
        let key = *keys.first()?;
        let slot = self.slots.get(&key)?;
        Some(AiMatch {
            external_key: slot.external_key,
            added_key: key,
        })
    }
}

fn provide_matches(slot: &Slot, dep: &Dependency) -> bool {
    slot.header
        .provides()
        .iter()
        .any(|p| p.name == dep.name && dep.matches(p.evr.as_ref(), p.flags))
}

/// `true` if `b` is a strictly newer EVR than `a` (missing beats nothing,
/// a present EVR beats a missing one).
fn newer(a: Option<&Evr>, b: Option<&Evr>) -> bool {
    match (a, b) {
        (None, None) => false,
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (Some(x), Some(y)) => y.compare(x) == Ordering::Greater,
    }
}
