//! Transaction elements (TE): one ADD or REMOVE node, and the transient
//! tsort state (TSI) attached to it for the duration of `order()`
//! (spec.md §3, §4.7, §9 "TSI as sum-typed per-node state").

use std::rc::Rc;

use crate::addindex::{AddedKey, ExternalKey};
use crate::depset::{DepRole, DependencySet};
use crate::header::Header;

/// ADD (install/upgrade) or REMOVE (erase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Add,
    Remove,
}

/// A relocation request (path remapping); the engine only threads it
/// through, it never interprets relocations itself (out of scope, spec.md
/// §1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub old_path: String,
    pub new_path: String,
}

/// One successor edge in a TSI node's linked list: `q -> p` meaning `q`
/// must precede `p`. `req_index` names the originating requirement (the
/// index into the predecessor's Requires set) so loop traces and
/// `zap_relation` can describe *which* dependency created the edge.
#[derive(Debug, Clone, Copy)]
pub struct TsiEdge {
    pub successor: usize,
    pub req_index: usize,
    pub is_prereq: bool,
}

/// Transient per-element tsort state, allocated on `order()` entry and
/// dropped when ordering completes (spec.md §3 "tsi", §9).
#[derive(Debug, Clone, Default)]
pub struct TsiState {
    /// In-degree: predecessors still pending.
    pub count: u32,
    /// Outgoing edges (`q -> p` for each `p` in this list).
    pub successors: Vec<TsiEdge>,
    /// Secondary sort key: successor count, later overridden by
    /// presentation rank when `chainsaw` is off.
    pub qcnt: i64,
    /// `true` while this node sits in the work queue (reused as the
    /// "queued" flag described in spec.md §4.7).
    pub queued: bool,
}

/// One transaction element: a node in the (ADD-only) dependency graph plus
/// the REMOVE bookkeeping needed for upgrade locality.
#[derive(Debug, Clone)]
pub struct TransactionElement {
    pub kind: ElementType,
    pub header: Rc<Header>,
    pub nevr: String,
    pub name: String,
    /// Caller's own opaque identity.
    pub key: Option<ExternalKey>,
    /// AI slot for an ADD element; `None` for REMOVE.
    pub added_key: Option<AddedKey>,
    /// For an upgrade REMOVE: the AI key of the triggering ADD.
    pub depends_on_key: Option<AddedKey>,
    pub multilib_mask: u32,
    pub relocations: Vec<Relocation>,
    /// Database record id this REMOVE originated from (REMOVE only).
    pub db_offset: Option<u64>,

    pub requires: DependencySet,
    pub provides: DependencySet,
    pub conflicts: DependencySet,
    pub obsoletes: DependencySet,

    pub tsi: Option<TsiState>,

    // tsort output fields (spec.md §3)
    pub depth: u32,
    pub tree: Option<i32>,
    pub degree: u32,
    pub parent: Option<usize>,
    pub npreds: u32,
}

impl TransactionElement {
    #[must_use]
    pub fn new_add(header: Rc<Header>, key: Option<ExternalKey>) -> Self {
        let requires = DependencySet::new(DepRole::Requires, header.requires.clone());
        let provides = DependencySet::new(DepRole::Provides, header.provides.clone());
        let conflicts = DependencySet::new(DepRole::Conflicts, header.conflicts.clone());
        let obsoletes = DependencySet::new(DepRole::Obsoletes, header.obsoletes.clone());
        let nevr = header.nevr();
        let name = header.name.clone();
        let multilib_mask = header.multilib_mask;
        Self {
            kind: ElementType::Add,
            header,
            nevr,
            name,
            key,
            added_key: None,
            depends_on_key: None,
            multilib_mask,
            relocations: Vec::new(),
            db_offset: None,
            requires,
            provides,
            conflicts,
            obsoletes,
            tsi: None,
            depth: 0,
            tree: None,
            degree: 0,
            parent: None,
            npreds: 0,
        }
    }

    #[must_use]
    pub fn new_remove(header: Rc<Header>, db_offset: u64, depends_on_key: Option<AddedKey>) -> Self {
        let requires = DependencySet::new(DepRole::Requires, header.requires.clone());
        let provides = DependencySet::new(DepRole::Provides, header.provides.clone());
        let conflicts = DependencySet::new(DepRole::Conflicts, header.conflicts.clone());
        let obsoletes = DependencySet::new(DepRole::Obsoletes, header.obsoletes.clone());
        let nevr = header.nevr();
        let name = header.name.clone();
        Self {
            kind: ElementType::Remove,
            header,
            nevr,
            name,
            key: None,
            added_key: None,
            depends_on_key,
            multilib_mask: 0,
            relocations: Vec::new(),
            db_offset: Some(db_offset),
            requires,
            provides,
            conflicts,
            obsoletes,
            tsi: None,
            depth: 0,
            tree: None,
            degree: 0,
            parent: None,
            npreds: 0,
        }
    }

    #[must_use]
    pub fn is_add(&self) -> bool {
        self.kind == ElementType::Add
    }

    #[must_use]
    pub fn is_remove(&self) -> bool {
        self.kind == ElementType::Remove
    }
}
