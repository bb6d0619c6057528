//! Core dependency-checking and topological-ordering engine for an
//! RPM-style package transaction.
//!
//! The crate is split into leaf-first components: [`evr`] and [`flags`]
//! (the version predicate), [`depset`] (dependency sets and the DNEVR
//! canonical form), [`addindex`] (the added-package index), [`element`]
//! (transaction elements and their transient tsort state), [`cache`] (the
//! dependency cache), [`header`] and [`database`] (the external
//! collaborators the checker consults), and [`transaction`] which ties
//! them together behind `check` (in [`checker`]) and `order` (in
//! [`order`]).
//!
//! Everything runs synchronously and single-threaded; there is no async
//! surface and no interior concurrency to reason about.

pub mod addindex;
pub mod cache;
pub mod checker;
pub mod database;
pub mod depset;
pub mod element;
pub mod error;
pub mod evr;
pub mod flags;
pub mod header;
pub mod macros;
pub mod order;
pub mod problem;
pub mod rpmlib;
pub mod solver;
pub mod transaction;
pub mod whiteout;

pub use addindex::{AddedKey, AddedPackageIndex, AiMatch, ExternalKey};
pub use cache::{DependencyCache, DependencyCacheBackend, MemoryCacheBackend};
pub use database::{DbQueryTag, DbRecord, MemoryDatabase, PackageDatabase, RemovedOffsets};
pub use depset::{DepRole, Dependency, DependencySet};
pub use element::{ElementType, Relocation, TransactionElement, TsiEdge, TsiState};
pub use error::{Error, Result};
pub use evr::{rpm_vercmp, Evr};
pub use flags::Flags;
pub use header::{Header, HeaderAccessor, Tag};
pub use macros::{MacroExpander, StaticMacroExpander};
pub use problem::{Problem, ProblemKind, ProblemSet, ProblemSink};
pub use solver::{NullSolver, Solver, SolverOutcome};
pub use transaction::{Transaction, TransactionFlags};
pub use whiteout::Whiteout;
