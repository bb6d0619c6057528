//! Error types for the transaction engine.
//!
//! The engine's error surface is small and closed: allocation-style failures
//! don't exist in safe Rust, so what remains are the index-insertion refusal,
//! database-open failure, and malformed-input cases spec.md §7 calls out.
//! Unsatisfied dependencies and present conflicts are *not* errors here --
//! they are recorded in the [`crate::problem::ProblemSet`] instead.

use thiserror::Error;

/// Errors the engine can return from its public entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The added-package index refused to accept a new entry (spec.md §7,
    /// "index insertion refusal").
    #[error("added-package index rejected key for `{name}`")]
    IndexInsertionRefused {
        /// Name of the package whose index insertion failed.
        name: String,
    },

    /// The installed-package database could not be opened.
    #[error("failed to open package database: {message}")]
    DatabaseOpen {
        /// Underlying reason reported by the database collaborator.
        message: String,
    },

    /// A dependency string could not be parsed into an EVR comparison.
    #[error("invalid version predicate: {0}")]
    InvalidPredicate(String),

    /// The cycle-ignore whitelist's configuration token was malformed.
    #[error("invalid dependency whiteout token: `{0}` (expected `P>Q`)")]
    InvalidWhiteoutToken(String),
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
