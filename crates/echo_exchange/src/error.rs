//! # Exchange Error Types
//!
//! Errors for the exceptional paths only: broken configuration, broken
//! catalog data and storage failures. Expected player-facing outcomes
//! (not enough Echoes, full inventory, undiscovered item) are reported
//! through [`crate::transaction::Notice`] instead.

use thiserror::Error;

/// Errors that can occur in the exchange engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EchoError {
    /// A recipe with this id is already registered.
    #[error("recipe already registered: {0}")]
    DuplicateRecipe(String),

    /// Recipe is structurally unusable.
    #[error("invalid recipe {id}: {reason}")]
    InvalidRecipe {
        /// The offending recipe.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A location key string could not be parsed.
    #[error("invalid location key: {0}")]
    InvalidLocationKey(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading or writing a backing document failed.
    #[error("storage failure at {path}: {reason}")]
    Storage {
        /// File involved.
        path: String,
        /// Underlying cause.
        reason: String,
    },

    /// Encoding or decoding a document failed.
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl EchoError {
    pub(crate) fn storage(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type for exchange operations.
pub type EchoResult<T> = Result<T, EchoError>;
