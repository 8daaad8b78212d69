//! Common error types for chromegle-stats.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the statistics engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An event category outside the closed enumeration was supplied.
    #[error("unrecognized event category: {0}")]
    InvalidCategory(String),
}
