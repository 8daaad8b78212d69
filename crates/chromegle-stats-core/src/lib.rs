//! Core types and utilities for chromegle-stats.
//!
//! This crate provides the foundational types used throughout the statistics engine:
//!
//! - **Identifiers**: the one-way [`Pseudonym`] derived from a client address and the
//!   surrogate [`IdentityId`] it maps to
//! - **Categories**: the closed set of telemetry event kinds and per-category totals
//! - **Error types**: Common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use chromegle_stats_core::{Category, Pseudonymizer};
//!
//! let pseudonymizer = Pseudonymizer::new("server-secret");
//! let a = pseudonymizer.pseudonymize("203.0.113.7");
//! let b = pseudonymizer.pseudonymize("203.0.113.7");
//! assert_eq!(a, b);
//!
//! let category: Category = "chatStarted".parse().unwrap();
//! assert_eq!(category, Category::SessionStarted);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod category;
pub mod error;
pub mod ids;

pub use category::{Category, CategoryTotals};
pub use error::{CoreError, Result};
pub use ids::{IdError, IdentityId, Pseudonym, Pseudonymizer};
