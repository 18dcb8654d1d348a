//! # storage-adapters
//!
//! Implementations of the `domains` persistence ports.
//!
//! `memory` is always compiled: a DashMap-backed store used by tests, the
//! seed tool, and the default development configuration. The postgres
//! adapter is feature-gated the same way the rest of the workspace gates
//! optional backends.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::{MemoryAuditLog, MemorySuggestionStore};

#[cfg(feature = "db-postgres")]
pub use postgres::{PostgresAuditLog, PostgresSuggestionStore};
