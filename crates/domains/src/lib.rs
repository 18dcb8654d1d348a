//! # domains
//!
//! The central domain model and port definitions for the campus portal.
//! Everything here is pure data and contracts; adapters live in sibling
//! crates and are wired together by the binary.

pub mod error;
pub mod models;
pub mod ports;
pub mod view;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use ports::*;
pub use view::*;
