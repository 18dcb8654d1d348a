//! # api-adapters
//!
//! The HTTP surface of the portal. Everything here is translation:
//! bearer token → `Principal`, request bodies → service calls, domain
//! errors → the `{ message, error }` envelope. No invariants live here.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;

#[cfg(feature = "web-axum")]
pub use handlers::{router, ApiState};
