//! # services
//!
//! Application logic for the suggestion engine. `engagement` holds the
//! pure state-machine logic over suggestion values; `suggestion`
//! orchestrates it against the persistence ports and enforces
//! authorization policy.

pub mod engagement;
pub mod suggestion;

pub use engagement::{EngagementEngine, RatingBounds};
pub use suggestion::{AccessPolicy, SuggestionService};
