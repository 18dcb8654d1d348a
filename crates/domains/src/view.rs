//! Read model returned to callers. Computed per request for a specific
//! viewer and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SuggestionStatus;

/// Wire shape of a suggestion as one viewer sees it.
///
/// `upvotes` and `stars` are the derived aggregates (count and arithmetic
/// mean), `starred`/`voted` are viewer-specific, and `department` is a
/// presentation grouping derived from the author's username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub upvotes: usize,
    pub stars: f64,
    pub date: DateTime<Utc>,
    pub tags: Vec<String>,
    pub status: SuggestionStatus,
    /// The viewer's own star value, `0.0` if they have not rated.
    pub starred: f64,
    /// Whether the viewer has engaged at all (upvote or star).
    pub voted: bool,
    pub department: u32,
}
