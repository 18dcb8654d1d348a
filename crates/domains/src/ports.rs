//! # Ports
//!
//! Persistence contracts the engine depends on. Adapters implement these;
//! everything above them stays storage-agnostic. The mutation methods are
//! deliberately fine-grained: each one must map to a single atomic
//! document-level operation in the backing store, never to a
//! read-modify-write of the whole document.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ModerationRecord, StarEntry, Suggestion, SuggestionStatus};

/// Persistence contract for suggestion documents.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn insert(&self, suggestion: &Suggestion) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Suggestion>>;

    /// No ordering is guaranteed; callers must not assume insertion order.
    async fn list(&self, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>>;

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Suggestion>>;

    /// Atomic add-to-set. Returns `true` when the membership changed,
    /// `false` when the principal had already upvoted. `NotFound` when the
    /// suggestion does not exist.
    async fn add_upvote(&self, id: Uuid, user_id: &str) -> Result<bool>;

    /// Atomic per-principal upsert: inserts the entry or replaces the
    /// existing one for the same `user_id`. Concurrent upserts for
    /// different principals must both survive; concurrent upserts for the
    /// same principal leave exactly one entry (last write wins).
    async fn upsert_star(&self, id: Uuid, entry: &StarEntry) -> Result<()>;

    async fn set_status(&self, id: Uuid, status: SuggestionStatus) -> Result<()>;
}

/// Append-only store of moderation decisions. There is no update or delete
/// on purpose: the trail is the compliance record.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: &ModerationRecord) -> Result<()>;

    async fn list_by(&self, suggestion_id: Uuid) -> Result<Vec<ModerationRecord>>;
}
