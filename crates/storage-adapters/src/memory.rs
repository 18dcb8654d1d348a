//! In-memory implementations of the persistence ports.
//!
//! DashMap gives per-entry locking: every mutation below happens under the
//! entry's shard lock, which is exactly the "single-document atomic
//! operation" the ports require. Two concurrent upvotes or star upserts on
//! the same suggestion serialize on that lock instead of racing through a
//! read-modify-write cycle.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use domains::{
    AuditLog, DomainError, ModerationRecord, Result, StarEntry, Suggestion, SuggestionStatus,
    SuggestionStore,
};

#[derive(Default)]
pub struct MemorySuggestionStore {
    documents: DashMap<Uuid, Suggestion>,
}

impl MemorySuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SuggestionStore for MemorySuggestionStore {
    async fn insert(&self, suggestion: &Suggestion) -> Result<()> {
        self.documents.insert(suggestion.id, suggestion.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Suggestion>> {
        Ok(self.documents.get(&id).map(|s| s.value().clone()))
    }

    async fn list(&self, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>> {
        Ok(self
            .documents
            .iter()
            .filter(|s| status.is_none_or(|wanted| s.status == wanted))
            .map(|s| s.value().clone())
            .collect())
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Suggestion>> {
        Ok(self
            .documents
            .iter()
            .filter(|s| s.author_id == author_id)
            .map(|s| s.value().clone())
            .collect())
    }

    async fn add_upvote(&self, id: Uuid, user_id: &str) -> Result<bool> {
        let mut entry = self.documents.get_mut(&id).ok_or(DomainError::NotFound(id))?;
        if entry.has_upvoted(user_id) {
            return Ok(false);
        }
        entry.upvotes.push(user_id.to_string());
        Ok(true)
    }

    async fn upsert_star(&self, id: Uuid, star: &StarEntry) -> Result<()> {
        let mut entry = self.documents.get_mut(&id).ok_or(DomainError::NotFound(id))?;
        match entry.stars.iter_mut().find(|s| s.user_id == star.user_id) {
            Some(existing) => *existing = star.clone(),
            None => entry.stars.push(star.clone()),
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: SuggestionStatus) -> Result<()> {
        let mut entry = self.documents.get_mut(&id).ok_or(DomainError::NotFound(id))?;
        entry.status = status;
        Ok(())
    }
}

/// Append-only in-memory audit log, keyed by suggestion.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: DashMap<Uuid, Vec<ModerationRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, record: &ModerationRecord) -> Result<()> {
        self.records
            .entry(record.suggestion_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn list_by(&self, suggestion_id: Uuid) -> Result<Vec<ModerationRecord>> {
        Ok(self
            .records
            .get(&suggestion_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}
