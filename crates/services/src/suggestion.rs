//! # SuggestionService
//!
//! Orchestration over the persistence ports. Authorization policy is
//! enforced here, never inside the engine, so the invariants stay
//! testable independent of who is allowed to trigger them.
//!
//! Write discipline (the concurrency contract): every mutation is a
//! load → validate → single atomic store operation. Upvotes and stars go
//! through the store's add-to-set/upsert primitives; moderation appends
//! the audit record first and only then writes the status, keeping the
//! audit trail a superset of applied decisions.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use domains::{
    AuditLog, DomainError, ModerationAction, ModerationRecord, Principal, Result, Suggestion,
    SuggestionStatus, SuggestionStore, SuggestionView, UserType,
};

use crate::engagement::EngagementEngine;

/// Who may do what. Configuration, not mechanism.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// User types allowed to submit suggestions.
    pub submit_user_types: Vec<UserType>,
    /// Role required for moderation actions and moderation-queue listings.
    pub moderator_role: String,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            submit_user_types: vec![UserType::Student],
            moderator_role: "admin".to_string(),
        }
    }
}

impl AccessPolicy {
    fn may_submit(&self, principal: &Principal) -> bool {
        self.submit_user_types.contains(&principal.user_type)
    }

    fn is_moderator(&self, principal: &Principal) -> bool {
        principal.has_role(&self.moderator_role)
    }
}

pub struct SuggestionService {
    store: Arc<dyn SuggestionStore>,
    audit: Arc<dyn AuditLog>,
    engine: EngagementEngine,
    policy: AccessPolicy,
}

impl SuggestionService {
    pub fn new(
        store: Arc<dyn SuggestionStore>,
        audit: Arc<dyn AuditLog>,
        engine: EngagementEngine,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            store,
            audit,
            engine,
            policy,
        }
    }

    /// Creates a suggestion on behalf of the principal.
    pub async fn submit(
        &self,
        principal: &Principal,
        title: &str,
        content: &str,
    ) -> Result<SuggestionView> {
        if !self.policy.may_submit(principal) {
            return Err(DomainError::Unauthorized(
                "you are not authorized to create a suggestion",
            ));
        }
        let suggestion = self.engine.create(title, content, &principal.id)?;
        self.store.insert(&suggestion).await?;
        info!(suggestion = %suggestion.id, author = %principal.id, "suggestion submitted");
        Ok(self.engine.to_view(&suggestion, &principal.id))
    }

    /// Single suggestion as seen by the principal.
    pub async fn get(&self, principal: &Principal, id: &str) -> Result<SuggestionView> {
        let suggestion = self.load(parse_id(id)?).await?;
        Ok(self.engine.to_view(&suggestion, &principal.id))
    }

    /// Idempotent upvote. Persists only when the membership actually
    /// changes, via the store's atomic add-to-set.
    pub async fn upvote(&self, principal: &Principal, id: &str) -> Result<SuggestionView> {
        let sid = parse_id(id)?;
        let suggestion = self.load(sid).await?;
        if suggestion.has_upvoted(&principal.id) {
            debug!(suggestion = %sid, user = %principal.id, "upvote already present");
            return Ok(self.engine.to_view(&suggestion, &principal.id));
        }
        self.store.add_upvote(sid, &principal.id).await?;
        let next = self.engine.upvote(suggestion, &principal.id);
        Ok(self.engine.to_view(&next, &principal.id))
    }

    /// Rates a suggestion, replacing any previous rating by this principal.
    pub async fn star(
        &self,
        principal: &Principal,
        id: &str,
        value: i32,
    ) -> Result<SuggestionView> {
        let sid = parse_id(id)?;
        let suggestion = self.load(sid).await?;
        let next = self.engine.star(suggestion, &principal.id, value)?;
        if let Some(entry) = next.star_of(&principal.id) {
            self.store.upsert_star(sid, entry).await?;
        }
        Ok(self.engine.to_view(&next, &principal.id))
    }

    /// Applies a moderation action. The audit record is written before the
    /// status change; if the append fails, the suggestion is left untouched.
    pub async fn moderate(
        &self,
        principal: &Principal,
        id: &str,
        action: ModerationAction,
        reason: Option<&str>,
    ) -> Result<SuggestionView> {
        if !self.policy.is_moderator(principal) {
            return Err(DomainError::Unauthorized(
                "you are not authorized to moderate suggestions",
            ));
        }
        let sid = parse_id(id)?;
        let suggestion = self.load(sid).await?;
        let (next, record) = self
            .engine
            .transition(&suggestion, action, &principal.id, reason)?;
        self.audit.append(&record).await?;
        if let Err(err) = self.store.set_status(sid, next.status).await {
            // The audit record already landed; at-least-once is the contract.
            warn!(suggestion = %sid, %action, "status write failed after audit append");
            return Err(err);
        }
        info!(
            suggestion = %sid,
            executor = %principal.id,
            %action,
            status = %next.status,
            "moderation action applied"
        );
        Ok(self.engine.to_view(&next, &principal.id))
    }

    /// Lists suggestions, optionally filtered by status. The moderation
    /// queues (pending, reported) are only visible to moderators.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<SuggestionView>> {
        if matches!(
            status,
            Some(SuggestionStatus::Pending) | Some(SuggestionStatus::Reported)
        ) && !self.policy.is_moderator(principal)
        {
            return Err(DomainError::Unauthorized(
                "you are not authorized to access this listing",
            ));
        }
        let suggestions = self.store.list(status).await?;
        Ok(self.views_for(&suggestions, principal))
    }

    /// The caller's own submissions, regardless of status.
    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<SuggestionView>> {
        let suggestions = self.store.list_by_author(&principal.id).await?;
        Ok(self.views_for(&suggestions, principal))
    }

    /// Moderation history of one suggestion, oldest first as stored.
    pub async fn audit_trail(
        &self,
        principal: &Principal,
        id: &str,
    ) -> Result<Vec<ModerationRecord>> {
        if !self.policy.is_moderator(principal) {
            return Err(DomainError::Unauthorized(
                "you are not authorized to read the audit trail",
            ));
        }
        let sid = parse_id(id)?;
        self.load(sid).await?;
        self.audit.list_by(sid).await
    }

    async fn load(&self, id: Uuid) -> Result<Suggestion> {
        self.store
            .find(id)
            .await?
            .ok_or(DomainError::NotFound(id))
    }

    fn views_for(&self, suggestions: &[Suggestion], principal: &Principal) -> Vec<SuggestionView> {
        suggestions
            .iter()
            .map(|s| self.engine.to_view(s, &principal.id))
            .collect()
    }
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| DomainError::InvalidId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockAuditLog, MockSuggestionStore, StarEntry};
    use mockall::Sequence;

    fn student(id: &str) -> Principal {
        Principal {
            id: id.to_string(),
            roles: vec!["student".into()],
            user_type: UserType::Student,
        }
    }

    fn teacher(id: &str) -> Principal {
        Principal {
            id: id.to_string(),
            roles: vec!["teacher".into()],
            user_type: UserType::Teacher,
        }
    }

    fn admin(id: &str) -> Principal {
        Principal {
            id: id.to_string(),
            roles: vec!["teacher".into(), "admin".into()],
            user_type: UserType::Teacher,
        }
    }

    fn suggestion(author: &str) -> Suggestion {
        EngagementEngine::default()
            .create("Add bike racks", "near lot B", author)
            .unwrap()
    }

    fn service(store: MockSuggestionStore, audit: MockAuditLog) -> SuggestionService {
        SuggestionService::new(
            Arc::new(store),
            Arc::new(audit),
            EngagementEngine::default(),
            AccessPolicy::default(),
        )
    }

    #[tokio::test]
    async fn submit_requires_student_user_type() {
        let service = service(MockSuggestionStore::new(), MockAuditLog::new());
        let err = service
            .submit(&teacher("t1"), "title", "content")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_PERMITTED");
    }

    #[tokio::test]
    async fn submit_validates_before_any_write() {
        // No insert expectation: an invalid create must not reach the store.
        let service = service(MockSuggestionStore::new(), MockAuditLog::new());
        let err = service.submit(&student("s1"), "", "content").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn submit_persists_and_returns_the_view() {
        let mut store = MockSuggestionStore::new();
        store
            .expect_insert()
            .withf(|s| s.status == SuggestionStatus::Pending && s.title == "Add bike racks")
            .times(1)
            .returning(|_| Ok(()));
        let service = service(store, MockAuditLog::new());
        let view = service
            .submit(&student("stu150120001"), "Add bike racks", "near lot B")
            .await
            .unwrap();
        assert_eq!(view.status, SuggestionStatus::Pending);
        assert_eq!(view.upvotes, 0);
        assert_eq!(view.stars, 0.0);
        assert_eq!(view.department, 150120);
    }

    #[tokio::test]
    async fn upvote_skips_the_write_when_already_present() {
        let mut existing = suggestion("s1");
        existing.upvotes.push("s2".to_string());
        let id = existing.id;

        let mut store = MockSuggestionStore::new();
        store
            .expect_find()
            .withf(move |got| *got == id)
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        // expect_add_upvote deliberately absent: any call would panic.
        let service = service(store, MockAuditLog::new());

        let view = service
            .upvote(&student("s2"), &id.to_string())
            .await
            .unwrap();
        assert_eq!(view.upvotes, 1);
        assert!(view.voted);
    }

    #[tokio::test]
    async fn upvote_goes_through_the_atomic_set_insert() {
        let existing = suggestion("s1");
        let id = existing.id;

        let mut store = MockSuggestionStore::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        store
            .expect_add_upvote()
            .withf(move |got, user| *got == id && user == "s2")
            .times(1)
            .returning(|_, _| Ok(true));
        let service = service(store, MockAuditLog::new());

        let view = service
            .upvote(&student("s2"), &id.to_string())
            .await
            .unwrap();
        assert_eq!(view.upvotes, 1);
    }

    #[tokio::test]
    async fn upvote_of_unknown_id_is_not_found() {
        let mut store = MockSuggestionStore::new();
        store.expect_find().times(1).returning(|_| Ok(None));
        let service = service(store, MockAuditLog::new());
        let err = service
            .upvote(&student("s2"), &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_a_client_error_without_side_effects() {
        let service = service(MockSuggestionStore::new(), MockAuditLog::new());
        let err = service
            .upvote(&student("s2"), "not-a-uuid")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ID");
    }

    #[tokio::test]
    async fn star_persists_the_upserted_entry() {
        let existing = suggestion("s1");
        let id = existing.id;

        let mut store = MockSuggestionStore::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        store
            .expect_upsert_star()
            .withf(move |got, entry: &StarEntry| {
                *got == id && entry.user_id == "t1" && entry.value == 4
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let service = service(store, MockAuditLog::new());

        let view = service
            .star(&teacher("t1"), &id.to_string(), 4)
            .await
            .unwrap();
        assert_eq!(view.stars, 4.0);
        assert_eq!(view.starred, 4.0);
        assert!(view.voted);
    }

    #[tokio::test]
    async fn star_out_of_range_never_touches_the_store() {
        let existing = suggestion("s1");
        let id = existing.id;
        let mut store = MockSuggestionStore::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        // expect_upsert_star deliberately absent.
        let service = service(store, MockAuditLog::new());
        let err = service
            .star(&teacher("t1"), &id.to_string(), 9)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_RATING");
    }

    #[tokio::test]
    async fn moderation_requires_the_moderator_role() {
        let service = service(MockSuggestionStore::new(), MockAuditLog::new());
        let err = service
            .moderate(
                &teacher("t1"),
                &Uuid::new_v4().to_string(),
                ModerationAction::Approve,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_PERMITTED");
    }

    #[tokio::test]
    async fn moderation_appends_audit_before_writing_status() {
        let existing = suggestion("s1");
        let id = existing.id;
        let mut seq = Sequence::new();

        let mut store = MockSuggestionStore::new();
        let mut audit = MockAuditLog::new();
        store
            .expect_find()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(existing.clone())));
        audit
            .expect_append()
            .withf(move |r: &ModerationRecord| {
                r.suggestion_id == id
                    && r.action == ModerationAction::Reject
                    && r.reason.as_deref() == Some("duplicate")
                    && r.snapshot.status == SuggestionStatus::Pending
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_set_status()
            .withf(move |got, status| *got == id && *status == SuggestionStatus::Rejected)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let service = service(store, audit);
        let view = service
            .moderate(
                &admin("adm1"),
                &id.to_string(),
                ModerationAction::Reject,
                Some("duplicate"),
            )
            .await
            .unwrap();
        assert_eq!(view.status, SuggestionStatus::Rejected);
    }

    #[tokio::test]
    async fn failed_audit_append_blocks_the_status_write() {
        let existing = suggestion("s1");
        let mut store = MockSuggestionStore::new();
        let mut audit = MockAuditLog::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        audit
            .expect_append()
            .times(1)
            .returning(|_| Err(DomainError::StoreUnavailable("audit down".into())));
        // expect_set_status deliberately absent: the status write must not run.
        let service = service(store, audit);
        let err = service
            .moderate(
                &admin("adm1"),
                &suggestion("s1").id.to_string(),
                ModerationAction::Approve,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn reject_without_reason_performs_no_writes() {
        let existing = suggestion("s1");
        let id = existing.id;
        let mut store = MockSuggestionStore::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        // Neither expect_append nor expect_set_status is registered.
        let service = service(store, MockAuditLog::new());
        let err = service
            .moderate(&admin("adm1"), &id.to_string(), ModerationAction::Reject, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_REASON");
    }

    #[tokio::test]
    async fn moderation_queues_are_moderator_only() {
        let service = service(MockSuggestionStore::new(), MockAuditLog::new());
        for queue in [SuggestionStatus::Pending, SuggestionStatus::Reported] {
            let err = service
                .list(&student("s1"), Some(queue))
                .await
                .unwrap_err();
            assert_eq!(err.code(), "NOT_PERMITTED");
        }
    }

    #[tokio::test]
    async fn public_listings_need_no_special_role() {
        let mut store = MockSuggestionStore::new();
        store
            .expect_list()
            .withf(|status| *status == Some(SuggestionStatus::Approved))
            .times(1)
            .returning(|_| Ok(vec![]));
        let service = service(store, MockAuditLog::new());
        let views = service
            .list(&student("s1"), Some(SuggestionStatus::Approved))
            .await
            .unwrap();
        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn audit_trail_checks_existence_and_role() {
        let existing = suggestion("s1");
        let id = existing.id;
        let record_id = Uuid::new_v4();

        let mut store = MockSuggestionStore::new();
        let mut audit = MockAuditLog::new();
        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(existing.clone())));
        audit.expect_list_by().times(1).returning(move |sid| {
            Ok(vec![ModerationRecord {
                id: record_id,
                suggestion_id: sid,
                action: ModerationAction::Approve,
                executor_id: "adm1".into(),
                reason: None,
                performed_at: chrono::Utc::now(),
                snapshot: domains::SuggestionSnapshot {
                    title: "Add bike racks".into(),
                    content: "near lot B".into(),
                    author_id: "s1".into(),
                    upvote_count: 0,
                    average_stars: 0.0,
                    status: SuggestionStatus::Pending,
                },
            }])
        });

        let service = service(store, audit);
        let trail = service
            .audit_trail(&admin("adm1"), &id.to_string())
            .await
            .unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].id, record_id);

        let service = SuggestionService::new(
            Arc::new(MockSuggestionStore::new()),
            Arc::new(MockAuditLog::new()),
            EngagementEngine::default(),
            AccessPolicy::default(),
        );
        let err = service
            .audit_trail(&student("s1"), &id.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_PERMITTED");
    }
}
