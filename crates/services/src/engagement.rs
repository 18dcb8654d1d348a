//! # EngagementEngine
//!
//! Pure transition logic over `Suggestion` values. No store access, no
//! authorization: the engine validates an operation against a current
//! value and returns the next value (plus, for moderation, the audit
//! record to append). Persistence and policy live in [`crate::suggestion`].

use chrono::Utc;
use uuid::Uuid;

use domains::{
    DomainError, ModerationAction, ModerationRecord, Result, StarEntry, Suggestion,
    SuggestionSnapshot, SuggestionStatus, SuggestionView,
};

/// Accepted star-rating range. A configuration value, not hardcoded logic.
#[derive(Debug, Clone, Copy)]
pub struct RatingBounds {
    pub min: i32,
    pub max: i32,
}

impl Default for RatingBounds {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl RatingBounds {
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngagementEngine {
    rating: RatingBounds,
    /// When set, moderation actions on an already-moderated suggestion are
    /// refused instead of overwriting the outcome. Off by default so that
    /// resubmission and appeal cycles can re-moderate.
    strict_transitions: bool,
}

impl EngagementEngine {
    pub fn new(rating: RatingBounds, strict_transitions: bool) -> Self {
        Self {
            rating,
            strict_transitions,
        }
    }

    /// Builds a fresh suggestion in the `Pending` state.
    pub fn create(&self, title: &str, content: &str, author_id: &str) -> Result<Suggestion> {
        if title.trim().is_empty() {
            return Err(DomainError::InvalidInput("title"));
        }
        if content.trim().is_empty() {
            return Err(DomainError::InvalidInput("content"));
        }
        Ok(Suggestion {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            author_id: author_id.to_string(),
            tags: Vec::new(),
            upvotes: Vec::new(),
            stars: Vec::new(),
            status: SuggestionStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Idempotent set-insert. Upvoting twice is a no-op, never an error.
    /// There is no self-upvote restriction and no status gate.
    pub fn upvote(&self, mut suggestion: Suggestion, principal_id: &str) -> Suggestion {
        if !suggestion.has_upvoted(principal_id) {
            suggestion.upvotes.push(principal_id.to_string());
        }
        suggestion
    }

    /// Replace-or-insert of the principal's star entry. Re-rating
    /// overwrites the previous value and refreshes `rated_at`.
    pub fn star(
        &self,
        mut suggestion: Suggestion,
        principal_id: &str,
        value: i32,
    ) -> Result<Suggestion> {
        if !self.rating.contains(value) {
            return Err(DomainError::InvalidRating {
                value,
                min: self.rating.min,
                max: self.rating.max,
            });
        }
        let now = Utc::now();
        match suggestion
            .stars
            .iter_mut()
            .find(|s| s.user_id == principal_id)
        {
            Some(entry) => {
                entry.value = value;
                entry.rated_at = now;
            }
            None => suggestion.stars.push(StarEntry {
                user_id: principal_id.to_string(),
                value,
                rated_at: now,
            }),
        }
        Ok(suggestion)
    }

    /// Applies a moderation action, producing the next state and the audit
    /// record. The record snapshots the suggestion as it was *before* the
    /// transition, so the trail reflects what the moderator decided on.
    pub fn transition(
        &self,
        suggestion: &Suggestion,
        action: ModerationAction,
        executor_id: &str,
        reason: Option<&str>,
    ) -> Result<(Suggestion, ModerationRecord)> {
        if self.strict_transitions && suggestion.status.is_moderated() {
            return Err(DomainError::InvalidTransition {
                from: suggestion.status,
                action,
            });
        }
        let reason = match action {
            ModerationAction::Reject => match reason.map(str::trim) {
                Some(r) if !r.is_empty() => Some(r.to_string()),
                _ => return Err(DomainError::MissingReason),
            },
            _ => None,
        };
        let record = ModerationRecord {
            id: Uuid::new_v4(),
            suggestion_id: suggestion.id,
            action,
            executor_id: executor_id.to_string(),
            reason,
            performed_at: Utc::now(),
            snapshot: SuggestionSnapshot {
                title: suggestion.title.clone(),
                content: suggestion.content.clone(),
                author_id: suggestion.author_id.clone(),
                upvote_count: suggestion.upvotes.len(),
                average_stars: self.average_stars(suggestion),
                status: suggestion.status,
            },
        };
        let mut next = suggestion.clone();
        next.status = action.outcome();
        Ok((next, record))
    }

    /// Arithmetic mean of the current star values; `0.0` with no ratings.
    /// Raw floating-point mean, no rounding.
    pub fn average_stars(&self, suggestion: &Suggestion) -> f64 {
        if suggestion.stars.is_empty() {
            return 0.0;
        }
        let total: f64 = suggestion.stars.iter().map(|s| f64::from(s.value)).sum();
        total / suggestion.stars.len() as f64
    }

    /// Projects a suggestion into the per-viewer read model.
    pub fn to_view(&self, suggestion: &Suggestion, viewer_id: &str) -> SuggestionView {
        let starred = suggestion
            .star_of(viewer_id)
            .map(|s| f64::from(s.value))
            .unwrap_or(0.0);
        let voted = suggestion.has_upvoted(viewer_id) || suggestion.star_of(viewer_id).is_some();
        SuggestionView {
            id: suggestion.id.to_string(),
            title: suggestion.title.clone(),
            content: suggestion.content.clone(),
            author: suggestion.author_id.clone(),
            upvotes: suggestion.upvotes.len(),
            stars: self.average_stars(suggestion),
            date: suggestion.created_at,
            tags: suggestion.tags.clone(),
            status: suggestion.status,
            starred,
            voted,
            department: domains::department_id(&suggestion.author_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EngagementEngine {
        EngagementEngine::default()
    }

    fn pending(author: &str) -> Suggestion {
        engine().create("Add bike racks", "near lot B", author).unwrap()
    }

    #[test]
    fn create_starts_pending_and_empty() {
        let s = pending("stu150120001");
        assert_eq!(s.status, SuggestionStatus::Pending);
        assert!(s.upvotes.is_empty());
        assert!(s.stars.is_empty());
        assert!(s.tags.is_empty());
    }

    #[test]
    fn create_rejects_empty_fields() {
        let e = engine();
        assert!(matches!(
            e.create("", "x", "a"),
            Err(DomainError::InvalidInput("title"))
        ));
        assert!(matches!(
            e.create("x", "", "a"),
            Err(DomainError::InvalidInput("content"))
        ));
        // Whitespace-only counts as empty.
        assert!(matches!(
            e.create("   ", "x", "a"),
            Err(DomainError::InvalidInput("title"))
        ));
    }

    #[test]
    fn upvote_is_idempotent() {
        let e = engine();
        let s = pending("author");
        let once = e.upvote(s.clone(), "stu150120002");
        let twice = e.upvote(once.clone(), "stu150120002");
        assert_eq!(once.upvotes, vec!["stu150120002".to_string()]);
        assert_eq!(once.upvotes, twice.upvotes);
    }

    #[test]
    fn self_upvote_is_allowed() {
        let e = engine();
        let s = pending("author");
        let next = e.upvote(s, "author");
        assert!(next.has_upvoted("author"));
    }

    #[test]
    fn star_replaces_instead_of_appending() {
        let e = engine();
        let s = pending("author");
        let s = e.star(s, "tea100200300", 4).unwrap();
        assert_eq!(e.average_stars(&s), 4.0);
        let s = e.star(s, "tea100200300", 2).unwrap();
        assert_eq!(s.stars.len(), 1);
        assert_eq!(s.stars[0].value, 2);
        assert_eq!(e.average_stars(&s), 2.0);
    }

    #[test]
    fn star_refreshes_rated_at_on_replace() {
        let e = engine();
        let s = e.star(pending("author"), "t1", 3).unwrap();
        let first = s.stars[0].rated_at;
        let s = e.star(s, "t1", 5).unwrap();
        assert!(s.stars[0].rated_at >= first);
    }

    #[test]
    fn star_outside_bounds_is_rejected() {
        let e = engine();
        let s = pending("author");
        assert!(matches!(
            e.star(s.clone(), "t1", 0),
            Err(DomainError::InvalidRating { value: 0, .. })
        ));
        assert!(matches!(
            e.star(s, "t1", 6),
            Err(DomainError::InvalidRating { value: 6, .. })
        ));
    }

    #[test]
    fn average_is_mean_of_current_values() {
        let e = engine();
        let s = pending("author");
        assert_eq!(e.average_stars(&s), 0.0);
        let s = e.star(s, "a", 2).unwrap();
        let s = e.star(s, "b", 5).unwrap();
        assert_eq!(e.average_stars(&s), 3.5);
    }

    #[test]
    fn reject_requires_a_reason() {
        let e = engine();
        let s = pending("author");
        assert!(matches!(
            e.transition(&s, ModerationAction::Reject, "adm1", None),
            Err(DomainError::MissingReason)
        ));
        assert!(matches!(
            e.transition(&s, ModerationAction::Reject, "adm1", Some("  ")),
            Err(DomainError::MissingReason)
        ));
    }

    #[test]
    fn transition_snapshots_the_prior_state() {
        let e = engine();
        let s = e.star(pending("stu150120001"), "t1", 4).unwrap();
        let s = e.upvote(s, "s2");
        let (next, record) = e
            .transition(&s, ModerationAction::Reject, "adm1", Some("duplicate"))
            .unwrap();
        assert_eq!(next.status, SuggestionStatus::Rejected);
        assert_eq!(record.suggestion_id, s.id);
        assert_eq!(record.executor_id, "adm1");
        assert_eq!(record.reason.as_deref(), Some("duplicate"));
        assert_eq!(record.snapshot.status, SuggestionStatus::Pending);
        assert_eq!(record.snapshot.upvote_count, 1);
        assert_eq!(record.snapshot.average_stars, 4.0);
    }

    #[test]
    fn approve_and_report_carry_no_reason() {
        let e = engine();
        let s = pending("author");
        let (next, record) = e
            .transition(&s, ModerationAction::Approve, "adm1", Some("ignored"))
            .unwrap();
        assert_eq!(next.status, SuggestionStatus::Approved);
        assert_eq!(record.reason, None);
        let (next, record) = e
            .transition(&s, ModerationAction::Report, "adm1", None)
            .unwrap();
        assert_eq!(next.status, SuggestionStatus::Reported);
        assert_eq!(record.reason, None);
    }

    #[test]
    fn permissive_mode_allows_re_moderation() {
        let e = engine();
        let s = pending("author");
        let (rejected, _) = e
            .transition(&s, ModerationAction::Reject, "adm1", Some("dup"))
            .unwrap();
        let (approved, _) = e
            .transition(&rejected, ModerationAction::Approve, "adm2", None)
            .unwrap();
        assert_eq!(approved.status, SuggestionStatus::Approved);
    }

    #[test]
    fn strict_mode_refuses_re_moderation() {
        let e = EngagementEngine::new(RatingBounds::default(), true);
        let s = pending("author");
        let (approved, _) = e
            .transition(&s, ModerationAction::Approve, "adm1", None)
            .unwrap();
        assert!(matches!(
            e.transition(&approved, ModerationAction::Report, "adm2", None),
            Err(DomainError::InvalidTransition {
                from: SuggestionStatus::Approved,
                action: ModerationAction::Report,
            })
        ));
    }

    #[test]
    fn engagement_is_not_gated_by_status() {
        let e = engine();
        let s = pending("author");
        let (rejected, _) = e
            .transition(&s, ModerationAction::Reject, "adm1", Some("dup"))
            .unwrap();
        let rejected = e.upvote(rejected, "s2");
        assert!(rejected.has_upvoted("s2"));
        let rejected = e.star(rejected, "t1", 3).unwrap();
        assert_eq!(rejected.stars.len(), 1);
    }

    #[test]
    fn view_reflects_viewer_engagement() {
        let e = engine();
        let s = pending("stu150120001");
        let s = e.upvote(s, "s2");
        let s = e.star(s, "t1", 4).unwrap();

        let viewer_upvoted = e.to_view(&s, "s2");
        assert!(viewer_upvoted.voted);
        assert_eq!(viewer_upvoted.starred, 0.0);

        let viewer_starred = e.to_view(&s, "t1");
        assert!(viewer_starred.voted);
        assert_eq!(viewer_starred.starred, 4.0);

        let bystander = e.to_view(&s, "s3");
        assert!(!bystander.voted);
        assert_eq!(bystander.upvotes, 1);
        assert_eq!(bystander.stars, 4.0);
        assert_eq!(bystander.department, 150120);
    }
}
