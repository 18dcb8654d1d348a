//! # Domain Models
//!
//! These structs represent the core entities of the portal: suggestions,
//! their engagement state, and the moderation audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a suggestion. Every suggestion starts out `Pending`;
/// moderation actions move it to one of the other three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
    Reported,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Reported => "reported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SuggestionStatus::Pending),
            "approved" => Some(SuggestionStatus::Approved),
            "rejected" => Some(SuggestionStatus::Rejected),
            "reported" => Some(SuggestionStatus::Reported),
            _ => None,
        }
    }

    /// True once a moderation outcome has been recorded.
    pub fn is_moderated(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single principal's star rating on a suggestion.
/// At most one entry per `user_id`; re-rating replaces the entry in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarEntry {
    pub user_id: String,
    pub value: i32,
    pub rated_at: DateTime<Utc>,
}

/// A community-submitted proposal subject to voting, rating, and moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Username of the submitting principal; immutable after creation.
    pub author_id: String,
    pub tags: Vec<String>,
    /// Principal ids that upvoted. Stored as a sequence, treated as a set:
    /// membership-tested, insertion order carries no meaning.
    pub upvotes: Vec<String>,
    pub stars: Vec<StarEntry>,
    pub status: SuggestionStatus,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn has_upvoted(&self, user_id: &str) -> bool {
        self.upvotes.iter().any(|u| u == user_id)
    }

    pub fn star_of(&self, user_id: &str) -> Option<&StarEntry> {
        self.stars.iter().find(|s| s.user_id == user_id)
    }
}

/// The three moderation verbs. Each produces an audit record and moves the
/// suggestion into the matching status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    Report,
}

impl ModerationAction {
    pub fn outcome(&self) -> SuggestionStatus {
        match self {
            ModerationAction::Approve => SuggestionStatus::Approved,
            ModerationAction::Reject => SuggestionStatus::Rejected,
            ModerationAction::Report => SuggestionStatus::Reported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Report => "report",
        }
    }
}

impl std::fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a suggestion taken when a moderation action fires.
/// The audit trail must stay meaningful even after the suggestion changes,
/// so this is a value, not a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSnapshot {
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub upvote_count: usize,
    pub average_stars: f64,
    pub status: SuggestionStatus,
}

/// One moderation decision. Append-only: records are never updated or
/// deleted, and several may accumulate for the same suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub id: Uuid,
    pub suggestion_id: Uuid,
    pub action: ModerationAction,
    /// Principal who performed the action.
    #[serde(rename = "executor")]
    pub executor_id: String,
    /// Present (non-empty) only for rejections.
    pub reason: Option<String>,
    #[serde(rename = "date")]
    pub performed_at: DateTime<Utc>,
    pub snapshot: SuggestionSnapshot,
}

/// Institutional classification of an authenticated principal.
/// `admin` is a role, not a user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Student,
    Teacher,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::Teacher => "teacher",
        }
    }
}

/// The authenticated actor behind a request. Resolved by the (external)
/// identity provider; the engine only ever sees this typed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub roles: Vec<String>,
    pub user_type: UserType,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Derives the department number embedded in an institutional username:
/// the digits between the 3-character prefix and the 3-character suffix.
/// Anything that does not fit the pattern maps to department 0.
pub fn department_id(username: &str) -> u32 {
    let chars: Vec<char> = username.chars().collect();
    if chars.len() <= 6 {
        return 0;
    }
    let middle: String = chars[3..chars.len() - 3].iter().collect();
    middle.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_lowercase() {
        for status in [
            SuggestionStatus::Pending,
            SuggestionStatus::Approved,
            SuggestionStatus::Rejected,
            SuggestionStatus::Reported,
        ] {
            assert_eq!(SuggestionStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(SuggestionStatus::parse("archived"), None);
    }

    #[test]
    fn action_maps_to_outcome_status() {
        assert_eq!(
            ModerationAction::Approve.outcome(),
            SuggestionStatus::Approved
        );
        assert_eq!(
            ModerationAction::Reject.outcome(),
            SuggestionStatus::Rejected
        );
        assert_eq!(
            ModerationAction::Report.outcome(),
            SuggestionStatus::Reported
        );
    }

    #[test]
    fn department_is_the_digits_between_prefix_and_suffix() {
        assert_eq!(department_id("stu150120999"), 150120);
        assert_eq!(department_id("abc42xyz"), 42);
    }

    #[test]
    fn department_falls_back_to_zero() {
        assert_eq!(department_id(""), 0);
        assert_eq!(department_id("short"), 0);
        assert_eq!(department_id("abcnotanumxyz"), 0);
    }

    #[test]
    fn principal_role_lookup() {
        let p = Principal {
            id: "stu150120001".into(),
            roles: vec!["student".into(), "admin".into()],
            user_type: UserType::Student,
        };
        assert!(p.has_role("admin"));
        assert!(!p.has_role("teacher"));
    }
}
