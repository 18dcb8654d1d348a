//! Postgres implementations of the persistence ports.
//!
//! The Mongo-style suggestion document is decomposed into one parent row
//! plus two child tables keyed by `(suggestion_id, user_id)`. That keeps
//! every engagement mutation a single SQL statement: `ON CONFLICT DO
//! NOTHING` is the add-to-set, `ON CONFLICT .. DO UPDATE` is the per-key
//! star upsert. No read-modify-write cycle exists on any write path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::error;
use uuid::Uuid;

use domains::{
    AuditLog, DomainError, ModerationAction, ModerationRecord, Result, StarEntry, Suggestion,
    SuggestionSnapshot, SuggestionStatus, SuggestionStore,
};

/// Schema applied at startup. Idempotent; the composition root runs it
/// once after connecting.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS suggestions (
    id         UUID PRIMARY KEY,
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    author_id  TEXT NOT NULL,
    tags       TEXT[] NOT NULL DEFAULT '{}',
    status     TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS suggestion_upvotes (
    suggestion_id UUID NOT NULL REFERENCES suggestions(id),
    user_id       TEXT NOT NULL,
    PRIMARY KEY (suggestion_id, user_id)
);

CREATE TABLE IF NOT EXISTS suggestion_stars (
    suggestion_id UUID NOT NULL REFERENCES suggestions(id),
    user_id       TEXT NOT NULL,
    value         INTEGER NOT NULL,
    rated_at      TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (suggestion_id, user_id)
);

CREATE TABLE IF NOT EXISTS moderation_records (
    id            UUID PRIMARY KEY,
    suggestion_id UUID NOT NULL,
    action        TEXT NOT NULL,
    executor_id   TEXT NOT NULL,
    reason        TEXT,
    performed_at  TIMESTAMPTZ NOT NULL,
    snapshot      JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_suggestions_status ON suggestions(status);
CREATE INDEX IF NOT EXISTS idx_moderation_records_suggestion
    ON moderation_records(suggestion_id, performed_at);
"#;

pub async fn init_schema(pool: &PgPool) -> std::result::Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

fn store_err(err: sqlx::Error) -> DomainError {
    error!(error = %err, "postgres operation failed");
    DomainError::StoreUnavailable(err.to_string())
}

/// Foreign-key violations on the child tables mean the parent suggestion
/// does not exist.
fn engagement_err(id: Uuid, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23503") {
            return DomainError::NotFound(id);
        }
    }
    store_err(err)
}

fn parse_status(raw: &str) -> Result<SuggestionStatus> {
    SuggestionStatus::parse(raw).ok_or_else(|| {
        DomainError::StoreUnavailable(format!("unknown suggestion status in store: {raw}"))
    })
}

fn parse_action(raw: &str) -> Result<ModerationAction> {
    match raw {
        "approve" => Ok(ModerationAction::Approve),
        "reject" => Ok(ModerationAction::Reject),
        "report" => Ok(ModerationAction::Report),
        other => Err(DomainError::StoreUnavailable(format!(
            "unknown moderation action in store: {other}"
        ))),
    }
}

pub struct PostgresSuggestionStore {
    pool: PgPool,
}

impl PostgresSuggestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches the engagement children for a batch of suggestions and
    /// stitches them back into document shape.
    async fn hydrate(&self, mut bare: Vec<Suggestion>) -> Result<Vec<Suggestion>> {
        if bare.is_empty() {
            return Ok(bare);
        }
        let ids: Vec<Uuid> = bare.iter().map(|s| s.id).collect();

        let upvotes = sqlx::query(
            "SELECT suggestion_id, user_id FROM suggestion_upvotes WHERE suggestion_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let stars = sqlx::query(
            "SELECT suggestion_id, user_id, value, rated_at FROM suggestion_stars \
             WHERE suggestion_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        for suggestion in bare.iter_mut() {
            for row in upvotes.iter() {
                if row.get::<Uuid, _>("suggestion_id") == suggestion.id {
                    suggestion.upvotes.push(row.get("user_id"));
                }
            }
            for row in stars.iter() {
                if row.get::<Uuid, _>("suggestion_id") == suggestion.id {
                    suggestion.stars.push(StarEntry {
                        user_id: row.get("user_id"),
                        value: row.get("value"),
                        rated_at: row.get("rated_at"),
                    });
                }
            }
        }
        Ok(bare)
    }
}

fn suggestion_from_row(row: &sqlx::postgres::PgRow) -> Result<Suggestion> {
    Ok(Suggestion {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        tags: row.get("tags"),
        upvotes: Vec::new(),
        stars: Vec::new(),
        status: parse_status(row.get::<String, _>("status").as_str())?,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl SuggestionStore for PostgresSuggestionStore {
    async fn insert(&self, suggestion: &Suggestion) -> Result<()> {
        sqlx::query(
            "INSERT INTO suggestions (id, title, content, author_id, tags, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(suggestion.id)
        .bind(&suggestion.title)
        .bind(&suggestion.content)
        .bind(&suggestion.author_id)
        .bind(&suggestion.tags)
        .bind(suggestion.status.as_str())
        .bind(suggestion.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Suggestion>> {
        let row = sqlx::query("SELECT * FROM suggestions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        match row {
            Some(row) => {
                let bare = suggestion_from_row(&row)?;
                let mut hydrated = self.hydrate(vec![bare]).await?;
                Ok(hydrated.pop())
            }
            None => Ok(None),
        }
    }

    async fn list(&self, status: Option<SuggestionStatus>) -> Result<Vec<Suggestion>> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM suggestions WHERE status = $1 ORDER BY created_at")
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM suggestions ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(store_err)?;
        let bare = rows
            .iter()
            .map(suggestion_from_row)
            .collect::<Result<Vec<_>>>()?;
        self.hydrate(bare).await
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query("SELECT * FROM suggestions WHERE author_id = $1 ORDER BY created_at")
            .bind(author_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        let bare = rows
            .iter()
            .map(suggestion_from_row)
            .collect::<Result<Vec<_>>>()?;
        self.hydrate(bare).await
    }

    async fn add_upvote(&self, id: Uuid, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO suggestion_upvotes (suggestion_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|err| engagement_err(id, err))?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_star(&self, id: Uuid, entry: &StarEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO suggestion_stars (suggestion_id, user_id, value, rated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (suggestion_id, user_id) \
             DO UPDATE SET value = EXCLUDED.value, rated_at = EXCLUDED.rated_at",
        )
        .bind(id)
        .bind(&entry.user_id)
        .bind(entry.value)
        .bind(entry.rated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| engagement_err(id, err))?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: SuggestionStatus) -> Result<()> {
        let result = sqlx::query("UPDATE suggestions SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(id));
        }
        Ok(())
    }
}

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, record: &ModerationRecord) -> Result<()> {
        let snapshot = serde_json::to_value(&record.snapshot)
            .map_err(|err| DomainError::StoreUnavailable(err.to_string()))?;
        sqlx::query(
            "INSERT INTO moderation_records \
             (id, suggestion_id, action, executor_id, reason, performed_at, snapshot) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(record.suggestion_id)
        .bind(record.action.as_str())
        .bind(&record.executor_id)
        .bind(&record.reason)
        .bind(record.performed_at)
        .bind(snapshot)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_by(&self, suggestion_id: Uuid) -> Result<Vec<ModerationRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM moderation_records WHERE suggestion_id = $1 ORDER BY performed_at",
        )
        .bind(suggestion_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|row| {
                let snapshot: SuggestionSnapshot =
                    serde_json::from_value(row.get::<serde_json::Value, _>("snapshot"))
                        .map_err(|err| DomainError::StoreUnavailable(err.to_string()))?;
                Ok(ModerationRecord {
                    id: row.get("id"),
                    suggestion_id: row.get("suggestion_id"),
                    action: parse_action(row.get::<String, _>("action").as_str())?,
                    executor_id: row.get("executor_id"),
                    reason: row.get("reason"),
                    performed_at: row.get::<DateTime<Utc>, _>("performed_at"),
                    snapshot,
                })
            })
            .collect()
    }
}
