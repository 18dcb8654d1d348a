//! # seed
//!
//! Developer utility. Prints ready-to-use bearer tokens for a demo
//! student, teacher, and admin. When built with `db-postgres` and pointed
//! at a postgres store, it also pushes a few suggestions through the real
//! service so the portal has data to show.

use anyhow::Context;

use auth_adapters::TokenAuthority;
use configs::AppConfig;
use domains::{Principal, UserType};

fn demo_principals() -> Vec<(&'static str, Principal)> {
    vec![
        (
            "student",
            Principal {
                id: "stu150120001".into(),
                roles: vec!["student".into()],
                user_type: UserType::Student,
            },
        ),
        (
            "teacher",
            Principal {
                id: "tea100200300".into(),
                roles: vec!["teacher".into()],
                user_type: UserType::Teacher,
            },
        ),
        (
            "admin",
            Principal {
                id: "adm100100100".into(),
                roles: vec!["teacher".into(), "admin".into()],
                user_type: UserType::Teacher,
            },
        ),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let auth = TokenAuthority::new(&config.auth.jwt_secret, config.auth.token_ttl_secs);

    println!("demo bearer tokens:");
    for (label, principal) in demo_principals() {
        let token = auth
            .issue(&principal)
            .with_context(|| format!("issuing {label} token"))?;
        println!("  {label} ({}): {token}", principal.id);
    }

    #[cfg(feature = "db-postgres")]
    seed_postgres(&config).await?;

    Ok(())
}

#[cfg(feature = "db-postgres")]
async fn seed_postgres(config: &AppConfig) -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::bail;
    use secrecy::ExposeSecret;

    use configs::StoreBackend;
    use domains::ModerationAction;
    use services::{AccessPolicy, EngagementEngine, SuggestionService};
    use storage_adapters::postgres::{init_schema, PostgresAuditLog, PostgresSuggestionStore};

    if config.store.backend != StoreBackend::Postgres {
        println!("store.backend is not 'postgres'; skipping data seed");
        return Ok(());
    }
    let Some(url) = config.store.database_url.as_ref() else {
        bail!("store.database_url is required to seed postgres");
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(url.expose_secret())
        .await
        .context("connecting to postgres")?;
    init_schema(&pool).await.context("applying schema")?;

    let service = SuggestionService::new(
        Arc::new(PostgresSuggestionStore::new(pool.clone())),
        Arc::new(PostgresAuditLog::new(pool)),
        EngagementEngine::default(),
        AccessPolicy::default(),
    );

    let principals: Vec<Principal> = demo_principals().into_iter().map(|(_, p)| p).collect();
    let (student, teacher, admin) = (&principals[0], &principals[1], &principals[2]);

    let demo = [
        ("Add bike racks", "near lot B"),
        ("Longer library hours", "open until midnight during finals"),
        ("More vegetarian options", "at the main cafeteria"),
    ];
    let mut ids = Vec::new();
    for (title, content) in demo {
        let view = service.submit(student, title, content).await?;
        ids.push(view.id);
    }

    service.upvote(teacher, &ids[0]).await?;
    service.star(teacher, &ids[0], 5).await?;
    service
        .moderate(admin, &ids[0], ModerationAction::Approve, None)
        .await?;
    service
        .moderate(admin, &ids[1], ModerationAction::Reject, Some("duplicate"))
        .await?;

    println!("seeded {} demo suggestions", ids.len());
    Ok(())
}
