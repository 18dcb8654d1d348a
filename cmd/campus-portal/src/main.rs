//! # campus-portal
//!
//! The composition root: loads configuration, picks the storage backend,
//! wires the engine and service together, and serves the HTTP API until a
//! shutdown signal arrives. Adapter lifecycle (connect → serve → close)
//! is owned here, not by the components themselves.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use api_adapters::{router, ApiState};
use auth_adapters::TokenAuthority;
use configs::{AppConfig, EngagementConfig, StoreBackend};
use domains::{AuditLog, SuggestionStore, UserType};
use services::{AccessPolicy, EngagementEngine, RatingBounds, SuggestionService};
use storage_adapters::{MemoryAuditLog, MemorySuggestionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::load().context("loading configuration")?;
    let (store, audit) = build_stores(&config).await?;

    let engine = EngagementEngine::new(
        RatingBounds {
            min: config.engagement.star_min,
            max: config.engagement.star_max,
        },
        config.engagement.strict_transitions,
    );
    let service = Arc::new(SuggestionService::new(
        store,
        audit,
        engine,
        access_policy(&config.engagement),
    ));
    let auth = Arc::new(TokenAuthority::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_secs,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = router(ApiState { service, auth })
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let address = format!("0.0.0.0:{}", config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "campus-portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    info!("shutdown complete");
    Ok(())
}

fn access_policy(engagement: &EngagementConfig) -> AccessPolicy {
    let submit_user_types = engagement
        .submit_user_types
        .iter()
        .filter_map(|raw| match raw.as_str() {
            "student" => Some(UserType::Student),
            "teacher" => Some(UserType::Teacher),
            other => {
                warn!(user_type = other, "ignoring unknown submit user type");
                None
            }
        })
        .collect();
    AccessPolicy {
        submit_user_types,
        moderator_role: engagement.moderator_role.clone(),
    }
}

#[cfg(feature = "db-postgres")]
async fn build_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn SuggestionStore>, Arc<dyn AuditLog>)> {
    use secrecy::ExposeSecret;
    use storage_adapters::postgres::{init_schema, PostgresAuditLog, PostgresSuggestionStore};

    match config.store.backend {
        StoreBackend::Memory => Ok(memory_stores()),
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_ref()
                .context("store.database_url is required for the postgres backend")?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(8)
                .connect(url.expose_secret())
                .await
                .context("connecting to postgres")?;
            init_schema(&pool).await.context("applying schema")?;
            info!("connected to postgres");
            Ok((
                Arc::new(PostgresSuggestionStore::new(pool.clone())),
                Arc::new(PostgresAuditLog::new(pool)),
            ))
        }
    }
}

#[cfg(not(feature = "db-postgres"))]
async fn build_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn SuggestionStore>, Arc<dyn AuditLog>)> {
    match config.store.backend {
        StoreBackend::Memory => Ok(memory_stores()),
        StoreBackend::Postgres => {
            anyhow::bail!("this binary was built without the db-postgres feature")
        }
    }
}

fn memory_stores() -> (Arc<dyn SuggestionStore>, Arc<dyn AuditLog>) {
    info!("using in-memory storage; data will not survive a restart");
    (
        Arc::new(MemorySuggestionStore::new()),
        Arc::new(MemoryAuditLog::new()),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
