//! Route table and request handlers.
//!
//! Mirrors the portal's public API: submission and listings, the two
//! engagement verbs, and the three moderation verbs. Authorization
//! decisions belong to the service; handlers only authenticate.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use auth_adapters::TokenAuthority;
use domains::{ModerationAction, ModerationRecord, Principal, SuggestionStatus, SuggestionView};
use services::SuggestionService;

use crate::error::ApiError;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<SuggestionService>,
    pub auth: Arc<TokenAuthority>,
}

/// The authenticated caller, extracted from `Authorization: Bearer <jwt>`.
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<ApiState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("you are not logged in"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("you are not logged in"))?;
        let principal = state
            .auth
            .verify(token)
            .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;
        Ok(AuthPrincipal(principal))
    }
}

#[derive(Deserialize)]
struct CreateSuggestionParams {
    title: String,
    content: String,
}

#[derive(Deserialize)]
struct StarParams {
    star: i32,
}

#[derive(Deserialize)]
struct ReasonParams {
    reason: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/suggestions", post(submit).get(list_approved))
        .route("/suggestions/mine", get(list_mine))
        .route("/suggestions/rejected", get(list_rejected))
        .route("/suggestions/pending", get(list_pending))
        .route("/suggestions/reported", get(list_reported))
        .route("/suggestions/{id}", get(get_suggestion))
        .route("/suggestions/{id}/audit", get(audit_trail))
        .route("/suggestions/{id}/upvote", put(upvote))
        .route("/suggestions/{id}/star", put(star))
        .route("/suggestions/{id}/approve", patch(approve))
        .route("/suggestions/{id}/reject", patch(reject))
        .route("/suggestions/{id}/report", patch(report))
        .with_state(state)
}

async fn submit(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(params): Json<CreateSuggestionParams>,
) -> Result<Json<SuggestionView>, ApiError> {
    let view = state
        .service
        .submit(&principal, &params.title, &params.content)
        .await?;
    Ok(Json(view))
}

async fn get_suggestion(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<SuggestionView>, ApiError> {
    Ok(Json(state.service.get(&principal, &id).await?))
}

async fn upvote(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<SuggestionView>, ApiError> {
    Ok(Json(state.service.upvote(&principal, &id).await?))
}

async fn star(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(params): Json<StarParams>,
) -> Result<Json<SuggestionView>, ApiError> {
    Ok(Json(state.service.star(&principal, &id, params.star).await?))
}

async fn approve(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<SuggestionView>, ApiError> {
    let view = state
        .service
        .moderate(&principal, &id, ModerationAction::Approve, None)
        .await?;
    Ok(Json(view))
}

async fn reject(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(params): Json<ReasonParams>,
) -> Result<Json<SuggestionView>, ApiError> {
    let view = state
        .service
        .moderate(
            &principal,
            &id,
            ModerationAction::Reject,
            Some(&params.reason),
        )
        .await?;
    Ok(Json(view))
}

async fn report(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<SuggestionView>, ApiError> {
    let view = state
        .service
        .moderate(&principal, &id, ModerationAction::Report, None)
        .await?;
    Ok(Json(view))
}

async fn audit_trail(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<Vec<ModerationRecord>>, ApiError> {
    Ok(Json(state.service.audit_trail(&principal, &id).await?))
}

async fn list_approved(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    list_status(state, principal, Some(SuggestionStatus::Approved)).await
}

async fn list_rejected(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    list_status(state, principal, Some(SuggestionStatus::Rejected)).await
}

async fn list_pending(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    list_status(state, principal, Some(SuggestionStatus::Pending)).await
}

async fn list_reported(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    list_status(state, principal, Some(SuggestionStatus::Reported)).await
}

async fn list_mine(
    State(state): State<ApiState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    Ok(Json(state.service.list_mine(&principal).await?))
}

async fn list_status(
    state: ApiState,
    principal: Principal,
    status: Option<SuggestionStatus>,
) -> Result<Json<Vec<SuggestionView>>, ApiError> {
    Ok(Json(state.service.list(&principal, status).await?))
}
