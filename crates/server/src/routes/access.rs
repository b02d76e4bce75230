//! Access gate route handlers.
//!
//! The gate contract is tri-state: clients hold `pending` until a response
//! arrives, and the service only ever answers `granted` or `denied`.
//! Malformed input fails closed to `denied`; only store failures surface as
//! errors, so a retryable 503 is never mistaken for a decision.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use warden_core::{AccessState, Permission, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// Build the access gate router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/resolve", post(resolve))
        .route("/admin-panel/{user_id}", get(admin_panel))
}

/// Request for resolving a single access decision.
#[derive(Debug, Deserialize)]
pub struct ResolveAccessRequest {
    pub user_id: String,
    pub permission: String,
}

/// A terminal access decision.
#[derive(Debug, Serialize)]
pub struct AccessDecision {
    pub status: AccessState,
}

/// Resolve whether a user holds a permission.
///
/// Identifiers that do not parse are denied, not rejected: the gate answers
/// the question "may this render" and an unanswerable question means no.
///
/// # Errors
///
/// Returns 503 when the store is unreachable; the caller retries instead of
/// treating it as a decision.
pub async fn resolve(
    State(state): State<AppState>,
    Json(body): Json<ResolveAccessRequest>,
) -> Result<Json<AccessDecision>, AppError> {
    let (Ok(user_id), Ok(permission)) = (
        UserId::parse(&body.user_id),
        body.permission.parse::<Permission>(),
    ) else {
        tracing::warn!(
            permission = %body.permission,
            "Access resolve failed closed on malformed input"
        );
        return Ok(Json(AccessDecision {
            status: AccessState::Denied,
        }));
    };

    let status = state.authz().resolve_access(&user_id, permission).await?;
    Ok(Json(AccessDecision { status }))
}

/// Resolve whether a user may enter the admin panel.
///
/// # Errors
///
/// Returns 503 when the store is unreachable.
pub async fn admin_panel(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AccessDecision>, AppError> {
    let Ok(user_id) = UserId::parse(&user_id) else {
        tracing::warn!("Admin panel check failed closed on malformed user id");
        return Ok(Json(AccessDecision {
            status: AccessState::Denied,
        }));
    };

    let allowed = state.authz().check_admin_panel_access(&user_id).await?;
    Ok(Json(AccessDecision {
        status: AccessState::from_decision(allowed),
    }))
}
