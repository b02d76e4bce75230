//! Audit log route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use warden_core::Permission;

use crate::error::AppError;
use crate::middleware::RequireActor;
use crate::models::{AuditLogEntry, AuditQuery, AuditTargetType};
use crate::state::AppState;

use super::parse_user_id;

/// Build the audit log router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(query))
}

/// Query string filters for the audit log.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQueryParams {
    pub actor: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// Read the audit log, newest first.
///
/// # Errors
///
/// Returns 403 when the actor lacks `view_audit_log`, 400 on unknown
/// filter values.
pub async fn query(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    state
        .authz()
        .require(&actor, Permission::ViewAuditLog)
        .await?;

    let filter = AuditQuery {
        actor: params.actor.as_deref().map(parse_user_id).transpose()?,
        target_type: params
            .target_type
            .as_deref()
            .map(|raw| {
                raw.parse::<AuditTargetType>()
                    .map_err(AppError::Validation)
            })
            .transpose()?,
        target_id: params.target_id,
        since: params.since,
        limit: params.limit,
    };

    let entries = state.authz().audit_log(&filter).await?;
    Ok(Json(entries))
}
