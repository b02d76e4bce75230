//! Admin directory route handlers.

use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};

use warden_core::{Permission, UserId};

use crate::error::AppError;
use crate::middleware::{ClientMeta, RequireActor};
use crate::models::AdminRecord;
use crate::state::AppState;

use super::{parse_admin_role, parse_permissions, parse_user_id};

/// Build the admin directory router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create_or_promote))
        .route("/bootstrap", post(bootstrap))
        .route("/{user_id}", get(show))
        .route("/{user_id}/active", patch(set_active))
        .route("/{user_id}/permissions", get(effective_permissions))
}

/// One-time bootstrap of the first super admin.
///
/// The caller's own forwarded identity becomes the record; there is no way
/// to bootstrap on someone else's behalf.
///
/// # Errors
///
/// Returns 409 once an administrator exists, 401 without a verified
/// identity.
pub async fn bootstrap(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
) -> Result<(StatusCode, Json<AdminRecord>), AppError> {
    let record = state.authz().bootstrap_first_admin(&actor, &meta).await?;
    tracing::info!(user_id = %record.user_id, "First administrator bootstrapped");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Request for creating or promoting an admin.
#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub user_id: String,
    pub role: String,
    /// Additive grants beyond the role's permission set.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Create an admin record or change an existing one's role and grants.
///
/// # Errors
///
/// Returns 403 when the actor lacks `manage_admins`, 400 on identifiers
/// outside the catalog.
pub async fn create_or_promote(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<CreateAdminRequest>,
) -> Result<Json<AdminRecord>, AppError> {
    let user_id = parse_user_id(&body.user_id)?;
    let role = parse_admin_role(&body.role)?;
    let permissions = parse_permissions(&body.permissions)?;

    let record = state
        .authz()
        .create_or_promote(&actor, &user_id, role, permissions, &meta)
        .await?;
    tracing::info!(
        actor = %actor,
        user_id = %record.user_id,
        role = %record.role,
        "Admin record upserted"
    );
    Ok(Json(record))
}

/// List all admin records, newest first.
///
/// # Errors
///
/// Returns 403 when the actor lacks `page_admin_users`.
pub async fn list(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminRecord>>, AppError> {
    state
        .authz()
        .require(&actor, Permission::PageAdminUsers)
        .await?;
    let records = state.authz().list_admins().await?;
    Ok(Json(records))
}

/// Fetch a single admin record.
///
/// # Errors
///
/// Returns 403 when the actor lacks `page_admin_users`, 404 when no record
/// exists.
pub async fn show(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AdminRecord>, AppError> {
    state
        .authz()
        .require(&actor, Permission::PageAdminUsers)
        .await?;
    let user_id = parse_user_id(&user_id)?;
    let record = state
        .authz()
        .admin_record(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("admin record".to_string()))?;
    Ok(Json(record))
}

/// Request for toggling an admin's active flag.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Activate or deactivate an admin record.
///
/// Records are never deleted; deactivation is the retirement path that
/// keeps the history intact.
///
/// # Errors
///
/// Returns 403 when the actor lacks `manage_admins`, 404 when no record
/// exists.
pub async fn set_active(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<SetActiveRequest>,
) -> Result<Json<AdminRecord>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let record = state
        .authz()
        .set_admin_active(&actor, &user_id, body.active, &meta)
        .await?;
    tracing::info!(
        actor = %actor,
        user_id = %record.user_id,
        active = record.active,
        "Admin active flag updated"
    );
    Ok(Json(record))
}

/// Response carrying a user's effective admin-axis permission set.
#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub user_id: UserId,
    pub permissions: BTreeSet<Permission>,
}

/// Report the effective permission set for a user.
///
/// Powers navigation filtering in admin UIs. Self-lookup is always
/// allowed; pages still re-verify each action through the access gate.
///
/// # Errors
///
/// Returns 403 when looking up another user without `page_admin_users`.
pub async fn effective_permissions(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<EffectivePermissionsResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    if actor != user_id {
        state
            .authz()
            .require(&actor, Permission::PageAdminUsers)
            .await?;
    }
    let permissions = state.authz().effective_permissions(&user_id).await?;
    Ok(Json(EffectivePermissionsResponse {
        user_id,
        permissions,
    }))
}
