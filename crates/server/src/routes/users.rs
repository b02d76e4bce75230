//! End-user directory route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde::Deserialize;

use warden_core::Permission;

use crate::error::AppError;
use crate::middleware::{ClientMeta, RequireActor};
use crate::models::{UserRecord, UserSync};
use crate::state::AppState;

use super::{parse_email, parse_user_id, parse_user_role};

/// Build the end-user directory router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync))
        .route("/{user_id}", get(show))
        .route("/{user_id}/role", patch(set_role))
}

/// Identity-provider profile payload.
#[derive(Debug, Deserialize)]
pub struct UserSyncRequest {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Omitted on routine syncs; the stored role is preserved.
    pub role: Option<String>,
}

/// Create or refresh a user record from identity-provider claims.
///
/// Callers sync their own profile freely. Syncing another user's record,
/// or sending a `role`, requires `edit_users`.
///
/// # Errors
///
/// Returns 400 on malformed profile fields, 403 when the sync needs
/// `edit_users` and the actor lacks it.
pub async fn sync(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<UserSyncRequest>,
) -> Result<Json<UserRecord>, AppError> {
    let sync = UserSync {
        user_id: parse_user_id(&body.user_id)?,
        email: parse_email(&body.email)?,
        name: body.name,
        avatar_url: body.avatar_url,
        role: body.role.as_deref().map(parse_user_role).transpose()?,
    };

    let record = state.authz().sync_user(&actor, sync, &meta).await?;
    tracing::info!(user_id = %record.user_id, "User record synced");
    Ok(Json(record))
}

/// Fetch a user record.
///
/// # Errors
///
/// Returns 403 when the actor lacks `view_users`, 404 when no record
/// exists.
pub async fn show(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRecord>, AppError> {
    state
        .authz()
        .require(&actor, Permission::ViewUsers)
        .await?;
    let user_id = parse_user_id(&user_id)?;
    let record = state
        .authz()
        .user_record(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user record".to_string()))?;
    Ok(Json(record))
}

/// Request for changing an end-user's platform role.
#[derive(Debug, Deserialize)]
pub struct SetUserRoleRequest {
    pub role: String,
}

/// Change an end-user's platform role.
///
/// # Errors
///
/// Returns 403 when the actor lacks `edit_users`, 404 when no record
/// exists.
pub async fn set_role(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<SetUserRoleRequest>,
) -> Result<Json<UserRecord>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let role = parse_user_role(&body.role)?;

    let record = state
        .authz()
        .set_user_role(&actor, &user_id, role, &meta)
        .await?;
    tracing::info!(
        actor = %actor,
        user_id = %record.user_id,
        role = %record.role,
        "User role updated"
    );
    Ok(Json(record))
}
