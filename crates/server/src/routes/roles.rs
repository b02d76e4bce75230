//! Role permission route handlers.

use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{AdminRole, Permission, UserId};

use crate::error::AppError;
use crate::middleware::{ClientMeta, RequireActor};
use crate::models::RoleOverride;
use crate::state::AppState;

use super::{parse_admin_role, parse_permissions};

/// Build the role permissions router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list)).route(
        "/{role}/permissions",
        get(show).put(replace).delete(reset),
    )
}

/// Where a role's effective permission set comes from.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePermissionSource {
    /// Compiled-in defaults; no override is stored.
    Default,
    /// A stored override replaces the defaults.
    Override,
}

/// A role's effective permission set with override provenance.
#[derive(Debug, Serialize)]
pub struct RolePermissionsResponse {
    pub role: AdminRole,
    pub permissions: BTreeSet<Permission>,
    pub source: RolePermissionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RolePermissionsResponse {
    fn from_stored(role: AdminRole, stored: Option<RoleOverride>) -> Self {
        match stored {
            Some(stored) => Self {
                role,
                permissions: stored.permissions,
                source: RolePermissionSource::Override,
                updated_by: Some(stored.updated_by),
                updated_at: Some(stored.updated_at),
            },
            None => Self {
                role,
                permissions: role.default_permissions().iter().copied().collect(),
                source: RolePermissionSource::Default,
                updated_by: None,
                updated_at: None,
            },
        }
    }
}

/// List every role with its effective permission set.
///
/// # Errors
///
/// Returns 403 when the actor lacks `manage_roles`.
pub async fn list(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
) -> Result<Json<Vec<RolePermissionsResponse>>, AppError> {
    state
        .authz()
        .require(&actor, Permission::ManageRoles)
        .await?;

    let mut roles = Vec::with_capacity(AdminRole::ALL.len());
    for role in AdminRole::ALL {
        let stored = state.authz().role_override(role).await?;
        roles.push(RolePermissionsResponse::from_stored(role, stored));
    }
    Ok(Json(roles))
}

/// Fetch one role's effective permission set.
///
/// # Errors
///
/// Returns 403 when the actor lacks `manage_roles`, 400 on an unknown role
/// name.
pub async fn show(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<RolePermissionsResponse>, AppError> {
    state
        .authz()
        .require(&actor, Permission::ManageRoles)
        .await?;
    let role = parse_admin_role(&role)?;
    let stored = state.authz().role_override(role).await?;
    Ok(Json(RolePermissionsResponse::from_stored(role, stored)))
}

/// Request replacing a role's permission set.
#[derive(Debug, Deserialize)]
pub struct ReplacePermissionsRequest {
    pub permissions: Vec<String>,
}

/// Replace a role's permission set.
///
/// The stored set fully replaces the compiled-in defaults for that role
/// until it is reset.
///
/// # Errors
///
/// Returns 403 when the actor lacks `manage_roles`, 400 on identifiers
/// outside the catalog.
pub async fn replace(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(role): Path<String>,
    ClientMeta(meta): ClientMeta,
    Json(body): Json<ReplacePermissionsRequest>,
) -> Result<Json<RolePermissionsResponse>, AppError> {
    let role = parse_admin_role(&role)?;
    let permissions = parse_permissions(&body.permissions)?;

    let stored = state
        .authz()
        .set_role_permissions(&actor, role, permissions, &meta)
        .await?;
    tracing::info!(actor = %actor, role = %role, "Role permissions replaced");
    Ok(Json(RolePermissionsResponse::from_stored(
        role,
        Some(stored),
    )))
}

/// Revert a role to its compiled-in default permission set.
///
/// Succeeds (and audits) even when no override is stored.
///
/// # Errors
///
/// Returns 403 when the actor lacks `manage_roles`.
pub async fn reset(
    RequireActor(actor): RequireActor,
    State(state): State<AppState>,
    Path(role): Path<String>,
    ClientMeta(meta): ClientMeta,
) -> Result<StatusCode, AppError> {
    let role = parse_admin_role(&role)?;
    state
        .authz()
        .reset_role_permissions(&actor, role, &meta)
        .await?;
    tracing::info!(actor = %actor, role = %role, "Role permissions reset to defaults");
    Ok(StatusCode::NO_CONTENT)
}
