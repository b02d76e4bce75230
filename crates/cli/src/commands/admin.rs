//! Admin record management commands.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap the first super admin
//! warden-cli bootstrap --user-id usr_01
//!
//! # Promote a user to support with an extra grant
//! warden-cli admin promote --user-id usr_02 --role support \
//!     --permission manage_subscriptions --actor usr_01
//!
//! # List all admin records
//! warden-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `WARDEN_DATABASE_URL` - `PostgreSQL` connection string

use std::collections::BTreeSet;

use warden_core::{AdminRole, Permission};
use warden_server::services::RequestMeta;

use super::{CommandError, authz_from_env, parse_user_id};

/// Bootstrap the first super admin.
///
/// # Errors
///
/// Returns `CommandError` if an administrator already exists or the store
/// is unreachable.
pub async fn bootstrap(user_id: &str) -> Result<(), CommandError> {
    let user_id = parse_user_id(user_id, "user id")?;
    let authz = authz_from_env().await?;

    let record = authz
        .bootstrap_first_admin(&user_id, &RequestMeta::cli())
        .await?;

    tracing::info!("Bootstrapped first administrator: {}", record.user_id);
    Ok(())
}

/// List all admin records, newest first.
///
/// # Errors
///
/// Returns `CommandError` if the store is unreachable.
pub async fn list() -> Result<(), CommandError> {
    let authz = authz_from_env().await?;
    let records = authz.list_admins().await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{:<32} {:<12} {:<8} {:<32} GRANTS",
            "USER ID", "ROLE", "ACTIVE", "CREATED BY"
        );
        for record in &records {
            let grants = record
                .permissions
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "{:<32} {:<12} {:<8} {:<32} {}",
                record.user_id.as_str(),
                record.role.as_str(),
                record.active,
                record.created_by.as_ref().map_or("-", |id| id.as_str()),
                grants
            );
        }
    }
    Ok(())
}

/// Create an admin record or change an existing one's role and grants.
///
/// # Errors
///
/// Returns `CommandError` if an argument fails validation or the actor
/// lacks `manage_admins`.
pub async fn promote(
    user_id: &str,
    role: &str,
    permissions: &[String],
    actor: &str,
) -> Result<(), CommandError> {
    let user_id = parse_user_id(user_id, "user id")?;
    let actor = parse_user_id(actor, "actor")?;
    let role: AdminRole = role
        .parse()
        .map_err(|e: warden_core::RoleParseError| {
            CommandError::InvalidArgument("role", e.to_string())
        })?;
    let permissions = permissions
        .iter()
        .map(|p| {
            p.parse::<Permission>()
                .map_err(|e| CommandError::InvalidArgument("permission", e.to_string()))
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    let authz = authz_from_env().await?;
    let record = authz
        .create_or_promote(&actor, &user_id, role, permissions, &RequestMeta::cli())
        .await?;

    tracing::info!(
        "Admin record upserted: {} ({})",
        record.user_id,
        record.role
    );
    Ok(())
}

/// Activate or deactivate an admin record.
///
/// # Errors
///
/// Returns `CommandError` if no record exists or the actor lacks
/// `manage_admins`.
pub async fn set_active(user_id: &str, active: bool, actor: &str) -> Result<(), CommandError> {
    let user_id = parse_user_id(user_id, "user id")?;
    let actor = parse_user_id(actor, "actor")?;

    let authz = authz_from_env().await?;
    let record = authz
        .set_admin_active(&actor, &user_id, active, &RequestMeta::cli())
        .await?;

    tracing::info!(
        "Admin record {} is now {}",
        record.user_id,
        if record.active { "active" } else { "inactive" }
    );
    Ok(())
}
