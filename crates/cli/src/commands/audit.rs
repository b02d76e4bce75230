//! Audit log inspection commands.
//!
//! # Usage
//!
//! ```bash
//! warden-cli audit --limit 50
//! warden-cli audit --actor usr_01
//! ```

use warden_server::models::AuditQuery;

use super::{CommandError, authz_from_env, parse_user_id};

/// Print the newest audit entries.
///
/// # Errors
///
/// Returns `CommandError` if the actor filter fails validation or the
/// store is unreachable.
pub async fn tail(limit: u32, actor: Option<&str>) -> Result<(), CommandError> {
    let actor = actor.map(|raw| parse_user_id(raw, "actor")).transpose()?;

    let authz = authz_from_env().await?;
    let entries = authz
        .audit_log(&AuditQuery {
            actor,
            limit: Some(limit),
            ..AuditQuery::default()
        })
        .await?;

    #[allow(clippy::print_stdout)]
    {
        for entry in &entries {
            println!(
                "{} {:<26} {:<24} {}/{} {}",
                entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                entry.action.as_str(),
                entry.actor.as_str(),
                entry.target_type.as_str(),
                entry.target_id,
                entry.details
            );
        }
    }
    Ok(())
}
