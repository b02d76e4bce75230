//! Audit log domain types.
//!
//! Entries are append-only. Privileged mutations write their entry in the
//! same transaction as the effect, so a mutation can never land without its
//! audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::UserId;

/// Default page size for audit queries.
pub const DEFAULT_QUERY_LIMIT: u32 = 50;
/// Hard cap on audit query page size.
pub const MAX_QUERY_LIMIT: u32 = 100;

/// The privileged action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BootstrapFirstAdmin,
    CreateOrPromoteAdmin,
    SetAdminActive,
    UpdateRolePermissions,
    ResetRolePermissions,
    UpsertUser,
    SetUserRole,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BootstrapFirstAdmin => "bootstrap_first_admin",
            Self::CreateOrPromoteAdmin => "create_or_promote_admin",
            Self::SetAdminActive => "set_admin_active",
            Self::UpdateRolePermissions => "update_role_permissions",
            Self::ResetRolePermissions => "reset_role_permissions",
            Self::UpsertUser => "upsert_user",
            Self::SetUserRole => "set_user_role",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bootstrap_first_admin" => Ok(Self::BootstrapFirstAdmin),
            "create_or_promote_admin" => Ok(Self::CreateOrPromoteAdmin),
            "set_admin_active" => Ok(Self::SetAdminActive),
            "update_role_permissions" => Ok(Self::UpdateRolePermissions),
            "reset_role_permissions" => Ok(Self::ResetRolePermissions),
            "upsert_user" => Ok(Self::UpsertUser),
            "set_user_role" => Ok(Self::SetUserRole),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

/// What kind of entity a privileged action targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTargetType {
    AdminRecord,
    Role,
    UserRecord,
}

impl AuditTargetType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminRecord => "admin_record",
            Self::Role => "role",
            Self::UserRecord => "user_record",
        }
    }
}

impl std::fmt::Display for AuditTargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditTargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin_record" => Ok(Self::AdminRecord),
            "role" => Ok(Self::Role),
            "user_record" => Ok(Self::UserRecord),
            other => Err(format!("unknown audit target type: {other}")),
        }
    }
}

/// A persisted audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogEntry {
    /// Monotonically increasing entry ID.
    pub id: i64,
    /// Who performed the action. For bootstrap this is the bootstrapping
    /// user themself.
    pub actor: UserId,
    /// What was done.
    pub action: AuditAction,
    /// What kind of thing it was done to.
    pub target_type: AuditTargetType,
    /// Identifier of the target (user id or role name).
    pub target_id: String,
    /// Free-form structured context, e.g. the permission set written.
    pub details: serde_json::Value,
    /// Client IP as reported by the gateway, if known.
    pub requester_ip: Option<String>,
    /// Client user agent, if known.
    pub requester_agent: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// An audit entry prepared by the service layer, before the store assigns
/// ID and timestamp.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor: UserId,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: String,
    pub details: serde_json::Value,
    pub requester_ip: Option<String>,
    pub requester_agent: Option<String>,
}

/// Filters for reading the audit log. Results are always newest-first.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Only entries performed by this actor.
    pub actor: Option<UserId>,
    /// Only entries targeting this kind of entity.
    pub target_type: Option<AuditTargetType>,
    /// Only entries targeting this identifier.
    pub target_id: Option<String>,
    /// Only entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Page size; clamped to [`MAX_QUERY_LIMIT`].
    pub limit: Option<u32>,
}

impl AuditQuery {
    /// The page size to use, with default and cap applied.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .min(MAX_QUERY_LIMIT)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [
            AuditAction::BootstrapFirstAdmin,
            AuditAction::CreateOrPromoteAdmin,
            AuditAction::SetAdminActive,
            AuditAction::UpdateRolePermissions,
            AuditAction::ResetRolePermissions,
            AuditAction::UpsertUser,
            AuditAction::SetUserRole,
        ] {
            let parsed: AuditAction = action.as_str().parse().unwrap();
            assert_eq!(parsed, action);
        }
        assert!("drop_table".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_target_type_round_trip() {
        for target in [
            AuditTargetType::AdminRecord,
            AuditTargetType::Role,
            AuditTargetType::UserRecord,
        ] {
            let parsed: AuditTargetType = target.as_str().parse().unwrap();
            assert_eq!(parsed, target);
        }
        assert!("table".parse::<AuditTargetType>().is_err());
    }

    #[test]
    fn test_effective_limit_defaults() {
        assert_eq!(AuditQuery::default().effective_limit(), DEFAULT_QUERY_LIMIT);
    }

    #[test]
    fn test_effective_limit_caps_at_max() {
        let query = AuditQuery {
            limit: Some(10_000),
            ..AuditQuery::default()
        };
        assert_eq!(query.effective_limit(), MAX_QUERY_LIMIT);
    }

    #[test]
    fn test_effective_limit_passes_small_values() {
        let query = AuditQuery {
            limit: Some(5),
            ..AuditQuery::default()
        };
        assert_eq!(query.effective_limit(), 5);
    }
}
