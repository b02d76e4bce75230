//! Role identifiers and their compiled-in permission defaults.
//!
//! Defaults are what a role grants when no stored override exists for it.
//! The arrays here are the single source of truth for that baseline; the
//! role-permission store may replace a role's whole set at runtime, and
//! per-record grants on top of it only ever add.

use serde::{Deserialize, Serialize};

use super::permission::Permission;

/// Error returned when a string names no known role.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

/// Role assigned to an admin record.
///
/// `User` exists so a record can be demoted without deleting it; it grants
/// nothing on the admin axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "postgres",
    derive(sqlx::Type),
    sqlx(type_name = "authz.admin_role", rename_all = "snake_case")
)]
pub enum AdminRole {
    User,
    Support,
    Admin,
    SuperAdmin,
}

impl AdminRole {
    pub const ALL: [Self; 4] = [Self::User, Self::Support, Self::Admin, Self::SuperAdmin];

    const SUPPORT_DEFAULTS: [Permission; 2] =
        [Permission::ViewUsers, Permission::CustomerSupport];

    const ADMIN_DEFAULTS: [Permission; 19] = [
        Permission::PageAdminUsers,
        Permission::PageAdminSubscriptions,
        Permission::PageAdminProducts,
        Permission::PageAdminAnalytics,
        Permission::PageAdminSettings,
        Permission::PageAdminAudit,
        Permission::PageAdminSupport,
        Permission::ViewUsers,
        Permission::EditUsers,
        Permission::SuspendUsers,
        Permission::ViewSubscriptions,
        Permission::ManageSubscriptions,
        Permission::ViewProducts,
        Permission::ManageProducts,
        Permission::ViewAnalytics,
        Permission::ExportAnalytics,
        Permission::ViewAuditLog,
        Permission::CustomerSupport,
        Permission::ViewSupportTickets,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Support => "support",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// The compiled-in permission baseline for this role.
    ///
    /// `admin` deliberately lacks `manage_admins`, `manage_roles`,
    /// `manage_settings` and `delete_users`; those stay super-admin-only
    /// unless granted per role through an override.
    #[must_use]
    pub const fn default_permissions(self) -> &'static [Permission] {
        match self {
            Self::User => &[],
            Self::Support => &Self::SUPPORT_DEFAULTS,
            Self::Admin => &Self::ADMIN_DEFAULTS,
            Self::SuperAdmin => Permission::catalog(),
        }
    }

    #[must_use]
    pub const fn is_super_admin(self) -> bool {
        matches!(self, Self::SuperAdmin)
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "support" => Ok(Self::Support),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

/// Role carried on an end-user record.
///
/// Evaluated only for the self-service namespace; admin-panel grants always
/// come from an admin record, never from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(
    feature = "postgres",
    derive(sqlx::Type),
    sqlx(type_name = "authz.user_role", rename_all = "snake_case")
)]
pub enum UserRole {
    User,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub const ALL: [Self; 3] = [Self::User, Self::Admin, Self::SuperAdmin];

    const USER_DEFAULTS: [Permission; 2] =
        [Permission::DashboardAccess, Permission::ManageOwnBilling];

    const STAFF_DEFAULTS: [Permission; 3] = [
        Permission::DashboardAccess,
        Permission::ManageOwnBilling,
        Permission::BetaFeatures,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Self-service permissions granted by this role.
    #[must_use]
    pub const fn default_permissions(self) -> &'static [Permission] {
        match self {
            Self::User => &Self::USER_DEFAULTS,
            Self::Admin | Self::SuperAdmin => &Self::STAFF_DEFAULTS,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}
