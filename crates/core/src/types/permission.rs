//! The permission catalog.
//!
//! Permissions form a closed set, fixed at compile time. Every identifier a
//! caller can present is either one of these variants or invalid; there is no
//! way to mint a permission at runtime. Authorization code that receives a
//! string parses it through [`Permission::from_str`] and treats a parse
//! failure as a denial, never as a new capability.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a catalog permission.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct PermissionParseError(pub String);

/// Functional grouping for catalog permissions.
///
/// Self-service is the end-user namespace: the only group evaluated through
/// the user-record fall-through path. Everything else is admin-panel surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDomain {
    PageAccess,
    UserManagement,
    SubscriptionManagement,
    ProductManagement,
    Analytics,
    SystemAdministration,
    Support,
    SelfService,
}

/// A single capability from the catalog.
///
/// Wire format is the snake_case identifier (e.g. `page_admin_users`), both
/// in JSON and in the database `TEXT[]` columns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Page access
    PageAdminUsers,
    PageAdminSubscriptions,
    PageAdminProducts,
    PageAdminAnalytics,
    PageAdminSettings,
    PageAdminAudit,
    PageAdminSupport,

    // User management
    ViewUsers,
    EditUsers,
    SuspendUsers,
    DeleteUsers,
    ManageAdmins,

    // Subscription management
    ViewSubscriptions,
    ManageSubscriptions,

    // Product management
    ViewProducts,
    ManageProducts,

    // Analytics
    ViewAnalytics,
    ExportAnalytics,

    // System administration
    ManageSettings,
    ViewAuditLog,
    ManageRoles,

    // Support
    CustomerSupport,
    ViewSupportTickets,

    // Self-service (end-user namespace)
    DashboardAccess,
    ManageOwnBilling,
    BetaFeatures,
}

impl Permission {
    /// Every permission in the catalog, grouped by domain.
    pub const CATALOG: [Self; 26] = [
        Self::PageAdminUsers,
        Self::PageAdminSubscriptions,
        Self::PageAdminProducts,
        Self::PageAdminAnalytics,
        Self::PageAdminSettings,
        Self::PageAdminAudit,
        Self::PageAdminSupport,
        Self::ViewUsers,
        Self::EditUsers,
        Self::SuspendUsers,
        Self::DeleteUsers,
        Self::ManageAdmins,
        Self::ViewSubscriptions,
        Self::ManageSubscriptions,
        Self::ViewProducts,
        Self::ManageProducts,
        Self::ViewAnalytics,
        Self::ExportAnalytics,
        Self::ManageSettings,
        Self::ViewAuditLog,
        Self::ManageRoles,
        Self::CustomerSupport,
        Self::ViewSupportTickets,
        Self::DashboardAccess,
        Self::ManageOwnBilling,
        Self::BetaFeatures,
    ];

    /// The full catalog as a slice.
    #[must_use]
    pub const fn catalog() -> &'static [Self] {
        &Self::CATALOG
    }

    /// The wire identifier for this permission.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageAdminUsers => "page_admin_users",
            Self::PageAdminSubscriptions => "page_admin_subscriptions",
            Self::PageAdminProducts => "page_admin_products",
            Self::PageAdminAnalytics => "page_admin_analytics",
            Self::PageAdminSettings => "page_admin_settings",
            Self::PageAdminAudit => "page_admin_audit",
            Self::PageAdminSupport => "page_admin_support",
            Self::ViewUsers => "view_users",
            Self::EditUsers => "edit_users",
            Self::SuspendUsers => "suspend_users",
            Self::DeleteUsers => "delete_users",
            Self::ManageAdmins => "manage_admins",
            Self::ViewSubscriptions => "view_subscriptions",
            Self::ManageSubscriptions => "manage_subscriptions",
            Self::ViewProducts => "view_products",
            Self::ManageProducts => "manage_products",
            Self::ViewAnalytics => "view_analytics",
            Self::ExportAnalytics => "export_analytics",
            Self::ManageSettings => "manage_settings",
            Self::ViewAuditLog => "view_audit_log",
            Self::ManageRoles => "manage_roles",
            Self::CustomerSupport => "customer_support",
            Self::ViewSupportTickets => "view_support_tickets",
            Self::DashboardAccess => "dashboard_access",
            Self::ManageOwnBilling => "manage_own_billing",
            Self::BetaFeatures => "beta_features",
        }
    }

    /// The domain this permission belongs to.
    #[must_use]
    pub const fn domain(self) -> PermissionDomain {
        match self {
            Self::PageAdminUsers
            | Self::PageAdminSubscriptions
            | Self::PageAdminProducts
            | Self::PageAdminAnalytics
            | Self::PageAdminSettings
            | Self::PageAdminAudit
            | Self::PageAdminSupport => PermissionDomain::PageAccess,
            Self::ViewUsers
            | Self::EditUsers
            | Self::SuspendUsers
            | Self::DeleteUsers
            | Self::ManageAdmins => PermissionDomain::UserManagement,
            Self::ViewSubscriptions | Self::ManageSubscriptions => {
                PermissionDomain::SubscriptionManagement
            }
            Self::ViewProducts | Self::ManageProducts => PermissionDomain::ProductManagement,
            Self::ViewAnalytics | Self::ExportAnalytics => PermissionDomain::Analytics,
            Self::ManageSettings | Self::ViewAuditLog | Self::ManageRoles => {
                PermissionDomain::SystemAdministration
            }
            Self::CustomerSupport | Self::ViewSupportTickets => PermissionDomain::Support,
            Self::DashboardAccess | Self::ManageOwnBilling | Self::BetaFeatures => {
                PermissionDomain::SelfService
            }
        }
    }

    /// Whether this permission gates admin-panel surface.
    ///
    /// Admin-panel permissions are only ever granted through an active admin
    /// record; they never resolve through the end-user fall-through path.
    #[must_use]
    pub const fn is_admin_panel(self) -> bool {
        !matches!(self.domain(), PermissionDomain::SelfService)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CATALOG
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PermissionParseError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_catalog_identifiers_are_unique() {
        let identifiers: HashSet<&str> =
            Permission::CATALOG.iter().map(|p| p.as_str()).collect();
        assert_eq!(identifiers.len(), Permission::CATALOG.len());
    }

    #[test]
    fn test_round_trip_every_catalog_entry() {
        for permission in Permission::CATALOG {
            let parsed: Permission = permission.as_str().parse().unwrap();
            assert_eq!(parsed, permission);
        }
    }

    #[test]
    fn test_unknown_identifier_fails() {
        assert!("manage_everything".parse::<Permission>().is_err());
        assert!("".parse::<Permission>().is_err());
        assert!("VIEW_USERS".parse::<Permission>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&Permission::ManageSubscriptions).unwrap();
        assert_eq!(json, "\"manage_subscriptions\"");

        let parsed: Permission = serde_json::from_str("\"view_users\"").unwrap();
        assert_eq!(parsed, Permission::ViewUsers);
        assert_eq!(parsed.to_string(), "view_users");
    }

    #[test]
    fn test_serde_rejects_unknown_identifier() {
        assert!(serde_json::from_str::<Permission>("\"root_access\"").is_err());
    }

    #[test]
    fn test_domain_grouping() {
        assert_eq!(
            Permission::PageAdminUsers.domain(),
            PermissionDomain::PageAccess
        );
        assert_eq!(
            Permission::ManageAdmins.domain(),
            PermissionDomain::UserManagement
        );
        assert_eq!(
            Permission::DashboardAccess.domain(),
            PermissionDomain::SelfService
        );
    }

    #[test]
    fn test_self_service_is_not_admin_panel() {
        assert!(!Permission::DashboardAccess.is_admin_panel());
        assert!(!Permission::ManageOwnBilling.is_admin_panel());
        assert!(!Permission::BetaFeatures.is_admin_panel());
        assert!(Permission::ViewUsers.is_admin_panel());
        assert!(Permission::PageAdminAudit.is_admin_panel());
    }
}
