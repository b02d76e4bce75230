//! Admin directory domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::{AdminRole, Permission, UserId};

/// An entry in the admin directory.
///
/// `permissions` holds only the per-admin additive grants. What the role
/// itself grants (defaults or a stored override) is resolved by the
/// evaluator at check time, never stored here.
#[derive(Debug, Clone, Serialize)]
pub struct AdminRecord {
    /// Identity-provider ID of the admin.
    pub user_id: UserId,
    /// The admin's role.
    pub role: AdminRole,
    /// Additive per-admin grants on top of the role permissions.
    pub permissions: BTreeSet<Permission>,
    /// Inactive records grant nothing, regardless of role.
    pub active: bool,
    /// Who created or last promoted this record. `None` for the
    /// bootstrapped first admin.
    pub created_by: Option<UserId>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl AdminRecord {
    /// Whether this record currently grants admin standing.
    #[must_use]
    pub const fn is_active_admin(&self) -> bool {
        self.active
    }

    /// Whether this record grants super-admin standing right now.
    ///
    /// An inactive super admin counts for nothing.
    #[must_use]
    pub const fn is_active_super_admin(&self) -> bool {
        self.active && self.role.is_super_admin()
    }
}
