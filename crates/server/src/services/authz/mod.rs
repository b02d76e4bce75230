//! The authorization service.
//!
//! Wraps an [`AuthzStore`] with the decision logic and the permission gates
//! on privileged mutations. Handlers and the CLI talk to this type, never
//! to the store directly, so every mutation passes the same gate and leaves
//! the same audit trail.
//!
//! # Decision sequence
//!
//! `check_permission` resolves in this order:
//!
//! 1. An active admin record with role `super_admin` grants everything.
//! 2. Any other active admin record grants the union of its role's
//!    permission set (stored override, else compiled-in defaults) and its
//!    own additive grants. The decision is made here; there is no further
//!    fall-through for active admins.
//! 3. Otherwise the caller is an end user: admin-panel permissions are
//!    denied outright, and self-service permissions resolve through the
//!    user record's role baseline.
//!
//! Absence of records is an ordinary denial, not an error. Malformed
//! identifiers and unknown permission strings never reach this type; the
//! typed [`UserId`] and [`Permission`] arguments make them unrepresentable.

mod error;

pub use error::AuthzError;

use std::collections::BTreeSet;
use std::sync::Arc;

use warden_core::{AccessState, AdminRole, Permission, UserId, UserRole};

use crate::models::{
    AdminRecord, AuditAction, AuditLogEntry, AuditQuery, AuditTargetType, NewAuditEntry,
    RoleOverride, UserRecord, UserSync,
};
use crate::store::AuthzStore;

/// Request provenance recorded on audit entries.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Client IP as reported by the gateway.
    pub ip: Option<String>,
    /// Client user agent.
    pub agent: Option<String>,
}

impl RequestMeta {
    /// Provenance for operations driven from the operator CLI.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            ip: None,
            agent: Some("warden-cli".to_string()),
        }
    }
}

/// Authorization service.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct Authz {
    store: Arc<dyn AuthzStore>,
}

impl Authz {
    #[must_use]
    pub fn new(store: Arc<dyn AuthzStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Evaluator
    // =========================================================================

    /// Decide whether `user_id` holds `permission`.
    ///
    /// Denial is a `false` return. The only error paths are store failures.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached; callers
    /// must surface that as a transient failure, never as a denial.
    pub async fn check_permission(
        &self,
        user_id: &UserId,
        permission: Permission,
    ) -> Result<bool, AuthzError> {
        if let Some(record) = self.store.admin_record(user_id).await?
            && record.active
        {
            if record.role.is_super_admin() {
                return Ok(true);
            }
            let mut effective = self.role_permissions(record.role).await?;
            effective.extend(record.permissions.iter().copied());
            return Ok(effective.contains(&permission));
        }

        // End-user fall-through. Admin-panel surface is gated purely by an
        // active admin record; a user-record role never grants it.
        if permission.is_admin_panel() {
            return Ok(false);
        }
        let user = self.store.user_record(user_id).await?;
        Ok(user.is_some_and(|u| u.role.default_permissions().contains(&permission)))
    }

    /// Evaluate a permission into the tri-state gate contract.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn resolve_access(
        &self,
        user_id: &UserId,
        permission: Permission,
    ) -> Result<AccessState, AuthzError> {
        let allowed = self.check_permission(user_id, permission).await?;
        Ok(AccessState::from_decision(allowed))
    }

    /// Whether `user_id` has an active admin record of any role.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn is_admin(&self, user_id: &UserId) -> Result<bool, AuthzError> {
        let record = self.store.admin_record(user_id).await?;
        Ok(record.is_some_and(|r| r.is_active_admin()))
    }

    /// Whether `user_id` is an active super admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn is_super_admin(&self, user_id: &UserId) -> Result<bool, AuthzError> {
        let record = self.store.admin_record(user_id).await?;
        Ok(record.is_some_and(|r| r.is_active_super_admin()))
    }

    /// Whether `user_id` may enter the admin panel at all.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn check_admin_panel_access(&self, user_id: &UserId) -> Result<bool, AuthzError> {
        self.is_admin(user_id).await
    }

    /// Require `user_id` to hold `permission`, failing with `Denied`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if the check fails, `AuthzError::Store`
    /// if the store cannot be reached.
    pub async fn require(
        &self,
        user_id: &UserId,
        permission: Permission,
    ) -> Result<(), AuthzError> {
        if self.check_permission(user_id, permission).await? {
            Ok(())
        } else {
            tracing::warn!(
                actor = %user_id,
                permission = %permission,
                "Refusing a privileged operation"
            );
            Err(AuthzError::Denied)
        }
    }

    // =========================================================================
    // Role-Permission Store
    // =========================================================================

    /// The permission set a role currently grants: the stored override if
    /// present, else the compiled-in defaults.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn role_permissions(
        &self,
        role: AdminRole,
    ) -> Result<BTreeSet<Permission>, AuthzError> {
        let stored = self.store.role_override(role).await?;
        Ok(stored.map_or_else(
            || role.default_permissions().iter().copied().collect(),
            |o| o.permissions,
        ))
    }

    /// The stored override for a role, if any. `None` means the compiled-in
    /// defaults apply.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn role_override(
        &self,
        role: AdminRole,
    ) -> Result<Option<RoleOverride>, AuthzError> {
        Ok(self.store.role_override(role).await?)
    }

    /// Replace a role's permission set. Requires `manage_roles`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if `actor` lacks `manage_roles`,
    /// `AuthzError::Store` on store failure.
    pub async fn set_role_permissions(
        &self,
        actor: &UserId,
        role: AdminRole,
        permissions: BTreeSet<Permission>,
        meta: &RequestMeta,
    ) -> Result<RoleOverride, AuthzError> {
        self.require(actor, Permission::ManageRoles).await?;
        let audit = audit_entry(
            actor,
            AuditAction::UpdateRolePermissions,
            AuditTargetType::Role,
            role.as_str(),
            serde_json::json!({ "permissions": permissions }),
            meta,
        );
        let row = self
            .store
            .set_role_permissions(role, &permissions, actor, audit)
            .await?;
        Ok(row)
    }

    /// Delete a role's override, reverting to compiled-in defaults.
    /// Requires `manage_roles`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if `actor` lacks `manage_roles`,
    /// `AuthzError::Store` on store failure.
    pub async fn reset_role_permissions(
        &self,
        actor: &UserId,
        role: AdminRole,
        meta: &RequestMeta,
    ) -> Result<(), AuthzError> {
        self.require(actor, Permission::ManageRoles).await?;
        let audit = audit_entry(
            actor,
            AuditAction::ResetRolePermissions,
            AuditTargetType::Role,
            role.as_str(),
            serde_json::json!({ "reverted_to_defaults": true }),
            meta,
        );
        self.store.reset_role_permissions(role, audit).await?;
        Ok(())
    }

    // =========================================================================
    // Admin Directory
    // =========================================================================

    /// One-time creation of the first super admin.
    ///
    /// Deliberately ungated: it only ever works on a system with no super
    /// admin, and the store makes it an at-most-one-winner operation.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` with
    /// [`StoreError::AlreadyBootstrapped`](crate::store::StoreError::AlreadyBootstrapped)
    /// once a super admin exists.
    pub async fn bootstrap_first_admin(
        &self,
        user_id: &UserId,
        meta: &RequestMeta,
    ) -> Result<AdminRecord, AuthzError> {
        let permissions: BTreeSet<Permission> = Permission::catalog().iter().copied().collect();
        let audit = audit_entry(
            user_id,
            AuditAction::BootstrapFirstAdmin,
            AuditTargetType::AdminRecord,
            user_id.as_str(),
            serde_json::json!({ "role": AdminRole::SuperAdmin }),
            meta,
        );
        let record = self
            .store
            .bootstrap_first_admin(user_id, &permissions, audit)
            .await?;
        Ok(record)
    }

    /// Create an admin record or change an existing one's role and grants.
    /// Requires `manage_admins`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if `actor` lacks `manage_admins`,
    /// `AuthzError::Store` on store failure.
    pub async fn create_or_promote(
        &self,
        actor: &UserId,
        user_id: &UserId,
        role: AdminRole,
        permissions: BTreeSet<Permission>,
        meta: &RequestMeta,
    ) -> Result<AdminRecord, AuthzError> {
        self.require(actor, Permission::ManageAdmins).await?;
        let audit = audit_entry(
            actor,
            AuditAction::CreateOrPromoteAdmin,
            AuditTargetType::AdminRecord,
            user_id.as_str(),
            serde_json::json!({ "role": role, "permissions": permissions }),
            meta,
        );
        let record = self
            .store
            .upsert_admin_record(user_id, role, &permissions, actor, audit)
            .await?;
        Ok(record)
    }

    /// Toggle an admin record's active flag. Requires `manage_admins`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if `actor` lacks `manage_admins`,
    /// `AuthzError::Store` with `NotFound` if no record exists.
    pub async fn set_admin_active(
        &self,
        actor: &UserId,
        user_id: &UserId,
        active: bool,
        meta: &RequestMeta,
    ) -> Result<AdminRecord, AuthzError> {
        self.require(actor, Permission::ManageAdmins).await?;
        let audit = audit_entry(
            actor,
            AuditAction::SetAdminActive,
            AuditTargetType::AdminRecord,
            user_id.as_str(),
            serde_json::json!({ "active": active }),
            meta,
        );
        let record = self.store.set_admin_active(user_id, active, audit).await?;
        Ok(record)
    }

    /// Look up an admin record.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn admin_record(&self, user_id: &UserId) -> Result<Option<AdminRecord>, AuthzError> {
        Ok(self.store.admin_record(user_id).await?)
    }

    /// All admin records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn list_admins(&self) -> Result<Vec<AdminRecord>, AuthzError> {
        Ok(self.store.list_admin_records().await?)
    }

    /// The effective admin-axis permission set for `user_id`.
    ///
    /// Super admins report the full catalog. Inactive records and unknown
    /// users report the empty set.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn effective_permissions(
        &self,
        user_id: &UserId,
    ) -> Result<BTreeSet<Permission>, AuthzError> {
        let Some(record) = self.store.admin_record(user_id).await? else {
            return Ok(BTreeSet::new());
        };
        if !record.active {
            return Ok(BTreeSet::new());
        }
        if record.role.is_super_admin() {
            return Ok(Permission::catalog().iter().copied().collect());
        }
        let mut effective = self.role_permissions(record.role).await?;
        effective.extend(record.permissions.iter().copied());
        Ok(effective)
    }

    // =========================================================================
    // End-User Directory
    // =========================================================================

    /// Look up an end-user record.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn user_record(&self, user_id: &UserId) -> Result<Option<UserRecord>, AuthzError> {
        Ok(self.store.user_record(user_id).await?)
    }

    /// Create or refresh an end-user record from identity-provider data.
    ///
    /// A caller may always sync their own profile fields. Syncing someone
    /// else's record, or carrying a `role` in the payload (even for the
    /// caller's own record), requires `edit_users`: the role feeds the
    /// self-service permission defaults and is a privileged field, same as
    /// [`set_user_role`](Self::set_user_role).
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if the sync needs `edit_users` and
    /// `actor` lacks it, `AuthzError::Store` on store failure.
    pub async fn sync_user(
        &self,
        actor: &UserId,
        sync: UserSync,
        meta: &RequestMeta,
    ) -> Result<UserRecord, AuthzError> {
        if actor != &sync.user_id || sync.role.is_some() {
            self.require(actor, Permission::EditUsers).await?;
        }
        let audit = audit_entry(
            actor,
            AuditAction::UpsertUser,
            AuditTargetType::UserRecord,
            sync.user_id.as_str(),
            serde_json::json!({ "role": sync.role }),
            meta,
        );
        let record = self.store.upsert_user_record(&sync, audit).await?;
        Ok(record)
    }

    /// Change an end-user's platform role. Requires `edit_users`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Denied` if `actor` lacks `edit_users`,
    /// `AuthzError::Store` with `NotFound` if no record exists.
    pub async fn set_user_role(
        &self,
        actor: &UserId,
        user_id: &UserId,
        role: UserRole,
        meta: &RequestMeta,
    ) -> Result<UserRecord, AuthzError> {
        self.require(actor, Permission::EditUsers).await?;
        let audit = audit_entry(
            actor,
            AuditAction::SetUserRole,
            AuditTargetType::UserRecord,
            user_id.as_str(),
            serde_json::json!({ "role": role }),
            meta,
        );
        let record = self.store.set_user_role(user_id, role, audit).await?;
        Ok(record)
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Read the audit log, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, AuthzError> {
        Ok(self.store.query_audit(query).await?)
    }

    /// Liveness probe against the backing store.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Store` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), AuthzError> {
        Ok(self.store.ping().await?)
    }
}

fn audit_entry(
    actor: &UserId,
    action: AuditAction,
    target_type: AuditTargetType,
    target_id: impl Into<String>,
    details: serde_json::Value,
    meta: &RequestMeta,
) -> NewAuditEntry {
    NewAuditEntry {
        actor: actor.clone(),
        action,
        target_type,
        target_id: target_id.into(),
        details,
        requester_ip: meta.ip.clone(),
        requester_agent: meta.agent.clone(),
    }
}
