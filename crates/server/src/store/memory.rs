//! In-process store backend.
//!
//! Backs development and tests. A single mutex guards all state, so each
//! operation is atomic exactly like a database transaction, including the
//! audit append.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use warden_core::{AdminRole, Permission, UserId, UserRole};

use super::{AuthzStore, StoreError};
use crate::models::{
    AdminRecord, AuditLogEntry, AuditQuery, NewAuditEntry, RoleOverride, UserRecord, UserSync,
};

#[derive(Default)]
struct MemoryState {
    bootstrapped: bool,
    admins: HashMap<UserId, AdminRecord>,
    role_overrides: HashMap<AdminRole, RoleOverride>,
    users: HashMap<UserId, UserRecord>,
    audit: Vec<AuditLogEntry>,
    next_audit_id: i64,
}

impl MemoryState {
    fn append_audit(&mut self, entry: NewAuditEntry) {
        self.next_audit_id += 1;
        self.audit.push(AuditLogEntry {
            id: self.next_audit_id,
            actor: entry.actor,
            action: entry.action,
            target_type: entry.target_type,
            target_id: entry.target_id,
            details: entry.details,
            requester_ip: entry.requester_ip,
            requester_agent: entry.requester_agent,
            created_at: Utc::now(),
        });
    }

    fn has_active_super_admin(&self) -> bool {
        self.admins.values().any(AdminRecord::is_active_super_admin)
    }
}

/// Authorization store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthzStore for MemoryStore {
    async fn bootstrap_first_admin(
        &self,
        user_id: &UserId,
        permissions: &BTreeSet<Permission>,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        let mut state = self.state.lock().await;
        if state.bootstrapped || state.has_active_super_admin() {
            return Err(StoreError::AlreadyBootstrapped);
        }

        let now = Utc::now();
        let record = AdminRecord {
            user_id: user_id.clone(),
            role: AdminRole::SuperAdmin,
            permissions: permissions.clone(),
            active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        state.bootstrapped = true;
        state.admins.insert(user_id.clone(), record.clone());
        state.append_audit(audit);
        Ok(record)
    }

    async fn upsert_admin_record(
        &self,
        user_id: &UserId,
        role: AdminRole,
        permissions: &BTreeSet<Permission>,
        created_by: &UserId,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let record = match state.admins.get(user_id) {
            Some(existing) => AdminRecord {
                user_id: user_id.clone(),
                role,
                permissions: permissions.clone(),
                active: existing.active,
                created_by: existing.created_by.clone(),
                created_at: existing.created_at,
                updated_at: now,
            },
            None => AdminRecord {
                user_id: user_id.clone(),
                role,
                permissions: permissions.clone(),
                active: true,
                created_by: Some(created_by.clone()),
                created_at: now,
                updated_at: now,
            },
        };
        state.admins.insert(user_id.clone(), record.clone());
        state.append_audit(audit);
        Ok(record)
    }

    async fn set_admin_active(
        &self,
        user_id: &UserId,
        active: bool,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let record = match state.admins.get_mut(user_id) {
            Some(record) => {
                record.active = active;
                record.updated_at = now;
                record.clone()
            }
            None => return Err(StoreError::NotFound),
        };
        state.append_audit(audit);
        Ok(record)
    }

    async fn admin_record(&self, user_id: &UserId) -> Result<Option<AdminRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.admins.get(user_id).cloned())
    }

    async fn list_admin_records(&self) -> Result<Vec<AdminRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut records: Vec<AdminRecord> = state.admins.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(records)
    }

    async fn role_override(&self, role: AdminRole) -> Result<Option<RoleOverride>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.role_overrides.get(&role).cloned())
    }

    async fn set_role_permissions(
        &self,
        role: AdminRole,
        permissions: &BTreeSet<Permission>,
        updated_by: &UserId,
        audit: NewAuditEntry,
    ) -> Result<RoleOverride, StoreError> {
        let mut state = self.state.lock().await;
        let override_row = RoleOverride {
            role,
            permissions: permissions.clone(),
            updated_by: updated_by.clone(),
            updated_at: Utc::now(),
        };
        state.role_overrides.insert(role, override_row.clone());
        state.append_audit(audit);
        Ok(override_row)
    }

    async fn reset_role_permissions(
        &self,
        role: AdminRole,
        audit: NewAuditEntry,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.role_overrides.remove(&role);
        state.append_audit(audit);
        Ok(())
    }

    async fn user_record(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.get(user_id).cloned())
    }

    async fn upsert_user_record(
        &self,
        sync: &UserSync,
        audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let record = match state.users.get(&sync.user_id) {
            Some(existing) => UserRecord {
                user_id: sync.user_id.clone(),
                email: sync.email.clone(),
                name: sync.name.clone(),
                avatar_url: sync.avatar_url.clone(),
                role: sync.role.unwrap_or(existing.role),
                created_at: existing.created_at,
                updated_at: now,
            },
            None => UserRecord {
                user_id: sync.user_id.clone(),
                email: sync.email.clone(),
                name: sync.name.clone(),
                avatar_url: sync.avatar_url.clone(),
                role: sync.role.unwrap_or(UserRole::User),
                created_at: now,
                updated_at: now,
            },
        };
        state.users.insert(sync.user_id.clone(), record.clone());
        state.append_audit(audit);
        Ok(record)
    }

    async fn set_user_role(
        &self,
        user_id: &UserId,
        role: UserRole,
        audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError> {
        let mut state = self.state.lock().await;
        let record = match state.users.get_mut(user_id) {
            Some(record) => {
                record.role = role;
                record.updated_at = Utc::now();
                record.clone()
            }
            None => return Err(StoreError::NotFound),
        };
        state.append_audit(audit);
        Ok(record)
    }

    async fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError> {
        let state = self.state.lock().await;
        let limit = usize::try_from(query.effective_limit()).unwrap_or(usize::MAX);
        let entries = state
            .audit
            .iter()
            .rev()
            .filter(|entry| {
                query.actor.as_ref().is_none_or(|a| entry.actor == *a)
                    && query.target_type.is_none_or(|t| entry.target_type == t)
                    && query
                        .target_id
                        .as_ref()
                        .is_none_or(|t| entry.target_id == *t)
                    && query.since.is_none_or(|s| entry.created_at >= s)
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(entries)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{AuditAction, AuditTargetType};

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn entry(actor: &str, action: AuditAction, target_id: &str) -> NewAuditEntry {
        NewAuditEntry {
            actor: uid(actor),
            action,
            target_type: AuditTargetType::AdminRecord,
            target_id: target_id.to_string(),
            details: serde_json::Value::Null,
            requester_ip: None,
            requester_agent: None,
        }
    }

    fn full_catalog() -> BTreeSet<Permission> {
        Permission::catalog().iter().copied().collect()
    }

    #[tokio::test]
    async fn test_bootstrap_succeeds_once() {
        let store = MemoryStore::new();
        let record = store
            .bootstrap_first_admin(
                &uid("u1"),
                &full_catalog(),
                entry("u1", AuditAction::BootstrapFirstAdmin, "u1"),
            )
            .await
            .unwrap();
        assert_eq!(record.role, AdminRole::SuperAdmin);
        assert!(record.active);
        assert!(record.created_by.is_none());

        let err = store
            .bootstrap_first_admin(
                &uid("u2"),
                &full_catalog(),
                entry("u2", AuditAction::BootstrapFirstAdmin, "u2"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyBootstrapped));
    }

    #[tokio::test]
    async fn test_bootstrap_blocked_once_a_super_admin_exists() {
        let store = MemoryStore::new();
        store
            .upsert_admin_record(
                &uid("u9"),
                AdminRole::SuperAdmin,
                &BTreeSet::new(),
                &uid("u0"),
                entry("u0", AuditAction::CreateOrPromoteAdmin, "u9"),
            )
            .await
            .unwrap();

        let err = store
            .bootstrap_first_admin(
                &uid("u1"),
                &full_catalog(),
                entry("u1", AuditAction::BootstrapFirstAdmin, "u1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyBootstrapped));
    }

    #[tokio::test]
    async fn test_concurrent_bootstrap_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = format!("u{i}");
                store
                    .bootstrap_first_admin(
                        &uid(&id),
                        &full_catalog(),
                        entry(&id, AuditAction::BootstrapFirstAdmin, &id),
                    )
                    .await
            }));
        }

        let mut winners = 0;
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(StoreError::AlreadyBootstrapped) => losers += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(losers, 7);
    }

    #[tokio::test]
    async fn test_upsert_preserves_creation_facts() {
        let store = MemoryStore::new();
        let created = store
            .upsert_admin_record(
                &uid("u1"),
                AdminRole::Support,
                &BTreeSet::new(),
                &uid("boss"),
                entry("boss", AuditAction::CreateOrPromoteAdmin, "u1"),
            )
            .await
            .unwrap();
        assert_eq!(created.created_by, Some(uid("boss")));
        assert!(created.active);

        store
            .set_admin_active(
                &uid("u1"),
                false,
                entry("boss", AuditAction::SetAdminActive, "u1"),
            )
            .await
            .unwrap();

        let promoted = store
            .upsert_admin_record(
                &uid("u1"),
                AdminRole::Admin,
                &BTreeSet::new(),
                &uid("other"),
                entry("other", AuditAction::CreateOrPromoteAdmin, "u1"),
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, AdminRole::Admin);
        // Creator and active flag survive a promote
        assert_eq!(promoted.created_by, Some(uid("boss")));
        assert!(!promoted.active);
        assert_eq!(promoted.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_set_active_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .set_admin_active(
                &uid("ghost"),
                false,
                entry("boss", AuditAction::SetAdminActive, "ghost"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        // Failed mutations must not audit
        let entries = store.query_audit(&AuditQuery::default()).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_role_override_set_and_reset() {
        let store = MemoryStore::new();
        let set: BTreeSet<Permission> =
            [Permission::ViewUsers, Permission::ManageSubscriptions]
                .into_iter()
                .collect();
        let row = store
            .set_role_permissions(
                AdminRole::Support,
                &set,
                &uid("boss"),
                entry("boss", AuditAction::UpdateRolePermissions, "support"),
            )
            .await
            .unwrap();
        assert_eq!(row.permissions, set);

        let stored = store.role_override(AdminRole::Support).await.unwrap();
        assert_eq!(stored.unwrap().permissions, set);

        store
            .reset_role_permissions(
                AdminRole::Support,
                entry("boss", AuditAction::ResetRolePermissions, "support"),
            )
            .await
            .unwrap();
        assert!(store.role_override(AdminRole::Support).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_without_override_succeeds_and_audits() {
        let store = MemoryStore::new();
        store
            .reset_role_permissions(
                AdminRole::Admin,
                entry("boss", AuditAction::ResetRolePermissions, "admin"),
            )
            .await
            .unwrap();
        let entries = store.query_audit(&AuditQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_each_mutation_appends_exactly_one_entry() {
        let store = MemoryStore::new();
        store
            .upsert_admin_record(
                &uid("u1"),
                AdminRole::Support,
                &BTreeSet::new(),
                &uid("boss"),
                entry("boss", AuditAction::CreateOrPromoteAdmin, "u1"),
            )
            .await
            .unwrap();
        store
            .set_admin_active(
                &uid("u1"),
                false,
                entry("boss", AuditAction::SetAdminActive, "u1"),
            )
            .await
            .unwrap();
        store
            .set_role_permissions(
                AdminRole::Support,
                &BTreeSet::new(),
                &uid("boss"),
                entry("boss", AuditAction::UpdateRolePermissions, "support"),
            )
            .await
            .unwrap();

        let entries = store.query_audit(&AuditQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_audit_query_newest_first_with_filters() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .upsert_admin_record(
                    &uid(&format!("u{i}")),
                    AdminRole::Support,
                    &BTreeSet::new(),
                    &uid("boss"),
                    entry("boss", AuditAction::CreateOrPromoteAdmin, &format!("u{i}")),
                )
                .await
                .unwrap();
        }
        store
            .set_admin_active(
                &uid("u0"),
                false,
                entry("deputy", AuditAction::SetAdminActive, "u0"),
            )
            .await
            .unwrap();

        let all = store.query_audit(&AuditQuery::default()).await.unwrap();
        assert_eq!(all.len(), 6);
        // Newest first: ids strictly decreasing
        assert!(all.windows(2).all(|w| w[0].id > w[1].id));

        let by_actor = store
            .query_audit(&AuditQuery {
                actor: Some(uid("deputy")),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_actor.len(), 1);
        assert_eq!(by_actor[0].action, AuditAction::SetAdminActive);

        let by_target = store
            .query_audit(&AuditQuery {
                target_id: Some("u0".to_string()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_target.len(), 2);

        let limited = store
            .query_audit(&AuditQuery {
                limit: Some(2),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_user_sync_preserves_role_unless_given() {
        let store = MemoryStore::new();
        let sync = UserSync {
            user_id: uid("u1"),
            email: "ada@example.com".parse().unwrap(),
            name: "Ada".to_string(),
            avatar_url: None,
            role: None,
        };
        let created = store
            .upsert_user_record(&sync, entry("gateway", AuditAction::UpsertUser, "u1"))
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::User);

        store
            .set_user_role(
                &uid("u1"),
                UserRole::Admin,
                entry("boss", AuditAction::SetUserRole, "u1"),
            )
            .await
            .unwrap();

        // Re-sync without a role keeps the elevated role
        let resynced = store
            .upsert_user_record(&sync, entry("gateway", AuditAction::UpsertUser, "u1"))
            .await
            .unwrap();
        assert_eq!(resynced.role, UserRole::Admin);
        assert_eq!(resynced.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_set_user_role_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .set_user_role(
                &uid("ghost"),
                UserRole::Admin,
                entry("boss", AuditAction::SetUserRole, "ghost"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
