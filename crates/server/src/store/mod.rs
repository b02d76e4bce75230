//! Storage backends for the authorization state.
//!
//! # Tables (postgres backend, schema `authz`)
//!
//! - `admin_record` - Admin directory: role, additive grants, active flag
//! - `bootstrap_marker` - Single-row gate for the one-time first-admin bootstrap
//! - `role_override` - Stored replacements for a role's compiled-in defaults
//! - `user_record` - End-user mirror consulted for self-service permissions
//! - `audit_log` - Append-only record of every privileged mutation
//!
//! # Atomicity
//!
//! Every mutating method takes the prepared [`NewAuditEntry`] and persists it
//! in the same transaction as the effect. There is no path that commits a
//! privileged change without its audit row.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p warden-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use warden_core::{AdminRole, Permission, UserId, UserRole};

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    AdminRecord, AuditLogEntry, AuditQuery, NewAuditEntry, RoleOverride, UserRecord, UserSync,
};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The one-time bootstrap gate has already fired.
    #[error("already bootstrapped")]
    AlreadyBootstrapped,

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store is unreachable or timed out. Retryable; must never be
    /// interpreted as a denial.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other database error.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(e.to_string())
            }
            other => Self::Database(other),
        }
    }
}

/// Persistence contract for the authorization service.
///
/// Implementations must make each mutating call atomic with its audit entry
/// and must make [`bootstrap_first_admin`](AuthzStore::bootstrap_first_admin)
/// an at-most-one-winner operation under concurrent callers.
#[async_trait]
pub trait AuthzStore: Send + Sync {
    /// One-time creation of the first super admin.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyBootstrapped`] if the gate has fired
    /// before or an active super admin already exists.
    async fn bootstrap_first_admin(
        &self,
        user_id: &UserId,
        permissions: &BTreeSet<Permission>,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError>;

    /// Create an admin record, or update role and grants of an existing one.
    ///
    /// `created_by` is stored on first creation only; the active flag is
    /// left untouched on update.
    async fn upsert_admin_record(
        &self,
        user_id: &UserId,
        role: AdminRole,
        permissions: &BTreeSet<Permission>,
        created_by: &UserId,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError>;

    /// Toggle an admin record's active flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists.
    async fn set_admin_active(
        &self,
        user_id: &UserId,
        active: bool,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError>;

    /// Look up an admin record.
    async fn admin_record(&self, user_id: &UserId) -> Result<Option<AdminRecord>, StoreError>;

    /// All admin records, newest first.
    async fn list_admin_records(&self) -> Result<Vec<AdminRecord>, StoreError>;

    /// The stored override for a role, if any.
    async fn role_override(&self, role: AdminRole) -> Result<Option<RoleOverride>, StoreError>;

    /// Replace a role's permission set.
    async fn set_role_permissions(
        &self,
        role: AdminRole,
        permissions: &BTreeSet<Permission>,
        updated_by: &UserId,
        audit: NewAuditEntry,
    ) -> Result<RoleOverride, StoreError>;

    /// Delete a role's override, reverting it to the compiled-in defaults.
    ///
    /// Succeeds (and still audits) when no override exists.
    async fn reset_role_permissions(
        &self,
        role: AdminRole,
        audit: NewAuditEntry,
    ) -> Result<(), StoreError>;

    /// Look up an end-user record.
    async fn user_record(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Create or refresh an end-user record from identity-provider data.
    async fn upsert_user_record(
        &self,
        sync: &UserSync,
        audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError>;

    /// Change an end-user's platform role.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists.
    async fn set_user_role(
        &self,
        user_id: &UserId,
        role: UserRole,
        audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError>;

    /// Read the audit log, newest first.
    async fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError>;

    /// Liveness probe against the backing store.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
