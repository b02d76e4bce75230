//! `PostgreSQL` store backend.
//!
//! Each mutation runs in one transaction: effect rows and the audit row
//! commit together or not at all. The bootstrap gate rides on the primary
//! key of `authz.bootstrap_marker`, so concurrent bootstrap attempts
//! serialize on the row lock and exactly one caller wins.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use warden_core::{AdminRole, Permission, UserId, UserRole};

use super::{AuthzStore, StoreError};
use crate::models::{
    AdminRecord, AuditLogEntry, AuditQuery, NewAuditEntry, RoleOverride, UserRecord, UserSync,
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for admin record queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminRecordRow {
    user_id: String,
    role: AdminRole,
    permissions: Vec<String>,
    active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminRecordRow> for AdminRecord {
    type Error = StoreError;

    fn try_from(row: AdminRecordRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(row.user_id).map_err(|e| {
            StoreError::DataCorruption(format!("invalid user id in database: {e}"))
        })?;
        let created_by = row
            .created_by
            .map(UserId::parse)
            .transpose()
            .map_err(|e| {
                StoreError::DataCorruption(format!("invalid creator id in database: {e}"))
            })?;

        Ok(Self {
            user_id,
            role: row.role,
            permissions: permissions_from_rows(&row.permissions),
            active: row.active,
            created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for role override queries.
#[derive(Debug, sqlx::FromRow)]
struct RoleOverrideRow {
    role: AdminRole,
    permissions: Vec<String>,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleOverrideRow> for RoleOverride {
    type Error = StoreError;

    fn try_from(row: RoleOverrideRow) -> Result<Self, Self::Error> {
        let updated_by = UserId::parse(row.updated_by).map_err(|e| {
            StoreError::DataCorruption(format!("invalid updater id in database: {e}"))
        })?;

        Ok(Self {
            role: row.role,
            permissions: permissions_from_rows(&row.permissions),
            updated_by,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for user record queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRecordRow {
    user_id: String,
    email: String,
    name: String,
    avatar_url: Option<String>,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecordRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRecordRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(row.user_id).map_err(|e| {
            StoreError::DataCorruption(format!("invalid user id in database: {e}"))
        })?;
        let email = row.email.parse().map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            user_id,
            email,
            name: row.name,
            avatar_url: row.avatar_url,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for audit log queries.
#[derive(Debug, sqlx::FromRow)]
struct AuditLogRow {
    id: i64,
    actor: String,
    action: String,
    target_type: String,
    target_id: String,
    details: serde_json::Value,
    requester_ip: Option<String>,
    requester_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLogEntry {
    type Error = StoreError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let actor = UserId::parse(row.actor).map_err(|e| {
            StoreError::DataCorruption(format!("invalid actor id in database: {e}"))
        })?;
        let action = row
            .action
            .parse()
            .map_err(|e| StoreError::DataCorruption(format!("invalid audit row: {e}")))?;
        let target_type = row
            .target_type
            .parse()
            .map_err(|e| StoreError::DataCorruption(format!("invalid audit row: {e}")))?;

        Ok(Self {
            id: row.id,
            actor,
            action,
            target_type,
            target_id: row.target_id,
            details: row.details,
            requester_ip: row.requester_ip,
            requester_agent: row.requester_agent,
            created_at: row.created_at,
        })
    }
}

fn permissions_to_rows(set: &BTreeSet<Permission>) -> Vec<String> {
    set.iter().map(|p| p.as_str().to_owned()).collect()
}

/// Parse stored permission identifiers, dropping any no longer in the
/// catalog. An identifier retired from the catalog silently stops granting
/// rather than poisoning the whole record.
fn permissions_from_rows(rows: &[String]) -> BTreeSet<Permission> {
    rows.iter()
        .filter_map(|raw| match raw.parse::<Permission>() {
            Ok(p) => Some(p),
            Err(_) => {
                tracing::warn!(permission = %raw, "dropping unknown permission from stored set");
                None
            }
        })
        .collect()
}

async fn insert_audit(conn: &mut PgConnection, entry: &NewAuditEntry) -> Result<(), StoreError> {
    sqlx::query(
        r"
        INSERT INTO authz.audit_log
            (actor, action, target_type, target_id, details, requester_ip, requester_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(entry.actor.as_str())
    .bind(entry.action.as_str())
    .bind(entry.target_type.as_str())
    .bind(&entry.target_id)
    .bind(&entry.details)
    .bind(&entry.requester_ip)
    .bind(&entry.requester_agent)
    .execute(conn)
    .await?;
    Ok(())
}

// =============================================================================
// Store
// =============================================================================

const ADMIN_RECORD_COLUMNS: &str =
    "user_id, role, permissions, active, created_by, created_at, updated_at";
const USER_RECORD_COLUMNS: &str =
    "user_id, email, name, avatar_url, role, created_at, updated_at";

/// `PostgreSQL`-backed authorization store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthzStore for PgStore {
    async fn bootstrap_first_admin(
        &self,
        user_id: &UserId,
        permissions: &BTreeSet<Permission>,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The marker's primary key makes this a one-time gate: the second
        // concurrent transaction blocks on the row lock, then fails with a
        // unique violation once the first commits.
        sqlx::query("INSERT INTO authz.bootstrap_marker (id) VALUES (TRUE)")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::AlreadyBootstrapped;
                }
                StoreError::from(e)
            })?;

        // A super admin created through the normal promote path also
        // closes the bootstrap window.
        let super_admin_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM authz.admin_record WHERE role = $1 AND active)",
        )
        .bind(AdminRole::SuperAdmin)
        .fetch_one(&mut *tx)
        .await?;
        if super_admin_exists {
            return Err(StoreError::AlreadyBootstrapped);
        }

        let row = sqlx::query_as::<_, AdminRecordRow>(&format!(
            r"
            INSERT INTO authz.admin_record (user_id, role, permissions, active, created_by)
            VALUES ($1, $2, $3, TRUE, NULL)
            ON CONFLICT (user_id) DO UPDATE
            SET role = EXCLUDED.role,
                permissions = EXCLUDED.permissions,
                active = TRUE,
                updated_at = now()
            RETURNING {ADMIN_RECORD_COLUMNS}
            ",
        ))
        .bind(user_id)
        .bind(AdminRole::SuperAdmin)
        .bind(permissions_to_rows(permissions))
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn upsert_admin_record(
        &self,
        user_id: &UserId,
        role: AdminRole,
        permissions: &BTreeSet<Permission>,
        created_by: &UserId,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AdminRecordRow>(&format!(
            r"
            INSERT INTO authz.admin_record (user_id, role, permissions, active, created_by)
            VALUES ($1, $2, $3, TRUE, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET role = EXCLUDED.role,
                permissions = EXCLUDED.permissions,
                updated_at = now()
            RETURNING {ADMIN_RECORD_COLUMNS}
            ",
        ))
        .bind(user_id)
        .bind(role)
        .bind(permissions_to_rows(permissions))
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn set_admin_active(
        &self,
        user_id: &UserId,
        active: bool,
        audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, AdminRecordRow>(&format!(
            r"
            UPDATE authz.admin_record
            SET active = $2, updated_at = now()
            WHERE user_id = $1
            RETURNING {ADMIN_RECORD_COLUMNS}
            ",
        ))
        .bind(user_id)
        .bind(active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn admin_record(&self, user_id: &UserId) -> Result<Option<AdminRecord>, StoreError> {
        let row = sqlx::query_as::<_, AdminRecordRow>(&format!(
            "SELECT {ADMIN_RECORD_COLUMNS} FROM authz.admin_record WHERE user_id = $1",
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_admin_records(&self) -> Result<Vec<AdminRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AdminRecordRow>(&format!(
            r"
            SELECT {ADMIN_RECORD_COLUMNS}
            FROM authz.admin_record
            ORDER BY created_at DESC, user_id ASC
            ",
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn role_override(&self, role: AdminRole) -> Result<Option<RoleOverride>, StoreError> {
        let row = sqlx::query_as::<_, RoleOverrideRow>(
            r"
            SELECT role, permissions, updated_by, updated_at
            FROM authz.role_override
            WHERE role = $1
            ",
        )
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_role_permissions(
        &self,
        role: AdminRole,
        permissions: &BTreeSet<Permission>,
        updated_by: &UserId,
        audit: NewAuditEntry,
    ) -> Result<RoleOverride, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RoleOverrideRow>(
            r"
            INSERT INTO authz.role_override (role, permissions, updated_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (role) DO UPDATE
            SET permissions = EXCLUDED.permissions,
                updated_by = EXCLUDED.updated_by,
                updated_at = now()
            RETURNING role, permissions, updated_by, updated_at
            ",
        )
        .bind(role)
        .bind(permissions_to_rows(permissions))
        .bind(updated_by)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn reset_role_permissions(
        &self,
        role: AdminRole,
        audit: NewAuditEntry,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Absence of an override is a legal starting state; the reset is
        // audited either way.
        sqlx::query("DELETE FROM authz.role_override WHERE role = $1")
            .bind(role)
            .execute(&mut *tx)
            .await?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn user_record(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRecordRow>(&format!(
            "SELECT {USER_RECORD_COLUMNS} FROM authz.user_record WHERE user_id = $1",
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn upsert_user_record(
        &self,
        sync: &UserSync,
        audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRecordRow>(&format!(
            r"
            INSERT INTO authz.user_record (user_id, email, name, avatar_url, role)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'user'::authz.user_role))
            ON CONFLICT (user_id) DO UPDATE
            SET email = EXCLUDED.email,
                name = EXCLUDED.name,
                avatar_url = EXCLUDED.avatar_url,
                role = COALESCE($5, user_record.role),
                updated_at = now()
            RETURNING {USER_RECORD_COLUMNS}
            ",
        ))
        .bind(&sync.user_id)
        .bind(&sync.email)
        .bind(&sync.name)
        .bind(&sync.avatar_url)
        .bind(sync.role)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn set_user_role(
        &self,
        user_id: &UserId,
        role: UserRole,
        audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRecordRow>(&format!(
            r"
            UPDATE authz.user_record
            SET role = $2, updated_at = now()
            WHERE user_id = $1
            RETURNING {USER_RECORD_COLUMNS}
            ",
        ))
        .bind(user_id)
        .bind(role)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError> {
        let mut builder: sqlx::QueryBuilder<'_, sqlx::Postgres> = sqlx::QueryBuilder::new(
            "SELECT id, actor, action, target_type, target_id, details, \
             requester_ip, requester_agent, created_at \
             FROM authz.audit_log WHERE TRUE",
        );
        if let Some(actor) = &query.actor {
            builder.push(" AND actor = ").push_bind(actor.as_str());
        }
        if let Some(target_type) = query.target_type {
            builder
                .push(" AND target_type = ")
                .push_bind(target_type.as_str());
        }
        if let Some(target_id) = &query.target_id {
            builder.push(" AND target_id = ").push_bind(target_id);
        }
        if let Some(since) = query.since {
            builder.push(" AND created_at >= ").push_bind(since);
        }
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(query.effective_limit()));

        let rows: Vec<AuditLogRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
