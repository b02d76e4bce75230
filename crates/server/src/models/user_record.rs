//! End-user directory domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::{Email, UserId, UserRole};

/// Profile fields pushed by the gateway when a user signs in or changes.
///
/// `role` of `None` preserves whatever role the record already has
/// (defaulting to `user` on first sync), so routine profile syncs can
/// never demote anyone.
#[derive(Debug, Clone)]
pub struct UserSync {
    pub user_id: UserId,
    pub email: Email,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: Option<UserRole>,
}

/// A platform user as mirrored from the identity provider.
///
/// Only consulted for the self-service permission namespace; admin-panel
/// checks never read this table.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    /// Identity-provider ID of the user.
    pub user_id: UserId,
    /// The user's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Avatar image URL, if the provider supplied one.
    pub avatar_url: Option<String>,
    /// Platform role, drives self-service defaults.
    pub role: UserRole,
    /// When the record was first synced.
    pub created_at: DateTime<Utc>,
    /// When the record was last synced or updated.
    pub updated_at: DateTime<Utc>,
}
