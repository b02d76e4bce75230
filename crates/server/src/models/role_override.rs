//! Stored role permission overrides.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::{AdminRole, Permission, UserId};

/// A persisted replacement for a role's compiled-in defaults.
///
/// When present, this set answers "what does the role grant" instead of the
/// defaults. Absence of a row means the defaults apply untouched.
#[derive(Debug, Clone, Serialize)]
pub struct RoleOverride {
    /// The role the override applies to.
    pub role: AdminRole,
    /// The full permission set for the role.
    pub permissions: BTreeSet<Permission>,
    /// Who last wrote the override.
    pub updated_by: UserId,
    /// When the override was last written.
    pub updated_at: DateTime<Utc>,
}
