//! Domain models for the authorization service.
//!
//! These are validated domain objects. Database row types live in the
//! store backends and convert into these via `TryFrom`, so anything holding
//! one of these structs can trust its contents.

pub mod admin_record;
pub mod audit;
pub mod role_override;
pub mod user_record;

pub use admin_record::AdminRecord;
pub use audit::{
    AuditAction, AuditLogEntry, AuditQuery, AuditTargetType, NewAuditEntry,
};
pub use role_override::RoleOverride;
pub use user_record::{UserRecord, UserSync};
