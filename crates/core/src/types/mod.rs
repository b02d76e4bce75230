//! Core types for Warden.
//!
//! This module provides type-safe wrappers for the authorization domain.

pub mod access;
pub mod identity;
pub mod permission;
pub mod role;

pub use access::AccessState;
pub use identity::{Email, EmailError, UserId, UserIdError};
pub use permission::{Permission, PermissionDomain, PermissionParseError};
pub use role::{AdminRole, RoleParseError, UserRole};
