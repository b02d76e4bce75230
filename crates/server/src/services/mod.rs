//! Business logic services for the authorization server.
//!
//! # Services
//!
//! - `authz` - Permission evaluation, admin directory, role overrides and
//!   the audit trail around them

pub mod authz;

pub use authz::{Authz, AuthzError, RequestMeta};
