//! Warden Core - Shared types library.
//!
//! This crate provides the common types used across all Warden components:
//! - `server` - The authorization service (HTTP API)
//! - `cli` - Command-line tools for migrations and admin management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - The permission catalog, role enums with compiled-in
//!   defaults, validated identity newtypes, and the access gate contract

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
