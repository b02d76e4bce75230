//! Warden authorization service library.
//!
//! This crate provides the role-based permission service as a library so
//! the router and service layer can be tested and reused.
//!
//! # Architecture
//!
//! - Axum web framework behind an identity-aware gateway
//! - `PostgreSQL` (or an in-memory store) behind the `AuthzStore` trait
//! - Closed permission catalog and role types from `warden-core`
//! - Append-only audit log written atomically with every privileged
//!   mutation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
