//! HTTP middleware stack for the authorization service.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, continue traces)
//! 2. `TraceLayer` (request tracing with latency)
//! 3. Gateway middleware (shared-token check, caller identity extraction)
//!
//! The gateway middleware is applied to the `/api` router only; the health
//! endpoints stay open for the platform's probes.

pub mod auth;

pub use auth::{CallerIdentity, ClientMeta, RequireActor, gateway};
