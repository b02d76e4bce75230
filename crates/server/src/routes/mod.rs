//! HTTP route handlers for the authorization service.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                              - Liveness check
//! GET   /health/ready                        - Readiness check (pings the store)
//!
//! # Access gate
//! POST  /api/access/resolve                  - Resolve {user_id, permission} to granted/denied
//! GET   /api/access/admin-panel/{user_id}    - Admin panel entry decision
//!
//! # Admin directory
//! POST  /api/admins/bootstrap                - One-time first super admin (caller identity)
//! GET   /api/admins                          - List admin records (page_admin_users)
//! POST  /api/admins                          - Create or promote (manage_admins)
//! GET   /api/admins/{user_id}                - Single record (page_admin_users)
//! PATCH /api/admins/{user_id}/active         - Activate/deactivate (manage_admins)
//! GET   /api/admins/{user_id}/permissions    - Effective permission set (self or page_admin_users)
//!
//! # Role permissions
//! GET    /api/roles                          - All roles with effective sets (manage_roles)
//! GET    /api/roles/{role}/permissions       - One role's effective set (manage_roles)
//! PUT    /api/roles/{role}/permissions       - Replace the set (manage_roles)
//! DELETE /api/roles/{role}/permissions       - Revert to compiled-in defaults (manage_roles)
//!
//! # Audit log
//! GET   /api/audit                           - Newest-first audit page (view_audit_log)
//!
//! # End-user directory
//! POST  /api/users/sync                      - Identity-provider profile sync (role field: edit_users)
//! GET   /api/users/{user_id}                 - User record (view_users)
//! PATCH /api/users/{user_id}/role            - Change platform role (edit_users)
//! ```
//!
//! Everything under `/api` passes the gateway middleware first. Permission
//! gates on mutations live in the service layer; the read gates noted above
//! are enforced here in the handlers.

pub mod access;
pub mod admins;
pub mod audit;
pub mod roles;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use warden_core::{AdminRole, Email, Permission, RoleParseError, UserId, UserRole};

use crate::error::AppError;
use crate::middleware;
use crate::state::AppState;

/// Create the `/api` router with the gateway middleware applied.
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/access", access::router())
        .nest("/admins", admins::router())
        .nest("/roles", roles::router())
        .nest("/audit", audit::router())
        .nest("/users", users::router())
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::gateway,
        ))
}

/// Build the complete application router.
///
/// Sentry layers are applied by the binary on top of this, so tests can
/// drive the router without a Sentry client.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(state.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.authz().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// =============================================================================
// Wire-boundary parsing
// =============================================================================

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    UserId::parse(raw).map_err(|err| AppError::Validation(format!("invalid user id: {err}")))
}

pub(crate) fn parse_email(raw: &str) -> Result<Email, AppError> {
    Email::parse(raw).map_err(|err| AppError::Validation(format!("invalid email: {err}")))
}

pub(crate) fn parse_admin_role(raw: &str) -> Result<AdminRole, AppError> {
    raw.parse()
        .map_err(|err: RoleParseError| AppError::Validation(err.to_string()))
}

pub(crate) fn parse_user_role(raw: &str) -> Result<UserRole, AppError> {
    raw.parse()
        .map_err(|err: RoleParseError| AppError::Validation(err.to_string()))
}

/// Parse a wire permission list, rejecting identifiers outside the catalog.
pub(crate) fn parse_permissions(
    raw: &[String],
) -> Result<std::collections::BTreeSet<Permission>, AppError> {
    raw.iter()
        .map(|s| {
            s.parse::<Permission>()
                .map_err(|err| AppError::Validation(err.to_string()))
        })
        .collect()
}
