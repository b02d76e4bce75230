//! Integration tests for Warden.
//!
//! Builds the full application router on the in-memory store so tests can
//! drive the real HTTP surface without a database or a running gateway.
//! Requests pass the same middleware stack as production, including the
//! gateway token check. A store that refuses every call is available for
//! pinning down outage behavior.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p warden-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `access_gate` - Gateway trust, health probes, fail-closed and outage behavior
//! - `admin_directory` - Bootstrap, promotion, deactivation, effective permissions
//! - `role_permissions` - Role override replace and reset over the API
//! - `audit_trail` - Audit entries and filters for every privileged mutation
//! - `user_directory` - Profile sync, lookup gate, and platform role changes
//! - `authorization_flow` - Decision sequencing through the service layer
//! - `bootstrap_race` - Concurrent bootstrap has exactly one winner

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use secrecy::SecretString;
use serde_json::Value;
use tower::util::ServiceExt;

use warden_core::{AdminRole, Permission, UserId, UserRole};
use warden_server::config::{ServerConfig, StoreBackend};
use warden_server::middleware::auth::{GATEWAY_TOKEN_HEADER, USER_ID_HEADER};
use warden_server::models::{
    AdminRecord, AuditLogEntry, AuditQuery, NewAuditEntry, RoleOverride, UserRecord, UserSync,
};
use warden_server::routes;
use warden_server::services::Authz;
use warden_server::state::AppState;
use warden_server::store::{AuthzStore, MemoryStore, StoreError};

/// Gateway token wired into every test context.
pub const GATEWAY_TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// A fresh application over an empty in-memory store.
pub struct TestContext {
    app: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Context with the gateway token configured, as deployed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_gateway_token(Some(SecretString::from(GATEWAY_TOKEN)))
    }

    /// Context without a gateway token: forwarded identities are never
    /// trusted, so every actor-gated route answers 401.
    #[must_use]
    pub fn without_gateway_token() -> Self {
        Self::with_gateway_token(None)
    }

    /// Context over a store that refuses every call with
    /// [`StoreError::Unavailable`], as during a database outage.
    #[must_use]
    pub fn with_unreachable_store() -> Self {
        Self::over_store(
            Some(SecretString::from(GATEWAY_TOKEN)),
            Arc::new(UnreachableStore),
        )
    }

    fn with_gateway_token(gateway_token: Option<SecretString>) -> Self {
        Self::over_store(gateway_token, Arc::new(MemoryStore::new()))
    }

    fn over_store(gateway_token: Option<SecretString>, store: Arc<dyn AuthzStore>) -> Self {
        let config = ServerConfig {
            database_url: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            store: StoreBackend::Memory,
            gateway_token,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };
        let authz = Authz::new(store);
        Self {
            app: routes::app(AppState::new(config, authz)),
        }
    }

    /// Drive one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the router errors, which it cannot short of a harness bug.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router must answer every request")
    }

    pub async fn get(&self, uri: &str, actor: Option<&str>) -> Response {
        self.send(authed_request(Method::GET, uri, actor, None)).await
    }

    pub async fn post(&self, uri: &str, actor: Option<&str>, body: &Value) -> Response {
        self.send(authed_request(Method::POST, uri, actor, Some(body)))
            .await
    }

    pub async fn post_empty(&self, uri: &str, actor: Option<&str>) -> Response {
        self.send(authed_request(Method::POST, uri, actor, None))
            .await
    }

    pub async fn put(&self, uri: &str, actor: Option<&str>, body: &Value) -> Response {
        self.send(authed_request(Method::PUT, uri, actor, Some(body)))
            .await
    }

    pub async fn patch(&self, uri: &str, actor: Option<&str>, body: &Value) -> Response {
        self.send(authed_request(Method::PATCH, uri, actor, Some(body)))
            .await
    }

    pub async fn delete(&self, uri: &str, actor: Option<&str>) -> Response {
        self.send(authed_request(Method::DELETE, uri, actor, None))
            .await
    }

    /// Bootstrap `user_id` as the first super admin.
    ///
    /// # Panics
    ///
    /// Panics unless the server answers 201, so a broken precondition fails
    /// the test immediately.
    pub async fn bootstrap(&self, user_id: &str) {
        let response = self
            .post_empty("/api/admins/bootstrap", Some(user_id))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "bootstrap should create the first admin"
        );
    }

    /// Promote `user_id` to `role` with additive `grants`, acting as `actor`.
    ///
    /// # Panics
    ///
    /// Panics unless the server answers 200.
    pub async fn promote(&self, actor: &str, user_id: &str, role: &str, grants: &[&str]) {
        let body = serde_json::json!({
            "user_id": user_id,
            "role": role,
            "permissions": grants,
        });
        let response = self.post("/api/admins", Some(actor), &body).await;
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "promote should upsert the admin record"
        );
    }
}

/// Build a request carrying the gateway token and, optionally, a forwarded
/// caller identity.
///
/// # Panics
///
/// Panics if `uri` does not parse.
#[must_use]
pub fn authed_request(
    method: Method,
    uri: &str,
    actor: Option<&str>,
    body: Option<&Value>,
) -> Request<Body> {
    request_with_token(method, uri, Some(GATEWAY_TOKEN), actor, body)
}

/// Build a request with full control over the presented gateway token.
///
/// # Panics
///
/// Panics if `uri` does not parse.
#[must_use]
pub fn request_with_token(
    method: Method,
    uri: &str,
    token: Option<&str>,
    actor: Option<&str>,
    body: Option<&Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(GATEWAY_TOKEN_HEADER, token);
    }
    if let Some(actor) = actor {
        builder = builder.header(USER_ID_HEADER, actor);
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("test request must build")
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not valid JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body must be readable");
    serde_json::from_slice(&bytes).expect("response body must be JSON")
}

/// A service-layer handle over a fresh in-memory store, for tests that
/// bypass HTTP.
#[must_use]
pub fn authz() -> Authz {
    Authz::new(Arc::new(MemoryStore::new()))
}

/// A store whose every call fails with [`StoreError::Unavailable`], for
/// tests that pin down how the service surfaces an outage.
pub struct UnreachableStore;

fn outage() -> StoreError {
    StoreError::Unavailable("connection pool timed out".to_string())
}

#[async_trait]
impl AuthzStore for UnreachableStore {
    async fn bootstrap_first_admin(
        &self,
        _user_id: &UserId,
        _permissions: &BTreeSet<Permission>,
        _audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        Err(outage())
    }

    async fn upsert_admin_record(
        &self,
        _user_id: &UserId,
        _role: AdminRole,
        _permissions: &BTreeSet<Permission>,
        _created_by: &UserId,
        _audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        Err(outage())
    }

    async fn set_admin_active(
        &self,
        _user_id: &UserId,
        _active: bool,
        _audit: NewAuditEntry,
    ) -> Result<AdminRecord, StoreError> {
        Err(outage())
    }

    async fn admin_record(&self, _user_id: &UserId) -> Result<Option<AdminRecord>, StoreError> {
        Err(outage())
    }

    async fn list_admin_records(&self) -> Result<Vec<AdminRecord>, StoreError> {
        Err(outage())
    }

    async fn role_override(&self, _role: AdminRole) -> Result<Option<RoleOverride>, StoreError> {
        Err(outage())
    }

    async fn set_role_permissions(
        &self,
        _role: AdminRole,
        _permissions: &BTreeSet<Permission>,
        _updated_by: &UserId,
        _audit: NewAuditEntry,
    ) -> Result<RoleOverride, StoreError> {
        Err(outage())
    }

    async fn reset_role_permissions(
        &self,
        _role: AdminRole,
        _audit: NewAuditEntry,
    ) -> Result<(), StoreError> {
        Err(outage())
    }

    async fn user_record(&self, _user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Err(outage())
    }

    async fn upsert_user_record(
        &self,
        _sync: &UserSync,
        _audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError> {
        Err(outage())
    }

    async fn set_user_role(
        &self,
        _user_id: &UserId,
        _role: UserRole,
        _audit: NewAuditEntry,
    ) -> Result<UserRecord, StoreError> {
        Err(outage())
    }

    async fn query_audit(&self, _query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError> {
        Err(outage())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(outage())
    }
}
