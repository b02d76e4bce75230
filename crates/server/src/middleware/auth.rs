//! Gateway trust and caller identity extraction.
//!
//! The service sits behind an identity-aware gateway that authenticates end
//! users and forwards requests with a shared token and identity headers.
//! The middleware here verifies the token, extracts the forwarded caller
//! identity and request metadata, and exposes them to route handlers
//! through request extensions.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use warden_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::RequestMeta;
use crate::state::AppState;

/// Shared-secret header the gateway sets on every forwarded request.
pub const GATEWAY_TOKEN_HEADER: &str = "x-warden-gateway-token";

/// Verified end-user identity forwarded by the gateway.
pub const USER_ID_HEADER: &str = "x-warden-user-id";

/// Caller identity attached to every request that passed the gateway
/// middleware.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// Verified end-user id. Absent for anonymous requests and whenever
    /// the gateway trust chain is not established.
    pub user_id: Option<UserId>,
    /// Request provenance recorded on audit entries.
    pub meta: RequestMeta,
}

/// Gateway middleware for the `/api` surface.
///
/// When a gateway token is configured, every request must present it and
/// the identity header is trusted only behind a matching token. Without a
/// configured token no forwarded identity is ever accepted, so every
/// actor-gated route answers 401.
pub async fn gateway(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user_id = match state.config().gateway_token() {
        Some(expected) => {
            let presented = request
                .headers()
                .get(GATEWAY_TOKEN_HEADER)
                .and_then(|value| value.to_str().ok());
            if presented != Some(expected.expose_secret()) {
                return AppError::Unauthorized("missing or invalid gateway token".to_string())
                    .into_response();
            }
            forwarded_user_id(request.headers())
        }
        None => None,
    };

    if let Some(ref id) = user_id {
        set_sentry_user(id);
        tracing::Span::current().record("user_id", id.as_str());
    }

    let identity = CallerIdentity {
        user_id,
        meta: request_meta(request.headers()),
    };
    request.extensions_mut().insert(identity);

    next.run(request).await
}

/// Parse the forwarded identity header. Malformed values are dropped, so
/// the request proceeds as anonymous.
fn forwarded_user_id(headers: &HeaderMap) -> Option<UserId> {
    let raw = headers.get(USER_ID_HEADER)?.to_str().ok()?;
    match UserId::parse(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(error = %err, "Rejecting malformed identity header");
            None
        }
    }
}

/// Capture request provenance from the forwarding headers.
fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    RequestMeta { ip, agent }
}

/// Extractor that requires a verified caller identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireActor(actor): RequireActor,
/// ) -> impl IntoResponse {
///     format!("Hello, {actor}!")
/// }
/// ```
pub struct RequireActor(pub UserId);

/// Error returned when a verified caller identity is required but absent.
pub enum ActorRejection {
    /// No identity was forwarded, or the gateway trust chain is missing.
    Unauthenticated,
}

impl IntoResponse for ActorRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                AppError::Unauthorized("authentication required".to_string()).into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireActor
where
    S: Send + Sync,
{
    type Rejection = ActorRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .and_then(|identity| identity.user_id.clone())
            .map(Self)
            .ok_or(ActorRejection::Unauthenticated)
    }
}

/// Extractor for the request provenance captured by the gateway
/// middleware. Never rejects; defaults to empty metadata off the `/api`
/// surface.
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let meta = parts
            .extensions
            .get::<CallerIdentity>()
            .map(|identity| identity.meta.clone())
            .unwrap_or_default();
        Ok(Self(meta))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_user_id_accepts_valid_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("user_abc123"));
        assert_eq!(
            forwarded_user_id(&headers).map(UserId::into_string),
            Some("user_abc123".to_string())
        );
    }

    #[test]
    fn test_forwarded_user_id_drops_malformed_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("has spaces"));
        assert!(forwarded_user_id(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(""));
        assert!(forwarded_user_id(&headers).is_none());
    }

    #[test]
    fn test_request_meta_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0"),
        );

        let meta = request_meta(&headers);
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_request_meta_tolerates_missing_headers() {
        let meta = request_meta(&HeaderMap::new());
        assert!(meta.ip.is_none());
        assert!(meta.agent.is_none());
    }
}
