//! Gateway trust and access gate behavior over the HTTP surface.
//!
//! The access gate must fail closed: malformed identifiers and unknown
//! permission strings answer `denied`, never an error, and nothing under
//! `/api` is reachable without the gateway token. A store outage is the
//! one thing that is not a decision: it surfaces as a retryable 503.

#![allow(clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use serde_json::json;
use warden_integration_tests::{TestContext, body_json, request_with_token};

// =============================================================================
// Health Probes
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_gateway_token() {
    let ctx = TestContext::new();
    let response = ctx
        .send(request_with_token(Method::GET, "/health", None, None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_ok_on_reachable_store() {
    let ctx = TestContext::new();
    let response = ctx
        .send(request_with_token(
            Method::GET,
            "/health/ready",
            None,
            None,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Gateway Token
// =============================================================================

#[tokio::test]
async fn test_missing_gateway_token_is_unauthorized() {
    let ctx = TestContext::new();
    let response = ctx
        .send(request_with_token(
            Method::POST,
            "/api/access/resolve",
            None,
            None,
            Some(&json!({"user_id": "u1", "permission": "view_users"})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_gateway_token_is_unauthorized() {
    let ctx = TestContext::new();
    let response = ctx
        .send(request_with_token(
            Method::GET,
            "/api/admins",
            Some("definitely-not-the-shared-secret"),
            Some("root"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unconfigured_token_never_trusts_identity_headers() {
    let ctx = TestContext::without_gateway_token();
    // The identity header is present but there is no token to vouch for it.
    let response = ctx.post_empty("/api/admins/bootstrap", Some("root")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_actor_gated_route_requires_identity_header() {
    let ctx = TestContext::new();
    let response = ctx.get("/api/admins", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized: authentication required");
}

// =============================================================================
// Access Gate
// =============================================================================

#[tokio::test]
async fn test_resolve_grants_a_held_permission() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;

    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "root", "permission": "manage_admins"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "granted");
}

#[tokio::test]
async fn test_resolve_denies_an_unknown_user() {
    let ctx = TestContext::new();
    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "stranger", "permission": "view_users"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "denied");
}

#[tokio::test]
async fn test_resolve_fails_closed_on_unknown_permission() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;

    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "root", "permission": "launch_missiles"}),
        )
        .await;
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "an unknown permission is a denial, not an error"
    );
    assert_eq!(body_json(response).await["status"], "denied");
}

#[tokio::test]
async fn test_resolve_fails_closed_on_malformed_user_id() {
    let ctx = TestContext::new();
    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "has whitespace", "permission": "view_users"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "denied");
}

// =============================================================================
// Admin Panel Gate
// =============================================================================

#[tokio::test]
async fn test_admin_panel_gate_tracks_the_active_flag() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &[]).await;

    let response = ctx.get("/api/access/admin-panel/clerk", None).await;
    assert_eq!(body_json(response).await["status"], "granted");

    let response = ctx
        .patch(
            "/api/admins/clerk/active",
            Some("root"),
            &json!({"active": false}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.get("/api/access/admin-panel/clerk", None).await;
    assert_eq!(body_json(response).await["status"], "denied");
}

#[tokio::test]
async fn test_admin_panel_denied_for_a_plain_user() {
    let ctx = TestContext::new();
    // A synced end-user record alone never opens the admin panel.
    let sync = json!({
        "user_id": "mia",
        "email": "mia@example.com",
        "name": "Mia",
    });
    let response = ctx.post("/api/users/sync", Some("mia"), &sync).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.get("/api/access/admin-panel/mia", None).await;
    assert_eq!(body_json(response).await["status"], "denied");
}

#[tokio::test]
async fn test_admin_panel_fails_closed_on_malformed_user_id() {
    let ctx = TestContext::new();
    let response = ctx.get("/api/access/admin-panel/%20", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "denied");
}

// =============================================================================
// Store Outages
// =============================================================================

#[tokio::test]
async fn test_resolve_surfaces_a_store_outage_as_retryable() {
    let ctx = TestContext::with_unreachable_store();
    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "root", "permission": "view_users"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // An outage must never read as a decision: no status, just an error.
    let body = body_json(response).await;
    assert!(body.get("status").is_none());
    assert_eq!(body["error"], "service temporarily unavailable");
}

#[tokio::test]
async fn test_admin_panel_gate_surfaces_a_store_outage() {
    let ctx = TestContext::with_unreachable_store();
    let response = ctx.get("/api/access/admin-panel/root", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_json(response).await.get("status").is_none());
}

#[tokio::test]
async fn test_readiness_reports_unready_on_store_outage() {
    let ctx = TestContext::with_unreachable_store();
    let response = ctx
        .send(request_with_token(
            Method::GET,
            "/health/ready",
            None,
            None,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
