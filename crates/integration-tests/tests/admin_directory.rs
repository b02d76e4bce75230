//! Admin directory lifecycle over the HTTP surface.
//!
//! Covers the one-time bootstrap, promotion with additive grants, the
//! deactivate/reactivate path and the effective-permission report, plus the
//! permission gates guarding each of them.

#![allow(clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;
use warden_integration_tests::{TestContext, body_json};

// =============================================================================
// Bootstrap
// =============================================================================

#[tokio::test]
async fn test_bootstrap_creates_the_first_super_admin() {
    let ctx = TestContext::new();
    let response = ctx.post_empty("/api/admins/bootstrap", Some("root")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["user_id"], "root");
    assert_eq!(body["role"], "super_admin");
    assert_eq!(body["active"], true);
    assert_eq!(body["created_by"], serde_json::Value::Null);
    let grants = body["permissions"]
        .as_array()
        .expect("permissions should be an array");
    assert_eq!(grants.len(), 26, "bootstrap grants the whole catalog");
}

#[tokio::test]
async fn test_second_bootstrap_conflicts() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;

    let response = ctx
        .post_empty("/api/admins/bootstrap", Some("usurper"))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error"], "an administrator has already been bootstrapped");
}

#[tokio::test]
async fn test_bootstrap_requires_a_verified_identity() {
    let ctx = TestContext::new();
    let response = ctx.post_empty("/api/admins/bootstrap", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Promotion
// =============================================================================

#[tokio::test]
async fn test_promote_requires_manage_admins() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &[]).await;

    // Support holds no manage_admins, so the promotion attempt is refused.
    let response = ctx
        .post(
            "/api/admins",
            Some("clerk"),
            &json!({"user_id": "friend", "role": "admin"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "access denied"}),
        "denials must not reveal which permission was missing"
    );

    // And the record was never created.
    let response = ctx.get("/api/admins/friend", Some("root")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_promotion_grants_add_to_role_defaults() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &["manage_subscriptions"])
        .await;

    for (permission, expected) in [
        ("view_users", "granted"),
        ("customer_support", "granted"),
        ("manage_subscriptions", "granted"),
        ("delete_users", "denied"),
    ] {
        let response = ctx
            .post(
                "/api/access/resolve",
                None,
                &json!({"user_id": "clerk", "permission": permission}),
            )
            .await;
        assert_eq!(
            body_json(response).await["status"], expected,
            "unexpected decision for {permission}"
        );
    }
}

#[tokio::test]
async fn test_promote_rejects_identifiers_outside_the_catalog() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;

    let response = ctx
        .post(
            "/api/admins",
            Some("root"),
            &json!({"user_id": "clerk", "role": "emperor"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .post(
            "/api/admins",
            Some("root"),
            &json!({"user_id": "clerk", "role": "support", "permissions": ["fly"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Listing and Lookup
// =============================================================================

#[tokio::test]
async fn test_listing_gated_on_page_admin_users() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &[]).await;

    let response = ctx.get("/api/admins", Some("root")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let records = body_json(response).await;
    assert_eq!(
        records.as_array().map(Vec::len),
        Some(2),
        "both records should be listed"
    );

    // Support defaults do not include page_admin_users.
    let response = ctx.get("/api/admins", Some("clerk")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_lookup_returns_the_record_or_404() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &[]).await;

    let response = ctx.get("/api/admins/clerk", Some("root")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], "clerk");
    assert_eq!(body["role"], "support");
    assert_eq!(body["created_by"], "root");

    let response = ctx.get("/api/admins/ghost", Some("root")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Activation Toggle
// =============================================================================

#[tokio::test]
async fn test_deactivation_suspends_and_reactivation_restores() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &[]).await;

    let response = ctx
        .patch(
            "/api/admins/clerk/active",
            Some("root"),
            &json!({"active": false}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["active"], false);

    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "clerk", "permission": "view_users"}),
        )
        .await;
    assert_eq!(body_json(response).await["status"], "denied");

    let response = ctx
        .patch(
            "/api/admins/clerk/active",
            Some("root"),
            &json!({"active": true}),
        )
        .await;
    assert_eq!(body_json(response).await["active"], true);

    let response = ctx
        .post(
            "/api/access/resolve",
            None,
            &json!({"user_id": "clerk", "permission": "view_users"}),
        )
        .await;
    assert_eq!(body_json(response).await["status"], "granted");
}

#[tokio::test]
async fn test_toggling_an_unknown_record_is_404() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;

    let response = ctx
        .patch(
            "/api/admins/ghost/active",
            Some("root"),
            &json!({"active": false}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Effective Permissions
// =============================================================================

#[tokio::test]
async fn test_self_lookup_reports_role_set_plus_grants() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &["manage_subscriptions"])
        .await;

    let response = ctx.get("/api/admins/clerk/permissions", Some("clerk")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user_id"], "clerk");
    assert_eq!(
        body["permissions"],
        json!(["view_users", "manage_subscriptions", "customer_support"]),
        "set should union support defaults with the explicit grant"
    );
}

#[tokio::test]
async fn test_looking_up_another_user_needs_page_admin_users() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &[]).await;

    let response = ctx.get("/api/admins/root/permissions", Some("clerk")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx.get("/api/admins/clerk/permissions", Some("root")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_deactivated_admin_reports_the_empty_set() {
    let ctx = TestContext::new();
    ctx.bootstrap("root").await;
    ctx.promote("root", "clerk", "support", &["manage_subscriptions"])
        .await;
    let response = ctx
        .patch(
            "/api/admins/clerk/active",
            Some("root"),
            &json!({"active": false}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.get("/api/admins/clerk/permissions", Some("root")).await;
    let body = body_json(response).await;
    assert_eq!(body["permissions"], json!([]));
}
