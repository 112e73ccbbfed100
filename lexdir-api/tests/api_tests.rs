//! Integration tests for the public surface: health, registration, login,
//! sessions and the auth middleware.

use axum::http::StatusCode;
use serde_json::json;
use tower::util::ServiceExt; // for `oneshot`

mod helpers;
use helpers::{basic_user, extract_json, json_request, setup_app, setup_pool, super_admin};

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let pool = setup_pool().await;
    let app = setup_app(pool);

    let response = app
        .oneshot(json_request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lexdir-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_register_then_login() {
    let pool = setup_pool().await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "Ana@Example.com",
                "display_name": "Ana",
                "password": "secret-password"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    // Email is normalized; defaults applied
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["role"], "basic");
    assert_eq!(body["status"], "active");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "secret-password" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["email"], "ana@example.com");

    // Token works on a protected route
    let response = app
        .oneshot(json_request("GET", "/api/auth/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let pool = setup_pool().await;
    let app = setup_app(pool);

    let register = |app: axum::Router| async move {
        app.oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "dup@example.com",
                "display_name": "Dup",
                "password": "secret-password"
            })),
        ))
        .await
        .unwrap()
    };

    assert_eq!(register(app.clone()).await.status(), StatusCode::OK);
    assert_eq!(register(app).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_short_password_is_rejected() {
    let pool = setup_pool().await;
    let app = setup_app(pool);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "email": "weak@example.com",
                "display_name": "Weak",
                "password": "short"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_401() {
    let pool = setup_pool().await;
    let (_user, _token) = basic_user(&pool).await;
    let app = setup_app(pool);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "user@example.com", "password": "wrong" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let pool = setup_pool().await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/auth/me", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request("GET", "/api/auth/me", Some("bogus-token"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let pool = setup_pool().await;
    let (_user, token) = basic_user(&pool).await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/logout", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("GET", "/api/auth/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_account_is_rejected() {
    let pool = setup_pool().await;
    let (user, token) = basic_user(&pool).await;
    lexdir_api::db::users::update_role_status(
        &pool,
        user.guid,
        None,
        Some(lexdir_common::UserStatus::Inactive),
    )
    .await
    .unwrap();
    let app = setup_app(pool);

    let response = app
        .oneshot(json_request("GET", "/api/auth/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_admin_requires_super_admin() {
    let pool = setup_pool().await;
    let (_admin, admin_token) = super_admin(&pool).await;
    let (user, user_token) = basic_user(&pool).await;
    let app = setup_app(pool);

    // Basic user is refused
    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/users", Some(&user_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Super admin lists users and updates a role
    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/users", Some(&admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/users/{}", user.guid),
            Some(&admin_token),
            Some(json!({ "status": "inactive" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "inactive");
}

#[tokio::test]
async fn test_super_admin_cannot_demote_self() {
    let pool = setup_pool().await;
    let (admin, admin_token) = super_admin(&pool).await;
    let app = setup_app(pool);

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/users/{}", admin.guid),
            Some(&admin_token),
            Some(json!({ "role": "basic" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
