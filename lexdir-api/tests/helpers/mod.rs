//! Shared test helpers: in-memory database, router, seeded users/sessions.

use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use lexdir_api::db::sessions::create_session;
use lexdir_api::db::users::{create_user, update_role_status, NewUser, User};
use lexdir_api::{build_router, AppState};
use lexdir_common::{Role, UserStatus};

/// In-memory pool with the full schema applied. A single connection is
/// required: each pooled connection would otherwise get its own database.
pub async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should create in-memory database");
    lexdir_common::db::init_schema(&pool)
        .await
        .expect("Should apply schema");
    pool
}

pub fn setup_app(pool: SqlitePool) -> axum::Router {
    build_router(AppState::new(pool))
}

/// Build a JSON request, optionally authenticated
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn seed_user(pool: &SqlitePool, email: &str, role: Role) -> (User, String) {
    let salt = lexdir_common::auth::generate_salt();
    let user = create_user(
        pool,
        &NewUser {
            email: email.to_string(),
            display_name: email.split('@').next().unwrap_or("user").to_string(),
            password_hash: lexdir_common::auth::hash_password("password123", &salt),
            password_salt: salt,
        },
    )
    .await
    .expect("Should create user");

    if role != Role::Basic {
        update_role_status(pool, user.guid, Some(role), None)
            .await
            .expect("Should set role");
    }

    let token = lexdir_common::auth::generate_session_token();
    create_session(pool, user.guid, &token, 1).await.expect("Should mint session");

    let user = lexdir_api::db::users::get_user(pool, user.guid)
        .await
        .unwrap()
        .unwrap();
    (user, token)
}

pub async fn super_admin(pool: &SqlitePool) -> (User, String) {
    seed_user(pool, "admin@example.com", Role::SuperAdmin).await
}

pub async fn basic_user(pool: &SqlitePool) -> (User, String) {
    seed_user(pool, "user@example.com", Role::Basic).await
}

/// Firm admin linked to the given firm
pub async fn firm_admin(pool: &SqlitePool, firm_guid: Uuid) -> (User, String) {
    let (user, token) = seed_user(pool, "firmadmin@example.com", Role::Basic).await;
    lexdir_api::db::users::link_user_to_firm(pool, user.guid, firm_guid)
        .await
        .expect("Should link user to firm");
    let user = lexdir_api::db::users::get_user(pool, user.guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.status, UserStatus::Active);
    (user, token)
}
