//! Authentication: registration, login, sessions
//!
//! Sessions are opaque bearer tokens stored in the database. The middleware
//! resolves `Authorization: Bearer <token>` into the current user and rejects
//! inactive accounts.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::sessions;
use crate::db::users::{self, User};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use lexdir_common::{auth as password, Role, UserStatus};

/// Default session lifetime when the setting row is missing
const DEFAULT_SESSION_TTL_HOURS: i64 = 720;

/// Current user, attached to the request by [`require_session`]
#[derive(Clone)]
pub struct CurrentUser(pub User);

/// Bearer token of the current session
#[derive(Clone)]
pub struct SessionToken(pub String);

/// User fields safe to return to clients
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub guid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub status: UserStatus,
    pub firm_guid: Option<Uuid>,
    pub created_at: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            guid: user.guid,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
            status: user.status,
            firm_guid: user.firm_guid,
            created_at: user.created_at.clone(),
        }
    }
}

/// Session middleware for protected routes
///
/// Resolves the bearer token, rejects missing/expired sessions with 401 and
/// inactive accounts with 403, then attaches [`CurrentUser`] and
/// [`SessionToken`] extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let user = sessions::find_user_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    if user.status != UserStatus::Active {
        return Err(ApiError::Forbidden("Account is inactive".to_string()));
    }

    request.extensions_mut().insert(CurrentUser(user));
    request.extensions_mut().insert(SessionToken(token));

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<Json<UserProfile>> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if body.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    let display_name = body.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest("Display name is required".to_string()));
    }

    if users::get_user_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::BadRequest("Email is already registered".to_string()));
    }

    let salt = password::generate_salt();
    let user = users::create_user(
        &state.db,
        &users::NewUser {
            email,
            display_name: display_name.to_string(),
            password_hash: password::hash_password(&body.password, &salt),
            password_salt: salt,
        },
    )
    .await?;

    info!(user = %user.guid, "Registered user");
    Ok(Json(UserProfile::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = body.email.trim().to_lowercase();

    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !password::verify_password(&body.password, &user.password_salt, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }
    if user.status != UserStatus::Active {
        return Err(ApiError::Forbidden("Account is inactive".to_string()));
    }

    let token = password::generate_session_token();
    let ttl = session_ttl_hours(&state.db).await;
    sessions::create_session(&state.db, user.guid, &token, ttl).await?;

    // Opportunistic sweep of stale sessions
    let _ = sessions::purge_expired(&state.db).await;

    info!(user = %user.guid, "Login");
    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<Json<serde_json::Value>> {
    sessions::delete_session(&state.db, &token).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// GET /api/auth/me
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(UserProfile::from(&user)))
}

async fn session_ttl_hours(db: &SqlitePool) -> i64 {
    match lexdir_common::config::get_setting(db, "session_ttl_hours").await {
        Ok(Some(value)) => value.parse().unwrap_or(DEFAULT_SESSION_TTL_HOURS),
        _ => DEFAULT_SESSION_TTL_HOURS,
    }
}
