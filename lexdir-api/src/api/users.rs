//! User administration endpoints (super admin only)

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::auth::{CurrentUser, UserProfile};
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use lexdir_common::roles::{can_manage_users, Role, UserStatus};

fn require_user_admin(current: &CurrentUser) -> ApiResult<()> {
    if !can_manage_users(current.0.role) {
        return Err(ApiError::Forbidden(
            "User administration requires super admin".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    require_user_admin(&current)?;

    let all = users::list_users(&state.db).await?;
    Ok(Json(all.iter().map(UserProfile::from).collect()))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    require_user_admin(&current)?;

    let user = users::get_user(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))?;

    Ok(Json(UserProfile::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

/// PUT /api/users/:id — role/status updates
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserProfile>> {
    require_user_admin(&current)?;

    if body.role.is_none() && body.status.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    // A super admin cannot demote or deactivate themselves; this keeps the
    // portal from locking everyone out.
    if id == current.0.guid {
        if matches!(body.role, Some(role) if role != Role::SuperAdmin)
            || body.status == Some(UserStatus::Inactive)
        {
            return Err(ApiError::BadRequest(
                "Cannot demote or deactivate your own account".to_string(),
            ));
        }
    }

    users::get_user(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))?;

    users::update_role_status(&state.db, id, body.role, body.status).await?;

    let updated = users::get_user(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", id)))?;

    info!(user = %id, role = ?body.role, status = ?body.status, "Updated user");
    Ok(Json(UserProfile::from(&updated)))
}
