//! Notification endpoints
//!
//! All operations are scoped to the current user; there is no way to read or
//! flip another user's notifications through this surface.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::db::notifications::{self, Notification};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Notification as returned to clients
#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub guid: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        NotificationView {
            guid: n.guid,
            kind: n.kind.clone(),
            title: n.title.clone(),
            body: n.body.clone(),
            link: n.link.clone(),
            read: n.read,
            created_at: n.created_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread: bool,
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListNotificationsQuery>,
) -> ApiResult<Json<Vec<NotificationView>>> {
    let list = notifications::list_for_user(&state.db, current.0.guid, query.unread).await?;
    Ok(Json(list.iter().map(NotificationView::from).collect()))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let flipped = notifications::mark_read(&state.db, current.0.guid, id).await?;
    if !flipped {
        return Err(ApiError::NotFound(format!("Notification {}", id)));
    }
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<serde_json::Value>> {
    let count = notifications::mark_all_read(&state.db, current.0.guid).await?;
    Ok(Json(serde_json::json!({ "status": "ok", "marked": count })))
}
