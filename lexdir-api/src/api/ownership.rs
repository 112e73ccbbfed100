//! Ownership request endpoints
//!
//! Any active user can claim a firm; a super admin decides. Approval links
//! the requester to the firm as its admin and notifies them; rejection
//! notifies too. Decision emails go through the mailer policy.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::db::firms;
use crate::db::notifications;
use crate::db::ownership::{self, OwnershipRequest, RequestStatus};
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::services::mailer::{self, CATEGORY_OWNERSHIP_UPDATE};
use crate::AppState;
use lexdir_common::roles::can_decide_ownership;

/// Ownership request as returned to clients
#[derive(Debug, Serialize)]
pub struct RequestView {
    pub guid: Uuid,
    pub user_guid: Uuid,
    pub firm_guid: Uuid,
    pub status: String,
    pub justification: String,
    pub decided_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&OwnershipRequest> for RequestView {
    fn from(request: &OwnershipRequest) -> Self {
        RequestView {
            guid: request.guid,
            user_guid: request.user_guid,
            firm_guid: request.firm_guid,
            status: request.status.as_str().to_string(),
            justification: request.justification.clone(),
            decided_by: request.decided_by,
            created_at: request.created_at.clone(),
            updated_at: request.updated_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub justification: String,
}

/// POST /api/firms/:id/claim
pub async fn claim_firm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(firm_id): Path<Uuid>,
    Json(body): Json<ClaimRequest>,
) -> ApiResult<Json<RequestView>> {
    let firm = firms::get_firm(&state.db, firm_id)
        .await?
        .filter(|f| !f.deleted)
        .ok_or_else(|| ApiError::NotFound(format!("Firm {}", firm_id)))?;

    if current.0.firm_guid == Some(firm.guid) {
        return Err(ApiError::BadRequest("You already administer this firm".to_string()));
    }

    let request =
        ownership::create_request(&state.db, current.0.guid, firm_id, body.justification.trim())
            .await?;

    info!(user = %current.0.guid, firm = %firm_id, "Ownership claim filed");
    Ok(Json(RequestView::from(&request)))
}

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
}

/// GET /api/ownership — super admin
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListRequestsQuery>,
) -> ApiResult<Json<Vec<RequestView>>> {
    if !can_decide_ownership(current.0.role) {
        return Err(ApiError::Forbidden("Ownership review requires super admin".to_string()));
    }

    let pending_only = query.status.as_deref() == Some("pending");
    let list = ownership::list_requests(&state.db, pending_only).await?;
    Ok(Json(list.iter().map(RequestView::from).collect()))
}

/// POST /api/ownership/:id/approve — super admin
pub async fn approve_request(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RequestView>> {
    decide(state, current, id, RequestStatus::Approved).await
}

/// POST /api/ownership/:id/reject — super admin
pub async fn reject_request(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RequestView>> {
    decide(state, current, id, RequestStatus::Rejected).await
}

async fn decide(
    state: AppState,
    current: CurrentUser,
    id: Uuid,
    status: RequestStatus,
) -> ApiResult<Json<RequestView>> {
    if !can_decide_ownership(current.0.role) {
        return Err(ApiError::Forbidden("Ownership review requires super admin".to_string()));
    }

    let decided = ownership::decide_request(&state.db, id, status, current.0.guid).await?;

    let firm = firms::get_firm(&state.db, decided.firm_guid).await?;
    let firm_name = firm
        .as_ref()
        .map(|f| f.name.clone())
        .unwrap_or_else(|| decided.firm_guid.to_string());

    let (title, body) = match status {
        RequestStatus::Approved => {
            users::link_user_to_firm(&state.db, decided.user_guid, decided.firm_guid).await?;
            (
                format!("Solicitud aprobada: {}", firm_name),
                format!("<p>Ya eres administrador de <b>{}</b>.</p>", firm_name),
            )
        }
        _ => (
            format!("Solicitud rechazada: {}", firm_name),
            format!("<p>Tu solicitud sobre <b>{}</b> ha sido rechazada.</p>", firm_name),
        ),
    };

    notifications::create_notification(
        &state.db,
        decided.user_guid,
        CATEGORY_OWNERSHIP_UPDATE,
        &title,
        "",
        Some(&format!("/firms/{}", decided.firm_guid)),
    )
    .await?;

    if let Some(requester) = users::get_user(&state.db, decided.user_guid).await? {
        mailer::dispatch(&state.db, &requester, CATEGORY_OWNERSHIP_UPDATE, &title, &body).await?;
    }

    info!(request = %id, status = status.as_str(), "Ownership request decided");
    Ok(Json(RequestView::from(&decided)))
}
