//! Firm ("despacho") endpoints
//!
//! Local writes commit first; the CMS/search pushes run afterwards and their
//! per-target outcomes ride along in the response. A remote failure never
//! rolls back the local write.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::api::branches::BranchBody;
use crate::db::branches;
use crate::db::firms::{self, Firm, FirmInput, FirmStatus};
use crate::error::{ApiError, ApiResult};
use crate::services::sync::{self, ImportSummary, SyncReport};
use crate::AppState;
use lexdir_common::roles::{can_administer_directory, can_edit_firm};

/// Firm as returned to clients
#[derive(Debug, Serialize)]
pub struct FirmView {
    pub guid: Uuid,
    pub name: String,
    pub slug: String,
    pub status: FirmStatus,
    pub owner_email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub cms_post_id: Option<i64>,
    pub search_object_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Firm> for FirmView {
    fn from(firm: &Firm) -> Self {
        FirmView {
            guid: firm.guid,
            name: firm.name.clone(),
            slug: firm.slug.clone(),
            status: firm.status,
            owner_email: firm.owner_email.clone(),
            phone: firm.phone.clone(),
            description: firm.description.clone(),
            cms_post_id: firm.cms_post_id,
            search_object_id: firm.search_object_id.clone(),
            created_at: firm.created_at.clone(),
            updated_at: firm.updated_at.clone(),
        }
    }
}

/// Firm write response carrying the reconciliation outcome
#[derive(Debug, Serialize)]
pub struct FirmWriteResponse {
    pub firm: FirmView,
    pub sync: SyncReport,
}

#[derive(Debug, Deserialize)]
pub struct ListFirmsQuery {
    /// Name substring filter
    pub q: Option<String>,
    pub status: Option<FirmStatus>,
}

/// GET /api/firms
pub async fn list_firms(
    State(state): State<AppState>,
    Query(query): Query<ListFirmsQuery>,
) -> ApiResult<Json<Vec<FirmView>>> {
    let list = firms::list_firms(&state.db, query.q.as_deref(), query.status).await?;
    Ok(Json(list.iter().map(FirmView::from).collect()))
}

/// GET /api/firms/:id
pub async fn get_firm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FirmView>> {
    let firm = load_live_firm(&state, id).await?;
    Ok(Json(FirmView::from(&firm)))
}

#[derive(Debug, Deserialize)]
pub struct CreateFirmRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<FirmStatus>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// The firm's principal branch, created alongside
    pub branch: BranchBody,
}

/// POST /api/firms — super admin; creates the firm and its principal branch
pub async fn create_firm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateFirmRequest>,
) -> ApiResult<Json<FirmWriteResponse>> {
    if !can_administer_directory(current.0.role) {
        return Err(ApiError::Forbidden("Firm creation requires super admin".to_string()));
    }

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Firm name is required".to_string()));
    }

    let mut branch_input = body.branch.into_input()?;
    branch_input.is_principal = true;

    let firm = firms::create_firm(
        &state.db,
        &FirmInput {
            name,
            slug: body.slug,
            status: body.status,
            owner_email: body.owner_email,
            phone: body.phone,
            description: body.description,
        },
    )
    .await?;
    branches::create_branch(&state.db, firm.guid, &branch_input).await?;

    info!(firm = %firm.guid, slug = %firm.slug, "Created firm");

    let report = sync::sync_firm(&state.db, firm.guid).await?;
    let firm = load_live_firm(&state, firm.guid).await?;

    Ok(Json(FirmWriteResponse {
        firm: FirmView::from(&firm),
        sync: report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFirmRequest {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<FirmStatus>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// PUT /api/firms/:id — super admin or the owning firm admin
pub async fn update_firm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateFirmRequest>,
) -> ApiResult<Json<FirmWriteResponse>> {
    let firm = load_live_firm(&state, id).await?;
    require_editor(&current, &firm)?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Firm name is required".to_string()));
    }

    let updated = firms::update_firm(
        &state.db,
        id,
        &FirmInput {
            name,
            slug: body.slug,
            status: body.status,
            owner_email: body.owner_email,
            phone: body.phone,
            description: body.description,
        },
    )
    .await?;

    info!(firm = %id, "Updated firm");

    let report = sync::sync_firm(&state.db, id).await?;
    let updated = firms::get_firm(&state.db, updated.guid)
        .await?
        .unwrap_or(updated);

    Ok(Json(FirmWriteResponse {
        firm: FirmView::from(&updated),
        sync: report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteFirmQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteFirmResponse {
    pub status: String,
    pub sync: SyncReport,
}

/// DELETE /api/firms/:id — super admin; soft delete unless `?hard=true`
pub async fn delete_firm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteFirmQuery>,
) -> ApiResult<Json<DeleteFirmResponse>> {
    if !can_administer_directory(current.0.role) {
        return Err(ApiError::Forbidden("Firm deletion requires super admin".to_string()));
    }

    let firm = load_live_firm(&state, id).await?;

    if query.hard {
        firms::hard_delete_firm(&state.db, id).await?;
    } else {
        firms::soft_delete_firm(&state.db, id).await?;
    }

    info!(firm = %id, hard = query.hard, "Deleted firm");

    // Remote copies removed best-effort; the local delete stands regardless
    let report = match sync::push_deletion(&state.db, &firm).await {
        Ok(report) => report,
        Err(e) => {
            warn!(firm = %id, error = %e, "Deletion push failed");
            SyncReport {
                cms: sync::TargetOutcome::Failed(e.to_string()),
                search: sync::TargetOutcome::Failed(e.to_string()),
            }
        }
    };

    Ok(Json(DeleteFirmResponse {
        status: if query.hard { "hard_deleted" } else { "soft_deleted" }.to_string(),
        sync: report,
    }))
}

/// POST /api/firms/:id/sync — re-trigger reconciliation manually
pub async fn sync_firm(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SyncReport>> {
    let firm = load_live_firm(&state, id).await?;
    require_editor(&current, &firm)?;

    let report = sync::sync_firm(&state.db, id).await?;
    Ok(Json(report))
}

/// POST /api/firms/import — pull firm posts from the CMS, upsert by slug
pub async fn import_from_cms(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ImportSummary>> {
    if !can_administer_directory(current.0.role) {
        return Err(ApiError::Forbidden("CMS import requires super admin".to_string()));
    }

    let summary = sync::import_from_cms(&state.db).await?;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
pub struct DedupResponse {
    pub removed: u64,
}

/// POST /api/firms/dedup — collapse duplicate slugs
pub async fn dedup_firms(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<DedupResponse>> {
    if !can_administer_directory(current.0.role) {
        return Err(ApiError::Forbidden("Dedup requires super admin".to_string()));
    }

    let removed = firms::dedup_firms(&state.db).await?;
    info!(removed, "Dedup pass finished");
    Ok(Json(DedupResponse { removed }))
}

async fn load_live_firm(state: &AppState, id: Uuid) -> ApiResult<Firm> {
    firms::get_firm(&state.db, id)
        .await?
        .filter(|f| !f.deleted)
        .ok_or_else(|| ApiError::NotFound(format!("Firm {}", id)))
}

fn require_editor(current: &CurrentUser, firm: &Firm) -> ApiResult<()> {
    let own_firm = current.0.firm_guid.map(|g| g.to_string());
    if !can_edit_firm(current.0.role, own_firm.as_deref(), &firm.guid.to_string()) {
        return Err(ApiError::Forbidden("Not allowed to edit this firm".to_string()));
    }
    Ok(())
}
