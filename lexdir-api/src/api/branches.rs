//! Branch ("sede") endpoints
//!
//! Branches are edited by the owning firm admin or a super admin. Deleting a
//! firm's last branch is rejected; the directory convention is that every
//! firm keeps at least one.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::db::branches::{self, Branch, BranchInput};
use crate::db::firms;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use lexdir_common::roles::can_edit_firm;

/// Branch as returned to clients
#[derive(Debug, Serialize)]
pub struct BranchView {
    pub guid: Uuid,
    pub firm_guid: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub practice_areas: Vec<String>,
    pub is_principal: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Branch> for BranchView {
    fn from(branch: &Branch) -> Self {
        BranchView {
            guid: branch.guid,
            firm_guid: branch.firm_guid,
            name: branch.name.clone(),
            address: branch.address.clone(),
            city: branch.city.clone(),
            province: branch.province.clone(),
            postal_code: branch.postal_code.clone(),
            phone: branch.phone.clone(),
            email: branch.email.clone(),
            practice_areas: branch.practice_areas.clone(),
            is_principal: branch.is_principal,
            created_at: branch.created_at.clone(),
            updated_at: branch.updated_at.clone(),
        }
    }
}

/// Writable branch fields as accepted from clients
#[derive(Debug, Deserialize)]
pub struct BranchBody {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub practice_areas: Vec<String>,
    #[serde(default)]
    pub is_principal: bool,
}

impl BranchBody {
    pub fn into_input(self) -> ApiResult<BranchInput> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Branch name is required".to_string()));
        }
        Ok(BranchInput {
            name,
            address: self.address,
            city: self.city,
            province: self.province,
            postal_code: self.postal_code,
            phone: self.phone,
            email: self.email,
            practice_areas: self
                .practice_areas
                .into_iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            is_principal: self.is_principal,
        })
    }
}

async fn require_firm_editor(
    state: &AppState,
    current: &CurrentUser,
    firm_guid: Uuid,
) -> ApiResult<()> {
    // Firm must exist and not be soft-deleted
    let firm = firms::get_firm(&state.db, firm_guid)
        .await?
        .filter(|f| !f.deleted)
        .ok_or_else(|| ApiError::NotFound(format!("Firm {}", firm_guid)))?;

    let own_firm = current.0.firm_guid.map(|g| g.to_string());
    if !can_edit_firm(current.0.role, own_firm.as_deref(), &firm.guid.to_string()) {
        return Err(ApiError::Forbidden(
            "Not allowed to edit this firm".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/firms/:id/branches
pub async fn list_branches(
    State(state): State<AppState>,
    Path(firm_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BranchView>>> {
    firms::get_firm(&state.db, firm_id)
        .await?
        .filter(|f| !f.deleted)
        .ok_or_else(|| ApiError::NotFound(format!("Firm {}", firm_id)))?;

    let list = branches::list_for_firm(&state.db, firm_id).await?;
    Ok(Json(list.iter().map(BranchView::from).collect()))
}

/// POST /api/firms/:id/branches
pub async fn create_branch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(firm_id): Path<Uuid>,
    Json(body): Json<BranchBody>,
) -> ApiResult<Json<BranchView>> {
    require_firm_editor(&state, &current, firm_id).await?;

    let input = body.into_input()?;
    let branch = branches::create_branch(&state.db, firm_id, &input).await?;

    info!(firm = %firm_id, branch = %branch.guid, "Created branch");
    Ok(Json(BranchView::from(&branch)))
}

/// PUT /api/branches/:id
pub async fn update_branch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<BranchBody>,
) -> ApiResult<Json<BranchView>> {
    let existing = branches::get_branch(&state.db, branch_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Branch {}", branch_id)))?;
    require_firm_editor(&state, &current, existing.firm_guid).await?;

    let input = body.into_input()?;
    let branch = branches::update_branch(&state.db, branch_id, &input).await?;

    Ok(Json(BranchView::from(&branch)))
}

/// DELETE /api/branches/:id
///
/// Rejected when it would leave the firm with no branches.
pub async fn delete_branch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let existing = branches::get_branch(&state.db, branch_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Branch {}", branch_id)))?;
    require_firm_editor(&state, &current, existing.firm_guid).await?;

    let remaining = branches::count_for_firm(&state.db, existing.firm_guid).await?;
    if remaining <= 1 {
        return Err(ApiError::BadRequest(
            "A firm must keep at least one branch".to_string(),
        ));
    }

    branches::delete_branch(&state.db, branch_id).await?;

    info!(firm = %existing.firm_guid, branch = %branch_id, "Deleted branch");
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
