//! Lead marketplace endpoints
//!
//! Intake is public; everything else requires a session. The scorer prices
//! the lead at intake, a super admin approves the final price or discards,
//! and a firm admin purchases through a hosted checkout when the payments
//! provider is configured.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::auth::CurrentUser;
use crate::db::leads::{self, Lead, LeadInput, LeadStatus};
use crate::error::{ApiError, ApiResult};
use crate::services::lead_scorer;
use crate::services::mailer;
use crate::services::payments::PaymentsClient;
use crate::AppState;
use lexdir_common::config::IntegrationSettings;
use lexdir_common::roles::{can_purchase_leads, can_review_leads};

/// Lead as returned to clients
#[derive(Debug, Serialize)]
pub struct LeadView {
    pub guid: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub practice_area: String,
    pub message: String,
    pub score: f64,
    pub price: f64,
    pub status: String,
    pub buyer_firm_guid: Option<Uuid>,
    pub created_at: String,
}

impl From<&Lead> for LeadView {
    fn from(lead: &Lead) -> Self {
        LeadView {
            guid: lead.guid,
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            city: lead.city.clone(),
            practice_area: lead.practice_area.clone(),
            message: lead.message.clone(),
            score: lead.score,
            price: lead.price,
            status: lead.status.as_str().to_string(),
            buyer_firm_guid: lead.buyer_firm_guid,
            created_at: lead.created_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub practice_area: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub guid: Uuid,
    pub status: String,
}

/// POST /api/leads — public intake form
pub async fn intake(
    State(state): State<AppState>,
    Json(body): Json<IntakeRequest>,
) -> ApiResult<Json<IntakeResponse>> {
    let name = body.name.trim().to_string();
    let email = body.email.trim().to_lowercase();
    let practice_area = body.practice_area.trim().to_lowercase();
    let message = body.message.trim().to_string();

    if name.is_empty() || message.is_empty() || practice_area.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, practice area and message are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }

    let input = LeadInput {
        name,
        email,
        phone: body.phone,
        city: body.city,
        practice_area,
        message,
    };

    let score = lead_scorer::score_lead(&input);
    let suggested_price = lead_scorer::price_for_score(score);
    let lead = leads::create_lead(&state.db, &input, score, suggested_price).await?;

    info!(lead = %lead.guid, score, suggested_price, "Lead received");

    // Recipient emails honor per-user preferences; a failure here never
    // loses the stored lead.
    if let Err(e) = mailer::notify_new_lead(&state.db, &lead).await {
        warn!(lead = %lead.guid, error = %e, "New-lead notification failed");
    }

    Ok(Json(IntakeResponse {
        guid: lead.guid,
        status: lead.status.as_str().to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub status: Option<String>,
}

/// GET /api/leads — super admin
pub async fn list_leads(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListLeadsQuery>,
) -> ApiResult<Json<Vec<LeadView>>> {
    if !can_review_leads(current.0.role) {
        return Err(ApiError::Forbidden("Lead review requires super admin".to_string()));
    }

    let status = query.status.as_deref().map(LeadStatus::parse);
    let list = leads::list_leads(&state.db, status).await?;
    Ok(Json(list.iter().map(LeadView::from).collect()))
}

/// GET /api/leads/:id — super admin, or the firm admin who bought it
pub async fn get_lead(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LeadView>> {
    let lead = leads::get_lead(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lead {}", id)))?;

    let is_buyer = lead.buyer_firm_guid.is_some() && lead.buyer_firm_guid == current.0.firm_guid;
    if !can_review_leads(current.0.role) && !is_buyer {
        return Err(ApiError::Forbidden("Not allowed to view this lead".to_string()));
    }

    Ok(Json(LeadView::from(&lead)))
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub price: f64,
}

/// POST /api/leads/:id/price — super admin; non-positive price is a 400
pub async fn approve_price(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<PriceRequest>,
) -> ApiResult<Json<LeadView>> {
    if !can_review_leads(current.0.role) {
        return Err(ApiError::Forbidden("Lead review requires super admin".to_string()));
    }

    let lead = leads::approve_price(&state.db, id, body.price).await?;
    info!(lead = %id, price = body.price, "Lead price approved");
    Ok(Json(LeadView::from(&lead)))
}

/// POST /api/leads/:id/discard — super admin
pub async fn discard_lead(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LeadView>> {
    if !can_review_leads(current.0.role) {
        return Err(ApiError::Forbidden("Lead review requires super admin".to_string()));
    }

    let lead = leads::discard_lead(&state.db, id).await?;
    info!(lead = %id, "Lead discarded");
    Ok(Json(LeadView::from(&lead)))
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub lead: LeadView,
    /// Hosted checkout URL when the payments provider is configured
    pub checkout_url: Option<String>,
}

/// POST /api/leads/:id/purchase — firm admin (or super admin)
///
/// Records the buying firm and, when the payments provider is configured,
/// returns a hosted checkout URL. The purchase record stands even if the
/// checkout session cannot be created; payment is settled out of band.
pub async fn purchase_lead(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PurchaseResponse>> {
    if !can_purchase_leads(current.0.role) {
        return Err(ApiError::Forbidden("Lead purchase requires a firm admin".to_string()));
    }
    let buyer_firm = current
        .0
        .firm_guid
        .ok_or_else(|| ApiError::BadRequest("No firm linked to your account".to_string()))?;

    let lead = leads::set_buyer(&state.db, id, buyer_firm).await?;

    let checkout_url = match IntegrationSettings::load(&state.db).await?.payments {
        Some(payments_settings) => match PaymentsClient::new(payments_settings) {
            Ok(client) => {
                let description = format!("Caso de {} ({})", lead.practice_area, lead.guid);
                match client.create_checkout(&description, lead.price).await {
                    Ok(checkout) => Some(checkout.url),
                    Err(e) => {
                        warn!(lead = %id, error = %e, "Checkout creation failed");
                        None
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Payments client construction failed");
                None
            }
        },
        None => None,
    };

    info!(lead = %id, firm = %buyer_firm, "Lead purchased");
    Ok(Json(PurchaseResponse {
        lead: LeadView::from(&lead),
        checkout_url,
    }))
}
