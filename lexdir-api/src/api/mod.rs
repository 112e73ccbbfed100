//! HTTP route surface
//!
//! Public routes: health, register, login, lead intake. Everything else sits
//! behind the bearer-session middleware, which attaches the current user to
//! the request. Authorization beyond "logged in" happens in the handlers via
//! the role policy functions.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod auth;
pub mod branches;
pub mod firms;
pub mod health;
pub mod leads;
pub mod notifications;
pub mod ownership;
pub mod users;

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // Protected routes (require a valid session)
    let protected = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user).put(users::update_user))
        .route("/api/firms", get(firms::list_firms).post(firms::create_firm))
        .route("/api/firms/import", post(firms::import_from_cms))
        .route("/api/firms/dedup", post(firms::dedup_firms))
        .route(
            "/api/firms/:id",
            get(firms::get_firm).put(firms::update_firm).delete(firms::delete_firm),
        )
        .route("/api/firms/:id/sync", post(firms::sync_firm))
        .route(
            "/api/firms/:id/branches",
            get(branches::list_branches).post(branches::create_branch),
        )
        .route("/api/firms/:id/claim", post(ownership::claim_firm))
        .route(
            "/api/branches/:id",
            put(branches::update_branch).delete(branches::delete_branch),
        )
        .route("/api/ownership", get(ownership::list_requests))
        .route("/api/ownership/:id/approve", post(ownership::approve_request))
        .route("/api/ownership/:id/reject", post(ownership::reject_request))
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route("/api/leads", get(leads::list_leads))
        .route("/api/leads/:id", get(leads::get_lead))
        .route("/api/leads/:id/price", post(leads::approve_price))
        .route("/api/leads/:id/discard", post(leads::discard_lead))
        .route("/api/leads/:id/purchase", post(leads::purchase_lead))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/leads", post(leads::intake));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
