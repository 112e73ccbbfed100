//! Integration tests for the ownership claim/decision flow.

use axum::http::StatusCode;
use serde_json::json;
use tower::util::ServiceExt;

mod helpers;
use helpers::{basic_user, extract_json, json_request, setup_app, setup_pool, super_admin};

async fn seed_firm(pool: &sqlx::SqlitePool) -> uuid::Uuid {
    let firm = lexdir_api::db::firms::create_firm(
        pool,
        &lexdir_api::db::firms::FirmInput {
            name: "Reclamable".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    firm.guid
}

#[tokio::test]
async fn test_claim_approve_links_user_and_notifies() {
    let pool = setup_pool().await;
    let (_admin, admin_token) = super_admin(&pool).await;
    let (user, user_token) = basic_user(&pool).await;
    let firm_guid = seed_firm(&pool).await;
    let app = setup_app(pool.clone());

    // User claims the firm
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/firms/{}/claim", firm_guid),
            Some(&user_token),
            Some(json!({ "justification": "Soy el titular" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let claim = extract_json(response.into_body()).await;
    assert_eq!(claim["status"], "pending");
    let request_guid = claim["guid"].as_str().unwrap().to_string();

    // Duplicate pending claim is a 400
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/firms/{}/claim", firm_guid),
            Some(&user_token),
            Some(json!({ "justification": "Otra vez" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Super admin sees it in the pending list
    let response = app
        .clone()
        .oneshot(json_request("GET", "/api/ownership?status=pending", Some(&admin_token), None))
        .await
        .unwrap();
    let pending = extract_json(response.into_body()).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    // Approve
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/ownership/{}/approve", request_guid),
            Some(&admin_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let decided = extract_json(response.into_body()).await;
    assert_eq!(decided["status"], "approved");

    // Side effects: requester becomes firm admin of that firm
    let updated = lexdir_api::db::users::get_user(&pool, user.guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, lexdir_common::Role::FirmAdmin);
    assert_eq!(updated.firm_guid, Some(firm_guid));

    // ...and gets an in-app notification
    let response = app
        .oneshot(json_request("GET", "/api/notifications?unread=true", Some(&user_token), None))
        .await
        .unwrap();
    let notifications = extract_json(response.into_body()).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["kind"], "ownership_update");
}

#[tokio::test]
async fn test_reject_notifies_without_linking() {
    let pool = setup_pool().await;
    let (_admin, admin_token) = super_admin(&pool).await;
    let (user, user_token) = basic_user(&pool).await;
    let firm_guid = seed_firm(&pool).await;
    let app = setup_app(pool.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/firms/{}/claim", firm_guid),
            Some(&user_token),
            Some(json!({})),
        ))
        .await
        .unwrap();
    let claim = extract_json(response.into_body()).await;
    let request_guid = claim["guid"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/ownership/{}/reject", request_guid),
            Some(&admin_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = lexdir_api::db::users::get_user(&pool, user.guid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, lexdir_common::Role::Basic);
    assert!(updated.firm_guid.is_none());

    let response = app
        .oneshot(json_request("GET", "/api/notifications", Some(&user_token), None))
        .await
        .unwrap();
    let notifications = extract_json(response.into_body()).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);

    // A rejected request can be decided only once
    let again = lexdir_api::db::ownership::decide_request(
        &pool,
        uuid::Uuid::parse_str(&request_guid).unwrap(),
        lexdir_api::db::ownership::RequestStatus::Approved,
        user.guid,
    )
    .await;
    assert!(again.is_err());
}

#[tokio::test]
async fn test_decisions_require_super_admin() {
    let pool = setup_pool().await;
    let (_user, user_token) = basic_user(&pool).await;
    let firm_guid = seed_firm(&pool).await;
    let app = setup_app(pool.clone());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/firms/{}/claim", firm_guid),
            Some(&user_token),
            Some(json!({})),
        ))
        .await
        .unwrap();
    let claim = extract_json(response.into_body()).await;
    let request_guid = claim["guid"].as_str().unwrap().to_string();

    // The requester cannot approve their own claim
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/ownership/{}/approve", request_guid),
            Some(&user_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(json_request("GET", "/api/ownership", Some(&user_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
