//! Ownership request database operations
//!
//! A user claims a firm; a directory admin approves or rejects. At most one
//! pending request per (user, firm) pair.

use lexdir_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => RequestStatus::Approved,
            "rejected" => RequestStatus::Rejected,
            _ => RequestStatus::Pending,
        }
    }
}

/// Ownership request record
#[derive(Debug, Clone)]
pub struct OwnershipRequest {
    pub guid: Uuid,
    pub user_guid: Uuid,
    pub firm_guid: Uuid,
    pub status: RequestStatus,
    pub justification: String,
    pub decided_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

fn map_request(row: &sqlx::sqlite::SqliteRow) -> Result<OwnershipRequest> {
    let guid_str: String = row.get("guid");
    let user_guid_str: String = row.get("user_guid");
    let firm_guid_str: String = row.get("firm_guid");
    let status_str: String = row.get("status");
    let decided_by_str: Option<String> = row.get("decided_by");

    Ok(OwnershipRequest {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid request guid: {}", e)))?,
        user_guid: Uuid::parse_str(&user_guid_str)
            .map_err(|e| Error::Internal(format!("Invalid user guid: {}", e)))?,
        firm_guid: Uuid::parse_str(&firm_guid_str)
            .map_err(|e| Error::Internal(format!("Invalid firm guid: {}", e)))?,
        status: RequestStatus::parse(&status_str),
        justification: row.get("justification"),
        decided_by: decided_by_str.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const REQUEST_COLUMNS: &str =
    "guid, user_guid, firm_guid, status, justification, decided_by, created_at, updated_at";

/// File a claim. Rejects a second pending claim for the same (user, firm).
pub async fn create_request(
    pool: &SqlitePool,
    user_guid: Uuid,
    firm_guid: Uuid,
    justification: &str,
) -> Result<OwnershipRequest> {
    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ownership_requests WHERE user_guid = ? AND firm_guid = ? AND status = 'pending'",
    )
    .bind(user_guid.to_string())
    .bind(firm_guid.to_string())
    .fetch_one(pool)
    .await?;

    if pending > 0 {
        return Err(Error::InvalidInput(
            "A pending claim for this firm already exists".to_string(),
        ));
    }

    let guid = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO ownership_requests (guid, user_guid, firm_guid, justification, created_at, updated_at)
        VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(user_guid.to_string())
    .bind(firm_guid.to_string())
    .bind(justification)
    .execute(pool)
    .await?;

    get_request(pool, guid)
        .await?
        .ok_or_else(|| Error::Internal("Ownership request vanished after insert".to_string()))
}

/// Load request by guid
pub async fn get_request(pool: &SqlitePool, guid: Uuid) -> Result<Option<OwnershipRequest>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM ownership_requests WHERE guid = ?",
        REQUEST_COLUMNS
    ))
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_request(&row)?)),
        None => Ok(None),
    }
}

/// List requests, optionally filtered to pending, newest first
pub async fn list_requests(pool: &SqlitePool, pending_only: bool) -> Result<Vec<OwnershipRequest>> {
    let sql = if pending_only {
        format!(
            "SELECT {} FROM ownership_requests WHERE status = 'pending' ORDER BY created_at DESC",
            REQUEST_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM ownership_requests ORDER BY created_at DESC",
            REQUEST_COLUMNS
        )
    };

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(map_request).collect()
}

/// Record an approve/reject decision. Only pending requests can be decided.
pub async fn decide_request(
    pool: &SqlitePool,
    guid: Uuid,
    status: RequestStatus,
    decided_by: Uuid,
) -> Result<OwnershipRequest> {
    let request = get_request(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Ownership request {}", guid)))?;

    if request.status != RequestStatus::Pending {
        return Err(Error::InvalidInput(
            "Request has already been decided".to_string(),
        ));
    }

    sqlx::query(
        "UPDATE ownership_requests SET status = ?, decided_by = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(status.as_str())
    .bind(decided_by.to_string())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    get_request(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Ownership request {}", guid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        lexdir_common::db::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_duplicate_pending_claim_rejected() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();
        let firm = Uuid::new_v4();

        create_request(&pool, user, firm, "It's my firm").await.unwrap();
        let second = create_request(&pool, user, firm, "Again").await;
        assert!(second.is_err());

        // A different firm is fine
        create_request(&pool, user, Uuid::new_v4(), "Other firm").await.unwrap();
    }

    #[tokio::test]
    async fn test_decide_only_once() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let request = create_request(&pool, user, Uuid::new_v4(), "").await.unwrap();

        let decided = decide_request(&pool, request.guid, RequestStatus::Approved, admin)
            .await
            .unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.decided_by, Some(admin));

        let again = decide_request(&pool, request.guid, RequestStatus::Rejected, admin).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_claim_again_after_rejection() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();
        let firm = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let request = create_request(&pool, user, firm, "").await.unwrap();
        decide_request(&pool, request.guid, RequestStatus::Rejected, admin)
            .await
            .unwrap();

        // Rejection does not block a new claim
        create_request(&pool, user, firm, "With proof this time").await.unwrap();

        let pending = list_requests(&pool, true).await.unwrap();
        assert_eq!(pending.len(), 1);
    }
}
