//! Lead database operations
//!
//! Leads arrive from the public intake form, get a heuristic score, then move
//! through review (price approval or discard) before they can be purchased.

use lexdir_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadStatus {
    Pending,
    Processed,
    Discarded,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Processed => "processed",
            LeadStatus::Discarded => "discarded",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processed" => LeadStatus::Processed,
            "discarded" => LeadStatus::Discarded,
            _ => LeadStatus::Pending,
        }
    }
}

/// Lead record
#[derive(Debug, Clone)]
pub struct Lead {
    pub guid: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub practice_area: String,
    pub message: String,
    pub score: f64,
    pub price: f64,
    pub status: LeadStatus,
    pub buyer_firm_guid: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields submitted by the public intake form
#[derive(Debug, Clone)]
pub struct LeadInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub practice_area: String,
    pub message: String,
}

fn map_lead(row: &sqlx::sqlite::SqliteRow) -> Result<Lead> {
    let guid_str: String = row.get("guid");
    let status_str: String = row.get("status");
    let buyer_str: Option<String> = row.get("buyer_firm_guid");

    Ok(Lead {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid lead guid: {}", e)))?,
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        city: row.get("city"),
        practice_area: row.get("practice_area"),
        message: row.get("message"),
        score: row.get("score"),
        price: row.get("price"),
        status: LeadStatus::parse(&status_str),
        buyer_firm_guid: buyer_str.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const LEAD_COLUMNS: &str = "guid, name, email, phone, city, practice_area, message, score, price, status, buyer_firm_guid, created_at, updated_at";

/// Insert a new lead with its computed score and suggested price. The price
/// stays a suggestion until a super admin approves it.
pub async fn create_lead(
    pool: &SqlitePool,
    input: &LeadInput,
    score: f64,
    suggested_price: f64,
) -> Result<Lead> {
    let guid = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO leads (guid, name, email, phone, city, practice_area, message, score, price, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.city)
    .bind(&input.practice_area)
    .bind(&input.message)
    .bind(score)
    .bind(suggested_price)
    .execute(pool)
    .await?;

    get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::Internal("Lead vanished after insert".to_string()))
}

/// Load lead by guid
pub async fn get_lead(pool: &SqlitePool, guid: Uuid) -> Result<Option<Lead>> {
    let row = sqlx::query(&format!("SELECT {} FROM leads WHERE guid = ?", LEAD_COLUMNS))
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(map_lead(&row)?)),
        None => Ok(None),
    }
}

/// List leads, optionally filtered by status, newest first
pub async fn list_leads(pool: &SqlitePool, status: Option<LeadStatus>) -> Result<Vec<Lead>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(&format!(
                "SELECT {} FROM leads WHERE status = ? ORDER BY created_at DESC",
                LEAD_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM leads ORDER BY created_at DESC",
                LEAD_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(map_lead).collect()
}

/// Approve a price: pending -> processed. Price must be positive.
pub async fn approve_price(pool: &SqlitePool, guid: Uuid, price: f64) -> Result<Lead> {
    if price <= 0.0 {
        return Err(Error::InvalidInput("Price must be positive".to_string()));
    }

    let lead = get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead {}", guid)))?;

    if lead.status != LeadStatus::Pending {
        return Err(Error::InvalidInput(
            "Only pending leads can be priced".to_string(),
        ));
    }

    sqlx::query(
        "UPDATE leads SET price = ?, status = 'processed', updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(price)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead {}", guid)))
}

/// Discard a pending lead
pub async fn discard_lead(pool: &SqlitePool, guid: Uuid) -> Result<Lead> {
    let lead = get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead {}", guid)))?;

    if lead.status != LeadStatus::Pending {
        return Err(Error::InvalidInput(
            "Only pending leads can be discarded".to_string(),
        ));
    }

    sqlx::query("UPDATE leads SET status = 'discarded', updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead {}", guid)))
}

/// Record the purchasing firm. Only processed, unsold leads can be bought.
pub async fn set_buyer(pool: &SqlitePool, guid: Uuid, buyer_firm_guid: Uuid) -> Result<Lead> {
    let lead = get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead {}", guid)))?;

    if lead.status != LeadStatus::Processed {
        return Err(Error::InvalidInput(
            "Lead is not available for purchase".to_string(),
        ));
    }
    if lead.buyer_firm_guid.is_some() {
        return Err(Error::InvalidInput("Lead has already been sold".to_string()));
    }

    sqlx::query(
        "UPDATE leads SET buyer_firm_guid = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(buyer_firm_guid.to_string())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    get_lead(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lead {}", guid)))
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

    fn sample_lead() -> LeadInput {
        LeadInput {
            name: "Carlos".to_string(),
            email: "carlos@example.com".to_string(),
            phone: Some("+34600111222".to_string()),
            city: Some("Valencia".to_string()),
            practice_area: "laboral".to_string(),
            message: "Despido improcedente, necesito asesoramiento".to_string(),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_pending_to_sold() {
        let pool = test_pool().await;
        let lead = create_lead(&pool, &sample_lead(), 0.7, 40.0).await.unwrap();
        assert_eq!(lead.status, LeadStatus::Pending);
        assert_eq!(lead.score, 0.7);
        assert_eq!(lead.price, 40.0);

        let priced = approve_price(&pool, lead.guid, 45.0).await.unwrap();
        assert_eq!(priced.status, LeadStatus::Processed);
        assert_eq!(priced.price, 45.0);

        let buyer = Uuid::new_v4();
        let sold = set_buyer(&pool, lead.guid, buyer).await.unwrap();
        assert_eq!(sold.buyer_firm_guid, Some(buyer));

        // Second purchase is refused
        assert!(set_buyer(&pool, lead.guid, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_price_must_be_positive() {
        let pool = test_pool().await;
        let lead = create_lead(&pool, &sample_lead(), 0.5, 40.0).await.unwrap();

        assert!(approve_price(&pool, lead.guid, 0.0).await.is_err());
        assert!(approve_price(&pool, lead.guid, -10.0).await.is_err());

        let reloaded = get_lead(&pool, lead.guid).await.unwrap().unwrap();
        assert_eq!(reloaded.status, LeadStatus::Pending);
    }

    #[tokio::test]
    async fn test_discarded_lead_cannot_be_priced_or_sold() {
        let pool = test_pool().await;
        let lead = create_lead(&pool, &sample_lead(), 0.2, 15.0).await.unwrap();

        discard_lead(&pool, lead.guid).await.unwrap();

        assert!(approve_price(&pool, lead.guid, 30.0).await.is_err());
        assert!(set_buyer(&pool, lead.guid, Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_status_filter() {
        let pool = test_pool().await;
        let a = create_lead(&pool, &sample_lead(), 0.5, 40.0).await.unwrap();
        create_lead(&pool, &sample_lead(), 0.5, 40.0).await.unwrap();

        approve_price(&pool, a.guid, 20.0).await.unwrap();

        assert_eq!(list_leads(&pool, Some(LeadStatus::Pending)).await.unwrap().len(), 1);
        assert_eq!(list_leads(&pool, Some(LeadStatus::Processed)).await.unwrap().len(), 1);
        assert_eq!(list_leads(&pool, None).await.unwrap().len(), 2);
    }
}
