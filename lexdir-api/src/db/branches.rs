//! Branch ("sede") database operations
//!
//! Every branch belongs to exactly one firm. The "at least one branch per
//! firm" rule is a handler-level convention: this module only reports counts.

use lexdir_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Branch record
#[derive(Debug, Clone)]
pub struct Branch {
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

/// Writable branch fields
#[derive(Debug, Clone, Default)]
pub struct BranchInput {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub practice_areas: Vec<String>,
    pub is_principal: bool,
}

fn map_branch(row: &sqlx::sqlite::SqliteRow) -> Result<Branch> {
    let guid_str: String = row.get("guid");
    let firm_guid_str: String = row.get("firm_guid");
    let areas_json: String = row.get("practice_areas");
    let is_principal: i64 = row.get("is_principal");

    Ok(Branch {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid branch guid: {}", e)))?,
        firm_guid: Uuid::parse_str(&firm_guid_str)
            .map_err(|e| Error::Internal(format!("Invalid firm guid: {}", e)))?,
        name: row.get("name"),
        address: row.get("address"),
        city: row.get("city"),
        province: row.get("province"),
        postal_code: row.get("postal_code"),
        phone: row.get("phone"),
        email: row.get("email"),
        practice_areas: serde_json::from_str(&areas_json).unwrap_or_default(),
        is_principal: is_principal != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const BRANCH_COLUMNS: &str = "guid, firm_guid, name, address, city, province, postal_code, phone, email, practice_areas, is_principal, created_at, updated_at";

/// Create a branch. A principal branch demotes any existing principal.
pub async fn create_branch(
    pool: &SqlitePool,
    firm_guid: Uuid,
    input: &BranchInput,
) -> Result<Branch> {
    let guid = Uuid::new_v4();
    let areas_json = serde_json::to_string(&input.practice_areas)
        .map_err(|e| Error::Internal(format!("Failed to encode practice areas: {}", e)))?;

    if input.is_principal {
        clear_principal(pool, firm_guid).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO branches (
            guid, firm_guid, name, address, city, province, postal_code,
            phone, email, practice_areas, is_principal, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(firm_guid.to_string())
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.city)
    .bind(&input.province)
    .bind(&input.postal_code)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&areas_json)
    .bind(input.is_principal as i64)
    .execute(pool)
    .await?;

    get_branch(pool, guid)
        .await?
        .ok_or_else(|| Error::Internal("Branch vanished after insert".to_string()))
}

/// Load branch by guid
pub async fn get_branch(pool: &SqlitePool, guid: Uuid) -> Result<Option<Branch>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM branches WHERE guid = ?",
        BRANCH_COLUMNS
    ))
    .bind(guid.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_branch(&row)?)),
        None => Ok(None),
    }
}

/// List branches of a firm, principal first
pub async fn list_for_firm(pool: &SqlitePool, firm_guid: Uuid) -> Result<Vec<Branch>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM branches WHERE firm_guid = ? ORDER BY is_principal DESC, created_at ASC",
        BRANCH_COLUMNS
    ))
    .bind(firm_guid.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_branch).collect()
}

/// Count branches of a firm
pub async fn count_for_firm(pool: &SqlitePool, firm_guid: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM branches WHERE firm_guid = ?")
        .bind(firm_guid.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Update a branch. Promoting to principal demotes the current principal.
pub async fn update_branch(pool: &SqlitePool, guid: Uuid, input: &BranchInput) -> Result<Branch> {
    let existing = get_branch(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Branch {}", guid)))?;

    let areas_json = serde_json::to_string(&input.practice_areas)
        .map_err(|e| Error::Internal(format!("Failed to encode practice areas: {}", e)))?;

    if input.is_principal && !existing.is_principal {
        clear_principal(pool, existing.firm_guid).await?;
    }

    sqlx::query(
        r#"
        UPDATE branches
        SET name = ?, address = ?, city = ?, province = ?, postal_code = ?,
            phone = ?, email = ?, practice_areas = ?, is_principal = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.address)
    .bind(&input.city)
    .bind(&input.province)
    .bind(&input.postal_code)
    .bind(&input.phone)
    .bind(&input.email)
    .bind(&areas_json)
    .bind(input.is_principal as i64)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    get_branch(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Branch {}", guid)))
}

/// Delete a branch
pub async fn delete_branch(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM branches WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

async fn clear_principal(pool: &SqlitePool, firm_guid: Uuid) -> Result<()> {
    sqlx::query("UPDATE branches SET is_principal = 0 WHERE firm_guid = ? AND is_principal = 1")
        .bind(firm_guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}
