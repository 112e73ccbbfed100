//! Firm ("despacho") database operations
//!
//! The local row is authoritative; `cms_post_id` and `search_object_id`
//! record where the last successful remote pushes landed.

use lexdir_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Firm verification/publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmStatus {
    Pending,
    Verified,
    Published,
}

impl FirmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirmStatus::Pending => "pending",
            FirmStatus::Verified => "verified",
            FirmStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> FirmStatus {
        match value {
            "verified" => FirmStatus::Verified,
            "published" => FirmStatus::Published,
            _ => FirmStatus::Pending,
        }
    }
}

/// Firm record
#[derive(Debug, Clone)]
pub struct Firm {
    pub guid: Uuid,
    pub name: String,
    pub slug: String,
    pub status: FirmStatus,
    pub owner_email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub cms_post_id: Option<i64>,
    pub search_object_id: Option<String>,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable firm fields
#[derive(Debug, Clone, Default)]
pub struct FirmInput {
    pub name: String,
    pub slug: Option<String>,
    pub status: Option<FirmStatus>,
    pub owner_email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
}

/// Derive a URL slug from a firm name (lowercase, ascii, hyphen-separated)
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;

    for c in name.chars() {
        let mapped = match c {
            'á' | 'à' | 'ä' => Some('a'),
            'é' | 'è' | 'ë' => Some('e'),
            'í' | 'ì' | 'ï' => Some('i'),
            'ó' | 'ò' | 'ö' => Some('o'),
            'ú' | 'ù' | 'ü' => Some('u'),
            'ñ' => Some('n'),
            'ç' => Some('c'),
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        };

        match mapped {
            Some(c) => {
                slug.push(c);
                last_was_hyphen = false;
            }
            None if !last_was_hyphen => {
                slug.push('-');
                last_was_hyphen = true;
            }
            None => {}
        }
    }

    slug.trim_matches('-').to_string()
}

fn map_firm(row: &sqlx::sqlite::SqliteRow) -> Result<Firm> {
    let guid_str: String = row.get("guid");
    let status_str: String = row.get("status");
    let deleted: i64 = row.get("deleted");

    Ok(Firm {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid firm guid: {}", e)))?,
        name: row.get("name"),
        slug: row.get("slug"),
        status: FirmStatus::parse(&status_str),
        owner_email: row.get("owner_email"),
        phone: row.get("phone"),
        description: row.get("description"),
        cms_post_id: row.get("cms_post_id"),
        search_object_id: row.get("search_object_id"),
        deleted: deleted != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const FIRM_COLUMNS: &str = "guid, name, slug, status, owner_email, phone, description, cms_post_id, search_object_id, deleted, created_at, updated_at";

/// Create a firm
pub async fn create_firm(pool: &SqlitePool, input: &FirmInput) -> Result<Firm> {
    let guid = Uuid::new_v4();
    let slug = input
        .slug
        .clone()
        .unwrap_or_else(|| slugify(&input.name));
    let status = input.status.unwrap_or(FirmStatus::Pending);

    sqlx::query(
        r#"
        INSERT INTO firms (guid, name, slug, status, owner_email, phone, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(&input.name)
    .bind(&slug)
    .bind(status.as_str())
    .bind(&input.owner_email)
    .bind(&input.phone)
    .bind(&input.description)
    .execute(pool)
    .await?;

    get_firm(pool, guid)
        .await?
        .ok_or_else(|| Error::Internal("Firm vanished after insert".to_string()))
}

/// Load firm by guid (soft-deleted rows included; callers filter)
pub async fn get_firm(pool: &SqlitePool, guid: Uuid) -> Result<Option<Firm>> {
    let row = sqlx::query(&format!("SELECT {} FROM firms WHERE guid = ?", FIRM_COLUMNS))
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(map_firm(&row)?)),
        None => Ok(None),
    }
}

/// Load the oldest non-deleted firm with the given slug
pub async fn get_firm_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Firm>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM firms WHERE slug = ? AND deleted = 0 ORDER BY created_at ASC LIMIT 1",
        FIRM_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_firm(&row)?)),
        None => Ok(None),
    }
}

/// List non-deleted firms with optional name filter and status filter
pub async fn list_firms(
    pool: &SqlitePool,
    name_filter: Option<&str>,
    status: Option<FirmStatus>,
) -> Result<Vec<Firm>> {
    let mut sql = format!(
        "SELECT {} FROM firms WHERE deleted = 0",
        FIRM_COLUMNS
    );
    if name_filter.is_some() {
        sql.push_str(" AND name LIKE ?");
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY name ASC");

    let mut query = sqlx::query(&sql);
    if let Some(name) = name_filter {
        query = query.bind(format!("%{}%", name));
    }
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(map_firm).collect()
}

/// List every non-deleted firm guid (maintenance sweep)
pub async fn list_firm_guids(pool: &SqlitePool) -> Result<Vec<Uuid>> {
    let rows: Vec<String> =
        sqlx::query_scalar("SELECT guid FROM firms WHERE deleted = 0 ORDER BY created_at ASC")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .iter()
        .filter_map(|s| Uuid::parse_str(s).ok())
        .collect())
}

/// Update writable firm fields
pub async fn update_firm(pool: &SqlitePool, guid: Uuid, input: &FirmInput) -> Result<Firm> {
    let slug = input
        .slug
        .clone()
        .unwrap_or_else(|| slugify(&input.name));

    sqlx::query(
        r#"
        UPDATE firms
        SET name = ?, slug = ?,
            status = COALESCE(?, status),
            owner_email = COALESCE(?, owner_email),
            phone = COALESCE(?, phone),
            description = COALESCE(?, description),
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&input.name)
    .bind(&slug)
    .bind(input.status.map(|s| s.as_str()))
    .bind(&input.owner_email)
    .bind(&input.phone)
    .bind(&input.description)
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    get_firm(pool, guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Firm {}", guid)))
}

/// Soft-delete a firm (hidden from listings, remote copies removed best-effort)
pub async fn soft_delete_firm(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    sqlx::query("UPDATE firms SET deleted = 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Hard-delete a firm and its branches
pub async fn hard_delete_firm(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM branches WHERE firm_guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM firms WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Record the external identifiers handed back by a successful remote push.
/// Best-effort: callers log failures and move on.
pub async fn set_external_ids(
    pool: &SqlitePool,
    guid: Uuid,
    cms_post_id: Option<i64>,
    search_object_id: Option<&str>,
) -> Result<()> {
    if let Some(post_id) = cms_post_id {
        sqlx::query("UPDATE firms SET cms_post_id = ? WHERE guid = ?")
            .bind(post_id)
            .bind(guid.to_string())
            .execute(pool)
            .await?;
    }
    if let Some(object_id) = search_object_id {
        sqlx::query("UPDATE firms SET search_object_id = ? WHERE guid = ?")
            .bind(object_id)
            .bind(guid.to_string())
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Collapse duplicate slugs: keep the oldest row per slug, re-point branches
/// at the survivor, and hard-delete the rest. Returns the number of rows
/// removed. Duplicates appear when CMS imports race manual creation.
pub async fn dedup_firms(pool: &SqlitePool) -> Result<u64> {
    let duplicate_slugs: Vec<String> = sqlx::query_scalar(
        "SELECT slug FROM firms WHERE deleted = 0 GROUP BY slug HAVING COUNT(*) > 1",
    )
    .fetch_all(pool)
    .await?;

    let mut removed = 0u64;

    for slug in duplicate_slugs {
        let rows = sqlx::query(
            "SELECT guid FROM firms WHERE slug = ? AND deleted = 0 ORDER BY created_at ASC, guid ASC",
        )
        .bind(&slug)
        .fetch_all(pool)
        .await?;

        let mut guids = rows.iter().map(|r| r.get::<String, _>("guid"));
        let Some(keeper) = guids.next() else { continue };

        for loser in guids {
            sqlx::query("UPDATE branches SET firm_guid = ? WHERE firm_guid = ?")
                .bind(&keeper)
                .bind(&loser)
                .execute(pool)
                .await?;
            sqlx::query("DELETE FROM firms WHERE guid = ?")
                .bind(&loser)
                .execute(pool)
                .await?;
            removed += 1;
        }
    }

    Ok(removed)
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

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("García & Asociados"), "garcia-asociados");
        assert_eq!(slugify("Bufete Peñalver, S.L."), "bufete-penalver-s-l");
        assert_eq!(slugify("  Simple  "), "simple");
    }

    #[tokio::test]
    async fn test_create_and_list_excludes_soft_deleted() {
        let pool = test_pool().await;

        let firm = create_firm(
            &pool,
            &FirmInput {
                name: "Despacho Uno".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(firm.slug, "despacho-uno");
        assert_eq!(firm.status, FirmStatus::Pending);

        assert_eq!(list_firms(&pool, None, None).await.unwrap().len(), 1);

        soft_delete_firm(&pool, firm.guid).await.unwrap();
        assert!(list_firms(&pool, None, None).await.unwrap().is_empty());

        // Soft-deleted row still loadable by guid
        assert!(get_firm(&pool, firm.guid).await.unwrap().unwrap().deleted);
    }

    #[tokio::test]
    async fn test_dedup_keeps_oldest_and_repoints_branches() {
        let pool = test_pool().await;

        // Two firms sharing a slug; the older one must survive
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO firms (guid, name, slug, created_at, updated_at) VALUES (?, 'A', 'shared', '2023-01-01 00:00:00', '2023-01-01 00:00:00')",
        )
        .bind(older.to_string())
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO firms (guid, name, slug, created_at, updated_at) VALUES (?, 'B', 'shared', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
        )
        .bind(newer.to_string())
        .execute(&pool)
        .await
        .unwrap();

        let branch_guid = Uuid::new_v4();
        sqlx::query("INSERT INTO branches (guid, firm_guid, name) VALUES (?, ?, 'Sede')")
            .bind(branch_guid.to_string())
            .bind(newer.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let removed = dedup_firms(&pool).await.unwrap();
        assert_eq!(removed, 1);

        assert!(get_firm(&pool, older).await.unwrap().is_some());
        assert!(get_firm(&pool, newer).await.unwrap().is_none());

        let repointed: String =
            sqlx::query_scalar("SELECT firm_guid FROM branches WHERE guid = ?")
                .bind(branch_guid.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(repointed, older.to_string());
    }
}
