//! Email preference and digest queue operations
//!
//! Preferences are per (user, category). A missing row means the default:
//! immediate delivery enabled. The digest queue holds messages for users who
//! opted into a daily summary; a maintenance run flushes it.

use lexdir_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Per-category delivery preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailPref {
    pub enabled: bool,
    pub daily_summary: bool,
}

impl Default for EmailPref {
    fn default() -> Self {
        EmailPref {
            enabled: true,
            daily_summary: false,
        }
    }
}

/// Queued digest entry
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub guid: Uuid,
    pub user_guid: Uuid,
    pub category: String,
    pub subject: String,
    pub body: String,
    pub queued_at: String,
}

/// Load a user's preference for a category; absent row yields the default
pub async fn get_pref(pool: &SqlitePool, user_guid: Uuid, category: &str) -> Result<EmailPref> {
    let row = sqlx::query(
        "SELECT enabled, daily_summary FROM email_prefs WHERE user_guid = ? AND category = ?",
    )
    .bind(user_guid.to_string())
    .bind(category)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let enabled: i64 = row.get("enabled");
            let daily_summary: i64 = row.get("daily_summary");
            Ok(EmailPref {
                enabled: enabled != 0,
                daily_summary: daily_summary != 0,
            })
        }
        None => Ok(EmailPref::default()),
    }
}

/// Upsert a user's preference for a category
pub async fn set_pref(
    pool: &SqlitePool,
    user_guid: Uuid,
    category: &str,
    pref: EmailPref,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO email_prefs (user_guid, category, enabled, daily_summary)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (user_guid, category) DO UPDATE SET enabled = excluded.enabled, daily_summary = excluded.daily_summary
        "#,
    )
    .bind(user_guid.to_string())
    .bind(category)
    .bind(pref.enabled as i64)
    .bind(pref.daily_summary as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Queue a message for the user's next daily summary
pub async fn queue_digest(
    pool: &SqlitePool,
    user_guid: Uuid,
    category: &str,
    subject: &str,
    body: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO email_digest (guid, user_guid, category, subject, body, queued_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_guid.to_string())
    .bind(category)
    .bind(subject)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(())
}

/// All unsent digest entries, oldest first, grouped by queue order
pub async fn list_unsent_digests(pool: &SqlitePool) -> Result<Vec<DigestEntry>> {
    let rows = sqlx::query(
        "SELECT guid, user_guid, category, subject, body, queued_at FROM email_digest WHERE sent = 0 ORDER BY user_guid, queued_at ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let guid_str: String = row.get("guid");
            let user_guid_str: String = row.get("user_guid");
            Ok(DigestEntry {
                guid: Uuid::parse_str(&guid_str)
                    .map_err(|e| Error::Internal(format!("Invalid digest guid: {}", e)))?,
                user_guid: Uuid::parse_str(&user_guid_str)
                    .map_err(|e| Error::Internal(format!("Invalid user guid: {}", e)))?,
                category: row.get("category"),
                subject: row.get("subject"),
                body: row.get("body"),
                queued_at: row.get("queued_at"),
            })
        })
        .collect()
}

/// Mark digest entries sent after a successful flush
pub async fn mark_digests_sent(pool: &SqlitePool, guids: &[Uuid]) -> Result<()> {
    for guid in guids {
        sqlx::query("UPDATE email_digest SET sent = 1 WHERE guid = ?")
            .bind(guid.to_string())
            .execute(pool)
            .await?;
    }

    Ok(())
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
    async fn test_missing_pref_defaults_to_enabled() {
        let pool = test_pool().await;

        let pref = get_pref(&pool, Uuid::new_v4(), "new_lead").await.unwrap();
        assert!(pref.enabled);
        assert!(!pref.daily_summary);
    }

    #[tokio::test]
    async fn test_set_pref_upserts() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();

        set_pref(&pool, user, "new_lead", EmailPref { enabled: false, daily_summary: false })
            .await
            .unwrap();
        assert!(!get_pref(&pool, user, "new_lead").await.unwrap().enabled);

        set_pref(&pool, user, "new_lead", EmailPref { enabled: true, daily_summary: true })
            .await
            .unwrap();
        let pref = get_pref(&pool, user, "new_lead").await.unwrap();
        assert!(pref.enabled);
        assert!(pref.daily_summary);

        // Other categories keep the default
        assert!(get_pref(&pool, user, "ownership_update").await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_digest_queue_flush() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();

        queue_digest(&pool, user, "new_lead", "New lead", "A lead arrived").await.unwrap();
        queue_digest(&pool, user, "new_lead", "New lead", "Another one").await.unwrap();

        let unsent = list_unsent_digests(&pool).await.unwrap();
        assert_eq!(unsent.len(), 2);

        let guids: Vec<Uuid> = unsent.iter().map(|e| e.guid).collect();
        mark_digests_sent(&pool, &guids).await.unwrap();

        assert!(list_unsent_digests(&pool).await.unwrap().is_empty());
    }
}
