//! Notification database operations
//!
//! In-app notifications. Mark-read operations are scoped to the owning user
//! so a caller can never flip another user's rows.

use lexdir_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Notification record
#[derive(Debug, Clone)]
pub struct Notification {
    pub guid: Uuid,
    pub user_guid: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: String,
}

fn map_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let guid_str: String = row.get("guid");
    let user_guid_str: String = row.get("user_guid");
    let read: i64 = row.get("read");

    Ok(Notification {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid notification guid: {}", e)))?,
        user_guid: Uuid::parse_str(&user_guid_str)
            .map_err(|e| Error::Internal(format!("Invalid user guid: {}", e)))?,
        kind: row.get("kind"),
        title: row.get("title"),
        body: row.get("body"),
        link: row.get("link"),
        read: read != 0,
        created_at: row.get("created_at"),
    })
}

const NOTIFICATION_COLUMNS: &str =
    "guid, user_guid, kind, title, body, link, read, created_at";

/// Insert a notification for a user
pub async fn create_notification(
    pool: &SqlitePool,
    user_guid: Uuid,
    kind: &str,
    title: &str,
    body: &str,
    link: Option<&str>,
) -> Result<Notification> {
    let guid = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO notifications (guid, user_guid, kind, title, body, link, created_at)
        VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(user_guid.to_string())
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(link)
    .execute(pool)
    .await?;

    let row = sqlx::query(&format!(
        "SELECT {} FROM notifications WHERE guid = ?",
        NOTIFICATION_COLUMNS
    ))
    .bind(guid.to_string())
    .fetch_one(pool)
    .await?;

    map_notification(&row)
}

/// List a user's notifications, newest first
pub async fn list_for_user(
    pool: &SqlitePool,
    user_guid: Uuid,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let sql = if unread_only {
        format!(
            "SELECT {} FROM notifications WHERE user_guid = ? AND read = 0 ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM notifications WHERE user_guid = ? ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        )
    };

    let rows = sqlx::query(&sql)
        .bind(user_guid.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_notification).collect()
}

/// Mark one notification read. Returns false when the notification does not
/// exist or belongs to another user.
pub async fn mark_read(pool: &SqlitePool, user_guid: Uuid, guid: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE notifications SET read = 1 WHERE guid = ? AND user_guid = ?")
        .bind(guid.to_string())
        .bind(user_guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark all of a user's notifications read; returns the count flipped
pub async fn mark_all_read(pool: &SqlitePool, user_guid: Uuid) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_guid = ? AND read = 0")
        .bind(user_guid.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
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
    async fn test_unread_filter_and_mark_read() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();

        let first = create_notification(&pool, user, "lead", "New lead", "", None)
            .await
            .unwrap();
        create_notification(&pool, user, "ownership", "Claim approved", "", Some("/firms/x"))
            .await
            .unwrap();

        assert_eq!(list_for_user(&pool, user, true).await.unwrap().len(), 2);

        assert!(mark_read(&pool, user, first.guid).await.unwrap());
        assert_eq!(list_for_user(&pool, user, true).await.unwrap().len(), 1);
        assert_eq!(list_for_user(&pool, user, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_owner() {
        let pool = test_pool().await;
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let n = create_notification(&pool, owner, "lead", "New lead", "", None)
            .await
            .unwrap();

        assert!(!mark_read(&pool, intruder, n.guid).await.unwrap());
        assert_eq!(list_for_user(&pool, owner, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_read_counts() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();

        for i in 0..3 {
            create_notification(&pool, user, "lead", &format!("Lead {}", i), "", None)
                .await
                .unwrap();
        }

        assert_eq!(mark_all_read(&pool, user).await.unwrap(), 3);
        assert_eq!(mark_all_read(&pool, user).await.unwrap(), 0);
    }
}
