//! Session database operations
//!
//! Sessions are opaque bearer tokens with a unix-seconds expiry. Expired rows
//! are ignored on lookup and swept opportunistically on login.

use crate::db::users::User;
use chrono::Utc;
use lexdir_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Persist a new session token for the user
pub async fn create_session(
    pool: &SqlitePool,
    user_guid: Uuid,
    token: &str,
    ttl_hours: i64,
) -> Result<()> {
    let now = Utc::now().timestamp();
    let expires_at = now + ttl_hours * 3600;

    sqlx::query(
        "INSERT INTO sessions (token, user_guid, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token)
    .bind(user_guid.to_string())
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Resolve a bearer token to its user, ignoring expired sessions
pub async fn find_user_by_token(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let now = Utc::now().timestamp();

    let user_guid: Option<String> = sqlx::query_scalar(
        "SELECT user_guid FROM sessions WHERE token = ? AND expires_at > ?",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    match user_guid.and_then(|s| Uuid::parse_str(&s).ok()) {
        Some(guid) => crate::db::users::get_user(pool, guid).await,
        None => Ok(None),
    }
}

/// Delete one session (logout)
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Sweep expired sessions
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let now = Utc::now().timestamp();

    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::{create_user, NewUser};
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

    async fn seed_user(pool: &SqlitePool) -> User {
        let salt = lexdir_common::auth::generate_salt();
        create_user(
            pool,
            &NewUser {
                email: "s@example.com".to_string(),
                display_name: "S".to_string(),
                password_hash: lexdir_common::auth::hash_password("pw", &salt),
                password_salt: salt,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;
        let token = lexdir_common::auth::generate_session_token();

        create_session(&pool, user.guid, &token, 1).await.unwrap();

        let found = find_user_by_token(&pool, &token).await.unwrap().unwrap();
        assert_eq!(found.guid, user.guid);

        delete_session(&pool, &token).await.unwrap();
        assert!(find_user_by_token(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_ignored() {
        let pool = test_pool().await;
        let user = seed_user(&pool).await;
        let token = lexdir_common::auth::generate_session_token();

        // ttl of -1 hour: already expired
        create_session(&pool, user.guid, &token, -1).await.unwrap();

        assert!(find_user_by_token(&pool, &token).await.unwrap().is_none());
        assert_eq!(purge_expired(&pool).await.unwrap(), 1);
    }
}
