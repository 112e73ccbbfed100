//! User database operations

use lexdir_common::{Error, Result, Role, UserStatus};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// User record
#[derive(Debug, Clone)]
pub struct User {
    pub guid: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: Role,
    pub status: UserStatus,
    pub firm_guid: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields submitted at registration; everything else is a generated default
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub password_salt: String,
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let guid_str: String = row.get("guid");
    let firm_guid_str: Option<String> = row.get("firm_guid");
    let role_str: String = row.get("role");
    let status_str: String = row.get("status");

    Ok(User {
        guid: Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Invalid user guid: {}", e)))?,
        email: row.get("email"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        role: Role::parse(&role_str),
        status: UserStatus::parse(&status_str),
        firm_guid: firm_guid_str.and_then(|s| Uuid::parse_str(&s).ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const USER_COLUMNS: &str = "guid, email, display_name, password_hash, password_salt, role, status, firm_guid, created_at, updated_at";

/// Create a user with default role (basic) and status (active)
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> Result<User> {
    let guid = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (guid, email, display_name, password_hash, password_salt, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(guid.to_string())
    .bind(&new_user.email)
    .bind(&new_user.display_name)
    .bind(&new_user.password_hash)
    .bind(&new_user.password_salt)
    .execute(pool)
    .await?;

    get_user(pool, guid)
        .await?
        .ok_or_else(|| Error::Internal("User vanished after insert".to_string()))
}

/// Load user by guid; missing user is None, not an error
pub async fn get_user(pool: &SqlitePool, guid: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE guid = ?", USER_COLUMNS))
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(map_user(&row)?)),
        None => Ok(None),
    }
}

/// Load user by email; missing user is None, not an error
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(map_user(&row)?)),
        None => Ok(None),
    }
}

/// List all users, newest first
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY created_at DESC",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_user).collect()
}

/// Update role and/or status
pub async fn update_role_status(
    pool: &SqlitePool,
    guid: Uuid,
    role: Option<Role>,
    status: Option<UserStatus>,
) -> Result<()> {
    if let Some(role) = role {
        sqlx::query("UPDATE users SET role = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
            .bind(role.as_str())
            .bind(guid.to_string())
            .execute(pool)
            .await?;
    }
    if let Some(status) = status {
        sqlx::query("UPDATE users SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?")
            .bind(status.as_str())
            .bind(guid.to_string())
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Link a user to a firm as its admin (ownership approval side effect)
pub async fn link_user_to_firm(pool: &SqlitePool, user_guid: Uuid, firm_guid: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE users SET role = ?, firm_guid = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(Role::FirmAdmin.as_str())
    .bind(firm_guid.to_string())
    .bind(user_guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Firm admins whose firm has a branch tagged with the given practice area.
/// Used to pick new-lead email recipients.
pub async fn list_firm_admins_for_practice_area(
    pool: &SqlitePool,
    practice_area: &str,
) -> Result<Vec<User>> {
    // practice_areas is a JSON array stored as text; match the quoted value
    let pattern = format!("%\"{}\"%", practice_area);

    let rows = sqlx::query(&format!(
        r#"
        SELECT DISTINCT u.{}
        FROM users u
        JOIN firms f ON f.guid = u.firm_guid AND f.deleted = 0
        JOIN branches b ON b.firm_guid = f.guid
        WHERE u.role = 'firm_admin'
          AND u.status = 'active'
          AND b.practice_areas LIKE ?
        "#,
        USER_COLUMNS.replace(", ", ", u.")
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_user).collect()
}
