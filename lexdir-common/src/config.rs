//! Configuration loading and root folder resolution
//!
//! The root folder holds `lexdir.db`. Provider credentials live in the
//! `settings` table (database-first configuration) with environment variable
//! overrides for deployments that cannot seed the database ahead of time.

use crate::{Error, Result};
use sqlx::SqlitePool;
use std::path::PathBuf;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "lexdir.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path of the database file under the given root folder
pub fn database_path(root_folder: &std::path::Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Get default configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/lexdir/config.toml first, then /etc/lexdir/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("lexdir").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/lexdir/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("lexdir").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lexdir"))
        .unwrap_or_else(|| PathBuf::from("./lexdir_data"))
}

/// Read one value from the settings table
pub async fn get_setting(db: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;
    Ok(value)
}

/// Write one value to the settings table
pub async fn set_setting(db: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(db)
        .await?;
    Ok(())
}

/// WordPress CMS credentials
#[derive(Debug, Clone)]
pub struct WordPressSettings {
    pub base_url: String,
    pub username: String,
    pub app_password: String,
}

/// Algolia search index credentials
#[derive(Debug, Clone)]
pub struct AlgoliaSettings {
    pub app_id: String,
    pub api_key: String,
    pub index_name: String,
}

/// Transactional email provider credentials
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

/// Payments provider credentials
#[derive(Debug, Clone)]
pub struct PaymentsSettings {
    pub secret_key: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Provider configuration loaded per use from the settings table.
///
/// A provider group is `None` when any of its required keys is absent; the
/// caller then skips that target and keeps going.
#[derive(Debug, Clone, Default)]
pub struct IntegrationSettings {
    pub wordpress: Option<WordPressSettings>,
    pub algolia: Option<AlgoliaSettings>,
    pub email: Option<EmailSettings>,
    pub payments: Option<PaymentsSettings>,
}

impl IntegrationSettings {
    /// Load provider settings. Each settings key can be overridden by an
    /// environment variable of the same name uppercased with a `LEXDIR_`
    /// prefix (e.g. `wordpress_base_url` -> `LEXDIR_WORDPRESS_BASE_URL`).
    pub async fn load(db: &SqlitePool) -> Result<IntegrationSettings> {
        let wordpress = match (
            lookup(db, "wordpress_base_url").await?,
            lookup(db, "wordpress_username").await?,
            lookup(db, "wordpress_app_password").await?,
        ) {
            (Some(base_url), Some(username), Some(app_password)) => Some(WordPressSettings {
                base_url,
                username,
                app_password,
            }),
            _ => None,
        };

        let algolia = match (
            lookup(db, "algolia_app_id").await?,
            lookup(db, "algolia_api_key").await?,
            lookup(db, "algolia_index_name").await?,
        ) {
            (Some(app_id), Some(api_key), Some(index_name)) => Some(AlgoliaSettings {
                app_id,
                api_key,
                index_name,
            }),
            _ => None,
        };

        let email = match (
            lookup(db, "email_api_key").await?,
            lookup(db, "email_sender_address").await?,
        ) {
            (Some(api_key), Some(sender_email)) => Some(EmailSettings {
                api_key,
                sender_email,
                sender_name: lookup(db, "email_sender_name").await?,
            }),
            _ => None,
        };

        let payments = match (
            lookup(db, "payments_secret_key").await?,
            lookup(db, "payments_success_url").await?,
            lookup(db, "payments_cancel_url").await?,
        ) {
            (Some(secret_key), Some(success_url), Some(cancel_url)) => Some(PaymentsSettings {
                secret_key,
                success_url,
                cancel_url,
            }),
            _ => None,
        };

        Ok(IntegrationSettings {
            wordpress,
            algolia,
            email,
            payments,
        })
    }
}

/// Settings-table lookup with environment override; empty values count as
/// absent.
async fn lookup(db: &SqlitePool, key: &str) -> Result<Option<String>> {
    let env_name = format!("LEXDIR_{}", key.to_uppercase());
    if let Ok(value) = std::env::var(&env_name) {
        if !value.trim().is_empty() {
            return Ok(Some(value));
        }
    }

    Ok(get_setting(db, key)
        .await?
        .filter(|v| !v.trim().is_empty()))
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
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let pool = test_pool().await;

        assert_eq!(get_setting(&pool, "algolia_app_id").await.unwrap(), None);
        set_setting(&pool, "algolia_app_id", "APP123").await.unwrap();
        assert_eq!(
            get_setting(&pool, "algolia_app_id").await.unwrap().as_deref(),
            Some("APP123")
        );
    }

    #[tokio::test]
    async fn test_provider_group_absent_when_key_missing() {
        let pool = test_pool().await;

        // Two of three WordPress keys present: the group must not load
        set_setting(&pool, "wordpress_base_url", "https://example.com").await.unwrap();
        set_setting(&pool, "wordpress_username", "admin").await.unwrap();

        let settings = IntegrationSettings::load(&pool).await.unwrap();
        assert!(settings.wordpress.is_none());
        assert!(settings.algolia.is_none());

        set_setting(&pool, "wordpress_app_password", "xxxx yyyy").await.unwrap();
        let settings = IntegrationSettings::load(&pool).await.unwrap();
        let wp = settings.wordpress.expect("WordPress settings should load");
        assert_eq!(wp.base_url, "https://example.com");
        assert_eq!(wp.username, "admin");
    }

    #[tokio::test]
    async fn test_empty_value_counts_as_absent() {
        let pool = test_pool().await;

        set_setting(&pool, "email_api_key", "  ").await.unwrap();
        set_setting(&pool, "email_sender_address", "no-reply@example.com").await.unwrap();

        let settings = IntegrationSettings::load(&pool).await.unwrap();
        assert!(settings.email.is_none());
    }

    // Environment variables are process-global; serialize tests that touch them
    #[tokio::test]
    #[serial_test::serial]
    async fn test_env_override_wins_over_settings_table() {
        let pool = test_pool().await;

        set_setting(&pool, "algolia_app_id", "FROMDB").await.unwrap();
        set_setting(&pool, "algolia_api_key", "key").await.unwrap();
        set_setting(&pool, "algolia_index_name", "firms").await.unwrap();

        std::env::set_var("LEXDIR_ALGOLIA_APP_ID", "FROMENV");
        let settings = IntegrationSettings::load(&pool).await.unwrap();
        std::env::remove_var("LEXDIR_ALGOLIA_APP_ID");

        assert_eq!(settings.algolia.unwrap().app_id, "FROMENV");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn test_empty_env_override_is_ignored() {
        let pool = test_pool().await;

        set_setting(&pool, "algolia_app_id", "FROMDB").await.unwrap();
        set_setting(&pool, "algolia_api_key", "key").await.unwrap();
        set_setting(&pool, "algolia_index_name", "firms").await.unwrap();

        std::env::set_var("LEXDIR_ALGOLIA_APP_ID", "");
        let settings = IntegrationSettings::load(&pool).await.unwrap();
        std::env::remove_var("LEXDIR_ALGOLIA_APP_ID");

        assert_eq!(settings.algolia.unwrap().app_id, "FROMDB");
    }
}
