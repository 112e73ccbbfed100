//! Email dispatch policy
//!
//! Every outbound email goes through [`dispatch`]: the recipient's stored
//! preference for the category decides whether the message is sent now,
//! suppressed, or queued for the daily summary. A missing preference row
//! means immediate delivery. Local writes never depend on provider success.

use crate::db::email_prefs::{self, EmailPref};
use crate::db::leads::Lead;
use crate::db::notifications;
use crate::db::users::{self, User};
use crate::services::email::EmailClient;
use lexdir_common::config::IntegrationSettings;
use lexdir_common::Result;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

pub const CATEGORY_NEW_LEAD: &str = "new_lead";
pub const CATEGORY_OWNERSHIP_UPDATE: &str = "ownership_update";

/// Delivery decision for one (recipient, category) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Deliver immediately
    Send,
    /// Recipient disabled this category; send nothing
    Suppress,
    /// Recipient wants a daily summary; queue instead
    Digest,
}

/// Pure routing decision from a preference row
pub fn route_for(pref: EmailPref) -> Delivery {
    if !pref.enabled {
        Delivery::Suppress
    } else if pref.daily_summary {
        Delivery::Digest
    } else {
        Delivery::Send
    }
}

/// Dispatch one email honoring the recipient's preference. Returns the
/// routing decision taken. Provider failures are logged, never propagated.
pub async fn dispatch(
    pool: &SqlitePool,
    recipient: &User,
    category: &str,
    subject: &str,
    html_body: &str,
) -> Result<Delivery> {
    let pref = email_prefs::get_pref(pool, recipient.guid, category).await?;
    let decision = route_for(pref);

    match decision {
        Delivery::Suppress => {
            info!(user = %recipient.email, category, "Email suppressed by preference");
        }
        Delivery::Digest => {
            email_prefs::queue_digest(pool, recipient.guid, category, subject, html_body).await?;
            info!(user = %recipient.email, category, "Email queued for daily summary");
        }
        Delivery::Send => {
            send_now(pool, recipient, subject, html_body).await?;
        }
    }

    Ok(decision)
}

/// Immediate send; unconfigured provider downgrades to a logged skip
async fn send_now(
    pool: &SqlitePool,
    recipient: &User,
    subject: &str,
    html_body: &str,
) -> Result<()> {
    let settings = IntegrationSettings::load(pool).await?;
    let Some(email_settings) = settings.email else {
        warn!(user = %recipient.email, "Email provider not configured, skipping send");
        return Ok(());
    };

    match EmailClient::new(email_settings) {
        Ok(client) => {
            if let Err(e) = client
                .send(&recipient.email, Some(&recipient.display_name), subject, html_body)
                .await
            {
                warn!(user = %recipient.email, error = %e, "Email send failed");
            }
        }
        Err(e) => warn!(error = %e, "Email client construction failed"),
    }

    Ok(())
}

/// Notify firm admins in the lead's practice area: in-app notification plus
/// a preference-routed email per recipient.
pub async fn notify_new_lead(pool: &SqlitePool, lead: &Lead) -> Result<()> {
    let recipients =
        users::list_firm_admins_for_practice_area(pool, &lead.practice_area).await?;

    let subject = format!("Nuevo caso de {}", lead.practice_area);
    let body = format!(
        "<p>Hay un nuevo caso de <b>{}</b>{} disponible en el mercado de casos.</p>",
        lead.practice_area,
        lead.city
            .as_deref()
            .map(|c| format!(" en {}", c))
            .unwrap_or_default()
    );

    for recipient in &recipients {
        notifications::create_notification(
            pool,
            recipient.guid,
            CATEGORY_NEW_LEAD,
            &subject,
            "",
            Some(&format!("/leads/{}", lead.guid)),
        )
        .await?;

        dispatch(pool, recipient, CATEGORY_NEW_LEAD, &subject, &body).await?;
    }

    info!(lead = %lead.guid, recipients = recipients.len(), "New-lead notifications dispatched");
    Ok(())
}

/// Flush the digest queue: one summary email per user, entries marked sent
/// only after the provider accepts. Returns the number of entries flushed.
pub async fn flush_digests(pool: &SqlitePool) -> Result<u64> {
    let unsent = email_prefs::list_unsent_digests(pool).await?;
    if unsent.is_empty() {
        return Ok(0);
    }

    let settings = IntegrationSettings::load(pool).await?;
    let Some(email_settings) = settings.email else {
        warn!(
            queued = unsent.len(),
            "Email provider not configured, leaving digest entries queued"
        );
        return Ok(0);
    };
    let client = EmailClient::new(email_settings)
        .map_err(|e| lexdir_common::Error::Remote(e.to_string()))?;

    let mut per_user: BTreeMap<Uuid, Vec<&crate::db::email_prefs::DigestEntry>> = BTreeMap::new();
    for entry in &unsent {
        per_user.entry(entry.user_guid).or_default().push(entry);
    }

    let mut flushed = 0u64;
    for (user_guid, entries) in per_user {
        let Some(user) = users::get_user(pool, user_guid).await? else {
            // Orphaned queue rows; drop them
            let guids: Vec<Uuid> = entries.iter().map(|e| e.guid).collect();
            email_prefs::mark_digests_sent(pool, &guids).await?;
            continue;
        };

        let mut body = String::from("<p>Resumen diario de Lexdir:</p><ul>");
        for entry in &entries {
            body.push_str(&format!("<li><b>{}</b> {}</li>", entry.subject, entry.body));
        }
        body.push_str("</ul>");

        match client
            .send(&user.email, Some(&user.display_name), "Resumen diario", &body)
            .await
        {
            Ok(()) => {
                let guids: Vec<Uuid> = entries.iter().map(|e| e.guid).collect();
                flushed += guids.len() as u64;
                email_prefs::mark_digests_sent(pool, &guids).await?;
            }
            Err(e) => {
                warn!(user = %user.email, error = %e, "Digest send failed, entries stay queued");
            }
        }
    }

    info!(flushed, "Digest flush complete");
    Ok(flushed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::email_prefs::set_pref;
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

    async fn seed_user(pool: &SqlitePool, email: &str) -> User {
        let salt = lexdir_common::auth::generate_salt();
        create_user(
            pool,
            &NewUser {
                email: email.to_string(),
                display_name: "Recipient".to_string(),
                password_hash: lexdir_common::auth::hash_password("pw", &salt),
                password_salt: salt,
            },
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_route_for_decision_table() {
        assert_eq!(route_for(EmailPref { enabled: true, daily_summary: false }), Delivery::Send);
        assert_eq!(
            route_for(EmailPref { enabled: false, daily_summary: false }),
            Delivery::Suppress
        );
        assert_eq!(route_for(EmailPref { enabled: true, daily_summary: true }), Delivery::Digest);
        // Disabled wins over daily summary
        assert_eq!(
            route_for(EmailPref { enabled: false, daily_summary: true }),
            Delivery::Suppress
        );
    }

    #[tokio::test]
    async fn test_dispatch_suppressed_when_category_disabled() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "sup@example.com").await;

        set_pref(
            &pool,
            user.guid,
            CATEGORY_NEW_LEAD,
            EmailPref { enabled: false, daily_summary: false },
        )
        .await
        .unwrap();

        let decision = dispatch(&pool, &user, CATEGORY_NEW_LEAD, "Subject", "<p>Body</p>")
            .await
            .unwrap();

        assert_eq!(decision, Delivery::Suppress);
        assert!(email_prefs::list_unsent_digests(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_queues_digest_in_daily_summary_mode() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "dig@example.com").await;

        set_pref(
            &pool,
            user.guid,
            CATEGORY_NEW_LEAD,
            EmailPref { enabled: true, daily_summary: true },
        )
        .await
        .unwrap();

        let decision = dispatch(&pool, &user, CATEGORY_NEW_LEAD, "Subject", "<p>Body</p>")
            .await
            .unwrap();

        assert_eq!(decision, Delivery::Digest);

        let queued = email_prefs::list_unsent_digests(&pool).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].user_guid, user.guid);
        assert_eq!(queued[0].subject, "Subject");
    }

    #[tokio::test]
    async fn test_dispatch_defaults_to_send_without_pref_row() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "def@example.com").await;

        // No provider configured: decision is Send, delivery downgrades to a
        // logged skip, nothing is queued.
        let decision = dispatch(&pool, &user, CATEGORY_NEW_LEAD, "Subject", "<p>Body</p>")
            .await
            .unwrap();

        assert_eq!(decision, Delivery::Send);
        assert!(email_prefs::list_unsent_digests(&pool).await.unwrap().is_empty());
    }
}
