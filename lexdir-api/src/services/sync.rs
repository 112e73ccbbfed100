//! Firm/branch reconciliation
//!
//! One-way push of the local firm record into the CMS and the search index
//! after a local write. The push is best-effort per target: failures are
//! logged and reported in the outcome, and the local write is never rolled
//! back. There is no retry queue; a human re-triggers sync when a target is
//! stale.

use crate::db::branches::{self, Branch};
use crate::db::firms::{self, Firm, FirmInput, FirmStatus};
use crate::services::algolia::{AlgoliaClient, SearchRecord};
use crate::services::wordpress::{FirmDocument, FirmMeta, WordPressClient, WpError};
use lexdir_common::config::IntegrationSettings;
use lexdir_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one remote target during a sync
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum TargetOutcome {
    /// Remote copy written
    Pushed,
    /// Target not attempted (unconfigured, or nothing to do)
    Skipped(String),
    /// Target attempted and refused; local write stands
    Failed(String),
}

/// Per-target outcomes of one reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub cms: TargetOutcome,
    pub search: TargetOutcome,
}

/// Counts from a CMS import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub created: u64,
    pub updated: u64,
}

/// Map the firm and its branches into the CMS post layout.
///
/// Title and slug come from the firm; meta fields come from the principal
/// branch (first branch when none is flagged); practice areas are the union
/// across branches in first-seen order.
pub fn build_firm_document(firm: &Firm, branch_list: &[Branch]) -> FirmDocument {
    let principal = branch_list
        .iter()
        .find(|b| b.is_principal)
        .or_else(|| branch_list.first());

    FirmDocument {
        title: firm.name.clone(),
        slug: firm.slug.clone(),
        status: match firm.status {
            FirmStatus::Published => "publish".to_string(),
            _ => "draft".to_string(),
        },
        content: firm.description.clone().unwrap_or_default(),
        meta: FirmMeta {
            address: principal.and_then(|b| b.address.clone()),
            city: principal.and_then(|b| b.city.clone()),
            phone: principal
                .and_then(|b| b.phone.clone())
                .or_else(|| firm.phone.clone()),
            practice_areas: practice_area_union(branch_list),
            branch_count: branch_list.len(),
        },
    }
}

/// Map the firm and its branches into the denormalized search record
pub fn build_search_record(firm: &Firm, branch_list: &[Branch]) -> SearchRecord {
    let principal = branch_list
        .iter()
        .find(|b| b.is_principal)
        .or_else(|| branch_list.first());

    SearchRecord {
        object_id: firm.guid.to_string(),
        name: firm.name.clone(),
        slug: firm.slug.clone(),
        city: principal.and_then(|b| b.city.clone()),
        province: principal.and_then(|b| b.province.clone()),
        practice_areas: practice_area_union(branch_list),
        published: firm.status == FirmStatus::Published,
    }
}

fn practice_area_union(branch_list: &[Branch]) -> Vec<String> {
    let mut areas: Vec<String> = Vec::new();
    for branch in branch_list {
        for area in &branch.practice_areas {
            if !areas.contains(area) {
                areas.push(area.clone());
            }
        }
    }
    areas
}

/// Reconcile one firm with the CMS and the search index
pub async fn sync_firm(pool: &SqlitePool, firm_guid: Uuid) -> Result<SyncReport> {
    let firm = firms::get_firm(pool, firm_guid)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Firm {}", firm_guid)))?;

    if firm.deleted {
        return Err(Error::InvalidInput(
            "Deleted firms are not synced".to_string(),
        ));
    }

    let branch_list = branches::list_for_firm(pool, firm.guid).await?;
    let settings = IntegrationSettings::load(pool).await?;

    let cms = push_cms(pool, &firm, &branch_list, &settings).await;
    let search = push_search(pool, &firm, &branch_list, &settings).await;

    info!(firm = %firm.guid, cms = ?cms, search = ?search, "Sync finished");
    Ok(SyncReport { cms, search })
}

async fn push_cms(
    pool: &SqlitePool,
    firm: &Firm,
    branch_list: &[Branch],
    settings: &IntegrationSettings,
) -> TargetOutcome {
    let Some(wp_settings) = settings.wordpress.clone() else {
        return TargetOutcome::Skipped("CMS not configured".to_string());
    };
    let client = match WordPressClient::new(wp_settings) {
        Ok(client) => client,
        Err(e) => return TargetOutcome::Failed(e.to_string()),
    };

    let document = build_firm_document(firm, branch_list);

    let pushed_id = match firm.cms_post_id {
        Some(post_id) => match client.update_firm_post(post_id, &document).await {
            Ok(()) => Ok(post_id),
            // Remote copy disappeared; recreate it
            Err(WpError::PostNotFound(_)) => client.create_firm_post(&document).await,
            Err(e) => Err(e),
        },
        None => client.create_firm_post(&document).await,
    };

    match pushed_id {
        Ok(post_id) => {
            if firm.cms_post_id != Some(post_id) {
                if let Err(e) = firms::set_external_ids(pool, firm.guid, Some(post_id), None).await
                {
                    warn!(firm = %firm.guid, error = %e, "Failed to store CMS post id");
                }
            }
            TargetOutcome::Pushed
        }
        Err(e) => {
            warn!(firm = %firm.guid, error = %e, "CMS push failed");
            TargetOutcome::Failed(e.to_string())
        }
    }
}

async fn push_search(
    pool: &SqlitePool,
    firm: &Firm,
    branch_list: &[Branch],
    settings: &IntegrationSettings,
) -> TargetOutcome {
    let Some(algolia_settings) = settings.algolia.clone() else {
        return TargetOutcome::Skipped("Search index not configured".to_string());
    };
    let client = match AlgoliaClient::new(algolia_settings) {
        Ok(client) => client,
        Err(e) => return TargetOutcome::Failed(e.to_string()),
    };

    let record = build_search_record(firm, branch_list);

    match client.save_record(&record).await {
        Ok(object_id) => {
            if firm.search_object_id.as_deref() != Some(object_id.as_str()) {
                if let Err(e) =
                    firms::set_external_ids(pool, firm.guid, None, Some(&object_id)).await
                {
                    warn!(firm = %firm.guid, error = %e, "Failed to store search object id");
                }
            }
            TargetOutcome::Pushed
        }
        Err(e) => {
            warn!(firm = %firm.guid, error = %e, "Search push failed");
            TargetOutcome::Failed(e.to_string())
        }
    }
}

/// Remove the remote copies of a deleted firm when external ids are known.
/// Failures are logged only; the local delete already happened.
pub async fn push_deletion(pool: &SqlitePool, firm: &Firm) -> Result<SyncReport> {
    let settings = IntegrationSettings::load(pool).await?;

    let cms = match (&settings.wordpress, firm.cms_post_id) {
        (None, _) => TargetOutcome::Skipped("CMS not configured".to_string()),
        (_, None) => TargetOutcome::Skipped("No CMS post id recorded".to_string()),
        (Some(wp_settings), Some(post_id)) => match WordPressClient::new(wp_settings.clone()) {
            Ok(client) => match client.delete_firm_post(post_id).await {
                Ok(()) => TargetOutcome::Pushed,
                Err(e) => {
                    warn!(firm = %firm.guid, error = %e, "CMS delete failed");
                    TargetOutcome::Failed(e.to_string())
                }
            },
            Err(e) => TargetOutcome::Failed(e.to_string()),
        },
    };

    let search = match (&settings.algolia, &firm.search_object_id) {
        (None, _) => TargetOutcome::Skipped("Search index not configured".to_string()),
        (_, None) => TargetOutcome::Skipped("No search object id recorded".to_string()),
        (Some(algolia_settings), Some(object_id)) => {
            match AlgoliaClient::new(algolia_settings.clone()) {
                Ok(client) => match client.delete_record(object_id).await {
                    Ok(()) => TargetOutcome::Pushed,
                    Err(e) => {
                        warn!(firm = %firm.guid, error = %e, "Search delete failed");
                        TargetOutcome::Failed(e.to_string())
                    }
                },
                Err(e) => TargetOutcome::Failed(e.to_string()),
            }
        }
    };

    Ok(SyncReport { cms, search })
}

/// Reconcile every non-deleted firm (maintenance sweep)
pub async fn sync_all(pool: &SqlitePool) -> Result<Vec<(Uuid, SyncReport)>> {
    let guids = firms::list_firm_guids(pool).await?;
    let mut reports = Vec::with_capacity(guids.len());

    for guid in guids {
        let report = sync_firm(pool, guid).await?;
        reports.push((guid, report));
    }

    Ok(reports)
}

/// Pull firm posts from the CMS and upsert them locally by slug.
///
/// An existing firm (matched on slug) gets its name, description and CMS post
/// id refreshed; an unknown slug creates a pending firm. Local-only fields
/// are never touched.
pub async fn import_from_cms(pool: &SqlitePool) -> Result<ImportSummary> {
    let settings = IntegrationSettings::load(pool).await?;
    let Some(wp_settings) = settings.wordpress else {
        return Err(Error::Config("CMS not configured".to_string()));
    };
    let client =
        WordPressClient::new(wp_settings).map_err(|e| Error::Remote(e.to_string()))?;

    let posts = client
        .list_firm_posts()
        .await
        .map_err(|e| Error::Remote(e.to_string()))?;

    let mut summary = ImportSummary::default();

    for post in posts {
        let title = post.title.rendered.trim().to_string();
        if title.is_empty() || post.slug.is_empty() {
            continue;
        }
        let description = post.content.as_ref().map(|c| c.rendered.clone());

        match firms::get_firm_by_slug(pool, &post.slug).await? {
            Some(existing) => {
                firms::update_firm(
                    pool,
                    existing.guid,
                    &FirmInput {
                        name: title,
                        slug: Some(post.slug.clone()),
                        status: None,
                        owner_email: None,
                        phone: None,
                        description,
                    },
                )
                .await?;
                firms::set_external_ids(pool, existing.guid, Some(post.id), None).await?;
                summary.updated += 1;
            }
            None => {
                let status = if post.status == "publish" {
                    Some(FirmStatus::Published)
                } else {
                    None
                };
                let created = firms::create_firm(
                    pool,
                    &FirmInput {
                        name: title,
                        slug: Some(post.slug.clone()),
                        status,
                        owner_email: None,
                        phone: None,
                        description,
                    },
                )
                .await?;
                firms::set_external_ids(pool, created.guid, Some(post.id), None).await?;
                summary.created += 1;
            }
        }
    }

    info!(created = summary.created, updated = summary.updated, "CMS import finished");
    Ok(summary)
}
