//! Import of official pieces from the remote catalog

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::join_all;
use semver::Version;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::piece::error::RegistryError;
use crate::piece::service::PieceMetadataService;
use crate::piece::types::{CreateParams, PackageType, PieceType, VersionsParams};
use crate::sync::catalog::{CatalogEntry, PieceCatalog};
use crate::sync::error::CatalogError;

/// Counts of a sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Created,
    Skipped,
    Failed,
}

/// Fetch one catalog entry and store it as an official piece
async fn fetch_and_create(
    service: &PieceMetadataService,
    catalog: &dyn PieceCatalog,
    entry: &CatalogEntry,
) -> Outcome {
    let metadata = match catalog.fetch_piece(&entry.name, &entry.version).await {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(
                "Failed to fetch official piece {}@{}: {}",
                entry.name, entry.version, e
            );
            return Outcome::Failed;
        }
    };

    let params = CreateParams {
        piece_metadata: metadata,
        project_id: None,
        platform_id: None,
        package_type: PackageType::Registry,
        piece_type: PieceType::Official,
        archive_id: None,
    };
    match service.create(params).await {
        Ok(_) => Outcome::Created,
        // Stored concurrently by another writer
        Err(RegistryError::AlreadyExists(message)) => {
            debug!("Skipping {}@{}: {}", entry.name, entry.version, message);
            Outcome::Skipped
        }
        Err(e) => {
            error!(
                "Failed to store official piece {}@{}: {}",
                entry.name, entry.version, e
            );
            Outcome::Failed
        }
    }
}

/// Versions of `name` already stored as official pieces
async fn stored_official_versions(
    service: &PieceMetadataService,
    name: &str,
) -> Result<HashSet<String>, RegistryError> {
    let versions = service
        .get_versions(&VersionsParams {
            name: name.to_string(),
            ..Default::default()
        })
        .await?;
    Ok(versions.into_keys().collect())
}

/// Import every official piece version the catalog lists and the registry lacks.
///
/// Listing failures abort the run. Failures of single versions are logged and
/// counted, and do not stop the others. Fetches run in parallel with staggered
/// start times to avoid rate limiting.
pub async fn sync_official_pieces(
    service: &PieceMetadataService,
    catalog: &dyn PieceCatalog,
    release: Option<&Version>,
) -> Result<SyncReport, CatalogError> {
    let entries = catalog.list_official(release.cloned()).await?;
    info!("Catalog lists {} official piece versions", entries.len());

    let mut report = SyncReport::default();
    let mut stored: HashMap<String, HashSet<String>> = HashMap::new();
    let mut missing = Vec::new();
    for entry in entries {
        if !stored.contains_key(&entry.name) {
            let versions = stored_official_versions(service, &entry.name)
                .await
                .inspect_err(|e| error!("Failed to read versions of {}: {}", entry.name, e))
                .unwrap_or_default();
            stored.insert(entry.name.clone(), versions);
        }

        let present = stored
            .get(&entry.name)
            .is_some_and(|versions| versions.contains(&entry.version.to_string()));
        if present {
            report.skipped += 1;
        } else {
            missing.push(entry);
        }
    }

    if missing.is_empty() {
        debug!("All official pieces are already stored");
        return Ok(report);
    }

    let futures = missing.iter().enumerate().map(|(i, entry)| {
        let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
        async move {
            sleep(delay).await;
            fetch_and_create(service, catalog, entry).await
        }
    });

    for outcome in join_all(futures).await {
        match outcome {
            Outcome::Created => report.created += 1,
            Outcome::Skipped => report.skipped += 1,
            Outcome::Failed => report.failed += 1,
        }
    }

    info!(
        "Synced official pieces: {} created, {} skipped, {} failed",
        report.created, report.skipped, report.failed
    );
    Ok(report)
}
