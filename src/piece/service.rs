//! Piece metadata service
//!
//! Resolves, lists and versions pieces for a caller's scope, and creates,
//! deletes and updates the usage of piece records.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::{debug, info};

use crate::piece::db::MetadataStore;
use crate::piece::error::RegistryError;
use crate::piece::hooks::FilterHook;
use crate::piece::project::ProjectLookup;
use crate::piece::resolution::{
    ensure_sorted, find_best_match, latest_per_name, to_summaries, versions_for_name,
    visible_candidates,
};
use crate::piece::semver::{VersionRange, is_exact_version};
use crate::piece::store::{PieceIdentity, PiecePatch, PieceSnapshot, PieceStore};
use crate::piece::types::{
    CreateParams, ExactVersionParams, GetParams, ListParams, ListVersionsResponse,
    PieceMetadataRecord, PieceSummary, PieceType, VersionsParams,
};
use crate::piece::visibility::PieceScope;

pub struct PieceMetadataService {
    snapshot: Arc<dyn PieceSnapshot>,
    store: Arc<dyn PieceStore>,
    projects: Arc<dyn ProjectLookup>,
    filter: Arc<dyn FilterHook>,
}

impl PieceMetadataService {
    pub fn new(
        snapshot: Arc<dyn PieceSnapshot>,
        store: Arc<dyn PieceStore>,
        projects: Arc<dyn ProjectLookup>,
        filter: Arc<dyn FilterHook>,
    ) -> Self {
        Self {
            snapshot,
            store,
            projects,
            filter,
        }
    }

    /// Build a service whose snapshot, store and project lookup are all one database
    pub fn with_store(store: Arc<MetadataStore>, filter: Arc<dyn FilterHook>) -> Self {
        Self::new(store.clone(), store.clone(), store, filter)
    }

    /// Records visible in the scope, name ascending then version descending
    fn find_all_sorted(
        &self,
        scope: &PieceScope<'_>,
    ) -> Result<Vec<PieceMetadataRecord>, RegistryError> {
        let records = self.snapshot.sorted_by_name_asc_version_desc()?;
        ensure_sorted(&records)?;
        Ok(visible_candidates(records, scope))
    }

    /// List the latest visible version of every piece, with usage summed across versions
    pub async fn list(&self, params: &ListParams) -> Result<Vec<PieceSummary>, RegistryError> {
        let scope = PieceScope::new(params.project_id.as_deref(), params.platform_id.as_deref())
            .with_release(params.release.as_ref());
        let latest = latest_per_name(self.find_all_sorted(&scope)?);

        let filtered = self.filter.filter_pieces(params, latest.clone()).await?;
        debug!(
            "Listing {} pieces ({} before filtering)",
            filtered.len(),
            latest.len()
        );
        Ok(to_summaries(filtered, &latest, params.suggestion_type))
    }

    /// Resolve the highest visible version of a piece matching the version specifier
    pub async fn get_or_throw(
        &self,
        params: &GetParams,
    ) -> Result<PieceMetadataRecord, RegistryError> {
        let platform_id = match params.project_id.as_deref() {
            Some(project_id) => self
                .projects
                .get_one(project_id)
                .await?
                .map(|project| project.platform_id),
            None => None,
        };
        let range = VersionRange::parse(params.version.as_deref())?;

        let scope = PieceScope::new(params.project_id.as_deref(), platform_id.as_deref())
            .with_release(params.release.as_ref());
        let candidates = self.find_all_sorted(&scope)?;

        find_best_match(&candidates, &params.name, range.as_ref())
            .cloned()
            .ok_or_else(|| {
                debug!(
                    "No visible version of {} matches {:?}",
                    params.name, params.version
                );
                RegistryError::NotFound(format!(
                    "piece_metadata_not_found name={} version={} projectId={}",
                    params.name,
                    params.version.as_deref().unwrap_or("latest"),
                    params.project_id.as_deref().unwrap_or("none")
                ))
            })
    }

    /// Visible versions of a piece, oldest first
    pub async fn get_versions(
        &self,
        params: &VersionsParams,
    ) -> Result<ListVersionsResponse, RegistryError> {
        let scope = PieceScope::new(params.project_id.as_deref(), params.platform_id.as_deref())
            .with_release(params.release.as_ref());
        let candidates = self.find_all_sorted(&scope)?;
        Ok(versions_for_name(&candidates, &params.name))
    }

    /// Resolve a specifier to a concrete version string.
    ///
    /// Already exact versions are returned as-is without consulting the snapshot.
    pub async fn get_exact_piece_version(
        &self,
        params: &ExactVersionParams,
    ) -> Result<String, RegistryError> {
        if is_exact_version(&params.version) {
            return Ok(params.version.clone());
        }

        let record = self
            .get_or_throw(&GetParams {
                name: params.name.clone(),
                version: Some(params.version.clone()),
                project_id: params.project_id.clone(),
                release: None,
            })
            .await?;
        Ok(record.version().to_string())
    }

    /// Store a new piece version.
    ///
    /// The creation time is inherited from the oldest version of the same piece
    /// in the same scope, so a piece keeps its first publication date.
    pub async fn create(
        &self,
        params: CreateParams,
    ) -> Result<PieceMetadataRecord, RegistryError> {
        Self::validate_create(&params)?;

        let metadata = &params.piece_metadata;
        let version = metadata.version.to_string();
        let identity = PieceIdentity {
            name: &metadata.name,
            version: &version,
            project_id: params.project_id.as_deref(),
            platform_id: params.platform_id.as_deref(),
        };
        if self.store.find_by_identity(&identity)?.is_some() {
            return Err(RegistryError::AlreadyExists(format!(
                "piece_metadata_already_exists name={} version={} projectId={:?}",
                metadata.name, metadata.version, params.project_id
            )));
        }

        // Stored timestamps keep millisecond precision
        let now = Utc::now().trunc_subsecs(3);
        let created = self
            .store
            .find_oldest_sibling(
                &metadata.name,
                params.project_id.as_deref(),
                params.platform_id.as_deref(),
            )?
            .map_or(now, |sibling| sibling.created);

        let record = PieceMetadataRecord {
            id: uuid::Uuid::new_v4().simple().to_string(),
            metadata: params.piece_metadata,
            piece_type: params.piece_type,
            package_type: params.package_type,
            archive_id: params.archive_id,
            project_id: params.project_id,
            platform_id: params.platform_id,
            usage_count: 0,
            created,
            updated: now,
        };
        self.store.insert(&record)?;

        info!(
            "Created piece {}@{} ({})",
            record.name(),
            record.version(),
            record.id
        );
        Ok(record)
    }

    fn validate_create(params: &CreateParams) -> Result<(), RegistryError> {
        let metadata = &params.piece_metadata;
        if metadata.name.trim().is_empty() {
            return Err(RegistryError::Validation(
                "piece name must not be empty".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (
            &metadata.minimum_supported_release,
            &metadata.maximum_supported_release,
        ) {
            if min.cmp_precedence(max) == std::cmp::Ordering::Greater {
                return Err(RegistryError::Validation(format!(
                    "minimumSupportedRelease {} is greater than maximumSupportedRelease {} for {}",
                    min, max, metadata.name
                )));
            }
        }

        let scoped = params.project_id.is_some() || params.platform_id.is_some();
        match params.piece_type {
            PieceType::Official if scoped => Err(RegistryError::Validation(format!(
                "official piece {} must not be owned by a project or platform",
                metadata.name
            ))),
            PieceType::Custom if !scoped => Err(RegistryError::Validation(format!(
                "custom piece {} must be owned by a project or platform",
                metadata.name
            ))),
            _ => Ok(()),
        }
    }

    /// Delete a record owned by the given project (or by no project)
    pub async fn delete(&self, id: &str, project_id: Option<&str>) -> Result<(), RegistryError> {
        if self.store.find_by_id_in_project(id, project_id)?.is_none() {
            return Err(RegistryError::NotFound(format!(
                "piece_metadata_not_found id={}",
                id
            )));
        }
        self.store.delete(id)?;
        info!("Deleted piece {}", id);
        Ok(())
    }

    /// Set the usage count of a record, keeping its audit timestamps
    pub async fn update_usage(&self, id: &str, usage: i64) -> Result<(), RegistryError> {
        if usage < 0 {
            return Err(RegistryError::Validation(format!(
                "usage count must not be negative, got {} for {}",
                usage, id
            )));
        }
        let existing = self.store.find_by_id(id)?.ok_or_else(|| {
            RegistryError::NotFound(format!("piece_metadata_not_found id={}", id))
        })?;

        self.store.update(
            id,
            &PiecePatch {
                usage_count: Some(usage),
                created: Some(existing.created),
                updated: Some(existing.updated),
            },
        )?;
        debug!("Updated usage of piece {} to {}", id, usage);
        Ok(())
    }
}
