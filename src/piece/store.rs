//! Storage abstractions consumed by the piece metadata service

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::piece::error::RegistryError;
use crate::piece::types::PieceMetadataRecord;

/// Source of every known piece record
#[cfg_attr(test, automock)]
pub trait PieceSnapshot: Send + Sync {
    /// All records, sorted by name ascending then version descending
    fn sorted_by_name_asc_version_desc(&self) -> Result<Vec<PieceMetadataRecord>, RegistryError>;
}

/// Identity of a piece version: unique across the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceIdentity<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub project_id: Option<&'a str>,
    pub platform_id: Option<&'a str>,
}

/// Partial update of a record. `updated` falls back to the current time when unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PiecePatch {
    pub usage_count: Option<i64>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Trait for persisting piece records
///
/// Absent `project_id`/`platform_id` selectors match records where the column is null.
pub trait PieceStore: Send + Sync {
    /// Find a record by id
    fn find_by_id(&self, id: &str) -> Result<Option<PieceMetadataRecord>, RegistryError>;

    /// Find a record by id owned by the given project (or by no project)
    fn find_by_id_in_project(
        &self,
        id: &str,
        project_id: Option<&str>,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError>;

    /// Find a record by its unique identity
    fn find_by_identity(
        &self,
        identity: &PieceIdentity<'_>,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError>;

    /// Find the earliest created record sharing name and scope
    fn find_oldest_sibling(
        &self,
        name: &str,
        project_id: Option<&str>,
        platform_id: Option<&str>,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError>;

    /// Insert a new record; identity collisions fail with a validation error
    fn insert(&self, record: &PieceMetadataRecord) -> Result<(), RegistryError>;

    /// Delete a record by id, returning the number of removed rows
    fn delete(&self, id: &str) -> Result<usize, RegistryError>;

    /// Apply a patch to a record, returning the number of updated rows
    fn update(&self, id: &str, patch: &PiecePatch) -> Result<usize, RegistryError>;
}
