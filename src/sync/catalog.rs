//! Catalog trait for fetching official piece metadata

#[cfg(test)]
use mockall::automock;
use semver::Version;
use serde::Deserialize;

use crate::piece::types::PieceMetadata;
use crate::sync::error::CatalogError;

/// A published piece version, as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub version: Version,
}

/// Trait for fetching official pieces from a remote catalog
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PieceCatalog: Send + Sync {
    /// Lists official piece versions compatible with the release (all when `None`)
    async fn list_official(
        &self,
        release: Option<Version>,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Fetches the full metadata of one piece version
    async fn fetch_piece(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<PieceMetadata, CatalogError>;
}
