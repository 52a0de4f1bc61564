//! Store and record test utilities

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use semver::Version;
use serde_json::json;
use tempfile::TempDir;

use piece_registry::piece::db::MetadataStore;
use piece_registry::piece::hooks::SearchFilter;
use piece_registry::piece::service::PieceMetadataService;
use piece_registry::piece::store::PieceStore;
use piece_registry::piece::types::{
    PackageType, PieceMetadata, PieceMetadataRecord, PieceType, Project,
};

pub fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

/// Builder for stored piece records
pub struct RecordBuilder {
    record: PieceMetadataRecord,
}

impl RecordBuilder {
    pub fn official(name: &str, version: &str) -> Self {
        Self {
            record: PieceMetadataRecord {
                id: format!("{}@{}", name, version),
                metadata: PieceMetadata::new(name, Version::parse(version).unwrap()),
                piece_type: PieceType::Official,
                package_type: PackageType::Registry,
                archive_id: None,
                project_id: None,
                platform_id: None,
                usage_count: 0,
                created: timestamp(1_700_000_000),
                updated: timestamp(1_700_000_000),
            },
        }
    }

    pub fn project(name: &str, version: &str, project_id: &str) -> Self {
        let mut builder = Self::official(name, version);
        builder.record.id = format!("{}@{}#{}", name, version, project_id);
        builder.record.piece_type = PieceType::Custom;
        builder.record.project_id = Some(project_id.to_string());
        builder
    }

    pub fn platform(name: &str, version: &str, platform_id: &str) -> Self {
        let mut builder = Self::official(name, version);
        builder.record.id = format!("{}@{}#{}", name, version, platform_id);
        builder.record.piece_type = PieceType::Custom;
        builder.record.platform_id = Some(platform_id.to_string());
        builder
    }

    pub fn display_name(mut self, display_name: &str) -> Self {
        self.record.metadata.display_name = display_name.to_string();
        self
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.record.metadata.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn action(mut self, name: &str, display_name: &str) -> Self {
        self.record
            .metadata
            .actions
            .insert(name.to_string(), json!({ "displayName": display_name }));
        self
    }

    pub fn trigger(mut self, name: &str, display_name: &str) -> Self {
        self.record
            .metadata
            .triggers
            .insert(name.to_string(), json!({ "displayName": display_name }));
        self
    }

    pub fn releases(mut self, minimum: Option<&str>, maximum: Option<&str>) -> Self {
        self.record.metadata.minimum_supported_release = minimum.map(|v| Version::parse(v).unwrap());
        self.record.metadata.maximum_supported_release = maximum.map(|v| Version::parse(v).unwrap());
        self
    }

    pub fn usage(mut self, usage_count: i64) -> Self {
        self.record.usage_count = usage_count;
        self
    }

    pub fn created(mut self, secs: i64) -> Self {
        self.record.created = timestamp(secs);
        self
    }

    pub fn build(self) -> PieceMetadataRecord {
        self.record
    }
}

/// Create a file-backed store populated with the given records and projects
pub fn create_test_store(
    records: &[PieceMetadataRecord],
    projects: &[(&str, &str)],
) -> (TempDir, Arc<MetadataStore>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("pieces.db");
    let store = MetadataStore::new(&db_path).unwrap();

    for record in records {
        store.insert(record).unwrap();
    }
    for (id, platform_id) in projects {
        store
            .upsert_project(&Project {
                id: id.to_string(),
                platform_id: platform_id.to_string(),
            })
            .unwrap();
    }

    (temp_dir, Arc::new(store))
}

/// Create a service over the store using the search filter
pub fn create_test_service(store: Arc<MetadataStore>) -> PieceMetadataService {
    PieceMetadataService::with_store(store, Arc::new(SearchFilter))
}
