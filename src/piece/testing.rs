//! Record fixtures shared by unit tests

use chrono::{DateTime, TimeZone, Utc};
use semver::Version;

use crate::piece::types::{PackageType, PieceMetadata, PieceMetadataRecord, PieceType};

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn record(name: &str, version: &str, piece_type: PieceType) -> PieceMetadataRecord {
    PieceMetadataRecord {
        id: format!("{}@{}", name, version),
        metadata: PieceMetadata::new(name, Version::parse(version).unwrap()),
        piece_type,
        package_type: PackageType::Registry,
        archive_id: None,
        project_id: None,
        platform_id: None,
        usage_count: 0,
        created: timestamp(1_700_000_000),
        updated: timestamp(1_700_000_000),
    }
}

pub(crate) fn official(name: &str, version: &str) -> PieceMetadataRecord {
    record(name, version, PieceType::Official)
}

pub(crate) fn project_piece(name: &str, version: &str, project_id: &str) -> PieceMetadataRecord {
    PieceMetadataRecord {
        id: format!("{}@{}#{}", name, version, project_id),
        project_id: Some(project_id.to_string()),
        ..record(name, version, PieceType::Custom)
    }
}

pub(crate) fn platform_piece(name: &str, version: &str, platform_id: &str) -> PieceMetadataRecord {
    PieceMetadataRecord {
        id: format!("{}@{}#{}", name, version, platform_id),
        platform_id: Some(platform_id.to_string()),
        ..record(name, version, PieceType::Custom)
    }
}

pub(crate) fn with_usage(mut record: PieceMetadataRecord, usage: i64) -> PieceMetadataRecord {
    record.usage_count = usage;
    record
}
