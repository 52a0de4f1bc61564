//! Tenant visibility and host release compatibility of piece records

use std::cmp::Ordering;

use semver::Version;

use crate::piece::types::{PieceMetadataRecord, PieceType};

/// Channel through which a record is visible to a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Official piece, visible to everyone
    Official,
    /// Custom piece owned by the caller's project
    Project,
    /// Custom piece owned by the caller's platform
    Platform,
}

/// Scope of a caller: who is asking and which host release they run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PieceScope<'a> {
    pub project_id: Option<&'a str>,
    pub platform_id: Option<&'a str>,
    pub release: Option<&'a Version>,
}

impl<'a> PieceScope<'a> {
    pub fn new(project_id: Option<&'a str>, platform_id: Option<&'a str>) -> Self {
        Self {
            project_id,
            platform_id,
            release: None,
        }
    }

    pub fn with_release(mut self, release: Option<&'a Version>) -> Self {
        self.release = release;
        self
    }

    /// Returns true if the record is visible and supports the caller's release
    pub fn admits(&self, record: &PieceMetadataRecord) -> bool {
        visibility(record, self.project_id, self.platform_id).is_some()
            && is_supported_release(record, self.release)
    }
}

/// Determine through which channel, if any, a record is visible.
///
/// The three channels are mutually exclusive for well-formed records.
pub fn visibility(
    record: &PieceMetadataRecord,
    project_id: Option<&str>,
    platform_id: Option<&str>,
) -> Option<Visibility> {
    if is_official_piece(record) {
        Some(Visibility::Official)
    } else if is_project_piece(record, project_id) {
        Some(Visibility::Project)
    } else if is_platform_piece(record, platform_id) {
        Some(Visibility::Platform)
    } else {
        None
    }
}

fn is_official_piece(record: &PieceMetadataRecord) -> bool {
    record.piece_type == PieceType::Official
        && record.project_id.is_none()
        && record.platform_id.is_none()
}

fn is_project_piece(record: &PieceMetadataRecord, project_id: Option<&str>) -> bool {
    let Some(project_id) = project_id else {
        return false;
    };
    record.project_id.as_deref() == Some(project_id) && record.piece_type == PieceType::Custom
}

fn is_platform_piece(record: &PieceMetadataRecord, platform_id: Option<&str>) -> bool {
    let Some(platform_id) = platform_id else {
        return false;
    };
    record.platform_id.as_deref() == Some(platform_id)
        && record.project_id.is_none()
        && record.piece_type == PieceType::Custom
}

/// Check the record's supported release bounds against the caller's release.
///
/// Without a caller release every record is compatible.
pub fn is_supported_release(record: &PieceMetadataRecord, release: Option<&Version>) -> bool {
    let Some(release) = release else {
        return true;
    };
    let metadata = &record.metadata;
    if metadata
        .maximum_supported_release
        .as_ref()
        .is_some_and(|max| release.cmp_precedence(max) == Ordering::Greater)
    {
        return false;
    }
    if metadata
        .minimum_supported_release
        .as_ref()
        .is_some_and(|min| release.cmp_precedence(min) == Ordering::Less)
    {
        return false;
    }
    true
}
