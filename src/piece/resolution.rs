//! Pure resolution passes over a piece snapshot
//!
//! Every function here expects records sorted by name ascending, then version
//! descending. [`ensure_sorted`] verifies that once per snapshot; the passes
//! themselves rely on it for "first match wins" lookups and for grouping
//! versions of the same piece together.

use std::cmp::Ordering;

use tracing::debug;

use crate::piece::error::RegistryError;
use crate::piece::semver::VersionRange;
use crate::piece::types::{
    ListVersionsResponse, PieceMetadataRecord, PieceSummary, SuggestionType, VersionEntry,
};
use crate::piece::visibility::PieceScope;

/// Ordering of a snapshot: name ascending, then version precedence descending
pub fn snapshot_order(a: &PieceMetadataRecord, b: &PieceMetadataRecord) -> Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| b.version().cmp_precedence(a.version()))
}

/// Verify that a snapshot honours [`snapshot_order`]
pub fn ensure_sorted(records: &[PieceMetadataRecord]) -> Result<(), RegistryError> {
    match records
        .windows(2)
        .position(|pair| snapshot_order(&pair[0], &pair[1]) == Ordering::Greater)
    {
        Some(index) => Err(RegistryError::Internal(format!(
            "piece snapshot is not sorted at {}@{} -> {}@{}",
            records[index].name(),
            records[index].version(),
            records[index + 1].name(),
            records[index + 1].version()
        ))),
        None => Ok(()),
    }
}

/// Keep the records admitted by the scope, preserving snapshot order
pub fn visible_candidates(
    records: Vec<PieceMetadataRecord>,
    scope: &PieceScope<'_>,
) -> Vec<PieceMetadataRecord> {
    let total = records.len();
    let candidates: Vec<_> = records
        .into_iter()
        .filter(|record| scope.admits(record))
        .collect();
    debug!("{} of {} piece records visible", candidates.len(), total);
    candidates
}

/// Collapse candidates to one record per name.
///
/// The kept record is the first of each name (its highest visible version);
/// its usage count becomes the sum over every visible version of that name,
/// saturating at `i64::MAX`.
pub fn latest_per_name(candidates: Vec<PieceMetadataRecord>) -> Vec<PieceMetadataRecord> {
    candidates
        .into_iter()
        .fold(Vec::new(), |mut latest: Vec<PieceMetadataRecord>, record| {
            match latest.last_mut() {
                Some(current) if current.name() == record.name() => {
                    current.usage_count = current.usage_count.saturating_add(record.usage_count);
                }
                _ => latest.push(record),
            }
            latest
        })
}

/// Find the highest version of `name` satisfying the range
pub fn find_best_match<'a>(
    candidates: &'a [PieceMetadataRecord],
    name: &str,
    range: Option<&VersionRange>,
) -> Option<&'a PieceMetadataRecord> {
    candidates.iter().find(|record| {
        record.name() == name && range.is_none_or(|range| range.contains(record.version()))
    })
}

/// Versions of `name` among the candidates, oldest first
pub fn versions_for_name(candidates: &[PieceMetadataRecord], name: &str) -> ListVersionsResponse {
    candidates
        .iter()
        .rev()
        .filter(|record| record.name() == name)
        .map(|record| (record.version().to_string(), VersionEntry::default()))
        .collect()
}

/// Project filtered records into summaries.
///
/// Counts come from the unfiltered latest record of the same name, so a
/// filter narrowing actions for suggestions does not change the counts.
pub fn to_summaries(
    filtered: Vec<PieceMetadataRecord>,
    latest: &[PieceMetadataRecord],
    suggestion_type: Option<SuggestionType>,
) -> Vec<PieceSummary> {
    filtered
        .into_iter()
        .map(|record| {
            let original = latest
                .iter()
                .find(|original| original.name() == record.name())
                .unwrap_or(&record);
            let actions = original.metadata.actions.len();
            let triggers = original.metadata.triggers.len();
            let suggested_actions = suggestion_type
                .filter(SuggestionType::includes_actions)
                .map(|_| record.metadata.actions.values().cloned().collect());
            let suggested_triggers = suggestion_type
                .filter(SuggestionType::includes_triggers)
                .map(|_| record.metadata.triggers.values().cloned().collect());

            let metadata = record.metadata;
            PieceSummary {
                id: record.id,
                name: metadata.name,
                display_name: metadata.display_name,
                description: metadata.description,
                logo_url: metadata.logo_url,
                authors: metadata.authors,
                categories: metadata.categories,
                version: metadata.version,
                minimum_supported_release: metadata.minimum_supported_release,
                maximum_supported_release: metadata.maximum_supported_release,
                piece_type: record.piece_type,
                package_type: record.package_type,
                project_id: record.project_id,
                platform_id: record.platform_id,
                usage_count: record.usage_count,
                actions,
                triggers,
                suggested_actions,
                suggested_triggers,
                created: record.created,
                updated: record.updated,
            }
        })
        .collect()
}
