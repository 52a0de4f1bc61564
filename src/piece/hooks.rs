//! Pluggable post-aggregation filtering of piece listings

#[cfg(test)]
use mockall::automock;

use crate::piece::error::RegistryError;
use crate::piece::types::{ListParams, OrderBy, PieceMetadataRecord, SortBy};

/// Filtering stage applied to the latest version of each visible piece.
///
/// Implementations may drop or reorder pieces and narrow their actions and
/// triggers, but must keep every piece they do not explicitly exclude.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FilterHook: Send + Sync {
    async fn filter_pieces(
        &self,
        params: &ListParams,
        pieces: Vec<PieceMetadataRecord>,
    ) -> Result<Vec<PieceMetadataRecord>, RegistryError>;
}

/// Returns pieces unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

#[async_trait::async_trait]
impl FilterHook for PassThroughFilter {
    async fn filter_pieces(
        &self,
        _params: &ListParams,
        pieces: Vec<PieceMetadataRecord>,
    ) -> Result<Vec<PieceMetadataRecord>, RegistryError> {
        Ok(pieces)
    }
}

/// Applies the caller's search query, category filter and sort order.
///
/// With a suggestion type set, a piece also matches when one of its action or
/// trigger display names matches the query, and its actions and triggers are
/// narrowed to the matching ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFilter;

impl SearchFilter {
    fn matches_text(text: &str, query: &str) -> bool {
        text.to_lowercase().contains(query)
    }

    fn descriptor_matches(descriptor: &serde_json::Value, name: &str, query: &str) -> bool {
        let display_name = descriptor
            .get("displayName")
            .and_then(|value| value.as_str())
            .unwrap_or(name);
        Self::matches_text(display_name, query)
    }

    /// Returns the piece if it matches the query, narrowing descriptors when suggesting
    fn search(
        mut piece: PieceMetadataRecord,
        query: &str,
        params: &ListParams,
    ) -> Option<PieceMetadataRecord> {
        let metadata = &piece.metadata;
        let piece_matches = Self::matches_text(&metadata.name, query)
            || Self::matches_text(&metadata.display_name, query)
            || Self::matches_text(&metadata.description, query);

        let Some(suggestion_type) = params.suggestion_type else {
            return piece_matches.then_some(piece);
        };
        if piece_matches {
            return Some(piece);
        }

        let metadata = &mut piece.metadata;
        if suggestion_type.includes_actions() {
            metadata
                .actions
                .retain(|name, descriptor| Self::descriptor_matches(descriptor, name, query));
        } else {
            metadata.actions.clear();
        }
        if suggestion_type.includes_triggers() {
            metadata
                .triggers
                .retain(|name, descriptor| Self::descriptor_matches(descriptor, name, query));
        } else {
            metadata.triggers.clear();
        }

        (!metadata.actions.is_empty() || !metadata.triggers.is_empty()).then_some(piece)
    }

    fn sort(pieces: &mut [PieceMetadataRecord], sort_by: SortBy, order_by: OrderBy) {
        pieces.sort_by(|a, b| {
            let ordering = match sort_by {
                SortBy::Name => a.name().cmp(b.name()),
                SortBy::DisplayName => a
                    .metadata
                    .display_name
                    .to_lowercase()
                    .cmp(&b.metadata.display_name.to_lowercase()),
                SortBy::Popularity => a.usage_count.cmp(&b.usage_count),
                SortBy::Updated => a.updated.cmp(&b.updated),
            };
            match order_by {
                OrderBy::Asc => ordering,
                OrderBy::Desc => ordering.reverse(),
            }
        });
    }
}

#[async_trait::async_trait]
impl FilterHook for SearchFilter {
    async fn filter_pieces(
        &self,
        params: &ListParams,
        pieces: Vec<PieceMetadataRecord>,
    ) -> Result<Vec<PieceMetadataRecord>, RegistryError> {
        let query = params
            .search_query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(str::to_lowercase);

        let mut filtered: Vec<_> = pieces
            .into_iter()
            .filter(|piece| match &params.categories {
                Some(categories) if !categories.is_empty() => piece
                    .metadata
                    .categories
                    .iter()
                    .any(|category| categories.contains(category)),
                _ => true,
            })
            .filter_map(|piece| match &query {
                Some(query) => Self::search(piece, query, params),
                None => Some(piece),
            })
            .collect();

        if let Some(sort_by) = params.sort_by {
            Self::sort(&mut filtered, sort_by, params.order_by.unwrap_or_default());
        }

        Ok(filtered)
    }
}
