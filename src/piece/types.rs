//! Common types for piece metadata records and service parameters

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

/// Ownership of a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceType {
    /// Platform-provided piece, visible to everyone
    Official,
    /// Tenant-owned piece, scoped to one project or one platform
    Custom,
}

impl PieceType {
    /// Returns the string representation stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceType::Official => "OFFICIAL",
            PieceType::Custom => "CUSTOM",
        }
    }
}

impl std::str::FromStr for PieceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFFICIAL" => Ok(PieceType::Official),
            "CUSTOM" => Ok(PieceType::Custom),
            _ => Err(()),
        }
    }
}

/// How the piece package is distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageType {
    /// Installed from a package registry
    #[default]
    Registry,
    /// Installed from an uploaded archive
    Archive,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Registry => "REGISTRY",
            PackageType::Archive => "ARCHIVE",
        }
    }
}

impl std::str::FromStr for PackageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTRY" => Ok(PackageType::Registry),
            "ARCHIVE" => Ok(PackageType::Archive),
            _ => Err(()),
        }
    }
}

/// Descriptive content of one piece version, as published by its author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceMetadata {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub version: Version,
    #[serde(default)]
    pub minimum_supported_release: Option<Version>,
    #[serde(default)]
    pub maximum_supported_release: Option<Version>,
    /// Action name -> action descriptor
    #[serde(default)]
    pub actions: IndexMap<String, serde_json::Value>,
    /// Trigger name -> trigger descriptor
    #[serde(default)]
    pub triggers: IndexMap<String, serde_json::Value>,
}

impl PieceMetadata {
    /// Creates metadata with only a name and version; the display name defaults to the name
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            logo_url: None,
            authors: Vec::new(),
            categories: Vec::new(),
            version,
            minimum_supported_release: None,
            maximum_supported_release: None,
            actions: IndexMap::new(),
            triggers: IndexMap::new(),
        }
    }
}

/// One stored version of one piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceMetadataRecord {
    pub id: String,
    #[serde(flatten)]
    pub metadata: PieceMetadata,
    pub piece_type: PieceType,
    pub package_type: PackageType,
    pub archive_id: Option<String>,
    /// Owning project, present only for project-scoped custom pieces
    pub project_id: Option<String>,
    /// Owning platform, present only for platform-scoped custom pieces
    pub platform_id: Option<String>,
    pub usage_count: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl PieceMetadataRecord {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &Version {
        &self.metadata.version
    }
}

/// List projection of a piece: action/trigger maps collapsed into counts,
/// usage aggregated across every visible version of the piece
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceSummary {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub version: Version,
    pub minimum_supported_release: Option<Version>,
    pub maximum_supported_release: Option<Version>,
    pub piece_type: PieceType,
    pub package_type: PackageType,
    pub project_id: Option<String>,
    pub platform_id: Option<String>,
    pub usage_count: i64,
    pub actions: usize,
    pub triggers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_triggers: Option<Vec<serde_json::Value>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Which descriptors a list call wants carried alongside each summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionType {
    Action,
    Trigger,
    ActionAndTrigger,
}

impl SuggestionType {
    pub fn includes_actions(&self) -> bool {
        matches!(self, SuggestionType::Action | SuggestionType::ActionAndTrigger)
    }

    pub fn includes_triggers(&self) -> bool {
        matches!(self, SuggestionType::Trigger | SuggestionType::ActionAndTrigger)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortBy {
    Name,
    DisplayName,
    Popularity,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderBy {
    #[default]
    Asc,
    Desc,
}

/// Parameters of a list call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub project_id: Option<String>,
    pub platform_id: Option<String>,
    /// Host release of the caller; pieces outside their supported bounds are hidden
    pub release: Option<Version>,
    pub search_query: Option<String>,
    pub categories: Option<Vec<String>>,
    pub sort_by: Option<SortBy>,
    pub order_by: Option<OrderBy>,
    pub suggestion_type: Option<SuggestionType>,
}

/// Parameters of a single-record lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetParams {
    pub name: String,
    /// Exact version, `^x.y.z`, `~x.y.z`, or absent for the latest visible version
    pub version: Option<String>,
    pub project_id: Option<String>,
    pub release: Option<Version>,
}

/// Parameters of a version listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionsParams {
    pub name: String,
    pub project_id: Option<String>,
    pub platform_id: Option<String>,
    pub release: Option<Version>,
}

/// Parameters of an exact version resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExactVersionParams {
    pub name: String,
    pub version: String,
    pub project_id: Option<String>,
}

/// Parameters of a create call
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParams {
    pub piece_metadata: PieceMetadata,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub package_type: PackageType,
    pub piece_type: PieceType,
    #[serde(default)]
    pub archive_id: Option<String>,
}

/// Empty payload of a version entry; the versions mapping is a set on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionEntry {}

/// Version string -> empty entry, ordered oldest first
pub type ListVersionsResponse = IndexMap<String, VersionEntry>;

/// A project known to the registry and the platform it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub platform_id: String,
}
