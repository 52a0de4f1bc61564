use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use semver::Version;
use tracing::{debug, info};

use crate::piece::error::RegistryError;
use crate::piece::project::ProjectLookup;
use crate::piece::resolution::snapshot_order;
use crate::piece::store::{PieceIdentity, PiecePatch, PieceSnapshot, PieceStore};
use crate::piece::types::{PieceMetadata, PieceMetadataRecord, Project};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: archive-backed pieces
    &[
        "ALTER TABLE piece_metadata ADD COLUMN package_type TEXT NOT NULL DEFAULT 'REGISTRY'",
        "ALTER TABLE piece_metadata ADD COLUMN archive_id TEXT",
    ],
    // v2: usage counter
    &["ALTER TABLE piece_metadata ADD COLUMN usage_count INTEGER NOT NULL DEFAULT 0"],
];

const RECORD_COLUMNS: &str = "id, name, display_name, description, logo_url, authors, \
     categories, version, minimum_supported_release, maximum_supported_release, actions, \
     triggers, piece_type, package_type, archive_id, project_id, platform_id, usage_count, \
     created, updated";

/// Raw column values of one `piece_metadata` row
struct PieceRow {
    id: String,
    name: String,
    display_name: String,
    description: String,
    logo_url: Option<String>,
    authors: String,
    categories: String,
    version: String,
    minimum_supported_release: Option<String>,
    maximum_supported_release: Option<String>,
    actions: String,
    triggers: String,
    piece_type: String,
    package_type: String,
    archive_id: Option<String>,
    project_id: Option<String>,
    platform_id: Option<String>,
    usage_count: i64,
    created: String,
    updated: String,
}

impl PieceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            display_name: row.get(2)?,
            description: row.get(3)?,
            logo_url: row.get(4)?,
            authors: row.get(5)?,
            categories: row.get(6)?,
            version: row.get(7)?,
            minimum_supported_release: row.get(8)?,
            maximum_supported_release: row.get(9)?,
            actions: row.get(10)?,
            triggers: row.get(11)?,
            piece_type: row.get(12)?,
            package_type: row.get(13)?,
            archive_id: row.get(14)?,
            project_id: row.get(15)?,
            platform_id: row.get(16)?,
            usage_count: row.get(17)?,
            created: row.get(18)?,
            updated: row.get(19)?,
        })
    }

    fn into_record(self) -> Result<PieceMetadataRecord, RegistryError> {
        let corrupt = |column: &str, value: &str| {
            RegistryError::Internal(format!(
                "invalid {} {:?} in piece_metadata row {}",
                column, value, self.id
            ))
        };
        let parse_version = |column: &str, value: &str| {
            Version::parse(value).map_err(|_| corrupt(column, value))
        };
        let parse_optional_version = |column: &str, value: &Option<String>| {
            value
                .as_deref()
                .map(|v| parse_version(column, v))
                .transpose()
        };
        let parse_timestamp = |column: &str, value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| corrupt(column, value))
        };

        let metadata = PieceMetadata {
            version: parse_version("version", &self.version)?,
            minimum_supported_release: parse_optional_version(
                "minimum_supported_release",
                &self.minimum_supported_release,
            )?,
            maximum_supported_release: parse_optional_version(
                "maximum_supported_release",
                &self.maximum_supported_release,
            )?,
            authors: serde_json::from_str(&self.authors)?,
            categories: serde_json::from_str(&self.categories)?,
            actions: serde_json::from_str(&self.actions)?,
            triggers: serde_json::from_str(&self.triggers)?,
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            logo_url: self.logo_url,
        };

        Ok(PieceMetadataRecord {
            piece_type: self
                .piece_type
                .parse()
                .map_err(|_| corrupt("piece_type", &self.piece_type))?,
            package_type: self
                .package_type
                .parse()
                .map_err(|_| corrupt("package_type", &self.package_type))?,
            created: parse_timestamp("created", &self.created)?,
            updated: parse_timestamp("updated", &self.updated)?,
            metadata,
            usage_count: self.usage_count,
            archive_id: self.archive_id,
            project_id: self.project_id,
            platform_id: self.platform_id,
            id: self.id,
        })
    }
}

/// Format a timestamp so that lexical order matches chronological order
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SQLite-backed piece metadata store
pub struct MetadataStore {
    conn: Mutex<Connection>,
}

impl MetadataStore {
    pub fn new(db_path: &Path) -> Result<Self, RegistryError> {
        info!("Initializing piece metadata database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, RegistryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RegistryError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        info!("Piece metadata store initialized successfully");
        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), RegistryError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        // Create base tables (without migration columns)
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS piece_metadata (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                display_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                logo_url TEXT,
                authors TEXT NOT NULL DEFAULT '[]',
                categories TEXT NOT NULL DEFAULT '[]',
                version TEXT NOT NULL,
                minimum_supported_release TEXT,
                maximum_supported_release TEXT,
                actions TEXT NOT NULL DEFAULT '{}',
                triggers TEXT NOT NULL DEFAULT '{}',
                piece_type TEXT NOT NULL,
                project_id TEXT,
                platform_id TEXT,
                created TEXT NOT NULL,
                updated TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // Null scopes compare equal so official pieces collide on (name, version)
        conn.execute(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_piece_identity ON piece_metadata(
                name, version, IFNULL(project_id, ''), IFNULL(platform_id, '')
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_piece_name ON piece_metadata(name)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                platform_id TEXT NOT NULL
            )
            "#,
            [],
        )?;

        // Apply migrations
        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), RegistryError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Run a query expected to return at most one record
    fn query_one<P: rusqlite::Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError> {
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {} FROM piece_metadata {}", RECORD_COLUMNS, filter);
        let row = conn
            .query_row(&sql, params, PieceRow::from_row)
            .optional()?;
        row.map(PieceRow::into_record).transpose()
    }

    /// Register a project, or move an existing one to another platform
    pub fn upsert_project(&self, project: &Project) -> Result<(), RegistryError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO projects (id, platform_id) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET platform_id = excluded.platform_id
            "#,
            (&project.id, &project.platform_id),
        )?;
        debug!(
            "Registered project {} on platform {}",
            project.id, project.platform_id
        );
        Ok(())
    }

    fn find_project(&self, project_id: &str) -> Result<Option<Project>, RegistryError> {
        let conn = self.lock_conn()?;
        let project = conn
            .query_row(
                "SELECT id, platform_id FROM projects WHERE id = ?1",
                [project_id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        platform_id: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }
}

impl PieceSnapshot for MetadataStore {
    fn sorted_by_name_asc_version_desc(&self) -> Result<Vec<PieceMetadataRecord>, RegistryError> {
        let rows = {
            let conn = self.lock_conn()?;
            let sql = format!("SELECT {} FROM piece_metadata", RECORD_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([], PieceRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };

        // Versions must be compared semantically, not as text
        let mut records = rows
            .into_iter()
            .map(PieceRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(snapshot_order);

        debug!("Loaded snapshot of {} piece records", records.len());
        Ok(records)
    }
}

impl PieceStore for MetadataStore {
    fn find_by_id(&self, id: &str) -> Result<Option<PieceMetadataRecord>, RegistryError> {
        self.query_one("WHERE id = ?1", [id])
    }

    fn find_by_id_in_project(
        &self,
        id: &str,
        project_id: Option<&str>,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError> {
        self.query_one("WHERE id = ?1 AND project_id IS ?2", (id, project_id))
    }

    fn find_by_identity(
        &self,
        identity: &PieceIdentity<'_>,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError> {
        self.query_one(
            "WHERE name = ?1 AND version = ?2 AND project_id IS ?3 AND platform_id IS ?4",
            (
                identity.name,
                identity.version,
                identity.project_id,
                identity.platform_id,
            ),
        )
    }

    fn find_oldest_sibling(
        &self,
        name: &str,
        project_id: Option<&str>,
        platform_id: Option<&str>,
    ) -> Result<Option<PieceMetadataRecord>, RegistryError> {
        self.query_one(
            "WHERE name = ?1 AND project_id IS ?2 AND platform_id IS ?3 \
             ORDER BY created ASC LIMIT 1",
            (name, project_id, platform_id),
        )
    }

    fn insert(&self, record: &PieceMetadataRecord) -> Result<(), RegistryError> {
        let metadata = &record.metadata;
        let authors = serde_json::to_string(&metadata.authors)?;
        let categories = serde_json::to_string(&metadata.categories)?;
        let actions = serde_json::to_string(&metadata.actions)?;
        let triggers = serde_json::to_string(&metadata.triggers)?;

        let conn = self.lock_conn()?;
        let sql = format!(
            "INSERT INTO piece_metadata ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            RECORD_COLUMNS
        );
        let result = conn.execute(
            &sql,
            rusqlite::params![
                record.id,
                metadata.name,
                metadata.display_name,
                metadata.description,
                metadata.logo_url,
                authors,
                categories,
                metadata.version.to_string(),
                metadata
                    .minimum_supported_release
                    .as_ref()
                    .map(Version::to_string),
                metadata
                    .maximum_supported_release
                    .as_ref()
                    .map(Version::to_string),
                actions,
                triggers,
                record.piece_type.as_str(),
                record.package_type.as_str(),
                record.archive_id,
                record.project_id,
                record.platform_id,
                record.usage_count,
                format_timestamp(&record.created),
                format_timestamp(&record.updated),
            ],
        );

        match result {
            Ok(_) => {
                debug!(
                    "Inserted piece {}@{} as {}",
                    metadata.name, metadata.version, record.id
                );
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RegistryError::AlreadyExists(format!(
                    "piece_metadata_already_exists name={} version={} projectId={:?}",
                    metadata.name, metadata.version, record.project_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> Result<usize, RegistryError> {
        let conn = self.lock_conn()?;
        let deleted = conn.execute("DELETE FROM piece_metadata WHERE id = ?1", [id])?;
        Ok(deleted)
    }

    fn update(&self, id: &str, patch: &PiecePatch) -> Result<usize, RegistryError> {
        let now = format_timestamp(&Utc::now());
        let conn = self.lock_conn()?;
        let updated = conn.execute(
            r#"
            UPDATE piece_metadata
            SET usage_count = COALESCE(?2, usage_count),
                created = COALESCE(?3, created),
                updated = COALESCE(?4, ?5)
            WHERE id = ?1
            "#,
            (
                id,
                patch.usage_count,
                patch.created.as_ref().map(format_timestamp),
                patch.updated.as_ref().map(format_timestamp),
                now,
            ),
        )?;
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl ProjectLookup for MetadataStore {
    async fn get_one(&self, project_id: &str) -> Result<Option<Project>, RegistryError> {
        self.find_project(project_id)
    }
}
