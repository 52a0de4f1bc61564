use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use semver::Version;
use serde::Serialize;
use serde::de::DeserializeOwned;

use piece_registry::config::{self, RegistryConfig};
use piece_registry::logging::{self, LogFormat};
use piece_registry::piece::db::MetadataStore;
use piece_registry::piece::hooks::SearchFilter;
use piece_registry::piece::semver::parse_version;
use piece_registry::piece::service::PieceMetadataService;
use piece_registry::piece::types::{
    CreateParams, ExactVersionParams, GetParams, ListParams, OrderBy, Project, SortBy,
    SuggestionType, VersionsParams,
};
use piece_registry::sync::{CloudCatalog, sync_official_pieces};

#[derive(Parser)]
#[command(name = "piece-registry")]
#[command(version, about = "Metadata registry for versioned integration pieces")]
struct Cli {
    /// Config file (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the latest visible version of every piece
    List {
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long)]
        platform_id: Option<String>,
        #[arg(long, value_parser = parse_release)]
        release: Option<Version>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long, value_parser = parse_upper::<SortBy>)]
        sort_by: Option<SortBy>,
        #[arg(long, value_parser = parse_upper::<OrderBy>)]
        order_by: Option<OrderBy>,
        #[arg(long, value_parser = parse_upper::<SuggestionType>)]
        suggestion_type: Option<SuggestionType>,
    },
    /// Resolve one piece version
    Get {
        name: String,
        /// Exact version, ^x.y.z or ~x.y.z
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long, value_parser = parse_release)]
        release: Option<Version>,
    },
    /// List visible versions of a piece, oldest first
    Versions {
        name: String,
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long)]
        platform_id: Option<String>,
        #[arg(long, value_parser = parse_release)]
        release: Option<Version>,
    },
    /// Resolve a version specifier to a concrete version
    ExactVersion {
        name: String,
        version: String,
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Store a piece version read from a JSON file
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a piece version by id
    Delete {
        id: String,
        #[arg(long)]
        project_id: Option<String>,
    },
    /// Set the usage count of a piece version
    UpdateUsage { id: String, usage: i64 },
    /// Register a project and the platform it belongs to
    RegisterProject { id: String, platform_id: String },
    /// Import official pieces missing from the registry
    Sync {
        #[arg(long, value_parser = parse_release)]
        release: Option<Version>,
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn parse_release(value: &str) -> Result<Version, String> {
    parse_version(value).ok_or_else(|| format!("invalid release version: {}", value))
}

/// Parse a SCREAMING_SNAKE_CASE enum, accepting lower-case and dashed input
fn parse_upper<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    let normalized = value.to_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized)).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, config: RegistryConfig) -> anyhow::Result<()> {
    let data_dir = config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {:?}", data_dir))?;
    let store = Arc::new(MetadataStore::new(&config::db_path())?);
    let service = PieceMetadataService::with_store(store.clone(), Arc::new(SearchFilter));

    match cli.command {
        Command::List {
            project_id,
            platform_id,
            release,
            search,
            categories,
            sort_by,
            order_by,
            suggestion_type,
        } => {
            let params = ListParams {
                project_id,
                platform_id,
                release,
                search_query: search,
                categories: (!categories.is_empty()).then_some(categories),
                sort_by,
                order_by,
                suggestion_type,
            };
            print_json(&service.list(&params).await?)
        }
        Command::Get {
            name,
            version,
            project_id,
            release,
        } => {
            let params = GetParams {
                name,
                version,
                project_id,
                release,
            };
            print_json(&service.get_or_throw(&params).await?)
        }
        Command::Versions {
            name,
            project_id,
            platform_id,
            release,
        } => {
            let params = VersionsParams {
                name,
                project_id,
                platform_id,
                release,
            };
            print_json(&service.get_versions(&params).await?)
        }
        Command::ExactVersion {
            name,
            version,
            project_id,
        } => {
            let params = ExactVersionParams {
                name,
                version,
                project_id,
            };
            print_json(&service.get_exact_piece_version(&params).await?)
        }
        Command::Create { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {:?}", file))?;
            let params: CreateParams = serde_json::from_str(&content)
                .with_context(|| format!("invalid create payload in {:?}", file))?;
            print_json(&service.create(params).await?)
        }
        Command::Delete { id, project_id } => {
            service.delete(&id, project_id.as_deref()).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::UpdateUsage { id, usage } => {
            service.update_usage(&id, usage).await?;
            print_json(&serde_json::json!({ "id": id, "usageCount": usage }))
        }
        Command::RegisterProject { id, platform_id } => {
            let project = Project { id, platform_id };
            store.upsert_project(&project)?;
            print_json(&project)
        }
        Command::Sync { release, base_url } => {
            if !config.sync.enabled {
                bail!("official piece sync is disabled in the configuration");
            }
            let catalog = CloudCatalog::new(base_url.as_deref().unwrap_or(&config.sync.base_url))?;
            let release = release.or(config.sync.release);
            print_json(&sync_official_pieces(&service, &catalog, release.as_ref()).await?)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let config = RegistryConfig::load(&config_path)?;

    let _guard = logging::init(&config::log_path(), &config.log_level, cli.log_format)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, config))
}
