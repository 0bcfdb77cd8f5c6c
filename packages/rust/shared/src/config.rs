//! Application configuration for the company enricher.
//!
//! User config lives at `~/.company-enricher/enricher.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EnricherError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "enricher.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".company-enricher";

/// Table and column names are interpolated into SQL, so only plain identifiers pass.
static SQL_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

// ---------------------------------------------------------------------------
// Config structs (matching enricher.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source and sink database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Profile API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Run behavior.
    #[serde(default)]
    pub run: RunConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL/SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Table holding the companies to enrich.
    #[serde(default = "default_source_table")]
    pub source_table: String,

    /// Identifier column in the source table.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Profile URL column in the source table.
    #[serde(default = "default_url_column")]
    pub url_column: String,

    /// Destination table for enriched rows (created if missing).
    #[serde(default = "default_sink_table")]
    pub sink_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            source_table: default_source_table(),
            id_column: default_id_column(),
            url_column: default_url_column(),
            sink_table: default_sink_table(),
        }
    }
}

impl DatabaseConfig {
    /// Check that every table/column name is a plain SQL identifier.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("source_table", &self.source_table),
            ("id_column", &self.id_column),
            ("url_column", &self.url_column),
            ("sink_table", &self.sink_table),
        ] {
            if !SQL_IDENTIFIER.is_match(value) {
                return Err(EnricherError::config(format!(
                    "database.{field} = {value:?} is not a valid SQL identifier"
                )));
            }
        }
        Ok(())
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("company_data.db")
}
fn default_source_table() -> String {
    "company_data".into()
}
fn default_id_column() -> String {
    "company_id".into()
}
fn default_url_column() -> String {
    "company_linkedin_url".into()
}
fn default_sink_table() -> String {
    "company_enriched_data".into()
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Profile lookup endpoint (receives a POST per company).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Value for the `x-rapidapi-host` header; omitted when unset.
    #[serde(default = "default_host")]
    pub host: Option<String>,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Header carrying the API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            host: default_host(),
            api_key_env: default_api_key_env(),
            api_key_header: default_api_key_header(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Parse the configured endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| {
            EnricherError::config(format!("api.endpoint {:?} is not a URL: {e}", self.endpoint))
        })
    }
}

fn default_endpoint() -> String {
    "https://linkedin-bulk-data-scraper.p.rapidapi.com/company".into()
}
fn default_host() -> Option<String> {
    Some("linkedin-bulk-data-scraper.p.rapidapi.com".into())
}
fn default_api_key_env() -> String {
    "RAPIDAPI_KEY".into()
}
fn default_api_key_header() -> String {
    "x-rapidapi-key".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// What to do when inserting an enriched row fails.
    #[serde(default)]
    pub on_write_error: WriteFailurePolicy,
}

/// Handling of sink failures inside the row loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteFailurePolicy {
    /// Roll back the whole run.
    #[default]
    Abort,
    /// Log the failure and continue with the next row.
    Skip,
}

impl FromStr for WriteFailurePolicy {
    type Err = EnricherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(EnricherError::config(format!(
                "unknown write-failure policy '{other}': expected 'abort' or 'skip'"
            ))),
        }
    }
}

impl std::fmt::Display for WriteFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.company-enricher/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EnricherError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.company-enricher/enricher.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EnricherError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        EnricherError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.database.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EnricherError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EnricherError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EnricherError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in the config.
pub fn resolve_api_key(api: &ApiConfig) -> Result<String> {
    let var_name = &api.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(EnricherError::config(format!(
            "profile API key not found. Set the {var_name} environment variable."
        ))),
    }
}
