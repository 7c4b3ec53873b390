//! Application configuration for scriptorium.
//!
//! A project-local `scriptorium.toml` wins over the user config at
//! `~/.scriptorium/scriptorium.toml`; an explicit `--config` path wins over both.
//! Missing sections fall back to defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptoriumError};
use crate::types::SeasonIndex;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "scriptorium.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".scriptorium";

// ---------------------------------------------------------------------------
// Config structs (matching scriptorium.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Related-posts linker settings.
    #[serde(default)]
    pub linker: LinkerConfig,

    /// Liturgy EPUB import settings.
    #[serde(default)]
    pub liturgy: LiturgyConfig,

    /// Record sink for imported entries.
    #[serde(default)]
    pub sink: SinkConfig,
}

/// `[linker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Root of the blog post tree.
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// File name that marks a post document.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            file_name: default_file_name(),
        }
    }
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("src/content/blog/en")
}
fn default_file_name() -> String {
    "index.mdx".into()
}

/// `[liturgy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiturgyConfig {
    /// Path to the EPUB container.
    #[serde(default = "default_epub_path")]
    pub epub_path: PathBuf,

    /// Index documents, processed in this order.
    #[serde(default = "default_seasons")]
    pub seasons: Vec<SeasonIndex>,
}

impl Default for LiturgyConfig {
    fn default() -> Self {
        Self {
            epub_path: default_epub_path(),
            seasons: default_seasons(),
        }
    }
}

fn default_epub_path() -> PathBuf {
    PathBuf::from("liturgy-of-hours.epub")
}

/// Index members of the Liturgy of the Hours volume and their seasons.
pub fn default_seasons() -> Vec<SeasonIndex> {
    [
        ("1.advent.htm", "Advent"),
        ("2.Christmas. index.htm", "Christmas"),
        ("3.Lent. index.htm", "Lent"),
        ("4.Paschal. index.htm", "Paschal Time"),
        ("5.Ordinary 1_10. index.htm", "Ordinary Time 1-10"),
        ("6.Ordinary 11_20. index.htm", "Ordinary Time 11-20"),
        ("7.Ordinary 21_34. index.htm", "Ordinary Time 21-34"),
    ]
    .into_iter()
    .map(|(index_file, season)| SeasonIndex::new(index_file, season))
    .collect()
}

/// `[sink]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Local database path, or a `libsql://` / `https://` URL for a remote database.
    #[serde(default = "default_database")]
    pub database: String,

    /// Name of the env var holding the remote auth token (never store the token itself).
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            auth_token_env: default_auth_token_env(),
        }
    }
}

fn default_database() -> String {
    "var/liturgy.db".into()
}
fn default_auth_token_env() -> String {
    "SCRIPTORIUM_DB_TOKEN".into()
}

impl SinkConfig {
    /// Whether `database` names a remote server rather than a local file.
    pub fn is_remote(&self) -> bool {
        self.database.starts_with("libsql://")
            || self.database.starts_with("https://")
            || self.database.starts_with("http://")
    }

    /// Read the remote auth token from the configured env var.
    ///
    /// Local databases need no token and yield `None`.
    pub fn auth_token(&self) -> Result<Option<String>> {
        if !self.is_remote() {
            return Ok(None);
        }
        let var_name = &self.auth_token_env;
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => Ok(Some(val)),
            _ => Err(ScriptoriumError::configuration_missing(format!(
                "remote database {} needs an auth token. Set the {var_name} environment variable.",
                self.database
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.scriptorium/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScriptoriumError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.scriptorium/scriptorium.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config.
///
/// Looks for `./scriptorium.toml`, then the user config file. Returns defaults
/// when neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScriptoriumError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ScriptoriumError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the user config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScriptoriumError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScriptoriumError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScriptoriumError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
