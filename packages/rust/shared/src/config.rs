//! Application configuration for SoilScope.
//!
//! User config lives at `~/.soilscope/soilscope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoilScopeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "soilscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".soilscope";

// ---------------------------------------------------------------------------
// Config structs (matching soilscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Where the knowledge base is loaded from.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Administrative endpoint settings.
    #[serde(default)]
    pub admin: AdminConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

/// Which medium the knowledge base is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A JSON array of rule descriptors on disk.
    File,
    /// The `rules` table of the SoilScope database.
    Database,
    /// The rule set compiled into the binary.
    #[default]
    Builtin,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::File => "file",
            Self::Database => "database",
            Self::Builtin => "builtin",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SourceKind {
    type Err = SoilScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "database" | "db" => Ok(Self::Database),
            "builtin" => Ok(Self::Builtin),
            other => Err(SoilScopeError::config(format!(
                "unknown knowledge source '{other}': expected 'file', 'database', or 'builtin'"
            ))),
        }
    }
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Source medium.
    #[serde(default)]
    pub source: SourceKind,

    /// Path to the JSON knowledge base (used when `source = "file"`).
    #[serde(default = "default_kb_path")]
    pub path: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            path: default_kb_path(),
        }
    }
}

fn default_kb_path() -> String {
    "knowledge-base.json".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// libSQL database file. A leading `~/` is expanded to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "~/.soilscope/soilscope.db".into()
}

/// `[admin]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Name of the env var holding the admin token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "SOILSCOPE_ADMIN_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.soilscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SoilScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.soilscope/soilscope.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SoilScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SoilScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SoilScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SoilScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SoilScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| SoilScopeError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Read the admin token from the env var named in the config.
///
/// Returns `None` when the variable is unset or empty, which disables the
/// administrative endpoints.
pub fn admin_token(config: &AppConfig) -> Option<String> {
    match std::env::var(&config.admin.token_env) {
        Ok(val) if !val.is_empty() => Some(val),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("SOILSCOPE_ADMIN_TOKEN"));
        assert!(toml_str.contains("source = \"builtin\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.knowledge.source, SourceKind::Builtin);
        assert_eq!(parsed.admin.token_env, "SOILSCOPE_ADMIN_TOKEN");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[knowledge]
source = "file"
path = "/srv/soilscope/kb.json"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.knowledge.source, SourceKind::File);
        assert_eq!(config.knowledge.path, "/srv/soilscope/kb.json");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn source_kind_from_str() {
        assert_eq!("json".parse::<SourceKind>().unwrap(), SourceKind::File);
        assert_eq!("Database".parse::<SourceKind>().unwrap(), SourceKind::Database);
        assert_eq!("builtin".parse::<SourceKind>().unwrap(), SourceKind::Builtin);
        assert!("mongo".parse::<SourceKind>().is_err());
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(
            expand_home("/tmp/soilscope.db").unwrap(),
            PathBuf::from("/tmp/soilscope.db")
        );
        let expanded = expand_home("~/x.db").unwrap();
        assert!(expanded.ends_with("x.db"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn admin_token_missing() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.admin.token_env = "SOILSCOPE_TEST_NONEXISTENT_TOKEN_12345".into();
        assert!(admin_token(&config).is_none());
    }
}
