//! Knowledge-base sources: where rule descriptors come from.
//!
//! One configuration names exactly one source. A source that cannot be read
//! or parsed fails the load with [`LoadError::Source`]; there is no silent
//! fallthrough to another medium.

use std::path::{Path, PathBuf};

use soilscope_shared::{
    AppConfig, LoadError, Result, RuleDescriptor, SourceKind, expand_home,
};
use soilscope_storage::Storage;
use tracing::debug;

use crate::seed;

/// A medium holding an ordered list of rule descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// A JSON array of descriptors on disk (`knowledge-base.json`).
    JsonFile(PathBuf),
    /// The `rules` table of a SoilScope database, opened read-only.
    Database(PathBuf),
    /// The rule set compiled into the binary.
    Builtin,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JsonFile(path) => write!(f, "file:{}", path.display()),
            Self::Database(path) => write!(f, "database:{}", path.display()),
            Self::Builtin => f.write_str("builtin"),
        }
    }
}

impl RuleSource {
    /// Build a source from the `[knowledge]` and `[storage]` config sections.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::from_kind(config.knowledge.source, config, None)
    }

    /// Build a source of `kind`, taking paths from `config` unless `path`
    /// overrides them.
    pub fn from_kind(kind: SourceKind, config: &AppConfig, path: Option<&Path>) -> Result<Self> {
        Ok(match kind {
            SourceKind::File => Self::JsonFile(match path {
                Some(p) => p.to_path_buf(),
                None => expand_home(&config.knowledge.path)?,
            }),
            SourceKind::Database => Self::Database(match path {
                Some(p) => p.to_path_buf(),
                None => expand_home(&config.storage.database_path)?,
            }),
            SourceKind::Builtin => Self::Builtin,
        })
    }

    /// Read the ordered descriptors.
    pub async fn fetch(&self) -> std::result::Result<Vec<RuleDescriptor>, LoadError> {
        let descriptors = match self {
            Self::JsonFile(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| LoadError::source_unavailable(self.to_string(), e.to_string()))?;
                parse_json(&content)
                    .map_err(|e| LoadError::source_unavailable(self.to_string(), e))?
            }
            Self::Database(path) => {
                let storage = Storage::open_readonly(path)
                    .await
                    .map_err(|e| LoadError::source_unavailable(self.to_string(), e.to_string()))?;
                storage
                    .list_rules()
                    .await
                    .map_err(|e| LoadError::source_unavailable(self.to_string(), e.to_string()))?
            }
            Self::Builtin => seed::builtin_rules(),
        };

        debug!(source = %self, count = descriptors.len(), "fetched rule descriptors");
        Ok(descriptors)
    }
}

/// Parse a JSON knowledge base: an array of descriptor objects.
pub fn parse_json(content: &str) -> std::result::Result<Vec<RuleDescriptor>, String> {
    serde_json::from_str(content).map_err(|e| format!("malformed knowledge base: {e}"))
}
