//! Shared types, error model, and configuration for SoilScope.
//!
//! This crate is the foundation depended on by all other SoilScope crates.
//! It provides:
//! - [`SoilScopeError`]: the unified error type, plus [`PatternError`] and [`LoadError`]
//! - Domain types ([`RuleDescriptor`], [`UserRecord`], [`UserId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AdminConfig, AppConfig, KnowledgeConfig, ServerConfig, SourceKind, StorageConfig,
    admin_token, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from,
};
pub use error::{LoadError, PatternError, Result, RuleFault, SoilScopeError};
pub use types::{RuleDescriptor, UserId, UserRecord};
