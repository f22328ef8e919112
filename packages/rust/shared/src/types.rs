//! Core domain types for SoilScope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RuleDescriptor
// ---------------------------------------------------------------------------

/// A raw knowledge-base record as it appears in `knowledge-base.json` or the
/// `rules` table, before its pattern is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    /// Regular-expression source, matched case-insensitively.
    pub question_pattern: String,
    /// Reply returned verbatim on match.
    pub reply_text: String,
    /// Informational classification label.
    #[serde(default = "default_category")]
    pub category: String,
    /// Informational difficulty/audience label.
    #[serde(default = "default_level")]
    pub level: String,
    /// Searchable metadata; never consulted by the matcher.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

fn default_category() -> String {
    "General".into()
}
fn default_level() -> String {
    "easy".into()
}

impl RuleDescriptor {
    /// Descriptor with default metadata.
    pub fn new(question_pattern: impl Into<String>, reply_text: impl Into<String>) -> Self {
        Self {
            question_pattern: question_pattern.into(),
            reply_text: reply_text.into(),
            category: default_category(),
            level: default_level(),
            keywords: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// UserId / UserRecord
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for user identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A registered user as stored in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    /// Lowercased email; unique.
    pub email: String,
    /// bcrypt hash string; carries its own cost and salt.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
