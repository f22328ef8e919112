//! SQL migration definitions for the SoilScope database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: rules, users",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Knowledge-base rules; `position` is match priority
CREATE TABLE IF NOT EXISTS rules (
    position         INTEGER PRIMARY KEY,
    question_pattern TEXT NOT NULL UNIQUE,
    reply_text       TEXT NOT NULL,
    category         TEXT NOT NULL DEFAULT 'General',
    level            TEXT NOT NULL DEFAULT 'easy',
    keywords_json    TEXT NOT NULL DEFAULT '[]',
    updated_at       TEXT NOT NULL
);

-- Registered users
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
