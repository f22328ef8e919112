//! libSQL storage layer (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the knowledge-base
//! `rules` table and the `users` credential table.
//!
//! **Access rules:**
//! - `seed` / `setup-database` / registration: read-write via [`Storage::open`]
//! - knowledge-base loading: read-only via [`Storage::open_readonly`]

mod migrations;

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use soilscope_shared::{Result, RuleDescriptor, SoilScopeError, UserId, UserRecord};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SoilScopeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SoilScopeError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        SoilScopeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(SoilScopeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rule operations
    // -----------------------------------------------------------------------

    /// Replace the whole rule table with `rules`, preserving their order.
    ///
    /// Runs in a single transaction: readers see either the old table or the
    /// new one. Duplicate patterns are rejected before anything is written.
    pub async fn replace_rules(&self, rules: &[RuleDescriptor]) -> Result<usize> {
        self.check_writable()?;

        let mut seen = HashSet::new();
        for rule in rules {
            if !seen.insert(rule.question_pattern.as_str()) {
                return Err(SoilScopeError::conflict(format!(
                    "duplicate question_pattern '{}'",
                    rule.question_pattern
                )));
            }
        }

        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        tx.execute("DELETE FROM rules", params![])
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        for (position, rule) in rules.iter().enumerate() {
            let keywords_json = serde_json::to_string(&rule.keywords)
                .map_err(|e| SoilScopeError::Storage(e.to_string()))?;
            tx.execute(
                "INSERT INTO rules (position, question_pattern, reply_text, category, level, keywords_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    position as i64,
                    rule.question_pattern.as_str(),
                    rule.reply_text.as_str(),
                    rule.category.as_str(),
                    rule.level.as_str(),
                    keywords_json.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        tracing::info!(count = rules.len(), "replaced knowledge-base rules");
        Ok(rules.len())
    }

    /// List all rules in priority order.
    pub async fn list_rules(&self) -> Result<Vec<RuleDescriptor>> {
        let mut rows = self
            .conn
            .query(
                "SELECT question_pattern, reply_text, category, level, keywords_json
                 FROM rules ORDER BY position",
                params![],
            )
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?
        {
            results.push(row_to_rule(&row)?);
        }
        Ok(results)
    }

    /// Number of stored rules.
    pub async fn count_rules(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM rules", params![])
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| SoilScopeError::Storage(e.to_string()))?;
                Ok(count as usize)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(SoilScopeError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // User operations
    // -----------------------------------------------------------------------

    /// Insert a new user. Fails with [`SoilScopeError::Conflict`] if the email is taken.
    pub async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO users (id, name, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.to_string(),
                    user.name.as_str(),
                    user.email.as_str(),
                    user.password_hash.as_str(),
                    user.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") {
                    SoilScopeError::conflict(format!("user already exists: {}", user.email))
                } else {
                    SoilScopeError::Storage(msg)
                }
            })?;
        Ok(())
    }

    /// Look up a user by (lowercased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, email, password_hash, created_at
                 FROM users WHERE email = ?1",
                params![email],
            )
            .await
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(SoilScopeError::Storage(e.to_string())),
        }
    }
}

/// Convert a database row to a [`RuleDescriptor`].
fn row_to_rule(row: &libsql::Row) -> Result<RuleDescriptor> {
    let keywords_json: String = row
        .get(4)
        .map_err(|e| SoilScopeError::Storage(e.to_string()))?;
    let keywords: Vec<String> = serde_json::from_str(&keywords_json)
        .map_err(|e| SoilScopeError::Storage(format!("invalid keywords_json: {e}")))?;

    Ok(RuleDescriptor {
        question_pattern: row
            .get::<String>(0)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        reply_text: row
            .get::<String>(1)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        category: row
            .get::<String>(2)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        level: row
            .get::<String>(3)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        keywords,
    })
}

/// Convert a database row to a [`UserRecord`].
fn row_to_user(row: &libsql::Row) -> Result<UserRecord> {
    let id: String = row
        .get(0)
        .map_err(|e| SoilScopeError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(4)
        .map_err(|e| SoilScopeError::Storage(e.to_string()))?;

    Ok(UserRecord {
        id: id
            .parse::<UserId>()
            .map_err(|e| SoilScopeError::Storage(format!("invalid user id: {e}")))?,
        name: row
            .get::<String>(1)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        email: row
            .get::<String>(2)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        password_hash: row
            .get::<String>(3)
            .map_err(|e| SoilScopeError::Storage(e.to_string()))?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SoilScopeError::Storage(format!("invalid date: {e}")))?,
    })
}
