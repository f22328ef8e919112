//! User registration and login against the `users` table.
//!
//! Passwords are stored as bcrypt hashes, which embed their own salt and
//! cost. Login only checks credentials; no session or token is issued.

use chrono::{DateTime, Utc};
use serde::Serialize;
use soilscope_shared::{Result, SoilScopeError, UserId, UserRecord};
use soilscope_storage::Storage;
use tracing::{debug, info, instrument, warn};

/// bcrypt work factor.
const BCRYPT_COST: u32 = 10;

const INVALID_CREDENTIALS: &str = "invalid credentials";

/// The public view of a user: never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            created_at: record.created_at,
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SoilScopeError::validation(format!("{field} is required")));
    }
    Ok(value)
}

/// Create a user. Fails with `Validation` on a blank field and `Conflict`
/// when the email is already registered.
#[instrument(skip_all)]
pub async fn register(
    storage: &Storage,
    name: &str,
    email: &str,
    password: &str,
) -> Result<UserProfile> {
    let name = required("name", name)?;
    let email = required("email", email)?.to_lowercase();
    if password.trim().is_empty() {
        return Err(SoilScopeError::validation("password is required"));
    }

    let record = UserRecord {
        id: UserId::new(),
        name: name.to_string(),
        email,
        password_hash: hash_password(password).await?,
        created_at: Utc::now(),
    };
    storage.insert_user(&record).await?;

    info!(user_id = %record.id, "user registered");
    Ok(record.into())
}

/// Check credentials. Unknown email and wrong password fail identically.
#[instrument(skip_all)]
pub async fn login(storage: &Storage, email: &str, password: &str) -> Result<UserProfile> {
    let email = email.trim().to_lowercase();
    let Some(record) = storage.find_user_by_email(&email).await? else {
        debug!("login for unknown email");
        return Err(SoilScopeError::auth(INVALID_CREDENTIALS));
    };

    if !verify_password(password, &record.password_hash).await? {
        debug!(user_id = %record.id, "login with wrong password");
        return Err(SoilScopeError::auth(INVALID_CREDENTIALS));
    }

    info!(user_id = %record.id, "user logged in");
    Ok(record.into())
}

// bcrypt runs on the blocking pool.

async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| SoilScopeError::password_hash(e.to_string()))?
        .map_err(|e| SoilScopeError::password_hash(e.to_string()))
}

async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| SoilScopeError::password_hash(e.to_string()))?;
    verified.map_err(|e| {
        warn!(error = %e, "stored password hash is unreadable");
        SoilScopeError::password_hash(e.to_string())
    })
}
