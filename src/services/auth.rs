//! Email/password accounts: sign up, login, and profile lookups.
//!
//! DESIGN
//! ======
//! Passwords are stored as bcrypt hashes (`$2b$<cost>$...`, salt included).
//! Sign up always creates a
//! `client`; staff accounts are provisioned through the staff service.
//! Usernames derive from the email local part and gain a numeric suffix
//! until unique (`ada`, `ada1`, `ada2`, ...).

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::access::Role;
use crate::services::session;

pub const MIN_PASSWORD_LEN: usize = 8;
#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("{0}")]
    Validation(String),
    #[error("email is already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is deactivated")]
    Deactivated,
    #[error("user not found: {0}")]
    NotFound(Uuid),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl Sex {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MALE" => Some(Self::Male),
            "FEMALE" => Some(Self::Female),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub sex: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Returned from sign up and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: &'static str,
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Full user record, as shown on the profile page.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub sex: Option<Sex>,
    pub avatar: Option<String>,
    pub phone_number: String,
    pub points: i64,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
}

pub(crate) const PROFILE_COLUMNS: &str =
    "id, first_name, last_name, username, email, role, sex, avatar, phone_number, points, is_active, created_at";

pub(crate) fn profile_from_row(row: &sqlx::postgres::PgRow) -> UserProfile {
    let first_name: String = row.get("first_name");
    let last_name: String = row.get("last_name");
    let role: String = row.get("role");
    let sex: Option<String> = row.get("sex");
    UserProfile {
        id: row.get("id"),
        name: session::full_name(&first_name, &last_name),
        first_name,
        last_name,
        username: row.get("username"),
        email: row.get("email"),
        role: Role::parse(&role).unwrap_or(Role::Client),
        sex: sex.as_deref().and_then(Sex::parse),
        avatar: row.get("avatar"),
        phone_number: row.get("phone_number"),
        points: row.get("points"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Split a display name into first and last name at the first whitespace run.
#[must_use]
pub fn split_name(name: &str) -> (String, String) {
    let trimmed = name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_owned(), rest.trim().to_owned()),
        None => (trimmed.to_owned(), String::new()),
    }
}

/// Username candidate for attempt `n` (0 = bare local part).
#[must_use]
pub fn username_candidate(email: &str, attempt: u32) -> String {
    let local = email.split('@').next().unwrap_or_default();
    if attempt == 0 { local.to_owned() } else { format!("{local}{attempt}") }
}

/// Hash a password with bcrypt.
///
/// # Errors
///
/// Returns the bcrypt error if hashing fails.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

/// Check a password against a stored bcrypt hash. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Validate a sign-up payload, returning `(email, first, last, sex)`.
///
/// # Errors
///
/// Returns `InvalidEmail` or `Validation` for malformed input.
pub fn validate_sign_up(req: &SignUp) -> Result<(String, String, String, Option<Sex>), AuthError> {
    let email = normalize_email(&req.email).ok_or(AuthError::InvalidEmail)?;
    let (first, last) = split_name(&req.name);
    if first.is_empty() {
        return Err(AuthError::Validation("name is required".into()));
    }
    if first.chars().count() > 50 || last.chars().count() > 50 {
        return Err(AuthError::Validation("name parts must be at most 50 characters".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!("password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    // Unknown values are dropped rather than rejected.
    let sex = req.sex.as_deref().and_then(Sex::parse);
    Ok((email, first, last, sex))
}

// =============================================================================
// ACCOUNTS
// =============================================================================

async fn email_registered(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Pick the first free username derived from `email`.
pub(crate) async fn unique_username(pool: &PgPool, email: &str) -> Result<String, sqlx::Error> {
    let mut attempt = 0;
    loop {
        let candidate = username_candidate(email, attempt);
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(&candidate)
            .fetch_one(pool)
            .await?;
        if !taken {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

/// Register a new client account and open a session for it.
///
/// # Errors
///
/// Returns `EmailTaken` on a duplicate email, validation errors for bad
/// input, or a database error.
pub async fn sign_up(pool: &PgPool, req: &SignUp, ttl_hours: i64) -> Result<AuthSession, AuthError> {
    let (email, first, last, sex) = validate_sign_up(req)?;

    if email_registered(pool, &email).await? {
        return Err(AuthError::EmailTaken);
    }

    let username = unique_username(pool, &email).await?;
    let inserted: Result<Uuid, sqlx::Error> = sqlx::query_scalar(
        "INSERT INTO users (first_name, last_name, username, email, password_hash, role, sex, points)
         VALUES ($1, $2, $3, $4, $5, 'client', $6, 0)
         RETURNING id",
    )
    .bind(&first)
    .bind(&last)
    .bind(&username)
    .bind(&email)
    .bind(hash_password(&req.password)?)
    .bind(sex.map(Sex::as_str))
    .fetch_one(pool)
    .await;

    // A concurrent sign-up for the same email can pass the check above and
    // then lose on the username or email index.
    let user_id = match inserted {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            if email_registered(pool, &email).await? {
                return Err(AuthError::EmailTaken);
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let token = session::create_session(pool, user_id, ttl_hours).await?;
    tracing::info!(%user_id, %username, "client signed up");

    Ok(AuthSession {
        token,
        token_type: "Bearer",
        user_id,
        email,
        name: session::full_name(&first, &last),
        role: Role::Client,
    })
}

/// Authenticate by email and password.
///
/// # Errors
///
/// Returns `InvalidCredentials` for an unknown email or wrong password and
/// `Deactivated` for disabled accounts.
pub async fn login(pool: &PgPool, req: &Login, ttl_hours: i64) -> Result<AuthSession, AuthError> {
    let email = normalize_email(&req.email).ok_or(AuthError::InvalidCredentials)?;
    let row = sqlx::query(
        "SELECT id, first_name, last_name, password_hash, role, is_active FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::InvalidCredentials)?;

    let is_active: bool = row.get("is_active");
    if !is_active {
        return Err(AuthError::Deactivated);
    }
    let stored: String = row.get("password_hash");
    if !verify_password(&req.password, &stored) {
        return Err(AuthError::InvalidCredentials);
    }

    let user_id: Uuid = row.get("id");
    let role: String = row.get("role");
    let first: String = row.get("first_name");
    let last: String = row.get("last_name");
    let token = session::create_session(pool, user_id, ttl_hours).await?;
    tracing::info!(%user_id, role = %role, "user logged in");

    Ok(AuthSession {
        token,
        token_type: "Bearer",
        user_id,
        email,
        name: session::full_name(&first, &last),
        role: Role::parse(&role).unwrap_or(Role::Client),
    })
}

/// Load the full profile for a user.
///
/// # Errors
///
/// Returns `NotFound` when the user does not exist.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<UserProfile, AuthError> {
    let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::NotFound(user_id))?;
    Ok(profile_from_row(&row))
}

/// Update the editable profile fields of the current user.
///
/// # Errors
///
/// Returns `Validation` for empty first names, `NotFound` for a missing user.
pub async fn update_profile(pool: &PgPool, user_id: Uuid, update: &ProfileUpdate) -> Result<UserProfile, AuthError> {
    if update.first_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AuthError::Validation("first name cannot be empty".into()));
    }
    if update.phone_number.as_deref().is_some_and(|p| p.chars().count() > 20) {
        return Err(AuthError::Validation("phone number must be at most 20 characters".into()));
    }

    let result = sqlx::query(
        "UPDATE users SET
             first_name = COALESCE($2, first_name),
             last_name = COALESCE($3, last_name),
             phone_number = COALESCE($4, phone_number),
             avatar = COALESCE($5, avatar),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(user_id)
    .bind(update.first_name.as_deref().map(str::trim))
    .bind(update.last_name.as_deref().map(str::trim))
    .bind(update.phone_number.as_deref())
    .bind(update.avatar.as_deref())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AuthError::NotFound(user_id));
    }
    get_profile(pool, user_id).await
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
