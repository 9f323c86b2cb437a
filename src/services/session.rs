//! Session token management.
//!
//! ARCHITECTURE
//! ============
//! Login issues an opaque 32-byte hex token stored in `sessions` with an
//! expiry. Clients present it either as the `session_token` cookie or as an
//! `Authorization: Bearer` header; validation joins back to `users` so a
//! deactivated account loses access immediately.

use std::fmt::Write;

use rand::Rng;
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::access::Role;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// User row returned from session validation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
}

/// Create a session for the given user, returning the token.
pub async fn create_session(pool: &PgPool, user_id: Uuid, ttl_hours: i64) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, now() + make_interval(hours => $3))")
        .bind(&token)
        .bind(user_id)
        .bind(i32::try_from(ttl_hours).unwrap_or(i32::MAX))
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validate a session token and return the associated active user.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.first_name, u.last_name, u.email, u.role, u.avatar
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now() AND u.is_active",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|r| {
        let role: String = r.get("role");
        let first: String = r.get("first_name");
        let last: String = r.get("last_name");
        Some(SessionUser {
            id: r.get("id"),
            name: full_name(&first, &last),
            email: r.get("email"),
            role: Role::parse(&role)?,
            avatar: r.get("avatar"),
        })
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop every session belonging to a user (deactivation, role change).
pub async fn delete_user_sessions(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Join first and last name, tolerating an empty last name.
#[must_use]
pub fn full_name(first: &str, last: &str) -> String {
    let last = last.trim();
    if last.is_empty() { first.trim().to_owned() } else { format!("{} {last}", first.trim()) }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
