//! Customer accounts (users with the `client` role) as seen by managers.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::services::auth::{self, PROFILE_COLUMNS, UserProfile, profile_from_row};
use crate::services::page::{Page, PageRequest};
use crate::services::session;

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("customer not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_customers(
    pool: &PgPool,
    active_only: bool,
    page: PageRequest,
) -> Result<Page<UserProfile>, CustomerError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'client' AND ($1 = FALSE OR is_active)")
        .bind(active_only)
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users
         WHERE role = 'client' AND ($1 = FALSE OR is_active)
         ORDER BY created_at DESC, id
         LIMIT $2 OFFSET $3"
    ))
    .bind(active_only)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(Page::new(rows.iter().map(profile_from_row).collect(), page, total))
}

/// # Errors
///
/// Returns `NotFound` when the id is not a customer.
pub async fn get_customer(pool: &PgPool, id: Uuid) -> Result<UserProfile, CustomerError> {
    let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1 AND role = 'client'"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(CustomerError::NotFound)?;
    Ok(profile_from_row(&row))
}

/// # Errors
///
/// Returns `NotFound` when no customer has this email.
pub async fn get_customer_by_email(pool: &PgPool, email: &str) -> Result<UserProfile, CustomerError> {
    let email = auth::normalize_email(email).ok_or(CustomerError::NotFound)?;
    let row = sqlx::query(&format!("SELECT {PROFILE_COLUMNS} FROM users WHERE email = $1 AND role = 'client'"))
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or(CustomerError::NotFound)?;
    Ok(profile_from_row(&row))
}

/// Enable or disable a customer account. Disabling also ends their sessions.
///
/// # Errors
///
/// Returns `NotFound` when the id is not a customer.
pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<UserProfile, CustomerError> {
    let result = sqlx::query("UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 AND role = 'client'")
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CustomerError::NotFound);
    }
    if !active {
        session::delete_user_sessions(pool, id).await?;
    }
    info!(customer_id = %id, active, "customer activation changed");
    get_customer(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_customer_by_email_rejects_malformed_without_query() {
        let state = crate::state::test_helpers::test_app_state();
        let err = get_customer_by_email(&state.pool, "not-an-email").await.unwrap_err();
        assert!(matches!(err, CustomerError::NotFound));
    }

    #[cfg(feature = "live-db-tests")]
    #[tokio::test]
    async fn deactivate_then_activate() {
        let state = crate::state::test_helpers::live_app_state().await;
        let email = format!("cust-{}@astrobrew.test", Uuid::new_v4().simple());
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (first_name, username, email, password_hash) VALUES ('Cust', $1, $1, 'x$y') RETURNING id",
        )
        .bind(&email)
        .fetch_one(&state.pool)
        .await
        .unwrap();

        assert!(!set_active(&state.pool, id, false).await.unwrap().is_active);
        assert!(set_active(&state.pool, id, true).await.unwrap().is_active);
        assert_eq!(get_customer_by_email(&state.pool, &email).await.unwrap().id, id);
    }
}
