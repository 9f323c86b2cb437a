//! Purchase history: one row per completed customer order.
//!
//! Rows are written by `order::complete`; this module only reads them.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::services::page::{Page, PageRequest};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("purchase history entry not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_id: Option<Uuid>,
    pub order_number: String,
    pub total_cents: i64,
    pub items_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub order_date: OffsetDateTime,
    pub status: String,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub discount_cents: i64,
    pub points_earned: i64,
    pub points_used: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CustomerTotals {
    pub customer_id: Uuid,
    pub order_count: i64,
    pub total_spent_cents: i64,
}

/// Inclusive date range from query parameters (RFC 3339).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DateRange {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns `Validation` when the range is inverted.
    pub fn validate(self) -> Result<Self, HistoryError> {
        if self.start > self.end {
            return Err(HistoryError::Validation("start must not be after end".into()));
        }
        Ok(self)
    }
}

const COLUMNS: &str = "id, customer_id, order_id, order_number, total_cents, items_count, order_date, status, \
     payment_method, notes, discount_cents, points_earned, points_used";

fn purchase_from_row(row: &sqlx::postgres::PgRow) -> Purchase {
    Purchase {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        order_id: row.get("order_id"),
        order_number: row.get("order_number"),
        total_cents: row.get("total_cents"),
        items_count: row.get("items_count"),
        order_date: row.get("order_date"),
        status: row.get("status"),
        payment_method: row.get("payment_method"),
        notes: row.get("notes"),
        discount_cents: row.get("discount_cents"),
        points_earned: row.get("points_earned"),
        points_used: row.get("points_used"),
    }
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Purchase>, HistoryError> {
    let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM purchase_history ORDER BY order_date DESC"))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(purchase_from_row).collect())
}

/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_for_customer(
    pool: &PgPool,
    customer_id: Uuid,
    page: PageRequest,
) -> Result<Page<Purchase>, HistoryError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchase_history WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM purchase_history WHERE customer_id = $1
         ORDER BY order_date DESC LIMIT $2 OFFSET $3"
    ))
    .bind(customer_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(Page::new(rows.iter().map(purchase_from_row).collect(), page, total))
}

/// # Errors
///
/// Returns `NotFound` if no entry has this id.
pub async fn get_entry(pool: &PgPool, id: Uuid) -> Result<Purchase, HistoryError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM purchase_history WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(HistoryError::NotFound)?;
    Ok(purchase_from_row(&row))
}

/// # Errors
///
/// Returns `NotFound` if no entry has this order number.
pub async fn get_by_order_number(pool: &PgPool, order_number: &str) -> Result<Purchase, HistoryError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM purchase_history WHERE order_number = $1"))
        .bind(order_number)
        .fetch_optional(pool)
        .await?
        .ok_or(HistoryError::NotFound)?;
    Ok(purchase_from_row(&row))
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn customer_totals(pool: &PgPool, customer_id: Uuid) -> Result<CustomerTotals, HistoryError> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS order_count, COALESCE(SUM(total_cents), 0)::BIGINT AS total_spent
         FROM purchase_history WHERE customer_id = $1",
    )
    .bind(customer_id)
    .fetch_one(pool)
    .await?;
    Ok(CustomerTotals {
        customer_id,
        order_count: row.get("order_count"),
        total_spent_cents: row.get("total_spent"),
    })
}

/// Entries within `range`, optionally for one customer.
///
/// # Errors
///
/// Returns `Validation` for an inverted range or a database error.
pub async fn list_in_range(
    pool: &PgPool,
    range: DateRange,
    customer_id: Option<Uuid>,
) -> Result<Vec<Purchase>, HistoryError> {
    let range = range.validate()?;
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM purchase_history
         WHERE order_date BETWEEN $1 AND $2 AND ($3::UUID IS NULL OR customer_id = $3)
         ORDER BY order_date DESC"
    ))
    .bind(range.start)
    .bind(range.end)
    .bind(customer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(purchase_from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn date_range_rejects_inverted() {
        let range = DateRange { start: datetime!(2025-08-19 00:00 UTC), end: datetime!(2025-08-18 00:00 UTC) };
        assert!(matches!(range.validate(), Err(HistoryError::Validation(_))));
    }

    #[test]
    fn date_range_accepts_single_instant() {
        let at = datetime!(2025-08-18 12:00 UTC);
        assert!(DateRange { start: at, end: at }.validate().is_ok());
    }

    #[test]
    fn date_range_deserializes_rfc3339() {
        let range: DateRange =
            serde_json::from_str(r#"{"start":"2025-08-01T00:00:00Z","end":"2025-08-31T23:59:59Z"}"#).unwrap();
        assert_eq!(range.start, datetime!(2025-08-01 00:00 UTC));
    }

    #[tokio::test]
    async fn inverted_range_fails_before_querying() {
        let state = crate::state::test_helpers::test_app_state();
        let range = DateRange { start: datetime!(2025-08-19 00:00 UTC), end: datetime!(2025-08-18 00:00 UTC) };
        let err = list_in_range(&state.pool, range, None).await.unwrap_err();
        assert!(matches!(err, HistoryError::Validation(_)));
    }
}
