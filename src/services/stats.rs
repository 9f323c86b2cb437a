//! Dashboard aggregates for managers.
//!
//! DESIGN
//! ======
//! Aggregation happens in SQL; the shaping that dashboards need (zero-filled
//! hours, peak detection, revenue shares) is kept in small pure functions so
//! it can be tested without a database. "Today" is the database's
//! `CURRENT_DATE`.

use serde::Serialize;
use sqlx::{PgPool, Row};
use time::Date;

use crate::format::format_short_date;
use crate::services::menu::ItemType;
use crate::services::{stock, worklog};

pub const SALES_WINDOW_DAYS: i32 = 7;
pub const CATEGORY_WINDOW_DAYS: i32 = 30;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub today_sales_cents: i64,
    pub today_orders: i64,
    pub orders_in_queue: i64,
    pub avg_prep_minutes: f64,
    pub low_stock_count: i64,
    pub staff_on_duty: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySales {
    pub date: Date,
    /// Chart axis label, `"Aug 18"`.
    pub label: String,
    pub total_cents: i64,
    pub orders: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyOrders {
    pub hour: i32,
    pub orders: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub item_type: ItemType,
    pub revenue_cents: i64,
    pub percentage: f64,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// `part / whole` as a percentage rounded to one decimal; 0 when `whole` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 1000.0).round() / 10.0
}

/// Expand sparse `(hour, count)` rows into all 24 hours.
#[must_use]
pub fn fill_hours(rows: &[(i32, i64)]) -> Vec<HourlyOrders> {
    (0..24)
        .map(|hour| HourlyOrders {
            hour,
            orders: rows
                .iter()
                .filter(|(h, _)| *h == hour)
                .map(|(_, n)| *n)
                .sum(),
        })
        .collect()
}

/// Busiest hour; earliest wins ties, `None` when nothing was ordered.
#[must_use]
pub fn peak_hour(hours: &[HourlyOrders]) -> Option<i32> {
    hours
        .iter()
        .filter(|h| h.orders > 0)
        .fold(None::<HourlyOrders>, |best, h| match best {
            Some(b) if b.orders >= h.orders => Some(b),
            _ => Some(*h),
        })
        .map(|h| h.hour)
}

/// Revenue share per menu type, largest first.
#[must_use]
pub fn category_mix(revenue: &[(ItemType, i64)]) -> Vec<CategoryShare> {
    let total: i64 = revenue.iter().map(|(_, r)| *r).sum();
    let mut shares: Vec<CategoryShare> = revenue
        .iter()
        .map(|&(item_type, revenue_cents)| CategoryShare {
            item_type,
            revenue_cents,
            percentage: percentage(revenue_cents, total),
        })
        .collect();
    shares.sort_by(|a, b| b.revenue_cents.cmp(&a.revenue_cents));
    shares
}

// =============================================================================
// QUERIES
// =============================================================================

/// # Errors
///
/// Returns a database error if any aggregate query fails.
pub async fn dashboard(pool: &PgPool) -> Result<Dashboard, sqlx::Error> {
    let row = sqlx::query(
        "SELECT
             COALESCE(SUM(total_cents) FILTER (WHERE 'COMPLETE' = ANY(status)), 0)::BIGINT AS sales,
             COUNT(*) AS orders,
             COUNT(*) FILTER (WHERE 'COMPLETE' = ANY(status)) AS completed,
             COALESCE(AVG(EXTRACT(EPOCH FROM (ready_at - placed_at)) / 60.0)
                 FILTER (WHERE ready_at IS NOT NULL), 0)::DOUBLE PRECISION AS avg_prep
         FROM orders
         WHERE placed_at::date = CURRENT_DATE",
    )
    .fetch_one(pool)
    .await?;

    let orders_in_queue: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE NOT ('COMPLETE' = ANY(status) OR 'CANCELLED' = ANY(status))",
    )
    .fetch_one(pool)
    .await?;

    let today_orders: i64 = row.get("orders");
    let completed: i64 = row.get("completed");
    let avg_prep: f64 = row.get("avg_prep");

    Ok(Dashboard {
        today_sales_cents: row.get("sales"),
        today_orders,
        orders_in_queue,
        avg_prep_minutes: (avg_prep * 10.0).round() / 10.0,
        low_stock_count: stock::count_danger(pool).await?,
        staff_on_duty: worklog::count_on_duty(pool).await?,
        completion_rate: percentage(completed, today_orders),
    })
}

/// Completed sales per day for the trailing window, zero-filled.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn sales_by_day(pool: &PgPool) -> Result<Vec<DailySales>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT d::date AS day,
                COALESCE(SUM(o.total_cents), 0)::BIGINT AS total,
                COUNT(o.id) AS orders
         FROM generate_series(CURRENT_DATE - ($1 - 1), CURRENT_DATE, INTERVAL '1 day') AS d
         LEFT JOIN orders o ON o.placed_at::date = d::date AND 'COMPLETE' = ANY(o.status)
         GROUP BY d
         ORDER BY d",
    )
    .bind(SALES_WINDOW_DAYS)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| {
            let date: Date = r.get("day");
            DailySales {
                date,
                label: format_short_date(date.midnight().assume_utc()),
                total_cents: r.get("total"),
                orders: r.get("orders"),
            }
        })
        .collect())
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn orders_by_hour(pool: &PgPool) -> Result<Vec<HourlyOrders>, sqlx::Error> {
    let rows: Vec<(i32, i64)> = sqlx::query_as(
        "SELECT EXTRACT(HOUR FROM placed_at)::INT AS hour, COUNT(*) AS orders
         FROM orders
         WHERE placed_at::date = CURRENT_DATE
         GROUP BY 1",
    )
    .fetch_all(pool)
    .await?;
    Ok(fill_hours(&rows))
}

/// Revenue by menu type over the trailing window of completed orders.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn category_breakdown(pool: &PgPool) -> Result<Vec<CategoryShare>, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT i.item_type, SUM(i.subtotal_cents)::BIGINT
         FROM order_items i
         JOIN orders o ON o.id = i.order_id
         WHERE 'COMPLETE' = ANY(o.status) AND o.placed_at >= now() - make_interval(days => $1)
         GROUP BY i.item_type",
    )
    .bind(CATEGORY_WINDOW_DAYS)
    .fetch_all(pool)
    .await?;
    let revenue: Vec<(ItemType, i64)> = rows
        .iter()
        .filter_map(|(t, r)| ItemType::parse(t).map(|t| (t, *r)))
        .collect();
    Ok(category_mix(&revenue))
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
