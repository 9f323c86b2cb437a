//! Inventory of raw stock (beans, milk, syrups, ...).
//!
//! DESIGN
//! ======
//! Quantities are fractional (litres, kilograms) so they are stored as
//! `DOUBLE PRECISION`. Status is never persisted; it is derived on read from
//! the quantity, the threshold and the configured warning multiple.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

pub const MAX_RESTOCK: f64 = 1000.0;

#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("stock item not found: {0}")]
    NotFound(Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockCategory {
    Beans,
    Milk,
    Syrups,
    Pastries,
    Supplies,
    Ingredients,
}

impl StockCategory {
    pub const ALL: [StockCategory; 6] =
        [Self::Beans, Self::Milk, Self::Syrups, Self::Pastries, Self::Supplies, Self::Ingredients];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beans => "beans",
            Self::Milk => "milk",
            Self::Syrups => "syrups",
            Self::Pastries => "pastries",
            Self::Supplies => "supplies",
            Self::Ingredients => "ingredients",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == lower)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Ok,
    Warning,
    Danger,
}

/// Danger at or below the threshold, warning up to `threshold * multiple`.
#[must_use]
pub fn classify(current_qty: f64, threshold: f64, warning_multiple: f64) -> StockLevel {
    if current_qty <= threshold {
        StockLevel::Danger
    } else if current_qty <= threshold * warning_multiple {
        StockLevel::Warning
    } else {
        StockLevel::Ok
    }
}

/// Gauge fill where twice the threshold reads as full.
#[must_use]
pub fn fill_percent(current_qty: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 100.0;
    }
    (current_qty / (threshold * 2.0) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockFilter {
    #[default]
    All,
    Category(StockCategory),
    LowStock,
    OutOfStock,
}

impl StockFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "low-stock" | "low_stock" => Some(Self::LowStock),
            "out-of-stock" | "out_of_stock" => Some(Self::OutOfStock),
            other => StockCategory::parse(other).map(Self::Category),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockSort {
    #[default]
    NameAsc,
    NameDesc,
    QtyLow,
    QtyHigh,
    Category,
    Supplier,
}

impl StockSort {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name-asc" => Some(Self::NameAsc),
            "name-desc" => Some(Self::NameDesc),
            "qty-low" => Some(Self::QtyLow),
            "qty-high" => Some(Self::QtyHigh),
            "category" => Some(Self::Category),
            "supplier" => Some(Self::Supplier),
            _ => None,
        }
    }

    #[must_use]
    pub fn order_by(self) -> &'static str {
        match self {
            Self::NameAsc => "name ASC",
            Self::NameDesc => "name DESC",
            Self::QtyLow => "current_qty ASC, name ASC",
            Self::QtyHigh => "current_qty DESC, name ASC",
            Self::Category => "category ASC, name ASC",
            Self::Supplier => "supplier ASC, name ASC",
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StockItem {
    pub id: Uuid,
    pub name: String,
    pub category: StockCategory,
    pub current_qty: f64,
    pub threshold: f64,
    pub unit: String,
    pub supplier: String,
    pub cost_cents: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_restocked: OffsetDateTime,
    pub status: StockLevel,
    pub fill_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockInput {
    pub name: String,
    pub category: StockCategory,
    pub current_qty: f64,
    pub threshold: f64,
    pub unit: String,
    pub supplier: String,
    pub cost_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Restock {
    pub quantity: f64,
    pub cost_cents: Option<i64>,
    pub supplier: Option<String>,
}

/// # Errors
///
/// Returns `Validation` describing the first offending field.
pub fn validate_input(input: &StockInput) -> Result<(), StockError> {
    let name_len = input.name.trim().chars().count();
    if !(2..=100).contains(&name_len) {
        return Err(StockError::Validation("name must be between 2 and 100 characters".into()));
    }
    if !input.current_qty.is_finite() || input.current_qty < 0.0 {
        return Err(StockError::Validation("current quantity cannot be negative".into()));
    }
    if !input.threshold.is_finite() || input.threshold < 1.0 {
        return Err(StockError::Validation("threshold must be at least 1".into()));
    }
    let unit_len = input.unit.trim().chars().count();
    if !(1..=20).contains(&unit_len) {
        return Err(StockError::Validation("unit must be between 1 and 20 characters".into()));
    }
    let supplier_len = input.supplier.trim().chars().count();
    if !(1..=100).contains(&supplier_len) {
        return Err(StockError::Validation("supplier must be between 1 and 100 characters".into()));
    }
    if input.cost_cents <= 0 {
        return Err(StockError::Validation("cost must be greater than 0".into()));
    }
    Ok(())
}

/// # Errors
///
/// Returns `Validation` when the quantity or replacement fields are out of range.
pub fn validate_restock(restock: &Restock) -> Result<(), StockError> {
    if !restock.quantity.is_finite() || restock.quantity < 1.0 || restock.quantity > MAX_RESTOCK {
        return Err(StockError::Validation("restock quantity must be between 1 and 1000".into()));
    }
    if restock.cost_cents.is_some_and(|c| c <= 0) {
        return Err(StockError::Validation("cost must be greater than 0".into()));
    }
    if restock
        .supplier
        .as_deref()
        .is_some_and(|s| !(1..=100).contains(&s.trim().chars().count()))
    {
        return Err(StockError::Validation("supplier must be between 1 and 100 characters".into()));
    }
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const COLUMNS: &str = "id, name, category, current_qty, threshold, unit, supplier, cost_cents, last_restocked";

fn item_from_row(row: &sqlx::postgres::PgRow, warning_multiple: f64) -> StockItem {
    let category: String = row.get("category");
    let current_qty: f64 = row.get("current_qty");
    let threshold: f64 = row.get("threshold");
    StockItem {
        id: row.get("id"),
        name: row.get("name"),
        category: StockCategory::parse(&category).unwrap_or(StockCategory::Supplies),
        current_qty,
        threshold,
        unit: row.get("unit"),
        supplier: row.get("supplier"),
        cost_cents: row.get("cost_cents"),
        last_restocked: row.get("last_restocked"),
        status: classify(current_qty, threshold, warning_multiple),
        fill_percent: fill_percent(current_qty, threshold),
    }
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_items(
    pool: &PgPool,
    filter: StockFilter,
    sort: StockSort,
    warning_multiple: f64,
) -> Result<Vec<StockItem>, StockError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM stock_items"));
    match filter {
        StockFilter::All => {}
        StockFilter::Category(c) => {
            qb.push(" WHERE category = ").push_bind(c.as_str());
        }
        StockFilter::LowStock => {
            qb.push(" WHERE current_qty <= threshold");
        }
        StockFilter::OutOfStock => {
            qb.push(" WHERE current_qty <= 0");
        }
    }
    qb.push(" ORDER BY ").push(sort.order_by());
    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows.iter().map(|r| item_from_row(r, warning_multiple)).collect())
}

/// # Errors
///
/// Returns `NotFound` if no item has this id.
pub async fn get_item(pool: &PgPool, id: Uuid, warning_multiple: f64) -> Result<StockItem, StockError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM stock_items WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StockError::NotFound(id))?;
    Ok(item_from_row(&row, warning_multiple))
}

/// Number of items at or below threshold (dashboard).
pub(crate) async fn count_danger(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM stock_items WHERE current_qty <= threshold")
        .fetch_one(pool)
        .await
}

/// # Errors
///
/// Returns `Validation` for bad input or a database error.
pub async fn create_item(pool: &PgPool, input: &StockInput, warning_multiple: f64) -> Result<StockItem, StockError> {
    validate_input(input)?;
    let row = sqlx::query(&format!(
        "INSERT INTO stock_items (name, category, current_qty, threshold, unit, supplier, cost_cents)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(input.category.as_str())
    .bind(input.current_qty)
    .bind(input.threshold)
    .bind(input.unit.trim())
    .bind(input.supplier.trim())
    .bind(input.cost_cents)
    .fetch_one(pool)
    .await?;
    let item = item_from_row(&row, warning_multiple);
    info!(stock_item_id = %item.id, name = %item.name, "stock item created");
    Ok(item)
}

/// # Errors
///
/// Returns `NotFound`, `Validation`, or a database error.
pub async fn update_item(
    pool: &PgPool,
    id: Uuid,
    input: &StockInput,
    warning_multiple: f64,
) -> Result<StockItem, StockError> {
    validate_input(input)?;
    let row = sqlx::query(&format!(
        "UPDATE stock_items SET name = $2, category = $3, current_qty = $4, threshold = $5, unit = $6,
             supplier = $7, cost_cents = $8
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(input.category.as_str())
    .bind(input.current_qty)
    .bind(input.threshold)
    .bind(input.unit.trim())
    .bind(input.supplier.trim())
    .bind(input.cost_cents)
    .fetch_optional(pool)
    .await?
    .ok_or(StockError::NotFound(id))?;
    info!(stock_item_id = %id, "stock item updated");
    Ok(item_from_row(&row, warning_multiple))
}

/// Add units and stamp `last_restocked`; cost and supplier are replaced when given.
///
/// # Errors
///
/// Returns `NotFound`, `Validation`, or a database error.
pub async fn restock(
    pool: &PgPool,
    id: Uuid,
    restock: &Restock,
    warning_multiple: f64,
) -> Result<StockItem, StockError> {
    validate_restock(restock)?;
    let row = sqlx::query(&format!(
        "UPDATE stock_items SET
             current_qty = current_qty + $2,
             cost_cents = COALESCE($3, cost_cents),
             supplier = COALESCE($4, supplier),
             last_restocked = now()
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(restock.quantity)
    .bind(restock.cost_cents)
    .bind(restock.supplier.as_deref().map(str::trim))
    .fetch_optional(pool)
    .await?
    .ok_or(StockError::NotFound(id))?;
    let item = item_from_row(&row, warning_multiple);
    info!(stock_item_id = %id, added = restock.quantity, now = item.current_qty, "stock item restocked");
    Ok(item)
}

/// # Errors
///
/// Returns `NotFound` if no item has this id.
pub async fn delete_item(pool: &PgPool, id: Uuid) -> Result<(), StockError> {
    let result = sqlx::query("DELETE FROM stock_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StockError::NotFound(id));
    }
    info!(stock_item_id = %id, "stock item deleted");
    Ok(())
}

#[cfg(test)]
#[path = "stock_test.rs"]
mod tests;
