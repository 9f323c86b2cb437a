//! Menu catalogue: public browsing, management CRUD and popularity analytics.
//!
//! DESIGN
//! ======
//! Listing queries are assembled with `QueryBuilder` so optional filters only
//! add predicates when present. Sort columns come from a fixed whitelist
//! (`MenuSort`); user input never reaches the SQL text.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::services::page::{Page, PageRequest};

pub const DEFAULT_RECOMMENDATIONS: i64 = 6;
pub const DEFAULT_FAVORITES: i64 = 3;
pub const DEFAULT_PROMOTIONS: i64 = 3;
pub const DEFAULT_ANALYTICS: i64 = 10;
pub const MAX_PRICE_CENTS: i64 = 99_999;

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("menu item not found: {0}")]
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Coffee,
    Pastries,
    Drinks,
    Bundles,
    Vegetarian,
    Instant,
    Combo,
}

impl ItemType {
    pub const ALL: [ItemType; 7] =
        [Self::Coffee, Self::Pastries, Self::Drinks, Self::Bundles, Self::Vegetarian, Self::Instant, Self::Combo];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coffee => "COFFEE",
            Self::Pastries => "PASTRIES",
            Self::Drinks => "DRINKS",
            Self::Bundles => "BUNDLES",
            Self::Vegetarian => "VEGETARIAN",
            Self::Instant => "INSTANT",
            Self::Combo => "COMBO",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|t| t.as_str() == upper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromoType {
    PercentageDiscount,
    FixedAmountDiscount,
    BuyOneGetOne,
    SeasonalSpecial,
    LoyaltyReward,
    HappyHour,
    StudentDiscount,
    EmployeeDiscount,
}

impl PromoType {
    pub const ALL: [PromoType; 8] = [
        Self::PercentageDiscount,
        Self::FixedAmountDiscount,
        Self::BuyOneGetOne,
        Self::SeasonalSpecial,
        Self::LoyaltyReward,
        Self::HappyHour,
        Self::StudentDiscount,
        Self::EmployeeDiscount,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PercentageDiscount => "PERCENTAGE_DISCOUNT",
            Self::FixedAmountDiscount => "FIXED_AMOUNT_DISCOUNT",
            Self::BuyOneGetOne => "BUY_ONE_GET_ONE",
            Self::SeasonalSpecial => "SEASONAL_SPECIAL",
            Self::LoyaltyReward => "LOYALTY_REWARD",
            Self::HappyHour => "HAPPY_HOUR",
            Self::StudentDiscount => "STUDENT_DISCOUNT",
            Self::EmployeeDiscount => "EMPLOYEE_DISCOUNT",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL.into_iter().find(|t| t.as_str() == upper)
    }
}

/// Whitelisted sort columns for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuSort {
    #[default]
    Name,
    Price,
    Rating,
    WeeklyBuys,
    MonthlyBuys,
    CreatedAt,
}

impl MenuSort {
    /// Accepts both snake and camel case (`weekly_buys`, `weeklyBuys`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "rating" => Some(Self::Rating),
            "weeklybuys" => Some(Self::WeeklyBuys),
            "monthlybuys" => Some(Self::MonthlyBuys),
            "createdat" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price_cents",
            Self::Rating => "rating",
            Self::WeeklyBuys => "weekly_buys",
            Self::MonthlyBuys => "monthly_buys",
            Self::CreatedAt => "created_at",
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub item_type: ItemType,
    pub image: String,
    pub rating: f64,
    pub reviews_count: i32,
    pub weekly_reviews: i32,
    pub monthly_reviews: i32,
    pub weekly_buys: i32,
    pub monthly_buys: i32,
    pub tags: Vec<String>,
    pub in_stock: bool,
    pub is_on_sale: bool,
    pub is_combo: bool,
    pub promo_type: Option<PromoType>,
    pub discount_percent: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create or full-replace payload. Counters are optional on update and keep
/// their stored values when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub item_type: ItemType,
    #[serde(default)]
    pub image: String,
    pub rating: Option<f64>,
    pub reviews_count: Option<i32>,
    pub weekly_reviews: Option<i32>,
    pub monthly_reviews: Option<i32>,
    pub weekly_buys: Option<i32>,
    pub monthly_buys: Option<i32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub in_stock: Option<bool>,
    pub is_on_sale: Option<bool>,
    pub is_combo: Option<bool>,
    pub promo_type: Option<PromoType>,
}

/// Optional listing filters; `None` means "don't filter".
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuFilter {
    pub item_type: Option<ItemType>,
    pub promo_type: Option<PromoType>,
    pub in_stock: Option<bool>,
    pub on_sale: Option<bool>,
    pub combo: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MenuOrdering {
    pub sort: MenuSort,
    pub descending: bool,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// Whole-percent discount when the original price is above the current one.
#[must_use]
pub fn discount_percent(price_cents: i64, original_price_cents: Option<i64>) -> Option<i64> {
    let original = original_price_cents?;
    if original <= 0 || original <= price_cents {
        return None;
    }
    let off = original - price_cents;
    Some((off * 100 + original / 2) / original)
}

/// # Errors
///
/// Returns `Validation` describing the first offending field.
pub fn validate_input(input: &MenuItemInput) -> Result<(), MenuError> {
    let name_len = input.name.trim().chars().count();
    if !(2..=100).contains(&name_len) {
        return Err(MenuError::Validation("name must be between 2 and 100 characters".into()));
    }
    if input.description.trim().is_empty() || input.description.chars().count() > 1000 {
        return Err(MenuError::Validation("description must be between 1 and 1000 characters".into()));
    }
    if !(1..=MAX_PRICE_CENTS).contains(&input.price_cents) {
        return Err(MenuError::Validation("price must be between 0.01 and 999.99".into()));
    }
    if input
        .original_price_cents
        .is_some_and(|p| !(1..=MAX_PRICE_CENTS).contains(&p))
    {
        return Err(MenuError::Validation("original price must be between 0.01 and 999.99".into()));
    }
    if input.image.chars().count() > 500 {
        return Err(MenuError::Validation("image URL must not exceed 500 characters".into()));
    }
    if input.rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
        return Err(MenuError::Validation("rating must be between 0 and 5".into()));
    }
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const COLUMNS: &str = "id, name, description, price_cents, original_price_cents, item_type, image, rating, \
     reviews_count, weekly_reviews, monthly_reviews, weekly_buys, monthly_buys, tags, in_stock, is_on_sale, \
     is_combo, promo_type, created_at";

fn item_from_row(row: &sqlx::postgres::PgRow) -> MenuItem {
    let item_type: String = row.get("item_type");
    let promo_type: Option<String> = row.get("promo_type");
    let price_cents: i64 = row.get("price_cents");
    let original_price_cents: Option<i64> = row.get("original_price_cents");
    MenuItem {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price_cents,
        original_price_cents,
        item_type: ItemType::parse(&item_type).unwrap_or(ItemType::Coffee),
        image: row.get("image"),
        rating: row.get("rating"),
        reviews_count: row.get("reviews_count"),
        weekly_reviews: row.get("weekly_reviews"),
        monthly_reviews: row.get("monthly_reviews"),
        weekly_buys: row.get("weekly_buys"),
        monthly_buys: row.get("monthly_buys"),
        tags: row.get("tags"),
        in_stock: row.get("in_stock"),
        is_on_sale: row.get("is_on_sale"),
        is_combo: row.get("is_combo"),
        promo_type: promo_type.as_deref().and_then(PromoType::parse),
        discount_percent: discount_percent(price_cents, original_price_cents),
        created_at: row.get("created_at"),
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &MenuFilter) {
    qb.push(" WHERE TRUE");
    if let Some(t) = filter.item_type {
        qb.push(" AND item_type = ").push_bind(t.as_str());
    }
    if let Some(p) = filter.promo_type {
        qb.push(" AND promo_type = ").push_bind(p.as_str());
    }
    if let Some(v) = filter.in_stock {
        qb.push(" AND in_stock = ").push_bind(v);
    }
    if let Some(v) = filter.on_sale {
        qb.push(" AND is_on_sale = ").push_bind(v);
    }
    if let Some(v) = filter.combo {
        qb.push(" AND is_combo = ").push_bind(v);
    }
}

/// Paginated, filtered listing.
///
/// # Errors
///
/// Returns a database error if either query fails.
pub async fn list_items(
    pool: &PgPool,
    filter: &MenuFilter,
    ordering: MenuOrdering,
    page: PageRequest,
) -> Result<Page<MenuItem>, MenuError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM menu_items");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM menu_items"));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY ")
        .push(ordering.sort.column())
        .push(if ordering.descending { " DESC" } else { " ASC" })
        .push(", id ASC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build().fetch_all(pool).await?;

    Ok(Page::new(rows.iter().map(item_from_row).collect(), page, total))
}

/// Unpaginated listing for the simple public filters (by type, on sale, combos).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_all(pool: &PgPool, filter: &MenuFilter) -> Result<Vec<MenuItem>, MenuError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM menu_items"));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY name ASC");
    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows.iter().map(item_from_row).collect())
}

/// # Errors
///
/// Returns `NotFound` if no item has this id.
pub async fn get_item(pool: &PgPool, id: Uuid) -> Result<MenuItem, MenuError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM menu_items WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(MenuError::NotFound(id))?;
    Ok(item_from_row(&row))
}

/// Fetch several items at once (order placement).
pub(crate) async fn get_items(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<MenuItem>, sqlx::Error> {
    let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM menu_items WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(item_from_row).collect())
}

/// Most bought items this week (recommendations, analytics).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn top_bought(pool: &PgPool, limit: i64, in_stock_only: bool) -> Result<Vec<MenuItem>, MenuError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM menu_items
         WHERE ($2 = FALSE OR in_stock)
         ORDER BY weekly_buys DESC, monthly_buys DESC, name ASC
         LIMIT $1"
    ))
    .bind(limit.clamp(1, 100))
    .bind(in_stock_only)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(item_from_row).collect())
}

/// Best rated items, tie-broken by review count (favorites, analytics).
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn top_rated(pool: &PgPool, limit: i64, in_stock_only: bool) -> Result<Vec<MenuItem>, MenuError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM menu_items
         WHERE ($2 = FALSE OR in_stock)
         ORDER BY rating DESC, reviews_count DESC, name ASC
         LIMIT $1"
    ))
    .bind(limit.clamp(1, 100))
    .bind(in_stock_only)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(item_from_row).collect())
}

/// Items carrying a promotion, optionally of one type.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn promotions(pool: &PgPool, promo_type: Option<PromoType>, limit: i64) -> Result<Vec<MenuItem>, MenuError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM menu_items
         WHERE promo_type IS NOT NULL AND ($1::TEXT IS NULL OR promo_type = $1)
         ORDER BY is_on_sale DESC, weekly_buys DESC, name ASC
         LIMIT $2"
    ))
    .bind(promo_type.map(PromoType::as_str))
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(item_from_row).collect())
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// # Errors
///
/// Returns `Validation` for bad input or a database error.
pub async fn create_item(pool: &PgPool, input: &MenuItemInput) -> Result<MenuItem, MenuError> {
    validate_input(input)?;
    let row = sqlx::query(&format!(
        "INSERT INTO menu_items (name, description, price_cents, original_price_cents, item_type, image, rating,
             reviews_count, weekly_reviews, monthly_reviews, weekly_buys, monthly_buys, tags, in_stock,
             is_on_sale, is_combo, promo_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         RETURNING {COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.price_cents)
    .bind(input.original_price_cents)
    .bind(input.item_type.as_str())
    .bind(&input.image)
    .bind(input.rating.unwrap_or(0.0))
    .bind(input.reviews_count.unwrap_or(0))
    .bind(input.weekly_reviews.unwrap_or(0))
    .bind(input.monthly_reviews.unwrap_or(0))
    .bind(input.weekly_buys.unwrap_or(0))
    .bind(input.monthly_buys.unwrap_or(0))
    .bind(&input.tags)
    .bind(input.in_stock.unwrap_or(true))
    .bind(input.is_on_sale.unwrap_or(false))
    .bind(input.is_combo.unwrap_or(input.item_type == ItemType::Combo))
    .bind(input.promo_type.map(PromoType::as_str))
    .fetch_one(pool)
    .await?;

    let item = item_from_row(&row);
    info!(menu_item_id = %item.id, name = %item.name, "menu item created");
    Ok(item)
}

/// Replace the editable fields; counters and flags keep stored values when omitted.
///
/// # Errors
///
/// Returns `NotFound`, `Validation`, or a database error.
pub async fn update_item(pool: &PgPool, id: Uuid, input: &MenuItemInput) -> Result<MenuItem, MenuError> {
    validate_input(input)?;
    let row = sqlx::query(&format!(
        "UPDATE menu_items SET
             name = $2, description = $3, price_cents = $4, original_price_cents = $5, item_type = $6,
             image = $7,
             rating = COALESCE($8, rating),
             reviews_count = COALESCE($9, reviews_count),
             weekly_reviews = COALESCE($10, weekly_reviews),
             monthly_reviews = COALESCE($11, monthly_reviews),
             weekly_buys = COALESCE($12, weekly_buys),
             monthly_buys = COALESCE($13, monthly_buys),
             tags = $14,
             in_stock = COALESCE($15, in_stock),
             is_on_sale = COALESCE($16, is_on_sale),
             is_combo = COALESCE($17, is_combo),
             promo_type = $18,
             updated_at = now()
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.price_cents)
    .bind(input.original_price_cents)
    .bind(input.item_type.as_str())
    .bind(&input.image)
    .bind(input.rating)
    .bind(input.reviews_count)
    .bind(input.weekly_reviews)
    .bind(input.monthly_reviews)
    .bind(input.weekly_buys)
    .bind(input.monthly_buys)
    .bind(&input.tags)
    .bind(input.in_stock)
    .bind(input.is_on_sale)
    .bind(input.is_combo)
    .bind(input.promo_type.map(PromoType::as_str))
    .fetch_optional(pool)
    .await?
    .ok_or(MenuError::NotFound(id))?;

    info!(menu_item_id = %id, "menu item updated");
    Ok(item_from_row(&row))
}

/// # Errors
///
/// Returns `NotFound` if no item has this id.
pub async fn set_in_stock(pool: &PgPool, id: Uuid, in_stock: bool) -> Result<MenuItem, MenuError> {
    let row = sqlx::query(&format!(
        "UPDATE menu_items SET in_stock = $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(in_stock)
    .fetch_optional(pool)
    .await?
    .ok_or(MenuError::NotFound(id))?;
    info!(menu_item_id = %id, in_stock, "menu item stock toggled");
    Ok(item_from_row(&row))
}

/// Take an item off sale without deleting its order history.
///
/// # Errors
///
/// Returns `NotFound` if no item has this id.
pub async fn discontinue(pool: &PgPool, id: Uuid) -> Result<(), MenuError> {
    let result = sqlx::query(
        "UPDATE menu_items SET in_stock = FALSE, is_on_sale = FALSE, promo_type = NULL, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(MenuError::NotFound(id));
    }
    info!(menu_item_id = %id, "menu item discontinued");
    Ok(())
}

/// # Errors
///
/// Returns `NotFound` if no item has this id.
pub async fn delete_item(pool: &PgPool, id: Uuid) -> Result<(), MenuError> {
    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MenuError::NotFound(id));
    }
    info!(menu_item_id = %id, "menu item deleted");
    Ok(())
}

/// Bump weekly/monthly buy counters after an order completes.
pub(crate) async fn record_buys<'e, E>(executor: E, menu_item_id: Uuid, quantity: i32) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "UPDATE menu_items SET weekly_buys = weekly_buys + $2, monthly_buys = monthly_buys + $2 WHERE id = $1",
    )
    .bind(menu_item_id)
    .bind(quantity)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "menu_test.rs"]
mod tests;
