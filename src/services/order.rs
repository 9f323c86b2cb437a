//! Order placement, queue management and completion.
//!
//! DESIGN
//! ======
//! An order carries an ordered list of status flags (see `order_status`).
//! Staff move orders between primary states with `advance`, mark secondary
//! conditions with `toggle_flag`, and finish with `complete`, which collapses
//! the list to `[COMPLETE]`.
//!
//! Prices are copied from the catalogue at placement time; later menu edits
//! never rewrite existing orders. Queue numbers restart at 1 every day and
//! are allocated under a transaction-scoped advisory lock.
//!
//! SIDE EFFECTS
//! ============
//! Status changes lock the order row (`FOR UPDATE`) for the read-modify-write.
//! Completion runs in one transaction: the order row, the menu buy counters,
//! the customer's purchase history row and their loyalty points all commit
//! together or not at all. Closed orders (complete or cancelled) are never
//! completed again, so points are credited once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::order_status::{OrderFilter, OrderSort, OrderStatus, StatusError, StatusFlag};
use crate::services::menu::{self, ItemType};
use crate::services::page::{Page, PageRequest};

pub const MAX_LINES: usize = 20;
pub const MAX_QUANTITY: i32 = 10;
pub const MAX_INSTRUCTIONS: usize = 200;
pub const MAX_NOTES: usize = 500;
pub const PREP_ESTIMATE_MINUTES: i64 = 10;
/// Upper bound for staff-entered tax or discount on one order.
pub const MAX_ADJUSTMENT_CENTS: i64 = 1_000_000;

/// Serializes queue-number allocation across concurrent placements.
const QUEUE_LOCK_KEY: i64 = 0x6173_7472_6f00_0001;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    NotFound(Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("menu item not found: {0}")]
    UnknownMenuItem(Uuid),
    #[error("menu item is out of stock: {0}")]
    OutOfStock(String),
    #[error("order is already closed: {0}")]
    Closed(Uuid),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    DigitalWallet,
    Points,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] =
        [Self::Cash, Self::CreditCard, Self::DebitCard, Self::DigitalWallet, Self::Points, Self::BankTransfer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::CreditCard => "CREDIT_CARD",
            Self::DebitCard => "DEBIT_CARD",
            Self::DigitalWallet => "DIGITAL_WALLET",
            Self::Points => "POINTS",
            Self::BankTransfer => "BANK_TRANSFER",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL.into_iter().find(|m| m.as_str() == upper)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub menu_item_id: Option<Uuid>,
    pub menu_item_name: String,
    pub item_type: ItemType,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub queue_number: i32,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub items: Vec<OrderLine>,
    pub items_count: i64,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub assigned_to: Option<Uuid>,
    pub completed_by: Option<Uuid>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub placed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub estimated_ready: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ready_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderLine {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_id: Option<Uuid>,
    pub items: Vec<NewOrderLine>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// Full status replacement as sent by the front desk.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// `ORD-<unix millis>`.
#[must_use]
pub fn order_number(at: OffsetDateTime) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("ORD-{millis}")
}

/// `subtotal = Σ unit × qty`, `total = subtotal + tax - discount`.
///
/// # Errors
///
/// Returns `Validation` when the arithmetic overflows or the discount is
/// larger than `subtotal + tax`.
pub fn compute_totals(lines: &[(i64, i32)], tax_cents: i64, discount_cents: i64) -> Result<Totals, OrderError> {
    let out_of_range = || OrderError::Validation("order total is out of range".into());
    let subtotal_cents = lines
        .iter()
        .try_fold(0i64, |acc, (unit, qty)| unit.checked_mul(i64::from(*qty)).and_then(|s| acc.checked_add(s)))
        .ok_or_else(out_of_range)?;
    let gross = subtotal_cents.checked_add(tax_cents).ok_or_else(out_of_range)?;
    if discount_cents > gross {
        return Err(OrderError::Validation("discount exceeds order total".into()));
    }
    Ok(Totals { subtotal_cents, tax_cents, discount_cents, total_cents: gross - discount_cents })
}

/// Whole dollars of the total times the per-dollar rate; never negative.
#[must_use]
pub fn loyalty_points(total_cents: i64, points_per_dollar: i64) -> i64 {
    (total_cents.max(0) / 100) * points_per_dollar.max(0)
}

/// SQL predicate for a list filter over the `status` array column.
#[must_use]
pub fn filter_clause(filter: OrderFilter) -> Option<&'static str> {
    match filter {
        OrderFilter::All => None,
        OrderFilter::Active => Some("NOT ('COMPLETE' = ANY(status) OR 'CANCELLED' = ANY(status))"),
        OrderFilter::Pending => Some("'PENDING' = ANY(status)"),
        OrderFilter::InProgress => Some("'IN_PROGRESS' = ANY(status)"),
        OrderFilter::Ready => Some("'READY' = ANY(status)"),
        OrderFilter::Complete => Some("'COMPLETE' = ANY(status)"),
        OrderFilter::Problems => Some("'HAS_PROBLEM' = ANY(status)"),
    }
}

/// # Errors
///
/// Returns `Validation` describing the first offending field.
pub fn validate_new_order(order: &NewOrder) -> Result<(), OrderError> {
    let name_len = order.customer_name.trim().chars().count();
    if !(2..=100).contains(&name_len) {
        return Err(OrderError::Validation("customer name must be between 2 and 100 characters".into()));
    }
    if order.items.is_empty() || order.items.len() > MAX_LINES {
        return Err(OrderError::Validation(format!("an order needs between 1 and {MAX_LINES} items")));
    }
    for line in &order.items {
        if !(1..=MAX_QUANTITY).contains(&line.quantity) {
            return Err(OrderError::Validation(format!("quantity must be between 1 and {MAX_QUANTITY}")));
        }
        if line
            .special_instructions
            .as_deref()
            .is_some_and(|s| s.chars().count() > MAX_INSTRUCTIONS)
        {
            return Err(OrderError::Validation(format!(
                "special instructions must not exceed {MAX_INSTRUCTIONS} characters"
            )));
        }
    }
    if order.notes.as_deref().is_some_and(|n| n.chars().count() > MAX_NOTES) {
        return Err(OrderError::Validation(format!("notes must not exceed {MAX_NOTES} characters")));
    }
    if order.tax_cents < 0 || order.discount_cents < 0 {
        return Err(OrderError::Validation("tax and discount cannot be negative".into()));
    }
    if order.tax_cents > MAX_ADJUSTMENT_CENTS || order.discount_cents > MAX_ADJUSTMENT_CENTS {
        return Err(OrderError::Validation(format!(
            "tax and discount must not exceed {MAX_ADJUSTMENT_CENTS} cents"
        )));
    }
    Ok(())
}

// =============================================================================
// LOADING
// =============================================================================

const COLUMNS: &str = "id, order_number, queue_number, customer_id, customer_name, subtotal_cents, discount_cents, \
     tax_cents, total_cents, status, payment_method, assigned_to, completed_by, notes, placed_at, estimated_ready, \
     ready_at, completed_at";

fn order_from_row(row: &sqlx::postgres::PgRow, items: Vec<OrderLine>) -> Result<Order, OrderError> {
    let status: Vec<String> = row.get("status");
    let payment: Option<String> = row.get("payment_method");
    Ok(Order {
        id: row.get("id"),
        order_number: row.get("order_number"),
        queue_number: row.get("queue_number"),
        customer_id: row.get("customer_id"),
        customer_name: row.get("customer_name"),
        items_count: items.iter().map(|l| i64::from(l.quantity)).sum(),
        items,
        subtotal_cents: row.get("subtotal_cents"),
        discount_cents: row.get("discount_cents"),
        tax_cents: row.get("tax_cents"),
        total_cents: row.get("total_cents"),
        status: OrderStatus::from_strings(&status)?,
        payment_method: payment.as_deref().and_then(PaymentMethod::parse),
        assigned_to: row.get("assigned_to"),
        completed_by: row.get("completed_by"),
        notes: row.get("notes"),
        placed_at: row.get("placed_at"),
        estimated_ready: row.get("estimated_ready"),
        ready_at: row.get("ready_at"),
        completed_at: row.get("completed_at"),
    })
}

async fn load_lines<'e, E>(executor: E, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderLine>>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query(
        "SELECT id, order_id, menu_item_id, menu_item_name, item_type, quantity, unit_price_cents, subtotal_cents,
                special_instructions
         FROM order_items
         WHERE order_id = ANY($1)
         ORDER BY order_id, position",
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for row in rows {
        let item_type: String = row.get("item_type");
        by_order.entry(row.get("order_id")).or_default().push(OrderLine {
            id: row.get("id"),
            menu_item_id: row.get("menu_item_id"),
            menu_item_name: row.get("menu_item_name"),
            item_type: ItemType::parse(&item_type).unwrap_or(ItemType::Coffee),
            quantity: row.get("quantity"),
            unit_price_cents: row.get("unit_price_cents"),
            subtotal_cents: row.get("subtotal_cents"),
            special_instructions: row.get("special_instructions"),
        });
    }
    Ok(by_order)
}

async fn hydrate(pool: &PgPool, rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Order>, OrderError> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
    let mut lines = load_lines(pool, &ids).await?;
    rows.iter()
        .map(|row| {
            let id: Uuid = row.get("id");
            order_from_row(row, lines.remove(&id).unwrap_or_default())
        })
        .collect()
}

/// # Errors
///
/// Returns `NotFound` if no order has this id.
pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<Order, OrderError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(OrderError::NotFound(id))?;
    hydrate(pool, vec![row]).await?.pop().ok_or(OrderError::NotFound(id))
}

/// Queue listing for staff.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_orders(pool: &PgPool, filter: OrderFilter, sort: OrderSort) -> Result<Vec<Order>, OrderError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM orders"));
    if let Some(clause) = filter_clause(filter) {
        qb.push(" WHERE ").push(clause);
    }
    qb.push(" ORDER BY ").push(sort.order_by());
    let rows = qb.build().fetch_all(pool).await?;
    hydrate(pool, rows).await
}

/// A customer's own orders, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_customer(pool: &PgPool, customer_id: Uuid, page: PageRequest) -> Result<Page<Order>, OrderError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY placed_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(customer_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok(Page::new(hydrate(pool, rows).await?, page, total))
}

/// Orders a staff member is working on or has completed.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_staff(pool: &PgPool, staff_id: Uuid, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM orders WHERE (assigned_to = "));
    qb.push_bind(staff_id).push(" OR completed_by = ").push_bind(staff_id).push(")");
    if let Some(clause) = filter_clause(filter) {
        qb.push(" AND ").push(clause);
    }
    qb.push(" ORDER BY placed_at DESC");
    let rows = qb.build().fetch_all(pool).await?;
    hydrate(pool, rows).await
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Place an order. Prices and names come from the catalogue.
///
/// # Errors
///
/// Returns `Validation`, `UnknownMenuItem`, `OutOfStock`, or a database error.
pub async fn place_order(pool: &PgPool, new: &NewOrder) -> Result<Order, OrderError> {
    validate_new_order(new)?;

    let ids: Vec<Uuid> = new.items.iter().map(|l| l.menu_item_id).collect();
    let catalogue: HashMap<Uuid, menu::MenuItem> =
        menu::get_items(pool, &ids).await?.into_iter().map(|m| (m.id, m)).collect();

    let mut priced = Vec::with_capacity(new.items.len());
    for line in &new.items {
        let item = catalogue
            .get(&line.menu_item_id)
            .ok_or(OrderError::UnknownMenuItem(line.menu_item_id))?;
        if !item.in_stock {
            return Err(OrderError::OutOfStock(item.name.clone()));
        }
        priced.push((line, item));
    }

    let price_qty: Vec<(i64, i32)> = priced.iter().map(|(l, m)| (m.price_cents, l.quantity)).collect();
    let totals = compute_totals(&price_qty, new.tax_cents, new.discount_cents)?;

    let placed_at = OffsetDateTime::now_utc();
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(QUEUE_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let queue_number: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(queue_number), 0) + 1 FROM orders WHERE placed_at::date = CURRENT_DATE",
    )
    .fetch_one(&mut *tx)
    .await?;

    let mut number_at = placed_at;
    let number = loop {
        let candidate = order_number(number_at);
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
            .bind(&candidate)
            .fetch_one(&mut *tx)
            .await?;
        if !taken {
            break candidate;
        }
        number_at += Duration::milliseconds(1);
    };

    let order_id: Uuid = sqlx::query_scalar(
        "INSERT INTO orders (order_number, queue_number, customer_id, customer_name, subtotal_cents,
             discount_cents, tax_cents, total_cents, status, payment_method, notes, placed_at, estimated_ready)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING id",
    )
    .bind(&number)
    .bind(queue_number)
    .bind(new.customer_id)
    .bind(new.customer_name.trim())
    .bind(totals.subtotal_cents)
    .bind(totals.discount_cents)
    .bind(totals.tax_cents)
    .bind(totals.total_cents)
    .bind(OrderStatus::pending().to_strings())
    .bind(new.payment_method.map(PaymentMethod::as_str))
    .bind(new.notes.as_deref())
    .bind(placed_at)
    .bind(placed_at + Duration::minutes(PREP_ESTIMATE_MINUTES))
    .fetch_one(&mut *tx)
    .await?;

    for (position, (line, item)) in (0i32..).zip(&priced) {
        sqlx::query(
            "INSERT INTO order_items (order_id, menu_item_id, menu_item_name, item_type, quantity,
                 unit_price_cents, subtotal_cents, special_instructions, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order_id)
        .bind(item.id)
        .bind(&item.name)
        .bind(item.item_type.as_str())
        .bind(line.quantity)
        .bind(item.price_cents)
        .bind(item.price_cents * i64::from(line.quantity))
        .bind(line.special_instructions.as_deref())
        .bind(position)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(%order_id, order_number = %number, queue_number, total_cents = totals.total_cents, "order placed");
    get_order(pool, order_id).await
}

// =============================================================================
// STATUS CHANGES
// =============================================================================

/// Lock the order row until the surrounding transaction ends and return its status.
async fn lock_status(conn: &mut PgConnection, id: Uuid) -> Result<OrderStatus, OrderError> {
    let raw: Vec<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(OrderError::NotFound(id))?;
    Ok(OrderStatus::from_strings(&raw)?)
}

/// Move an open order to a new primary state, keeping secondary flags.
/// The acting staff member becomes the assignee; `READY` stamps `ready_at`.
///
/// # Errors
///
/// Returns `Validation` when asked to advance to a secondary flag or to
/// `COMPLETE` (use `complete`), `Closed` for finished orders, or `NotFound`.
pub async fn advance(pool: &PgPool, id: Uuid, primary: StatusFlag, actor: Uuid) -> Result<Order, OrderError> {
    if !primary.is_primary() {
        return Err(OrderError::Validation(format!("{primary} is not a primary status")));
    }
    if primary == StatusFlag::Complete {
        return Err(OrderError::Validation("use the complete action to finish an order".into()));
    }

    let mut tx = pool.begin().await?;
    let status = lock_status(&mut *tx, id).await?;
    if !status.is_active() {
        return Err(OrderError::Closed(id));
    }
    let next = status.with_primary(primary);

    sqlx::query(
        "UPDATE orders SET status = $2, assigned_to = $3,
             ready_at = CASE WHEN $4 THEN now() ELSE ready_at END,
             updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(next.to_strings())
    .bind(actor)
    .bind(primary == StatusFlag::Ready)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(order_id = %id, status = ?next.to_strings(), %actor, "order advanced");
    get_order(pool, id).await
}

/// Add or remove a secondary flag.
///
/// # Errors
///
/// Returns `Status(NotToggleable)` for primary flags or `NotFound`.
pub async fn toggle_flag(pool: &PgPool, id: Uuid, flag: StatusFlag) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;
    let next = lock_status(&mut *tx, id).await?.toggle(flag)?;
    sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(next.to_strings())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(order_id = %id, %flag, status = ?next.to_strings(), "order flag toggled");
    get_order(pool, id).await
}

/// Replace the whole status list. A list containing `COMPLETE` goes through
/// `complete` so its side effects still apply.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub async fn replace_status(
    pool: &PgPool,
    id: Uuid,
    update: &StatusUpdate,
    actor: Uuid,
    points_per_dollar: i64,
) -> Result<Order, OrderError> {
    if update.notes.as_deref().is_some_and(|n| n.chars().count() > MAX_NOTES) {
        return Err(OrderError::Validation(format!("notes must not exceed {MAX_NOTES} characters")));
    }
    if update.status.has(StatusFlag::Complete) {
        return finish(pool, id, actor, points_per_dollar, update.notes.as_deref()).await;
    }

    let ready = update.status.has(StatusFlag::Ready);
    let result = sqlx::query(
        "UPDATE orders SET status = $2,
             assigned_to = COALESCE($3, assigned_to),
             notes = COALESCE($4, notes),
             ready_at = CASE WHEN $5 AND ready_at IS NULL THEN now() ELSE ready_at END,
             updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.status.to_strings())
    .bind(update.assigned_to)
    .bind(update.notes.as_deref())
    .bind(ready)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(OrderError::NotFound(id));
    }
    info!(order_id = %id, status = ?update.status.to_strings(), %actor, "order status replaced");
    get_order(pool, id).await
}

/// Finish an order: status becomes `[COMPLETE]`, `completed_by` is recorded,
/// buy counters are bumped and, for registered customers, a purchase history
/// row is written and loyalty points credited.
///
/// # Errors
///
/// Returns `Closed` if already complete or cancelled, `NotFound`, or a
/// database error.
pub async fn complete(pool: &PgPool, id: Uuid, completed_by: Uuid, points_per_dollar: i64) -> Result<Order, OrderError> {
    finish(pool, id, completed_by, points_per_dollar, None).await
}

/// The row stays locked from the status check to commit, so a second
/// completion waits and then sees `[COMPLETE]`.
async fn finish(
    pool: &PgPool,
    id: Uuid,
    completed_by: Uuid,
    points_per_dollar: i64,
    notes: Option<&str>,
) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OrderError::NotFound(id))?;
    let lines = load_lines(&mut *tx, &[id]).await?.remove(&id).unwrap_or_default();
    let order = order_from_row(&row, lines)?;
    if !order.status.is_active() {
        return Err(OrderError::Closed(id));
    }
    let notes = notes.or(order.notes.as_deref());
    let points = loyalty_points(order.total_cents, points_per_dollar);

    sqlx::query(
        "UPDATE orders SET status = $2, completed_by = $3, completed_at = now(),
             ready_at = COALESCE(ready_at, now()), notes = $4, updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(OrderStatus::completed().to_strings())
    .bind(completed_by)
    .bind(notes)
    .execute(&mut *tx)
    .await?;

    for line in &order.items {
        if let Some(menu_item_id) = line.menu_item_id {
            menu::record_buys(&mut *tx, menu_item_id, line.quantity).await?;
        }
    }

    let mut credited = 0;
    if let Some(customer_id) = order.customer_id {
        let inserted = sqlx::query(
            "INSERT INTO purchase_history (customer_id, order_id, order_number, total_cents, items_count,
                 order_date, status, payment_method, notes, discount_cents, points_earned, points_used)
             VALUES ($1, $2, $3, $4, $5, $6, 'COMPLETE', $7, $8, $9, $10, 0)
             ON CONFLICT (order_number) DO NOTHING",
        )
        .bind(customer_id)
        .bind(id)
        .bind(&order.order_number)
        .bind(order.total_cents)
        .bind(i32::try_from(order.items_count).unwrap_or(i32::MAX))
        .bind(order.placed_at)
        .bind(order.payment_method.map(PaymentMethod::as_str))
        .bind(notes)
        .bind(order.discount_cents)
        .bind(points)
        .execute(&mut *tx)
        .await?;

        // Points follow the history row: no row, no credit.
        if inserted.rows_affected() == 1 {
            sqlx::query("UPDATE users SET points = points + $2, updated_at = now() WHERE id = $1")
                .bind(customer_id)
                .bind(points)
                .execute(&mut *tx)
                .await?;
            credited = points;
        }
    }
    tx.commit().await?;

    info!(order_id = %id, %completed_by, points = credited, "order completed");
    get_order(pool, id).await
}

#[cfg(test)]
#[path = "order_test.rs"]
mod tests;
