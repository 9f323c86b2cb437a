use super::*;
use time::macros::datetime;

fn line(quantity: i32) -> NewOrderLine {
    NewOrderLine { menu_item_id: Uuid::new_v4(), quantity, special_instructions: None }
}

fn new_order() -> NewOrder {
    NewOrder {
        customer_name: "Luna".into(),
        customer_id: None,
        items: vec![line(2)],
        notes: None,
        payment_method: Some(PaymentMethod::Cash),
        tax_cents: 0,
        discount_cents: 0,
    }
}

// =============================================================================
// order_number / totals / points
// =============================================================================

#[test]
fn order_number_uses_unix_millis() {
    let at = datetime!(2025-08-18 08:30:00.123 UTC);
    assert_eq!(order_number(at), "ORD-1755505800123");
}

#[test]
fn compute_totals_sums_lines_and_adjusts() {
    let totals = compute_totals(&[(450, 2), (375, 1)], 100, 200).unwrap();
    assert_eq!(totals.subtotal_cents, 1275);
    assert_eq!(totals.total_cents, 1175);
}

#[test]
fn compute_totals_empty_is_zero() {
    let totals = compute_totals(&[], 0, 0).unwrap();
    assert_eq!(totals.total_cents, 0);
}

#[test]
fn compute_totals_discount_may_cover_but_not_exceed_total() {
    assert_eq!(compute_totals(&[(650, 2)], 0, 1300).unwrap().total_cents, 0);
    assert!(matches!(compute_totals(&[(650, 2)], 0, 1301), Err(OrderError::Validation(_))));
    assert_eq!(compute_totals(&[(650, 2)], 100, 1400).unwrap().total_cents, 0);
}

#[test]
fn compute_totals_overflow_is_a_validation_error() {
    assert!(matches!(compute_totals(&[(650, 2)], i64::MAX, 0), Err(OrderError::Validation(_))));
    assert!(matches!(compute_totals(&[(i64::MAX, 2)], 0, 0), Err(OrderError::Validation(_))));
    assert!(matches!(compute_totals(&[(i64::MAX, 1), (1, 1)], 0, 0), Err(OrderError::Validation(_))));
}

#[test]
fn loyalty_points_floor_whole_dollars() {
    assert_eq!(loyalty_points(1073, 1), 10);
    assert_eq!(loyalty_points(1073, 3), 30);
    assert_eq!(loyalty_points(99, 1), 0);
    assert_eq!(loyalty_points(-500, 1), 0);
}

// =============================================================================
// filter_clause
// =============================================================================

#[test]
fn filter_clause_all_has_no_predicate() {
    assert_eq!(filter_clause(OrderFilter::All), None);
}

#[test]
fn filter_clause_active_excludes_closed() {
    let clause = filter_clause(OrderFilter::Active).unwrap();
    assert!(clause.contains("COMPLETE"));
    assert!(clause.contains("CANCELLED"));
    assert!(clause.starts_with("NOT"));
}

#[test]
fn filter_clause_problems_checks_flag() {
    assert_eq!(filter_clause(OrderFilter::Problems), Some("'HAS_PROBLEM' = ANY(status)"));
}

// =============================================================================
// PaymentMethod
// =============================================================================

#[test]
fn payment_method_parse_variants() {
    assert_eq!(PaymentMethod::parse("credit-card"), Some(PaymentMethod::CreditCard));
    assert_eq!(PaymentMethod::parse("DIGITAL_WALLET"), Some(PaymentMethod::DigitalWallet));
    assert_eq!(PaymentMethod::parse("barter"), None);
}

// =============================================================================
// validate_new_order
// =============================================================================

#[test]
fn validate_accepts_valid_order() {
    assert!(validate_new_order(&new_order()).is_ok());
}

#[test]
fn validate_rejects_short_customer_name() {
    let mut o = new_order();
    o.customer_name = " L ".into();
    assert!(matches!(validate_new_order(&o), Err(OrderError::Validation(_))));
}

#[test]
fn validate_rejects_empty_and_oversized_orders() {
    let mut o = new_order();
    o.items.clear();
    assert!(validate_new_order(&o).is_err());
    o.items = (0..=MAX_LINES).map(|_| line(1)).collect();
    assert!(validate_new_order(&o).is_err());
    o.items.truncate(MAX_LINES);
    assert!(validate_new_order(&o).is_ok());
}

#[test]
fn validate_rejects_quantity_out_of_range() {
    let mut o = new_order();
    o.items = vec![line(0)];
    assert!(validate_new_order(&o).is_err());
    o.items = vec![line(MAX_QUANTITY + 1)];
    assert!(validate_new_order(&o).is_err());
    o.items = vec![line(MAX_QUANTITY)];
    assert!(validate_new_order(&o).is_ok());
}

#[test]
fn validate_rejects_long_instructions_and_notes() {
    let mut o = new_order();
    o.items[0].special_instructions = Some("x".repeat(MAX_INSTRUCTIONS + 1));
    assert!(validate_new_order(&o).is_err());

    let mut o = new_order();
    o.notes = Some("n".repeat(MAX_NOTES + 1));
    assert!(validate_new_order(&o).is_err());
}

#[test]
fn validate_rejects_negative_adjustments() {
    let mut o = new_order();
    o.discount_cents = -1;
    assert!(validate_new_order(&o).is_err());
}

#[test]
fn validate_caps_adjustments() {
    let mut o = new_order();
    o.tax_cents = i64::MAX;
    assert!(matches!(validate_new_order(&o), Err(OrderError::Validation(_))));

    let mut o = new_order();
    o.discount_cents = MAX_ADJUSTMENT_CENTS + 1;
    assert!(validate_new_order(&o).is_err());
    o.discount_cents = MAX_ADJUSTMENT_CENTS;
    assert!(validate_new_order(&o).is_ok());
}

#[test]
fn status_update_rejects_empty_status() {
    let body = r#"{"status":[]}"#;
    assert!(serde_json::from_str::<StatusUpdate>(body).is_err());
}

#[test]
fn status_update_parses_flags() {
    let body = r#"{"status":["READY","DELAYED"],"notes":"oat milk ran out"}"#;
    let update: StatusUpdate = serde_json::from_str(body).unwrap();
    assert_eq!(update.status.primary(), Some(StatusFlag::Ready));
    assert!(update.status.has(StatusFlag::Delayed));
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
async fn seed_item_and_customer(pool: &PgPool) -> (Uuid, Uuid) {
    use crate::services::menu::{MenuItemInput, create_item};

    let item = create_item(
        pool,
        &MenuItemInput {
            name: "Orbit Mocha".into(),
            description: "Chocolate espresso".into(),
            price_cents: 650,
            original_price_cents: None,
            item_type: ItemType::Coffee,
            image: String::new(),
            rating: None,
            reviews_count: None,
            weekly_reviews: None,
            monthly_reviews: None,
            weekly_buys: None,
            monthly_buys: None,
            tags: vec![],
            in_stock: Some(true),
            is_on_sale: None,
            is_combo: None,
            promo_type: None,
        },
    )
    .await
    .unwrap();

    let email = format!("order-{}@astrobrew.test", Uuid::new_v4().simple());
    let customer: Uuid = sqlx::query_scalar(
        "INSERT INTO users (first_name, username, email, password_hash) VALUES ('Luna', $1, $1, 'x') RETURNING id",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap();
    (item.id, customer)
}

#[cfg(feature = "live-db-tests")]
async fn place_for(pool: &PgPool, item: Uuid, customer: Uuid) -> Order {
    let mut o = new_order();
    o.customer_id = Some(customer);
    o.items = vec![NewOrderLine { menu_item_id: item, quantity: 2, special_instructions: None }];
    place_order(pool, &o).await.unwrap()
}

#[cfg(feature = "live-db-tests")]
async fn points_of(pool: &PgPool, customer: Uuid) -> i64 {
    sqlx::query_scalar("SELECT points FROM users WHERE id = $1")
        .bind(customer)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[cfg(feature = "live-db-tests")]
async fn history_rows(pool: &PgPool, order_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM purchase_history WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn place_advance_complete_credits_points_once() {
    let state = crate::state::test_helpers::live_app_state().await;
    let (item, customer) = seed_item_and_customer(&state.pool).await;

    let placed = place_for(&state.pool, item, customer).await;
    assert_eq!(placed.total_cents, 1300);
    assert_eq!(placed.status, OrderStatus::pending());
    assert!(placed.queue_number >= 1);

    let ready = advance(&state.pool, placed.id, StatusFlag::Ready, customer).await.unwrap();
    assert!(ready.ready_at.is_some());

    let done = complete(&state.pool, placed.id, customer, 1).await.unwrap();
    assert_eq!(done.status, OrderStatus::completed());
    assert_eq!(done.completed_by, Some(customer));
    assert_eq!(points_of(&state.pool, customer).await, 13);

    assert!(matches!(complete(&state.pool, placed.id, customer, 1).await, Err(OrderError::Closed(_))));
    assert_eq!(points_of(&state.pool, customer).await, 13);
    assert_eq!(history_rows(&state.pool, placed.id).await, 1);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn concurrent_completions_credit_points_once() {
    let state = crate::state::test_helpers::live_app_state().await;
    let (item, customer) = seed_item_and_customer(&state.pool).await;
    let placed = place_for(&state.pool, item, customer).await;

    let (a, b) = tokio::join!(
        complete(&state.pool, placed.id, customer, 1),
        complete(&state.pool, placed.id, customer, 1)
    );
    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    assert!(matches!(a.err().or(b.err()), Some(OrderError::Closed(_))));
    assert_eq!(points_of(&state.pool, customer).await, 13);
    assert_eq!(history_rows(&state.pool, placed.id).await, 1);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn cancelled_order_cannot_be_completed() {
    let state = crate::state::test_helpers::live_app_state().await;
    let (item, customer) = seed_item_and_customer(&state.pool).await;
    let placed = place_for(&state.pool, item, customer).await;

    let cancel = StatusUpdate {
        status: OrderStatus::from_flags(vec![StatusFlag::Pending, StatusFlag::Cancelled]).unwrap(),
        assigned_to: None,
        notes: None,
    };
    replace_status(&state.pool, placed.id, &cancel, customer, 1).await.unwrap();

    assert!(matches!(complete(&state.pool, placed.id, customer, 1).await, Err(OrderError::Closed(_))));
    assert_eq!(points_of(&state.pool, customer).await, 0);
    assert_eq!(history_rows(&state.pool, placed.id).await, 0);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn failed_completion_leaves_notes_untouched() {
    let state = crate::state::test_helpers::live_app_state().await;
    let (item, customer) = seed_item_and_customer(&state.pool).await;
    let placed = place_for(&state.pool, item, customer).await;
    complete(&state.pool, placed.id, customer, 1).await.unwrap();

    let again = StatusUpdate {
        status: OrderStatus::completed(),
        assigned_to: None,
        notes: Some("rewritten after the fact".into()),
    };
    let result = replace_status(&state.pool, placed.id, &again, customer, 1).await;
    assert!(matches!(result, Err(OrderError::Closed(_))));
    assert_eq!(get_order(&state.pool, placed.id).await.unwrap().notes, None);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn concurrent_toggle_and_advance_keep_both_changes() {
    let state = crate::state::test_helpers::live_app_state().await;
    let (item, customer) = seed_item_and_customer(&state.pool).await;
    let placed = place_for(&state.pool, item, customer).await;

    let (advanced, toggled) = tokio::join!(
        advance(&state.pool, placed.id, StatusFlag::InProgress, customer),
        toggle_flag(&state.pool, placed.id, StatusFlag::Delayed)
    );
    advanced.unwrap();
    toggled.unwrap();

    let status = get_order(&state.pool, placed.id).await.unwrap().status;
    assert_eq!(status.primary(), Some(StatusFlag::InProgress));
    assert!(status.has(StatusFlag::Delayed));
}
