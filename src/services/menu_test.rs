use super::*;

fn input() -> MenuItemInput {
    MenuItemInput {
        name: "Nebula Latte".into(),
        description: "Oat milk latte with lavender".into(),
        price_cents: 550,
        original_price_cents: None,
        item_type: ItemType::Coffee,
        image: "/images/nebula-latte.jpg".into(),
        rating: Some(4.5),
        reviews_count: None,
        weekly_reviews: None,
        monthly_reviews: None,
        weekly_buys: None,
        monthly_buys: None,
        tags: vec!["hot".into()],
        in_stock: None,
        is_on_sale: None,
        is_combo: None,
        promo_type: None,
    }
}

// =============================================================================
// ItemType / PromoType / MenuSort
// =============================================================================

#[test]
fn item_type_parse_is_case_insensitive() {
    assert_eq!(ItemType::parse("coffee"), Some(ItemType::Coffee));
    assert_eq!(ItemType::parse(" PASTRIES "), Some(ItemType::Pastries));
    assert_eq!(ItemType::parse("tea"), None);
}

#[test]
fn item_type_as_str_round_trips() {
    for t in ItemType::ALL {
        assert_eq!(ItemType::parse(t.as_str()), Some(t));
    }
}

#[test]
fn promo_type_accepts_kebab_case() {
    assert_eq!(PromoType::parse("buy-one-get-one"), Some(PromoType::BuyOneGetOne));
    assert_eq!(PromoType::parse("HAPPY_HOUR"), Some(PromoType::HappyHour));
    assert_eq!(PromoType::parse("free"), None);
}

#[test]
fn promo_type_serializes_screaming_snake() {
    let json = serde_json::to_value(PromoType::SeasonalSpecial).unwrap();
    assert_eq!(json, "SEASONAL_SPECIAL");
}

#[test]
fn menu_sort_accepts_camel_and_snake() {
    assert_eq!(MenuSort::parse("weeklyBuys"), Some(MenuSort::WeeklyBuys));
    assert_eq!(MenuSort::parse("monthly_buys"), Some(MenuSort::MonthlyBuys));
    assert_eq!(MenuSort::parse("createdAt"), Some(MenuSort::CreatedAt));
    assert_eq!(MenuSort::parse("price; DROP TABLE"), None);
}

#[test]
fn menu_sort_maps_to_columns() {
    assert_eq!(MenuSort::Price.column(), "price_cents");
    assert_eq!(MenuSort::default().column(), "name");
}

// =============================================================================
// discount_percent
// =============================================================================

#[test]
fn discount_percent_rounds_to_whole_percent() {
    assert_eq!(discount_percent(450, Some(600)), Some(25));
    assert_eq!(discount_percent(999, Some(1499)), Some(33));
}

#[test]
fn discount_percent_none_without_markdown() {
    assert_eq!(discount_percent(500, None), None);
    assert_eq!(discount_percent(500, Some(500)), None);
    assert_eq!(discount_percent(600, Some(500)), None);
}

// =============================================================================
// validate_input
// =============================================================================

#[test]
fn validate_input_accepts_valid() {
    assert!(validate_input(&input()).is_ok());
}

#[test]
fn validate_input_rejects_short_name() {
    let mut i = input();
    i.name = "L".into();
    assert!(matches!(validate_input(&i), Err(MenuError::Validation(_))));
}

#[test]
fn validate_input_rejects_price_bounds() {
    let mut i = input();
    i.price_cents = 0;
    assert!(validate_input(&i).is_err());
    i.price_cents = MAX_PRICE_CENTS + 1;
    assert!(validate_input(&i).is_err());
}

#[test]
fn validate_input_rejects_bad_rating() {
    let mut i = input();
    i.rating = Some(5.5);
    assert!(validate_input(&i).is_err());
}

#[test]
fn validate_input_rejects_blank_description() {
    let mut i = input();
    i.description = "   ".into();
    assert!(validate_input(&i).is_err());
}

#[test]
fn menu_item_input_deserializes_minimal_body() {
    let body = r#"{"name":"Comet Croissant","description":"Buttery","price_cents":375,"item_type":"PASTRIES"}"#;
    let parsed: MenuItemInput = serde_json::from_str(body).unwrap();
    assert_eq!(parsed.item_type, ItemType::Pastries);
    assert!(parsed.tags.is_empty());
    assert!(parsed.in_stock.is_none());
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn create_toggle_discontinue_delete() {
    let state = crate::state::test_helpers::live_app_state().await;
    let item = create_item(&state.pool, &input()).await.unwrap();
    assert!(item.in_stock);

    let toggled = set_in_stock(&state.pool, item.id, false).await.unwrap();
    assert!(!toggled.in_stock);

    discontinue(&state.pool, item.id).await.unwrap();
    let fetched = get_item(&state.pool, item.id).await.unwrap();
    assert!(!fetched.in_stock);
    assert!(fetched.promo_type.is_none());

    delete_item(&state.pool, item.id).await.unwrap();
    assert!(matches!(get_item(&state.pool, item.id).await, Err(MenuError::NotFound(_))));
}
