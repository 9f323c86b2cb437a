//! Demo data for a fresh database.
//!
//! Runs only when `SEED_DEMO_DATA` is on and the catalogue is empty, so
//! restarting a seeded instance is a no-op.

use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::format::format_cents;
use crate::services::auth;
use crate::services::menu::{self, ItemType, MenuItemInput, PromoType};
use crate::services::session::generate_token;
use crate::services::stock::{self, StockCategory, StockInput};

pub const OWNER_EMAIL: &str = "owner@astrobrew.local";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("menu seed failed: {0}")]
    Menu(#[from] menu::MenuError),
    #[error("stock seed failed: {0}")]
    Stock(#[from] stock::StockError),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// (name, description, price, type, tags, promo)
type MenuSeed = (&'static str, &'static str, i64, ItemType, &'static [&'static str], Option<PromoType>);

pub const MENU: &[MenuSeed] = &[
    ("Milky Way", "Velvety latte with vanilla and a dusting of cinnamon", 399, ItemType::Coffee, &["hot", "milk"], None),
    ("Dark Matter", "Double-shot espresso over dark chocolate", 525, ItemType::Coffee, &["strong"], None),
    ("Cormas Nebula", "Cold brew with lavender cream", 475, ItemType::Coffee, &["iced"], Some(PromoType::SeasonalSpecial)),
    ("Cosmos Blend", "House pour-over of the week", 550, ItemType::Coffee, &["filter"], None),
    ("Starlight Latte", "Honey oat latte", 425, ItemType::Coffee, &["hot", "oat"], Some(PromoType::HappyHour)),
    ("Meteor Brownie", "Fudge brownie with sea salt", 325, ItemType::Pastries, &["chocolate"], None),
    ("Cosmic Croissant", "All-butter croissant", 275, ItemType::Pastries, &["butter"], None),
    ("Galaxy Green Tea", "Sencha with citrus peel", 350, ItemType::Drinks, &["tea"], None),
    ("Orbit Bowl", "Roasted vegetables over quinoa", 895, ItemType::Vegetarian, &["lunch"], None),
    ("Launch Combo", "Any coffee with a croissant", 599, ItemType::Combo, &["deal"], Some(PromoType::FixedAmountDiscount)),
];

/// (name, category, qty, threshold, unit, supplier, cost)
type StockSeed = (&'static str, StockCategory, f64, f64, &'static str, &'static str, i64);

pub const STOCK: &[StockSeed] = &[
    ("Espresso Beans", StockCategory::Beans, 18.0, 5.0, "kg", "Orbit Roasters", 2400),
    ("Whole Milk", StockCategory::Milk, 12.0, 10.0, "L", "Moon Dairy", 120),
    ("Oat Milk", StockCategory::Milk, 4.0, 6.0, "L", "Moon Dairy", 260),
    ("Vanilla Syrup", StockCategory::Syrups, 3.0, 2.0, "bottle", "Nebula Syrups", 900),
    ("Croissant Dough", StockCategory::Pastries, 40.0, 15.0, "pcs", "Comet Bakery", 85),
    ("Paper Cups 12oz", StockCategory::Supplies, 600.0, 200.0, "pcs", "Cup Supply Co", 6),
    ("Cocoa Powder", StockCategory::Ingredients, 2.2, 2.0, "kg", "Nebula Syrups", 1500),
];

/// Insert demo rows if the catalogue is empty. Returns whether anything was seeded.
///
/// # Errors
///
/// Returns the first failing insert.
pub async fn seed_if_empty(pool: &PgPool, stock_warning_multiple: f64) -> Result<bool, SeedError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(existing, "catalogue already populated; skipping demo seed");
        return Ok(false);
    }

    for &(name, description, price_cents, item_type, tags, promo_type) in MENU {
        debug!(name, price = %format_cents(price_cents), "seeding menu item");
        menu::create_item(
            pool,
            &MenuItemInput {
                name: name.to_owned(),
                description: description.to_owned(),
                price_cents,
                original_price_cents: promo_type.map(|_| price_cents + 100),
                item_type,
                image: format!("/images/menu/{}.jpg", name.to_ascii_lowercase().replace(' ', "-")),
                rating: Some(4.5),
                reviews_count: None,
                weekly_reviews: None,
                monthly_reviews: None,
                weekly_buys: None,
                monthly_buys: None,
                tags: tags.iter().map(|t| (*t).to_owned()).collect(),
                in_stock: Some(true),
                is_on_sale: Some(promo_type.is_some()),
                is_combo: Some(item_type == ItemType::Combo),
                promo_type,
            },
        )
        .await?;
    }

    for &(name, category, current_qty, threshold, unit, supplier, cost_cents) in STOCK {
        stock::create_item(
            pool,
            &StockInput {
                name: name.to_owned(),
                category,
                current_qty,
                threshold,
                unit: unit.to_owned(),
                supplier: supplier.to_owned(),
                cost_cents,
            },
            stock_warning_multiple,
        )
        .await?;
    }

    let owner_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'owner')")
        .fetch_one(pool)
        .await?;
    if !owner_exists {
        let password = generate_token()[..16].to_owned();
        sqlx::query(
            "INSERT INTO users (first_name, last_name, username, email, password_hash, role)
             VALUES ('Astro', 'Owner', 'owner', $1, $2, 'owner')",
        )
        .bind(OWNER_EMAIL)
        .bind(auth::hash_password(&password)?)
        .execute(pool)
        .await?;
        warn!(email = OWNER_EMAIL, %password, "seeded owner account; change this password");
    }

    info!(menu_items = MENU.len(), stock_items = STOCK.len(), "demo data seeded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_seed_passes_validation() {
        for &(name, description, price_cents, item_type, _, _) in MENU {
            let input = MenuItemInput {
                name: name.into(),
                description: description.into(),
                price_cents,
                original_price_cents: None,
                item_type,
                image: String::new(),
                rating: None,
                reviews_count: None,
                weekly_reviews: None,
                monthly_reviews: None,
                weekly_buys: None,
                monthly_buys: None,
                tags: vec![],
                in_stock: None,
                is_on_sale: None,
                is_combo: None,
                promo_type: None,
            };
            assert!(menu::validate_input(&input).is_ok(), "{name} should validate");
        }
    }

    #[test]
    fn stock_seed_passes_validation() {
        for &(name, category, current_qty, threshold, unit, supplier, cost_cents) in STOCK {
            let input = StockInput {
                name: name.into(),
                category,
                current_qty,
                threshold,
                unit: unit.into(),
                supplier: supplier.into(),
                cost_cents,
            };
            assert!(stock::validate_input(&input).is_ok(), "{name} should validate");
        }
    }

    #[test]
    fn stock_seed_includes_a_low_item() {
        assert!(STOCK.iter().any(|&(_, _, qty, threshold, ..)| qty <= threshold));
    }
}
