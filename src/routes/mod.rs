//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Two API trees share one Axum router. `/api/v1/expose/**` needs no
//! session (sign up, login, public menu, navigation gate). Everything under
//! `/api/v1/secure/**` takes an `AuthUser` and checks the caller's role
//! group inside the handler.
//!
//! ERRORS
//! ======
//! Handlers return `ApiError`, a status code plus a short message rendered
//! as `{ "message": ... }`. Database failures are logged and reported as a
//! bare 500 so SQL details never reach clients.

pub mod auth;
pub mod customers;
pub mod history;
pub mod menu;
pub mod orders;
pub mod staff;
pub mod stats;
pub mod stock;
pub mod worklogs;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post, put};
use serde::Deserialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::page::{DEFAULT_PAGE_SIZE, PageRequest};
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// Build from a service error, hiding the detail of server-side failures.
    pub(crate) fn from_service(status: StatusCode, err: &dyn std::error::Error) -> Self {
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
            return Self::from(status);
        }
        Self::new(status, err.to_string())
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("error"))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_service(StatusCode::INTERNAL_SERVER_ERROR, &err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "message": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `?limit=` for the short top-N lists.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    #[must_use]
    pub fn or(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, 100)
    }
}

/// `?page=&size=` for paginated lists.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageQuery {
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest { page: self.page.unwrap_or(0), size: self.size.unwrap_or(DEFAULT_PAGE_SIZE) }
    }
}

/// Parse an optional enum-like query parameter; unknown values are a 400.
pub(crate) fn parse_param<T>(raw: Option<&str>, name: &str, parse: impl Fn(&str) -> Option<T>) -> ApiResult<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse(value)
            .map(Some)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid {name}: {value}"))),
    }
}

// =============================================================================
// ROUTER
// =============================================================================

fn expose_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/navigation/check", get(auth::navigation_check))
        .route("/menu", get(menu::list_public))
        .route("/menu/recommendations", get(menu::recommendations))
        .route("/menu/favorites", get(menu::favorites))
        .route("/menu/promotions", get(menu::promotions))
        .route("/menu/on-sale", get(menu::on_sale))
        .route("/menu/combos", get(menu::combos))
        .route("/menu/type/{item_type}", get(menu::by_type))
        .route("/menu/{id}", get(menu::get_public))
}

fn secure_routes() -> Router<AppState> {
    Router::new()
        // users
        .route("/user/me", get(auth::me))
        .route("/user/profile", get(auth::profile).put(auth::update_profile))
        // menu
        .route("/menu", get(menu::list_managed).post(menu::create))
        .route("/menu/type/{item_type}", get(menu::by_type_managed))
        .route("/menu/analytics/top-bought", get(menu::analytics_top_bought))
        .route("/menu/analytics/top-rated", get(menu::analytics_top_rated))
        .route("/menu/{id}", put(menu::update).delete(menu::remove))
        .route("/menu/{id}/stock", patch(menu::toggle_stock))
        .route("/menu/{id}/discontinue", post(menu::discontinue))
        // orders
        .route("/orders", get(orders::list).post(orders::place))
        .route("/orders/customer/{customer_id}", get(orders::list_for_customer))
        .route("/orders/staff/{staff_id}", get(orders::list_for_staff))
        .route("/orders/{id}", get(orders::get))
        .route("/orders/{id}/advance", post(orders::advance))
        .route("/orders/{id}/complete", post(orders::complete))
        .route("/orders/{id}/toggle", post(orders::toggle))
        .route("/orders/{id}/status", put(orders::replace_status))
        // stock
        .route("/stock", get(stock::list).post(stock::create))
        .route("/stock/{id}", get(stock::get).put(stock::update).delete(stock::remove))
        .route("/stock/{id}/restock", post(stock::restock))
        // staff
        .route("/staff", get(staff::list).post(staff::create))
        .route("/staff/employee/{employee_id}", get(staff::get_by_employee_id))
        .route("/staff/user/{user_id}", get(staff::get_by_user_id))
        .route("/staff/{id}", get(staff::get).put(staff::update).delete(staff::remove))
        .route("/staff/{id}/deactivate", post(staff::deactivate))
        // work logs
        .route("/work-logs/clock-in", post(worklogs::clock_in))
        .route("/work-logs/clock-out", post(worklogs::clock_out))
        .route("/work-logs/current", get(worklogs::current))
        .route("/work-logs", get(worklogs::list_own))
        .route("/work-logs/user/{user_id}", get(worklogs::list_for_user))
        .route("/work-logs/on-duty", get(worklogs::on_duty))
        // customers
        .route("/customers", get(customers::list))
        .route("/customers/paginated", get(customers::list_paginated))
        .route("/customers/email/{email}", get(customers::get_by_email))
        .route("/customers/{id}", get(customers::get))
        .route("/customers/{id}/activate", post(customers::activate))
        .route("/customers/{id}/deactivate", post(customers::deactivate))
        // purchase history
        .route("/purchase-history", get(history::list_all))
        .route("/purchase-history/date-range", get(history::date_range))
        .route("/purchase-history/order/{order_number}", get(history::by_order_number))
        .route("/purchase-history/customer/{customer_id}", get(history::list_for_customer))
        .route("/purchase-history/customer/{customer_id}/stats", get(history::customer_totals))
        .route("/purchase-history/{id}", get(history::get))
        // stats
        .route("/stats/dashboard", get(stats::dashboard))
        .route("/stats/sales-by-day", get(stats::sales_by_day))
        .route("/stats/orders-by-hour", get(stats::orders_by_hour))
        .route("/stats/category-mix", get(stats::category_mix))
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1/expose", expose_routes())
        .nest("/api/v1/secure", secure_routes())
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
