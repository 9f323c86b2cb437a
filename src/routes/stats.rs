//! Manager dashboard routes.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::access::RoleGroup;
use crate::routes::ApiResult;
use crate::routes::auth::AuthUser;
use crate::services::stats::{self, CategoryShare, DailySales, Dashboard, HourlyOrders};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HourlyResponse {
    pub hours: Vec<HourlyOrders>,
    pub peak_hour: Option<i32>,
}

/// `GET /api/v1/secure/stats/dashboard`
pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Dashboard>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(stats::dashboard(&state.pool).await?))
}

/// `GET /api/v1/secure/stats/sales-by-day`
pub async fn sales_by_day(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<DailySales>>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(stats::sales_by_day(&state.pool).await?))
}

/// `GET /api/v1/secure/stats/orders-by-hour`: today's hours plus the busiest one.
pub async fn orders_by_hour(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<HourlyResponse>> {
    auth.require(RoleGroup::Managers)?;
    let hours = stats::orders_by_hour(&state.pool).await?;
    let peak_hour = stats::peak_hour(&hours);
    Ok(Json(HourlyResponse { hours, peak_hour }))
}

/// `GET /api/v1/secure/stats/category-mix`
pub async fn category_mix(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<CategoryShare>>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(stats::category_breakdown(&state.pool).await?))
}
