//! Inventory routes. Every staff console can read and restock; managers edit.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::RoleGroup;
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, parse_param};
use crate::services::stock::{self, Restock, StockError, StockFilter, StockInput, StockItem, StockSort};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    /// `all`, a category name, `low-stock` or `out-of-stock`.
    pub filter: Option<String>,
    pub sort: Option<String>,
}

pub(crate) fn stock_error_to_status(err: &StockError) -> StatusCode {
    match err {
        StockError::NotFound(_) => StatusCode::NOT_FOUND,
        StockError::Validation(_) => StatusCode::BAD_REQUEST,
        StockError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn stock_error(err: StockError) -> ApiError {
    ApiError::from_service(stock_error_to_status(&err), &err)
}

/// `GET /api/v1/secure/stock?filter=&sort=`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StockQuery>,
) -> ApiResult<Json<Vec<StockItem>>> {
    auth.require(RoleGroup::Staff)?;
    let filter = parse_param(query.filter.as_deref(), "filter", StockFilter::parse)?.unwrap_or_default();
    let sort = parse_param(query.sort.as_deref(), "sort", StockSort::parse)?.unwrap_or_default();
    let items = stock::list_items(&state.pool, filter, sort, state.config.stock_warning_multiple)
        .await
        .map_err(stock_error)?;
    Ok(Json(items))
}

/// `GET /api/v1/secure/stock/:id`
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<StockItem>> {
    auth.require(RoleGroup::Staff)?;
    let item = stock::get_item(&state.pool, id, state.config.stock_warning_multiple)
        .await
        .map_err(stock_error)?;
    Ok(Json(item))
}

/// `POST /api/v1/secure/stock`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StockInput>,
) -> ApiResult<(StatusCode, Json<StockItem>)> {
    auth.require(RoleGroup::Managers)?;
    let item = stock::create_item(&state.pool, &body, state.config.stock_warning_multiple)
        .await
        .map_err(stock_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /api/v1/secure/stock/:id`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StockInput>,
) -> ApiResult<Json<StockItem>> {
    auth.require(RoleGroup::Managers)?;
    let item = stock::update_item(&state.pool, id, &body, state.config.stock_warning_multiple)
        .await
        .map_err(stock_error)?;
    Ok(Json(item))
}

/// `POST /api/v1/secure/stock/:id/restock`
pub async fn restock(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<Restock>,
) -> ApiResult<Json<StockItem>> {
    auth.require(RoleGroup::Staff)?;
    let item = stock::restock(&state.pool, id, &body, state.config.stock_warning_multiple)
        .await
        .map_err(stock_error)?;
    Ok(Json(item))
}

/// `DELETE /api/v1/secure/stock/:id`
pub async fn remove(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    auth.require(RoleGroup::Managers)?;
    stock::delete_item(&state.pool, id).await.map_err(stock_error)?;
    Ok(StatusCode::NO_CONTENT)
}
