//! Purchase history routes. Customers see their own rows, managers see all.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::access::{Role, RoleGroup};
use crate::format::format_date;
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, PageQuery};
use crate::services::history::{self, CustomerTotals, DateRange, HistoryError, Purchase};
use crate::services::page::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub customer_id: Option<Uuid>,
}

pub(crate) fn history_error_to_status(err: &HistoryError) -> StatusCode {
    match err {
        HistoryError::NotFound => StatusCode::NOT_FOUND,
        HistoryError::Validation(_) => StatusCode::BAD_REQUEST,
        HistoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn history_error(err: HistoryError) -> ApiError {
    ApiError::from_service(history_error_to_status(&err), &err)
}

/// Clients only see their own rows; others get a 404 rather than a hint the row exists.
fn ensure_owner(auth: &AuthUser, purchase: &Purchase) -> ApiResult<()> {
    if auth.user.role == Role::Client && purchase.customer_id != auth.user.id {
        return Err(ApiError::from(StatusCode::NOT_FOUND));
    }
    if auth.user.role != Role::Client {
        auth.require(RoleGroup::Managers)?;
    }
    Ok(())
}

/// `GET /api/v1/secure/purchase-history`
pub async fn list_all(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<Purchase>>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(history::list_all(&state.pool).await.map_err(history_error)?))
}

/// `GET /api/v1/secure/purchase-history/customer/:customer_id?page=&size=`
pub async fn list_for_customer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(customer_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Purchase>>> {
    auth.require_self_or(customer_id, RoleGroup::Managers)?;
    let rows = history::list_for_customer(&state.pool, customer_id, page.request())
        .await
        .map_err(history_error)?;
    Ok(Json(rows))
}

/// `GET /api/v1/secure/purchase-history/:id`
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Purchase>> {
    let purchase = history::get_entry(&state.pool, id).await.map_err(history_error)?;
    ensure_owner(&auth, &purchase)?;
    Ok(Json(purchase))
}

/// `GET /api/v1/secure/purchase-history/order/:order_number`
pub async fn by_order_number(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_number): Path<String>,
) -> ApiResult<Json<Purchase>> {
    let purchase = history::get_by_order_number(&state.pool, &order_number)
        .await
        .map_err(history_error)?;
    ensure_owner(&auth, &purchase)?;
    Ok(Json(purchase))
}

/// `GET /api/v1/secure/purchase-history/customer/:customer_id/stats`: order count and total spent.
pub async fn customer_totals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<CustomerTotals>> {
    auth.require_self_or(customer_id, RoleGroup::Managers)?;
    let totals = history::customer_totals(&state.pool, customer_id)
        .await
        .map_err(history_error)?;
    Ok(Json(totals))
}

/// `GET /api/v1/secure/purchase-history/date-range?start=&end=&customer_id=`
///
/// Clients are always scoped to their own history.
pub async fn date_range(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> ApiResult<Json<Vec<Purchase>>> {
    let customer_id = if auth.user.role == Role::Client {
        Some(auth.user.id)
    } else {
        auth.require(RoleGroup::Managers)?;
        query.customer_id
    };
    let range = DateRange { start: query.start, end: query.end };
    tracing::debug!(from = %format_date(range.start), to = %format_date(range.end), "purchase history range");
    let rows = history::list_in_range(&state.pool, range, customer_id)
        .await
        .map_err(history_error)?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_errors_map_to_statuses() {
        assert_eq!(history_error_to_status(&HistoryError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(history_error_to_status(&HistoryError::Validation("x".into())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn date_range_query_accepts_optional_customer() {
        let query: DateRangeQuery =
            serde_json::from_str(r#"{"start":"2025-08-01T00:00:00Z","end":"2025-08-02T00:00:00Z"}"#).unwrap();
        assert!(query.customer_id.is_none());
        assert!(query.start < query.end);
    }
}
