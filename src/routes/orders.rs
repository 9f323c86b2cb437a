//! Order routes: placement, the staff queue and completion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{Role, RoleGroup};
use crate::format::format_cents;
use crate::order_status::{OrderFilter, OrderSort, StatusError, StatusFlag};
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, PageQuery, parse_param};
use crate::services::order::{self, NewOrder, Order, OrderError, StatusUpdate};
use crate::services::page::Page;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceBody {
    pub status: StatusFlag,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    pub flag: StatusFlag,
}

pub(crate) fn order_error_to_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::NotFound(_) | OrderError::UnknownMenuItem(_) => StatusCode::NOT_FOUND,
        OrderError::Validation(_) | OrderError::Status(_) => StatusCode::BAD_REQUEST,
        OrderError::OutOfStock(_) | OrderError::Closed(_) => StatusCode::CONFLICT,
        OrderError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn order_error(err: OrderError) -> ApiError {
    ApiError::from_service(order_error_to_status(&err), &err)
}

fn list_params(query: &OrderQuery) -> ApiResult<(OrderFilter, OrderSort)> {
    let filter = parse_param(query.filter.as_deref(), "filter", OrderFilter::parse)?.unwrap_or_default();
    let sort = parse_param(query.sort.as_deref(), "sort", OrderSort::parse)?.unwrap_or_default();
    Ok((filter, sort))
}

/// Clients order for themselves at catalogue prices; tax and discount are
/// staff-entered adjustments.
fn scope_to_caller(auth: &AuthUser, body: &mut NewOrder) {
    if auth.user.role == Role::Client {
        body.customer_id = Some(auth.user.id);
        body.tax_cents = 0;
        body.discount_cents = 0;
    }
}

/// Clients may only read their own orders.
fn ensure_visible(auth: &AuthUser, order: &Order) -> ApiResult<()> {
    if auth.user.role == Role::Client && order.customer_id != Some(auth.user.id) {
        return Err(ApiError::from(StatusCode::NOT_FOUND));
    }
    Ok(())
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/v1/secure/orders?filter=&sort=`: the staff queue.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    auth.require(RoleGroup::Staff)?;
    let (filter, sort) = list_params(&query)?;
    let orders = order::list_orders(&state.pool, filter, sort)
        .await
        .map_err(order_error)?;
    Ok(Json(orders))
}

/// `POST /api/v1/secure/orders`: clients order for themselves, staff for anyone.
pub async fn place(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut body): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    scope_to_caller(&auth, &mut body);
    let placed = order::place_order(&state.pool, &body).await.map_err(order_error)?;
    tracing::info!(
        order_number = %placed.order_number,
        queue_number = placed.queue_number,
        total = %format_cents(placed.total_cents),
        "order placed"
    );
    Ok((StatusCode::CREATED, Json(placed)))
}

/// `GET /api/v1/secure/orders/:id`
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    let found = order::get_order(&state.pool, id).await.map_err(order_error)?;
    ensure_visible(&auth, &found)?;
    Ok(Json(found))
}

/// `GET /api/v1/secure/orders/customer/:customer_id?page=&size=`
pub async fn list_for_customer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(customer_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Page<Order>>> {
    auth.require_self_or(customer_id, RoleGroup::Staff)?;
    let orders = order::list_for_customer(&state.pool, customer_id, page.request())
        .await
        .map_err(order_error)?;
    Ok(Json(orders))
}

/// `GET /api/v1/secure/orders/staff/:staff_id?filter=`
pub async fn list_for_staff(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(staff_id): Path<Uuid>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    auth.require(RoleGroup::Staff)?;
    let (filter, _) = list_params(&query)?;
    let orders = order::list_for_staff(&state.pool, staff_id, filter)
        .await
        .map_err(order_error)?;
    Ok(Json(orders))
}

/// `POST /api/v1/secure/orders/:id/advance`: `{ "status": "IN_PROGRESS" }`.
pub async fn advance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AdvanceBody>,
) -> ApiResult<Json<Order>> {
    auth.require(RoleGroup::Staff)?;
    let updated = order::advance(&state.pool, id, body.status, auth.user.id)
        .await
        .map_err(order_error)?;
    Ok(Json(updated))
}

/// `POST /api/v1/secure/orders/:id/complete`: the caller is recorded as `completed_by`.
pub async fn complete(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    auth.require(RoleGroup::Staff)?;
    let done = order::complete(&state.pool, id, auth.user.id, state.config.loyalty_points_per_dollar)
        .await
        .map_err(order_error)?;
    Ok(Json(done))
}

/// `POST /api/v1/secure/orders/:id/toggle`: `{ "flag": "HAS_PROBLEM" }`.
pub async fn toggle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ToggleBody>,
) -> ApiResult<Json<Order>> {
    auth.require(RoleGroup::Staff)?;
    if body.flag.is_primary() {
        return Err(order_error(OrderError::Status(StatusError::NotToggleable(body.flag))));
    }
    let updated = order::toggle_flag(&state.pool, id, body.flag)
        .await
        .map_err(order_error)?;
    Ok(Json(updated))
}

/// `PUT /api/v1/secure/orders/:id/status`: replace the whole flag list.
pub async fn replace_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Json<Order>> {
    auth.require(RoleGroup::Staff)?;
    let updated =
        order::replace_status(&state.pool, id, &body, auth.user.id, state.config.loyalty_points_per_dollar)
            .await
            .map_err(order_error)?;
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_errors_map_to_statuses() {
        assert_eq!(order_error_to_status(&OrderError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(order_error_to_status(&OrderError::OutOfStock("Milky Way".into())), StatusCode::CONFLICT);
        assert_eq!(order_error_to_status(&OrderError::Closed(Uuid::nil())), StatusCode::CONFLICT);
        assert_eq!(order_error_to_status(&OrderError::Status(StatusError::Empty)), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn list_params_default_and_reject_unknown() {
        assert_eq!(list_params(&OrderQuery::default()).unwrap(), (OrderFilter::All, OrderSort::Newest));
        let query = OrderQuery { filter: Some("in-progress".into()), sort: Some("queue-asc".into()) };
        assert_eq!(list_params(&query).unwrap(), (OrderFilter::InProgress, OrderSort::QueueAsc));
        let bad = OrderQuery { filter: Some("lost".into()), sort: None };
        assert_eq!(list_params(&bad).unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user: crate::services::session::SessionUser {
                id: Uuid::new_v4(),
                name: "Luna Park".into(),
                email: "luna@astrobrew.test".into(),
                role,
                avatar: None,
            },
            token: "t".into(),
        }
    }

    fn body_with_adjustments() -> NewOrder {
        serde_json::from_value(serde_json::json!({
            "customer_name": "Luna",
            "customer_id": Uuid::new_v4(),
            "items": [{ "menu_item_id": Uuid::new_v4(), "quantity": 2 }],
            "tax_cents": 900,
            "discount_cents": 1300
        }))
        .unwrap()
    }

    #[test]
    fn client_orders_drop_adjustments_and_foreign_customer() {
        let auth = caller(Role::Client);
        let mut body = body_with_adjustments();
        scope_to_caller(&auth, &mut body);
        assert_eq!(body.customer_id, Some(auth.user.id));
        assert_eq!((body.tax_cents, body.discount_cents), (0, 0));
    }

    #[test]
    fn staff_orders_keep_adjustments() {
        let auth = caller(Role::Cashier);
        let mut body = body_with_adjustments();
        let customer = body.customer_id;
        scope_to_caller(&auth, &mut body);
        assert_eq!(body.customer_id, customer);
        assert_eq!((body.tax_cents, body.discount_cents), (900, 1300));
    }

    #[test]
    fn advance_body_uses_wire_names() {
        let body: AdvanceBody = serde_json::from_str(r#"{"status":"IN_PROGRESS"}"#).unwrap();
        assert_eq!(body.status, StatusFlag::InProgress);
    }
}
