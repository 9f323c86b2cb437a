//! Customer account routes for managers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::RoleGroup;
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, PageQuery};
use crate::services::auth::UserProfile;
use crate::services::customer::{self, CustomerError};
use crate::services::page::{MAX_PAGE_SIZE, Page, PageRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    #[serde(default)]
    pub active_only: bool,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

pub(crate) fn customer_error_to_status(err: &CustomerError) -> StatusCode {
    match err {
        CustomerError::NotFound => StatusCode::NOT_FOUND,
        CustomerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn customer_error(err: CustomerError) -> ApiError {
    ApiError::from_service(customer_error_to_status(&err), &err)
}

/// `GET /api/v1/secure/customers?active_only=`: first page at the maximum size.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    auth.require(RoleGroup::Managers)?;
    let page = PageRequest { page: 0, size: MAX_PAGE_SIZE };
    let customers = customer::list_customers(&state.pool, query.active_only, page)
        .await
        .map_err(customer_error)?;
    Ok(Json(customers.content))
}

/// `GET /api/v1/secure/customers/paginated?active_only=&page=&size=`
pub async fn list_paginated(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<Page<UserProfile>>> {
    auth.require(RoleGroup::Managers)?;
    let page = PageQuery { page: query.page, size: query.size }.request();
    let customers = customer::list_customers(&state.pool, query.active_only, page)
        .await
        .map_err(customer_error)?;
    Ok(Json(customers))
}

/// `GET /api/v1/secure/customers/:id`
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<UserProfile>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(customer::get_customer(&state.pool, id).await.map_err(customer_error)?))
}

/// `GET /api/v1/secure/customers/email/:email`
pub async fn get_by_email(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(customer::get_customer_by_email(&state.pool, &email).await.map_err(customer_error)?))
}

/// `POST /api/v1/secure/customers/:id/activate`
pub async fn activate(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<UserProfile>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(customer::set_active(&state.pool, id, true).await.map_err(customer_error)?))
}

/// `POST /api/v1/secure/customers/:id/deactivate`
pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    auth.require(RoleGroup::Managers)?;
    Ok(Json(customer::set_active(&state.pool, id, false).await.map_err(customer_error)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(customer_error_to_status(&CustomerError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn query_defaults_to_all_customers() {
        let query: CustomerQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.active_only);
        assert!(query.page.is_none());
    }
}
