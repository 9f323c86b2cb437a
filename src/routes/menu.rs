//! Menu routes: public browsing plus manager/kitchen management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::RoleGroup;
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, LimitQuery, parse_param};
use crate::services::menu::{self, ItemType, MenuError, MenuFilter, MenuItem, MenuItemInput, MenuOrdering, MenuSort, PromoType};
use crate::services::page::{DEFAULT_PAGE_SIZE, Page, PageRequest};
use crate::state::AppState;

/// Listing query string. Public listings only honour `type`.
#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub promo_type: Option<String>,
    pub in_stock: Option<bool>,
    pub on_sale: Option<bool>,
    pub combo: Option<bool>,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
    /// `asc` (default) or `desc`.
    pub direction: Option<String>,
}

impl MenuQuery {
    fn page(&self) -> PageRequest {
        PageRequest { page: self.page.unwrap_or(0), size: self.size.unwrap_or(DEFAULT_PAGE_SIZE) }
    }

    fn ordering(&self) -> ApiResult<MenuOrdering> {
        let sort = parse_param(self.sort.as_deref(), "sort", MenuSort::parse)?.unwrap_or_default();
        let descending = match self.direction.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => return Err(ApiError::new(StatusCode::BAD_REQUEST, format!("invalid direction: {other}"))),
        };
        Ok(MenuOrdering { sort, descending })
    }

    fn filter(&self, public: bool) -> ApiResult<MenuFilter> {
        let item_type = parse_param(self.item_type.as_deref(), "type", ItemType::parse)?;
        if public {
            return Ok(MenuFilter { item_type, ..MenuFilter::default() });
        }
        Ok(MenuFilter {
            item_type,
            promo_type: parse_param(self.promo_type.as_deref(), "promo type", PromoType::parse)?,
            in_stock: self.in_stock,
            on_sale: self.on_sale,
            combo: self.combo,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PromotionQuery {
    pub promo_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StockToggle {
    pub in_stock: bool,
}

pub(crate) fn menu_error_to_status(err: &MenuError) -> StatusCode {
    match err {
        MenuError::NotFound(_) => StatusCode::NOT_FOUND,
        MenuError::Validation(_) => StatusCode::BAD_REQUEST,
        MenuError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn menu_error(err: MenuError) -> ApiError {
    ApiError::from_service(menu_error_to_status(&err), &err)
}

fn parse_type(raw: &str) -> ApiResult<ItemType> {
    ItemType::parse(raw).ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid type: {raw}")))
}

// =============================================================================
// PUBLIC
// =============================================================================

/// `GET /api/v1/expose/menu?type=&page=&size=&sort=&direction=`
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> ApiResult<Json<Page<MenuItem>>> {
    let page = menu::list_items(&state.pool, &query.filter(true)?, query.ordering()?, query.page())
        .await
        .map_err(menu_error)?;
    Ok(Json(page))
}

/// `GET /api/v1/expose/menu/:id`
pub async fn get_public(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<MenuItem>> {
    let item = menu::get_item(&state.pool, id).await.map_err(menu_error)?;
    Ok(Json(item))
}

/// `GET /api/v1/expose/menu/recommendations`: most bought, in stock.
pub async fn recommendations(
    State(state): State<AppState>,
    Query(limit): Query<LimitQuery>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    let items = menu::top_bought(&state.pool, limit.or(menu::DEFAULT_RECOMMENDATIONS), true)
        .await
        .map_err(menu_error)?;
    Ok(Json(items))
}

/// `GET /api/v1/expose/menu/favorites`: best rated, in stock.
pub async fn favorites(
    State(state): State<AppState>,
    Query(limit): Query<LimitQuery>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    let items = menu::top_rated(&state.pool, limit.or(menu::DEFAULT_FAVORITES), true)
        .await
        .map_err(menu_error)?;
    Ok(Json(items))
}

/// `GET /api/v1/expose/menu/promotions?promo_type=&limit=`
pub async fn promotions(
    State(state): State<AppState>,
    Query(query): Query<PromotionQuery>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    let promo_type = parse_param(query.promo_type.as_deref(), "promo type", PromoType::parse)?;
    let limit = LimitQuery { limit: query.limit }.or(menu::DEFAULT_PROMOTIONS);
    let items = menu::promotions(&state.pool, promo_type, limit)
        .await
        .map_err(menu_error)?;
    Ok(Json(items))
}

/// `GET /api/v1/expose/menu/on-sale`
pub async fn on_sale(State(state): State<AppState>) -> ApiResult<Json<Vec<MenuItem>>> {
    let filter = MenuFilter { on_sale: Some(true), in_stock: Some(true), ..MenuFilter::default() };
    Ok(Json(menu::list_all(&state.pool, &filter).await.map_err(menu_error)?))
}

/// `GET /api/v1/expose/menu/combos`
pub async fn combos(State(state): State<AppState>) -> ApiResult<Json<Vec<MenuItem>>> {
    let filter = MenuFilter { combo: Some(true), in_stock: Some(true), ..MenuFilter::default() };
    Ok(Json(menu::list_all(&state.pool, &filter).await.map_err(menu_error)?))
}

/// `GET /api/v1/expose/menu/type/:item_type`: in-stock items of one type.
pub async fn by_type(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<Vec<MenuItem>>> {
    let filter = MenuFilter { item_type: Some(parse_type(&raw)?), in_stock: Some(true), ..MenuFilter::default() };
    Ok(Json(menu::list_all(&state.pool, &filter).await.map_err(menu_error)?))
}

// =============================================================================
// MANAGEMENT
// =============================================================================

/// `GET /api/v1/secure/menu`: every filter, including out-of-stock items.
pub async fn list_managed(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<MenuQuery>,
) -> ApiResult<Json<Page<MenuItem>>> {
    auth.require(RoleGroup::Staff)?;
    let page = menu::list_items(&state.pool, &query.filter(false)?, query.ordering()?, query.page())
        .await
        .map_err(menu_error)?;
    Ok(Json(page))
}

/// `GET /api/v1/secure/menu/type/:item_type`: includes out-of-stock items.
pub async fn by_type_managed(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw): Path<String>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    auth.require(RoleGroup::Staff)?;
    let filter = MenuFilter { item_type: Some(parse_type(&raw)?), ..MenuFilter::default() };
    Ok(Json(menu::list_all(&state.pool, &filter).await.map_err(menu_error)?))
}

/// `POST /api/v1/secure/menu`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MenuItemInput>,
) -> ApiResult<(StatusCode, Json<MenuItem>)> {
    auth.require(RoleGroup::Managers)?;
    let item = menu::create_item(&state.pool, &body).await.map_err(menu_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /api/v1/secure/menu/:id`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MenuItemInput>,
) -> ApiResult<Json<MenuItem>> {
    auth.require(RoleGroup::Managers)?;
    let item = menu::update_item(&state.pool, id, &body).await.map_err(menu_error)?;
    Ok(Json(item))
}

/// `PATCH /api/v1/secure/menu/:id/stock`: managers and kitchen.
pub async fn toggle_stock(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StockToggle>,
) -> ApiResult<Json<MenuItem>> {
    if !RoleGroup::Kitchen.contains(auth.user.role) {
        auth.require(RoleGroup::Managers)?;
    }
    let item = menu::set_in_stock(&state.pool, id, body.in_stock)
        .await
        .map_err(menu_error)?;
    Ok(Json(item))
}

/// `POST /api/v1/secure/menu/:id/discontinue`
pub async fn discontinue(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    auth.require(RoleGroup::Managers)?;
    menu::discontinue(&state.pool, id).await.map_err(menu_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/secure/menu/:id`
pub async fn remove(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    auth.require(RoleGroup::Managers)?;
    menu::delete_item(&state.pool, id).await.map_err(menu_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/secure/menu/analytics/top-bought`
pub async fn analytics_top_bought(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(limit): Query<LimitQuery>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    auth.require(RoleGroup::Managers)?;
    let items = menu::top_bought(&state.pool, limit.or(menu::DEFAULT_ANALYTICS), false)
        .await
        .map_err(menu_error)?;
    Ok(Json(items))
}

/// `GET /api/v1/secure/menu/analytics/top-rated`
pub async fn analytics_top_rated(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(limit): Query<LimitQuery>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    auth.require(RoleGroup::Managers)?;
    let items = menu::top_rated(&state.pool, limit.or(menu::DEFAULT_ANALYTICS), false)
        .await
        .map_err(menu_error)?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_errors_map_to_statuses() {
        assert_eq!(menu_error_to_status(&MenuError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(menu_error_to_status(&MenuError::Validation("x".into())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn public_filter_ignores_management_flags() {
        let query = MenuQuery {
            item_type: Some("coffee".into()),
            in_stock: Some(false),
            combo: Some(true),
            ..MenuQuery::default()
        };
        let filter = query.filter(true).unwrap();
        assert_eq!(filter.item_type, Some(ItemType::Coffee));
        assert!(filter.in_stock.is_none());
        assert!(filter.combo.is_none());

        let managed = query.filter(false).unwrap();
        assert_eq!(managed.in_stock, Some(false));
        assert_eq!(managed.combo, Some(true));
    }

    #[test]
    fn ordering_parses_sort_and_direction() {
        let query = MenuQuery { sort: Some("weeklyBuys".into()), direction: Some("DESC".into()), ..MenuQuery::default() };
        let ordering = query.ordering().unwrap();
        assert_eq!(ordering.sort, MenuSort::WeeklyBuys);
        assert!(ordering.descending);
    }

    #[test]
    fn bad_sort_or_direction_is_bad_request() {
        let bad_sort = MenuQuery { sort: Some("colour".into()), ..MenuQuery::default() };
        assert_eq!(bad_sort.ordering().unwrap_err().status, StatusCode::BAD_REQUEST);
        let bad_dir = MenuQuery { direction: Some("sideways".into()), ..MenuQuery::default() };
        assert_eq!(bad_dir.ordering().unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn query_defaults_to_first_page() {
        let page = MenuQuery::default().page();
        assert_eq!(page.page, 0);
        assert_eq!(page.size, DEFAULT_PAGE_SIZE);
    }
}
