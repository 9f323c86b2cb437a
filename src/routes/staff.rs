//! Staff management routes (managers only, except reading your own record).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{Role, RoleGroup};
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, parse_param};
use crate::services::staff::{self, NewStaff, StaffError, StaffFilter, StaffKey, StaffMember, StaffUpdate};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StaffQuery {
    pub role: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub active_only: bool,
}

impl StaffQuery {
    fn filter(&self) -> ApiResult<StaffFilter> {
        Ok(StaffFilter {
            role: parse_param(self.role.as_deref(), "role", Role::parse)?,
            department: self.department.clone().filter(|d| !d.trim().is_empty()),
            active_only: self.active_only,
        })
    }
}

pub(crate) fn staff_error_to_status(err: &StaffError) -> StatusCode {
    match err {
        StaffError::NotFound => StatusCode::NOT_FOUND,
        StaffError::Conflict(_) => StatusCode::CONFLICT,
        StaffError::Validation(_) => StatusCode::BAD_REQUEST,
        StaffError::Hash(_) | StaffError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn staff_error(err: StaffError) -> ApiError {
    ApiError::from_service(staff_error_to_status(&err), &err)
}

/// Owner records are changed by owners only.
fn ensure_may_manage(auth: &AuthUser, target_role: Role) -> ApiResult<()> {
    if target_role == Role::Owner && auth.user.role != Role::Owner {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "only owners can manage an owner"));
    }
    Ok(())
}

/// Managers only, and the target must not be an owner unless the caller is one.
async fn check_target(state: &AppState, auth: &AuthUser, id: Uuid) -> ApiResult<()> {
    auth.require(RoleGroup::Managers)?;
    let target = staff::get_staff(&state.pool, StaffKey::Id(id)).await.map_err(staff_error)?;
    ensure_may_manage(auth, target.role)
}

/// `GET /api/v1/secure/staff?role=&department=&active_only=`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StaffQuery>,
) -> ApiResult<Json<Vec<StaffMember>>> {
    auth.require(RoleGroup::Managers)?;
    let members = staff::list_staff(&state.pool, &query.filter()?)
        .await
        .map_err(staff_error)?;
    Ok(Json(members))
}

/// `POST /api/v1/secure/staff`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewStaff>,
) -> ApiResult<(StatusCode, Json<StaffMember>)> {
    auth.require(RoleGroup::Managers)?;
    if body.role == Role::Owner && auth.user.role != Role::Owner {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "only owners can create owner accounts"));
    }
    let member = staff::create_staff(&state.pool, &body).await.map_err(staff_error)?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// `GET /api/v1/secure/staff/:id`
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<StaffMember>> {
    auth.require(RoleGroup::Managers)?;
    let member = staff::get_staff(&state.pool, StaffKey::Id(id))
        .await
        .map_err(staff_error)?;
    Ok(Json(member))
}

/// `GET /api/v1/secure/staff/employee/:employee_id`
pub async fn get_by_employee_id(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<StaffMember>> {
    auth.require(RoleGroup::Managers)?;
    let member = staff::get_staff(&state.pool, StaffKey::EmployeeId(&employee_id))
        .await
        .map_err(staff_error)?;
    Ok(Json(member))
}

/// `GET /api/v1/secure/staff/user/:user_id`: staff may read their own record.
pub async fn get_by_user_id(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<StaffMember>> {
    auth.require_self_or(user_id, RoleGroup::Managers)?;
    let member = staff::get_staff(&state.pool, StaffKey::UserId(user_id))
        .await
        .map_err(staff_error)?;
    Ok(Json(member))
}

/// `PUT /api/v1/secure/staff/:id`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StaffUpdate>,
) -> ApiResult<Json<StaffMember>> {
    check_target(&state, &auth, id).await?;
    if body.role == Some(Role::Owner) && auth.user.role != Role::Owner {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "only owners can grant the owner role"));
    }
    let member = staff::update_staff(&state.pool, id, &body)
        .await
        .map_err(staff_error)?;
    Ok(Json(member))
}

/// `POST /api/v1/secure/staff/:id/deactivate`
pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StaffMember>> {
    check_target(&state, &auth, id).await?;
    let member = staff::deactivate_staff(&state.pool, id).await.map_err(staff_error)?;
    Ok(Json(member))
}

/// `DELETE /api/v1/secure/staff/:id`
pub async fn remove(State(state): State<AppState>, auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    check_target(&state, &auth, id).await?;
    staff::delete_staff(&state.pool, id).await.map_err(staff_error)?;
    Ok(StatusCode::NO_CONTENT)
}
