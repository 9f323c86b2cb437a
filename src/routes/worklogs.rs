//! Shift clock routes. Staff clock themselves in and out.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::access::RoleGroup;
use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, LimitQuery};
use crate::services::worklog::{self, ClockOut, OnDuty, WorkLog, WorkLogError};
use crate::state::AppState;

const DEFAULT_LOG_LIMIT: i64 = 30;

pub(crate) fn worklog_error_to_status(err: &WorkLogError) -> StatusCode {
    match err {
        WorkLogError::AlreadyClockedIn | WorkLogError::NotClockedIn => StatusCode::CONFLICT,
        WorkLogError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkLogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn worklog_error(err: WorkLogError) -> ApiError {
    ApiError::from_service(worklog_error_to_status(&err), &err)
}

/// `POST /api/v1/secure/work-logs/clock-in`
pub async fn clock_in(State(state): State<AppState>, auth: AuthUser) -> ApiResult<(StatusCode, Json<WorkLog>)> {
    auth.require(RoleGroup::Staff)?;
    let log = worklog::clock_in(&state.pool, auth.user.id)
        .await
        .map_err(worklog_error)?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// `POST /api/v1/secure/work-logs/clock-out`: `{ "break_minutes": 30 }`.
pub async fn clock_out(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ClockOut>,
) -> ApiResult<Json<WorkLog>> {
    auth.require(RoleGroup::Staff)?;
    let log = worklog::clock_out(&state.pool, auth.user.id, &body)
        .await
        .map_err(worklog_error)?;
    Ok(Json(log))
}

/// `GET /api/v1/secure/work-logs/current`: `null` when off shift.
pub async fn current(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Option<WorkLog>>> {
    auth.require(RoleGroup::Staff)?;
    let log = worklog::current_shift(&state.pool, auth.user.id)
        .await
        .map_err(worklog_error)?;
    Ok(Json(log))
}

/// `GET /api/v1/secure/work-logs?limit=`
pub async fn list_own(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(limit): Query<LimitQuery>,
) -> ApiResult<Json<Vec<WorkLog>>> {
    auth.require(RoleGroup::Staff)?;
    let logs = worklog::list_logs(&state.pool, auth.user.id, limit.or(DEFAULT_LOG_LIMIT))
        .await
        .map_err(worklog_error)?;
    Ok(Json(logs))
}

/// `GET /api/v1/secure/work-logs/user/:user_id?limit=`
pub async fn list_for_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Query(limit): Query<LimitQuery>,
) -> ApiResult<Json<Vec<WorkLog>>> {
    auth.require_self_or(user_id, RoleGroup::Managers)?;
    let logs = worklog::list_logs(&state.pool, user_id, limit.or(DEFAULT_LOG_LIMIT))
        .await
        .map_err(worklog_error)?;
    Ok(Json(logs))
}

/// `GET /api/v1/secure/work-logs/on-duty`
pub async fn on_duty(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<OnDuty>>> {
    auth.require(RoleGroup::Staff)?;
    Ok(Json(worklog::on_duty(&state.pool).await.map_err(worklog_error)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_state_conflicts_are_409() {
        assert_eq!(worklog_error_to_status(&WorkLogError::AlreadyClockedIn), StatusCode::CONFLICT);
        assert_eq!(worklog_error_to_status(&WorkLogError::NotClockedIn), StatusCode::CONFLICT);
        assert_eq!(worklog_error_to_status(&WorkLogError::Validation("x".into())), StatusCode::BAD_REQUEST);
    }
}
