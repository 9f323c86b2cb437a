//! Shift clock: clock in/out, hours, overtime and lateness.
//!
//! Shift times are wall-clock `HH:MM` in UTC. A partial unique index keeps at
//! most one open log (no clock-out) per staff member.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::{OffsetDateTime, Time};
use tracing::info;
use uuid::Uuid;

use crate::format::format_time;
use crate::services::staff;

pub const STANDARD_SHIFT_HOURS: f64 = 8.0;
pub const MAX_BREAK_MINUTES: i32 = 240;

#[derive(Debug, thiserror::Error)]
pub enum WorkLogError {
    #[error("already clocked in")]
    AlreadyClockedIn,
    #[error("not clocked in")]
    NotClockedIn,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    ClockedIn,
    OnBreak,
    ClockedOut,
    Absent,
    Late,
    EarlyLeave,
}

impl WorkStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClockedIn => "CLOCKED_IN",
            Self::OnBreak => "ON_BREAK",
            Self::ClockedOut => "CLOCKED_OUT",
            Self::Absent => "ABSENT",
            Self::Late => "LATE",
            Self::EarlyLeave => "EARLY_LEAVE",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CLOCKED_IN" => Some(Self::ClockedIn),
            "ON_BREAK" => Some(Self::OnBreak),
            "CLOCKED_OUT" => Some(Self::ClockedOut),
            "ABSENT" => Some(Self::Absent),
            "LATE" => Some(Self::Late),
            "EARLY_LEAVE" => Some(Self::EarlyLeave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkLog {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub clock_out_time: Option<OffsetDateTime>,
    pub break_duration_minutes: i32,
    pub total_hours_worked: Option<f64>,
    pub overtime_hours: f64,
    pub minutes_late: i32,
    pub status: WorkStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClockOut {
    #[serde(default)]
    pub break_minutes: i32,
    pub notes: Option<String>,
}

/// Who is currently on shift.
#[derive(Debug, Clone, Serialize)]
pub struct OnDuty {
    pub user_id: Uuid,
    pub name: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub clock_in_time: OffsetDateTime,
    pub minutes_late: i32,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

/// `(total_hours, overtime_hours)` for a closed shift; worked time never goes negative.
#[must_use]
pub fn compute_hours(clock_in: OffsetDateTime, clock_out: OffsetDateTime, break_minutes: i32) -> (f64, f64) {
    let minutes = (clock_out - clock_in).whole_minutes() - i64::from(break_minutes);
    #[allow(clippy::cast_precision_loss)]
    let hours = minutes.max(0) as f64 / 60.0;
    let overtime = (hours - STANDARD_SHIFT_HOURS).max(0.0);
    (hours, overtime)
}

/// Whole minutes after the scheduled start; early arrivals count as zero.
///
/// The start is taken on whichever of yesterday, today or tomorrow lies
/// closest to the clock-in, so shifts around midnight measure correctly.
#[must_use]
pub fn minutes_late(shift_start: Time, clock_in: OffsetDateTime) -> i32 {
    let day = clock_in.date();
    let scheduled = [day.previous_day(), Some(day), day.next_day()]
        .into_iter()
        .flatten()
        .map(|d| d.with_time(shift_start).assume_offset(clock_in.offset()))
        .min_by_key(|start| (clock_in - *start).abs());
    let late = scheduled.map_or(0, |start| (clock_in - start).whole_minutes());
    i32::try_from(late.max(0)).unwrap_or(i32::MAX)
}

/// Clock-out before the scheduled end is an early leave.
#[must_use]
pub fn clock_out_status(shift_end: Option<Time>, clock_in: OffsetDateTime, clock_out: OffsetDateTime) -> WorkStatus {
    match shift_end {
        Some(end) if clock_out.date() == clock_in.date() && clock_out.time() < end && end > clock_in.time() => {
            WorkStatus::EarlyLeave
        }
        _ => WorkStatus::ClockedOut,
    }
}

// =============================================================================
// QUERIES
// =============================================================================

const COLUMNS: &str = "id, user_id, clock_in_time, clock_out_time, break_duration_minutes, total_hours_worked, \
     overtime_hours, minutes_late, status, notes";

fn log_from_row(row: &sqlx::postgres::PgRow) -> WorkLog {
    let status: String = row.get("status");
    WorkLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        clock_in_time: row.get("clock_in_time"),
        clock_out_time: row.get("clock_out_time"),
        break_duration_minutes: row.get("break_duration_minutes"),
        total_hours_worked: row.get("total_hours_worked"),
        overtime_hours: row.get("overtime_hours"),
        minutes_late: row.get("minutes_late"),
        status: WorkStatus::parse(&status).unwrap_or(WorkStatus::ClockedIn),
        notes: row.get("notes"),
    }
}

async fn shift_times(pool: &PgPool, user_id: Uuid) -> Result<(Option<Time>, Option<Time>), sqlx::Error> {
    let row = sqlx::query("SELECT shift_start, shift_end FROM employee_information WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map_or((None, None), |r| {
        let start: String = r.get("shift_start");
        let end: String = r.get("shift_end");
        (staff::parse_shift_time(&start), staff::parse_shift_time(&end))
    }))
}

/// The open log for a staff member, if clocked in.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn current_shift(pool: &PgPool, user_id: Uuid) -> Result<Option<WorkLog>, WorkLogError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM work_logs WHERE user_id = $1 AND clock_out_time IS NULL"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(log_from_row))
}

/// # Errors
///
/// Returns `AlreadyClockedIn` when an open log exists.
pub async fn clock_in(pool: &PgPool, user_id: Uuid) -> Result<WorkLog, WorkLogError> {
    if current_shift(pool, user_id).await?.is_some() {
        return Err(WorkLogError::AlreadyClockedIn);
    }
    let now = OffsetDateTime::now_utc();
    let (start, _) = shift_times(pool, user_id).await?;
    let late = start.map_or(0, |s| minutes_late(s, now));
    let status = if late > 0 { WorkStatus::Late } else { WorkStatus::ClockedIn };

    let row = sqlx::query(&format!(
        "INSERT INTO work_logs (user_id, clock_in_time, minutes_late, status)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(user_id)
    .bind(now)
    .bind(late)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(WorkLogError::AlreadyClockedIn)?;

    info!(%user_id, at = %format_time(now), minutes_late = late, "clocked in");
    Ok(log_from_row(&row))
}

/// # Errors
///
/// Returns `NotClockedIn` without an open log, `Validation` for bad break minutes.
pub async fn clock_out(pool: &PgPool, user_id: Uuid, req: &ClockOut) -> Result<WorkLog, WorkLogError> {
    if !(0..=MAX_BREAK_MINUTES).contains(&req.break_minutes) {
        return Err(WorkLogError::Validation(format!(
            "break minutes must be between 0 and {MAX_BREAK_MINUTES}"
        )));
    }
    if req.notes.as_deref().is_some_and(|n| n.chars().count() > 500) {
        return Err(WorkLogError::Validation("notes must not exceed 500 characters".into()));
    }
    let open = current_shift(pool, user_id).await?.ok_or(WorkLogError::NotClockedIn)?;
    let now = OffsetDateTime::now_utc();
    let (hours, overtime) = compute_hours(open.clock_in_time, now, req.break_minutes);
    let (_, end) = shift_times(pool, user_id).await?;
    let status = clock_out_status(end, open.clock_in_time, now);

    let row = sqlx::query(&format!(
        "UPDATE work_logs SET clock_out_time = $2, break_duration_minutes = $3, total_hours_worked = $4,
             overtime_hours = $5, status = $6, notes = COALESCE($7, notes)
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(open.id)
    .bind(now)
    .bind(req.break_minutes)
    .bind(hours)
    .bind(overtime)
    .bind(status.as_str())
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await?;

    info!(%user_id, at = %format_time(now), hours, overtime, "clocked out");
    Ok(log_from_row(&row))
}

/// Most recent logs for one staff member.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_logs(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<WorkLog>, WorkLogError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM work_logs WHERE user_id = $1 ORDER BY clock_in_time DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit.clamp(1, 200))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(log_from_row).collect())
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn on_duty(pool: &PgPool) -> Result<Vec<OnDuty>, WorkLogError> {
    let rows = sqlx::query(
        "SELECT w.user_id, u.first_name, u.last_name, u.role, w.clock_in_time, w.minutes_late
         FROM work_logs w
         JOIN users u ON u.id = w.user_id
         WHERE w.clock_out_time IS NULL
         ORDER BY w.clock_in_time ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| {
            let first: String = r.get("first_name");
            let last: String = r.get("last_name");
            OnDuty {
                user_id: r.get("user_id"),
                name: crate::services::session::full_name(&first, &last),
                role: r.get("role"),
                clock_in_time: r.get("clock_in_time"),
                minutes_late: r.get("minutes_late"),
            }
        })
        .collect())
}

pub(crate) async fn count_on_duty(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM work_logs WHERE clock_out_time IS NULL")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
#[path = "worklog_test.rs"]
mod tests;
