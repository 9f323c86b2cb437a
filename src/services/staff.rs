//! Staff directory: user accounts joined with their employee record.
//!
//! DESIGN
//! ======
//! A staff member is a `users` row with a non-client role plus one
//! `employee_information` row. Both are written in one transaction so a
//! half-created staff member can never log in. Deactivation flips both
//! `is_active` flags and drops any open sessions.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use time::{Date, OffsetDateTime, Time};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::info;
use uuid::Uuid;

use crate::access::Role;
use crate::services::auth::{self, Sex};
use crate::services::session;

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("staff member not found")]
    NotFound,
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Intern,
}

impl EmploymentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullTime => "FULL_TIME",
            Self::PartTime => "PART_TIME",
            Self::Contract => "CONTRACT",
            Self::Intern => "INTERN",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FULL_TIME" => Some(Self::FullTime),
            "PART_TIME" => Some(Self::PartTime),
            "CONTRACT" => Some(Self::Contract),
            "INTERN" => Some(Self::Intern),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffMember {
    /// Employee record id.
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub sex: Option<Sex>,
    pub avatar: Option<String>,
    pub phone_number: String,
    pub position: String,
    pub department: String,
    pub employment_type: EmploymentType,
    pub hire_date: Date,
    pub hourly_rate_cents: Option<i64>,
    pub shift_start: String,
    pub shift_end: String,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub sex: Option<Sex>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub phone_number: String,
    pub employee_id: String,
    pub position: String,
    pub department: String,
    pub employment_type: EmploymentType,
    pub hire_date: Date,
    pub hourly_rate_cents: Option<i64>,
    pub shift_start: String,
    pub shift_end: String,
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub sex: Option<Sex>,
    pub avatar: Option<String>,
    pub phone_number: Option<String>,
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub hire_date: Option<Date>,
    pub hourly_rate_cents: Option<i64>,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StaffFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub active_only: bool,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

const SHIFT_INPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour padding:none]:[minute][optional [:[second]]]");
const SHIFT_CANONICAL: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Parse a `HH:MM` (or `HH:MM:SS`) shift time.
#[must_use]
pub fn parse_shift_time(raw: &str) -> Option<Time> {
    Time::parse(raw.trim(), SHIFT_INPUT).ok()
}

/// Canonical `HH:MM` form.
#[must_use]
pub fn format_shift_time(t: Time) -> String {
    t.format(SHIFT_CANONICAL).unwrap_or_default()
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), StaffError> {
    let len = value.trim().chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(StaffError::Validation(format!("{field} must be between {min} and {max} characters")))
    }
}

fn check_shift(field: &str, raw: &str) -> Result<String, StaffError> {
    parse_shift_time(raw)
        .map(format_shift_time)
        .ok_or_else(|| StaffError::Validation(format!("{field} must be a HH:MM time")))
}

/// # Errors
///
/// Returns `Validation` describing the first offending field.
pub fn validate_new_staff(new: &NewStaff, today: Date) -> Result<(), StaffError> {
    check_len("first name", &new.first_name, 1, 50)?;
    check_len("last name", &new.last_name, 0, 50)?;
    check_len("username", &new.username, 3, 50)?;
    auth::normalize_email(&new.email).ok_or_else(|| StaffError::Validation("invalid email".into()))?;
    if new.password.chars().count() < auth::MIN_PASSWORD_LEN {
        return Err(StaffError::Validation(format!(
            "password must be at least {} characters",
            auth::MIN_PASSWORD_LEN
        )));
    }
    if !new.role.is_staff() {
        return Err(StaffError::Validation("staff role cannot be client".into()));
    }
    check_len("employee id", &new.employee_id, 1, 20)?;
    check_len("position", &new.position, 1, 50)?;
    check_len("department", &new.department, 1, 50)?;
    check_len("phone number", &new.phone_number, 0, 20)?;
    if new.hire_date > today {
        return Err(StaffError::Validation("hire date cannot be in the future".into()));
    }
    if new.hourly_rate_cents.is_some_and(|r| r < 0) {
        return Err(StaffError::Validation("hourly rate cannot be negative".into()));
    }
    check_shift("shift start", &new.shift_start)?;
    check_shift("shift end", &new.shift_end)?;
    Ok(())
}

// =============================================================================
// QUERIES
// =============================================================================

const SELECT: &str = "SELECT e.id, e.user_id, e.employee_id, u.first_name, u.last_name, u.username, u.email, u.role,
        u.sex, u.avatar, u.phone_number, e.position, e.department, e.employment_type, e.hire_date,
        e.hourly_rate_cents, e.shift_start, e.shift_end, e.notes, (e.is_active AND u.is_active) AS is_active,
        e.created_at
     FROM employee_information e
     JOIN users u ON u.id = e.user_id";

fn member_from_row(row: &sqlx::postgres::PgRow) -> StaffMember {
    let first_name: String = row.get("first_name");
    let last_name: String = row.get("last_name");
    let role: String = row.get("role");
    let sex: Option<String> = row.get("sex");
    let employment_type: String = row.get("employment_type");
    StaffMember {
        id: row.get("id"),
        user_id: row.get("user_id"),
        employee_id: row.get("employee_id"),
        name: session::full_name(&first_name, &last_name),
        first_name,
        last_name,
        username: row.get("username"),
        email: row.get("email"),
        role: Role::parse(&role).unwrap_or(Role::Helper),
        sex: sex.as_deref().and_then(Sex::parse),
        avatar: row.get("avatar"),
        phone_number: row.get("phone_number"),
        position: row.get("position"),
        department: row.get("department"),
        employment_type: EmploymentType::parse(&employment_type).unwrap_or(EmploymentType::FullTime),
        hire_date: row.get("hire_date"),
        hourly_rate_cents: row.get("hourly_rate_cents"),
        shift_start: row.get("shift_start"),
        shift_end: row.get("shift_end"),
        notes: row.get("notes"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_staff(pool: &PgPool, filter: &StaffFilter) -> Result<Vec<StaffMember>, StaffError> {
    let mut qb = QueryBuilder::<Postgres>::new(SELECT);
    qb.push(" WHERE u.role <> 'client'");
    if let Some(role) = filter.role {
        qb.push(" AND u.role = ").push_bind(role.as_str());
    }
    if let Some(department) = filter.department.as_deref() {
        qb.push(" AND lower(e.department) = lower(").push_bind(department.to_owned()).push(")");
    }
    if filter.active_only {
        qb.push(" AND e.is_active AND u.is_active");
    }
    qb.push(" ORDER BY u.first_name ASC, u.last_name ASC");
    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows.iter().map(member_from_row).collect())
}

/// Lookup key for a single staff member.
#[derive(Debug, Clone, Copy)]
pub enum StaffKey<'a> {
    Id(Uuid),
    UserId(Uuid),
    EmployeeId(&'a str),
}

/// # Errors
///
/// Returns `NotFound` when no staff member matches.
pub async fn get_staff(pool: &PgPool, key: StaffKey<'_>) -> Result<StaffMember, StaffError> {
    let row = match key {
        StaffKey::Id(id) => {
            sqlx::query(&format!("{SELECT} WHERE e.id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        StaffKey::UserId(id) => {
            sqlx::query(&format!("{SELECT} WHERE e.user_id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        StaffKey::EmployeeId(employee_id) => {
            sqlx::query(&format!("{SELECT} WHERE e.employee_id = $1"))
                .bind(employee_id)
                .fetch_optional(pool)
                .await?
        }
    };
    row.as_ref().map(member_from_row).ok_or(StaffError::NotFound)
}

async fn ensure_unique(
    pool: &PgPool,
    email: Option<&str>,
    username: Option<&str>,
    employee_id: Option<&str>,
    except_user: Option<Uuid>,
) -> Result<(), StaffError> {
    if let Some(email) = email {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id IS DISTINCT FROM $2)")
                .bind(email)
                .bind(except_user)
                .fetch_one(pool)
                .await?;
        if taken {
            return Err(StaffError::Conflict("email"));
        }
    }
    if let Some(username) = username {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id IS DISTINCT FROM $2)")
                .bind(username)
                .bind(except_user)
                .fetch_one(pool)
                .await?;
        if taken {
            return Err(StaffError::Conflict("username"));
        }
    }
    if let Some(employee_id) = employee_id {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM employee_information WHERE employee_id = $1 AND user_id IS DISTINCT FROM $2)",
        )
        .bind(employee_id)
        .bind(except_user)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(StaffError::Conflict("employee id"));
        }
    }
    Ok(())
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// # Errors
///
/// Returns `Validation`, `Conflict` on a duplicate email, username or
/// employee id, or a database error.
pub async fn create_staff(pool: &PgPool, new: &NewStaff) -> Result<StaffMember, StaffError> {
    validate_new_staff(new, OffsetDateTime::now_utc().date())?;
    let email = auth::normalize_email(&new.email).ok_or_else(|| StaffError::Validation("invalid email".into()))?;
    let username = new.username.trim();
    let employee_id = new.employee_id.trim();
    ensure_unique(pool, Some(&email), Some(username), Some(employee_id), None).await?;

    let mut tx = pool.begin().await?;
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (first_name, last_name, username, email, password_hash, role, sex, avatar, phone_number)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id",
    )
    .bind(new.first_name.trim())
    .bind(new.last_name.trim())
    .bind(username)
    .bind(&email)
    .bind(auth::hash_password(&new.password)?)
    .bind(new.role.as_str())
    .bind(new.sex.map(Sex::as_str))
    .bind(new.avatar.as_deref())
    .bind(new.phone_number.trim())
    .fetch_one(&mut *tx)
    .await?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO employee_information (user_id, employee_id, position, department, employment_type, hire_date,
             hourly_rate_cents, shift_start, shift_end, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING id",
    )
    .bind(user_id)
    .bind(employee_id)
    .bind(new.position.trim())
    .bind(new.department.trim())
    .bind(new.employment_type.as_str())
    .bind(new.hire_date)
    .bind(new.hourly_rate_cents)
    .bind(check_shift("shift start", &new.shift_start)?)
    .bind(check_shift("shift end", &new.shift_end)?)
    .bind(new.notes.as_deref())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(staff_id = %id, %user_id, role = new.role.as_str(), "staff member created");
    get_staff(pool, StaffKey::Id(id)).await
}

/// # Errors
///
/// Returns `NotFound`, `Validation`, `Conflict`, or a database error.
pub async fn update_staff(pool: &PgPool, id: Uuid, update: &StaffUpdate) -> Result<StaffMember, StaffError> {
    let current = get_staff(pool, StaffKey::Id(id)).await?;

    if let Some(first) = update.first_name.as_deref() {
        check_len("first name", first, 1, 50)?;
    }
    if let Some(username) = update.username.as_deref() {
        check_len("username", username, 3, 50)?;
    }
    if let Some(employee_id) = update.employee_id.as_deref() {
        check_len("employee id", employee_id, 1, 20)?;
    }
    if update.role.is_some_and(|r| !r.is_staff()) {
        return Err(StaffError::Validation("staff role cannot be client".into()));
    }
    if update
        .hire_date
        .is_some_and(|d| d > OffsetDateTime::now_utc().date())
    {
        return Err(StaffError::Validation("hire date cannot be in the future".into()));
    }
    let email = match update.email.as_deref() {
        Some(raw) => Some(auth::normalize_email(raw).ok_or_else(|| StaffError::Validation("invalid email".into()))?),
        None => None,
    };
    let shift_start = update
        .shift_start
        .as_deref()
        .map(|s| check_shift("shift start", s))
        .transpose()?;
    let shift_end = update
        .shift_end
        .as_deref()
        .map(|s| check_shift("shift end", s))
        .transpose()?;

    ensure_unique(
        pool,
        email.as_deref(),
        update.username.as_deref().map(str::trim),
        update.employee_id.as_deref().map(str::trim),
        Some(current.user_id),
    )
    .await?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE users SET
             first_name = COALESCE($2, first_name),
             last_name = COALESCE($3, last_name),
             username = COALESCE($4, username),
             email = COALESCE($5, email),
             role = COALESCE($6, role),
             sex = COALESCE($7, sex),
             avatar = COALESCE($8, avatar),
             phone_number = COALESCE($9, phone_number),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(current.user_id)
    .bind(update.first_name.as_deref().map(str::trim))
    .bind(update.last_name.as_deref().map(str::trim))
    .bind(update.username.as_deref().map(str::trim))
    .bind(email.as_deref())
    .bind(update.role.map(Role::as_str))
    .bind(update.sex.map(Sex::as_str))
    .bind(update.avatar.as_deref())
    .bind(update.phone_number.as_deref())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE employee_information SET
             employee_id = COALESCE($2, employee_id),
             position = COALESCE($3, position),
             department = COALESCE($4, department),
             employment_type = COALESCE($5, employment_type),
             hire_date = COALESCE($6, hire_date),
             hourly_rate_cents = COALESCE($7, hourly_rate_cents),
             shift_start = COALESCE($8, shift_start),
             shift_end = COALESCE($9, shift_end),
             notes = COALESCE($10, notes),
             updated_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(update.employee_id.as_deref().map(str::trim))
    .bind(update.position.as_deref().map(str::trim))
    .bind(update.department.as_deref().map(str::trim))
    .bind(update.employment_type.map(EmploymentType::as_str))
    .bind(update.hire_date)
    .bind(update.hourly_rate_cents)
    .bind(shift_start)
    .bind(shift_end)
    .bind(update.notes.as_deref())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    if update.role.is_some_and(|r| r != current.role) {
        session::delete_user_sessions(pool, current.user_id).await?;
    }
    info!(staff_id = %id, "staff member updated");
    get_staff(pool, StaffKey::Id(id)).await
}

/// Disable the account and employee record; open sessions are revoked.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub async fn deactivate_staff(pool: &PgPool, id: Uuid) -> Result<StaffMember, StaffError> {
    let current = get_staff(pool, StaffKey::Id(id)).await?;
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE employee_information SET is_active = FALSE, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE users SET is_active = FALSE, updated_at = now() WHERE id = $1")
        .bind(current.user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(current.user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    info!(staff_id = %id, user_id = %current.user_id, "staff member deactivated");
    get_staff(pool, StaffKey::Id(id)).await
}

/// Remove the staff member and their user account.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub async fn delete_staff(pool: &PgPool, id: Uuid) -> Result<(), StaffError> {
    let current = get_staff(pool, StaffKey::Id(id)).await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(current.user_id)
        .execute(pool)
        .await?;
    info!(staff_id = %id, user_id = %current.user_id, "staff member deleted");
    Ok(())
}

#[cfg(test)]
#[path = "staff_test.rs"]
mod tests;
