use super::*;
use time::macros::{date, time};

fn new_staff() -> NewStaff {
    NewStaff {
        first_name: "Sam".into(),
        last_name: "Rivera".into(),
        username: "sam.rivera".into(),
        email: "sam@astrobrew.test".into(),
        password: "espresso-123".into(),
        role: Role::Barista,
        sex: None,
        avatar: None,
        phone_number: "555-0101".into(),
        employee_id: "EMP-0042".into(),
        position: "Senior Barista".into(),
        department: "Kitchen".into(),
        employment_type: EmploymentType::FullTime,
        hire_date: date!(2024 - 03 - 01),
        hourly_rate_cents: Some(1850),
        shift_start: "07:00".into(),
        shift_end: "15:00".into(),
        notes: None,
    }
}

const TODAY: Date = date!(2025 - 08 - 18);

// =============================================================================
// shift times
// =============================================================================

#[test]
fn parse_shift_time_accepts_hh_mm_and_seconds() {
    assert_eq!(parse_shift_time("07:30"), Some(time!(7:30)));
    assert_eq!(parse_shift_time("23:59:59"), Some(time!(23:59:59)));
    assert_eq!(parse_shift_time(" 9:05 "), Some(time!(9:05)));
}

#[test]
fn parse_shift_time_rejects_garbage() {
    assert_eq!(parse_shift_time("24:00"), None);
    assert_eq!(parse_shift_time("7"), None);
    assert_eq!(parse_shift_time("07:60"), None);
    assert_eq!(parse_shift_time("07:00:00:00"), None);
    assert_eq!(parse_shift_time("seven"), None);
}

#[test]
fn format_shift_time_pads() {
    assert_eq!(format_shift_time(time!(7:05)), "07:05");
}

// =============================================================================
// EmploymentType
// =============================================================================

#[test]
fn employment_type_parse_and_serialize() {
    assert_eq!(EmploymentType::parse("part-time"), Some(EmploymentType::PartTime));
    assert_eq!(EmploymentType::parse("INTERN"), Some(EmploymentType::Intern));
    assert_eq!(EmploymentType::parse("volunteer"), None);
    assert_eq!(serde_json::to_value(EmploymentType::FullTime).unwrap(), "FULL_TIME");
}

// =============================================================================
// validate_new_staff
// =============================================================================

#[test]
fn validate_accepts_valid_staff() {
    assert!(validate_new_staff(&new_staff(), TODAY).is_ok());
}

#[test]
fn validate_rejects_client_role() {
    let mut s = new_staff();
    s.role = Role::Client;
    assert!(matches!(validate_new_staff(&s, TODAY), Err(StaffError::Validation(_))));
}

#[test]
fn validate_rejects_future_hire_date() {
    let mut s = new_staff();
    s.hire_date = date!(2025 - 08 - 19);
    assert!(validate_new_staff(&s, TODAY).is_err());
    s.hire_date = TODAY;
    assert!(validate_new_staff(&s, TODAY).is_ok());
}

#[test]
fn validate_rejects_bad_shift_and_email() {
    let mut s = new_staff();
    s.shift_start = "7am".into();
    assert!(validate_new_staff(&s, TODAY).is_err());

    let mut s = new_staff();
    s.email = "sam-at-astrobrew".into();
    assert!(validate_new_staff(&s, TODAY).is_err());
}

#[test]
fn validate_rejects_long_employee_id_and_short_password() {
    let mut s = new_staff();
    s.employee_id = "E".repeat(21);
    assert!(validate_new_staff(&s, TODAY).is_err());

    let mut s = new_staff();
    s.password = "short".into();
    assert!(validate_new_staff(&s, TODAY).is_err());
}

#[test]
fn new_staff_deserializes_iso_hire_date() {
    let body = r#"{
        "first_name": "Kai", "username": "kai", "email": "kai@astrobrew.test", "password": "password99",
        "role": "cook", "employee_id": "EMP-7", "position": "Line Cook", "department": "Kitchen",
        "employment_type": "PART_TIME", "hire_date": "2025-01-15", "shift_start": "10:00", "shift_end": "18:00"
    }"#;
    let parsed: NewStaff = serde_json::from_str(body).unwrap();
    assert_eq!(parsed.hire_date, date!(2025 - 01 - 15));
    assert_eq!(parsed.role, Role::Cook);
    assert!(parsed.last_name.is_empty());
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn create_conflict_deactivate_delete() {
    let state = crate::state::test_helpers::live_app_state().await;
    let tag = Uuid::new_v4().simple().to_string();
    let mut s = new_staff();
    s.username = format!("sam-{tag}");
    s.email = format!("sam-{tag}@astrobrew.test");
    s.employee_id = format!("E-{}", &tag[..8]);

    let created = create_staff(&state.pool, &s).await.unwrap();
    assert!(created.is_active);

    let dup = create_staff(&state.pool, &s).await.unwrap_err();
    assert!(matches!(dup, StaffError::Conflict("email")));

    let deactivated = deactivate_staff(&state.pool, created.id).await.unwrap();
    assert!(!deactivated.is_active);

    delete_staff(&state.pool, created.id).await.unwrap();
    assert!(matches!(get_staff(&state.pool, StaffKey::Id(created.id)).await, Err(StaffError::NotFound)));
}
