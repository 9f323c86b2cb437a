use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xca, 0xfe, 0xbe, 0xef]), "cafebeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// full_name
// =============================================================================

#[test]
fn full_name_joins_parts() {
    assert_eq!(full_name("Ada", "Lovelace"), "Ada Lovelace");
}

#[test]
fn full_name_without_last_name() {
    assert_eq!(full_name("Ada", ""), "Ada");
    assert_eq!(full_name(" Ada ", "  "), "Ada");
}

// =============================================================================
// SessionUser
// =============================================================================

#[test]
fn session_user_serializes_role_lowercase() {
    let user = SessionUser {
        id: Uuid::nil(),
        name: "Sam Barista".into(),
        email: "sam@astrobrew.test".into(),
        role: Role::Barista,
        avatar: None,
    };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["role"], "barista");
    assert_eq!(json["name"], "Sam Barista");
    assert!(json["avatar"].is_null());
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn create_validate_delete_round_trip() {
    let state = crate::state::test_helpers::live_app_state().await;
    let email = format!("session-{}@astrobrew.test", Uuid::new_v4());
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (first_name, username, email, password_hash, role) VALUES ('Live', $1, $1, 'x$y', 'cook') RETURNING id",
    )
    .bind(&email)
    .fetch_one(&state.pool)
    .await
    .unwrap();

    let token = create_session(&state.pool, user_id, 1).await.unwrap();
    let user = validate_session(&state.pool, &token).await.unwrap().unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.role, Role::Cook);

    delete_session(&state.pool, &token).await.unwrap();
    assert!(validate_session(&state.pool, &token).await.unwrap().is_none());
}
