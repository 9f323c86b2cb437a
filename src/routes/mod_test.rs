use super::*;
use crate::state::test_helpers;

/// Serve the router on an ephemeral port backed by a lazy pool.
async fn spawn_app() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let router = app(test_helpers::test_app_state());
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

// =============================================================================
// ApiError / helpers
// =============================================================================

#[test]
fn server_errors_hide_detail() {
    let err = ApiError::from(sqlx::Error::RowNotFound);
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "Internal Server Error");
}

#[test]
fn client_errors_keep_message() {
    let source = crate::services::menu::MenuError::Validation("price must be positive".into());
    let err = ApiError::from_service(StatusCode::BAD_REQUEST, &source);
    assert_eq!(err.message, "price must be positive");
}

#[test]
fn parse_param_blank_is_none_unknown_is_400() {
    assert_eq!(parse_param(None, "x", crate::access::Role::parse).unwrap(), None);
    assert_eq!(parse_param(Some("  "), "x", crate::access::Role::parse).unwrap(), None);
    assert_eq!(
        parse_param(Some("cook"), "role", crate::access::Role::parse).unwrap(),
        Some(crate::access::Role::Cook)
    );
    let err = parse_param(Some("pilot"), "role", crate::access::Role::parse).unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "invalid role: pilot");
}

#[test]
fn limit_query_clamps() {
    assert_eq!(LimitQuery { limit: None }.or(6), 6);
    assert_eq!(LimitQuery { limit: Some(0) }.or(6), 1);
    assert_eq!(LimitQuery { limit: Some(5000) }.or(6), 100);
}

#[test]
fn page_query_defaults() {
    let page = PageQuery::default().request();
    assert_eq!((page.page, page.size), (0, DEFAULT_PAGE_SIZE));
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn healthz_returns_ok() {
    let base = spawn_app().await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn secure_routes_require_a_session() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();
    for path in ["/api/v1/secure/user/me", "/api/v1/secure/orders", "/api/v1/secure/stats/dashboard"] {
        let resp = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn navigation_check_without_session() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let public: serde_json::Value = client
        .get(format!("{base}/api/v1/expose/navigation/check?path=/menu"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(public["decision"], "allow");

    let private: serde_json::Value = client
        .get(format!("{base}/api/v1/expose/navigation/check?path=/admin/managers/staff"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(private["decision"], "login");
    assert_eq!(private["location"], "/authentication");
    assert_eq!(private["redirect"], "/admin/managers/staff");
}

#[tokio::test]
async fn logout_without_session_clears_cookie() {
    let base = spawn_app().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/v1/expose/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
    let cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn bad_menu_type_is_400_before_querying() {
    let base = spawn_app().await;
    let resp = reqwest::get(format!("{base}/api/v1/expose/menu/type/spaceships")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "invalid type: spaceships");
}
