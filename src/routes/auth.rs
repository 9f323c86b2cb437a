//! Auth routes: sign up, login, logout, profile and the navigation gate.

use axum::extract::{FromRef, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use crate::access::{self, GateDecision, Role, RoleGroup};
use crate::routes::{ApiError, ApiResult};
use crate::services::auth::{self as auth_svc, AuthError, AuthSession, Login, ProfileUpdate, SignUp, UserProfile};
use crate::services::session;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Session token from `Authorization: Bearer`, falling back to the cookie.
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }
    let jar = CookieJar::from_headers(headers);
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Authenticated user extracted from the bearer token or session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl AuthUser {
    /// # Errors
    ///
    /// Returns 403 when the user's role is outside `group`.
    pub fn require(&self, group: RoleGroup) -> Result<(), ApiError> {
        if group.contains(self.user.role) {
            Ok(())
        } else {
            Err(ApiError::from(StatusCode::FORBIDDEN))
        }
    }

    /// Managers, or the user acting on their own record.
    ///
    /// # Errors
    ///
    /// Returns 403 otherwise.
    pub fn require_self_or(&self, user_id: uuid::Uuid, group: RoleGroup) -> Result<(), ApiError> {
        if self.user.id == user_id {
            return Ok(());
        }
        self.require(group)
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token })
    }
}

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(token: String, state: &AppState) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(Duration::hours(state.config.session_ttl_hours))
        .build()
}

fn clear_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(Duration::ZERO)
        .build()
}

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Deactivated => StatusCode::FORBIDDEN,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Hash(_) | AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_error(err: AuthError) -> ApiError {
    ApiError::from_service(auth_error_to_status(&err), &err)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/v1/expose/auth/signup`: create a client account and sign in.
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignUp>,
) -> ApiResult<impl IntoResponse> {
    let session = auth_svc::sign_up(&state.pool, &body, state.config.session_ttl_hours)
        .await
        .map_err(auth_error)?;
    let jar = jar.add(session_cookie(session.token.clone(), &state));
    Ok((StatusCode::CREATED, jar, Json(session)))
}

/// `POST /api/v1/expose/auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Login>,
) -> ApiResult<(CookieJar, Json<AuthSession>)> {
    let session = auth_svc::login(&state.pool, &body, state.config.session_ttl_hours)
        .await
        .map_err(auth_error)?;
    let jar = jar.add(session_cookie(session.token.clone(), &state));
    Ok((jar, Json(session)))
}

/// `POST /api/v1/expose/auth/logout`: delete the session if any, always clear the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = token_from_headers(&headers) {
        if let Err(e) = session::delete_session(&state.pool, &token).await {
            tracing::warn!(error = %e, "session delete failed during logout");
        }
    }
    let jar = CookieJar::new().add(clear_cookie(&state));
    (jar, StatusCode::NO_CONTENT)
}

/// `GET /api/v1/secure/user/me`
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `GET /api/v1/secure/user/profile`
pub async fn profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserProfile>> {
    let profile = auth_svc::get_profile(&state.pool, auth.user.id)
        .await
        .map_err(auth_error)?;
    Ok(Json(profile))
}

/// `PUT /api/v1/secure/user/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    let profile = auth_svc::update_profile(&state.pool, auth.user.id, &body)
        .await
        .map_err(auth_error)?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub path: String,
}

/// `GET /api/v1/expose/navigation/check?path=/admin/...`
///
/// Works signed in or out; an invalid or expired token counts as signed out.
pub async fn navigation_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NavigationQuery>,
) -> ApiResult<Json<GateDecision>> {
    let role: Option<Role> = match token_from_headers(&headers) {
        Some(token) => session::validate_session(&state.pool, &token)
            .await?
            .map(|u| u.role),
        None => None,
    };
    Ok(Json(access::gate(&query.path, role)))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
