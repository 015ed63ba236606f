//! Session cookie helpers plus the logout and session endpoints.

use super::LOGIN_PATH;
use crate::backend::{Backend, User};
use crate::carelink::state::{SharedBackend, SiteConfig};
use anyhow::Result;
use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, CACHE_CONTROL, COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Redirect},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

pub const SESSION_COOKIE_NAME: &str = "carelink_session";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// User resolved from the request's session token.
#[derive(Clone, Debug)]
pub(crate) struct SessionUser {
    pub token: String,
    pub user: User,
}

/// Resolve the session token (cookie or bearer) into a user.
///
/// Returns `Ok(None)` when there is no token or the identity service rejects it.
pub(crate) async fn lookup_user(
    headers: &HeaderMap,
    backend: &dyn Backend,
) -> Result<Option<SessionUser>> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };

    let user = backend.current_user(&token).await?;

    Ok(user.map(|user| SessionUser { token, user }))
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session"),
        (status = 500, description = "Identity service error")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn session(headers: HeaderMap, backend: Extension<SharedBackend>) -> impl IntoResponse {
    match lookup_user(&headers, backend.0.as_ref()).await {
        Ok(Some(SessionUser { user, .. })) => {
            let response = SessionResponse {
                user_id: user.id.to_string(),
                email: user.email,
                role: user.role,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 303, description = "Session cleared, redirect to the site's login page")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    headers: HeaderMap,
    backend: Extension<SharedBackend>,
    config: Extension<SiteConfig>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        match backend.sign_out(&token).await {
            Ok(()) => debug!("Session invalidated"),
            Err(err) => error!("Failed to sign out: {err:#}"),
        }
    }

    // Always clear the cookie, even if the upstream sign-out failed.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(&config) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    // Drop cached dashboard data so the next page load refetches.
    response_headers.insert(
        HeaderName::from_static("clear-site-data"),
        HeaderValue::from_static("\"cache\""),
    );
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    (response_headers, Redirect::to(&config.page_url(LOGIN_PATH)))
}

/// Build a `HttpOnly` cookie carrying the access token for `max_age_seconds`.
pub(crate) fn session_cookie(
    config: &SiteConfig,
    token: &str,
    max_age_seconds: u64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &SiteConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    session_cookie(config, "", 0)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }

    // Browsers may send several Cookie headers over HTTP/2.
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
                .then(|| val.trim().to_string())
        })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
