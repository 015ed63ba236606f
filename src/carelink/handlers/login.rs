use super::{session::session_cookie, DASHBOARD_PATH, LOGIN_PATH};
use crate::backend::SignInOutcome;
use crate::carelink::state::{SharedBackend, SiteConfig};
use axum::{
    extract::{Extension, Form},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Reason a login attempt bounced back to the login page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginError {
    MissingCredentials,
    InvalidCredentials,
    Unavailable,
}

impl LoginError {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unavailable => "unavailable",
        }
    }

    #[must_use]
    pub fn redirect_path(self) -> String {
        format!("{LOGIN_PATH}?error={}", self.as_str())
    }

    /// Redirect to the site's login page with this error code.
    #[must_use]
    pub fn redirect(self, config: &SiteConfig) -> Response {
        Redirect::to(&config.page_url(&self.redirect_path())).into_response()
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /dashboard with a session cookie, or to the site's /login?error=<reason>")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    backend: Extension<SharedBackend>,
    config: Extension<SiteConfig>,
    payload: Option<Form<LoginForm>>,
) -> Response {
    let Some(Form(form)) = payload else {
        debug!("Missing login payload");
        return LoginError::MissingCredentials.redirect(&config);
    };

    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        debug!("Missing email or password");
        return LoginError::MissingCredentials.redirect(&config);
    }

    let password = SecretString::from(form.password);

    match backend.sign_in(email, &password).await {
        Ok(SignInOutcome::Authenticated(session)) => {
            let cookie = match session_cookie(
                &config,
                session.access_token.expose_secret(),
                session.expires_in,
            ) {
                Ok(cookie) => cookie,
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    return LoginError::Unavailable.redirect(&config);
                }
            };

            info!(user_id = %session.user.id, "Login successful");

            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);

            (headers, Redirect::to(DASHBOARD_PATH)).into_response()
        }

        Ok(SignInOutcome::Rejected) => {
            debug!("Login rejected");
            LoginError::InvalidCredentials.redirect(&config)
        }

        Err(err) => {
            error!("Login failed: {err:#}");
            LoginError::Unavailable.redirect(&config)
        }
    }
}
