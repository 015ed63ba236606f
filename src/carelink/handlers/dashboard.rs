use super::{
    login::LoginError,
    session::{lookup_user, SessionUser},
    HOME_PATH, LOGIN_PATH,
};
use crate::carelink::state::{SharedBackend, SiteConfig};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, instrument, warn};

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 303, description = "Redirect to the site's /dashboard/{role}, /login without a session, or / when the role is unknown")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn dashboard(
    headers: HeaderMap,
    backend: Extension<SharedBackend>,
    config: Extension<SiteConfig>,
) -> Response {
    let target = match lookup_user(&headers, backend.0.as_ref()).await {
        Ok(Some(SessionUser { user, .. })) => {
            if let Some(role) = user.role() {
                role.dashboard_path()
            } else {
                warn!(user_id = %user.id, role = ?user.role, "User has no dashboard role");
                HOME_PATH.to_string()
            }
        }

        Ok(None) => LOGIN_PATH.to_string(),

        Err(err) => {
            error!("Failed to resolve dashboard user: {err:#}");
            return LoginError::Unavailable.redirect(&config);
        }
    };

    Redirect::to(&config.page_url(&target)).into_response()
}
