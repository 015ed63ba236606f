#![allow(clippy::needless_for_each)]

use crate::cli::telemetry;
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    response::Json,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;
mod state;

pub use state::{SharedBackend, SiteConfig};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::login::login,
        handlers::session::logout,
        handlers::session::session,
        handlers::dashboard::dashboard,
        handlers::contact::contact,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::login::LoginForm,
        handlers::session::SessionResponse,
        handlers::contact::ContactForm,
        handlers::contact::ContactResponse,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "auth", description = "Login, logout and dashboard routing"),
        (name = "contact", description = "Contact form submissions")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router with its middleware stack.
///
/// # Errors
/// Returns an error if the site URL cannot be turned into a CORS origin.
pub fn app(backend: SharedBackend, config: SiteConfig) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(config.origin()?))
        .allow_credentials(true);

    let app = Router::new()
        .route("/v1/auth/login", post(handlers::login))
        .route("/v1/auth/logout", post(handlers::logout))
        .route("/v1/auth/session", get(handlers::session))
        .route("/v1/contact", post(handlers::contact))
        .route("/dashboard", get(handlers::dashboard))
        .route("/api-docs/openapi.json", get(|| async { Json(openapi()) }))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(backend))
                .layer(Extension(config)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, backend: SharedBackend, config: SiteConfig) -> Result<()> {
    let app = app(backend, config)?;

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry::shutdown_tracer();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_routes() {
        let doc = openapi();
        assert!(doc.paths.paths.contains_key("/v1/auth/login"));
        assert!(doc.paths.paths.contains_key("/v1/auth/logout"));
        assert!(doc.paths.paths.contains_key("/v1/auth/session"));
        assert!(doc.paths.paths.contains_key("/v1/contact"));
        assert!(doc.paths.paths.contains_key("/dashboard"));
        assert!(doc.paths.paths.contains_key("/health"));

        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "contact"));
    }
}
