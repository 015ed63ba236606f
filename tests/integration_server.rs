//! End-to-end flow through the router with the real REST client.
//!
//! A wiremock server stands in for the hosted backend so the suite covers:
//! 1. Password sign-in and the session cookie it sets.
//! 2. Role-based dashboard routing from the cookie.
//! 3. An authenticated contact submission reaching the table endpoint.
//! 4. Logout revoking the token upstream.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use carelink::{
    backend::SupabaseClient,
    carelink::{app, SharedBackend, SiteConfig},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{net::TcpListener, sync::Arc, time::Duration};
use tower::ServiceExt;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const ANON_KEY: &str = "anon-key";
const SITE_URL: &str = "https://carelink.care";
const ACCESS_TOKEN: &str = "access-token-1";
const USER_ID: &str = "0b7a0f65-3a5e-4c0e-8d7e-7b1f7b2c9a11";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn user_json(role: &str) -> Value {
    json!({
        "id": USER_ID,
        "email": "ann@example.com",
        "user_metadata": { "role": role }
    })
}

async fn mount_backend(server: &MockServer, role: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_partial_json(json!({ "email": "ann@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "refresh_token": "refresh-token-1",
            "expires_in": 1800,
            "user": user_json(role),
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(role)))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/contact_messages"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .and(body_partial_json(json!({
            "user_id": USER_ID,
            "role": role,
            "phone": null,
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
}

fn router(server: &MockServer) -> Result<Router> {
    let client = SupabaseClient::new(
        &server.uri(),
        SecretString::from(ANON_KEY.to_string()),
        Duration::from_secs(5),
    )?;
    let backend: SharedBackend = Arc::new(client);
    app(backend, SiteConfig::new(SITE_URL.to_string()))
}

fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn login_dashboard_contact_logout() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind to localhost");
        return Ok(());
    }

    let server = MockServer::start().await;
    mount_backend(&server, "volunteer").await;
    let app = router(&server)?;

    // 1. Sign in.
    let response = app
        .clone()
        .oneshot(form_post(
            "/v1/auth/login",
            "email=ann%40example.com&password=secret",
            None,
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(&response, LOCATION.as_str()), Some("/dashboard"));

    let set_cookie = header_str(&response, SET_COOKIE.as_str())
        .context("login did not set a session cookie")?;
    assert!(set_cookie.contains("Max-Age=1800"));
    assert!(set_cookie.ends_with("; Secure"));
    let cookie = set_cookie
        .split(';')
        .next()
        .context("malformed session cookie")?
        .to_string();
    assert_eq!(cookie, format!("carelink_session={ACCESS_TOKEN}"));

    // 2. Dashboard routes by role.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header(COOKIE, cookie.as_str())
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        header_str(&response, LOCATION.as_str()),
        Some(format!("{SITE_URL}/dashboard/volunteer").as_str())
    );

    // 3. Contact form as the signed-in user.
    let response = app
        .clone()
        .oneshot(form_post(
            "/v1/contact",
            "name=Ann&email=ann%40example.com&phone=&subject=Help&message=Can+I+drive%3F",
            Some(&cookie),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["success"], true);

    // 4. Logout.
    let response = app
        .oneshot(form_post("/v1/auth/logout", "", Some(&cookie))?)
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        header_str(&response, LOCATION.as_str()),
        Some(format!("{SITE_URL}/login").as_str())
    );
    assert!(header_str(&response, SET_COOKIE.as_str())
        .is_some_and(|value| value.starts_with("carelink_session=;")));

    Ok(())
}

#[tokio::test]
async fn rejected_login_and_failed_insert() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping integration test: cannot bind to localhost");
        return Ok(());
    }

    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/contact_messages"))
        .and(header("authorization", format!("Bearer {ANON_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "new row violates row-level security policy"
        })))
        .mount(&server)
        .await;

    let app = router(&server)?;

    let response = app
        .clone()
        .oneshot(form_post(
            "/v1/auth/login",
            "email=ann%40example.com&password=wrong",
            None,
        )?)
        .await?;
    assert_eq!(
        header_str(&response, LOCATION.as_str()),
        Some(format!("{SITE_URL}/login?error=invalid_credentials").as_str())
    );
    assert!(header_str(&response, SET_COOKIE.as_str()).is_none());

    let response = app
        .oneshot(form_post(
            "/v1/contact",
            "name=Ann&email=ann%40example.com&subject=Help&message=Hello",
            None,
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(
        body["error"],
        "Something went wrong. Please try again later."
    );

    Ok(())
}
