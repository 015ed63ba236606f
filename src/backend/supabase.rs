//! REST client for the hosted backend (auth at `/auth/v1`, tables at `/rest/v1`).

use super::{
    ContactMessage, Datastore, IdentityProvider, Session, SignInOutcome, User,
    CONTACT_MESSAGES_TABLE,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{fmt, time::Duration};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: WireUser,
}

#[derive(Deserialize)]
struct WireUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

#[derive(Deserialize)]
struct UserMetadata {
    #[serde(default)]
    role: Option<String>,
}

impl From<WireUser> for User {
    fn from(wire: WireUser) -> Self {
        Self {
            id: wire.id,
            email: wire.email,
            role: wire.user_metadata.and_then(|metadata| metadata.role),
        }
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    base_url: Url,
    anon_key: SecretString,
    client: Client,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"***")
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Build a client for the project at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not `http(s)` with a host, or the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString, timeout: Duration) -> Result<Self> {
        let mut url =
            Url::parse(base_url).with_context(|| format!("Invalid backend URL: {base_url}"))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        }

        if url.host_str().is_none() {
            return Err(anyhow!("Error parsing URL: no host specified"));
        }

        // Url::join drops the last path segment unless the base ends with '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            base_url: url,
            anon_key,
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let url = self
            .base_url
            .join(endpoint)
            .with_context(|| format!("Error building endpoint URL for {endpoint}"))?;

        debug!("endpoint URL: {}", url);

        Ok(url)
    }

    fn with_keys(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let anon_key = self.anon_key.expose_secret();
        request
            .header("apikey", anon_key)
            .bearer_auth(bearer.unwrap_or(anon_key))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    #[instrument(skip_all)]
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<SignInOutcome> {
        let mut token_url = self.endpoint_url("auth/v1/token")?;
        token_url.set_query(Some("grant_type=password"));

        let response = self
            .client
            .post(token_url.as_str())
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
            }))
            .send()
            .await
            .with_context(|| format!("Error sending sign-in request to {token_url}"))?;

        match response.status() {
            StatusCode::OK => {
                let token: TokenResponse = response
                    .json()
                    .await
                    .context("Error parsing sign-in response")?;

                Ok(SignInOutcome::Authenticated(Session {
                    access_token: SecretString::from(token.access_token),
                    refresh_token: token.refresh_token.map(SecretString::from),
                    expires_in: token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS),
                    user: token.user.into(),
                }))
            }

            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                let status = response.status();
                let message = error_message(response).await;
                debug!("Sign-in rejected: {} {}", status, message);

                Ok(SignInOutcome::Rejected)
            }

            _ => Err(unexpected(token_url.as_str(), response).await),
        }
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let logout_url = self.endpoint_url("auth/v1/logout")?;

        let response = self
            .with_keys(self.client.post(logout_url.as_str()), Some(access_token))
            .send()
            .await
            .with_context(|| format!("Error sending sign-out request to {logout_url}"))?;

        // An already invalid token leaves nothing to revoke.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        Err(unexpected(logout_url.as_str(), response).await)
    }

    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> Result<Option<User>> {
        let user_url = self.endpoint_url("auth/v1/user")?;

        let response = self
            .with_keys(self.client.get(user_url.as_str()), Some(access_token))
            .send()
            .await
            .with_context(|| format!("Error sending user request to {user_url}"))?;

        match response.status() {
            StatusCode::OK => {
                let user: WireUser = response
                    .json()
                    .await
                    .context("Error parsing user response")?;

                Ok(Some(user.into()))
            }

            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),

            _ => Err(unexpected(user_url.as_str(), response).await),
        }
    }
}

#[async_trait]
impl Datastore for SupabaseClient {
    #[instrument(skip_all, fields(table = CONTACT_MESSAGES_TABLE))]
    async fn insert_contact_message(
        &self,
        message: &ContactMessage,
        access_token: Option<&str>,
    ) -> Result<()> {
        let table_url = self.endpoint_url(&format!("rest/v1/{CONTACT_MESSAGES_TABLE}"))?;

        let response = self
            .with_keys(self.client.post(table_url.as_str()), access_token)
            .header("Prefer", "return=minimal")
            .json(message)
            .send()
            .await
            .with_context(|| format!("Error sending insert request to {table_url}"))?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(unexpected(table_url.as_str(), response).await)
    }
}

async fn unexpected(url: &str, response: Response) -> anyhow::Error {
    let status = response.status();
    let message = error_message(response).await;

    anyhow!("{} - {}, {}", url, status, message)
}

/// Best-effort error text; auth and table endpoints name the field differently.
async fn error_message(response: Response) -> String {
    let Ok(body) = response.json::<Value>().await else {
        return String::new();
    };

    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body[*key].as_str())
        .unwrap_or("")
        .to_string()
}
