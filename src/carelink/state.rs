//! Shared request state: the backend handle and site settings.

use crate::backend::Backend;
use anyhow::{anyhow, Context, Result};
use axum::http::HeaderValue;
use std::sync::Arc;
use url::Url;

/// Backend handle injected into every handler as an `Extension`.
pub type SharedBackend = Arc<dyn Backend>;

#[derive(Clone, Debug)]
pub struct SiteConfig {
    site_url: String,
}

impl SiteConfig {
    #[must_use]
    pub fn new(site_url: String) -> Self {
        Self { site_url }
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        Url::parse(&self.site_url).is_ok_and(|url| url.scheme() == "https")
    }

    /// Absolute URL of a site page, `path` starting with `/`.
    #[must_use]
    pub fn page_url(&self, path: &str) -> String {
        format!("{}{path}", self.site_url.trim_end_matches('/'))
    }

    /// Origin (`scheme://host[:port]`) allowed by CORS.
    ///
    /// # Errors
    /// Returns an error if the site URL does not parse or has no host.
    pub fn origin(&self) -> Result<HeaderValue> {
        let parsed = Url::parse(&self.site_url)
            .with_context(|| format!("Invalid site URL: {}", self.site_url))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| anyhow!("Site URL must include a valid host: {}", self.site_url))?;
        let port = parsed
            .port()
            .map_or_else(String::new, |port| format!(":{port}"));
        let origin = format!("{}://{}{}", parsed.scheme(), host, port);
        HeaderValue::from_str(&origin).context("Failed to build site origin header")
    }
}
