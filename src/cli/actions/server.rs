use crate::{backend::SupabaseClient, carelink};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{fmt, sync::Arc, time::Duration};
use tracing::debug;

pub struct Args {
    pub port: u16,
    pub backend_url: String,
    pub backend_anon_key: SecretString,
    pub backend_timeout_seconds: u64,
    pub site_url: String,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("backend_url", &self.backend_url)
            .field("backend_anon_key", &"***")
            .field("backend_timeout_seconds", &self.backend_timeout_seconds)
            .field("site_url", &self.site_url)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the backend client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let backend = SupabaseClient::new(
        &args.backend_url,
        args.backend_anon_key,
        Duration::from_secs(args.backend_timeout_seconds),
    )
    .context("Could not configure backend client")?;

    let config = carelink::SiteConfig::new(args.site_url);

    carelink::new(args.port, Arc::new(backend), config).await
}
