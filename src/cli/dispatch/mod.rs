//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{backend, ARG_PORT, ARG_SITE_URL};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let site_url = matches
        .get_one::<String>(ARG_SITE_URL)
        .cloned()
        .context("missing required argument: --site-url")?;

    let backend_opts = backend::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        backend_url: backend_opts.url,
        backend_anon_key: backend_opts.anon_key,
        backend_timeout_seconds: backend_opts.timeout_seconds,
        site_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("CARELINK_BACKEND_URL", Some("https://project.supabase.co")),
                ("CARELINK_BACKEND_ANON_KEY", Some("anon-key")),
                ("CARELINK_PORT", Some("8081")),
                ("CARELINK_SITE_URL", Some("https://carelink.care")),
                ("CARELINK_BACKEND_TIMEOUT", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["carelink"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 8081);
                    assert_eq!(args.backend_url, "https://project.supabase.co");
                    assert_eq!(args.backend_anon_key.expose_secret(), "anon-key");
                    assert_eq!(args.backend_timeout_seconds, 10);
                    assert_eq!(args.site_url, "https://carelink.care");
                }
            },
        );
    }
}
