use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_BACKEND_URL: &str = "backend-url";
pub const ARG_BACKEND_ANON_KEY: &str = "backend-anon-key";
pub const ARG_BACKEND_TIMEOUT: &str = "backend-timeout";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BACKEND_URL)
                .long(ARG_BACKEND_URL)
                .help("Hosted backend project URL, example: https://<project>.supabase.co")
                .env("CARELINK_BACKEND_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_BACKEND_ANON_KEY)
                .long(ARG_BACKEND_ANON_KEY)
                .help("Hosted backend anonymous (public) API key")
                .env("CARELINK_BACKEND_ANON_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_BACKEND_TIMEOUT)
                .long(ARG_BACKEND_TIMEOUT)
                .help("Timeout in seconds for each backend request")
                .env("CARELINK_BACKEND_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub anon_key: SecretString,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required backend argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_BACKEND_URL)
            .cloned()
            .context("missing required argument: --backend-url")?;
        let anon_key = matches
            .get_one::<String>(ARG_BACKEND_ANON_KEY)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --backend-anon-key")?;
        let timeout_seconds = matches
            .get_one::<u64>(ARG_BACKEND_TIMEOUT)
            .copied()
            .unwrap_or(10);

        Ok(Self {
            url,
            anon_key,
            timeout_seconds,
        })
    }
}
