//! # Carelink (session and contact gateway)
//!
//! `carelink` fronts a hosted backend-as-a-service for the care network site.
//! The backend owns identity and storage; this service owns the thin flows on
//! top of it.
//!
//! ## Session flow
//!
//! The login form posts credentials to `/v1/auth/login`. On success the access
//! token issued by the identity service is stored in an `HttpOnly` cookie and
//! the browser is redirected to `/dashboard`, which in turn redirects to the
//! site's dashboard for the user's role (`senior`, `family`, `volunteer`,
//! `provider`).
//! Failed logins redirect to the site's `/login` page with an `error` query
//! parameter. Site pages are addressed through the configured site URL.
//! Logout invalidates the session upstream, clears the cookie and redirects to
//! `/login`.
//!
//! ## Contact submissions
//!
//! `/v1/contact` checks that the required fields are present, attaches the
//! current user's id and role when a session exists, and inserts one row into
//! the `contact_messages` table.

pub mod backend;
pub mod carelink;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
