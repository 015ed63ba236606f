//! Seams to the hosted backend-as-a-service.
//!
//! Handlers only see the [`IdentityProvider`] and [`Datastore`] traits. The
//! production implementation is [`SupabaseClient`]; tests plug in fakes.

pub mod supabase;

pub use supabase::SupabaseClient;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Table that receives contact form submissions.
pub const CONTACT_MESSAGES_TABLE: &str = "contact_messages";

/// Dashboard audiences. Stored as a lowercase label in user metadata.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Senior,
    Family,
    Volunteer,
    Provider,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Senior => "senior",
            Self::Family => "family",
            Self::Volunteer => "volunteer",
            Self::Provider => "provider",
        }
    }

    /// Parse a metadata label, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "senior" => Some(Self::Senior),
            "family" => Some(Self::Family),
            "volunteer" => Some(Self::Volunteer),
            "provider" => Some(Self::Provider),
            _ => None,
        }
    }

    #[must_use]
    pub fn dashboard_path(self) -> String {
        format!("/dashboard/{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated user as reported by the identity service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    /// Raw role label from user metadata, kept even when it is not a known [`Role`].
    pub role: Option<String>,
}

impl User {
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }
}

/// Credential issued by the identity service after a successful sign-in.
#[derive(Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_in: u64,
    pub user: User,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug)]
pub enum SignInOutcome {
    Authenticated(Session),
    /// The identity service refused the credentials.
    Rejected,
}

/// Row written to [`CONTACT_MESSAGES_TABLE`].
///
/// `role` and `user_id` serialize as `null` for anonymous submissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub role: Option<String>,
    pub user_id: Option<Uuid>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in. Refused credentials are [`SignInOutcome::Rejected`], not an error.
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<SignInOutcome>;

    /// Invalidate the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;

    /// Resolve `access_token` to a user; `None` when the token is not accepted.
    async fn current_user(&self, access_token: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Insert one contact message, writing as the session user when a token is given.
    async fn insert_contact_message(
        &self,
        message: &ContactMessage,
        access_token: Option<&str>,
    ) -> Result<()>;
}

/// Everything the HTTP layer needs from the hosted backend.
pub trait Backend: IdentityProvider + Datastore {}

impl<T: IdentityProvider + Datastore> Backend for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use secrecy::ExposeSecret;

    #[test]
    fn role_parse_ignores_case_and_whitespace() {
        assert_eq!(Role::parse("senior"), Some(Role::Senior));
        assert_eq!(Role::parse(" Family "), Some(Role::Family));
        assert_eq!(Role::parse("VOLUNTEER"), Some(Role::Volunteer));
        assert_eq!(Role::parse("provider"), Some(Role::Provider));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn role_dashboard_path() {
        assert_eq!(Role::Senior.dashboard_path(), "/dashboard/senior");
        assert_eq!(Role::Provider.dashboard_path(), "/dashboard/provider");
    }

    #[test]
    fn user_role_keeps_unknown_labels() {
        let user = User {
            id: Uuid::nil(),
            email: None,
            role: Some("caretaker".to_string()),
        };
        assert_eq!(user.role(), None);
        assert_eq!(user.role.as_deref(), Some("caretaker"));
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let session = Session {
            access_token: SecretString::from("access-secret".to_string()),
            refresh_token: Some(SecretString::from("refresh-secret".to_string())),
            expires_in: 3600,
            user: User {
                id: Uuid::nil(),
                email: Some("ann@example.com".to_string()),
                role: None,
            },
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("refresh-secret"));
        assert_eq!(session.access_token.expose_secret(), "access-secret");
    }

    #[test]
    fn anonymous_contact_message_serializes_nulls() -> Result<()> {
        let message = ContactMessage {
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            phone: None,
            subject: "Hello".to_string(),
            message: "Question".to_string(),
            role: None,
            user_id: None,
        };
        let value = serde_json::to_value(&message)?;
        assert!(value["phone"].is_null());
        assert!(value["role"].is_null());
        assert!(value["user_id"].is_null());
        assert_eq!(value["name"], "Ann");
        Ok(())
    }
}
