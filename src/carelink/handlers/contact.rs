use super::session::{lookup_user, SessionUser};
use crate::backend::{ContactMessage, User};
use crate::carelink::state::SharedBackend;
use axum::{
    extract::{Extension, Form},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill in all required fields.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again later.";
pub const SUCCESS_MESSAGE: &str = "Thank you for your message! We'll get back to you soon.";

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Whitespace-only values count as missing.
    #[must_use]
    pub fn missing_required(&self) -> bool {
        [&self.name, &self.email, &self.subject, &self.message]
            .iter()
            .any(|value| value.trim().is_empty())
    }

    /// Attach the submitting user's id and role, both `None` for anonymous visitors.
    #[must_use]
    pub fn into_message(self, user: Option<&User>) -> ContactMessage {
        ContactMessage {
            name: self.name,
            email: self.email,
            phone: self.phone.filter(|phone| !phone.trim().is_empty()),
            subject: self.subject,
            message: self.message,
            role: user.and_then(|user| user.role.clone()),
            user_id: user.map(|user| user.id),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ContactResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContactResponse {
    fn ok() -> Self {
        Self {
            success: true,
            message: Some(SUCCESS_MESSAGE.to_string()),
            error: None,
        }
    }

    fn failed(error: &str) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/contact",
    request_body(content = ContactForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Message stored", body = ContactResponse),
        (status = 400, description = "Required field missing", body = ContactResponse),
        (status = 500, description = "Message could not be stored", body = ContactResponse)
    ),
    tag = "contact"
)]
#[instrument(skip_all)]
pub async fn contact(
    headers: HeaderMap,
    backend: Extension<SharedBackend>,
    payload: Option<Form<ContactForm>>,
) -> impl IntoResponse {
    let form = payload.map(|Form(form)| form).unwrap_or_default();

    if form.missing_required() {
        debug!("Contact form missing required fields");

        return (
            StatusCode::BAD_REQUEST,
            Json(ContactResponse::failed(REQUIRED_FIELDS_MESSAGE)),
        );
    }

    // Identity lookup failures degrade to an anonymous submission.
    let session_user = match lookup_user(&headers, backend.0.as_ref()).await {
        Ok(session_user) => session_user,
        Err(err) => {
            warn!("Failed to resolve current user, submitting anonymously: {err:#}");
            None
        }
    };

    let user = session_user.as_ref().map(|session_user| &session_user.user);
    let token = session_user
        .as_ref()
        .map(|SessionUser { token, .. }| token.as_str());

    let message = form.into_message(user);

    match backend.insert_contact_message(&message, token).await {
        Ok(()) => {
            info!(
                authenticated = message.user_id.is_some(),
                "Contact message stored"
            );

            (StatusCode::OK, Json(ContactResponse::ok()))
        }

        Err(err) => {
            error!("Failed to store contact message: {err:#}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ContactResponse::failed(GENERIC_FAILURE_MESSAGE)),
            )
        }
    }
}
