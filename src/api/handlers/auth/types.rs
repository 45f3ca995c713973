//! Request and response payloads for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::ValidationErrors;

/// Form body shared by register and login.
#[derive(ToSchema, Deserialize, Clone)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorResponse {
    pub errors: ValidationErrors,
}
