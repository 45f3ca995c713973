//! Credential validation rules.
//!
//! Every rule runs on every submission so a single response can list all the
//! problems with a username and password at once. Nothing here touches I/O.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const USERNAME_FIELD: &str = "username";
pub const PASSWORD_FIELD: &str = "password";

pub const USERNAME_MIN_LENGTH: usize = 4;
pub const USERNAME_MAX_LENGTH: usize = 24;
pub const PASSWORD_MIN_LENGTH: usize = 12;
pub const PASSWORD_MAX_LENGTH: usize = 128;

const SPECIAL_CHARACTERS: &str = "~`!@#$%^&*()_-+={[}]|\\:;\"'<,>.?/";

/// Field name to ordered violation messages. Empty means the input was accepted.
#[derive(ToSchema, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the list for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages reported for `field`, empty when the field passed.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }
}

/// A username that passed [`Validator::validate_username`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUsername(String);

impl ValidUsername {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A password that passed [`Validator::validate_password`].
#[derive(Clone)]
pub struct ValidPassword(String);

impl ValidPassword {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ValidPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ValidPassword(***)")
    }
}

/// Username and password that both passed validation.
#[derive(Debug, Clone)]
pub struct ValidCredentials {
    pub username: ValidUsername,
    pub password: ValidPassword,
}

/// Accumulates violations across checks.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    pub fn check_min_length(&mut self, min: usize, value: &str, field: &str) {
        if value.chars().count() < min {
            self.errors
                .add(field, format!("Should be at least {min} characters long"));
        }
    }

    pub fn check_max_length(&mut self, max: usize, value: &str, field: &str) {
        if value.chars().count() > max {
            self.errors
                .add(field, format!("Should be at most {max} characters long"));
        }
    }

    /// Report `message` once if `value` has no character from `group`.
    pub fn check_required_group(&mut self, value: &str, group: &str, message: &str, field: &str) {
        if !value.chars().any(|c| group.contains(c)) {
            self.errors.add(field, message);
        }
    }

    /// Usernames are expected to be normalized (trimmed, lowercased) already.
    pub fn validate_username(&mut self, username: &str) {
        self.check_min_length(USERNAME_MIN_LENGTH, username, USERNAME_FIELD);
        self.check_max_length(USERNAME_MAX_LENGTH, username, USERNAME_FIELD);

        // Empty input is covered by the length rule.
        if !username.is_empty() && !username_charset_ok(username) {
            self.errors.add(
                USERNAME_FIELD,
                "Can only contain lowercase letters, numbers, \".\" or \"_\"",
            );
        }
    }

    pub fn validate_password(&mut self, password: &str) {
        self.check_min_length(PASSWORD_MIN_LENGTH, password, PASSWORD_FIELD);
        self.check_max_length(PASSWORD_MAX_LENGTH, password, PASSWORD_FIELD);

        self.check_required_group(
            password,
            SPECIAL_CHARACTERS,
            "Must contain at least one special character",
            PASSWORD_FIELD,
        );
        self.check_required_group(
            password,
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            "Must contain at least one capital letter",
            PASSWORD_FIELD,
        );
        self.check_required_group(
            password,
            "abcdefghijklmnopqrstuvwxyz",
            "Must contain at least one lowercase letter",
            PASSWORD_FIELD,
        );
        self.check_required_group(
            password,
            "0123456789",
            "Must contain at least one number",
            PASSWORD_FIELD,
        );
    }
}

fn username_charset_ok(username: &str) -> bool {
    Regex::new(r"^[a-z0-9._]+$").is_ok_and(|re| re.is_match(username))
}

/// Run every username and password rule.
///
/// # Errors
/// Returns all violations when any rule fails.
pub fn validate_credentials(
    username: &str,
    password: &str,
) -> Result<ValidCredentials, ValidationErrors> {
    let mut validator = Validator::new();
    validator.validate_username(username);
    validator.validate_password(password);

    if validator.is_valid() {
        Ok(ValidCredentials {
            username: ValidUsername(username.to_string()),
            password: ValidPassword(password.to_string()),
        })
    } else {
        Err(validator.into_errors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_PASSWORD: &str = "Str0ng!Passw0rd";

    fn errors_for(username: &str, password: &str) -> ValidationErrors {
        validate_credentials(username, password)
            .err()
            .unwrap_or_default()
    }

    #[test]
    fn accepts_valid_credentials() {
        let creds = validate_credentials("alice", GOOD_PASSWORD);
        assert!(creds.is_ok());
        if let Ok(creds) = creds {
            assert_eq!(creds.username.as_str(), "alice");
            assert_eq!(creds.password.as_str(), GOOD_PASSWORD);
        }
    }

    #[test]
    fn accepts_dots_and_underscores() {
        assert!(validate_credentials("j.doe_99", GOOD_PASSWORD).is_ok());
    }

    #[test]
    fn short_passwords_report_length() {
        for password in ["", "A1!a", "Abcdefgh1!x"] {
            let errors = errors_for("alice", password);
            assert!(
                errors
                    .field(PASSWORD_FIELD)
                    .contains(&"Should be at least 12 characters long".to_string()),
                "missing length violation for {password:?}"
            );
        }
    }

    #[test]
    fn long_inputs_report_max_length() {
        let username = "a".repeat(25);
        let password = format!("{}{}", "Aa1!", "x".repeat(125));
        let errors = errors_for(&username, &password);
        assert_eq!(
            errors.field(USERNAME_FIELD),
            ["Should be at most 24 characters long"]
        );
        assert_eq!(
            errors.field(PASSWORD_FIELD),
            ["Should be at most 128 characters long"]
        );
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert!(validate_credentials("abcd", "Aa1!aaaaaaaa").is_ok());
        let password = format!("Aa1!{}", "a".repeat(124));
        assert!(validate_credentials(&"a".repeat(24), &password).is_ok());
    }

    #[test]
    fn username_charset_violation() {
        for username in ["alice!", "al ice", "ALICE", "alice-b", "älice"] {
            let errors = errors_for(username, GOOD_PASSWORD);
            assert_eq!(
                errors.field(USERNAME_FIELD),
                ["Can only contain lowercase letters, numbers, \".\" or \"_\""],
                "unexpected errors for {username:?}"
            );
            assert!(errors.field(PASSWORD_FIELD).is_empty());
        }
    }

    #[test]
    fn charset_violation_reported_once() {
        let errors = errors_for("a!b@c#d$", GOOD_PASSWORD);
        assert_eq!(errors.field(USERNAME_FIELD).len(), 1);
    }

    #[test]
    fn empty_input_only_fails_min_length_for_username() {
        let errors = errors_for("", GOOD_PASSWORD);
        assert_eq!(
            errors.field(USERNAME_FIELD),
            ["Should be at least 4 characters long"]
        );
    }

    #[test]
    fn empty_password_reports_every_rule() {
        let errors = errors_for("alice", "");
        assert_eq!(
            errors.field(PASSWORD_FIELD),
            [
                "Should be at least 12 characters long",
                "Must contain at least one special character",
                "Must contain at least one capital letter",
                "Must contain at least one lowercase letter",
                "Must contain at least one number",
            ]
        );
    }

    #[test]
    fn violations_accumulate_across_fields() {
        let errors = errors_for("a!", "password");
        assert_eq!(
            errors.field(USERNAME_FIELD),
            [
                "Should be at least 4 characters long",
                "Can only contain lowercase letters, numbers, \".\" or \"_\"",
            ]
        );
        assert_eq!(
            errors.field(PASSWORD_FIELD),
            [
                "Should be at least 12 characters long",
                "Must contain at least one special character",
                "Must contain at least one capital letter",
                "Must contain at least one number",
            ]
        );
    }

    #[test]
    fn validation_is_deterministic() {
        assert_eq!(errors_for("x", "y"), errors_for("x", "y"));
    }

    #[test]
    fn serializes_as_field_map() -> anyhow::Result<()> {
        let errors = errors_for("ab", GOOD_PASSWORD);
        let value = serde_json::to_value(&errors)?;
        assert_eq!(
            value,
            serde_json::json!({ "username": ["Should be at least 4 characters long"] })
        );
        Ok(())
    }

    #[test]
    fn password_debug_is_redacted() {
        let creds = validate_credentials("alice", GOOD_PASSWORD);
        if let Ok(creds) = creds {
            assert!(!format!("{creds:?}").contains(GOOD_PASSWORD));
        }
    }
}
