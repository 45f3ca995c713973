//! # Jotter
//!
//! `jotter` is a multi-user note-taking service. Users register, log in and then
//! manage their own notes, optionally publishing a snapshot of a note as a public
//! share link.
//!
//! ## Sessions
//!
//! Sessions are stateless. Logging in issues an HS256-signed token carrying the
//! user id and an absolute expiry, stored in the `token` cookie (`HttpOnly`,
//! `Path=/`). Every request passes through the identity middleware, which turns
//! the cookie into an [`Identity`](api::handlers::auth::Identity):
//!
//! - missing, malformed, forged or expired tokens resolve to `Anonymous`;
//! - a valid token resolves to `Authenticated(user_id)`.
//!
//! The middleware never rejects a request. Routes that need a user ask for the
//! [`CurrentUser`](api::handlers::auth::CurrentUser) extractor, which answers
//! `401` for anonymous callers.
//!
//! There is no server-side session state, so logging out only clears the cookie.
//! A copied token stays valid until it expires. Rotating the signing secret
//! invalidates every outstanding token.
//!
//! ## Credentials
//!
//! Usernames are trimmed and lowercased, 4-24 characters of `[a-z0-9._]`.
//! Passwords are 12-128 characters with at least one special character, one
//! uppercase letter, one lowercase letter and one digit. Passwords are stored as
//! Argon2id PHC strings.
//!
//! Failed logins always produce the same response whether the user exists or not.

pub mod api;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
