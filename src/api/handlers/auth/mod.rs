//! Registration, login and per-request identity.
//!
//! ## Session lifetime
//!
//! A login issues one token valid for `session_ttl_seconds` (4 hours unless
//! configured). The cookie carries the same `Expires`, so the browser drops it
//! when the token stops verifying.
//!
//! > **Warning:** Logout only clears the cookie. A copied token keeps working
//! > until it expires; rotating the signing secret is the only way to revoke
//! > every session at once.

pub(crate) mod identity;
pub(crate) mod password;
pub(crate) mod session;
mod state;
pub(crate) mod token;
pub(crate) mod types;
mod utils;
pub(crate) mod validation;

pub use identity::{resolve_identity, CurrentUser, Identity, SESSION_COOKIE_NAME};
pub use password::{HashError, PasswordHasher};
pub use state::{AuthConfig, AuthState, DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS};
pub use token::{TokenCodec, TokenError};
pub use types::MessageResponse;
pub use validation::ValidationErrors;

#[cfg(test)]
pub(crate) use password::test_hasher;
