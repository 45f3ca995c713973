//! Argon2id password hashing.
//!
//! Verification fails closed: a stored hash that cannot be parsed, or any error
//! from the comparison itself, is reported as a mismatch.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

use super::validation::ValidPassword;

/// Memory cost in KiB.
pub const DEFAULT_MEMORY_COST: u32 = 64 * 1024;
pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("password hash worker failed")]
    Worker,
}

#[derive(Clone, Debug)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Hasher with the production work factor.
    ///
    /// # Errors
    /// Returns an error if the built-in parameters are rejected by argon2.
    pub fn new() -> Result<Self, HashError> {
        Self::with_params(DEFAULT_MEMORY_COST, DEFAULT_TIME_COST, DEFAULT_PARALLELISM)
    }

    /// # Errors
    /// Returns an error if argon2 rejects the parameters.
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|err| HashError::Params(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a validated password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if the underlying algorithm fails.
    pub fn hash(&self, password: &ValidPassword) -> Result<String, HashError> {
        self.hash_bytes(password.as_str().as_bytes())
    }

    /// A hash of a random secret nobody knows, used to spend the same work on
    /// logins for unknown usernames.
    ///
    /// # Errors
    /// Returns an error if the underlying algorithm fails.
    pub fn decoy(&self) -> Result<String, HashError> {
        self.hash_bytes(SaltString::generate(&mut OsRng).as_str().as_bytes())
    }

    fn hash_bytes(&self, password: &[u8]) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password, &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashError::Hash(err.to_string()))
    }

    /// Check `password` against a stored PHC string.
    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        // Parameters come from the stored hash, not from `self`.
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    // Minimum argon2 cost keeps the suite fast; the algorithm is unchanged.
    match PasswordHasher::with_params(8, 1, 1) {
        Ok(hasher) => hasher,
        Err(err) => panic!("test hasher params rejected: {err}"),
    }
}
