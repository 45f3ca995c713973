//! Auth state and configuration.

use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{
    password::{HashError, PasswordHasher},
    token::TokenCodec,
    validation::ValidPassword,
};

/// Lifetime of a session token and its cookie: 4 hours.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 4 * 60 * 60;
/// Longest accepted session: one year. Keeps `Expires` a real calendar date.
pub const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;
const DEFAULT_HASH_CONCURRENCY: usize = 4;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    secure_cookies: bool,
    hash_concurrency: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            secure_cookies: false,
            hash_concurrency: DEFAULT_HASH_CONCURRENCY,
        }
    }

    /// Clamped to `1..=MAX_SESSION_TTL_SECONDS`.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds.clamp(1, MAX_SESSION_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Clamped to at least one permit.
    #[must_use]
    pub fn with_hash_concurrency(mut self, permits: usize) -> Self {
        self.hash_concurrency = permits.max(1);
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    #[must_use]
    pub fn hash_concurrency(&self) -> usize {
        self.hash_concurrency
    }
}

/// Everything the session handlers share: configuration, the token codec and
/// the password hasher with its admission semaphore.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenCodec,
    hasher: PasswordHasher,
    hash_permits: Arc<Semaphore>,
    decoy_hash: String,
}

impl AuthState {
    /// # Errors
    /// Returns an error if the decoy hash cannot be computed.
    pub fn new(
        config: AuthConfig,
        tokens: TokenCodec,
        hasher: PasswordHasher,
    ) -> Result<Self, HashError> {
        let hash_permits = Arc::new(Semaphore::new(config.hash_concurrency()));
        let decoy_hash = hasher.decoy()?;
        Ok(Self {
            config,
            tokens,
            hasher,
            hash_permits,
            decoy_hash,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Hash on the blocking pool once a permit is available.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the worker task is lost.
    pub async fn hash_password(&self, password: ValidPassword) -> Result<String, HashError> {
        let permit = Arc::clone(&self.hash_permits)
            .acquire_owned()
            .await
            .map_err(|_| HashError::Worker)?;
        let hasher = self.hasher.clone();
        // The permit lives as long as the blocking job, even if the caller is dropped.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            hasher.hash(&password)
        })
        .await
        .map_err(|_| HashError::Worker)?
    }

    /// Check a login attempt. Unknown users are verified against the decoy hash
    /// so both paths cost one argon2 run; they always fail.
    pub async fn verify_login(&self, password: String, stored_hash: Option<String>) -> bool {
        match stored_hash {
            Some(stored_hash) => self.verify_password(password, stored_hash).await,
            None => {
                let _ = self.verify_password(password, self.decoy_hash.clone()).await;
                false
            }
        }
    }

    /// Verify on the blocking pool. A lost worker counts as a mismatch.
    pub async fn verify_password(&self, password: String, stored_hash: String) -> bool {
        let Ok(permit) = Arc::clone(&self.hash_permits).acquire_owned().await else {
            return false;
        };
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            hasher.verify(&password, &stored_hash)
        })
        .await
        .unwrap_or(false)
    }

    /// Refuse every further hash or verify, as if the worker pool were gone.
    #[cfg(test)]
    pub(crate) fn close_hash_permits(&self) {
        self.hash_permits.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::{password::test_hasher, validation::validate_credentials};
    use anyhow::{anyhow, Result};
    use secrecy::SecretString;
    use std::time::Duration;

    fn state(config: AuthConfig) -> Result<AuthState> {
        let tokens = TokenCodec::new(&SecretString::from("test-secret".to_string()))?;
        Ok(AuthState::new(config, tokens, test_hasher())?)
    }

    #[test]
    fn config_defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.session_ttl_seconds(), 14_400);
        assert!(!config.secure_cookies());
        assert_eq!(config.hash_concurrency(), 4);
    }

    #[test]
    fn config_builders_override_defaults() {
        let config = AuthConfig::new()
            .with_session_ttl_seconds(60)
            .with_secure_cookies(true)
            .with_hash_concurrency(0);
        assert_eq!(config.session_ttl_seconds(), 60);
        assert!(config.secure_cookies());
        assert_eq!(config.hash_concurrency(), 1);
    }

    #[test]
    fn session_ttl_is_bounded() {
        let huge = AuthConfig::new().with_session_ttl_seconds(i64::MAX);
        assert_eq!(huge.session_ttl_seconds(), MAX_SESSION_TTL_SECONDS);
        let negative = AuthConfig::new().with_session_ttl_seconds(-5);
        assert_eq!(negative.session_ttl_seconds(), 1);
    }

    #[tokio::test]
    async fn hash_and_verify_on_blocking_pool() -> Result<()> {
        let state = state(AuthConfig::new().with_hash_concurrency(1))?;
        let creds = validate_credentials("alice", "Str0ng!Passw0rd").map_err(|e| anyhow!("{e:?}"))?;
        let hash = state.hash_password(creds.password).await?;
        assert!(
            state
                .verify_password("Str0ng!Passw0rd".to_string(), hash.clone())
                .await
        );
        assert!(!state.verify_password("nope".to_string(), hash).await);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_never_verifies() -> Result<()> {
        let state = state(AuthConfig::new())?;
        assert!(!state.verify_login("Str0ng!Passw0rd".to_string(), None).await);
        Ok(())
    }

    #[tokio::test]
    async fn permits_are_released() -> Result<()> {
        let state = state(AuthConfig::new().with_hash_concurrency(1))?;
        for _ in 0..3 {
            assert!(
                !state
                    .verify_password("x".to_string(), "not-a-hash".to_string())
                    .await
            );
        }
        assert_eq!(state.hash_permits.available_permits(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn dropped_caller_keeps_permit_until_hash_finishes() -> Result<()> {
        let tokens = TokenCodec::new(&SecretString::from("test-secret".to_string()))?;
        // Slow enough that the job outlives the 1 ms timeout below.
        let hasher = PasswordHasher::with_params(16 * 1024, 2, 1)?;
        let state = AuthState::new(AuthConfig::new().with_hash_concurrency(1), tokens, hasher)?;
        let creds = validate_credentials("alice", "Str0ng!Passw0rd").map_err(|e| anyhow!("{e:?}"))?;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(1), state.hash_password(creds.password)).await;
        assert!(abandoned.is_err());
        assert_eq!(state.hash_permits.available_permits(), 0);

        for _ in 0..500 {
            if state.hash_permits.available_permits() == 1 {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(anyhow!("permit never returned after the blocking job"))
    }

    #[tokio::test]
    async fn closed_permits_fail_hashing_and_verification() -> Result<()> {
        let state = state(AuthConfig::new())?;
        let hash = state.hasher.hash(
            &validate_credentials("alice", "Str0ng!Passw0rd")
                .map_err(|e| anyhow!("{e:?}"))?
                .password,
        )?;
        state.close_hash_permits();

        let creds = validate_credentials("alice", "Str0ng!Passw0rd").map_err(|e| anyhow!("{e:?}"))?;
        assert!(matches!(
            state.hash_password(creds.password).await,
            Err(HashError::Worker)
        ));
        assert!(!state.verify_password("Str0ng!Passw0rd".to_string(), hash).await);
        Ok(())
    }
}
