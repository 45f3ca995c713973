//! HS256 session tokens.
//!
//! A token is `base64url(header).base64url(claims).base64url(hmac)` carrying the
//! user id (`sub`) and an absolute expiry (`exp`, Unix seconds). Verification
//! accepts HS256 only; the header's `alg` is compared before the signature is
//! checked so `none` or asymmetric algorithms can never select a different
//! verification path.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::storage::UserId;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "HS256";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret is empty")]
    MissingSecret,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("unexpected algorithm: {0}")]
    WrongAlgorithm(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
}

/// Issues and verifies session tokens with the process-wide secret.
#[derive(Debug)]
pub struct TokenCodec {
    key: SecretSlice<u8>,
}

impl TokenCodec {
    /// # Errors
    /// Returns [`TokenError::MissingSecret`] for an empty or blank secret.
    pub fn new(secret: &SecretString) -> Result<Self, TokenError> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            key: SecretSlice::from(secret.as_bytes().to_vec()),
        })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.key.expose_secret())
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    /// Sign a token for `user_id` that expires at `expires_at` (Unix seconds).
    ///
    /// # Errors
    /// Returns [`TokenError::Signing`] if the header or claims cannot be encoded.
    pub fn issue(&self, user_id: UserId, expires_at: i64) -> Result<String, TokenError> {
        let header = TokenHeader {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: expires_at,
        };

        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(&claims)?);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify `token` against the current wall-clock time.
    ///
    /// # Errors
    /// See [`TokenCodec::verify_at`].
    pub fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        self.verify_at(token, unix_now())
    }

    /// Verify `token` as of `now` (Unix seconds). Valid only while `now < exp`.
    ///
    /// # Errors
    /// Returns the reason the token was rejected.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<UserId, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let claims_b64 = parts.next().ok_or(TokenError::Malformed)?;
        let signature_b64 = parts.next().ok_or(TokenError::Malformed)?;
        if parts.next().is_some() {
            return Err(TokenError::Malformed);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::WrongAlgorithm(header.alg));
        }

        let signature =
            Base64UrlUnpadded::decode_vec(signature_b64).map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let claims: SessionClaims = b64d_json(claims_b64)?;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| TokenError::Malformed)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(user_id)
    }
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|err| TokenError::Signing(err.to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const NOW: i64 = 1_700_000_000;

    fn codec(secret: &str) -> Result<TokenCodec> {
        Ok(TokenCodec::new(&SecretString::from(secret.to_string()))?)
    }

    fn forge(header: &str, claims: &str, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            Base64UrlUnpadded::encode_string(header.as_bytes()),
            Base64UrlUnpadded::encode_string(claims.as_bytes()),
            Base64UrlUnpadded::encode_string(signature)
        )
    }

    #[test]
    fn issued_token_verifies_before_expiry() -> Result<()> {
        let codec = codec("test-secret")?;
        let token = codec.issue(UserId::new(42), NOW + 60)?;
        assert_eq!(codec.verify_at(&token, NOW), Ok(UserId::new(42)));
        assert_eq!(codec.verify_at(&token, NOW + 59), Ok(UserId::new(42)));
        Ok(())
    }

    #[test]
    fn token_expires_at_exp() -> Result<()> {
        let codec = codec("test-secret")?;
        let token = codec.issue(UserId::new(42), NOW + 60)?;
        assert_eq!(codec.verify_at(&token, NOW + 60), Err(TokenError::Expired));
        assert_eq!(codec.verify_at(&token, NOW + 3600), Err(TokenError::Expired));
        Ok(())
    }

    #[test]
    fn verify_uses_wall_clock() -> Result<()> {
        let codec = codec("test-secret")?;
        let fresh = codec.issue(UserId::new(1), unix_now() + 300)?;
        let stale = codec.issue(UserId::new(1), unix_now() - 1)?;
        assert_eq!(codec.verify(&fresh), Ok(UserId::new(1)));
        assert_eq!(codec.verify(&stale), Err(TokenError::Expired));
        Ok(())
    }

    #[test]
    fn other_secret_is_rejected() -> Result<()> {
        let token = codec("secret-a")?.issue(UserId::new(7), NOW + 60)?;
        assert_eq!(
            codec("secret-b")?.verify_at(&token, NOW),
            Err(TokenError::SignatureMismatch)
        );
        Ok(())
    }

    #[test]
    fn tampered_claims_are_rejected() -> Result<()> {
        let codec = codec("test-secret")?;
        let token = codec.issue(UserId::new(7), NOW + 60)?;
        let mut parts: Vec<&str> = token.split('.').collect();
        let escalated =
            Base64UrlUnpadded::encode_string(br#"{"sub":"1","exp":1700000060}"#);
        parts[1] = &escalated;
        assert_eq!(
            codec.verify_at(&parts.join("."), NOW),
            Err(TokenError::SignatureMismatch)
        );
        Ok(())
    }

    #[test]
    fn none_algorithm_is_rejected() -> Result<()> {
        let codec = codec("test-secret")?;
        let token = forge(
            r#"{"alg":"none","typ":"JWT"}"#,
            r#"{"sub":"1","exp":1800000000}"#,
            b"",
        );
        assert_eq!(
            codec.verify_at(&token, NOW),
            Err(TokenError::WrongAlgorithm("none".to_string()))
        );
        Ok(())
    }

    #[test]
    fn asymmetric_algorithm_is_rejected_even_with_valid_hmac() -> Result<()> {
        let codec = codec("test-secret")?;
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = Base64UrlUnpadded::encode_string(br#"{"sub":"1","exp":1800000000}"#);
        let mut mac = HmacSha256::new_from_slice(b"test-secret")?;
        mac.update(format!("{header}.{claims}").as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        assert_eq!(
            codec.verify_at(&format!("{header}.{claims}.{signature}"), NOW),
            Err(TokenError::WrongAlgorithm("RS256".to_string()))
        );
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() -> Result<()> {
        let codec = codec("test-secret")?;
        let valid = codec.issue(UserId::new(1), NOW + 60)?;
        let cases = [
            String::new(),
            "abc".to_string(),
            "a.b".to_string(),
            format!("{valid}.extra"),
            "!!!.!!!.!!!".to_string(),
            forge("not json", r#"{"sub":"1","exp":1}"#, b"sig"),
        ];
        for token in cases {
            assert_eq!(
                codec.verify_at(&token, NOW),
                Err(TokenError::Malformed),
                "{token:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn non_numeric_subject_is_malformed() -> Result<()> {
        let codec = codec("test-secret")?;
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = Base64UrlUnpadded::encode_string(br#"{"sub":"alice","exp":1800000000}"#);
        let mut mac = HmacSha256::new_from_slice(b"test-secret")?;
        mac.update(format!("{header}.{claims}").as_bytes());
        let signature = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        assert_eq!(
            codec.verify_at(&format!("{header}.{claims}.{signature}"), NOW),
            Err(TokenError::Malformed)
        );
        Ok(())
    }

    #[test]
    fn empty_secret_is_refused() {
        for secret in ["", "   "] {
            assert_eq!(
                TokenCodec::new(&SecretString::from(secret.to_string())).err(),
                Some(TokenError::MissingSecret)
            );
        }
    }

    #[test]
    fn claims_carry_subject_and_expiry() -> Result<()> {
        let token = codec("test-secret")?.issue(UserId::new(99), NOW + 5)?;
        let claims_b64 = token.split('.').nth(1).unwrap_or_default();
        let claims: SessionClaims = b64d_json(claims_b64)?;
        assert_eq!(
            claims,
            SessionClaims {
                sub: "99".to_string(),
                exp: NOW + 5
            }
        );
        Ok(())
    }
}
