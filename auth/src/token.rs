//! Signed bearer tokens.
//!
//! Format: `base64url(claims_json) "." base64url(hmac_sha256(secret, claims_b64))`.
//! Claims are `{sub, role, iat, exp}` with Unix-second timestamps. Tokens are
//! stateless: whoever holds the secret can verify them without a session store.

use crate::error::{AuthError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Identity assertion carried by a token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Role name
    pub role: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}

/// Issues and verifies tokens with one HMAC secret
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    /// Create a signer.
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] if the secret is empty or the TTL is not positive.
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::Config("token secret must not be empty".to_string()));
        }
        if ttl <= Duration::zero() {
            return Err(AuthError::Config("token TTL must be positive".to_string()));
        }
        Ok(Self { secret, ttl })
    }

    /// Lifetime of issued tokens
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` with `role`, valid from `now` for the TTL.
    ///
    /// # Errors
    ///
    /// [`AuthError::Crypto`] if the claims cannot be encoded.
    pub fn issue(&self, subject: &str, role: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: subject.to_owned(),
            role: role.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|e| AuthError::Crypto(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] for malformed tokens or bad signatures
    /// - [`AuthError::TokenExpired`] once `now` reaches `exp`
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| AuthError::InvalidToken)?;

        let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)?;

        if now.timestamp() >= claims.exp {
            tracing::debug!(sub = %claims.sub, "Rejected expired token");
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AuthError::Crypto(e.to_string()))
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
