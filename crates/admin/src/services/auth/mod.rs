//! Operator access tokens.
//!
//! Operators authenticate with HS256 JWTs minted by the identity issuer
//! (or by `dewdrop-cli token issue`). The back-office only verifies them:
//! signature, expiry, and that the role is a staff role.

mod error;

pub use error::AuthError;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use dewdrop_core::AdminRole;

use crate::models::CurrentAdmin;

/// Default lifetime of tokens minted by [`TokenKeys::issue`].
pub const DEFAULT_TOKEN_HOURS: i64 = 12;

/// JWT claims carried by an operator token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Operator id at the issuer.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    /// Issued at (Unix timestamp seconds).
    pub iat: i64,
    /// Expiration (Unix timestamp seconds).
    pub exp: i64,
}

/// Signing and verification keys for operator tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys").finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Build keys from the shared HS256 secret.
    #[must_use]
    pub fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Mint a token valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue(
        &self,
        sub: &str,
        email: &str,
        name: &str,
        role: AdminRole,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: sub.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::Signing)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired` or `AuthError::InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let data = jsonwebtoken::decode::<AdminClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Verify a token and require a staff role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` for non-staff roles, plus any error
    /// from [`Self::verify`].
    pub fn authenticate(&self, token: &str) -> Result<CurrentAdmin, AuthError> {
        let claims = self.verify(token)?;
        if !claims.role.is_staff() {
            return Err(AuthError::Forbidden(claims.role));
        }
        Ok(CurrentAdmin::try_from(claims)?)
    }
}
