//! Session-related types for operator authentication.

use serde::{Deserialize, Serialize};

use dewdrop_core::{AdminRole, Email};

use crate::services::auth::AdminClaims;

/// The authenticated operator for the current request.
///
/// Built from verified token claims. HTML pages keep it in the server
/// session after login; API requests rebuild it from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Subject claim of the token that authenticated this operator.
    pub id: String,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    /// Expiry of the underlying token (Unix seconds).
    pub expires_at: i64,
}

impl CurrentAdmin {
    /// Whether the token behind this identity has expired.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

impl TryFrom<AdminClaims> for CurrentAdmin {
    type Error = dewdrop_core::EmailError;

    fn try_from(claims: AdminClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            id: claims.sub,
            email: Email::parse(&claims.email)?,
            name: claims.name,
            role: claims.role,
            expires_at: claims.exp,
        })
    }
}

/// Session keys for operator authentication data.
pub mod keys {
    /// Key for storing the current logged-in operator.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for a one-shot notice shown after a redirect.
    pub const FLASH: &str = "flash";
}

/// A one-shot notice carried across a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// Whether this notice reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == FlashKind::Error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn claims(email: &str) -> AdminClaims {
        AdminClaims {
            sub: "op_1".to_string(),
            email: email.to_string(),
            name: "Ana Ops".to_string(),
            role: AdminRole::Admin,
            iat: 1_000,
            exp: 2_000,
        }
    }

    #[test]
    fn test_current_admin_from_claims() {
        let admin = CurrentAdmin::try_from(claims("ana@dewdrop.skin")).unwrap();
        assert_eq!(admin.id, "op_1");
        assert_eq!(admin.email.as_str(), "ana@dewdrop.skin");
        assert_eq!(admin.expires_at, 2_000);
        assert!(!admin.is_expired(1_999));
        assert!(admin.is_expired(2_000));
    }

    #[test]
    fn test_current_admin_rejects_bad_email() {
        assert!(CurrentAdmin::try_from(claims("not-an-email")).is_err());
    }

    #[test]
    fn test_flash_kind() {
        assert!(Flash::error("nope").is_error());
        assert!(!Flash::success("done").is_error());
    }
}
