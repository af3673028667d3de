//! Operator authentication error types.

use thiserror::Error;

use dewdrop_core::AdminRole;

/// Errors that can occur while issuing or verifying operator tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// The token has expired.
    #[error("token has expired")]
    Expired,

    /// The token is malformed, has a bad signature, or lacks required claims.
    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),

    /// The token's email claim is not a valid address.
    #[error("invalid email in token: {0}")]
    InvalidEmail(#[from] dewdrop_core::EmailError),

    /// The token is valid but its role may not use the back-office.
    #[error("role {0} may not use the back-office")]
    Forbidden(AdminRole),

    /// Signing a new token failed.
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::InvalidToken(error),
        }
    }
}
