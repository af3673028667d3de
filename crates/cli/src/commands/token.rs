//! Operator token issuance.
//!
//! Mints the same HS256 bearer token the back-office verifies, signed with
//! `ADMIN_JWT_SECRET`. The token goes to stdout; logs go to stderr.

use thiserror::Error;

use dewdrop_admin::config::{ConfigError, jwt_secret_from_env};
use dewdrop_admin::services::{AuthError, TokenKeys};
use dewdrop_core::{AdminRole, Email};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid role '{0}'. Must be one of: super_admin, admin")]
    InvalidRole(String),

    #[error("hours must be between 1 and {MAX_HOURS} (got {0})")]
    InvalidLifetime(i64),

    #[error("signing failed: {0}")]
    Signing(#[from] AuthError),
}

/// Longest lifetime the CLI will mint.
const MAX_HOURS: i64 = 24 * 30;

/// Validate the role argument. Customer tokens are never minted here.
fn parse_role(role: &str) -> Result<AdminRole, TokenError> {
    role.parse::<AdminRole>()
        .ok()
        .filter(|r| r.is_staff())
        .ok_or_else(|| TokenError::InvalidRole(role.to_string()))
}

fn parse_hours(hours: i64) -> Result<chrono::Duration, TokenError> {
    if !(1..=MAX_HOURS).contains(&hours) {
        return Err(TokenError::InvalidLifetime(hours));
    }
    Ok(chrono::Duration::hours(hours))
}

/// Mint an operator token and print it.
///
/// # Errors
///
/// Returns `TokenError` if an argument is invalid, the secret is missing or
/// weak, or signing fails.
#[allow(clippy::print_stdout)]
pub fn issue(email: &str, name: &str, role: &str, hours: i64) -> Result<(), TokenError> {
    let email = Email::parse(email).map_err(|e| TokenError::InvalidEmail(e.to_string()))?;
    let role = parse_role(role)?;
    let ttl = parse_hours(hours)?;

    let keys = TokenKeys::from_secret(&jwt_secret_from_env()?);
    let token = keys.issue(email.as_str(), email.as_str(), name, role, ttl)?;

    tracing::info!(email = %email, role = %role, hours, "Issued operator token");

    println!("{token}");
    Ok(())
}
