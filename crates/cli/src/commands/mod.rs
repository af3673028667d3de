//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod token;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

/// Database URL from `primary_key`, falling back to `DATABASE_URL`.
fn database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
}

/// Connect to the database named by `primary_key`.
///
/// Returns `None` when neither `primary_key` nor `DATABASE_URL` is set.
async fn connect(primary_key: &str) -> Option<Result<PgPool, sqlx::Error>> {
    let url = database_url(primary_key)?;
    Some(PgPool::connect(url.expose_secret()).await)
}
