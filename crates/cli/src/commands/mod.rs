//! CLI command implementations.

pub mod admin;
pub mod audit;
pub mod migrate;

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use warden_core::UserId;
use warden_server::services::{Authz, AuthzError};
use warden_server::store::{PgStore, create_pool};

/// Errors shared by commands that talk to the authorization store.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// A command-line argument failed validation.
    #[error("Invalid {0}: {1}")]
    InvalidArgument(&'static str, String),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// The service layer refused or failed the operation.
    #[error(transparent)]
    Authz(#[from] AuthzError),
}

/// Connect to the database named by `WARDEN_DATABASE_URL` and wrap it in
/// the service layer, so operator actions pass the same permission gates
/// and leave the same audit entries as API calls.
pub(crate) async fn authz_from_env() -> Result<Authz, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("WARDEN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("WARDEN_DATABASE_URL"))?;

    tracing::info!("Connecting to warden database...");
    let pool = create_pool(&database_url).await?;

    Ok(Authz::new(Arc::new(PgStore::new(pool))))
}

pub(crate) fn parse_user_id(raw: &str, what: &'static str) -> Result<UserId, CommandError> {
    UserId::parse(raw).map_err(|e| CommandError::InvalidArgument(what, e.to_string()))
}
