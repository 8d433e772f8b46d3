//! Configuration module
//!
//! Static connection parameters for the collaborators (signing backend,
//! metadata store) and the options of the upload workflow. Values come from the
//! environment, with `.env` loaded first.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use crate::models::{Auth, Session};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_SIGNING_PATH: &str = "/generate-signed-url/";
const DEFAULT_USER_ID: &str = "local";
const DEFAULT_STORAGE_PREFIX: &str = "uploads";
const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_CONNECTIONS: u32 = 5;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const RECORD_FEED_LIMIT: i64 = 50;

/// How the signing request proves the caller's session.
///
/// The two variants are mutually exclusive: a request carries either the
/// shared key or the session's bearer token, never both.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Shared secret sent as `X-API-Key`
    StaticKey(String),
    /// Bearer token taken from the current session
    BearerToken,
}

impl AuthStrategy {
    /// Credential for a signing request made on behalf of `session`.
    ///
    /// Returns `None` when the strategy needs a bearer token and the session
    /// does not carry one.
    pub fn credential_for(&self, session: &Session) -> Option<Auth> {
        match self {
            AuthStrategy::StaticKey(key) => Some(Auth::XApiKey(key.clone())),
            AuthStrategy::BearerToken => session.token.clone().map(Auth::Bearer),
        }
    }
}

impl std::fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AuthStrategy::StaticKey(_) => f.write_str("StaticKey(<redacted>)"),
            AuthStrategy::BearerToken => f.write_str("BearerToken"),
        }
    }
}

/// Metadata store backing the upload records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordBackend {
    /// Records are not persisted
    None,
    /// Process-local store, lost on exit
    Memory,
    Postgres,
}

impl FromStr for RecordBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(RecordBackend::None),
            "memory" => Ok(RecordBackend::Memory),
            "postgres" | "postgresql" => Ok(RecordBackend::Postgres),
            _ => Err(anyhow::anyhow!("Invalid record backend: {}", s)),
        }
    }
}

impl Display for RecordBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordBackend::None => write!(f, "none"),
            RecordBackend::Memory => write!(f, "memory"),
            RecordBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub signing_path: String,
    pub auth: AuthStrategy,
    /// Bearer token used to establish the session in `BearerToken` mode
    pub session_token: Option<String>,
    /// Session user id in `StaticKey` mode
    pub user_id: String,
    pub http_timeout_secs: u64,
    pub record_backend: RecordBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage_prefix: String,
    pub record_feed_limit: i64,
    /// Reject a second submission while one is in flight. Off by default:
    /// concurrent submissions are otherwise independent of each other.
    pub reject_concurrent_submissions: bool,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_mode = var("DOCDROP_AUTH_MODE")
            .unwrap_or_else(|| "api-key".to_string())
            .to_lowercase();

        let session_token = var("DOCDROP_TOKEN").or_else(|| var("JWT_TOKEN"));

        let auth = match auth_mode.as_str() {
            "api-key" | "api_key" | "key" => {
                let key = var("DOCDROP_API_KEY")
                    .or_else(|| var("API_KEY"))
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "DOCDROP_API_KEY or API_KEY must be set when DOCDROP_AUTH_MODE=api-key"
                        )
                    })?;
                AuthStrategy::StaticKey(key)
            }
            "bearer" | "token" => AuthStrategy::BearerToken,
            other => {
                return Err(anyhow::anyhow!(
                    "DOCDROP_AUTH_MODE must be 'api-key' or 'bearer', got '{}'",
                    other
                ))
            }
        };

        let record_backend = match var("DOCDROP_RECORDS") {
            Some(value) => value.parse()?,
            None => RecordBackend::None,
        };

        let config = ClientConfig {
            api_url: var("DOCDROP_API_URL")
                .or_else(|| var("API_URL"))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            signing_path: var("DOCDROP_SIGNING_PATH")
                .unwrap_or_else(|| DEFAULT_SIGNING_PATH.to_string()),
            auth,
            session_token,
            user_id: var("DOCDROP_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            http_timeout_secs: var("DOCDROP_HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(HTTP_TIMEOUT_SECS),
            record_backend,
            database_url: var("DATABASE_URL"),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_prefix: var("DOCDROP_STORAGE_PREFIX")
                .unwrap_or_else(|| DEFAULT_STORAGE_PREFIX.to_string()),
            record_feed_limit: var("DOCDROP_RECORD_FEED_LIMIT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(RECORD_FEED_LIMIT),
            reject_concurrent_submissions: var("DOCDROP_REJECT_CONCURRENT")
                .map(|s| s.to_lowercase())
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api_url.is_empty() {
            return Err(anyhow::anyhow!("DOCDROP_API_URL must not be empty"));
        }

        if !self.signing_path.starts_with('/') {
            return Err(anyhow::anyhow!("DOCDROP_SIGNING_PATH must start with '/'"));
        }

        if self.auth == AuthStrategy::BearerToken && self.session_token.is_none() {
            return Err(anyhow::anyhow!(
                "DOCDROP_TOKEN or JWT_TOKEN must be set when DOCDROP_AUTH_MODE=bearer"
            ));
        }

        if self.record_backend == RecordBackend::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when DOCDROP_RECORDS=postgres"
                    ))
                }
            }
        }

        if self.record_feed_limit <= 0 {
            return Err(anyhow::anyhow!(
                "DOCDROP_RECORD_FEED_LIMIT must be greater than zero"
            ));
        }

        Ok(())
    }

    /// Full URL of the signing endpoint
    pub fn signing_url(&self) -> String {
        format!("{}{}", self.api_url, self.signing_path)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
