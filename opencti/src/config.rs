//! Connection settings for an OpenCTI platform.

use crate::error::{add_error, return_multiple_errors, ClientError as Error};
use std::{env, time::Duration};
use url::Url;

pub const ENV_URL: &str = "OPENCTI_URL";
pub const ENV_TOKEN: &str = "OPENCTI_TOKEN";
pub const ENV_SSL_VERIFY: &str = "OPENCTI_SSL_VERIFY";
pub const ENV_TIMEOUT_SECS: &str = "OPENCTI_TIMEOUT_SECS";

/// Default timeout applied to every remote call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings needed to reach an OpenCTI platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the platform, e.g. `https://opencti.example.org`
    pub url: String,
    /// API token, sent as a Bearer token
    pub token: String,
    /// Whether TLS certificates are verified
    pub ssl_verify: bool,
    /// Timeout of a single remote call
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a new configuration with certificate verification on and the default timeout
    pub fn new(url: &str, token: &str) -> Self {
        Self {
            url: url.to_string(),
            token: token.to_string(),
            ssl_verify: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set whether TLS certificates are verified
    pub fn ssl_verify(mut self, ssl_verify: bool) -> Self {
        self.ssl_verify = ssl_verify;
        self
    }

    /// Set the timeout of a single remote call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load a configuration from the environment, reading a `.env` file first if one is present.
    ///
    /// `OPENCTI_URL` and `OPENCTI_TOKEN` are required. `OPENCTI_SSL_VERIFY` (default `true`) and
    /// `OPENCTI_TIMEOUT_SECS` (default 60) are optional.
    pub fn from_env() -> Result<Self, Error> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::ConfigError(format!("could not load .env file: {e}")));
            }
        }

        let url = env::var(ENV_URL).map_err(|_| Error::ConfigError(format!("{ENV_URL} is not set")))?;
        let token =
            env::var(ENV_TOKEN).map_err(|_| Error::ConfigError(format!("{ENV_TOKEN} is not set")))?;
        let mut config = ClientConfig::new(&url, &token);

        if let Ok(raw) = env::var(ENV_SSL_VERIFY) {
            config.ssl_verify = parse_bool(&raw)
                .ok_or_else(|| Error::ConfigError(format!("{ENV_SSL_VERIFY} is not a boolean: {raw}")))?;
        }
        if let Ok(raw) = env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.parse().map_err(|_| {
                Error::ConfigError(format!("{ENV_TIMEOUT_SECS} is not a number of seconds: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to build a transport
    ///
    /// Every problem found is reported, as a single error or as `MultipleErrors`.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        if self.token.trim().is_empty() {
            errors.push(Error::ConfigError("API token is empty".to_string()));
        }
        if self.timeout.is_zero() {
            errors.push(Error::ConfigError("timeout must be positive".to_string()));
        }
        add_error(&mut errors, self.graphql_endpoint());
        return_multiple_errors(errors)
    }

    /// The URL of the GraphQL endpoint of the platform
    pub fn graphql_endpoint(&self) -> Result<Url, Error> {
        let mut base = Url::parse(&self.url)
            .map_err(|e| Error::ConfigError(format!("invalid platform URL {}: {e}", self.url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::ConfigError(format!(
                "unsupported URL scheme {}",
                base.scheme()
            )));
        }
        // Joining replaces the last path segment unless the base ends with a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("graphql")
            .map_err(|e| Error::ConfigError(format!("invalid platform URL {}: {e}", self.url)))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
