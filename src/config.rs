//! Centralized configuration for the session service.
//!
//! Loaded from environment variables and validated once at startup. The core
//! components receive plain, already-validated values.

use crate::error::SessionError;
use crate::telemetry::TracingConfig;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;

/// Fingerprint store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process map, single replica only
    Memory,
    /// Redis
    Redis {
        /// Connection URL
        url: String,
    },
}

/// Session service configuration.
#[derive(Debug)]
pub struct Config {
    // JWT settings
    /// Issuer claim of access tokens
    pub jwt_issuer: String,
    /// HS512 signing secret
    pub jwt_secret: SecretString,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh credential TTL
    pub refresh_token_ttl: Duration,

    // Fingerprint settings
    /// Process-wide fingerprint salt
    pub fingerprint_salt: SecretString,
    /// PBKDF2 iteration count
    pub fingerprint_iterations: u32,

    // Collaborators
    /// Store backend
    pub store_backend: StoreBackend,
    /// Deadline for store and directory calls
    pub store_timeout: Duration,
    /// Deadline for notifier calls
    pub notifier_timeout: Duration,

    // Observability
    /// Log output settings
    pub tracing: TracingConfig,
}

impl Config {
    /// Configuration with defaults for everything but the secrets.
    pub fn new(jwt_secret: impl Into<String>, fingerprint_salt: impl Into<String>) -> Self {
        Self {
            jwt_issuer: "session-service".to_string(),
            jwt_secret: SecretString::from(jwt_secret.into()),
            access_token_ttl: Duration::from_secs(1800),
            refresh_token_ttl: Duration::from_secs(2_592_000),
            fingerprint_salt: SecretString::from(fingerprint_salt.into()),
            fingerprint_iterations: 100_000,
            store_backend: StoreBackend::Memory,
            store_timeout: Duration::from_millis(2000),
            notifier_timeout: Duration::from_millis(5000),
            tracing: TracingConfig::default().with_service_name("session-service"),
        }
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.jwt_issuer = issuer.into();
        self
    }

    /// Set both TTLs.
    #[must_use]
    pub const fn with_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_ttl = access;
        self.refresh_token_ttl = refresh;
        self
    }

    /// Set the PBKDF2 iteration count.
    #[must_use]
    pub const fn with_fingerprint_iterations(mut self, iterations: u32) -> Self {
        self.fingerprint_iterations = iterations;
        self
    }

    /// Set the store backend.
    #[must_use]
    pub fn with_store_backend(mut self, backend: StoreBackend) -> Self {
        self.store_backend = backend;
        self
    }

    /// Set collaborator deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, store: Duration, notifier: Duration) -> Self {
        self.store_timeout = store;
        self.notifier_timeout = notifier;
        self
    }

    /// Load configuration from environment variables (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, SessionError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| SessionError::config("JWT_SECRET must be set"))?;
        let fingerprint_salt = lookup("FINGERPRINT_SALT")
            .ok_or_else(|| SessionError::config("FINGERPRINT_SALT must be set"))?;

        let mut config = Self::new(jwt_secret, fingerprint_salt);

        if let Some(issuer) = lookup("JWT_ISSUER") {
            config.jwt_issuer = issuer;
        }
        config.access_token_ttl =
            Duration::from_secs(parse_var(&lookup, "ACCESS_TOKEN_TTL", 1800)?);
        config.refresh_token_ttl =
            Duration::from_secs(parse_var(&lookup, "REFRESH_TOKEN_TTL", 2_592_000)?);
        config.fingerprint_iterations = parse_var(&lookup, "FINGERPRINT_ITERATIONS", 100_000)?;

        config.store_backend = match lookup("STORE_BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "redis" => StoreBackend::Redis {
                url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            },
            other => {
                return Err(SessionError::config(format!("Invalid STORE_BACKEND: {other}")));
            }
        };
        config.store_timeout = Duration::from_millis(parse_var(&lookup, "STORE_TIMEOUT_MS", 2000)?);
        config.notifier_timeout =
            Duration::from_millis(parse_var(&lookup, "NOTIFIER_TIMEOUT_MS", 5000)?);

        if let Some(level) = lookup("LOG_LEVEL") {
            config.tracing = config.tracing.with_log_level(level);
        }
        if parse_var(&lookup, "LOG_JSON", false)? {
            config.tracing = config.tracing.with_json_output();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first violation.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(SessionError::config("JWT_SECRET must not be empty"));
        }
        if self.fingerprint_salt.expose_secret().is_empty() {
            return Err(SessionError::config("FINGERPRINT_SALT must not be empty"));
        }
        if self.fingerprint_iterations == 0 {
            return Err(SessionError::config("FINGERPRINT_ITERATIONS must be non-zero"));
        }
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(SessionError::config("Token TTLs must be non-zero"));
        }
        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(SessionError::config(
                "REFRESH_TOKEN_TTL must exceed ACCESS_TOKEN_TTL",
            ));
        }
        if self.store_timeout.is_zero() || self.notifier_timeout.is_zero() {
            return Err(SessionError::config("Timeouts must be non-zero"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, SessionError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| SessionError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
