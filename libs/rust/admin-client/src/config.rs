//! Client configuration.
//!
//! Defaults match the admin panel's production settings. Values can be
//! overridden programmatically or loaded from the environment (a `.env`
//! file is honoured).

use crate::error::ConfigError;
use crate::http::HttpConfig;
use crate::retry::RetryConfig;
use std::env;
use std::time::Duration;
use url::Url;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default path of the credential refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";

/// Complete configuration of an [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL relative request paths are joined onto
    pub base_url: Url,
    /// HTTP transport settings
    pub http: HttpConfig,
    /// Transient failure retry settings
    pub retry: RetryConfig,
    /// Path of the refresh endpoint, also used to recognise refresh calls
    pub refresh_path: String,
    /// Window in which repeated session-termination notices are suppressed
    pub unauthorized_debounce: Duration,
    /// Grace delay before signing the session out
    pub logout_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            unauthorized_debounce: Duration::from_secs(3),
            logout_delay: Duration::from_millis(500),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

impl ClientConfig {
    /// Create a configuration for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Self::default()
        })
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("ADMIN_API_URL") {
            Some(url) => Url::parse(&url)?,
            None => defaults.base_url,
        };
        let timeout = parse_millis(&lookup, "ADMIN_API_TIMEOUT_MS", defaults.http.timeout)?;
        let max_retries = parse_var(&lookup, "ADMIN_API_MAX_RETRIES", defaults.retry.max_retries)?;
        let retry_delay = parse_millis(&lookup, "ADMIN_API_RETRY_DELAY_MS", defaults.retry.delay)?;
        let unauthorized_debounce = parse_millis(
            &lookup,
            "ADMIN_API_UNAUTHORIZED_DEBOUNCE_MS",
            defaults.unauthorized_debounce,
        )?;
        let logout_delay = parse_millis(&lookup, "ADMIN_API_LOGOUT_DELAY_MS", defaults.logout_delay)?;
        let refresh_path = lookup("ADMIN_API_REFRESH_PATH").unwrap_or(defaults.refresh_path);

        Ok(Self {
            base_url,
            http: defaults.http.with_timeout(timeout),
            retry: RetryConfig::default()
                .with_max_retries(max_retries)
                .with_delay(retry_delay),
            refresh_path,
            unauthorized_debounce,
            logout_delay,
        })
    }

    /// Set the HTTP transport settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Set the retry settings.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the refresh endpoint path.
    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Set the unauthorized notice debounce window.
    #[must_use]
    pub const fn with_unauthorized_debounce(mut self, window: Duration) -> Self {
        self.unauthorized_debounce = window;
        self
    }

    /// Set the sign-out grace delay.
    #[must_use]
    pub const fn with_logout_delay(mut self, delay: Duration) -> Self {
        self.logout_delay = delay;
        self
    }

    /// Resolve a request path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is not valid.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
        resolve_url(&self.base_url, path)
    }

    /// Absolute URL of the refresh endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh path does not form a valid URL.
    pub fn refresh_url(&self) -> Result<Url, ConfigError> {
        self.resolve(&self.refresh_path)
    }

    /// Whether `url` targets the refresh endpoint.
    #[must_use]
    pub fn is_refresh_url(&self, url: &str) -> bool {
        !self.refresh_path.is_empty() && url.contains(self.refresh_path.as_str())
    }
}

/// Join `path` onto `base`, keeping any path prefix of the base.
///
/// Absolute URLs are returned unchanged.
///
/// # Errors
///
/// Returns an error if the result is not a valid URL.
pub fn resolve_url(base: &Url, path: &str) -> Result<Url, ConfigError> {
    if let Ok(absolute) = Url::parse(path) {
        return Ok(absolute);
    }
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

/// Parse a variable with a default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid_value(name, e.to_string())),
        None => Ok(default),
    }
}

/// Parse a millisecond duration variable with a default value.
fn parse_millis<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_var(lookup, name, default_ms).map(Duration::from_millis)
}
