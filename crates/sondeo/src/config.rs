//! Environment-scoped configuration.
//!
//! A [`Config`] is resolved once per process: tier defaults for the selected
//! [`Environment`] first, then explicit environment variables on top. The
//! snapshot is passed by reference into every component; nothing reads the
//! environment after startup.

use crate::logging::LogSettings;
use crate::result::{SondeoError, SondeoResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Default browser-level timeout (30 seconds)
pub const DEFAULT_BROWSER_TIMEOUT_MS: u64 = 30_000;

/// Default per-test timeout (60 seconds)
pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 60_000;

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default per-action timeout (10 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Default assertion polling window (5 seconds)
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;

/// Deployment tier the suite runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development servers
    #[default]
    Development,
    /// Shared staging deployment
    Staging,
    /// Production (smoke checks only)
    Production,
}

impl Environment {
    /// Canonical lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = SondeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(SondeoError::config(format!(
                "unknown TEST_ENV '{other}' (expected development, staging or production)"
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved configuration snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Selected tier
    pub environment: Environment,
    /// Base URL of the web application
    pub base_url: String,
    /// Base URL of the REST API
    pub api_url: String,
    /// Run the browser headless
    pub headless: bool,
    /// Parallel worker processes
    pub workers: usize,
    /// Retries per failed test
    pub retries: u32,
    /// Browser-level timeout in milliseconds
    pub browser_timeout_ms: u64,
    /// Per-test timeout in milliseconds
    pub test_timeout_ms: u64,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Per-action timeout in milliseconds
    pub action_timeout_ms: u64,
    /// Assertion polling window in milliseconds
    pub expect_timeout_ms: u64,
    /// Artificial delay between browser operations
    pub slow_mo_ms: u64,
    /// Logging sinks and level
    pub log: LogSettings,
    /// Fixture directory
    pub data_dir: PathBuf,
    /// Screenshots, traces and reports
    pub results_dir: PathBuf,
    /// Notification webhook for run summaries
    pub webhook_url: Option<String>,
    /// Mail relay host for report delivery
    pub smtp_host: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl Config {
    /// Tier defaults for an environment, before any variable overrides
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        let (base_url, api_url, headless, workers, retries) = match environment {
            Environment::Development => (
                "http://localhost:3000",
                "http://localhost:3001/api",
                false,
                1,
                0,
            ),
            Environment::Staging => (
                "https://staging.example.com",
                "https://staging-api.example.com/api",
                true,
                2,
                1,
            ),
            Environment::Production => (
                "https://example.com",
                "https://api.example.com/api",
                true,
                4,
                2,
            ),
        };

        Self {
            environment,
            base_url: base_url.to_string(),
            api_url: api_url.to_string(),
            headless,
            workers,
            retries,
            browser_timeout_ms: DEFAULT_BROWSER_TIMEOUT_MS,
            test_timeout_ms: DEFAULT_TEST_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            expect_timeout_ms: DEFAULT_EXPECT_TIMEOUT_MS,
            slow_mo_ms: 0,
            log: LogSettings::default(),
            data_dir: PathBuf::from("test-data"),
            results_dir: PathBuf::from("test-results"),
            webhook_url: None,
            smtp_host: None,
        }
    }

    /// Resolve from the process environment
    pub fn from_env() -> SondeoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup.
    ///
    /// Tier defaults come from `TEST_ENV`; every other key overrides a single
    /// field. Malformed values are errors, never silently defaulted.
    pub fn from_lookup<F>(lookup: F) -> SondeoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("TEST_ENV") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Environment::Development,
        };
        let mut config = Self::for_environment(environment);

        if let Some(url) = lookup("BASE_URL") {
            config.base_url = url.trim().to_string();
        }
        if let Some(url) = lookup("API_URL") {
            config.api_url = url.trim().to_string();
        }
        if let Some(flag) = lookup("HEADLESS") {
            config.headless = parse_bool("HEADLESS", &flag)?;
        }
        config.workers = parse_or(&lookup, "WORKERS", config.workers)?;
        config.retries = parse_or(&lookup, "RETRIES", config.retries)?;
        config.browser_timeout_ms = required_ms(&lookup, "BROWSER_TIMEOUT", config.browser_timeout_ms)?;
        config.test_timeout_ms = required_ms(&lookup, "TEST_TIMEOUT", config.test_timeout_ms)?;
        config.navigation_timeout_ms =
            parse_or(&lookup, "NAVIGATION_TIMEOUT", config.navigation_timeout_ms)?;
        config.action_timeout_ms = parse_or(&lookup, "ACTION_TIMEOUT", config.action_timeout_ms)?;
        config.expect_timeout_ms = parse_or(&lookup, "EXPECT_TIMEOUT", config.expect_timeout_ms)?;
        config.slow_mo_ms = parse_or(&lookup, "SLOW_MO", config.slow_mo_ms)?;

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log.level = level.trim().to_ascii_lowercase();
        }
        if let Some(flag) = lookup("LOG_CONSOLE") {
            config.log.console = parse_bool("LOG_CONSOLE", &flag)?;
        }
        if let Some(flag) = lookup("LOG_FILE") {
            config.log.file = parse_bool("LOG_FILE", &flag)?;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            config.log.dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RESULTS_DIR") {
            config.results_dir = PathBuf::from(dir);
        }
        config.webhook_url = non_empty(lookup("WEBHOOK_URL"));
        config.smtp_host = non_empty(lookup("SMTP_HOST"));

        config.validate()?;
        Ok(config)
    }

    /// Check the required keys.
    ///
    /// Base URL, browser timeout and test timeout must be present and
    /// non-empty; the run must not start otherwise.
    pub fn validate(&self) -> SondeoResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SondeoError::config("BASE_URL must not be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(SondeoError::config(format!(
                "BASE_URL must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.browser_timeout_ms == 0 {
            return Err(SondeoError::config("BROWSER_TIMEOUT must be greater than zero"));
        }
        if self.test_timeout_ms == 0 {
            return Err(SondeoError::config("TEST_TIMEOUT must be greater than zero"));
        }
        if self.workers == 0 {
            return Err(SondeoError::config("WORKERS must be at least 1"));
        }
        Ok(())
    }

    /// Absolute URL for a path relative to the base URL
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API base URL
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the fixture directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the results directory
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set the assertion polling window
    #[must_use]
    pub const fn with_expect_timeout(mut self, ms: u64) -> Self {
        self.expect_timeout_ms = ms;
        self
    }

    /// Set the per-action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self
    }
}

/// Join a base URL and a path with exactly one slash between them
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> SondeoResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SondeoError::config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> SondeoResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            SondeoError::config(format!("{key} must be a non-negative integer, got '{raw}'"))
        }),
    }
}

fn required_ms<F>(lookup: &F, key: &str, default: u64) -> SondeoResult<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if raw.trim().is_empty() => {
            Err(SondeoError::config(format!("{key} is required and must not be empty")))
        }
        _ => parse_or(lookup, key, default),
    }
}
