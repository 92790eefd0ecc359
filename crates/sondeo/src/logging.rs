//! Structured, categorized logging.
//!
//! [`init_logging`] installs the process subscriber once (console plus a
//! rolling file sink). [`Logger`] is the handle components receive at
//! construction; it emits `tracing` events tagged with a [`LogCategory`] and
//! can optionally keep an in-memory copy of everything it emitted.

use crate::result::{SondeoError, SondeoResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rotated log files kept on disk
pub const MAX_LOG_FILES: usize = 5;

/// File name prefix of the rolling log
pub const LOG_FILE_PREFIX: &str = "sondeo";

/// Logging sinks and level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Level or full `EnvFilter` directive (`info`, `sondeo=debug,warn`)
    pub level: String,
    /// Write human-readable lines to stderr
    pub console: bool,
    /// Write JSON lines to a rolling file
    pub file: bool,
    /// Directory of the rolling file
    pub dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            file: true,
            dir: PathBuf::from("logs"),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must be held for the life of the run.
pub fn init_logging(settings: &LogSettings) -> SondeoResult<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level).map_err(|e| {
            SondeoError::config(format!("invalid LOG_LEVEL '{}': {e}", settings.level))
        })?,
    };

    let console_layer = settings.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    let (file_layer, guard) = if settings.file {
        std::fs::create_dir_all(&settings.dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(MAX_LOG_FILES)
            .build(&settings.dir)
            .map_err(|e| {
                SondeoError::config(format!(
                    "cannot open log directory {}: {e}",
                    settings.dir.display()
                ))
            })?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_current_span(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SondeoError::config(format!("logging already initialized: {e}")))?;

    Ok(guard)
}

/// Category of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    /// Test step
    Step,
    /// Page navigation
    Navigation,
    /// Assertion outcome
    Assertion,
    /// Timing measurement
    Performance,
    /// Interaction attempt (click, type, ...)
    Interaction,
    /// HTTP request sent
    ApiRequest,
    /// HTTP response received
    ApiResponse,
    /// Anything else
    General,
}

impl LogCategory {
    /// Field value used in emitted events
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Navigation => "navigation",
            Self::Assertion => "assertion",
            Self::Performance => "performance",
            Self::Interaction => "interaction",
            Self::ApiRequest => "api_request",
            Self::ApiResponse => "api_response",
            Self::General => "general",
        }
    }
}

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
}

/// One emitted event, as kept by a capturing [`Logger`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Wall-clock time of emission
    pub timestamp: SystemTime,
    /// Event category
    pub category: LogCategory,
    /// Event level
    pub level: LogLevel,
    /// Component that emitted the event
    pub scope: String,
    /// Event message
    pub message: String,
    /// Structured fields
    pub fields: BTreeMap<String, String>,
}

impl LogEvent {
    /// Look up a field
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Component logging handle
#[derive(Debug, Clone)]
pub struct Logger {
    scope: String,
    capture: Option<Arc<Mutex<Vec<LogEvent>>>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Logger that only forwards to `tracing`
    #[must_use]
    pub fn new() -> Self {
        Self {
            scope: "sondeo".to_string(),
            capture: None,
        }
    }

    /// Logger that also keeps every event in memory
    #[must_use]
    pub fn capturing() -> Self {
        Self {
            scope: "sondeo".to_string(),
            capture: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Child logger for a component; shares the capture buffer
    #[must_use]
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            capture: self.capture.clone(),
        }
    }

    /// Component name attached to events
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Test step
    pub fn step(&self, description: &str) {
        self.emit(LogLevel::Info, LogCategory::Step, description, &[]);
    }

    /// Page navigation
    pub fn navigation(&self, url: &str) {
        self.emit(
            LogLevel::Info,
            LogCategory::Navigation,
            &format!("navigating to {url}"),
            &[("url", url)],
        );
    }

    /// Assertion outcome; logged on pass and on fail
    pub fn assertion(&self, description: &str, passed: bool, expected: &str, actual: &str) {
        let (level, verdict) = if passed {
            (LogLevel::Info, "passed")
        } else {
            (LogLevel::Error, "failed")
        };
        self.emit(
            level,
            LogCategory::Assertion,
            &format!("{description}: {verdict}"),
            &[
                ("passed", if passed { "true" } else { "false" }),
                ("expected", expected),
                ("actual", actual),
            ],
        );
    }

    /// Timing measurement
    pub fn performance(&self, metric: &str, elapsed: Duration) {
        let ms = elapsed.as_millis().to_string();
        self.emit(
            LogLevel::Info,
            LogCategory::Performance,
            &format!("{metric} took {ms}ms"),
            &[("metric", metric), ("duration_ms", &ms)],
        );
    }

    /// One attempt of an interaction primitive
    pub fn interaction(
        &self,
        action: &str,
        selector: &str,
        attempt: u32,
        max_attempts: u32,
        failure: Option<&str>,
    ) {
        let attempt_str = attempt.to_string();
        let max_str = max_attempts.to_string();
        match failure {
            None => self.emit(
                LogLevel::Info,
                LogCategory::Interaction,
                &format!("{action} '{selector}' succeeded on attempt {attempt}/{max_attempts}"),
                &[
                    ("action", action),
                    ("selector", selector),
                    ("attempt", &attempt_str),
                    ("max_attempts", &max_str),
                    ("outcome", "success"),
                ],
            ),
            Some(error) => self.emit(
                LogLevel::Warn,
                LogCategory::Interaction,
                &format!("{action} '{selector}' failed on attempt {attempt}/{max_attempts}"),
                &[
                    ("action", action),
                    ("selector", selector),
                    ("attempt", &attempt_str),
                    ("max_attempts", &max_str),
                    ("outcome", "failure"),
                    ("error", error),
                ],
            ),
        }
    }

    /// HTTP request sent
    pub fn api_request(&self, method: &str, path: &str) {
        self.emit(
            LogLevel::Info,
            LogCategory::ApiRequest,
            &format!("{method} {path}"),
            &[("method", method), ("path", path)],
        );
    }

    /// HTTP response received
    pub fn api_response(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let status_str = status.to_string();
        let ms = elapsed.as_millis().to_string();
        let level = if status >= 400 {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };
        self.emit(
            level,
            LogCategory::ApiResponse,
            &format!("{method} {path} -> {status} ({ms}ms)"),
            &[
                ("method", method),
                ("path", path),
                ("status", &status_str),
                ("duration_ms", &ms),
            ],
        );
    }

    /// Informational message
    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, LogCategory::General, message, &[]);
    }

    /// Warning; execution continues
    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, LogCategory::General, message, &[]);
    }

    /// Error
    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, LogCategory::General, message, &[]);
    }

    /// Captured events (empty unless built with [`Logger::capturing`])
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.capture
            .as_ref()
            .and_then(|c| c.lock().ok().map(|events| events.clone()))
            .unwrap_or_default()
    }

    /// Captured events of one category
    #[must_use]
    pub fn events_in(&self, category: LogCategory) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }

    fn emit(&self, level: LogLevel, category: LogCategory, message: &str, fields: &[(&str, &str)]) {
        let text = |key: &str| fields.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
        let number = |key: &str| text(key).and_then(|v| v.parse::<u64>().ok());
        let cat = category.as_str();
        let scope = self.scope.as_str();

        macro_rules! event_at {
            ($level:ident) => {
                tracing::$level!(
                    category = cat,
                    scope,
                    action = text("action"),
                    selector = text("selector"),
                    attempt = number("attempt"),
                    max_attempts = number("max_attempts"),
                    outcome = text("outcome"),
                    method = text("method"),
                    path = text("path"),
                    url = text("url"),
                    status = number("status"),
                    metric = text("metric"),
                    duration_ms = number("duration_ms"),
                    passed = text("passed").map(|v| v == "true"),
                    expected = text("expected"),
                    actual = text("actual"),
                    error = text("error"),
                    "{message}"
                )
            };
        }
        match level {
            LogLevel::Debug => event_at!(debug),
            LogLevel::Info => event_at!(info),
            LogLevel::Warn => event_at!(warn),
            LogLevel::Error => event_at!(error),
        }

        if let Some(capture) = &self.capture {
            if let Ok(mut events) = capture.lock() {
                events.push(LogEvent {
                    timestamp: SystemTime::now(),
                    category,
                    level,
                    scope: self.scope.clone(),
                    message: message.to_string(),
                    fields: fields
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect(),
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_logger_captures_nothing() {
        let logger = Logger::new();
        logger.step("open login page");
        assert!(logger.events().is_empty());
    }

    #[test]
    fn test_capturing_logger_records_categories() {
        let logger = Logger::capturing();
        logger.step("open login page");
        logger.navigation("http://localhost:3000/login");
        logger.performance("page load", Duration::from_millis(120));
        logger.api_request("GET", "/users");

        let events = logger.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].category, LogCategory::Step);
        assert_eq!(
            events[1].field("url"),
            Some("http://localhost:3000/login")
        );
        assert_eq!(events[2].field("duration_ms"), Some("120"));
        assert_eq!(logger.events_in(LogCategory::ApiRequest).len(), 1);
    }

    #[test]
    fn test_scoped_logger_shares_capture() {
        let root = Logger::capturing();
        let child = root.scoped("LoginPage");
        child.info("hello");
        let events = root.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scope, "LoginPage");
    }

    #[test]
    fn test_assertion_logged_on_pass_and_fail() {
        let logger = Logger::capturing();
        logger.assertion("title equals", true, "Home", "Home");
        logger.assertion("title equals", false, "Home", "Login");
        let events = logger.events_in(LogCategory::Assertion);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1].level, LogLevel::Error);
        assert_eq!(events[1].field("actual"), Some("Login"));
    }

    #[test]
    fn test_interaction_failure_fields() {
        let logger = Logger::capturing();
        logger.interaction("click", "#go", 1, 3, Some("timed out"));
        let event = &logger.events()[0];
        assert_eq!(event.level, LogLevel::Warn);
        assert_eq!(event.field("attempt"), Some("1"));
        assert_eq!(event.field("outcome"), Some("failure"));
        assert_eq!(event.field("error"), Some("timed out"));
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn json_lines(emit: impl FnOnce()) -> Vec<serde_json::Value> {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_json_sink_gets_named_fields() {
        let lines = json_lines(|| {
            let logger = Logger::new().scoped("LoginPage");
            logger.interaction("click", "#go", 2, 3, Some("timed out"));
            logger.api_response("GET", "/users", 404, Duration::from_millis(7));
        });
        assert_eq!(lines.len(), 2);

        let click = &lines[0]["fields"];
        assert_eq!(click["category"], "interaction");
        assert_eq!(click["scope"], "LoginPage");
        assert_eq!(click["selector"], "#go");
        assert_eq!(click["attempt"], 2);
        assert_eq!(click["max_attempts"], 3);
        assert_eq!(click["outcome"], "failure");
        assert_eq!(click["error"], "timed out");
        assert!(click.get("status").is_none());

        let response = &lines[1]["fields"];
        assert_eq!(response["method"], "GET");
        assert_eq!(response["path"], "/users");
        assert_eq!(response["status"], 404);
        assert_eq!(response["duration_ms"], 7);
    }

    #[test]
    fn test_api_response_level_follows_status() {
        let logger = Logger::capturing();
        logger.api_response("GET", "/ok", 200, Duration::from_millis(3));
        logger.api_response("GET", "/missing", 404, Duration::from_millis(3));
        let events = logger.events_in(LogCategory::ApiResponse);
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1].level, LogLevel::Warn);
    }

    #[test]
    fn test_default_settings() {
        let settings = LogSettings::default();
        assert_eq!(settings.level, "info");
        assert!(settings.console);
        assert!(settings.file);
    }
}
