//! Interaction primitives.
//!
//! [`PageUtils`] wraps a [`PageDriver`] with bounded waits, the fixed-interval
//! retry contract and per-attempt logging. Page objects compose these
//! primitives and never call the driver directly.

use crate::config::{Config, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS};
use crate::driver::PageDriver;
use crate::logging::Logger;
use crate::result::{SondeoError, SondeoResult};
use crate::selector::SelectorChain;
use crate::retry::{
    retry, retry_if, RetryExhausted, RetryPolicy, DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS,
};
use crate::wait::{poll_until, ElementState, LoadState, UrlPattern, WaitOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Options for one interaction primitive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOptions {
    /// Per-attempt wait for the element
    pub timeout: Duration,
    /// Attempt budget; zero or negative means one attempt
    pub retries: i32,
    /// Skip the visibility wait and actionability checks
    pub force: bool,
    /// Read typed values back and compare
    pub validate: bool,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            retries: DEFAULT_MAX_ATTEMPTS as i32,
            force: false,
            validate: false,
        }
    }
}

impl ActionOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-attempt timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    /// Set the attempt budget
    #[must_use]
    pub const fn with_retries(mut self, retries: i32) -> Self {
        self.retries = retries;
        self
    }

    /// Skip waits and actionability checks
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Validate typed values
    #[must_use]
    pub const fn validated(mut self) -> Self {
        self.validate = true;
        self
    }
}

fn exhausted(selector: &str, e: RetryExhausted<SondeoError>) -> SondeoError {
    SondeoError::Interaction {
        selector: selector.to_string(),
        attempts: e.attempts,
        source: Box::new(e.last_error),
    }
}

/// Interaction primitives over one page
#[derive(Debug, Clone)]
pub struct PageUtils {
    driver: Arc<dyn PageDriver>,
    logger: Logger,
    results_dir: PathBuf,
    defaults: ActionOptions,
    navigation_timeout: Duration,
    backoff: Duration,
}

impl PageUtils {
    /// Primitives with library defaults
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, logger: Logger) -> Self {
        Self {
            driver,
            logger,
            results_dir: PathBuf::from("test-results"),
            defaults: ActionOptions::default(),
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }

    /// Primitives with timeouts and directories from the run configuration
    #[must_use]
    pub fn from_config(driver: Arc<dyn PageDriver>, logger: Logger, config: &Config) -> Self {
        Self {
            results_dir: config.results_dir.clone(),
            defaults: ActionOptions::default().with_timeout(config.action_timeout_ms),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            ..Self::new(driver, logger)
        }
    }

    /// Set where screenshots are written
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set the delay between attempts
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    /// Logger used for every attempt
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Default options derived from configuration
    #[must_use]
    pub const fn defaults(&self) -> ActionOptions {
        self.defaults
    }

    /// Screenshot and artifact directory
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Timeout applied to each navigation attempt
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    fn policy(&self, options: &ActionOptions) -> RetryPolicy {
        RetryPolicy::from_retries(options.retries).with_backoff(self.backoff)
    }

    // =========================================================================
    // RETRIED ACTIONS
    // =========================================================================

    /// Click with a visibility wait per attempt.
    ///
    /// # Errors
    ///
    /// [`SondeoError::Interaction`] naming the selector and attempt count once
    /// the budget is exhausted.
    pub async fn safe_click(&self, selector: &str, options: &ActionOptions) -> SondeoResult<()> {
        self.safe_click_chain(&SelectorChain::from(selector), options)
            .await
    }

    /// Click the first candidate of a chain to become visible.
    ///
    /// Every attempt waits on all candidates, so a fallback that renders
    /// after the call started is still clicked. Errors name the primary.
    pub async fn safe_click_chain(
        &self,
        chain: &SelectorChain,
        options: &ActionOptions,
    ) -> SondeoResult<()> {
        let primary = chain.primary().to_locator();
        let primary = primary.as_str();
        let policy = self.policy(options);
        let max_attempts = policy.max_attempts();
        retry(&policy, |attempt| async move {
            let outcome = self.click_once(chain, options).await;
            let failure = outcome.as_ref().err().map(ToString::to_string);
            self.logger.interaction(
                "click",
                outcome.as_deref().unwrap_or(primary),
                attempt,
                max_attempts,
                failure.as_deref(),
            );
            outcome
        })
        .await
        .map(|_| ())
        .map_err(|e| exhausted(primary, e))
    }

    async fn target(
        &self,
        chain: &SelectorChain,
        options: &ActionOptions,
    ) -> SondeoResult<String> {
        if options.force {
            chain.resolve(self.driver.as_ref()).await
        } else {
            chain
                .wait_for(self.driver.as_ref(), ElementState::Visible, options.timeout)
                .await
        }
    }

    async fn click_once(
        &self,
        chain: &SelectorChain,
        options: &ActionOptions,
    ) -> SondeoResult<String> {
        let locator = self.target(chain, options).await?;
        self.driver.click(&locator, options.force).await?;
        Ok(locator)
    }

    /// Clear and fill an input, optionally reading the value back.
    ///
    /// # Errors
    ///
    /// [`SondeoError::TypeValidation`] when validation is on and the field
    /// holds something else (not retried), otherwise
    /// [`SondeoError::Interaction`] after the budget is exhausted.
    pub async fn safe_type(
        &self,
        selector: &str,
        text: &str,
        options: &ActionOptions,
    ) -> SondeoResult<()> {
        self.safe_type_chain(&SelectorChain::from(selector), text, options)
            .await
    }

    /// Type into the first candidate of a chain to become visible
    pub async fn safe_type_chain(
        &self,
        chain: &SelectorChain,
        text: &str,
        options: &ActionOptions,
    ) -> SondeoResult<()> {
        let primary = chain.primary().to_locator();
        let primary = primary.as_str();
        let policy = self.policy(options);
        let max_attempts = policy.max_attempts();
        retry_if(
            &policy,
            |attempt| async move {
                let outcome = self.type_once(chain, text, options).await;
                let failure = outcome.as_ref().err().map(ToString::to_string);
                self.logger.interaction(
                    "type",
                    outcome.as_deref().unwrap_or(primary),
                    attempt,
                    max_attempts,
                    failure.as_deref(),
                );
                outcome
            },
            |e| !matches!(e, SondeoError::TypeValidation { .. }),
        )
        .await
        .map(|_| ())
        .map_err(|e| match e.last_error {
            SondeoError::TypeValidation { .. } => e.last_error,
            _ => exhausted(primary, e),
        })
    }

    async fn type_once(
        &self,
        chain: &SelectorChain,
        text: &str,
        options: &ActionOptions,
    ) -> SondeoResult<String> {
        let locator = self.target(chain, options).await?;
        self.driver.clear(&locator).await?;
        self.driver.fill(&locator, text).await?;
        if options.validate {
            let actual = self.driver.input_value(&locator).await?;
            if actual != text {
                return Err(SondeoError::TypeValidation {
                    selector: locator,
                    expected: text.to_string(),
                    actual,
                });
            }
        }
        Ok(locator)
    }

    /// Navigate to an absolute URL, retried like clicks
    pub async fn navigate(&self, url: &str) -> SondeoResult<()> {
        self.logger.navigation(url);
        let policy = self.policy(&self.defaults);
        let max_attempts = policy.max_attempts();
        let start = Instant::now();
        retry(&policy, |attempt| async move {
            let outcome = self.driver.goto(url, self.navigation_timeout).await;
            let failure = outcome.as_ref().err().map(ToString::to_string);
            self.logger
                .interaction("navigate", url, attempt, max_attempts, failure.as_deref());
            outcome
        })
        .await
        .map_err(|e| exhausted(url, e))?;
        self.logger.performance("navigation", start.elapsed());
        Ok(())
    }

    // =========================================================================
    // WAITS
    // =========================================================================

    /// Wait for `domcontentloaded` and `networkidle` together.
    ///
    /// A `domcontentloaded` failure propagates. A `networkidle` wait that
    /// fails or outlives `timeout` is logged as a warning and the call still
    /// succeeds.
    pub async fn wait_for_page_load(&self, timeout: Duration) -> SondeoResult<()> {
        let start = Instant::now();
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let dom = async {
            tokio::time::timeout(
                timeout,
                self.driver
                    .wait_for_load_state(LoadState::DomContentLoaded, timeout),
            )
            .await
            .map_err(|_| SondeoError::timeout(timeout_ms, "page load"))?
        };
        let idle = tokio::time::timeout(
            timeout,
            self.driver.wait_for_load_state(LoadState::NetworkIdle, timeout),
        );
        let (dom, idle) = tokio::join!(dom, idle);
        dom?;
        match idle {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self
                .logger
                .warn(&format!("network did not become idle, continuing: {e}")),
            Err(_) => self.logger.warn(&format!(
                "network did not become idle within {timeout_ms}ms, continuing"
            )),
        }
        self.logger.performance("page load", start.elapsed());
        Ok(())
    }

    /// Wait for an element state
    pub async fn wait_for_element(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> SondeoResult<()> {
        self.driver.wait_for_selector(selector, state, timeout).await
    }

    /// Wait until the current URL matches, returning it
    pub async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> SondeoResult<String> {
        let options =
            WaitOptions::new().with_timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        poll_until(&options, &format!("URL matching {pattern}"), || async move {
            let url = self.driver.current_url().await?;
            Ok(pattern.matches(&url).then_some(url))
        })
        .await
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Text content of an element, empty when it has none
    pub async fn get_text(&self, selector: &str) -> SondeoResult<String> {
        self.driver
            .wait_for_selector(selector, ElementState::Attached, self.defaults.timeout)
            .await?;
        Ok(self
            .driver
            .text_content(selector)
            .await?
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    /// Attribute of an element
    pub async fn get_attribute(&self, selector: &str, name: &str) -> SondeoResult<Option<String>> {
        self.driver
            .wait_for_selector(selector, ElementState::Attached, self.defaults.timeout)
            .await?;
        self.driver.get_attribute(selector, name).await
    }

    /// Current value of an input
    pub async fn get_value(&self, selector: &str) -> SondeoResult<String> {
        self.driver
            .wait_for_selector(selector, ElementState::Attached, self.defaults.timeout)
            .await?;
        self.driver.input_value(selector).await
    }

    /// Visibility check; never fails
    pub async fn is_visible(&self, selector: &str) -> bool {
        self.driver.is_visible(selector).await.unwrap_or_else(|e| {
            tracing::debug!(selector, error = %e, "visibility check failed");
            false
        })
    }

    /// Enabled check; never fails
    pub async fn is_enabled(&self, selector: &str) -> bool {
        self.driver.is_enabled(selector).await.unwrap_or_else(|e| {
            tracing::debug!(selector, error = %e, "enabled check failed");
            false
        })
    }

    /// Trimmed text of an element if it exists right now; never waits or fails
    pub async fn text_if_present(&self, selector: &str) -> Option<String> {
        match self.driver.text_content(selector).await {
            Ok(text) => Some(text.unwrap_or_default().trim().to_string()),
            Err(_) => None,
        }
    }

    /// Current URL
    pub async fn current_url(&self) -> SondeoResult<String> {
        self.driver.current_url().await
    }

    /// Document title
    pub async fn title(&self) -> SondeoResult<String> {
        self.driver.title().await
    }

    // =========================================================================
    // OTHER ACTIONS
    // =========================================================================

    /// Scroll an element into view
    pub async fn scroll_into_view(&self, selector: &str) -> SondeoResult<()> {
        self.driver
            .wait_for_selector(selector, ElementState::Attached, self.defaults.timeout)
            .await?;
        self.driver.scroll_into_view(selector).await
    }

    /// Hover over an element
    pub async fn hover(&self, selector: &str) -> SondeoResult<()> {
        self.driver
            .wait_for_selector(selector, ElementState::Visible, self.defaults.timeout)
            .await?;
        self.driver.hover(selector).await
    }

    /// Select an option by value
    pub async fn select_option(&self, selector: &str, value: &str) -> SondeoResult<()> {
        self.driver
            .wait_for_selector(selector, ElementState::Visible, self.defaults.timeout)
            .await?;
        self.driver.select_option(selector, value).await
    }

    /// Check or uncheck a checkbox
    pub async fn set_checked(&self, selector: &str, checked: bool) -> SondeoResult<()> {
        self.driver
            .wait_for_selector(selector, ElementState::Visible, self.defaults.timeout)
            .await?;
        self.driver.set_checked(selector, checked).await
    }

    /// Write a PNG to `<results>/screenshots/<name>-<timestamp>.png`
    pub async fn take_screenshot(&self, name: &str) -> SondeoResult<PathBuf> {
        let png = self.driver.screenshot().await?;
        let dir = self.results_dir.join("screenshots");
        tokio::fs::create_dir_all(&dir).await?;
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let path = dir.join(format!("{}-{stamp}.png", sanitize_file_name(name)));
        tokio::fs::write(&path, png).await?;
        self.logger.info(&format!("screenshot saved to {}", path.display()));
        Ok(path)
    }

    /// History back
    pub async fn go_back(&self) -> SondeoResult<()> {
        self.driver.go_back().await?;
        self.log_location().await;
        Ok(())
    }

    /// History forward
    pub async fn go_forward(&self) -> SondeoResult<()> {
        self.driver.go_forward().await?;
        self.log_location().await;
        Ok(())
    }

    /// Reload the page
    pub async fn refresh(&self) -> SondeoResult<()> {
        self.driver.reload().await?;
        self.log_location().await;
        Ok(())
    }

    async fn log_location(&self) {
        if let Ok(url) = self.driver.current_url().await {
            self.logger.navigation(&url);
        }
    }
}

/// Keep screenshot names filesystem-safe
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "screenshot".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::logging::LogCategory;

    fn setup(driver: MockDriver) -> (Arc<MockDriver>, PageUtils, Logger) {
        let driver = Arc::new(driver);
        let logger = Logger::capturing();
        let utils = PageUtils::new(driver.clone(), logger.scoped("interaction"));
        (driver, utils, logger)
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = ActionOptions::default();
            assert_eq!(options.timeout, Duration::from_secs(10));
            assert_eq!(options.retries, 3);
            assert!(!options.force);
            assert!(!options.validate);
        }

        #[test]
        fn test_from_config_uses_action_timeout() {
            let config = Config::default().with_action_timeout(2500);
            let utils = PageUtils::from_config(Arc::new(MockDriver::new()), Logger::new(), &config);
            assert_eq!(utils.defaults().timeout, Duration::from_millis(2500));
            assert_eq!(utils.results_dir(), config.results_dir.as_path());
        }
    }

    mod click_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_zero_match_exhausts_two_attempts_one_second_apart() {
            let (_driver, utils, logger) = setup(MockDriver::new());
            let options = ActionOptions::new().with_retries(2).with_timeout(100);
            let start = Instant::now();

            let err = utils.safe_click("#missing", &options).await.unwrap_err();

            match &err {
                SondeoError::Interaction {
                    selector, attempts, ..
                } => {
                    assert_eq!(selector, "#missing");
                    assert_eq!(*attempts, 2);
                }
                other => panic!("expected Interaction, got {other:?}"),
            }
            // 100ms wait, 1s backoff, 100ms wait
            assert_eq!(start.elapsed(), Duration::from_millis(1200));

            let events = logger.events_in(LogCategory::Interaction);
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].field("attempt"), Some("1"));
            assert_eq!(events[1].field("attempt"), Some("2"));
            assert!(events.iter().all(|e| e.field("outcome") == Some("failure")));
        }

        #[tokio::test(start_paused = true)]
        async fn test_chain_clicks_fallback_rendered_after_call() {
            let (driver, utils, logger) = setup(MockDriver::new());
            let chain = SelectorChain::new(crate::selector::Selector::test_id("login-button"))
                .or(".login-btn");
            let late = driver.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                late.add_element(".login-btn", MockElement::new("button"));
            });

            utils
                .safe_click_chain(&chain, &ActionOptions::default())
                .await
                .unwrap();

            assert!(driver.was_called("click:.login-btn"));
            let events = logger.events_in(LogCategory::Interaction);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].field("selector"), Some(".login-btn"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_chain_exhaustion_names_primary() {
            let (_driver, utils, _logger) = setup(MockDriver::new());
            let chain = SelectorChain::new(crate::selector::Selector::test_id("login-button"))
                .or(".login-btn");
            let err = utils
                .safe_click_chain(&chain, &ActionOptions::new().with_retries(1).with_timeout(100))
                .await
                .unwrap_err();
            match err {
                SondeoError::Interaction { selector, .. } => {
                    assert_eq!(selector, "[data-testid=\"login-button\"]");
                }
                other => panic!("expected Interaction, got {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_non_positive_retries_mean_one_attempt() {
            for retries in [0, -1] {
                let (driver, utils, _logger) = setup(MockDriver::new());
                let options = ActionOptions::new().with_retries(retries).with_timeout(50);
                let err = utils.safe_click("#missing", &options).await.unwrap_err();
                assert!(matches!(err, SondeoError::Interaction { attempts: 1, .. }));
                assert_eq!(driver.call_count("wait_for_selector:#missing"), 1);
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_flaky_click_recovers() {
            let (driver, utils, logger) =
                setup(MockDriver::new().with_element("#submit", MockElement::new("button")));
            driver.fail_clicks("#submit", 2);

            utils
                .safe_click("#submit", &ActionOptions::default())
                .await
                .unwrap();

            assert_eq!(driver.call_count("click:#submit"), 3);
            let events = logger.events_in(LogCategory::Interaction);
            assert_eq!(events.last().unwrap().field("outcome"), Some("success"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_force_skips_visibility_wait() {
            let (driver, utils, _logger) =
                setup(MockDriver::new().with_element("#hidden", MockElement::new("button").hidden()));
            utils
                .safe_click("#hidden", &ActionOptions::new().forced())
                .await
                .unwrap();
            assert!(!driver.was_called("wait_for_selector"));
        }
    }

    mod type_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_type_replaces_value() {
            let (driver, utils, _logger) = setup(
                MockDriver::new().with_element("#q", MockElement::new("input").with_value("old")),
            );
            utils
                .safe_type("#q", "new query", &ActionOptions::new().validated())
                .await
                .unwrap();
            assert_eq!(driver.element("#q").unwrap().value, "new query");
        }

        #[tokio::test(start_paused = true)]
        async fn test_validation_mismatch_is_not_retried() {
            let (driver, utils, _logger) = setup(
                MockDriver::new().with_element("#zip", MockElement::new("input").with_max_length(5)),
            );
            let err = utils
                .safe_type("#zip", "123456", &ActionOptions::new().validated())
                .await
                .unwrap_err();
            match err {
                SondeoError::TypeValidation {
                    expected, actual, ..
                } => {
                    assert_eq!(expected, "123456");
                    assert_eq!(actual, "12345");
                }
                other => panic!("expected TypeValidation, got {other:?}"),
            }
            assert_eq!(driver.call_count("fill:#zip"), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_without_validation_mismatch_passes() {
            let (_driver, utils, _logger) = setup(
                MockDriver::new().with_element("#zip", MockElement::new("input").with_max_length(5)),
            );
            utils
                .safe_type("#zip", "123456", &ActionOptions::default())
                .await
                .unwrap();
        }
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_logs_and_moves() {
            let (driver, utils, logger) = setup(MockDriver::new());
            utils.navigate("http://app/login").await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "http://app/login");
            assert_eq!(logger.events_in(LogCategory::Navigation).len(), 1);
            assert_eq!(logger.events_in(LogCategory::Performance).len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigate_retries_then_fails() {
            let (driver, utils, _logger) = setup(MockDriver::new());
            driver.fail_navigation("http://down/");
            let err = utils.navigate("http://down/").await.unwrap_err();
            assert!(matches!(err, SondeoError::Interaction { attempts: 3, .. }));
            assert_eq!(driver.call_count("goto:http://down/"), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_history() {
            let (_driver, utils, _logger) = setup(MockDriver::new());
            utils.navigate("http://app/a").await.unwrap();
            utils.navigate("http://app/b").await.unwrap();
            utils.go_back().await.unwrap();
            assert_eq!(utils.current_url().await.unwrap(), "http://app/a");
            utils.go_forward().await.unwrap();
            utils.refresh().await.unwrap();
            assert_eq!(utils.current_url().await.unwrap(), "http://app/b");
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_url() {
            let (driver, utils, _logger) = setup(MockDriver::new());
            driver.set_url("http://app/dashboard");
            let url = utils
                .wait_for_url(&UrlPattern::regex("/dashboard"), Duration::from_millis(100))
                .await
                .unwrap();
            assert_eq!(url, "http://app/dashboard");
            let err = utils
                .wait_for_url(&UrlPattern::regex("/settings"), Duration::from_millis(100))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }
    }

    mod page_load_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_network_idle_timeout_is_only_a_warning() {
            let (driver, utils, logger) = setup(MockDriver::new());
            driver.set_network_idle(false);
            utils
                .wait_for_page_load(Duration::from_millis(200))
                .await
                .unwrap();
            assert!(logger
                .events()
                .iter()
                .any(|e| e.message.contains("network did not become idle")));
        }

        #[tokio::test(start_paused = true)]
        async fn test_network_idle_reported_past_deadline_is_only_a_warning() {
            let (driver, utils, logger) = setup(MockDriver::new());
            driver.set_network_idle(false);
            driver.set_network_idle_overrun(Duration::from_millis(53));
            let start = Instant::now();

            utils
                .wait_for_page_load(Duration::from_millis(200))
                .await
                .unwrap();

            assert_eq!(start.elapsed(), Duration::from_millis(200));
            assert!(logger
                .events()
                .iter()
                .any(|e| e.message.contains("network did not become idle within 200ms")));
        }

        #[tokio::test(start_paused = true)]
        async fn test_dom_content_loaded_failure_propagates() {
            let (driver, utils, _logger) = setup(MockDriver::new());
            driver.set_dom_content_loaded(false);
            let err = utils
                .wait_for_page_load(Duration::from_millis(200))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }
    }

    mod query_tests {
        use super::*;

        fn page() -> MockDriver {
            MockDriver::new()
                .with_element(
                    "#welcome",
                    MockElement::new("h1")
                        .with_text("  Welcome, Alice  ")
                        .with_attribute("data-user", "alice"),
                )
                .with_element("#save", MockElement::new("button").disabled())
        }

        #[tokio::test(start_paused = true)]
        async fn test_text_and_attribute() {
            let (_driver, utils, _logger) = setup(page());
            assert_eq!(utils.get_text("#welcome").await.unwrap(), "Welcome, Alice");
            assert_eq!(
                utils.get_attribute("#welcome", "data-user").await.unwrap(),
                Some("alice".to_string())
            );
            assert_eq!(utils.get_attribute("#welcome", "title").await.unwrap(), None);
        }

        #[tokio::test(start_paused = true)]
        async fn test_boolean_queries_never_fail() {
            let (driver, utils, _logger) = setup(page());
            assert!(utils.is_visible("#welcome").await);
            assert!(!utils.is_visible("#missing").await);
            assert!(!utils.is_enabled("#save").await);
            assert!(!utils.is_enabled("#missing").await);

            driver.close().await.unwrap();
            assert!(!utils.is_visible("#welcome").await);
            assert!(!utils.is_enabled("#welcome").await);
        }
    }

    mod screenshot_tests {
        use super::*;

        #[tokio::test]
        async fn test_screenshot_path_layout() {
            let dir = tempfile::tempdir().unwrap();
            let (_driver, utils, _logger) = setup(MockDriver::new());
            let utils = utils.with_results_dir(dir.path());

            let path = utils.take_screenshot("login failed").await.unwrap();

            assert_eq!(
                path.parent().unwrap(),
                dir.path().join("screenshots").as_path()
            );
            let file_name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(file_name.starts_with("login_failed-"));
            assert!(file_name.ends_with(".png"));
            assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
        }

        #[test]
        fn test_sanitize() {
            assert_eq!(sanitize_file_name("a/b c"), "a_b_c");
            assert_eq!(sanitize_file_name(""), "screenshot");
        }
    }
}
