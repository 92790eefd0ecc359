//! Page Object Model Support
//!
//! A page object exposes one screen as named operations. Every page holds a
//! [`BasePage`], which owns the interaction primitives, the base URL and the
//! page's [`SelectorSet`]; concrete pages only add intention-revealing
//! methods on top.
//!
//! Assertions poll until the configured expect timeout and log their
//! outcome whether they pass or fail.

mod routing;

pub use routing::{PageRegistry, UrlMatcher};

use crate::config::{join_url, Config, DEFAULT_EXPECT_TIMEOUT_MS};
use crate::driver::PageDriver;
use crate::interaction::{ActionOptions, PageUtils};
use crate::logging::Logger;
use crate::result::{SondeoError, SondeoResult};
use crate::selector::{SelectorChain, SelectorSet};
use crate::wait::{ElementState, DEFAULT_POLL_INTERVAL_MS};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A page or component of the application under test
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logs
    fn name(&self) -> &str;

    /// Canonical path relative to the base URL
    fn path(&self) -> &str;

    /// Shared page machinery
    fn base(&self) -> &BasePage;

    /// Push the browser to this page's canonical path
    async fn navigate(&self) -> SondeoResult<()> {
        self.base().goto(self.path()).await
    }

    /// Whether the current URL matches this page's path pattern; never fails
    async fn is_current(&self) -> bool {
        match self.base().utils().current_url().await {
            Ok(url) => UrlMatcher::new(self.path()).matches(&url),
            Err(_) => false,
        }
    }

    /// Fail unless the page is showing
    async fn assert_loaded(&self) -> SondeoResult<()>;
}

/// Cross-cutting operations shared by every page
#[derive(Debug, Clone)]
pub struct BasePage {
    utils: PageUtils,
    base_url: String,
    selectors: SelectorSet,
    expect_timeout: Duration,
}

impl BasePage {
    /// Page over existing primitives
    #[must_use]
    pub fn new(utils: PageUtils, base_url: impl Into<String>, selectors: SelectorSet) -> Self {
        Self {
            utils,
            base_url: base_url.into(),
            selectors,
            expect_timeout: Duration::from_millis(DEFAULT_EXPECT_TIMEOUT_MS),
        }
    }

    /// Page configured from the run configuration
    #[must_use]
    pub fn from_config(
        driver: Arc<dyn PageDriver>,
        logger: Logger,
        config: &Config,
        selectors: SelectorSet,
    ) -> Self {
        let utils = PageUtils::from_config(driver, logger, config);
        Self::new(utils, config.base_url.clone(), selectors)
            .with_expect_timeout(Duration::from_millis(config.expect_timeout_ms))
    }

    /// Set the assertion polling window
    #[must_use]
    pub const fn with_expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = timeout;
        self
    }

    /// Interaction primitives
    #[must_use]
    pub const fn utils(&self) -> &PageUtils {
        &self.utils
    }

    /// Logger of this page
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        self.utils.logger()
    }

    /// Selector set of this page
    #[must_use]
    pub const fn selectors(&self) -> &SelectorSet {
        &self.selectors
    }

    /// Base URL of the application
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Resolve a logical element to a locator string right now, without waiting
    pub async fn locator(&self, name: &str) -> SondeoResult<String> {
        self.resolve(self.selectors.get(name)?).await
    }

    /// Wait until some candidate of a logical element reaches `state` and
    /// return its locator
    pub async fn locate(&self, name: &str, state: ElementState) -> SondeoResult<String> {
        self.selectors
            .get(name)?
            .wait_for(
                self.utils.driver().as_ref(),
                state,
                self.utils.defaults().timeout,
            )
            .await
    }

    /// Resolve an ad-hoc chain to a locator string
    pub async fn resolve(&self, chain: &SelectorChain) -> SondeoResult<String> {
        chain.resolve(self.utils.driver().as_ref()).await
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Navigate to a path under the base URL and wait for the page to load
    pub async fn goto(&self, path: &str) -> SondeoResult<()> {
        self.utils.navigate(&self.url_for(path)).await?;
        self.utils
            .wait_for_page_load(self.utils.navigation_timeout())
            .await
    }

    /// Click a logical element with default options
    pub async fn click(&self, name: &str) -> SondeoResult<()> {
        self.click_with(name, &self.utils.defaults()).await
    }

    /// Click a logical element
    pub async fn click_with(&self, name: &str, options: &ActionOptions) -> SondeoResult<()> {
        self.utils
            .safe_click_chain(self.selectors.get(name)?, options)
            .await
    }

    /// Click the element an ad-hoc chain resolves to
    pub async fn click_chain(&self, chain: &SelectorChain) -> SondeoResult<()> {
        self.utils
            .safe_click_chain(chain, &self.utils.defaults())
            .await
    }

    /// Type into a logical element with default options
    pub async fn type_text(&self, name: &str, text: &str) -> SondeoResult<()> {
        self.type_with(name, text, &self.utils.defaults()).await
    }

    /// Type into a logical element
    pub async fn type_with(
        &self,
        name: &str,
        text: &str,
        options: &ActionOptions,
    ) -> SondeoResult<()> {
        self.utils
            .safe_type_chain(self.selectors.get(name)?, text, options)
            .await
    }

    /// Text of a logical element
    pub async fn get_text(&self, name: &str) -> SondeoResult<String> {
        let locator = self.locate(name, ElementState::Attached).await?;
        self.utils.get_text(&locator).await
    }

    /// Attribute of a logical element
    pub async fn get_attribute(&self, name: &str, attribute: &str) -> SondeoResult<Option<String>> {
        let locator = self.locate(name, ElementState::Attached).await?;
        self.utils.get_attribute(&locator, attribute).await
    }

    /// Visibility of a logical element; never fails
    pub async fn is_visible(&self, name: &str) -> bool {
        match self.locator(name).await {
            Ok(locator) => self.utils.is_visible(&locator).await,
            Err(_) => false,
        }
    }

    /// Enabled state of a logical element; never fails
    pub async fn is_enabled(&self, name: &str) -> bool {
        match self.locator(name).await {
            Ok(locator) => self.utils.is_enabled(&locator).await,
            Err(_) => false,
        }
    }

    /// Scroll a logical element into view
    pub async fn scroll_into_view(&self, name: &str) -> SondeoResult<()> {
        let locator = self.locate(name, ElementState::Attached).await?;
        self.utils.scroll_into_view(&locator).await
    }

    /// Hover a logical element
    pub async fn hover(&self, name: &str) -> SondeoResult<()> {
        let locator = self.locate(name, ElementState::Visible).await?;
        self.utils.hover(&locator).await
    }

    /// Check or uncheck a logical checkbox
    pub async fn set_checked(&self, name: &str, checked: bool) -> SondeoResult<()> {
        let locator = self.locate(name, ElementState::Visible).await?;
        self.utils.set_checked(&locator, checked).await
    }

    /// Select an option of a logical `<select>`
    pub async fn select_option(&self, name: &str, value: &str) -> SondeoResult<()> {
        let locator = self.locate(name, ElementState::Visible).await?;
        self.utils.select_option(&locator, value).await
    }

    /// Capture a screenshot under the results directory
    pub async fn screenshot(&self, label: &str) -> SondeoResult<PathBuf> {
        self.utils.take_screenshot(label).await
    }

    /// History back
    pub async fn go_back(&self) -> SondeoResult<()> {
        self.utils.go_back().await
    }

    /// History forward
    pub async fn go_forward(&self) -> SondeoResult<()> {
        self.utils.go_forward().await
    }

    /// Reload
    pub async fn refresh(&self) -> SondeoResult<()> {
        self.utils.refresh().await
    }

    // =========================================================================
    // ASSERTIONS
    // =========================================================================

    /// Poll `observe` until it reports success or the expect timeout passes.
    async fn expect<F, Fut>(&self, description: &str, expected: &str, mut observe: F) -> SondeoResult<()>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = (bool, String)> + Send,
    {
        let deadline = Instant::now() + self.expect_timeout;
        let poll = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
        loop {
            let (passed, actual) = observe().await;
            if passed {
                self.logger().assertion(description, true, expected, &actual);
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                self.logger().assertion(description, false, expected, &actual);
                return Err(SondeoError::assertion(description, expected, actual));
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Element is visible
    pub async fn assert_visible(&self, name: &str) -> SondeoResult<()> {
        self.expect(&format!("{name} is visible"), "visible", || async move {
            let visible = self.is_visible(name).await;
            (visible, if visible { "visible" } else { "hidden" }.to_string())
        })
        .await
    }

    /// Element is not visible
    pub async fn assert_not_visible(&self, name: &str) -> SondeoResult<()> {
        self.expect(&format!("{name} is not visible"), "hidden", || async move {
            let visible = self.is_visible(name).await;
            (!visible, if visible { "visible" } else { "hidden" }.to_string())
        })
        .await
    }

    /// Element text equals `expected` (after trimming)
    pub async fn assert_text(&self, name: &str, expected: &str) -> SondeoResult<()> {
        self.expect(&format!("{name} text"), expected, || async move {
            let actual = match self.locator(name).await {
                Ok(locator) => self.utils.text_if_present(&locator).await,
                Err(_) => None,
            };
            match actual {
                Some(text) => (text == expected, text),
                None => (false, "<missing>".to_string()),
            }
        })
        .await
    }

    /// Document title equals `expected`
    pub async fn assert_title(&self, expected: &str) -> SondeoResult<()> {
        self.expect("page title", expected, || async move {
            match self.utils.title().await {
                Ok(title) => (title == expected, title),
                Err(e) => (false, e.to_string()),
            }
        })
        .await
    }

    /// Current URL equals `expected` (absolute, or a path under the base URL)
    pub async fn assert_url(&self, expected: &str) -> SondeoResult<()> {
        let expected = if expected.contains("://") {
            expected.to_string()
        } else {
            self.url_for(expected)
        };
        let wanted = expected.as_str();
        self.expect("page URL", wanted, || async move {
            match self.utils.current_url().await {
                Ok(url) => (url == wanted, url),
                Err(e) => (false, e.to_string()),
            }
        })
        .await
    }

    /// Current URL path matches a [`UrlMatcher`] pattern (`/orders/:id`)
    pub async fn assert_path(&self, pattern: &str) -> SondeoResult<()> {
        let matcher = UrlMatcher::new(pattern);
        let matcher = &matcher;
        self.expect(&format!("URL path matches {pattern}"), pattern, || async move {
            match self.utils.current_url().await {
                Ok(url) => (matcher.matches(&url), url),
                Err(e) => (false, e.to_string()),
            }
        })
        .await
    }

    /// Current URL matches a regular expression
    pub async fn assert_url_matches(&self, pattern: &str) -> SondeoResult<()> {
        let re = regex::Regex::new(pattern)
            .map_err(|e| SondeoError::config(format!("invalid URL pattern '{pattern}': {e}")))?;
        let re = &re;
        self.expect(&format!("URL matches /{pattern}/"), pattern, || async move {
            match self.utils.current_url().await {
                Ok(url) => (re.is_match(&url), url),
                Err(e) => (false, e.to_string()),
            }
        })
        .await
    }
}
