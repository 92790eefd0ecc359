//! PageDriver - Abstract Browser Automation Trait
//!
//! Page objects and interaction primitives never talk to a browser engine
//! directly. They go through [`PageDriver`], which has two implementations:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  PageDriver (Abstract Trait)                                  │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────┐   ┌───────────────────────────┐  │
//! │  │  ChromiumDriver         │   │  MockDriver               │  │
//! │  │  (feature = "browser")  │   │  (in-memory DOM, tests)   │  │
//! │  │  CDP via chromiumoxide  │   │                           │  │
//! │  └─────────────────────────┘   └───────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locator strings follow one convention across drivers: plain CSS,
//! `xpath=<expr>`, or `text=<visible text>`.

use crate::config::Config;
use crate::result::{SondeoError, SondeoResult};
use crate::wait::{poll_until, ElementState, LoadState, WaitOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Navigation timeout
    pub navigation_timeout: Duration,
    /// Delay inserted before every action
    pub slow_mo: Duration,
    /// Path to a Chromium executable (auto-detected when unset)
    pub chromium_path: Option<String>,
    /// Run with the Chromium sandbox
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout: Duration::from_secs(30),
            slow_mo: Duration::ZERO,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Derive launch settings from the run configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            slow_mo: Duration::from_millis(config.slow_mo_ms),
            ..Self::default()
        }
    }

    /// Set viewport size
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Disable the Chromium sandbox (needed in most containers)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Abstract driver for one browser page.
///
/// All methods take `&self` so a driver can be shared behind an `Arc`
/// between the test body and the page objects it constructs.
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str, timeout: Duration) -> SondeoResult<()>;

    /// Current page URL
    async fn current_url(&self) -> SondeoResult<String>;

    /// Current document title
    async fn title(&self) -> SondeoResult<String>;

    /// Number of elements matching a locator
    async fn count(&self, selector: &str) -> SondeoResult<usize>;

    /// Wait until the first match of a locator reaches `state`
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> SondeoResult<()>;

    /// Click the first match; `force` skips actionability checks
    async fn click(&self, selector: &str, force: bool) -> SondeoResult<()>;

    /// Replace the value of an input
    async fn fill(&self, selector: &str, text: &str) -> SondeoResult<()>;

    /// Clear an input
    async fn clear(&self, selector: &str) -> SondeoResult<()>;

    /// Current value of an input
    async fn input_value(&self, selector: &str) -> SondeoResult<String>;

    /// Text content of the first match
    async fn text_content(&self, selector: &str) -> SondeoResult<Option<String>>;

    /// Attribute of the first match
    async fn get_attribute(&self, selector: &str, name: &str) -> SondeoResult<Option<String>>;

    /// Whether the first match is rendered; `false` when nothing matches
    async fn is_visible(&self, selector: &str) -> SondeoResult<bool>;

    /// Whether the first match is enabled
    async fn is_enabled(&self, selector: &str) -> SondeoResult<bool>;

    /// Move the pointer over the first match
    async fn hover(&self, selector: &str) -> SondeoResult<()>;

    /// Select an option of a `<select>` by value
    async fn select_option(&self, selector: &str, value: &str) -> SondeoResult<()>;

    /// Check or uncheck a checkbox
    async fn set_checked(&self, selector: &str, checked: bool) -> SondeoResult<()>;

    /// Scroll the first match into view
    async fn scroll_into_view(&self, selector: &str) -> SondeoResult<()>;

    /// Capture a full-page PNG
    async fn screenshot(&self) -> SondeoResult<Vec<u8>>;

    /// Wait for a document load state
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> SondeoResult<()>;

    /// Go back in history
    async fn go_back(&self) -> SondeoResult<()>;

    /// Go forward in history
    async fn go_forward(&self) -> SondeoResult<()>;

    /// Reload the page
    async fn reload(&self) -> SondeoResult<()>;

    /// Close the page
    async fn close(&self) -> SondeoResult<()>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Minimal valid PNG returned by [`MockDriver::screenshot`]
pub const MOCK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// An element in the mock DOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Tag name
    pub tag: String,
    /// Text content
    pub text: String,
    /// Input value
    pub value: String,
    /// Rendered
    pub visible: bool,
    /// Enabled
    pub enabled: bool,
    /// Checkbox state
    pub checked: bool,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Selectable option values (empty means anything goes)
    pub options: Vec<String>,
    /// Input `maxlength`; longer fills are truncated
    pub max_length: Option<usize>,
}

impl MockElement {
    /// Visible, enabled element with no content
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: String::new(),
            value: String::new(),
            visible: true,
            enabled: true,
            checked: false,
            attributes: BTreeMap::new(),
            options: Vec::new(),
            max_length: None,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set input value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Restrict selectable options
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Truncate fills to `max_length` characters
    #[must_use]
    pub const fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A page the mock can navigate to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockPage {
    /// Document title
    pub title: String,
    /// Elements keyed by locator string
    pub elements: HashMap<String, MockElement>,
}

impl MockPage {
    /// Page with a title and no elements
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            elements: HashMap::new(),
        }
    }

    /// Add an element under a locator
    #[must_use]
    pub fn with_element(mut self, selector: impl Into<String>, element: MockElement) -> Self {
        self.elements.insert(selector.into(), element);
        self
    }
}

#[derive(Debug)]
struct MockState {
    url: String,
    title: String,
    elements: HashMap<String, MockElement>,
    pages: HashMap<String, MockPage>,
    click_navigations: HashMap<String, String>,
    click_failures: HashMap<String, u32>,
    unreachable: Vec<String>,
    dom_content_loaded: bool,
    network_idle: bool,
    idle_overrun: Duration,
    history: Vec<String>,
    history_index: usize,
    calls: Vec<String>,
    closed: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            title: String::new(),
            elements: HashMap::new(),
            pages: HashMap::new(),
            click_navigations: HashMap::new(),
            click_failures: HashMap::new(),
            unreachable: Vec::new(),
            dom_content_loaded: true,
            network_idle: true,
            idle_overrun: Duration::ZERO,
            history: vec!["about:blank".to_string()],
            history_index: 0,
            calls: Vec::new(),
            closed: false,
        }
    }
}

impl MockState {
    fn record(&mut self, call: String) -> SondeoResult<()> {
        self.calls.push(call);
        if self.closed {
            return Err(SondeoError::driver("page is closed"));
        }
        Ok(())
    }

    fn element(&self, selector: &str) -> SondeoResult<&MockElement> {
        self.elements
            .get(selector)
            .ok_or_else(|| SondeoError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    fn element_mut(&mut self, selector: &str) -> SondeoResult<&mut MockElement> {
        self.elements
            .get_mut(selector)
            .ok_or_else(|| SondeoError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    fn load(&mut self, url: &str) {
        self.url = url.to_string();
        if let Some(page) = self.pages.get(url) {
            self.title = page.title.clone();
            self.elements = page.elements.clone();
        }
    }

    fn visit(&mut self, url: &str) {
        self.history.truncate(self.history_index + 1);
        self.history.push(url.to_string());
        self.history_index = self.history.len() - 1;
        self.load(url);
    }
}

/// In-memory driver for unit testing page objects and primitives.
///
/// Elements are addressed by their exact locator string. All setters take
/// `&self` so tests can reshape the page while a page object holds the
/// driver.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver on `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder form of [`MockDriver::add_element`]
    #[must_use]
    pub fn with_element(self, selector: impl Into<String>, element: MockElement) -> Self {
        self.add_element(selector, element);
        self
    }

    /// Builder form of [`MockDriver::add_page`]
    #[must_use]
    pub fn with_page(self, url: impl Into<String>, page: MockPage) -> Self {
        self.add_page(url, page);
        self
    }

    /// Add or replace an element on the current page
    pub fn add_element(&self, selector: impl Into<String>, element: MockElement) {
        self.state().elements.insert(selector.into(), element);
    }

    /// Remove an element from the current page
    pub fn remove_element(&self, selector: &str) {
        self.state().elements.remove(selector);
    }

    /// Register a page loaded on navigation to `url`
    pub fn add_page(&self, url: impl Into<String>, page: MockPage) {
        self.state().pages.insert(url.into(), page);
    }

    /// Make clicks on `selector` navigate to `url`
    pub fn navigate_on_click(&self, selector: impl Into<String>, url: impl Into<String>) {
        self.state()
            .click_navigations
            .insert(selector.into(), url.into());
    }

    /// Make the next `times` clicks on `selector` fail
    pub fn fail_clicks(&self, selector: impl Into<String>, times: u32) {
        self.state().click_failures.insert(selector.into(), times);
    }

    /// Make navigation to `url` fail
    pub fn fail_navigation(&self, url: impl Into<String>) {
        self.state().unreachable.push(url.into());
    }

    /// Whether `domcontentloaded` has fired
    pub fn set_dom_content_loaded(&self, loaded: bool) {
        self.state().dom_content_loaded = loaded;
    }

    /// Whether the network is idle
    pub fn set_network_idle(&self, idle: bool) {
        self.state().network_idle = idle;
    }

    /// Report network-idle timeouts `late` past their deadline, like a
    /// driver that only checks the clock between round trips
    pub fn set_network_idle_overrun(&self, late: Duration) {
        self.state().idle_overrun = late;
    }

    /// Set the current URL without recording history
    pub fn set_url(&self, url: impl Into<String>) {
        self.state().url = url.into();
    }

    /// Set the document title
    pub fn set_title(&self, title: impl Into<String>) {
        self.state().title = title.into();
    }

    /// Snapshot of an element
    #[must_use]
    pub fn element(&self, selector: &str) -> Option<MockElement> {
        self.state().elements.get(selector).cloned()
    }

    /// Call history for verification, e.g. `click:#submit`
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().calls.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of calls with this prefix
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Whether [`PageDriver::close`] was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str, _timeout: Duration) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("goto:{url}"))?;
        if state.unreachable.iter().any(|u| u == url) {
            return Err(SondeoError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        state.visit(url);
        Ok(())
    }

    async fn current_url(&self) -> SondeoResult<String> {
        Ok(self.state().url.clone())
    }

    async fn title(&self) -> SondeoResult<String> {
        Ok(self.state().title.clone())
    }

    async fn count(&self, selector: &str) -> SondeoResult<usize> {
        Ok(usize::from(self.state().elements.contains_key(selector)))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> SondeoResult<()> {
        self.state()
            .record(format!("wait_for_selector:{selector}:{state}"))?;
        let options = WaitOptions::new().with_timeout(timeout_ms(timeout));
        poll_until(&options, &format!("'{selector}' to be {state}"), || {
            let inner = self.state();
            let (attached, visible) = inner
                .elements
                .get(selector)
                .map_or((false, false), |e| (true, e.visible));
            let satisfied = state.is_satisfied(attached, visible);
            async move { Ok(satisfied.then_some(())) }
        })
        .await
    }

    async fn click(&self, selector: &str, force: bool) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("click:{selector}"))?;
        let element = state.element(selector)?;
        if !force && !(element.visible && element.enabled) {
            return Err(SondeoError::driver(format!(
                "element '{selector}' is not actionable"
            )));
        }
        if let Some(remaining) = state.click_failures.get_mut(selector) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SondeoError::driver(format!(
                    "element '{selector}' is covered by another element"
                )));
            }
        }
        if let Some(url) = state.click_navigations.get(selector).cloned() {
            state.visit(&url);
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("fill:{selector}"))?;
        let element = state.element_mut(selector)?;
        if !element.enabled {
            return Err(SondeoError::driver(format!("element '{selector}' is disabled")));
        }
        element.value = match element.max_length {
            Some(max) => text.chars().take(max).collect(),
            None => text.to_string(),
        };
        Ok(())
    }

    async fn clear(&self, selector: &str) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("clear:{selector}"))?;
        state.element_mut(selector)?.value.clear();
        Ok(())
    }

    async fn input_value(&self, selector: &str) -> SondeoResult<String> {
        Ok(self.state().element(selector)?.value.clone())
    }

    async fn text_content(&self, selector: &str) -> SondeoResult<Option<String>> {
        Ok(Some(self.state().element(selector)?.text.clone()))
    }

    async fn get_attribute(&self, selector: &str, name: &str) -> SondeoResult<Option<String>> {
        Ok(self.state().element(selector)?.attributes.get(name).cloned())
    }

    async fn is_visible(&self, selector: &str) -> SondeoResult<bool> {
        let state = self.state();
        if state.closed {
            return Err(SondeoError::driver("page is closed"));
        }
        Ok(state.elements.get(selector).is_some_and(|e| e.visible))
    }

    async fn is_enabled(&self, selector: &str) -> SondeoResult<bool> {
        let state = self.state();
        if state.closed {
            return Err(SondeoError::driver("page is closed"));
        }
        Ok(state.element(selector)?.enabled)
    }

    async fn hover(&self, selector: &str) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("hover:{selector}"))?;
        state.element(selector).map(|_| ())
    }

    async fn select_option(&self, selector: &str, value: &str) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("select_option:{selector}"))?;
        let element = state.element_mut(selector)?;
        if !element.options.is_empty() && !element.options.iter().any(|o| o == value) {
            return Err(SondeoError::driver(format!(
                "'{selector}' has no option '{value}'"
            )));
        }
        element.value = value.to_string();
        Ok(())
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("set_checked:{selector}:{checked}"))?;
        state.element_mut(selector)?.checked = checked;
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> SondeoResult<()> {
        let mut state = self.state();
        state.record(format!("scroll_into_view:{selector}"))?;
        state.element(selector).map(|_| ())
    }

    async fn screenshot(&self) -> SondeoResult<Vec<u8>> {
        self.state().record("screenshot".to_string())?;
        Ok(MOCK_PNG.to_vec())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> SondeoResult<()> {
        let overrun = {
            let mut inner = self.state();
            inner.record(format!("wait_for_load_state:{state}"))?;
            inner.idle_overrun
        };
        let options = WaitOptions::new().with_timeout(timeout_ms(timeout));
        let result = poll_until(&options, &format!("load state '{state}'"), || {
            let inner = self.state();
            let reached = match state {
                LoadState::Load | LoadState::DomContentLoaded => inner.dom_content_loaded,
                LoadState::NetworkIdle => inner.network_idle,
            };
            async move { Ok(reached.then_some(())) }
        })
        .await;
        if result.is_err() && state == LoadState::NetworkIdle && !overrun.is_zero() {
            tokio::time::sleep(overrun).await;
        }
        result
    }

    async fn go_back(&self) -> SondeoResult<()> {
        let mut state = self.state();
        state.record("go_back".to_string())?;
        if state.history_index > 0 {
            state.history_index -= 1;
            let url = state.history[state.history_index].clone();
            state.load(&url);
        }
        Ok(())
    }

    async fn go_forward(&self) -> SondeoResult<()> {
        let mut state = self.state();
        state.record("go_forward".to_string())?;
        if state.history_index + 1 < state.history.len() {
            state.history_index += 1;
            let url = state.history[state.history_index].clone();
            state.load(&url);
        }
        Ok(())
    }

    async fn reload(&self) -> SondeoResult<()> {
        let mut state = self.state();
        state.record("reload".to_string())?;
        let url = state.url.clone();
        state.load(&url);
        Ok(())
    }

    async fn close(&self) -> SondeoResult<()> {
        let mut state = self.state();
        state.calls.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// CHROMIUM DRIVER
// =============================================================================

#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod chromium {
    use super::{timeout_ms, DriverConfig, PageDriver};
    use crate::result::{SondeoError, SondeoResult};
    use crate::wait::{poll_until, ElementState, LoadState, WaitOptions, NETWORK_IDLE_THRESHOLD_MS};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
    use chromiumoxide::page::{Page, ScreenshotParams};
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    /// Resolves a locator string to an array of elements in page context
    const FIND_JS: &str = r"
        const __sondeoFind = (sel) => {
            if (sel.startsWith('xpath=')) {
                const snap = document.evaluate(sel.slice(6), document, null,
                    XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                return Array.from({ length: snap.snapshotLength }, (_, i) => snap.snapshotItem(i));
            }
            if (sel.startsWith('text=')) {
                const text = sel.slice(5);
                return Array.from(document.querySelectorAll('body *'))
                    .filter(el => el.children.length === 0 && el.textContent.includes(text));
            }
            return Array.from(document.querySelectorAll(sel));
        };
        const __sondeoVisible = (el) => {
            if (!el) return false;
            const style = window.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            return style.visibility !== 'hidden' && style.display !== 'none'
                && rect.width > 0 && rect.height > 0;
        };
    ";

    #[derive(Deserialize)]
    struct Found<T: Default> {
        #[serde(default)]
        value: T,
    }

    fn js_string(s: &str) -> String {
        serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
    }

    fn cdp_error(e: impl std::fmt::Display) -> SondeoError {
        SondeoError::driver(e.to_string())
    }

    /// Chromium page driven over CDP
    #[derive(Debug)]
    pub struct ChromiumDriver {
        config: DriverConfig,
        browser: Mutex<Option<Browser>>,
        page: Page,
        handler: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch Chromium and open a blank page
        pub async fn launch(config: DriverConfig) -> SondeoResult<Self> {
            let mut builder = BrowserConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(config.navigation_timeout);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(SondeoError::driver)?;

            let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(cdp_error)?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
            tracing::debug!(headless = config.headless, "chromium launched");

            Ok(Self {
                config,
                browser: Mutex::new(Some(browser)),
                page,
                handler,
            })
        }

        async fn slow_mo(&self) {
            if !self.config.slow_mo.is_zero() {
                tokio::time::sleep(self.config.slow_mo).await;
            }
        }

        async fn eval<T: DeserializeOwned>(&self, script: String) -> SondeoResult<T> {
            self.page
                .evaluate(script)
                .await
                .map_err(cdp_error)?
                .into_value()
                .map_err(cdp_error)
        }

        /// Run `body` with `el` bound to the first match of `selector`
        async fn on_element<T: DeserializeOwned + Default>(
            &self,
            selector: &str,
            body: &str,
        ) -> SondeoResult<T> {
            let script = format!(
                "(() => {{ {FIND_JS} const el = __sondeoFind({sel})[0]; \
                 if (!el) return null; return {{ value: (() => {{ {body} }})() }}; }})()",
                sel = js_string(selector)
            );
            let found: Option<Found<T>> = self.eval(script).await?;
            found
                .map(|f| f.value)
                .ok_or_else(|| SondeoError::ElementNotFound {
                    selector: selector.to_string(),
                })
        }

        async fn ready_state(&self) -> SondeoResult<String> {
            self.eval("document.readyState".to_string()).await
        }

        async fn resource_count(&self) -> SondeoResult<u64> {
            self.eval("performance.getEntriesByType('resource').length".to_string())
                .await
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn goto(&self, url: &str, timeout: Duration) -> SondeoResult<()> {
            self.slow_mo().await;
            match tokio::time::timeout(timeout, self.page.goto(url)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(SondeoError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
                Err(_) => Err(SondeoError::timeout(
                    timeout_ms(timeout),
                    format!("navigation to {url}"),
                )),
            }
        }

        async fn current_url(&self) -> SondeoResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(cdp_error)?
                .unwrap_or_default())
        }

        async fn title(&self) -> SondeoResult<String> {
            Ok(self
                .page
                .get_title()
                .await
                .map_err(cdp_error)?
                .unwrap_or_default())
        }

        async fn count(&self, selector: &str) -> SondeoResult<usize> {
            self.eval(format!(
                "(() => {{ {FIND_JS} return __sondeoFind({}).length; }})()",
                js_string(selector)
            ))
            .await
        }

        async fn wait_for_selector(
            &self,
            selector: &str,
            state: ElementState,
            timeout: Duration,
        ) -> SondeoResult<()> {
            let script = format!(
                "(() => {{ {FIND_JS} const el = __sondeoFind({})[0]; \
                 return [!!el, __sondeoVisible(el)]; }})()",
                js_string(selector)
            );
            let options = WaitOptions::new().with_timeout(timeout_ms(timeout));
            poll_until(&options, &format!("'{selector}' to be {state}"), || {
                let script = script.clone();
                async move {
                    let (attached, visible): (bool, bool) = self.eval(script).await?;
                    Ok(state.is_satisfied(attached, visible).then_some(()))
                }
            })
            .await
        }

        async fn click(&self, selector: &str, force: bool) -> SondeoResult<()> {
            self.slow_mo().await;
            let check = if force {
                ""
            } else {
                "if (!__sondeoVisible(el) || el.disabled) return 'not actionable';"
            };
            let outcome: Option<String> = self
                .on_element(
                    selector,
                    &format!("{check} el.scrollIntoView({{block: 'center'}}); el.click(); return null;"),
                )
                .await?;
            match outcome {
                Some(reason) => Err(SondeoError::driver(format!("'{selector}' is {reason}"))),
                None => Ok(()),
            }
        }

        async fn fill(&self, selector: &str, text: &str) -> SondeoResult<()> {
            self.slow_mo().await;
            self.on_element::<()>(
                selector,
                &format!(
                    "el.focus(); el.value = {}; \
                     el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                     el.dispatchEvent(new Event('change', {{bubbles: true}}));",
                    js_string(text)
                ),
            )
            .await
        }

        async fn clear(&self, selector: &str) -> SondeoResult<()> {
            self.on_element::<()>(
                selector,
                "el.value = ''; el.dispatchEvent(new Event('input', {bubbles: true}));",
            )
            .await
        }

        async fn input_value(&self, selector: &str) -> SondeoResult<String> {
            self.on_element(selector, "return el.value ?? '';").await
        }

        async fn text_content(&self, selector: &str) -> SondeoResult<Option<String>> {
            self.on_element(selector, "return el.textContent;").await
        }

        async fn get_attribute(&self, selector: &str, name: &str) -> SondeoResult<Option<String>> {
            self.on_element(selector, &format!("return el.getAttribute({});", js_string(name)))
                .await
        }

        async fn is_visible(&self, selector: &str) -> SondeoResult<bool> {
            self.eval(format!(
                "(() => {{ {FIND_JS} return __sondeoVisible(__sondeoFind({})[0]); }})()",
                js_string(selector)
            ))
            .await
        }

        async fn is_enabled(&self, selector: &str) -> SondeoResult<bool> {
            self.on_element(selector, "return !el.disabled;").await
        }

        async fn hover(&self, selector: &str) -> SondeoResult<()> {
            self.on_element::<()>(
                selector,
                "el.dispatchEvent(new MouseEvent('mouseover', {bubbles: true})); \
                 el.dispatchEvent(new MouseEvent('mouseenter'));",
            )
            .await
        }

        async fn select_option(&self, selector: &str, value: &str) -> SondeoResult<()> {
            let matched: bool = self
                .on_element(
                    selector,
                    &format!(
                        "const v = {}; if (!Array.from(el.options || []).some(o => o.value === v)) return false; \
                         el.value = v; el.dispatchEvent(new Event('change', {{bubbles: true}})); return true;",
                        js_string(value)
                    ),
                )
                .await?;
            if matched {
                Ok(())
            } else {
                Err(SondeoError::driver(format!("'{selector}' has no option '{value}'")))
            }
        }

        async fn set_checked(&self, selector: &str, checked: bool) -> SondeoResult<()> {
            self.on_element::<()>(
                selector,
                &format!("if (el.checked !== {checked}) el.click();"),
            )
            .await
        }

        async fn scroll_into_view(&self, selector: &str) -> SondeoResult<()> {
            self.on_element::<()>(selector, "el.scrollIntoView({block: 'center'});")
                .await
        }

        async fn screenshot(&self) -> SondeoResult<Vec<u8>> {
            let params = ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .full_page(true)
                .build();
            self.page.screenshot(params).await.map_err(cdp_error)
        }

        async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> SondeoResult<()> {
            let deadline = Instant::now() + timeout;
            let idle = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
            let mut last_count = None;
            let mut quiet_since = Instant::now();
            loop {
                let ready = self.ready_state().await?;
                let reached = match state {
                    LoadState::DomContentLoaded => ready != "loading",
                    LoadState::Load => ready == "complete",
                    LoadState::NetworkIdle => {
                        let count = self.resource_count().await?;
                        if last_count != Some(count) {
                            last_count = Some(count);
                            quiet_since = Instant::now();
                        }
                        ready == "complete" && quiet_since.elapsed() >= idle
                    }
                };
                if reached {
                    return Ok(());
                }
                let now = Instant::now();
                if now >= deadline {
                    return Err(SondeoError::timeout(
                        timeout_ms(timeout),
                        format!("load state '{state}'"),
                    ));
                }
                tokio::time::sleep(WaitOptions::new().poll_interval().min(deadline - now)).await;
            }
        }

        async fn go_back(&self) -> SondeoResult<()> {
            self.eval::<bool>("(history.back(), true)".to_string())
                .await
                .map(|_| ())
        }

        async fn go_forward(&self) -> SondeoResult<()> {
            self.eval::<bool>("(history.forward(), true)".to_string())
                .await
                .map(|_| ())
        }

        async fn reload(&self) -> SondeoResult<()> {
            self.page.reload().await.map(|_| ()).map_err(cdp_error)
        }

        async fn close(&self) -> SondeoResult<()> {
            let browser = self.browser.lock().await.take();
            if let Some(mut browser) = browser {
                browser.close().await.map_err(cdp_error)?;
                let _ = browser.wait().await;
            }
            self.handler.abort();
            Ok(())
        }
    }
}
