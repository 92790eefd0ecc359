use crate::config::Config;
use crate::driver::PageDriver;
use crate::logging::Logger;
use crate::page::{BasePage, PageObject};
use crate::result::{SondeoError, SondeoResult};
use crate::selector::{css_string, Selector, SelectorChain, SelectorSet};
use crate::wait::ElementState;
use async_trait::async_trait;
use std::sync::Arc;

/// Landing screen after a successful login
#[derive(Debug, Clone)]
pub struct DashboardPage {
    base: BasePage,
}

impl DashboardPage {
    /// Page name
    pub const NAME: &'static str = "dashboard";
    /// Canonical path
    pub const PATH: &'static str = "/dashboard";

    /// Dashboard page over a driver
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, logger: &Logger, config: &Config) -> Self {
        Self {
            base: BasePage::from_config(driver, logger.scoped(Self::NAME), config, Self::selectors()),
        }
    }

    fn selectors() -> SelectorSet {
        let chain = |test_id: &str, css: &str| SelectorChain::new(Selector::test_id(test_id)).or(css);
        SelectorSet::builder(Self::NAME)
            .element("welcome", chain("welcome-message", ".welcome-message"))
            .element("user_menu", chain("user-menu", ".user-menu"))
            .element("logout", chain("logout-button", ".logout-btn"))
            .element("search_input", chain("search-input", ".search-input"))
            .element("search_button", chain("search-button", ".search-btn"))
            .element("search_results", chain("search-results", ".search-results"))
            .element("result_count", chain("result-count", ".result-count"))
            .build()
    }

    /// Greeting shown to the signed-in user
    pub async fn welcome_message(&self) -> SondeoResult<String> {
        self.base.get_text("welcome").await
    }

    /// Sign out
    pub async fn logout(&self) -> SondeoResult<()> {
        self.base.logger().step("log out");
        self.base.click("logout").await
    }

    /// Run a search and wait for the results panel
    pub async fn search(&self, query: &str) -> SondeoResult<()> {
        self.base.logger().step(&format!("search for '{query}'"));
        self.base.type_text("search_input", query).await?;
        self.base.click("search_button").await?;
        self.base
            .locate("search_results", ElementState::Visible)
            .await
            .map(|_| ())
    }

    /// Number shown in the result counter, e.g. "12 results"
    pub async fn search_result_count(&self) -> SondeoResult<usize> {
        let text = self.base.get_text("result_count").await?;
        let digits: String = text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().map_err(|_| {
            SondeoError::assertion("search result count is numeric", "a number", text)
        })
    }

    /// Open a navigation section by its `data-section` name or visible label
    pub async fn open_section(&self, name: &str) -> SondeoResult<()> {
        self.base.logger().step(&format!("open section '{name}'"));
        let chain = SelectorChain::new(Selector::css(format!("[data-section={}]", css_string(name))))
            .or(Selector::text(name));
        self.base.click_chain(&chain).await
    }

    /// Whether the user menu is showing
    pub async fn is_user_menu_visible(&self) -> bool {
        self.base.is_visible("user_menu").await
    }
}

#[async_trait]
impl PageObject for DashboardPage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn path(&self) -> &str {
        Self::PATH
    }

    fn base(&self) -> &BasePage {
        &self.base
    }

    async fn assert_loaded(&self) -> SondeoResult<()> {
        self.base.assert_path(self.path()).await?;
        self.base.assert_visible("welcome").await
    }
}
