use crate::config::Config;
use crate::driver::PageDriver;
use crate::logging::Logger;
use crate::page::{BasePage, PageObject};
use crate::result::SondeoResult;
use crate::selector::{Selector, SelectorChain, SelectorSet};
use async_trait::async_trait;
use std::sync::Arc;

/// Login screen
#[derive(Debug, Clone)]
pub struct LoginPage {
    base: BasePage,
}

impl LoginPage {
    /// Page name
    pub const NAME: &'static str = "login";
    /// Canonical path
    pub const PATH: &'static str = "/login";

    /// Login page over a driver
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, logger: &Logger, config: &Config) -> Self {
        Self {
            base: BasePage::from_config(driver, logger.scoped(Self::NAME), config, Self::selectors()),
        }
    }

    fn selectors() -> SelectorSet {
        let chain = |test_id: &str, css: &str| SelectorChain::new(Selector::test_id(test_id)).or(css);
        SelectorSet::builder(Self::NAME)
            .element("username", chain("username-input", "#username"))
            .element("password", chain("password-input", "#password"))
            .element("remember_me", chain("remember-me", "#remember-me"))
            .element("submit", chain("login-button", ".login-btn"))
            .element("error", chain("error-message", ".error-message"))
            .element("forgot_password", chain("forgot-password", ".forgot-password-link"))
            .build()
    }

    /// Fill the form and submit it
    pub async fn login(&self, username: &str, password: &str, remember_me: bool) -> SondeoResult<()> {
        self.base.logger().step(&format!("log in as {username}"));
        self.base.type_text("username", username).await?;
        self.base.type_text("password", password).await?;
        if remember_me {
            self.base.set_checked("remember_me", true).await?;
        }
        self.base.click("submit").await
    }

    /// Text of the error banner
    pub async fn error_message(&self) -> SondeoResult<String> {
        self.base.get_text("error").await
    }

    /// Whether the error banner is showing
    pub async fn is_error_message_visible(&self) -> bool {
        self.base.is_visible("error").await
    }

    /// Follow the forgot-password link
    pub async fn click_forgot_password(&self) -> SondeoResult<()> {
        self.base.click("forgot_password").await
    }
}

#[async_trait]
impl PageObject for LoginPage {
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
        self.base.assert_visible("username").await?;
        self.base.assert_visible("submit").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement, MockPage};
    use crate::logging::LogCategory;
    use crate::result::SondeoError;

    const LOGIN_URL: &str = "http://localhost:3000/login";

    fn login_page() -> MockPage {
        MockPage::new("Sign in")
            .with_element("[data-testid=\"username-input\"]", MockElement::new("input"))
            .with_element("#password", MockElement::new("input"))
            .with_element("#remember-me", MockElement::new("input"))
            .with_element("[data-testid=\"login-button\"]", MockElement::new("button"))
            .with_element(
                ".error-message",
                MockElement::new("div").with_text("Invalid credentials").hidden(),
            )
            .with_element(".forgot-password-link", MockElement::new("a"))
    }

    fn setup() -> (Arc<MockDriver>, LoginPage, Logger) {
        let driver = Arc::new(MockDriver::new().with_page(LOGIN_URL, login_page()));
        let logger = Logger::capturing();
        let config = Config::default().with_expect_timeout(300);
        let page = LoginPage::new(driver.clone(), &logger, &config);
        (driver, page, logger)
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_and_assert_loaded() {
        let (driver, page, _logger) = setup();
        page.navigate().await.unwrap();
        assert_eq!(driver.current_url().await.unwrap(), LOGIN_URL);
        page.assert_loaded().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_fills_form_with_fallback_selectors() {
        let (driver, page, logger) = setup();
        page.navigate().await.unwrap();
        page.login("alice", "s3cr3t", false).await.unwrap();

        let username = driver.element("[data-testid=\"username-input\"]").unwrap();
        assert_eq!(username.value, "alice");
        assert_eq!(driver.element("#password").unwrap().value, "s3cr3t");
        assert!(!driver.element("#remember-me").unwrap().checked);
        assert!(driver.was_called("click:[data-testid=\"login-button\"]"));
        assert_eq!(logger.events_in(LogCategory::Step).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remember_me_and_special_characters() {
        let (driver, page, _logger) = setup();
        page.navigate().await.unwrap();
        page.login("bob", "p@$$w0rd!#%&*()", true).await.unwrap();
        assert!(driver.element("#remember-me").unwrap().checked);
        assert_eq!(driver.element("#password").unwrap().value, "p@$$w0rd!#%&*()");
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_never_reaching_dashboard_fails_url_assertion() {
        let (_driver, page, _logger) = setup();
        page.navigate().await.unwrap();
        page.login("u", "p", false).await.unwrap();

        let err = page.base().assert_url_matches("/dashboard/").await.unwrap_err();
        match err {
            SondeoError::Assertion {
                expected, actual, ..
            } => {
                assert_eq!(expected, "/dashboard/");
                assert_eq!(actual, LOGIN_URL);
            }
            other => panic!("expected Assertion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_message() {
        let (driver, page, _logger) = setup();
        page.navigate().await.unwrap();
        assert!(!page.is_error_message_visible().await);

        driver.add_element(
            ".error-message",
            MockElement::new("div").with_text(" Invalid credentials "),
        );
        assert!(page.is_error_message_visible().await);
        assert_eq!(page.error_message().await.unwrap(), "Invalid credentials");
    }

    #[tokio::test(start_paused = true)]
    async fn test_forgot_password_link() {
        let (driver, page, _logger) = setup();
        page.navigate().await.unwrap();
        driver.navigate_on_click(".forgot-password-link", "http://localhost:3000/forgot-password");
        page.click_forgot_password().await.unwrap();
        page.base().assert_url("/forgot-password").await.unwrap();
    }

    #[tokio::test]
    async fn test_is_error_message_visible_without_page() {
        let driver = Arc::new(MockDriver::new());
        let page = LoginPage::new(driver.clone(), &Logger::new(), &Config::default());
        driver.close().await.unwrap();
        assert!(!page.is_error_message_visible().await);
    }
}
