//! Page objects for the sample login/dashboard application.

mod dashboard;
mod login;

pub use dashboard::DashboardPage;
pub use login::LoginPage;

use crate::page::PageRegistry;

/// Route table covering every page in this module
#[must_use]
pub fn registry() -> PageRegistry {
    let mut registry = PageRegistry::new();
    registry.register(LoginPage::NAME, LoginPage::PATH);
    registry.register(DashboardPage::NAME, DashboardPage::PATH);
    registry
}
