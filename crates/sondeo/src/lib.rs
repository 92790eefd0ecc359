//! Sondeo: page objects, retrying interaction primitives, an HTTP test
//! client and test data for browser end-to-end suites.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SONDEO Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ PageUtils  │    │ PageDriver │            │
//! │   │ Objects    │───►│ (retry,    │───►│ (chromium  │            │
//! │   │ (login,..) │    │  waits)    │    │  or mock)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                  │                                    │
//! │         ▼                  ▼                                    │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ TestData   │    │ Logger     │    │ ApiClient  │            │
//! │   │ Manager    │    │ (tracing)  │◄───│ (reqwest)  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration is resolved once from the environment ([`Config::from_env`]),
//! [`global_setup`] prepares directories and probes the API, and
//! [`global_teardown`] writes HTML / JUnit / JSON reports.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// HTTP test client with logging and normalized errors
pub mod api;

/// Environment-scoped configuration snapshot
pub mod config;

/// Test data: fixture files and randomized records
#[allow(missing_docs)]
pub mod data;

/// Page driver abstraction, in-memory mock and chromium backend
#[allow(clippy::missing_errors_doc, clippy::significant_drop_in_scrutinee)]
pub mod driver;

/// Interaction primitives with bounded retry
pub mod interaction;

/// Global setup and teardown
pub mod lifecycle;

/// Structured, categorized logging
pub mod logging;

/// Page object base and routing
pub mod page;

/// Page objects of the application under test
pub mod pages;

/// Result collection, tag filtering and report rendering
#[allow(missing_docs)]
pub mod report;

/// Result and error types
pub mod result;

/// Fixed-interval retry combinator
pub mod retry;

/// Selector candidates, chains and per-page sets
pub mod selector;

/// Load states, element states, URL patterns and polling
pub mod wait;

pub use api::{ApiClient, ApiError, ApiResponse, ApiResult};
pub use config::{Config, Environment};
pub use data::{FixtureKind, Generated, Order, OrderItem, Product, Record, TestDataManager, User};
#[cfg(feature = "browser")]
pub use driver::ChromiumDriver;
pub use driver::{DriverConfig, MockDriver, MockElement, MockPage, PageDriver};
pub use interaction::{ActionOptions, PageUtils};
pub use lifecycle::{global_setup, global_teardown, SetupOutcome, TeardownOutcome};
pub use logging::{init_logging, LogCategory, LogEvent, LogLevel, LogSettings, Logger};
pub use page::{BasePage, PageObject, PageRegistry, UrlMatcher};
pub use pages::{DashboardPage, LoginPage};
pub use report::{ReportFormat, Reporter, RunSummary, TagFilter, TestResultEntry, TestStatus};
pub use result::{SondeoError, SondeoResult};
pub use retry::{retry, retry_if, RetryExhausted, RetryPolicy};
pub use selector::{Selector, SelectorChain, SelectorSet};
pub use wait::{poll_until, ElementState, LoadState, UrlPattern, WaitOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::api::*;
    pub use super::config::*;
    pub use super::data::*;
    pub use super::driver::*;
    pub use super::interaction::*;
    pub use super::lifecycle::*;
    pub use super::logging::*;
    pub use super::page::*;
    pub use super::pages::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::retry::*;
    pub use super::selector::*;
    pub use super::wait::*;
}
