//! Command handlers - extracted from main.rs for testability
//!
//! Handlers write their payload (JSON, fixture content) to the given writer
//! and status lines through the [`Printer`](crate::Printer).

pub mod config;
pub mod data;
pub mod health;
pub mod report;

pub use config::execute_config;
pub use data::{execute_fixture, execute_generate};
pub use health::execute_health;
pub use report::execute_report;
