//! Sondeo CLI Library
//!
//! Command-line interface for the Sondeo end-to-end test toolkit: resolved
//! configuration, test data, API health checks and CI reports.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, ConfigAction, ConfigArgs, DataAction, DataArgs, FixtureArgs,
    GenerateArgs, HealthArgs, KindArg, ReportArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::Printer;
