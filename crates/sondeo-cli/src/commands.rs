//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use sondeo::data::FixtureKind;
use std::path::PathBuf;

/// Sondeo: configuration checks, test data, health checks and CI reports
/// for browser end-to-end suites
#[derive(Parser, Debug)]
#[command(name = "sondeo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Environment tier, overriding TEST_ENV
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show or validate the resolved configuration
    Config(ConfigArgs),

    /// Generate records or print fixtures
    Data(DataArgs),

    /// Check the API health endpoint
    Health(HealthArgs),

    /// Render reports from a results file
    Report(ReportArgs),
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the resolved configuration as JSON
    Show,
    /// Exit non-zero when the configuration is invalid
    Validate,
}

/// Arguments for the data command
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Data action
    #[command(subcommand)]
    pub action: DataAction,
}

/// Data actions
#[derive(Subcommand, Debug)]
pub enum DataAction {
    /// Synthesize records and print them as JSON
    Generate(GenerateArgs),
    /// Print a fixture file
    Fixture(FixtureArgs),
}

/// Arguments for data generation
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Record kind
    #[arg(short, long)]
    pub kind: KindArg,

    /// Number of records
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Seed for a reproducible sequence
    #[arg(long)]
    pub seed: Option<u64>,

    /// Save into the data directory under this name instead of printing
    #[arg(long)]
    pub save: Option<String>,

    /// Data directory, overriding DATA_DIR
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Arguments for printing a fixture
#[derive(Args, Debug)]
pub struct FixtureArgs {
    /// Fixture name (`.json` optional)
    pub name: String,

    /// Data directory, overriding DATA_DIR
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Arguments for the health command
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// API base URL, overriding API_URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout: u64,
}

/// Arguments for the report command
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReportArgs {
    /// Results file written by a suite run
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory, overriding RESULTS_DIR
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Render the HTML report
    #[arg(long)]
    pub html: bool,

    /// Render the JUnit XML report
    #[arg(long)]
    pub junit: bool,

    /// Restrict to tests matching a tag expression, e.g. "@smoke !@slow"
    #[arg(long)]
    pub tags: Option<String>,

    /// Post the run summary to WEBHOOK_URL
    #[arg(long)]
    pub notify: bool,
}

/// Record kind argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    /// User accounts
    User,
    /// Catalog products
    Product,
    /// Orders with priced lines
    Order,
}

impl From<KindArg> for FixtureKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::User => Self::User,
            KindArg::Product => Self::Product,
            KindArg::Order => Self::Order,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
