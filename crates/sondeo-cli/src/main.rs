//! Sondeo CLI: support commands for browser end-to-end suites
//!
//! ## Usage
//!
//! ```bash
//! sondeo config validate                          # Fail fast on bad configuration
//! sondeo data generate --kind order --count 5     # Print synthesized orders
//! sondeo health                                   # Probe API_URL/health
//! sondeo report --input results.json --junit      # Render CI reports
//! ```

use clap::Parser;
use sondeo_cli::handlers::{
    execute_config, execute_fixture, execute_generate, execute_health, execute_report,
};
use sondeo_cli::{Cli, CliConfig, CliResult, ColorChoice, Commands, DataAction, Printer, Verbosity};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    let printer = Printer::new(config.color.should_color(), config.verbosity.is_quiet());

    // keep the guard alive for the whole run
    let _guard = match sondeo::init_logging(&config.log_settings()) {
        Ok(guard) => guard,
        Err(e) => {
            printer.warning(&format!("logging disabled: {e}"));
            None
        }
    };

    match run(cli.command, &config, &printer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
        .with_env(cli.env.clone())
}

async fn run(command: Commands, config: &CliConfig, printer: &Printer) -> CliResult<()> {
    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Config(args) => execute_config(config, args.action, printer, &mut stdout),
        Commands::Data(args) => match args.action {
            DataAction::Generate(ref generate) => {
                execute_generate(config, generate, printer, &mut stdout)
            }
            DataAction::Fixture(ref fixture) => execute_fixture(config, fixture, &mut stdout),
        },
        Commands::Health(args) => execute_health(config, &args, printer).await,
        Commands::Report(args) => execute_report(config, &args, printer).await,
    }
}
