//! Config command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Printer;
use crate::ConfigAction;
use std::io::Write;

/// Execute the config command
pub fn execute_config(
    config: &CliConfig,
    action: ConfigAction,
    printer: &Printer,
    out: &mut dyn Write,
) -> CliResult<()> {
    let suite = match config.suite_config() {
        Ok(suite) => suite,
        Err(e) => {
            printer.failure("configuration is invalid");
            return Err(e);
        }
    };

    match action {
        ConfigAction::Show => {
            serde_json::to_writer_pretty(&mut *out, &suite)?;
            writeln!(out)?;
        }
        ConfigAction::Validate => {
            printer.success(&format!(
                "configuration is valid ({}, {})",
                suite.environment, suite.base_url
            ));
        }
    }
    Ok(())
}
