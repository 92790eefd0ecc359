//! Health command handler

use crate::commands::HealthArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use sondeo::{ApiClient, Logger};
use std::time::Duration;

/// Probe the API health endpoint; fails when it does not answer 2xx
pub async fn execute_health(
    config: &CliConfig,
    args: &HealthArgs,
    printer: &Printer,
) -> CliResult<()> {
    let api_url = match args.api_url {
        Some(ref url) => url.clone(),
        None => config.suite_config()?.api_url,
    };
    let client = ApiClient::new(api_url.clone(), Logger::new().scoped("health"))
        .with_timeout(Duration::from_millis(args.timeout));

    match client.health_check().await {
        Ok(response) => {
            printer.success(&format!(
                "{api_url} is healthy ({} in {}ms)",
                response.status,
                response.duration.as_millis()
            ));
            Ok(())
        }
        Err(e) => {
            printer.failure(&format!("{api_url} is unhealthy"));
            Err(CliError::Unhealthy {
                message: e.to_string(),
            })
        }
    }
}
