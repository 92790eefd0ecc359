//! Global setup and teardown around a suite run.
//!
//! Setup fails only on invalid configuration or unusable directories. The
//! API health probe and the webhook notification never fail the run; they
//! log a warning instead.

use crate::api::ApiClient;
use crate::config::Config;
use crate::logging::Logger;
use crate::report::{ReportFormat, Reporter};
use crate::result::SondeoResult;
use std::path::PathBuf;
use std::time::Duration;

/// Timeout of the setup health probe
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout of the teardown webhook post
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// What global setup observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    /// Directories ensured to exist
    pub directories: Vec<PathBuf>,
    /// Whether the API answered its health endpoint
    pub api_healthy: bool,
}

/// What global teardown produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownOutcome {
    /// Reports written to the results directory
    pub reports: Vec<PathBuf>,
    /// `Some(true)` when the webhook accepted the summary, `None` when no
    /// webhook is configured
    pub notified: Option<bool>,
}

/// Prepare the environment before any test runs
pub async fn global_setup(config: &Config, logger: &Logger) -> SondeoResult<SetupOutcome> {
    logger.step(&format!(
        "global setup for {} ({})",
        config.environment, config.base_url
    ));
    config.validate()?;

    let directories = vec![
        config.data_dir.clone(),
        config.results_dir.clone(),
        config.results_dir.join("screenshots"),
        config.log.dir.clone(),
    ];
    for dir in &directories {
        tokio::fs::create_dir_all(dir).await?;
    }

    let api_healthy = check_api_health(config, logger).await;
    logger.info("global setup complete");
    Ok(SetupOutcome {
        directories,
        api_healthy,
    })
}

/// Probe the API health endpoint, warning instead of failing
pub async fn check_api_health(config: &Config, logger: &Logger) -> bool {
    let client =
        ApiClient::from_config(config, logger.clone()).with_timeout(HEALTH_CHECK_TIMEOUT);
    match client.health_check().await {
        Ok(_) => true,
        Err(e) => {
            logger.warn(&format!("API health check failed, continuing: {e}"));
            false
        }
    }
}

/// Write reports and send the run summary
pub async fn global_teardown(
    config: &Config,
    logger: &Logger,
    reporter: &Reporter,
) -> SondeoResult<TeardownOutcome> {
    logger.step("global teardown");
    let reports = reporter.write_all(&config.results_dir, &ReportFormat::ALL)?;
    logger.info(&reporter.summary());

    let notified = match config.webhook_url {
        Some(ref url) => Some(notify_webhook(url, logger, reporter).await),
        None => None,
    };
    Ok(TeardownOutcome { reports, notified })
}

/// Post the run summary as JSON, warning instead of failing
pub async fn notify_webhook(url: &str, logger: &Logger, reporter: &Reporter) -> bool {
    let client = ApiClient::new(url, logger.clone()).with_timeout(WEBHOOK_TIMEOUT);
    match client.post(url, &reporter.run_summary()).await {
        Ok(_) => {
            logger.info("run summary delivered to webhook");
            true
        }
        Err(e) => {
            logger.warn(&format!("webhook notification failed: {e}"));
            false
        }
    }
}
