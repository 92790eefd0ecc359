//! Report command handler

use crate::commands::ReportArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use sondeo::lifecycle::notify_webhook;
use sondeo::{Logger, ReportFormat, Reporter, TagFilter};

/// Formats requested by the flags; JSON is always written
#[must_use]
pub fn requested_formats(args: &ReportArgs) -> Vec<ReportFormat> {
    let mut formats = Vec::with_capacity(3);
    if args.html {
        formats.push(ReportFormat::Html);
    }
    if args.junit {
        formats.push(ReportFormat::Junit);
    }
    formats.push(ReportFormat::Json);
    formats
}

/// Render reports from a results file.
///
/// Fails with [`CliError::TestsFailed`] when any selected test failed, after
/// the reports are written and the webhook (if requested) is notified.
pub async fn execute_report(
    config: &CliConfig,
    args: &ReportArgs,
    printer: &Printer,
) -> CliResult<()> {
    let reporter = Reporter::load(&args.input)?;
    let reporter = match args.tags {
        Some(ref expr) => reporter.filtered(&expr.parse::<TagFilter>()?),
        None => reporter,
    };

    let needs_suite = args.output.is_none() || args.notify;
    let suite = if needs_suite {
        Some(config.suite_config()?)
    } else {
        None
    };
    let output = match (&args.output, &suite) {
        (Some(dir), _) => dir.clone(),
        (None, Some(suite)) => suite.results_dir.clone(),
        (None, None) => return Err(CliError::config("no output directory")),
    };

    for path in reporter.write_all(&output, &requested_formats(args))? {
        printer.info(&format!("wrote {}", path.display()));
    }
    printer.summary(&reporter);

    if args.notify {
        match suite.as_ref().and_then(|s| s.webhook_url.as_deref()) {
            Some(url) => {
                if !notify_webhook(url, &Logger::new(), &reporter).await {
                    printer.warning("webhook notification failed");
                }
            }
            None => printer.warning("--notify given but WEBHOOK_URL is not set"),
        }
    }

    if reporter.all_passed() {
        Ok(())
    } else {
        Err(CliError::TestsFailed {
            failed: reporter.failed_count(),
            total: reporter.total_count(),
        })
    }
}
