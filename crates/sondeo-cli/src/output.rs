//! Terminal status lines

use console::{style, Style, Term};
use sondeo::Reporter;

/// Status printer on stderr; command payloads go to stdout
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl Printer {
    /// Create a new printer
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    fn line(&self, styled: Style, symbol: &str, plain: &str, message: &str) {
        let prefix = if self.use_color {
            styled.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.line(Style::new().green().bold(), "✓", "OK", message);
        }
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.line(Style::new().red().bold(), "✗", "FAIL", message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.line(Style::new().yellow().bold(), "⚠", "WARN", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.line(Style::new().blue().bold(), "ℹ", "INFO", message);
        }
    }

    /// Print the pass/fail summary of a run
    pub fn summary(&self, reporter: &Reporter) {
        let failed = reporter.failed_count();
        if self.quiet && failed == 0 {
            return;
        }
        let status = match (failed > 0, self.use_color) {
            (true, true) => style("FAILED").red().bold().to_string(),
            (false, true) => style("PASSED").green().bold().to_string(),
            (true, false) => "FAILED".to_string(),
            (false, false) => "PASSED".to_string(),
        };
        let _ = self.term.write_line(&format!(
            "{status} {} tests in {:.2}s ({} passed, {failed} failed, {} skipped)",
            reporter.total_count(),
            reporter.total_duration().as_secs_f64(),
            reporter.passed_count(),
            reporter.skipped_count(),
        ));
    }
}
