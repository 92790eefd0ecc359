//! Run reporting: result collection, tag filtering and HTML / JUnit / JSON
//! rendering into the results directory.

use crate::result::{SondeoError, SondeoResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    const fn css_class(self) -> &'static str {
        match self {
            Self::Passed => "pass",
            Self::Failed => "fail",
            Self::Skipped => "skip",
        }
    }
}

/// `@tag` markers in a test name, without the `@`
#[must_use]
pub fn tags_in(name: &str) -> Vec<String> {
    name.split_whitespace()
        .filter_map(|word| word.strip_prefix('@'))
        .map(|tag| tag.trim_end_matches([',', ';', ')', ']']).to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Individual test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultEntry {
    /// Test name
    pub name: String,
    /// Test status
    pub status: TestStatus,
    /// Duration of test execution
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    /// Error message if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Screenshots, traces and videos attached to the result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
    /// Tags, taken from `@tag` markers in the name unless given explicitly
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TestResultEntry {
    fn new(name: String, status: TestStatus, duration: Duration, error: Option<String>) -> Self {
        Self {
            tags: tags_in(&name),
            name,
            status,
            duration,
            error,
            artifacts: Vec::new(),
        }
    }

    /// Create a passing test result
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self::new(name.into(), TestStatus::Passed, duration, None)
    }

    /// Create a failing test result
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self::new(name.into(), TestStatus::Failed, duration, Some(error.into()))
    }

    /// Create a skipped test result
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self::new(name.into(), TestStatus::Skipped, Duration::ZERO, None)
    }

    /// Attach an artifact path
    #[must_use]
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }

    /// Add a tag not present in the name
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let tag = tag.trim_start_matches('@').to_string();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// All tags of this result (explicit plus name markers)
    #[must_use]
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags = self.tags.clone();
        for tag in tags_in(&self.name) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

/// Selects tests by `@tag` markers.
///
/// A test is selected when it carries any included tag (or no include list
/// is set) and none of the excluded tags. `invert` flips the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    include: Vec<String>,
    exclude: Vec<String>,
    invert: bool,
}

impl TagFilter {
    /// Filter that selects everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require one of these tags
    #[must_use]
    pub fn include(mut self, tag: &str) -> Self {
        self.include.push(tag.trim_start_matches('@').to_string());
        self
    }

    /// Reject tests carrying this tag
    #[must_use]
    pub fn exclude(mut self, tag: &str) -> Self {
        self.exclude.push(tag.trim_start_matches('@').to_string());
        self
    }

    /// Select the complement
    #[must_use]
    pub const fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    /// Whether the filter selects every test
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && !self.invert
    }

    /// Check a tag list
    #[must_use]
    pub fn matches_tags(&self, tags: &[String]) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|t| tags.contains(t));
        let excluded = self.exclude.iter().any(|t| tags.contains(t));
        (included && !excluded) != self.invert
    }

    /// Check a test name
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.matches_tags(&tags_in(name))
    }

    /// Check a recorded result
    #[must_use]
    pub fn matches_entry(&self, entry: &TestResultEntry) -> bool {
        self.matches_tags(&entry.all_tags())
    }
}

impl FromStr for TagFilter {
    type Err = SondeoError;

    /// Parse `@smoke,@critical !@slow`; a leading `!` (or `-`) excludes and
    /// a lone `!` inverts the whole filter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .try_fold(Self::new(), |filter, token| match token {
                "!" => Ok(filter.inverted()),
                _ => {
                    let (negated, tag) = match token.strip_prefix(['!', '-']) {
                        Some(rest) => (true, rest),
                        None => (false, token),
                    };
                    match tag.strip_prefix('@') {
                        Some(name) if !name.is_empty() => Ok(if negated {
                            filter.exclude(name)
                        } else {
                            filter.include(name)
                        }),
                        _ => Err(SondeoError::config(format!(
                            "invalid tag '{token}', expected @name"
                        ))),
                    }
                }
            })
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// Self-contained HTML page
    Html,
    /// JUnit XML for CI systems
    Junit,
    /// Machine-readable results
    Json,
}

impl ReportFormat {
    /// File name written into the results directory
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Html => "report.html",
            Self::Junit => "junit.xml",
            Self::Json => "results.json",
        }
    }

    /// Every format
    pub const ALL: [Self; 3] = [Self::Html, Self::Junit, Self::Json];
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Html => "html",
            Self::Junit => "junit",
            Self::Json => "json",
        })
    }
}

/// Failure line of a [`RunSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Test name
    pub name: String,
    /// Error message
    pub error: String,
}

/// Aggregate numbers of a run, posted to the notification webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pass_rate: f64,
    pub duration_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub failures: Vec<FailureSummary>,
}

#[derive(Serialize, Deserialize)]
struct ResultsFile {
    suite: String,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    results: Vec<TestResultEntry>,
}

/// Collects results and renders reports
#[derive(Debug, Clone)]
pub struct Reporter {
    results: Vec<TestResultEntry>,
    suite_name: String,
    started_at: Option<DateTime<Utc>>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Create a reporter for the default suite
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            suite_name: "E2E Suite".to_string(),
            started_at: None,
        }
    }

    /// Set suite name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Mark the start of the run
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// Returns the suite name.
    #[must_use]
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Record a test result
    pub fn record(&mut self, result: TestResultEntry) {
        tracing::debug!(test = %result.name, status = ?result.status, "recorded result");
        self.results.push(result);
    }

    /// Get number of passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Get number of failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Get number of skipped tests
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Skipped)
            .count()
    }

    /// Get total test count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Pass rate over executed (non-skipped) tests, 1.0 when none ran
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        let executed = self.total_count() - self.skipped_count();
        if executed == 0 {
            return 1.0;
        }
        self.passed_count() as f64 / executed as f64
    }

    /// Check if all tests passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get total duration
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }

    /// Get test results
    #[must_use]
    pub fn results(&self) -> &[TestResultEntry] {
        &self.results
    }

    /// Get failing tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResultEntry> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .collect()
    }

    /// Reporter restricted to the results a tag filter selects
    #[must_use]
    pub fn filtered(&self, filter: &TagFilter) -> Self {
        Self {
            results: self
                .results
                .iter()
                .filter(|r| filter.matches_entry(r))
                .cloned()
                .collect(),
            suite_name: self.suite_name.clone(),
            started_at: self.started_at,
        }
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%), {} failed, {} skipped",
            self.suite_name,
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0,
            self.failed_count(),
            self.skipped_count()
        )
    }

    /// Aggregate numbers for notifications
    #[must_use]
    pub fn run_summary(&self) -> RunSummary {
        RunSummary {
            suite: self.suite_name.clone(),
            total: self.total_count(),
            passed: self.passed_count(),
            failed: self.failed_count(),
            skipped: self.skipped_count(),
            pass_rate: self.pass_rate(),
            duration_ms: self.total_duration().as_millis() as u64,
            started_at: self.started_at,
            failures: self
                .failures()
                .into_iter()
                .map(|r| FailureSummary {
                    name: r.name.clone(),
                    error: r.error.clone().unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Render HTML report content
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Sondeo Test Report</title>
    <style>
        body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .progress-bar { background: #ddd; height: 20px; border-radius: 10px; overflow: hidden; }
        .passed { background: #4caf50; height: 100%; }
        .test { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .test.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .test.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .test.skip { background: #fff3e0; border-left: 4px solid #ff9800; }
        .tag { background: #e3f2fd; border-radius: 3px; padding: 0 4px; margin-left: 4px; font-size: 0.85em; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
    </style>
</head>
<body>
"#,
        );

        html.push_str(&format!(
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>Results: {}/{} passed ({:.1}%)</h2>
    <div class="progress-bar">
        <div class="passed" style="width: {:.1}%"></div>
    </div>
    <p>Failed: {} &middot; Skipped: {} &middot; Duration: {:.2}s</p>
</div>
"#,
            escape_xml(&self.suite_name),
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0,
            self.pass_rate() * 100.0,
            self.failed_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64()
        ));

        html.push_str("<h2>Test Results</h2>\n");
        for result in &self.results {
            html.push_str(&format!(
                r#"<div class="test {}">
    <strong>{}</strong> - {:?} ({:.2}ms)"#,
                result.status.css_class(),
                escape_xml(&result.name),
                result.status,
                result.duration.as_secs_f64() * 1000.0
            ));
            for tag in &result.tags {
                html.push_str(&format!(r#"<span class="tag">@{}</span>"#, escape_xml(tag)));
            }
            html.push('\n');

            if let Some(error) = &result.error {
                html.push_str(&format!(
                    "    <div class=\"error\">{}</div>\n",
                    escape_xml(error)
                ));
            }
            for artifact in &result.artifacts {
                let path = escape_xml(&artifact.display().to_string());
                html.push_str(&format!("    <div><a href=\"{path}\">{path}</a></div>\n"));
            }

            html.push_str("</div>\n");
        }

        html.push_str(
            r#"
<footer>
    <p>Generated by Sondeo</p>
</footer>
</body>
</html>
"#,
        );

        html
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64()
        ));
        xml.push('\n');

        for result in &self.results {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&result.name),
                result.duration.as_secs_f64()
            ));
            xml.push('\n');

            match result.status {
                TestStatus::Failed => {
                    let error = escape_xml(result.error.as_deref().unwrap_or("failed"));
                    xml.push_str(&format!(
                        "    <failure message=\"{error}\">{error}</failure>\n"
                    ));
                }
                TestStatus::Skipped => xml.push_str("    <skipped/>\n"),
                TestStatus::Passed => {}
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Render the results file consumed by `from_json`
    pub fn render_json(&self) -> SondeoResult<String> {
        let file = ResultsFile {
            suite: self.suite_name.clone(),
            started_at: self.started_at,
            results: self.results.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Rebuild a reporter from a results file
    pub fn from_json(json: &str) -> SondeoResult<Self> {
        let file: ResultsFile = serde_json::from_str(json)?;
        Ok(Self {
            results: file.results,
            suite_name: file.suite,
            started_at: file.started_at,
        })
    }

    /// Load a results file from disk
    pub fn load(path: &Path) -> SondeoResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Write one report into `dir`, returning its path
    pub fn write(&self, dir: &Path, format: ReportFormat) -> SondeoResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format.file_name());
        let content = match format {
            ReportFormat::Html => self.render_html(),
            ReportFormat::Junit => self.render_junit(),
            ReportFormat::Json => self.render_json()?,
        };
        std::fs::write(&path, content)?;
        tracing::info!(format = %format, path = %path.display(), "wrote report");
        Ok(path)
    }

    /// Write several reports into `dir`
    pub fn write_all(&self, dir: &Path, formats: &[ReportFormat]) -> SondeoResult<Vec<PathBuf>> {
        formats.iter().map(|&format| self.write(dir, format)).collect()
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> Reporter {
        let mut reporter = Reporter::new().with_name("checkout");
        reporter.record(TestResultEntry::passed(
            "login with valid credentials @smoke",
            Duration::from_millis(1200),
        ));
        reporter.record(
            TestResultEntry::failed(
                "search returns results @smoke @search",
                Duration::from_millis(800),
                "Assertion failed: <count> & \"12\"",
            )
            .with_artifact("test-results/screenshots/search-20261019T101500000.png"),
        );
        reporter.record(TestResultEntry::skipped("export to csv @slow"));
        reporter
    }

    mod tag_tests {
        use super::*;

        #[test]
        fn test_tags_in_name() {
            assert_eq!(tags_in("login works @smoke @auth,"), vec!["smoke", "auth"]);
            assert!(tags_in("user@example.com logs in").is_empty());
            assert!(tags_in("plain").is_empty());
        }

        #[test]
        fn test_entry_collects_tags() {
            let entry = TestResultEntry::passed("a @smoke", Duration::ZERO).with_tag("@critical");
            assert_eq!(entry.tags, vec!["smoke", "critical"]);
        }

        #[test]
        fn test_include_exclude() {
            let filter = TagFilter::new().include("@smoke").exclude("slow");
            assert!(filter.matches("login @smoke"));
            assert!(!filter.matches("login @smoke @slow"));
            assert!(!filter.matches("login"));
            assert!(TagFilter::new().matches("anything"));
        }

        #[test]
        fn test_invert() {
            let filter = TagFilter::new().include("@smoke").inverted();
            assert!(!filter.matches("login @smoke"));
            assert!(filter.matches("export @slow"));
        }

        #[test]
        fn test_parse() {
            let filter: TagFilter = "@smoke, @critical !@slow".parse().unwrap();
            assert!(filter.matches("a @critical"));
            assert!(!filter.matches("a @critical @slow"));

            let inverted: TagFilter = "! @smoke".parse().unwrap();
            assert!(inverted.matches("a @regression"));
            assert!("smoke".parse::<TagFilter>().is_err());
            assert!("".parse::<TagFilter>().unwrap().is_empty());
        }
    }

    mod reporter_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let reporter = sample();
            assert_eq!(reporter.total_count(), 3);
            assert_eq!(reporter.passed_count(), 1);
            assert_eq!(reporter.failed_count(), 1);
            assert_eq!(reporter.skipped_count(), 1);
            assert!((reporter.pass_rate() - 0.5).abs() < f64::EPSILON);
            assert!(!reporter.all_passed());
            assert_eq!(reporter.total_duration(), Duration::from_millis(2000));
            assert_eq!(
                reporter.summary(),
                "checkout: 1/3 passed (50.0%), 1 failed, 1 skipped"
            );
        }

        #[test]
        fn test_empty_pass_rate() {
            let reporter = Reporter::new();
            assert!((reporter.pass_rate() - 1.0).abs() < f64::EPSILON);
            assert!(reporter.all_passed());
        }

        #[test]
        fn test_filtered() {
            let smoke = sample().filtered(&TagFilter::new().include("smoke"));
            assert_eq!(smoke.total_count(), 2);
            assert_eq!(smoke.suite_name(), "checkout");
        }

        #[test]
        fn test_run_summary() {
            let summary = sample().run_summary();
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.duration_ms, 2000);
            assert_eq!(summary.failures[0].name, "search returns results @smoke @search");
        }

        #[test]
        fn test_render_html_escapes() {
            let html = sample().render_html();
            assert!(html.contains("<h1>checkout</h1>"));
            assert!(html.contains("&lt;count&gt; &amp; &quot;12&quot;"));
            assert!(html.contains("class=\"test skip\""));
            assert!(html.contains("<span class=\"tag\">@search</span>"));
            assert!(html.contains("search-20261019T101500000.png"));
        }

        #[test]
        fn test_render_junit() {
            let xml = sample().render_junit();
            assert!(xml.contains(r#"tests="3" failures="1" skipped="1""#));
            assert!(xml.contains("<skipped/>"));
            assert!(xml.contains("<failure message=\"Assertion failed: &lt;count&gt;"));
        }

        #[test]
        fn test_json_reload() {
            let reporter = sample();
            let json = reporter.render_json().unwrap();
            assert!(json.contains("\"duration_ms\": 1200"));
            let reloaded = Reporter::from_json(&json).unwrap();
            assert_eq!(reloaded.results(), reporter.results());
            assert_eq!(reloaded.suite_name(), "checkout");
        }

        #[test]
        fn test_hand_written_results_file() {
            let json = r#"{"suite": "ci", "results": [
                {"name": "a", "status": "passed", "duration_ms": 5},
                {"name": "b", "status": "failed", "duration_ms": 7, "error": "boom"}
            ]}"#;
            let reporter = Reporter::from_json(json).unwrap();
            assert_eq!(reporter.failed_count(), 1);
            assert!(reporter.results()[0].tags.is_empty());
        }

        #[test]
        fn test_write_all() {
            let dir = tempfile::tempdir().unwrap();
            let paths = sample()
                .write_all(&dir.path().join("reports"), &ReportFormat::ALL)
                .unwrap();
            assert_eq!(paths.len(), 3);
            for path in &paths {
                assert!(path.exists());
            }
            assert!(paths[1].ends_with("junit.xml"));
            assert!(Reporter::load(&paths[2]).is_ok());
        }
    }
}
