//! TestRunner - Executing conformance test suites
//!
//! Provides a runner for executing conformance tests with:
//! - Filtering by suite/category/name
//! - Result aggregation
//! - JSON report generation

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Serialize, Serializer};
use tabletest::{BenchConfig, CompareConfig};
use thiserror::Error;

use super::context::TestContext;
use super::logging::TestLogger;
use super::traits::{ConformanceTest, TestCategory, TestResult};

/// Failure to write a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Summary of test execution results
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    /// Total number of tests
    pub total: usize,
    /// Number of passed tests
    pub passed: usize,
    /// Number of failed tests
    pub failed: usize,
    /// Number of skipped tests
    pub skipped: usize,
    /// Total execution time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Per-test results
    pub results: Vec<TestRunResult>,
}

impl TestSummary {
    /// True when no test failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Results of the failed tests
    pub fn failures(&self) -> impl Iterator<Item = &TestRunResult> {
        self.results.iter().filter(|r| r.result.is_fail())
    }

    /// Serialize the summary, with run metadata, as pretty JSON
    pub fn to_json(&self, config: &CompareConfig) -> Result<String, ReportError> {
        let report = Report {
            generated_at: Utc::now().to_rfc3339(),
            config,
            summary: self,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Write the JSON report to `path`
    pub fn write_report(&self, config: &CompareConfig, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.to_json(config)?)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    config: &'a CompareConfig,
    #[serde(flatten)]
    summary: &'a TestSummary,
}

/// Result of a single test run
#[derive(Debug, Clone, Serialize)]
pub struct TestRunResult {
    /// Test ID
    pub id: String,
    /// Test name
    pub name: String,
    /// Suite name
    pub suite: String,
    /// Test category
    pub category: TestCategory,
    /// Test result
    #[serde(flatten)]
    pub result: TestResult,
    /// Execution duration
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// Runner for conformance tests
pub struct TestRunner {
    /// Tests to run
    tests: Vec<Box<dyn ConformanceTest>>,
    /// Comparison settings handed to every test
    config: CompareConfig,
    /// Timing settings for performance tests
    bench: BenchConfig,
    /// Filter by suite name (if Some)
    suite_filter: Option<String>,
    /// Filter by category (if Some)
    category_filter: Option<TestCategory>,
    /// Filter by test name pattern (if Some)
    name_filter: Option<String>,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    /// Create a new empty test runner
    pub fn new() -> Self {
        Self {
            tests: Vec::new(),
            config: CompareConfig::default(),
            bench: BenchConfig::default(),
            suite_filter: None,
            category_filter: None,
            name_filter: None,
        }
    }

    /// Add a test to the runner
    pub fn add_test<T: ConformanceTest + 'static>(&mut self, test: T) {
        self.tests.push(Box::new(test));
    }

    /// Add already boxed tests to the runner
    pub fn extend(&mut self, tests: impl IntoIterator<Item = Box<dyn ConformanceTest>>) {
        self.tests.extend(tests);
    }

    /// Set the comparison settings handed to every test
    pub fn with_config(mut self, config: CompareConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the timing settings for performance tests
    pub fn with_bench_config(mut self, bench: BenchConfig) -> Self {
        self.bench = bench;
        self
    }

    /// The comparison settings handed to every test
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Filter tests by suite name
    pub fn filter_suite(mut self, suite: &str) -> Self {
        self.suite_filter = Some(suite.to_string());
        self
    }

    /// Filter tests by category
    pub fn filter_category(mut self, category: TestCategory) -> Self {
        self.category_filter = Some(category);
        self
    }

    /// Filter tests by name pattern
    pub fn filter_name(mut self, pattern: &str) -> Self {
        self.name_filter = Some(pattern.to_string());
        self
    }

    fn selected(&self, test: &dyn ConformanceTest) -> bool {
        self.suite_filter.as_deref().is_none_or(|s| test.suite() == s)
            && self.category_filter.is_none_or(|c| test.category() == c)
            && self.name_filter.as_deref().is_none_or(|n| test.name().contains(n))
    }

    /// Tests that pass every filter, in registration order
    pub fn selected_tests(&self) -> Vec<&dyn ConformanceTest> {
        self.tests
            .iter()
            .map(|test| &**test)
            .filter(|t| self.selected(*t))
            .collect()
    }

    /// Run all selected tests and return a summary
    pub fn run(&self, logger: &mut TestLogger) -> TestSummary {
        let start = Instant::now();
        let mut summary = TestSummary::default();
        let selected = self.selected_tests();

        for (i, test) in selected.iter().enumerate() {
            let id = test.id();
            logger.clear_test_name();
            logger.progress(i + 1, selected.len(), &id);
            logger.set_test_name(&id);

            let test_start = Instant::now();
            let result = {
                let mut ctx =
                    TestContext::new(logger, self.config).with_bench_config(self.bench);
                test.run(&mut ctx)
            };
            let test_duration = test_start.elapsed();

            match &result {
                TestResult::Pass => {
                    summary.passed += 1;
                    logger.log_pass(test_duration);
                }
                TestResult::Fail { reason } => {
                    summary.failed += 1;
                    logger.log_fail(reason, test_duration);
                }
                TestResult::Skipped { reason } => {
                    summary.skipped += 1;
                    logger.log_skip(reason);
                }
            }
            tracing::debug!(test = %id, passed = result.is_pass(), "conformance test finished");

            summary.total += 1;
            summary.results.push(TestRunResult {
                id,
                name: test.name().to_string(),
                suite: test.suite().to_string(),
                category: test.category(),
                result,
                duration: test_duration,
            });
        }
        logger.clear_test_name();

        summary.duration = start.elapsed();
        summary
    }

    /// Get the number of registered tests
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        suite: &'static str,
        category: TestCategory,
        result: TestResult,
    }

    impl ConformanceTest for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn suite(&self) -> &str {
            self.suite
        }

        fn category(&self) -> TestCategory {
            self.category
        }

        fn run(&self, _ctx: &mut TestContext<'_>) -> TestResult {
            self.result.clone()
        }
    }

    fn runner() -> TestRunner {
        let mut runner = TestRunner::new();
        runner.add_test(Fixed {
            name: "square",
            suite: "numeric",
            category: TestCategory::Integration,
            result: TestResult::Pass,
        });
        runner.add_test(Fixed {
            name: "square_wrong",
            suite: "numeric",
            category: TestCategory::EdgeCase,
            result: TestResult::Fail {
                reason: "1 of 2 cases failed".into(),
            },
        });
        runner.add_test(Fixed {
            name: "maps",
            suite: "structural",
            category: TestCategory::Unit,
            result: TestResult::Skipped {
                reason: "not applicable".into(),
            },
        });
        runner
    }

    fn quiet() -> TestLogger {
        TestLogger::new().with_output(std::io::sink())
    }

    #[test]
    fn test_run_counts_every_outcome() {
        let summary = runner().run(&mut quiet());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_success());
        let failed: Vec<&str> = summary.failures().map(|r| r.id.as_str()).collect();
        assert_eq!(failed, ["numeric::square_wrong"]);
    }

    #[test]
    fn test_filters_combine() {
        let summary = runner().filter_suite("numeric").run(&mut quiet());
        assert_eq!(summary.total, 2);

        let summary = runner()
            .filter_suite("numeric")
            .filter_category(TestCategory::Integration)
            .run(&mut quiet());
        assert_eq!(summary.total, 1);
        assert!(summary.is_success());

        let summary = runner().filter_name("wrong").run(&mut quiet());
        assert_eq!(summary.results[0].name, "square_wrong");
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn test_report_json_shape() {
        let summary = runner().run(&mut quiet());
        let json = summary.to_json(&CompareConfig::new(1e-9)).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(report["total"], 3);
        assert_eq!(report["config"]["tolerance"], 1e-9);
        assert!(report["generated_at"].is_string());
        assert!(report["duration_ms"].is_number());
        let results = report["results"].as_array().unwrap();
        assert_eq!(results[1]["status"], "fail");
        assert_eq!(results[1]["reason"], "1 of 2 cases failed");
        assert_eq!(results[1]["category"], "edge_case");
    }

    #[test]
    fn test_write_report_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let summary = runner().filter_suite("structural").run(&mut quiet());
        summary.write_report(&CompareConfig::default(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"suite\": \"structural\""));
        assert!(written.contains("\"status\": \"skipped\""));
    }

    #[test]
    fn test_write_report_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let err = TestSummary::default()
            .write_report(&CompareConfig::default(), &path)
            .unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
    }
}
