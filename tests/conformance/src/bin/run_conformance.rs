//! Run Conformance Tests
//!
//! Binary for executing the tabletest conformance suites from the command line.
//!
//! Usage:
//!   run-conformance [OPTIONS]
//!
//! Comparison settings start from the `TABLETEST_TOLERANCE`, `TABLETEST_SEED`
//! and `TABLETEST_TRIALS` environment variables; the matching flags override
//! them. Library tracing goes to stderr, filtered by `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Parser;
use tabletest::{CompareConfig, SeedPolicy};
use tabletest_conformance::prelude::*;
use tabletest_conformance::suites;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[expect(clippy::struct_excessive_bools, reason = "CLI flags are naturally bools")]
#[command(
    name = "run-conformance",
    author,
    version,
    about = "Run the tabletest conformance suites"
)]
struct Cli {
    /// Only run tests from this suite (numeric, structural, functional)
    #[arg(long)]
    suite: Option<String>,

    /// Only run tests in this category (unit, integration, edge_case, performance)
    #[arg(long)]
    category: Option<TestCategory>,

    /// Only run tests whose name contains this pattern
    #[arg(long)]
    name: Option<String>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, env = "TABLETEST_LOG_JSON")]
    json: bool,

    /// Include per-case progress in the output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Tolerance for checks that do not set their own
    #[arg(long)]
    tolerance: Option<f64>,

    /// Seed for generated arguments: `time` or an unsigned integer
    #[arg(long)]
    seed: Option<SeedPolicy>,

    /// Argument tuples tried per callable comparison
    #[arg(long)]
    trials: Option<u32>,

    /// Write a JSON summary to this path
    #[arg(long, value_name = "PATH", env = "TABLETEST_REPORT")]
    report: Option<PathBuf>,

    /// List the selected tests without running them
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<CompareConfig> {
        let mut config = CompareConfig::from_env().context("reading TABLETEST_* settings")?;
        if let Some(tolerance) = self.tolerance {
            config = config.with_tolerance(tolerance);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(trials) = self.trials {
            config = config.with_trials(trials);
        }
        Ok(config)
    }

    fn runner(&self, config: CompareConfig) -> TestRunner {
        let mut runner = suites::runner().with_config(config);
        if let Some(suite) = &self.suite {
            runner = runner.filter_suite(suite);
        }
        if let Some(category) = self.category {
            runner = runner.filter_category(category);
        }
        if let Some(name) = &self.name {
            runner = runner.filter_name(name);
        }
        runner
    }

    fn logger(&self) -> TestLogger {
        let format = if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        };
        let level = if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        TestLogger::new()
            .with_colors(!self.no_color && !self.json)
            .with_format(format)
            .with_level(level)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;
    let runner = cli.runner(config);

    if cli.list {
        for test in runner.selected_tests() {
            println!("{:<45} {}", test.id(), test.category());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut logger = cli.logger();
    logger.info(&format!(
        "Tabletest conformance (tolerance {}, seed {}, trials {})",
        config.tolerance.value(),
        config.seed,
        config.trials
    ));

    let summary = runner.run(&mut logger);
    if summary.total == 0 {
        bail!("no tests match the given filters");
    }

    logger.section("Summary", |log| {
        log.key_display("total", &summary.total);
        log.key_display("passed", &summary.passed);
        log.key_display("failed", &summary.failed);
        log.key_display("skipped", &summary.skipped);
        for failure in summary.failures() {
            if let TestResult::Fail { reason } = &failure.result {
                log.error(&format!("{}: {reason}", failure.id));
            }
        }
    });

    if let Some(path) = &cli.report {
        summary
            .write_report(&config, path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        logger.info(&format!("Report written to {}", path.display()));
    }

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_comparison_settings() {
        let cli = Cli::try_parse_from([
            "run-conformance",
            "--tolerance",
            "1e-6",
            "--seed",
            "7",
            "--trials",
            "25",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.tolerance.value(), 1e-6);
        assert_eq!(config.seed, SeedPolicy::Fixed(7));
        assert_eq!(config.trials, 25);
    }

    #[test]
    fn filters_parse() {
        let cli = Cli::try_parse_from([
            "run-conformance",
            "--suite",
            "numeric",
            "--category",
            "edge_case",
            "--name",
            "square",
            "--seed",
            "time",
        ])
        .unwrap();
        assert_eq!(cli.category, Some(TestCategory::EdgeCase));
        assert_eq!(cli.seed, Some(SeedPolicy::Time));

        let mut logger = TestLogger::new().with_output(std::io::sink());
        let summary = cli.runner(CompareConfig::default()).run(&mut logger);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.results[0].id, "numeric::square_wrong_expectation");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Cli::try_parse_from(["run-conformance", "--category", "slow"]).is_err());
        assert!(Cli::try_parse_from(["run-conformance", "--seed", "soon"]).is_err());
    }
}
