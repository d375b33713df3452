//! Case dispatch.
//!
//! The dispatcher validates a [`CaseTable`] against the function(s) under
//! test, runs every case in table order and sends one [`Diagnostic`] per
//! mismatching output to a [`Reporter`]. Mismatches never stop later cases;
//! a malformed setup stops the run before the first call.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::{debug, warn};

use crate::cases::{Case, CaseTable, ExpectedSource};
use crate::config::CompareConfig;
use crate::equal::{ComparisonResult, Comparator, Delta, Position};
use crate::error::{ConfigError, Error, Result};
use crate::func::Callable;
use crate::tolerance::Tolerance;
use crate::value::Value;

/// A pinpointed mismatch between an actual and an expected output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Case label, verbatim.
    pub label: String,
    /// Zero-based case index.
    pub case: usize,
    /// Zero-based output index.
    pub output: usize,
    /// Location inside the output, outermost first.
    pub path: Vec<Position>,
    /// Rendered actual value at the failing location.
    pub actual: String,
    /// Rendered expected value at the failing location.
    pub expected: String,
    /// Relative error, for numeric mismatches.
    pub relative_error: Option<Delta>,
    pub length_mismatch: bool,
    pub missing_value: bool,
    pub shape_mismatch: bool,
    /// Extra context, such as the arguments that made two callables disagree.
    pub context: Option<String>,
}

impl Diagnostic {
    fn new(
        case: &Case,
        index: usize,
        output: usize,
        actual: &Value,
        expected: &Value,
        result: ComparisonResult,
    ) -> Self {
        let (actual, expected, context) = match result.mismatch {
            Some(m) => (m.actual, m.expected, m.context),
            None => (actual.to_string(), expected.to_string(), None),
        };
        Self {
            label: case.label().to_string(),
            case: index,
            output,
            path: result.path,
            actual,
            expected,
            relative_error: result.numerical.then_some(result.relative_error),
            length_mismatch: result.length_mismatch,
            missing_value: result.missing_value,
            shape_mismatch: result.shape_mismatch,
            context,
        }
    }

    /// Location of the failure, e.g. `results[1][0][2].Name`.
    pub fn location(&self) -> String {
        let mut location = format!("results[{}][{}]", self.case, self.output);
        for position in &self.path {
            location.push_str(&position.to_string());
        }
        location
    }

    /// Line diff between the rendered actual and expected values.
    pub fn text_diff(&self) -> String {
        let diff = TextDiff::from_lines(&self.expected, &self.actual);
        let mut result = String::from("--- expected\n+++ actual\n");
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            result.push_str(sign);
            result.push_str(change.value());
            if change.missing_newline() {
                result.push('\n');
            }
        }
        result
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.label.is_empty() {
            write!(f, "{}: ", self.label)?;
        }
        write!(
            f,
            "Error in {}. Got {}, want {}.",
            self.location(),
            self.actual,
            self.expected
        )?;
        if let Some(error) = self.relative_error {
            write!(f, " Relative error {error}.")?;
        }
        if self.length_mismatch {
            f.write_str(" Lengths differ.")?;
        }
        if self.missing_value {
            f.write_str(" Missing value.")?;
        }
        if self.shape_mismatch {
            f.write_str(" Shapes differ.")?;
        }
        if let Some(context) = &self.context {
            write!(f, " With {context}.")?;
        }
        Ok(())
    }
}

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseOutcome {
    pub label: String,
    pub index: usize,
    /// Number of mismatching outputs.
    pub failures: usize,
    pub duration: Duration,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// Outcomes of every case, in table order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunSummary {
    pub cases: Vec<CaseOutcome>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Returns true if no case had a mismatch.
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(CaseOutcome::passed)
    }

    pub fn duration(&self) -> Duration {
        self.cases.iter().map(|c| c.duration).sum()
    }
}

/// Sink for per-case progress and failures.
pub trait Reporter {
    fn case_started(&mut self, _index: usize, _label: &str) {}

    /// One mismatching output.
    fn failure(&mut self, diagnostic: &Diagnostic);

    fn case_finished(&mut self, _outcome: &CaseOutcome) {}
}

impl Reporter for Vec<Diagnostic> {
    fn failure(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn case_started(&mut self, index: usize, label: &str) {
        (**self).case_started(index, label);
    }

    fn failure(&mut self, diagnostic: &Diagnostic) {
        (**self).failure(diagnostic);
    }

    fn case_finished(&mut self, outcome: &CaseOutcome) {
        (**self).case_finished(outcome);
    }
}

/// Reports through `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn case_started(&mut self, index: usize, label: &str) {
        debug!(case = index, label, "case started");
    }

    fn failure(&mut self, diagnostic: &Diagnostic) {
        warn!(
            case = diagnostic.case,
            label = %diagnostic.label,
            output = diagnostic.output,
            location = %diagnostic.location(),
            "{diagnostic}"
        );
    }

    fn case_finished(&mut self, outcome: &CaseOutcome) {
        debug!(
            case = outcome.index,
            label = %outcome.label,
            failures = outcome.failures,
            duration_us = u64::try_from(outcome.duration.as_micros()).unwrap_or(u64::MAX),
            "case finished"
        );
    }
}

/// Split the function list into the function under test and an optional
/// reference.
pub(crate) fn parse_functions(
    functions: &[Value],
) -> std::result::Result<(&Callable, Option<&Callable>), ConfigError> {
    let callable = |index: usize| {
        let value = &functions[index];
        value.as_callable().ok_or(ConfigError::NotCallable {
            index,
            found: value.underlying().kind(),
        })
    };
    match functions.len() {
        1 => Ok((callable(0)?, None)),
        2 => {
            let (primary, reference) = (callable(0)?, callable(1)?);
            if primary.signature() != reference.signature() {
                return Err(ConfigError::SignatureMismatch {
                    primary: primary.signature().to_string(),
                    reference: reference.signature().to_string(),
                });
            }
            Ok((primary, Some(reference)))
        }
        n => Err(ConfigError::FunctionCount(n)),
    }
}

/// Runs case tables through a [`Comparator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    comparator: Comparator,
}

impl Dispatcher {
    pub fn new(tolerance: impl Into<Tolerance>) -> Self {
        Self::with_config(CompareConfig::new(tolerance))
    }

    pub fn with_config(config: CompareConfig) -> Self {
        Self {
            comparator: Comparator::with_config(config),
        }
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Run every case of `table`.
    ///
    /// `functions` holds the function under test and, optionally, a
    /// reference function whose results serve as the expected outputs.
    pub fn run<R>(&self, table: &CaseTable, functions: &[Value], reporter: &mut R) -> Result<RunSummary>
    where
        R: Reporter + ?Sized,
    {
        let (primary, reference) = parse_functions(functions)?;
        let source = if reference.is_some() {
            ExpectedSource::Reference
        } else {
            ExpectedSource::Table
        };
        table.validate_for(primary.signature(), source)?;
        debug!(
            function = primary.name(),
            reference = reference.map(Callable::name),
            cases = table.len(),
            tolerance = self.comparator.tolerance().value(),
            "dispatching cases"
        );

        let mut summary = RunSummary::default();
        for (index, case) in table.iter().enumerate() {
            reporter.case_started(index, case.label());
            let started = Instant::now();
            let failures = self.run_case(index, case, primary, reference, reporter)?;
            let outcome = CaseOutcome {
                label: case.label().to_string(),
                index,
                failures,
                duration: started.elapsed(),
            };
            reporter.case_finished(&outcome);
            summary.cases.push(outcome);
        }
        Ok(summary)
    }

    fn run_case<R>(
        &self,
        index: usize,
        case: &Case,
        primary: &Callable,
        reference: Option<&Callable>,
        reporter: &mut R,
    ) -> Result<usize>
    where
        R: Reporter + ?Sized,
    {
        let signature = primary.signature();
        let inputs = case.inputs(signature.arity());
        let expected = match reference {
            Some(reference) => reference
                .call(&inputs)
                .map_err(|err| Error::call(reference.name(), err))?,
            None => case.expected(signature.arity(), signature.output_count()).to_vec(),
        };
        let actual = primary
            .call(&inputs)
            .map_err(|err| Error::call(primary.name(), err))?;

        let mut failures = 0;
        for (output, (got, want)) in actual.iter().zip(&expected).enumerate() {
            let result = self.comparator.compare(got, want)?;
            if !result.ok {
                failures += 1;
                reporter.failure(&Diagnostic::new(case, index, output, got, want, result));
            }
        }
        Ok(failures)
    }
}

/// Run `table` against one function (expected outputs from the table) or two
/// (expected outputs from the second), comparing under `tolerance`.
pub fn run_cases<R>(
    tolerance: impl Into<Tolerance>,
    table: &CaseTable,
    functions: &[Value],
    reporter: &mut R,
) -> Result<RunSummary>
where
    R: Reporter + ?Sized,
{
    Dispatcher::new(tolerance).run(table, functions, reporter)
}
