//! The equality engine.
//!
//! [`compare`] walks two values in lockstep, dispatching on the shape of the
//! expected value:
//!
//! - sequences and arrays compare element-wise and stop at the first mismatch;
//! - maps look up every expected key among the actual keys with the engine
//!   itself, so keys may be numeric or composite;
//! - records compare field names and values in declaration order;
//! - floats and complex numbers use the tolerance;
//! - callables are checked for functional equivalence over random arguments;
//! - everything else requires exact equality.
//!
//! The result is a [`ComparisonResult`] describing where the first mismatch
//! was found, never a panic.

use std::cell::RefCell;
use std::fmt;

use proptest::test_runner::{TestCaseError, TestError};
use serde::Serialize;
use tracing::debug;

use crate::arbitrary::{ArbitraryGen, arguments_strategy};
use crate::config::CompareConfig;
use crate::error::{ArbitraryError, Error, Result};
use crate::func::Callable;
use crate::tolerance::Tolerance;
use crate::value::{Complex, Record, Value};

/// One step into a composite value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Position {
    /// Element of a sequence or array, or result of a callable.
    Index(usize),
    /// Entry of a map, by position in the expected key list.
    Key { index: usize, key: String },
    /// Field of a record.
    Field { index: usize, name: String },
}

impl Position {
    pub fn index(&self) -> usize {
        match self {
            Self::Index(index) | Self::Key { index, .. } | Self::Field { index, .. } => *index,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Key { key, .. } => write!(f, "[{key}]"),
            Self::Field { name, .. } => write!(f, ".{name}"),
        }
    }
}

/// Signed difference between actual and expected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Delta {
    Real(f64),
    Complex(Complex),
}

impl Default for Delta {
    fn default() -> Self {
        Self::Real(0.0)
    }
}

impl Delta {
    /// Magnitude of the difference.
    pub fn magnitude(self) -> f64 {
        match self {
            Self::Real(x) => x.abs(),
            Self::Complex(z) => z.norm(),
        }
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(x) => write!(f, "{x:e}"),
            Self::Complex(z) => write!(f, "{z}"),
        }
    }
}

/// Rendered leaf values at the failing location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub actual: String,
    pub expected: String,
    /// Extra context, such as the arguments that made two callables disagree.
    pub context: Option<String>,
}

/// Outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ComparisonResult {
    pub ok: bool,
    /// The failing (or last compared) leaf was a number.
    pub numerical: bool,
    pub relative_error: Delta,
    pub absolute_error: Delta,
    /// Location of the mismatch, outermost first.
    pub path: Vec<Position>,
    pub length_mismatch: bool,
    pub missing_value: bool,
    pub shape_mismatch: bool,
    pub mismatch: Option<Mismatch>,
}

impl ComparisonResult {
    fn equal() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    fn unequal(actual: impl fmt::Display, expected: impl fmt::Display) -> Self {
        Self {
            ok: false,
            mismatch: Some(Mismatch {
                actual: actual.to_string(),
                expected: expected.to_string(),
                context: None,
            }),
            ..Self::default()
        }
    }

    fn shape(actual: &Value, expected: &Value) -> Self {
        Self {
            shape_mismatch: true,
            ..Self::unequal(
                format_args!("{actual} ({})", actual.kind()),
                format_args!("{expected} ({})", expected.kind()),
            )
        }
    }

    fn length(actual: usize, expected: usize) -> Self {
        Self {
            length_mismatch: true,
            ..Self::unequal(
                format_args!("length {actual}"),
                format_args!("length {expected}"),
            )
        }
    }

    fn within(mut self, position: Position) -> Self {
        self.path.insert(0, position);
        self
    }

    /// The outermost failing location.
    pub fn position(&self) -> Option<&Position> {
        self.path.first()
    }

    /// The failing location rendered as a path suffix, e.g. `[2].Name[x]`.
    pub fn location(&self) -> String {
        self.path.iter().map(ToString::to_string).collect()
    }
}

/// A configured comparison engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    config: CompareConfig,
}

impl Comparator {
    pub fn new(tolerance: impl Into<Tolerance>) -> Self {
        Self::with_config(CompareConfig::new(tolerance))
    }

    pub fn with_config(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    pub fn tolerance(&self) -> Tolerance {
        self.config.tolerance
    }

    /// Compare `actual` against `expected`.
    ///
    /// Only failures to run a functional-equivalence check are errors; every
    /// kind of inequality is reported in the result.
    pub fn compare(&self, actual: &Value, expected: &Value) -> Result<ComparisonResult> {
        self.compare_values(actual, expected)
    }

    fn compare_values(&self, actual: &Value, expected: &Value) -> Result<ComparisonResult> {
        let (actual, expected) = (actual.underlying(), expected.underlying());
        let tolerance = self.config.tolerance;
        let result = match (actual, expected) {
            (Value::Seq(a), Value::Seq(e)) | (Value::Array(a), Value::Array(e)) => {
                self.compare_sequences(a, e)?
            }
            (Value::Map(a), Value::Map(e)) => self.compare_maps(a, e)?,
            (Value::Record(a), Value::Record(e)) => self.compare_records(a, e)?,
            (Value::Float(x), Value::Float(y)) => compare_real(*x, *y, tolerance),
            (Value::Complex(x), Value::Complex(y)) => compare_complex(*x, *y, tolerance),
            (Value::Func(f), Value::Func(g)) => self.compare_functions(f, g)?,
            _ if actual.kind() != expected.kind() => ComparisonResult::shape(actual, expected),
            _ if actual == expected => ComparisonResult::equal(),
            _ => ComparisonResult::unequal(actual, expected),
        };
        Ok(result)
    }

    fn compare_sequences(&self, actual: &[Value], expected: &[Value]) -> Result<ComparisonResult> {
        if actual.len() != expected.len() {
            return Ok(ComparisonResult::length(actual.len(), expected.len()));
        }
        for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
            let result = self.compare_values(a, e)?;
            if !result.ok {
                return Ok(result.within(Position::Index(index)));
            }
        }
        Ok(ComparisonResult::equal())
    }

    fn compare_maps(
        &self,
        actual: &[(Value, Value)],
        expected: &[(Value, Value)],
    ) -> Result<ComparisonResult> {
        if actual.len() != expected.len() {
            return Ok(ComparisonResult::length(actual.len(), expected.len()));
        }
        for (index, (key, want)) in expected.iter().enumerate() {
            let position = Position::Key {
                index,
                key: key.to_string(),
            };
            let found = match self.find_key(actual, key, true)? {
                Some(got) => Some(got),
                None => self.find_key(actual, key, false)?,
            };
            let Some(got) = found else {
                let result = ComparisonResult {
                    missing_value: true,
                    ..ComparisonResult::unequal("<missing>", want)
                };
                return Ok(result.within(position));
            };
            let result = self.compare_values(got, want)?;
            if !result.ok {
                return Ok(result.within(position));
            }
        }
        Ok(ComparisonResult::equal())
    }

    /// The value stored under `key`, preferring an exact key match over one
    /// within tolerance.
    fn find_key<'a>(
        &self,
        entries: &'a [(Value, Value)],
        key: &Value,
        exact: bool,
    ) -> Result<Option<&'a Value>> {
        let exact_config = CompareConfig {
            tolerance: Tolerance::EXACT,
            ..self.config
        };
        let comparator = if exact {
            Self::with_config(exact_config)
        } else {
            *self
        };
        for (candidate, value) in entries {
            if comparator.compare_values(candidate, key)?.ok {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn compare_records(&self, actual: &Record, expected: &Record) -> Result<ComparisonResult> {
        if actual.len() != expected.len() {
            return Ok(ComparisonResult::length(actual.len(), expected.len()));
        }
        let fields = actual.fields().iter().zip(expected.fields());
        for (index, ((got_name, got), (want_name, want))) in fields.enumerate() {
            let position = Position::Field {
                index,
                name: want_name.clone(),
            };
            if got_name != want_name {
                let result = ComparisonResult {
                    missing_value: true,
                    ..ComparisonResult::unequal(
                        format_args!("field {got_name}"),
                        format_args!("field {want_name}"),
                    )
                };
                return Ok(result.within(position));
            }
            let result = self.compare_values(got, want)?;
            if !result.ok {
                return Ok(result.within(position));
            }
        }
        Ok(ComparisonResult::equal())
    }

    fn compare_functions(&self, actual: &Callable, expected: &Callable) -> Result<ComparisonResult> {
        if actual.signature() != expected.signature() {
            return Ok(ComparisonResult {
                shape_mismatch: true,
                ..ComparisonResult::unequal(actual.signature(), expected.signature())
            });
        }
        if actual.ptr_eq(expected) {
            return Ok(ComparisonResult::equal());
        }
        let generator = ArbitraryGen::from_policy(self.config.seed, self.config.trials);
        debug!(
            actual = actual.name(),
            expected = expected.name(),
            seed = generator.seed(),
            trials = self.config.trials,
            exact = self.config.tolerance.is_exact(),
            "checking functional equivalence"
        );
        if self.config.tolerance.is_exact() {
            self.check_exact(generator, actual, expected)
        } else {
            self.check_sampled(generator, actual, expected)
        }
    }

    /// Exact agreement as a shrinking property check.
    fn check_exact(
        &self,
        mut generator: ArbitraryGen,
        actual: &Callable,
        expected: &Callable,
    ) -> Result<ComparisonResult> {
        let strategy = arguments_strategy(actual.signature())?;
        let call_failure: RefCell<Option<Error>> = RefCell::new(None);
        let outcome = generator.runner_mut().run(&strategy, |args| {
            match self.evaluate_pair(actual, expected, &args) {
                Ok(None) => Ok(()),
                Ok(Some(result)) => Err(TestCaseError::fail(format!(
                    "results differ at {}",
                    result.location()
                ))),
                Err(err) => {
                    let reason = err.to_string();
                    call_failure.borrow_mut().get_or_insert(err);
                    Err(TestCaseError::fail(reason))
                }
            }
        });
        match outcome {
            Ok(()) => Ok(ComparisonResult::equal()),
            Err(TestError::Abort(reason)) => {
                Err(ArbitraryError::Rejected(format!("{reason:?}")).into())
            }
            Err(TestError::Fail(reason, args)) => {
                if let Some(err) = call_failure.into_inner() {
                    return Err(err);
                }
                let minimal = self.evaluate_pair(actual, expected, &args)?;
                Ok(minimal.unwrap_or_else(|| {
                    let mut result = ComparisonResult::unequal(format!("{reason:?}"), "agreement");
                    set_context(&mut result, &args);
                    result
                }))
            }
        }
    }

    /// Agreement within tolerance over `trials` random argument tuples.
    fn check_sampled(
        &self,
        mut generator: ArbitraryGen,
        actual: &Callable,
        expected: &Callable,
    ) -> Result<ComparisonResult> {
        let strategy = arguments_strategy(actual.signature())?;
        for trial in 0..self.config.trials {
            let args = generator.draw(&strategy)?;
            if let Some(result) = self.evaluate_pair(actual, expected, &args)? {
                debug!(trial, location = %result.location(), "callables disagree");
                return Ok(result);
            }
        }
        Ok(ComparisonResult::equal())
    }

    /// Call both functions and compare their results; `None` when they agree.
    fn evaluate_pair(
        &self,
        actual: &Callable,
        expected: &Callable,
        args: &[Value],
    ) -> Result<Option<ComparisonResult>> {
        let got = actual
            .call(args)
            .map_err(|err| Error::call(actual.name(), err))?;
        let want = expected
            .call(args)
            .map_err(|err| Error::call(expected.name(), err))?;
        for (index, (g, w)) in got.iter().zip(&want).enumerate() {
            let result = self.compare_values(g, w)?;
            if !result.ok {
                let mut result = result.within(Position::Index(index));
                set_context(&mut result, args);
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}

fn set_context(result: &mut ComparisonResult, args: &[Value]) {
    let rendered = format!("arguments {}", Value::Seq(args.to_vec()));
    if let Some(mismatch) = result.mismatch.as_mut() {
        mismatch.context = Some(rendered);
    }
}

/// Compare `actual` against `expected` under `tolerance` with the default
/// seed policy and trial count.
pub fn compare(
    actual: &Value,
    expected: &Value,
    tolerance: impl Into<Tolerance>,
) -> Result<ComparisonResult> {
    Comparator::new(tolerance).compare(actual, expected)
}

struct RealOutcome {
    ok: bool,
    relative: f64,
    absolute: f64,
}

#[allow(clippy::float_cmp)]
fn real_outcome(x: f64, y: f64, tolerance: Tolerance) -> RealOutcome {
    let exact = |ok| RealOutcome {
        ok,
        relative: 0.0,
        absolute: 0.0,
    };
    if x.is_nan() && y.is_nan() {
        return exact(true);
    }
    if x == y || y.is_infinite() {
        return exact(x.is_sign_negative() == y.is_sign_negative());
    }
    let diff = x - y;
    RealOutcome {
        ok: diff.abs() <= tolerance.bound(y),
        relative: if y == 0.0 { diff } else { diff / y },
        absolute: diff,
    }
}

fn compare_real(x: f64, y: f64, tolerance: Tolerance) -> ComparisonResult {
    let outcome = real_outcome(x, y, tolerance);
    let base = if outcome.ok {
        ComparisonResult::equal()
    } else {
        ComparisonResult::unequal(x, y)
    };
    ComparisonResult {
        numerical: true,
        relative_error: Delta::Real(outcome.relative),
        absolute_error: Delta::Real(outcome.absolute),
        ..base
    }
}

fn compare_complex(x: Complex, y: Complex, tolerance: Tolerance) -> ComparisonResult {
    let re = real_outcome(x.re, y.re, tolerance);
    let im = real_outcome(x.im, y.im, tolerance);
    let base = if re.ok && im.ok {
        ComparisonResult::equal()
    } else {
        ComparisonResult::unequal(x, y)
    };
    ComparisonResult {
        numerical: true,
        relative_error: Delta::Complex(Complex::new(re.relative, im.relative)),
        absolute_error: Delta::Complex(Complex::new(re.absolute, im.absolute)),
        ..base
    }
}
