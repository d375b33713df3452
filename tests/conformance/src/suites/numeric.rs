//! Numeric suite: scalar functions, tolerance policy and timing.

use std::f64::consts::PI;

use tabletest::{Callable, Complex, Delta, Diagnostic, Dispatcher, Value, case};

use super::{SuiteTest, boxed, table};
use crate::harness::{ConformanceTest, TestCategory, TestContext};

const SUITE: &str = "numeric";

fn square() -> Value {
    Callable::new("square", |x: f64| x * x).into()
}

fn newton_sqrt(x: f64) -> f64 {
    let mut r = x.max(1.0);
    for _ in 0..60 {
        r = 0.5 * (r + x / r);
    }
    r
}

fn square_table(ctx: &mut TestContext<'_>) {
    let Some(table) = table(ctx, [case!("square", 3.0, 9.0), case!("square", -2.0, 4.0)]) else {
        return;
    };
    ctx.check_cases_within(1e-9, &table, &[square()]);
}

fn square_wrong_expectation(ctx: &mut TestContext<'_>) {
    let Some(table) = table(ctx, [case!("square", 3.0, 9.0), case!("square", -2.0, 5.0)]) else {
        return;
    };
    let mut failures: Vec<Diagnostic> = Vec::new();
    let dispatcher = Dispatcher::with_config(ctx.config().with_tolerance(1e-9));
    match dispatcher.run(&table, &[square()], &mut failures) {
        Ok(summary) => {
            ctx.assert_true(summary.failed() == 1, "exactly one case fails");
            ctx.assert_true(failures.len() == 1, "exactly one diagnostic");
            if let Some(failure) = failures.first() {
                ctx.log_actual("diagnostic", &failure.to_string());
                ctx.assert_true(failure.label == "square", "failure is labeled square");
                ctx.assert_true(failure.case == 1 && failure.output == 0, "failure cites results[1][0]");
                let error = failure.relative_error.map_or(0.0, Delta::magnitude);
                ctx.assert_true(error > 0.0, "relative error is nonzero");
            }
        }
        Err(err) => ctx.fail(format!("dispatch error: {err}")),
    }
}

fn complex_square(ctx: &mut TestContext<'_>) {
    let f = Callable::new("complex_square", |z: Complex| {
        Complex::new(z.re.mul_add(z.re, -(z.im * z.im)), 2.0 * z.re * z.im)
    });
    let Some(table) = table(
        ctx,
        [
            case!("i", Complex::new(0.0, 1.0), Complex::new(-1.0, 0.0)),
            case!("diagonal", Complex::new(0.5, 0.5), Complex::new(0.0, 0.5)),
            case!("conjugate", Complex::new(1.0, -1.0), Complex::new(0.0, -2.0)),
        ],
    ) else {
        return;
    };
    ctx.check_cases_within(1e-12, &table, &[f.into()]);
}

fn hypot_two_inputs(ctx: &mut TestContext<'_>) {
    let f = Callable::new("hypot", f64::hypot);
    let Some(table) = table(
        ctx,
        [
            case!("3-4-5", 3.0, 4.0, 5.0),
            case!("5-12-13", 5.0, 12.0, 13.0),
            case!("unit", 1.0, 1.0, std::f64::consts::SQRT_2),
            case!("infinite", f64::INFINITY, 1.0, f64::INFINITY),
        ],
    ) else {
        return;
    };
    ctx.check_cases_within(1e-12, &table, &[f.into()]);
}

fn sqrt_against_newton(ctx: &mut TestContext<'_>) {
    let sqrt: Value = Callable::new("sqrt", f64::sqrt).into();
    let reference: Value = Callable::new("newton_sqrt", newton_sqrt).into();
    let Some(table) = table(
        ctx,
        [
            case!("quarter", 0.25),
            case!("two", 2.0),
            case!("large", 1e6),
            case!("nan", f64::NAN),
        ],
    ) else {
        return;
    };
    ctx.check_cases_within(1e-6, &table, &[sqrt, reference]);
}

fn doubling_twins(ctx: &mut TestContext<'_>) {
    let scaled: Value = Callable::new("scaled", |x: f64| 2.0 * x).into();
    let summed: Value = Callable::new("summed", |x: f64| x + x).into();
    let Some(table) = table(
        ctx,
        [
            case!("1", 1.0),
            case!("2", 1.1),
            case!("3", PI),
            case!("4", f64::NAN),
        ],
    ) else {
        return;
    };
    ctx.check_cases_within(0.0, &table, &[scaled, summed]);
}

fn integer_division(ctx: &mut TestContext<'_>) {
    let divmod = Callable::new("divmod", |a: i64, b: i64| (a / b, a % b));
    let Some(table) = table(
        ctx,
        [
            case!("7/2", 7i64, 2i64, 3i64, 1i64),
            case!("9/4", 9i64, 4i64, 2i64, 1i64),
            case!("-7/2", -7i64, 2i64, -3i64, -1i64),
        ],
    ) else {
        return;
    };
    ctx.check_cases(&table, &[divmod.into()]);
}

fn word_length(ctx: &mut TestContext<'_>) {
    let medium = Callable::new("medium_word", |s: String| s.len() > 3 && s.len() < 6);
    let Some(table) = table(
        ctx,
        [
            case!("1", "dog", false),
            case!("2", "caterpillar", false),
            case!("3", "frog", true),
        ],
    ) else {
        return;
    };
    ctx.check_cases(&table, &[medium.into()]);
}

fn powers(n: i64, x: f64) -> Vec<f64> {
    let n = i32::try_from(n).unwrap_or_default();
    (1..=n).map(|k| x.powi(k)).collect()
}

fn sequence_outputs(ctx: &mut TestContext<'_>) {
    let f = Callable::new("powers", powers);
    let Some(table) = table(
        ctx,
        [
            case!("1 output", 1i64, 0.1, vec![0.1]),
            case!("2 outputs", 2i64, 0.2, vec![0.2, 0.04]),
            case!("3 outputs", 3i64, 0.3, vec![0.3, 0.09, 0.027]),
        ],
    ) else {
        return;
    };
    ctx.check_cases_within(1e-12, &table, &[f.into()]);
}

fn sequence_length_mismatch(ctx: &mut TestContext<'_>) {
    let f = Callable::new("powers", powers);
    let Some(table) = table(ctx, [case!("short", 3i64, 0.5, vec![0.5, 0.25])]) else {
        return;
    };
    let mut failures: Vec<Diagnostic> = Vec::new();
    match Dispatcher::new(1e-12).run(&table, &[f.into()], &mut failures) {
        Ok(_) => {
            ctx.assert_true(failures.len() == 1, "one diagnostic");
            if let Some(failure) = failures.first() {
                ctx.log_actual("diagnostic", &failure.to_string());
                ctx.assert_true(failure.length_mismatch, "lengths differ");
            }
        }
        Err(err) => ctx.fail(format!("dispatch error: {err}")),
    }
}

fn fallible_outputs(ctx: &mut TestContext<'_>) {
    let checked = Callable::new("checked_sqrt", |x: f64| -> Result<f64, String> {
        if x < 0.0 {
            Err(format!("negative input {x}"))
        } else {
            Ok(x.sqrt())
        }
    });
    let Some(table) = table(
        ctx,
        [
            case!("four", 4.0, 2.0, Value::Nil),
            case!("negative", -1.0, Value::Nil, "negative input -1"),
        ],
    ) else {
        return;
    };
    ctx.check_cases_within(1e-12, &table, &[checked.into()]);
}

fn tolerance_boundaries(ctx: &mut TestContext<'_>) {
    let nan = Value::Float(f64::NAN);
    let inf = Value::Float(f64::INFINITY);
    let neg_inf = Value::Float(f64::NEG_INFINITY);

    ctx.section("relative", |ctx| {
        ctx.assert_equal_within(1e-3, &Value::Float(1000.9), &Value::Float(1000.0));
        ctx.assert_differ_within(1e-3, &Value::Float(1001.1), &Value::Float(1000.0));
    });
    ctx.section("absolute fallback", |ctx| {
        ctx.assert_equal_within(1e-3, &Value::Float(5e-4), &Value::Float(0.0));
        ctx.assert_differ_within(1e-3, &Value::Float(2e-3), &Value::Float(0.0));
    });
    ctx.section("special values", |ctx| {
        ctx.assert_equal_within(0.0, &nan, &nan);
        ctx.assert_equal_within(0.0, &inf, &inf);
        ctx.assert_differ_within(1.0, &inf, &neg_inf);
        ctx.assert_equal_within(0.0, &Value::Float(1e308), &inf);
        ctx.assert_differ_within(0.5, &Value::Float(1e308), &neg_inf);
        ctx.assert_differ_within(1.0, &Value::Float(-0.0), &Value::Float(0.0));
    });
    ctx.section("integers", |ctx| {
        ctx.assert_equal_within(0.0, &Value::Int(-3), &Value::Int(-3));
        ctx.assert_differ_within(0.5, &Value::Uint(11), &Value::Uint(10));
    });
}

fn square_timing(ctx: &mut TestContext<'_>) {
    let Some(table) = table(ctx, (0..8).map(|i| {
        let x = f64::from(i);
        case!("square", x, x * x)
    })) else {
        return;
    };
    if let Some(results) = ctx.bench(&table, &square()) {
        ctx.assert_true(results.len() == table.len(), "one result per case");
        let ordered = results
            .iter()
            .all(|r| r.min <= r.median && r.median <= r.p95 && r.p95 <= r.max);
        ctx.assert_true(ordered, "min <= median <= p95 <= max");
    }
}

/// The numeric suite's tests
pub fn all_tests() -> Vec<Box<dyn ConformanceTest>> {
    boxed([
        SuiteTest::new(SUITE, "square", TestCategory::Integration, square_table),
        SuiteTest::new(SUITE, "square_wrong_expectation", TestCategory::EdgeCase, square_wrong_expectation),
        SuiteTest::new(SUITE, "complex_square", TestCategory::Unit, complex_square),
        SuiteTest::new(SUITE, "hypot", TestCategory::Unit, hypot_two_inputs),
        SuiteTest::new(SUITE, "sqrt_against_newton", TestCategory::Integration, sqrt_against_newton),
        SuiteTest::new(SUITE, "doubling_twins", TestCategory::Integration, doubling_twins),
        SuiteTest::new(SUITE, "integer_division", TestCategory::Unit, integer_division),
        SuiteTest::new(SUITE, "word_length", TestCategory::Unit, word_length),
        SuiteTest::new(SUITE, "sequence_outputs", TestCategory::Unit, sequence_outputs),
        SuiteTest::new(SUITE, "sequence_length_mismatch", TestCategory::EdgeCase, sequence_length_mismatch),
        SuiteTest::new(SUITE, "fallible_outputs", TestCategory::Unit, fallible_outputs),
        SuiteTest::new(SUITE, "tolerance_boundaries", TestCategory::EdgeCase, tolerance_boundaries),
        SuiteTest::new(SUITE, "square_timing", TestCategory::Performance, square_timing),
    ])
}
