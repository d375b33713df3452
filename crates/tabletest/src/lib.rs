#![forbid(unsafe_code)]
// Allow these clippy lints for numeric comparison code readability
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::use_self)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]

//! # Tabletest
//!
//! Table-driven function testing with tolerance-aware comparison.
//!
//! Tabletest provides:
//! - **Equality engine**: [`compare`] walks two [`Value`]s of any shape and
//!   reports where they first differ, honoring a numeric [`Tolerance`]
//! - **Case dispatcher**: [`run_cases`] feeds every row of a [`CaseTable`] to
//!   a function under test and reports each mismatching output
//! - **Benchmark adapter**: [`bench_cases`] times the same tables
//! - **Predicates**: [`any`] and [`all`] over parallel input columns
//!
//! ## Example
//!
//! ```rust
//! use tabletest::{Callable, CaseTable, Diagnostic, case, run_cases};
//!
//! let table = CaseTable::from_cases([
//!     case!("square", 3.0, 9.0),
//!     case!("square", -2.0, 4.0),
//! ])
//! .unwrap();
//!
//! let square = Callable::new("square", |x: f64| x * x);
//! let mut failures: Vec<Diagnostic> = Vec::new();
//! let summary = run_cases(1e-9, &table, &[square.into()], &mut failures).unwrap();
//!
//! assert!(summary.is_success());
//! assert!(failures.is_empty());
//! ```
//!
//! ## Comparing against a reference
//!
//! With two functions the expected outputs are computed by the second one:
//!
//! ```rust
//! use tabletest::{Callable, CaseTable, Diagnostic, case, run_cases};
//!
//! let table = CaseTable::from_cases([case!("", 4.0), case!("", 2.0)]).unwrap();
//! let sqrt = Callable::new("sqrt", f64::sqrt);
//! let reference = Callable::new("newton", |x: f64| {
//!     let mut r = x.max(1.0);
//!     for _ in 0..60 {
//!         r = 0.5 * (r + x / r);
//!     }
//!     r
//! });
//!
//! let mut failures: Vec<Diagnostic> = Vec::new();
//! run_cases(1e-6, &table, &[sqrt.into(), reference.into()], &mut failures).unwrap();
//! assert!(failures.is_empty());
//! ```
//!
//! ## Tolerance
//!
//! Two numbers `x` (actual) and `y` (expected) are equal when
//! `|x - y| <= t * |y|`, or `|x - y| <= t` when that bound is zero. NaN equals
//! NaN, and `+0`/`-0` are distinct.

pub mod arbitrary;
pub mod bench;
pub mod cases;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod equal;
pub mod error;
pub mod func;
pub mod predicate;
pub mod tolerance;
pub mod value;

pub use arbitrary::{ArbitraryGen, DEFAULT_SEED, SeedPolicy};
pub use bench::{BenchConfig, BenchResult, OutlierRemoval, bench_cases};
pub use cases::{Case, CaseTable, ExpectedSource};
pub use config::{CompareConfig, DEFAULT_TRIALS};
pub use convert::{FromValue, IntoOutputs, IntoValue, Typed};
pub use dispatch::{
    CaseOutcome, Diagnostic, Dispatcher, Reporter, RunSummary, TracingReporter, run_cases,
};
pub use equal::{Comparator, ComparisonResult, Delta, Mismatch, Position, compare};
pub use error::{ArbitraryError, CallError, ConfigError, Error, Result};
pub use func::{Callable, Function, IntoCallable, Signature};
pub use predicate::{all, any};
pub use tolerance::Tolerance;
pub use value::{Complex, Kind, Opaque, Record, RecordType, Value, ValueType};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::case;
    pub use crate::{
        Callable, Case, CaseTable, CompareConfig, Comparator, ComparisonResult, Complex,
        Diagnostic, Dispatcher, Position, Record, Reporter, SeedPolicy, Tolerance, Value,
        ValueType, compare, run_cases,
    };
}
