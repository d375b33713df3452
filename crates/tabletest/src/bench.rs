//! Benchmark adapter.
//!
//! Runs the same case tables as the dispatcher, but times repeated calls of
//! a single function instead of checking its results:
//! - Configurable warmup and measurement iterations
//! - Statistics per case (min, max, mean, median, p95, std dev)
//! - Optional MAD outlier removal

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cases::{CaseTable, ExpectedSource};
use crate::dispatch::parse_functions;
use crate::error::{Error, Result};
use crate::value::Value;

/// Method for outlier removal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierRemoval {
    /// No outlier removal
    #[default]
    None,
    /// Median Absolute Deviation method
    Mad {
        /// Number of MADs from median to consider outlier (typically 3.0)
        threshold: f64,
    },
}

/// Configuration for benchmark runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of warmup iterations
    pub warmup_iterations: usize,
    /// Number of measured iterations
    pub measure_iterations: usize,
    /// Outlier removal method
    pub outlier_removal: OutlierRemoval,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: 3,
            measure_iterations: 100,
            outlier_removal: OutlierRemoval::None,
        }
    }
}

impl BenchConfig {
    pub fn with_warmup(mut self, iterations: usize) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.measure_iterations = iterations;
        self
    }

    pub fn with_outlier_removal(mut self, method: OutlierRemoval) -> Self {
        self.outlier_removal = method;
        self
    }
}

/// Timing statistics for one case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchResult {
    /// Case label
    pub label: String,
    /// Zero-based case index
    pub case: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub median: Duration,
    /// 95th percentile
    pub p95: Duration,
    pub std_dev: Duration,
    /// Number of samples the statistics are computed from
    pub iterations: usize,
    pub outliers_removed: usize,
}

impl BenchResult {
    /// Format the result as a human-readable string
    pub fn to_string_pretty(&self) -> String {
        format!(
            "{}[{}]: min={:?}, max={:?}, mean={:?}, median={:?}, p95={:?}, std_dev={:?} ({} iterations)",
            self.label,
            self.case,
            self.min,
            self.max,
            self.mean,
            self.median,
            self.p95,
            self.std_dev,
            self.iterations
        )
    }

    fn from_samples(label: &str, case: usize, samples: &[Duration], outliers_removed: usize) -> Self {
        let n = samples.len();
        let mut sorted = samples.to_vec();
        sorted.sort();

        let (min, max) = match (sorted.first(), sorted.last()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => (Duration::ZERO, Duration::ZERO),
        };
        let median = match n {
            0 => Duration::ZERO,
            n if n % 2 == 0 => (sorted[n / 2 - 1] + sorted[n / 2]) / 2,
            n => sorted[n / 2],
        };

        let total: Duration = samples.iter().sum();
        let mean = u32::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| total / n);

        #[allow(clippy::cast_precision_loss)]
        let variance = if n == 0 {
            0.0
        } else {
            samples
                .iter()
                .map(|d| {
                    let diff = d.as_secs_f64() - mean.as_secs_f64();
                    diff * diff
                })
                .sum::<f64>()
                / n as f64
        };

        Self {
            label: label.to_string(),
            case,
            min,
            max,
            mean,
            median,
            p95: percentile(&sorted, 95.0),
            std_dev: Duration::from_secs_f64(variance.sqrt()),
            iterations: n,
            outliers_removed,
        }
    }
}

/// Calculate percentile from sorted samples
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p / 100.0).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn median_of(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Remove outliers using MAD method
fn remove_outliers_mad(samples: &[Duration], threshold: f64) -> Vec<Duration> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
    sorted.sort_by(f64::total_cmp);
    let median = median_of(&sorted);

    let mut deviations: Vec<f64> = sorted.iter().map(|&x| (x - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    let mad = median_of(&deviations);

    // 1.4826 scales MAD to the standard deviation of a normal distribution
    let cutoff_high = threshold.mul_add(mad * 1.4826, median);
    let cutoff_low = (-threshold).mul_add(mad * 1.4826, median);

    samples
        .iter()
        .filter(|d| {
            let v = d.as_secs_f64();
            v >= cutoff_low && v <= cutoff_high
        })
        .copied()
        .collect()
}

/// Time `function` over every case of `table`.
///
/// The table is validated as for a two-function dispatch: the inputs must be
/// present and admitted by the signature, expected outputs are allowed but
/// ignored. Results are discarded; call failures abort the run.
pub fn bench_cases(table: &CaseTable, function: &Value, config: &BenchConfig) -> Result<Vec<BenchResult>> {
    let (function, _) = parse_functions(std::slice::from_ref(function))?;
    table.validate_for(function.signature(), ExpectedSource::Reference)?;
    let arity = function.signature().arity();

    let mut results = Vec::with_capacity(table.len());
    for (index, case) in table.iter().enumerate() {
        let inputs = case.inputs(arity);
        let call = || {
            function
                .call(&inputs)
                .map_err(|err| Error::call(function.name(), err))
        };

        for _ in 0..config.warmup_iterations {
            std::hint::black_box(call()?);
        }

        let mut samples = Vec::with_capacity(config.measure_iterations);
        for _ in 0..config.measure_iterations {
            let start = Instant::now();
            let outputs = call()?;
            samples.push(start.elapsed());
            std::hint::black_box(outputs);
        }

        let kept = match config.outlier_removal {
            OutlierRemoval::None => samples.clone(),
            OutlierRemoval::Mad { threshold } => remove_outliers_mad(&samples, threshold),
        };
        let result = if kept.is_empty() {
            BenchResult::from_samples(case.label(), index, &samples, 0)
        } else {
            BenchResult::from_samples(case.label(), index, &kept, samples.len() - kept.len())
        };
        debug!(case = index, label = case.label(), mean = ?result.mean, "benchmarked case");
        results.push(result);
    }
    Ok(results)
}
