//! Random argument synthesis for functional-equivalence checks.
//!
//! Values are drawn from `proptest` strategies built per declared
//! [`ValueType`]. Each [`ArbitraryGen`] owns its own seeded runner, so two
//! comparisons never share generator state.

use std::fmt;
use std::str::FromStr;

use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::string::string_regex;
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};
use serde::{Deserialize, Serialize};

use crate::error::{ArbitraryError, ConfigError};
use crate::func::Signature;
use crate::value::{Complex, Record, Value, ValueType};

/// Seed used by [`SeedPolicy::default`].
pub const DEFAULT_SEED: u64 = 99;

const MAX_COLLECTION_LEN: usize = 8;

/// Where a comparison's random seed comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// The same seed every time; runs are reproducible.
    Fixed(u64),
    /// A fresh seed from the wall clock for every comparison.
    Time,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_SEED)
    }
}

impl SeedPolicy {
    /// The concrete seed for one comparison.
    pub fn resolve(self) -> u64 {
        match self {
            Self::Fixed(seed) => seed,
            Self::Time => {
                let now = chrono::Utc::now();
                now.timestamp_nanos_opt()
                    .unwrap_or_else(|| now.timestamp_micros())
                    .unsigned_abs()
            }
        }
    }
}

impl FromStr for SeedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("time") {
            return Ok(Self::Time);
        }
        s.parse()
            .map(Self::Fixed)
            .map_err(|_| ConfigError::InvalidSeed(s.to_string()))
    }
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(seed) => write!(f, "{seed}"),
            Self::Time => f.write_str("time"),
        }
    }
}

/// A seeded source of random [`Value`]s.
pub struct ArbitraryGen {
    runner: TestRunner,
    seed: u64,
}

impl ArbitraryGen {
    /// Create a generator whose runner executes `trials` cases.
    pub fn new(seed: u64, trials: u32) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        let config = Config {
            cases: trials,
            failure_persistence: None,
            ..Config::default()
        };
        Self {
            runner: TestRunner::new_with_rng(config, TestRng::from_seed(RngAlgorithm::ChaCha, &bytes)),
            seed,
        }
    }

    pub fn from_policy(policy: SeedPolicy, trials: u32) -> Self {
        Self::new(policy.resolve(), trials)
    }

    /// The resolved seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw one value of the declared type.
    pub fn value(&mut self, ty: &ValueType) -> Result<Value, ArbitraryError> {
        let strategy = strategy_for(ty)?;
        self.draw(&strategy)
    }

    /// Draw one argument tuple for a signature.
    pub fn arguments(&mut self, signature: &Signature) -> Result<Vec<Value>, ArbitraryError> {
        let strategy = arguments_strategy(signature)?;
        self.draw(&strategy)
    }

    /// Draw from a prepared strategy.
    pub fn draw<S>(&mut self, strategy: &S) -> Result<S::Value, ArbitraryError>
    where
        S: Strategy,
    {
        strategy
            .new_tree(&mut self.runner)
            .map(|tree| tree.current())
            .map_err(|reason| ArbitraryError::Rejected(format!("{reason:?}")))
    }

    /// The underlying runner, for shrinking property checks.
    pub fn runner_mut(&mut self) -> &mut TestRunner {
        &mut self.runner
    }
}

impl fmt::Debug for ArbitraryGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArbitraryGen")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

fn float_strategy() -> BoxedStrategy<f64> {
    prop_oneof![
        3 => -1e3..1e3f64,
        1 => -1e12..1e12f64,
        1 => Just(0.0),
    ]
    .boxed()
}

fn dedup_keys(entries: Vec<(Value, Value)>) -> Vec<(Value, Value)> {
    let mut unique: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if !unique.iter().any(|(seen, _)| *seen == key) {
            unique.push((key, value));
        }
    }
    unique
}

fn fold_strategies(parts: Vec<BoxedStrategy<Value>>) -> BoxedStrategy<Vec<Value>> {
    parts
        .into_iter()
        .fold(Just(Vec::new()).boxed(), |acc, part| {
            (acc, part)
                .prop_map(|(mut values, value)| {
                    values.push(value);
                    values
                })
                .boxed()
        })
}

/// Strategy producing values admitted by `ty`.
///
/// Functions, opaque payloads and `Any` have no generator.
pub fn strategy_for(ty: &ValueType) -> Result<BoxedStrategy<Value>, ArbitraryError> {
    let strategy = match ty {
        ValueType::Nil => Just(Value::Nil).boxed(),
        ValueType::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
        ValueType::Int => (-1000i64..=1000).prop_map(Value::Int).boxed(),
        ValueType::Uint => (0u64..=1000).prop_map(Value::Uint).boxed(),
        ValueType::BoundedInt { min, max } => {
            let (low, high) = ((*min).max(-1000), (*max).min(1000));
            let range = if low <= high { low..=high } else { *min..=*max };
            range.prop_map(Value::Int).boxed()
        }
        ValueType::BoundedUint { max } => (0..=(*max).min(1000)).prop_map(Value::Uint).boxed(),
        ValueType::Float => float_strategy().prop_map(Value::Float).boxed(),
        ValueType::Complex => (float_strategy(), float_strategy())
            .prop_map(|(re, im)| Value::Complex(Complex::new(re, im)))
            .boxed(),
        ValueType::Text => string_regex("[ -~]{0,16}")
            .map_err(|err| ArbitraryError::Rejected(err.to_string()))?
            .prop_map(Value::Text)
            .boxed(),
        ValueType::Seq(elem) => {
            proptest::collection::vec(strategy_for(elem)?, 0..=MAX_COLLECTION_LEN)
                .prop_map(Value::Seq)
                .boxed()
        }
        ValueType::Array(elem, len) => proptest::collection::vec(strategy_for(elem)?, *len)
            .prop_map(Value::Array)
            .boxed(),
        ValueType::Map(key, value) => proptest::collection::vec(
            (strategy_for(key)?, strategy_for(value)?),
            0..=MAX_COLLECTION_LEN,
        )
        .prop_map(|entries| Value::Map(dedup_keys(entries)))
        .boxed(),
        ValueType::Record(record) => {
            let parts = record
                .fields
                .iter()
                .map(|(_, ty)| strategy_for(ty))
                .collect::<Result<Vec<_>, _>>()?;
            let name = record.name.clone();
            let names: Vec<String> = record.fields.iter().map(|(n, _)| n.clone()).collect();
            fold_strategies(parts)
                .prop_map(move |values| {
                    let record = names
                        .iter()
                        .zip(values)
                        .fold(Record::new(name.clone()), |record, (field, value)| {
                            record.with_field(field.clone(), value)
                        });
                    Value::Record(record)
                })
                .boxed()
        }
        ValueType::Optional(inner) => prop_oneof![
            1 => Just(Value::Nil),
            3 => strategy_for(inner)?,
        ]
        .boxed(),
        ValueType::Func(_) | ValueType::Opaque(_) | ValueType::Any => {
            return Err(ArbitraryError::Unsupported(ty.clone()));
        }
    };
    Ok(strategy)
}

/// Strategy producing complete argument tuples for `signature`.
pub fn arguments_strategy(
    signature: &Signature,
) -> Result<BoxedStrategy<Vec<Value>>, ArbitraryError> {
    let parts = signature
        .inputs
        .iter()
        .map(strategy_for)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fold_strategies(parts))
}
