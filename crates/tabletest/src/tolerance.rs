//! Numeric tolerance.

use serde::{Deserialize, Serialize};

use crate::value::{Complex, Value};

/// A non-negative, finite relative tolerance.
///
/// Every constructor takes the magnitude of its input; NaN, infinities and
/// non-numeric values collapse to [`Tolerance::EXACT`]. Construction never
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Tolerance(f64);

impl Tolerance {
    /// Exact equality.
    pub const EXACT: Self = Self(0.0);

    pub fn new(raw: f64) -> Self {
        let magnitude = raw.abs();
        if magnitude.is_finite() {
            Self(magnitude)
        } else {
            Self::EXACT
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_exact(self) -> bool {
        self.0 == 0.0
    }

    /// Coerce a dynamic value. Only numbers count.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_value(value: &Value) -> Self {
        match value.underlying() {
            Value::Float(x) => Self::new(*x),
            Value::Int(n) => Self::new(*n as f64),
            Value::Uint(n) => Self::new(*n as f64),
            Value::Complex(z) => Self::new(z.norm()),
            _ => Self::EXACT,
        }
    }

    /// Maximum permitted `|actual - expected|`.
    ///
    /// Relative to `expected`, falling back to the raw tolerance when the
    /// relative bound is zero.
    pub fn bound(self, expected: f64) -> f64 {
        let bound = self.0 * expected.abs();
        if bound == 0.0 { self.0 } else { bound }
    }
}

impl From<f64> for Tolerance {
    fn from(raw: f64) -> Self {
        Self::new(raw)
    }
}

impl From<f32> for Tolerance {
    fn from(raw: f32) -> Self {
        Self::new(f64::from(raw))
    }
}

macro_rules! integer_tolerance {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Tolerance {
            #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
            fn from(raw: $ty) -> Self {
                Self::new(raw as f64)
            }
        }
    )*};
}

integer_tolerance!(i32, i64, u32, u64, usize);

impl From<Complex> for Tolerance {
    fn from(z: Complex) -> Self {
        Self::new(z.norm())
    }
}

impl<T: Into<Self>> From<Option<T>> for Tolerance {
    fn from(raw: Option<T>) -> Self {
        raw.map_or(Self::EXACT, Into::into)
    }
}

impl From<&Value> for Tolerance {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Tolerance> for f64 {
    fn from(tolerance: Tolerance) -> Self {
        tolerance.0
    }
}
