//! Bridges between native Rust types and [`Value`].
//!
//! Typed closures become [`Callable`](crate::Callable)s by way of these
//! traits: argument types implement [`FromValue`], return types implement
//! [`IntoOutputs`], and both report their declared [`ValueType`] through
//! [`Typed`].

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

use crate::value::{Complex, Value, ValueType};

/// A native type with a declared [`ValueType`].
pub trait Typed {
    fn value_type() -> ValueType;
}

/// Convert a native value into a [`Value`].
pub trait IntoValue: Typed {
    fn into_value(self) -> Value;
}

/// Read a native value back out of a [`Value`].
///
/// `Shared` wrappers are looked through. Returns `None` when the shape does
/// not fit or a number is out of range for the target type.
pub trait FromValue: Typed + Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

/// The result list of a callable.
///
/// Single values produce one output, `()` produces none and tuples produce
/// one output per element.
pub trait IntoOutputs {
    fn output_types() -> Vec<ValueType>;
    fn into_outputs(self) -> Vec<Value>;
}

macro_rules! scalar {
    ($ty:ty, $vt:ident, $variant:ident) => {
        impl Typed for $ty {
            fn value_type() -> ValueType {
                ValueType::$vt
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self.into())
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value.underlying() {
                    Value::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

scalar!(bool, Bool, Bool);
scalar!(f64, Float, Float);
scalar!(Complex, Complex, Complex);
scalar!(String, Text, Text);

macro_rules! integer {
    ($($ty:ty => $vt:ident($wide:ty)),* $(,)?) => {$(
        impl Typed for $ty {
            fn value_type() -> ValueType {
                ValueType::$vt.narrowed(
                    i128::try_from(<$ty>::MIN).unwrap_or(i128::MIN),
                    i128::try_from(<$ty>::MAX).unwrap_or(i128::MAX),
                )
            }
        }

        impl IntoValue for $ty {
            #[allow(
                clippy::cast_possible_wrap,
                clippy::cast_lossless,
                clippy::unnecessary_cast
            )]
            fn into_value(self) -> Value {
                Value::$vt(self as $wide)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value.underlying() {
                    Value::$vt(n) => <$ty>::try_from(*n).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

integer! {
    i8 => Int(i64),
    i16 => Int(i64),
    i32 => Int(i64),
    i64 => Int(i64),
    isize => Int(i64),
    u8 => Uint(u64),
    u16 => Uint(u64),
    u32 => Uint(u64),
    u64 => Uint(u64),
    usize => Uint(u64),
}

impl Typed for f32 {
    fn value_type() -> ValueType {
        ValueType::Float
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|x| x as Self)
    }
}

impl Typed for &'static str {
    fn value_type() -> ValueType {
        ValueType::Text
    }
}

impl IntoValue for &'static str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl Typed for () {
    fn value_type() -> ValueType {
        ValueType::Nil
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

impl Typed for Value {
    fn value_type() -> ValueType {
        ValueType::Any
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::Seq(Box::new(T::value_type()))
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value.underlying() {
            Value::Seq(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: Typed, const N: usize> Typed for [T; N] {
    fn value_type() -> ValueType {
        ValueType::Array(Box::new(T::value_type()), N)
    }
}

impl<T: IntoValue, const N: usize> IntoValue for [T; N] {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(value: &Value) -> Option<Self> {
        match value.underlying() {
            Value::Array(items) if items.len() == N => {
                let items: Vec<T> = items.iter().map(T::from_value).collect::<Option<_>>()?;
                items.try_into().ok()
            }
            _ => None,
        }
    }
}

impl<T: Typed> Typed for Option<T> {
    fn value_type() -> ValueType {
        ValueType::Optional(Box::new(T::value_type()))
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Nil, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        if value.is_nil() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<K: Typed, V: Typed, S> Typed for HashMap<K, V, S> {
    fn value_type() -> ValueType {
        ValueType::Map(Box::new(K::value_type()), Box::new(V::value_type()))
    }
}

impl<K: IntoValue, V: IntoValue, S> IntoValue for HashMap<K, V, S> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K, V, S> FromValue for HashMap<K, V, S>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
    S: std::hash::BuildHasher + Default,
{
    fn from_value(value: &Value) -> Option<Self> {
        match value.underlying() {
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Some((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            _ => None,
        }
    }
}

impl<K: Typed, V: Typed> Typed for BTreeMap<K, V> {
    fn value_type() -> ValueType {
        ValueType::Map(Box::new(K::value_type()), Box::new(V::value_type()))
    }
}

impl<K: IntoValue, V: IntoValue> IntoValue for BTreeMap<K, V> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }
}

impl<K: FromValue + Ord, V: FromValue> FromValue for BTreeMap<K, V> {
    fn from_value(value: &Value) -> Option<Self> {
        match value.underlying() {
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Some((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                value.into_value()
            }
        }
    )*};
}

value_from!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Complex,
    String,
    &'static str,
);

impl<T: IntoValue> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        items.into_value()
    }
}

impl<T: IntoValue, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        items.into_value()
    }
}

impl<T: IntoValue> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.into_value()
    }
}

impl<K: IntoValue, V: IntoValue, S> From<HashMap<K, V, S>> for Value {
    fn from(map: HashMap<K, V, S>) -> Self {
        map.into_value()
    }
}

impl<K: IntoValue, V: IntoValue> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_value()
    }
}

macro_rules! single_output {
    ($($ty:ty),* $(,)?) => {$(
        impl IntoOutputs for $ty {
            fn output_types() -> Vec<ValueType> {
                vec![<$ty as Typed>::value_type()]
            }

            fn into_outputs(self) -> Vec<Value> {
                vec![self.into_value()]
            }
        }
    )*};
}

single_output!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    Complex,
    String,
    &'static str,
    Value,
);

impl<T: IntoValue> IntoOutputs for Vec<T> {
    fn output_types() -> Vec<ValueType> {
        vec![Self::value_type()]
    }

    fn into_outputs(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl<T: IntoValue, const N: usize> IntoOutputs for [T; N] {
    fn output_types() -> Vec<ValueType> {
        vec![Self::value_type()]
    }

    fn into_outputs(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl<T: IntoValue> IntoOutputs for Option<T> {
    fn output_types() -> Vec<ValueType> {
        vec![Self::value_type()]
    }

    fn into_outputs(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl<K: IntoValue, V: IntoValue, S> IntoOutputs for HashMap<K, V, S> {
    fn output_types() -> Vec<ValueType> {
        vec![Self::value_type()]
    }

    fn into_outputs(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl<K: IntoValue, V: IntoValue> IntoOutputs for BTreeMap<K, V> {
    fn output_types() -> Vec<ValueType> {
        vec![Self::value_type()]
    }

    fn into_outputs(self) -> Vec<Value> {
        vec![self.into_value()]
    }
}

impl IntoOutputs for () {
    fn output_types() -> Vec<ValueType> {
        Vec::new()
    }

    fn into_outputs(self) -> Vec<Value> {
        Vec::new()
    }
}

/// A fallible result is two outputs: the value (or nil) and the error text
/// (or nil).
impl<T: IntoValue, E: Display> IntoOutputs for Result<T, E> {
    fn output_types() -> Vec<ValueType> {
        vec![T::value_type(), ValueType::Text]
    }

    fn into_outputs(self) -> Vec<Value> {
        match self {
            Ok(value) => vec![value.into_value(), Value::Nil],
            Err(err) => vec![Value::Nil, Value::Text(err.to_string())],
        }
    }
}

macro_rules! tuple_outputs {
    ($($name:ident),+) => {
        impl<$($name: IntoValue),+> IntoOutputs for ($($name,)+) {
            fn output_types() -> Vec<ValueType> {
                vec![$($name::value_type()),+]
            }

            #[allow(non_snake_case)]
            fn into_outputs(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into_value()),+]
            }
        }
    };
}

tuple_outputs!(A, B);
tuple_outputs!(A, B, C);
tuple_outputs!(A, B, C, D);
