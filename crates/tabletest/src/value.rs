//! Dynamic value model.
//!
//! [`Value`] is the closed set of shapes the comparison engine understands.
//! Native Rust values enter the model through the conversion traits in
//! [`convert`](crate::convert); callables declare their inputs and outputs as
//! [`ValueType`]s.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::func::{Callable, Signature};

/// A complex number with `f64` parts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex {
    /// Create a complex number from its parts.
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Modulus `|z|`.
    pub fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im.is_sign_negative() {
            write!(f, "({}-{}i)", self.re, -self.im)
        } else {
            write!(f, "({}+{}i)", self.re, self.im)
        }
    }
}

/// Shallow shape of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil,
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    Text,
    Seq,
    Array,
    Map,
    Record,
    Func,
    Opaque,
    Shared,
}

impl Kind {
    /// Get the string name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Nil => "nil",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::Text => "text",
            Kind::Seq => "seq",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Func => "func",
            Kind::Opaque => "opaque",
            Kind::Shared => "shared",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record: a named, ordered list of fields.
///
/// Field order is significant. The record name is descriptive only and does
/// not take part in comparisons.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record with the given type name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// The record's type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Look a field up by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Object-safe deep equality for arbitrary payloads.
pub trait OpaqueValue: fmt::Debug + Send + Sync + 'static {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Deep equality against another payload of any type.
    fn eq_opaque(&self, other: &dyn OpaqueValue) -> bool;

    /// Rust type name of the payload.
    fn type_name(&self) -> &'static str;
}

impl<T> OpaqueValue for T
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_opaque(&self, other: &dyn OpaqueValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A payload outside the closed set of shapes, compared by deep equality.
#[derive(Clone)]
pub struct Opaque(Arc<dyn OpaqueValue>);

impl Opaque {
    /// Wrap a payload.
    pub fn new<T>(payload: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(payload))
    }

    /// Rust type name of the payload.
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Borrow the payload as a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_opaque(other.0.as_ref())
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// A dynamically shaped value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex),
    Text(String),
    /// Ordered, growable sequence.
    Seq(Vec<Value>),
    /// Fixed-size sequence. Never equal to a [`Value::Seq`].
    Array(Vec<Value>),
    /// Key/value pairs. Entry order carries no meaning.
    Map(Vec<(Value, Value)>),
    Record(Record),
    Func(Callable),
    Opaque(Opaque),
    /// Pointer-like wrapper; see [`Value::underlying`].
    Shared(Arc<Value>),
}

impl Value {
    /// Build a [`Value::Seq`] from convertible items.
    pub fn seq<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::Seq(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Array`] from convertible items.
    pub fn array<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Map`] from convertible entries.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wrap an arbitrary payload.
    pub fn opaque<T>(payload: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self::Opaque(Opaque::new(payload))
    }

    /// Wrap a value behind a shared pointer.
    pub fn shared(value: impl Into<Value>) -> Self {
        Self::Shared(Arc::new(value.into()))
    }

    /// Shallow shape of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Uint(_) => Kind::Uint,
            Value::Float(_) => Kind::Float,
            Value::Complex(_) => Kind::Complex,
            Value::Text(_) => Kind::Text,
            Value::Seq(_) => Kind::Seq,
            Value::Array(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Record(_) => Kind::Record,
            Value::Func(_) => Kind::Func,
            Value::Opaque(_) => Kind::Opaque,
            Value::Shared(_) => Kind::Shared,
        }
    }

    /// The value behind any number of [`Value::Shared`] wrappers.
    pub fn underlying(&self) -> &Value {
        let mut value = self;
        while let Value::Shared(inner) = value {
            value = inner;
        }
        value
    }

    /// Returns true for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self.underlying(), Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.underlying() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.underlying() {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.underlying() {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a [`Value::Seq`] or [`Value::Array`].
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self.underlying() {
            Value::Seq(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self.underlying() {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self.underlying() {
            Value::Func(callable) => Some(callable),
            _ => None,
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("<nil>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Uint(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Complex(z) => write!(f, "{z}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Seq(items) | Value::Array(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                write_joined(f, entries.iter().map(|(k, v)| format!("{k}: {v}")))?;
                f.write_str("}")
            }
            Value::Record(record) => {
                write!(f, "{}{{", record.name())?;
                write_joined(
                    f,
                    record
                        .fields()
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}")),
                )?;
                f.write_str("}")
            }
            Value::Func(callable) => write!(f, "{} {}", callable.name(), callable.signature()),
            Value::Opaque(opaque) => write!(f, "{opaque:?}"),
            Value::Shared(inner) => write!(f, "&{inner}"),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Value::Func(callable)
    }
}

impl From<Opaque> for Value {
    fn from(opaque: Opaque) -> Self {
        Value::Opaque(opaque)
    }
}

/// Field layout of a record type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordType {
    /// Type name.
    pub name: String,
    /// Field names and types in declaration order.
    pub fields: Vec<(String, ValueType)>,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }
}

/// Declared type of a callable input or output.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    Nil,
    Bool,
    /// Any `i64`.
    Int,
    /// Any `u64`.
    Uint,
    /// A signed integer within `min..=max`, such as an `i8` argument.
    BoundedInt { min: i64, max: i64 },
    /// An unsigned integer no larger than `max`.
    BoundedUint { max: u64 },
    Float,
    Complex,
    Text,
    Seq(Box<ValueType>),
    Array(Box<ValueType>, usize),
    Map(Box<ValueType>, Box<ValueType>),
    Record(RecordType),
    Func(Box<Signature>),
    /// Either nil or a value of the inner type, as declared by `Option<T>`.
    Optional(Box<ValueType>),
    /// Opaque payload, identified by Rust type name.
    Opaque(&'static str),
    /// Any value at all. Cannot be generated.
    Any,
}

impl ValueType {
    /// The integer type covering `min..=max`, or `self` for non-integers.
    ///
    /// Full-width ranges stay [`ValueType::Int`] and [`ValueType::Uint`].
    #[must_use]
    pub fn narrowed(self, min: i128, max: i128) -> Self {
        match self {
            ValueType::Int | ValueType::BoundedInt { .. } => {
                if min <= i128::from(i64::MIN) && max >= i128::from(i64::MAX) {
                    ValueType::Int
                } else {
                    ValueType::BoundedInt {
                        min: i64::try_from(min).unwrap_or(i64::MIN),
                        max: i64::try_from(max).unwrap_or(i64::MAX),
                    }
                }
            }
            ValueType::Uint | ValueType::BoundedUint { .. } => {
                if max >= i128::from(u64::MAX) {
                    ValueType::Uint
                } else {
                    ValueType::BoundedUint {
                        max: u64::try_from(max).unwrap_or(0),
                    }
                }
            }
            other => other,
        }
    }

    /// Returns true if `value` fits this declared type.
    ///
    /// Every value fits `Any`. `Nil` fits only `Nil` and `Optional` types.
    pub fn admits(&self, value: &Value) -> bool {
        let value = value.underlying();
        match (self, value) {
            (ValueType::Any, _)
            | (ValueType::Nil | ValueType::Optional(_), Value::Nil)
            | (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Uint, Value::Uint(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Complex, Value::Complex(_))
            | (ValueType::Text, Value::Text(_)) => true,
            (ValueType::BoundedInt { min, max }, Value::Int(n)) => (*min..=*max).contains(n),
            (ValueType::BoundedUint { max }, Value::Uint(n)) => n <= max,
            (ValueType::Optional(inner), _) => inner.admits(value),
            (ValueType::Seq(elem), Value::Seq(items)) => items.iter().all(|v| elem.admits(v)),
            (ValueType::Array(elem, len), Value::Array(items)) => {
                items.len() == *len && items.iter().all(|v| elem.admits(v))
            }
            (ValueType::Map(key, val), Value::Map(entries)) => entries
                .iter()
                .all(|(k, v)| key.admits(k) && val.admits(v)),
            (ValueType::Record(ty), Value::Record(record)) => {
                ty.fields.len() == record.len()
                    && ty
                        .fields
                        .iter()
                        .zip(record.fields())
                        .all(|((tn, tt), (n, v))| tn == n && tt.admits(v))
            }
            (ValueType::Func(sig), Value::Func(callable)) => callable.signature() == sig.as_ref(),
            (ValueType::Opaque(name), Value::Opaque(opaque)) => opaque.type_name() == *name,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Nil => f.write_str("nil"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Uint => f.write_str("uint"),
            ValueType::BoundedInt { min, max } => write!(f, "int({min}..={max})"),
            ValueType::BoundedUint { max } => write!(f, "uint(..={max})"),
            ValueType::Float => f.write_str("float"),
            ValueType::Complex => f.write_str("complex"),
            ValueType::Text => f.write_str("text"),
            ValueType::Seq(elem) => write!(f, "[]{elem}"),
            ValueType::Array(elem, len) => write!(f, "[{len}]{elem}"),
            ValueType::Map(key, val) => write!(f, "map[{key}]{val}"),
            ValueType::Record(ty) if ty.name.is_empty() => f.write_str("record"),
            ValueType::Record(ty) => f.write_str(&ty.name),
            ValueType::Func(sig) => write!(f, "{sig}"),
            ValueType::Optional(inner) => write!(f, "option<{inner}>"),
            ValueType::Opaque(name) => f.write_str(name),
            ValueType::Any => f.write_str("any"),
        }
    }
}
