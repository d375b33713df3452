//! Error types for tabletest.
//!
//! Errors come in three families:
//!
//! - [`ConfigError`]: the test itself is malformed (bad case table, wrong
//!   number of functions, attribute counts that do not match the signature).
//!   These are detected before any case executes.
//! - [`CallError`]: a callable was invoked with arguments it cannot accept, or
//!   returned a different number of values than its signature declares.
//! - [`ArbitraryError`]: a random argument could not be synthesized for a
//!   declared input type during a functional-equivalence check.
//!
//! Assertion failures (an output that does not match) are *not* errors; they
//! are reported as [`Diagnostic`](crate::Diagnostic)s.

use crate::value::{Kind, ValueType};

/// The test setup is malformed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The case table has no rows.
    #[error("no cases: a case table needs at least one row")]
    NoCases,

    /// A row is not record-shaped.
    #[error("case {row}: wrong kind of case, got {found}, want record")]
    NotRecord {
        /// Zero-based row index.
        row: usize,
        /// Kind of the offending row.
        found: Kind,
    },

    /// A row has no attributes at all, so it cannot carry a label.
    #[error("case {row}: empty case, want at least a label")]
    EmptyCase {
        /// Zero-based row index.
        row: usize,
    },

    /// The first attribute of a row is not text.
    #[error("case {row}: wrong type for label, got {found}, want text")]
    LabelNotText {
        /// Zero-based row index.
        row: usize,
        /// Kind of the first attribute.
        found: Kind,
    },

    /// Rows disagree on the number of attributes.
    #[error("case {row}: got {found} attributes after the label, want {expected} like case 0")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Attribute count of the first row (after the label).
        expected: usize,
        /// Attribute count of this row (after the label).
        found: usize,
    },

    /// Rows disagree on the kind of an attribute.
    #[error("case {row}: attribute {attribute} is {found}, want {expected} like case 0")]
    AttributeKind {
        /// Zero-based row index.
        row: usize,
        /// Zero-based attribute index after the label.
        attribute: usize,
        /// Kind in the first row.
        expected: Kind,
        /// Kind in this row.
        found: Kind,
    },

    /// Neither one nor two functions were supplied.
    #[error("wrong number of functions: got {0}, want 1 or 2")]
    FunctionCount(usize),

    /// A supplied function value is not callable.
    #[error("function {index} is not callable: got {found}")]
    NotCallable {
        /// Position in the supplied function list.
        index: usize,
        /// Kind of the supplied value.
        found: Kind,
    },

    /// Two functions were supplied with different signatures.
    #[error("signature mismatch: {primary} vs reference {reference}")]
    SignatureMismatch {
        /// Rendered signature of the function under test.
        primary: String,
        /// Rendered signature of the reference function.
        reference: String,
    },

    /// The number of attributes after the label does not fit the signature.
    #[error("wrong number of case attributes: got {found}, want {expected} ({mode})")]
    AttributeCount {
        /// Required attribute count.
        expected: usize,
        /// Attribute count found in the table.
        found: usize,
        /// Which contract was applied.
        mode: &'static str,
    },

    /// A case input is not admitted by the declared input type.
    #[error("case {row} ({label:?}): input {input} is {found}, want {expected}")]
    InputType {
        /// Zero-based row index.
        row: usize,
        /// Label of the offending case.
        label: String,
        /// Zero-based input index.
        input: usize,
        /// Declared input type.
        expected: ValueType,
        /// Kind of the supplied value.
        found: Kind,
    },

    /// A predicate does not return exactly one boolean.
    #[error("predicate {function} must return exactly one bool, got ({found})")]
    PredicateOutput {
        /// Predicate name.
        function: String,
        /// Rendered output types.
        found: String,
    },

    /// Predicate columns do not line up with the predicate or each other.
    #[error("predicate column {column}: {reason}")]
    PredicateColumn {
        /// Zero-based column index.
        column: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A seed policy string could not be parsed.
    #[error("invalid seed {0:?}: want \"time\" or an unsigned integer")]
    InvalidSeed(String),

    /// A configuration override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidSetting {
        /// Setting name (environment variable or option).
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// A callable could not be invoked with the given arguments.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CallError {
    /// The argument count differs from the signature.
    #[error("wrong number of arguments: got {found}, want {expected}")]
    Arity {
        /// Declared input count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },

    /// An argument cannot be converted to the declared input type.
    #[error("argument {index} is {found}, want {expected}")]
    ArgumentType {
        /// Zero-based argument index.
        index: usize,
        /// Declared input type.
        expected: ValueType,
        /// Kind of the supplied argument.
        found: Kind,
    },

    /// The callable returned a different number of values than declared.
    #[error("wrong number of results: got {found}, want {expected}")]
    OutputCount {
        /// Declared output count.
        expected: usize,
        /// Returned value count.
        found: usize,
    },

    /// A dynamic callable reported its own failure.
    #[error("{0}")]
    Failed(String),
}

/// A random argument could not be synthesized.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ArbitraryError {
    /// There is no generator for this declared type.
    #[error("could not generate mock arguments: no generator for {0}")]
    Unsupported(ValueType),

    /// The underlying strategy refused to produce a value.
    #[error("could not generate mock arguments: {0}")]
    Rejected(String),
}

/// Umbrella error for tabletest operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The test setup is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invoking a callable failed.
    #[error("calling {function}: {source}")]
    Call {
        /// Name of the callable.
        function: String,
        /// What went wrong.
        #[source]
        source: CallError,
    },

    /// Random argument synthesis failed.
    #[error(transparent)]
    Arbitrary(#[from] ArbitraryError),
}

impl Error {
    /// Attach a function name to a [`CallError`].
    pub fn call(function: &str, source: CallError) -> Self {
        Self::Call {
            function: function.to_string(),
            source,
        }
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// A specialized [`Result`] type for tabletest operations.
pub type Result<T> = std::result::Result<T, Error>;
