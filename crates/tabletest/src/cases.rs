//! Case tables.
//!
//! A case is a label followed by attributes: first the function inputs, then
//! (when a single function is tested) the expected outputs.
//!
//! ```
//! use tabletest::{CaseTable, case};
//!
//! let table = CaseTable::from_cases([
//!     case!("square", 3.0, 9.0),
//!     case!("square", -2.0, 4.0),
//! ])
//! .unwrap();
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.width(), 2);
//! ```

use crate::error::ConfigError;
use crate::func::Signature;
use crate::value::{Kind, Record, Value};

/// Build a [`Case`] from a label and attributes.
#[macro_export]
macro_rules! case {
    ($label:expr $(, $attr:expr)* $(,)?) => {
        $crate::Case::new($label)$(.with($attr))*
    };
}

/// One labeled row of a case table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Case {
    label: String,
    attributes: Vec<Value>,
}

impl Case {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    #[must_use]
    pub fn with(mut self, attribute: impl Into<Value>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Attributes after the label.
    pub fn attributes(&self) -> &[Value] {
        &self.attributes
    }

    /// The first `count` attributes with `Shared` wrappers stripped.
    pub fn inputs(&self, count: usize) -> Vec<Value> {
        self.attributes
            .iter()
            .take(count)
            .map(|value| value.underlying().clone())
            .collect()
    }

    /// The `outputs` attributes that follow the first `inputs`.
    pub fn expected(&self, inputs: usize, outputs: usize) -> &[Value] {
        let start = inputs.min(self.attributes.len());
        let end = (inputs + outputs).min(self.attributes.len());
        &self.attributes[start..end]
    }

    /// The case as a record: `Label` followed by `Attr1`, `Attr2`, ...
    pub fn into_record(self) -> Record {
        self.attributes.into_iter().enumerate().fold(
            Record::new("Case").with_field("Label", Value::Text(self.label)),
            |record, (i, value)| record.with_field(format!("Attr{}", i + 1), value),
        )
    }
}

/// Where expected outputs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedSource {
    /// Read from the case attributes after the inputs.
    Table,
    /// Computed by calling a reference function.
    Reference,
}

/// A validated, non-empty list of same-shaped cases.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseTable {
    cases: Vec<Case>,
    width: usize,
}

impl CaseTable {
    /// Parse rows of record values.
    ///
    /// Each row must be a record whose first field is the text label.
    pub fn parse(rows: &[Value]) -> Result<Self, ConfigError> {
        let cases = rows
            .iter()
            .enumerate()
            .map(|(row, value)| parse_row(row, value))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_cases(cases)
    }

    /// Validate typed cases.
    pub fn from_cases(cases: impl IntoIterator<Item = Case>) -> Result<Self, ConfigError> {
        let cases: Vec<Case> = cases.into_iter().collect();
        let first = cases.first().ok_or(ConfigError::NoCases)?;
        let width = first.attributes.len();
        let kinds: Vec<Kind> = first.attributes.iter().map(|v| v.underlying().kind()).collect();

        for (row, case) in cases.iter().enumerate().skip(1) {
            if case.attributes.len() != width {
                return Err(ConfigError::RaggedRow {
                    row,
                    expected: width,
                    found: case.attributes.len(),
                });
            }
            for (attribute, (value, &expected)) in case.attributes.iter().zip(&kinds).enumerate() {
                let found = value.underlying().kind();
                if found != expected && found != Kind::Nil && expected != Kind::Nil {
                    return Err(ConfigError::AttributeKind {
                        row,
                        attribute,
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(Self { cases, width })
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Always false; tables are never empty.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Attribute count after the label, shared by every case.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, index: usize) -> Option<&Case> {
        self.cases.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Case> {
        self.cases.iter()
    }

    /// Check the table against a function signature.
    ///
    /// With [`ExpectedSource::Table`] every case must hold the inputs followed
    /// by the expected outputs. With [`ExpectedSource::Reference`] the inputs
    /// suffice, though trailing outputs are tolerated. Every input must be
    /// admitted by its declared type.
    pub fn validate_for(
        &self,
        signature: &Signature,
        source: ExpectedSource,
    ) -> Result<(), ConfigError> {
        let inputs = signature.arity();
        let full = inputs + signature.output_count();
        match source {
            ExpectedSource::Table if self.width != full => {
                return Err(ConfigError::AttributeCount {
                    expected: full,
                    found: self.width,
                    mode: "one function: inputs then expected outputs",
                });
            }
            ExpectedSource::Reference if self.width != inputs && self.width != full => {
                return Err(ConfigError::AttributeCount {
                    expected: inputs,
                    found: self.width,
                    mode: "two functions: inputs only",
                });
            }
            _ => {}
        }

        for (row, case) in self.cases.iter().enumerate() {
            for (input, (value, ty)) in case.attributes.iter().zip(&signature.inputs).enumerate() {
                if !ty.admits(value) {
                    return Err(ConfigError::InputType {
                        row,
                        label: case.label.clone(),
                        input,
                        expected: ty.clone(),
                        found: value.underlying().kind(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a CaseTable {
    type Item = &'a Case;
    type IntoIter = std::slice::Iter<'a, Case>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn parse_row(row: usize, value: &Value) -> Result<Case, ConfigError> {
    let Value::Record(record) = value.underlying() else {
        return Err(ConfigError::NotRecord {
            row,
            found: value.underlying().kind(),
        });
    };
    let Some(((_, label), rest)) = record.fields().split_first() else {
        return Err(ConfigError::EmptyCase { row });
    };
    let Value::Text(label) = label.underlying() else {
        return Err(ConfigError::LabelNotText {
            row,
            found: label.underlying().kind(),
        });
    };
    Ok(Case {
        label: label.clone(),
        attributes: rest.iter().map(|(_, value)| value.clone()).collect(),
    })
}
