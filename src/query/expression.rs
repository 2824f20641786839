use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::predicate::Predicate;
use crate::geometry::GeometryObject;
use crate::schema_mapping::SchemaPathError;

/// One step of a value reference, optionally filtered by a node predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// `prefix:name`, `name` or `@name`
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Box<Predicate>>,
}

impl PathStep {
    pub fn new(name: impl Into<String>) -> Self {
        PathStep {
            name: name.into(),
            predicate: None,
        }
    }

    pub fn with_predicate(name: impl Into<String>, predicate: Predicate) -> Self {
        PathStep {
            name: name.into(),
            predicate: Some(Box::new(predicate)),
        }
    }
}

/// Operand naming the value reachable from the query's root type
///
/// Accepted in YAML either as text (`bldg:address/core:Address/core:street`)
/// or as a list of steps when node predicates are needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueReferenceDef")]
pub struct ValueReference {
    pub steps: Vec<PathStep>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueReferenceDef {
    Text(String),
    Steps { steps: Vec<PathStep> },
}

impl TryFrom<ValueReferenceDef> for ValueReference {
    type Error = SchemaPathError;

    fn try_from(def: ValueReferenceDef) -> Result<Self, Self::Error> {
        match def {
            ValueReferenceDef::Text(text) => text.parse(),
            ValueReferenceDef::Steps { steps } if steps.is_empty() => {
                Err(SchemaPathError::EmptyPath)
            }
            ValueReferenceDef::Steps { steps } => Ok(ValueReference { steps }),
        }
    }
}

impl ValueReference {
    pub fn new(steps: Vec<PathStep>) -> Self {
        ValueReference { steps }
    }
}

impl FromStr for ValueReference {
    type Err = SchemaPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(SchemaPathError::EmptyPath);
        }
        let steps = trimmed
            .split('/')
            .map(|step| {
                let step = step.trim();
                if step.is_empty() || step == "@" || step.contains(char::is_whitespace) {
                    Err(SchemaPathError::Malformed {
                        reference: s.to_string(),
                    })
                } else {
                    Ok(PathStep::new(step))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValueReference { steps })
    }
}

impl fmt::Display for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&step.name)?;
            if step.predicate.is_some() {
                f.write_str("[...]")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Pure date; the column is truncated to a date before comparing
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Geometry(GeometryObject),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Boolean(_) => "boolean",
            Literal::Integer(_) => "integer",
            Literal::Double(_) => "double",
            Literal::String(_) => "string",
            Literal::Date(_) => "date",
            Literal::Timestamp(_) => "timestamp",
            Literal::Geometry(_) => "geometry",
        }
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Integer(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Double(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Boolean(v)
    }
}

impl From<NaiveDate> for Literal {
    fn from(v: NaiveDate) -> Self {
        Literal::Date(v)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(v: NaiveDateTime) -> Self {
        Literal::Timestamp(v)
    }
}

/// Operand of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    ValueReference(ValueReference),
    Literal(Literal),
}

impl Expression {
    pub fn as_value_reference(&self) -> Option<&ValueReference> {
        match self {
            Expression::ValueReference(v) => Some(v),
            Expression::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(l) => Some(l),
            Expression::ValueReference(_) => None,
        }
    }
}

impl From<ValueReference> for Expression {
    fn from(v: ValueReference) -> Self {
        Expression::ValueReference(v)
    }
}

impl From<Literal> for Expression {
    fn from(v: Literal) -> Self {
        Expression::Literal(v)
    }
}
