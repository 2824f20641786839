//! Abstract selection predicates.
//!
//! The predicate tree is a closed set of operator families. Builders match
//! on it exhaustively, so a new operator has to be handled everywhere before
//! the crate compiles again.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::expression::{Expression, Literal, ValueReference};
use crate::geometry::GeometryObject;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Comparison(ComparisonOperator),
    Spatial(SpatialOperator),
    Id(IdOperator),
    Select(SelectOperator),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalKind {
    And,
    Or,
}

impl fmt::Display for LogicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalKind::And => f.write_str("AND"),
            LogicalKind::Or => f.write_str("OR"),
        }
    }
}

impl Predicate {
    pub fn and(operands: Vec<Predicate>) -> Self {
        Predicate::And(operands)
    }

    pub fn or(operands: Vec<Predicate>) -> Self {
        Predicate::Or(operands)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Predicate) -> Self {
        Predicate::Not(Box::new(operand))
    }

    /// `value_reference <operator> literal`
    pub fn compare(
        operator: BinaryComparisonKind,
        value_reference: ValueReference,
        literal: impl Into<Literal>,
    ) -> Self {
        Predicate::Comparison(ComparisonOperator::Binary(BinaryComparison {
            operator,
            left: Expression::ValueReference(value_reference),
            right: Expression::Literal(literal.into()),
            match_case: true,
        }))
    }

    pub fn is_null(value_reference: ValueReference) -> Self {
        Predicate::Comparison(ComparisonOperator::Null(NullComparison {
            operand: value_reference,
        }))
    }

    /// Logical family and operands when this is an AND or OR node
    pub fn as_logical(&self) -> Option<(LogicalKind, &[Predicate])> {
        match self {
            Predicate::And(ops) => Some((LogicalKind::And, ops)),
            Predicate::Or(ops) => Some((LogicalKind::Or, ops)),
            _ => None,
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Predicate::And(_) | Predicate::Or(_) | Predicate::Not(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryComparisonKind {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl BinaryComparisonKind {
    pub fn negate(self) -> Self {
        match self {
            BinaryComparisonKind::EqualTo => BinaryComparisonKind::NotEqualTo,
            BinaryComparisonKind::NotEqualTo => BinaryComparisonKind::EqualTo,
            BinaryComparisonKind::LessThan => BinaryComparisonKind::GreaterThanOrEqualTo,
            BinaryComparisonKind::LessThanOrEqualTo => BinaryComparisonKind::GreaterThan,
            BinaryComparisonKind::GreaterThan => BinaryComparisonKind::LessThanOrEqualTo,
            BinaryComparisonKind::GreaterThanOrEqualTo => BinaryComparisonKind::LessThan,
        }
    }

    /// Operator with the operands swapped (`lit < col` is `col > lit`)
    pub fn flip(self) -> Self {
        match self {
            BinaryComparisonKind::LessThan => BinaryComparisonKind::GreaterThan,
            BinaryComparisonKind::LessThanOrEqualTo => BinaryComparisonKind::GreaterThanOrEqualTo,
            BinaryComparisonKind::GreaterThan => BinaryComparisonKind::LessThan,
            BinaryComparisonKind::GreaterThanOrEqualTo => BinaryComparisonKind::LessThanOrEqualTo,
            other => other,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            BinaryComparisonKind::EqualTo => "=",
            BinaryComparisonKind::NotEqualTo => "<>",
            BinaryComparisonKind::LessThan => "<",
            BinaryComparisonKind::LessThanOrEqualTo => "<=",
            BinaryComparisonKind::GreaterThan => ">",
            BinaryComparisonKind::GreaterThanOrEqualTo => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Binary(BinaryComparison),
    Between(BetweenComparison),
    Like(LikeComparison),
    Null(NullComparison),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryComparison {
    pub operator: BinaryComparisonKind,
    pub left: Expression,
    pub right: Expression,
    #[serde(default = "default_true")]
    pub match_case: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweenComparison {
    pub operand: ValueReference,
    pub lower: Literal,
    pub upper: Literal,
}

fn default_wildcard() -> String {
    "*".to_string()
}

fn default_single_char() -> String {
    ".".to_string()
}

fn default_escape() -> String {
    "\\".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeComparison {
    pub operand: ValueReference,
    pub pattern: String,
    #[serde(default = "default_wildcard")]
    pub wildcard: String,
    #[serde(default = "default_single_char")]
    pub single_char: String,
    #[serde(default = "default_escape")]
    pub escape: String,
    #[serde(default = "default_true")]
    pub match_case: bool,
}

impl LikeComparison {
    pub fn new(operand: ValueReference, pattern: impl Into<String>) -> Self {
        LikeComparison {
            operand,
            pattern: pattern.into(),
            wildcard: default_wildcard(),
            single_char: default_single_char(),
            escape: default_escape(),
            match_case: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullComparison {
    pub operand: ValueReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySpatialKind {
    Bbox,
    Equals,
    Disjoint,
    Touches,
    Within,
    Overlaps,
    Crosses,
    Intersects,
    Contains,
}

impl fmt::Display for BinarySpatialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinarySpatialKind::Bbox => "BBOX",
            BinarySpatialKind::Equals => "EQUALS",
            BinarySpatialKind::Disjoint => "DISJOINT",
            BinarySpatialKind::Touches => "TOUCHES",
            BinarySpatialKind::Within => "WITHIN",
            BinarySpatialKind::Overlaps => "OVERLAPS",
            BinarySpatialKind::Crosses => "CROSSES",
            BinarySpatialKind::Intersects => "INTERSECTS",
            BinarySpatialKind::Contains => "CONTAINS",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    #[serde(rename = "dwithin")]
    DWithin,
    Beyond,
}

impl fmt::Display for DistanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceKind::DWithin => f.write_str("DWITHIN"),
            DistanceKind::Beyond => f.write_str("BEYOND"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialOperator {
    Binary(BinarySpatial),
    Distance(DistanceSpatial),
}

impl SpatialOperator {
    pub fn operand(&self) -> Option<&ValueReference> {
        match self {
            SpatialOperator::Binary(op) => op.operand.as_ref(),
            SpatialOperator::Distance(op) => op.operand.as_ref(),
        }
    }

    pub fn geometry(&self) -> &GeometryObject {
        match self {
            SpatialOperator::Binary(op) => &op.geometry,
            SpatialOperator::Distance(op) => &op.geometry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySpatial {
    pub operator: BinarySpatialKind,
    /// Defaults to the envelope property when omitted
    #[serde(default)]
    pub operand: Option<ValueReference>,
    pub geometry: GeometryObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSpatial {
    pub operator: DistanceKind,
    #[serde(default)]
    pub operand: Option<ValueReference>,
    pub geometry: GeometryObject,
    pub distance: f64,
    /// Unit of `distance`; the database SRS unit when omitted
    #[serde(default)]
    pub unit: Option<String>,
}

/// Filter on object identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdOperator {
    /// Matched against the resource id property (e.g. `gml:id`)
    ResourceId(Vec<String>),
    /// Matched against the database id column
    DatabaseId(Vec<i64>),
}

impl IdOperator {
    pub fn len(&self) -> usize {
        match self {
            IdOperator::ResourceId(ids) => ids.len(),
            IdOperator::DatabaseId(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw sub-query yielding object ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOperator {
    pub sql: String,
}
