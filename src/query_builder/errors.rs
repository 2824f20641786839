use thiserror::Error;

use crate::geometry::GeometryError;
use crate::schema_mapping::{SchemaMappingError, SchemaPathError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryBuildError {
    #[error("Invalid value reference: {0}")]
    Path(#[from] SchemaPathError),

    #[error("{0}")]
    Mapping(#[from] SchemaMappingError),

    #[error("Invalid geometry operand: {0}")]
    Geometry(#[from] GeometryError),

    #[error("The feature type filter is empty")]
    EmptyFeatureTypeFilter,

    #[error("Unknown feature type `{0}`")]
    UnknownFeatureType(String),

    #[error("`{0}` is not a feature type")]
    NotAFeatureType(String),

    #[error("Type `{0}` has no backing table")]
    MissingTable(String),

    #[error("Invalid operands for {operator}: {reason}")]
    InvalidOperands { operator: String, reason: String },

    #[error("Cannot compare `{property}` of type {expected} with a {found} literal")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    #[error("`{property}` has no value column that {operator} can be applied to")]
    NotAnAttribute { property: String, operator: String },

    #[error("Invalid LIKE pattern: {0}")]
    InvalidLikePattern(String),

    #[error("{operator} is not supported on `{property}`: {reason}")]
    UnsupportedSpatialOperator {
        operator: String,
        property: String,
        reason: String,
    },

    #[error("`{0}` is not a geometry property")]
    NotAGeometry(String),

    #[error("{0} operator has no operands")]
    EmptyLogicalOperator(String),

    #[error("Id filter has no ids")]
    EmptyIdList,

    #[error("Sort key `{0}` is used more than once")]
    DuplicateSortKey(String),

    #[error("Sort key `{0}` would require an OR predicate")]
    SortKeyRequiresOr(String),

    #[error("Invalid sort key `{path}`: {reason}")]
    InvalidSortKey { path: String, reason: String },

    #[error("Node predicates cannot join table `{0}`")]
    NodePredicateRequiresJoin(String),

    #[error("No join path from `{from}` to `{to}`")]
    UnresolvableJoin { from: String, to: String },
}

impl QueryBuildError {
    pub fn invalid_operands(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryBuildError::InvalidOperands {
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Invalid operands, with the value reference being compiled
    pub fn invalid_operands_with_context(
        operator: impl Into<String>,
        reason: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        QueryBuildError::InvalidOperands {
            operator: operator.into(),
            reason: format!("{}\n  Context: {}", reason.into(), context.into()),
        }
    }

    pub fn invalid_sort_key(path: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryBuildError::InvalidSortKey {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
