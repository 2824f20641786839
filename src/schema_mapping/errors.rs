//! # Schema Mapping Error Types
//!
//! Errors raised while loading a mapping description and while resolving
//! value references against the loaded model.
//!
//! ## Error Categories
//!
//! - **Load Errors**: file I/O and YAML parsing of the mapping description
//! - **Validation Errors**: structural problems found while building the model;
//!   all problems of one description are reported together
//! - **Path Errors**: value references that cannot be resolved against the model

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaMappingError {
    #[error("Failed to read mapping description: {error}")]
    ReadError { error: String },
    #[error("Failed to parse mapping description: {error}")]
    ParseError { error: String },
    #[error("Invalid schema mapping ({} problem(s)):\n  - {}", errors.len(), errors.join("\n  - "))]
    Validation { errors: Vec<String> },
    #[error("No type registered with id `{type_id}`")]
    UnknownType { type_id: String },
    #[error("Types {types:?} have no common supertype")]
    NoCommonSuperType { types: Vec<String> },
}

impl SchemaMappingError {
    /// Create a parse error carrying the source location of the description
    pub fn parse_error_with_context(error: impl Into<String>, context: impl Into<String>) -> Self {
        SchemaMappingError::ParseError {
            error: format!("{}\n  Context: {}", error.into(), context.into()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaPathError {
    #[error("Empty value reference")]
    EmptyPath,
    #[error("Malformed value reference `{reference}`")]
    Malformed { reference: String },
    #[error("`{step}` is not a property of `{parent}`")]
    UnknownProperty { step: String, parent: String },
    #[error("`{step}` is not a type that can be used below `{parent}`")]
    InvalidTypeStep { step: String, parent: String },
    #[error("Cannot navigate below `{property}` to `{step}`: the property has no child elements")]
    LeafProperty { property: String, step: String },
    #[error("Property `{property}` is not queryable")]
    NotQueryable { property: String },
    #[error("Value reference `{step}` is ambiguous: {candidates:?}")]
    Ambiguous { step: String, candidates: Vec<String> },
}
