//! CityQuery - SQL query compiler for relational 3D city model databases
//!
//! This crate turns abstract, filter-encoding style queries into SQL through:
//! - A schema mapping describing how feature, object and complex types are
//!   stored in tables
//! - Schema paths resolving value references against that mapping
//! - Operator builders (comparison, spatial, id, select) combined by a
//!   predicate builder, plus sorting and pagination
//! - Dialect adapters for PostGIS and Oracle Spatial

pub mod config;
pub mod dialect;
pub mod geometry;
pub mod query;
pub mod query_builder;
pub mod schema_mapping;
pub mod sql_ast;

pub use config::CompilerConfig;
pub use query::Query;
pub use query_builder::{QueryBuildError, QueryBuilder};
pub use schema_mapping::SchemaMapping;
pub use sql_ast::{RenderedStatement, Select, ToSql};

/// Compile a query with the dialect described by `config`
pub fn compile(
    mapping: &SchemaMapping,
    query: &Query,
    config: &CompilerConfig,
) -> anyhow::Result<RenderedStatement> {
    let dialect = config.dialect()?;
    let statement = QueryBuilder::new(mapping, dialect.as_ref(), config).build_rendered(query)?;
    Ok(statement)
}
