//! Compiles an abstract [`Query`] into a SQL AST for one dialect.
//!
//! The compilation runs in fixed passes over one [`QueryContext`]:
//!
//! 1. feature type filter: picks the root type (the common supertype of the
//!    filtered types), its table and the object class restriction
//! 2. selection: the predicate builder walks the predicate tree and
//!    dispatches each leaf to its operator builder
//! 3. sorting: one ORDER BY entry per sort key, joins reused where possible
//! 4. counter: start id filter, fallback ordering and the row window
//!
//! Builders are `impl QueryCompiler` blocks, one module per operator family.

use crate::config::CompilerConfig;
use crate::dialect::SqlDialect;
use crate::geometry::{BuiltinTransformer, GeometryTransformer};
use crate::query::Query;
use crate::schema_mapping::{SchemaMapping, TypeId};
use crate::sql_ast::{Operator, RenderedStatement, Select, SqlExpr, ToSql};

mod comparison_builder;
pub mod context;
mod counter_builder;
pub mod errors;
mod id_builder;
mod predicate_builder;
mod schema_path_builder;
mod select_builder;
mod sorting_builder;
mod spatial_builder;

pub use comparison_builder::translate_like_pattern;
pub use context::{QueryContext, TableRef};
pub use errors::QueryBuildError;
pub use predicate_builder::requires_left_joins;

/// Entry point of the query compiler
///
/// Holds only shared, read-only collaborators; one builder can compile any
/// number of queries, also from several threads.
#[derive(Clone, Copy)]
pub struct QueryBuilder<'a> {
    mapping: &'a SchemaMapping,
    dialect: &'a dyn SqlDialect,
    config: &'a CompilerConfig,
    transformer: &'a dyn GeometryTransformer,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(
        mapping: &'a SchemaMapping,
        dialect: &'a dyn SqlDialect,
        config: &'a CompilerConfig,
    ) -> Self {
        QueryBuilder {
            mapping,
            dialect,
            config,
            transformer: &BuiltinTransformer,
        }
    }

    pub fn with_transformer(mut self, transformer: &'a dyn GeometryTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Compile a query into a SELECT statement
    pub fn build(&self, query: &Query) -> Result<Select, QueryBuildError> {
        let root = self.resolve_root(&query.feature_types)?;
        let mut compiler = QueryCompiler::new(*self, root.root, &root.table)?;

        compiler.build_feature_type_filter(&root.feature_types)?;
        if let Some(selection) = &query.selection {
            compiler.build_selection(selection)?;
        }
        compiler.build_sorting(&query.sorting)?;
        if let Some(counter) = &query.counter {
            compiler.build_counter(counter)?;
        }
        let select = compiler.finish(query.counter.as_ref());

        log::debug!("Compiled query: {}", select.to_sql().sql);
        Ok(select)
    }

    /// Compile and render in one step
    pub fn build_rendered(&self, query: &Query) -> Result<RenderedStatement, QueryBuildError> {
        Ok(self.build(query)?.to_sql())
    }

    fn resolve_root(&self, names: &[String]) -> Result<RootSelection, QueryBuildError> {
        if names.is_empty() {
            return Err(QueryBuildError::EmptyFeatureTypeFilter);
        }

        let mut feature_types = Vec::with_capacity(names.len());
        for name in names {
            let type_id = self
                .mapping
                .find_type(name)
                .ok_or_else(|| QueryBuildError::UnknownFeatureType(name.clone()))?;
            if !self.mapping.get_type(type_id).is_feature_type() {
                return Err(QueryBuildError::NotAFeatureType(name.clone()));
            }
            if !feature_types.contains(&type_id) {
                feature_types.push(type_id);
            }
        }

        let root = self.mapping.common_super_type(&feature_types)?;
        let table = self
            .mapping
            .table_of(root)
            .ok_or_else(|| {
                QueryBuildError::MissingTable(self.mapping.get_type(root).qualified_name())
            })?
            .to_string();
        log::debug!(
            "Root type of {:?} is {} (table {})",
            names,
            self.mapping.get_type(root).qualified_name(),
            table
        );

        Ok(RootSelection {
            root,
            table,
            feature_types,
        })
    }
}

struct RootSelection {
    root: TypeId,
    table: String,
    feature_types: Vec<TypeId>,
}

/// State of one compilation
pub(crate) struct QueryCompiler<'a> {
    pub(crate) mapping: &'a SchemaMapping,
    pub(crate) dialect: &'a dyn SqlDialect,
    pub(crate) config: &'a CompilerConfig,
    pub(crate) transformer: &'a dyn GeometryTransformer,
    pub(crate) ctx: QueryContext,
}

impl<'a> QueryCompiler<'a> {
    fn new(builder: QueryBuilder<'a>, root: TypeId, table: &str) -> Result<Self, QueryBuildError> {
        let mut ctx = QueryContext::new(root, table);
        let alias = ctx.root().alias.clone();
        let select = ctx.select_mut();
        select.project(SqlExpr::column(&alias, &builder.config.id_column), None);
        select.project(
            SqlExpr::column(&alias, &builder.config.object_class_column),
            None,
        );

        Ok(QueryCompiler {
            mapping: builder.mapping,
            dialect: builder.dialect,
            config: builder.config,
            transformer: builder.transformer,
            ctx,
        })
    }

    /// `objectclass_id = c` or `objectclass_id IN (...)` over all
    /// instantiable types of the filter
    fn build_feature_type_filter(&mut self, feature_types: &[TypeId]) -> Result<(), QueryBuildError> {
        let mut ids: Vec<i32> = feature_types
            .iter()
            .flat_map(|t| self.mapping.object_class_ids(*t))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let alias = self.ctx.root().alias.clone();
        let predicate = self.object_class_predicate(&alias, &ids).ok_or_else(|| {
            QueryBuildError::invalid_operands(
                "feature type filter",
                "none of the requested feature types can be instantiated",
            )
        })?;
        self.ctx.add_predicate(predicate);
        Ok(())
    }

    pub(crate) fn object_class_predicate(&self, alias: &str, ids: &[i32]) -> Option<SqlExpr> {
        let column = SqlExpr::column(alias, &self.config.object_class_column);
        match ids {
            [] => None,
            [id] => Some(SqlExpr::equals(column, SqlExpr::raw(id.to_string()))),
            _ => Some(SqlExpr::apply(
                Operator::In,
                vec![
                    column,
                    SqlExpr::List(ids.iter().map(|id| SqlExpr::raw(id.to_string())).collect()),
                ],
            )),
        }
    }

    /// Database id column of the root table
    pub(crate) fn root_id_column(&self) -> SqlExpr {
        SqlExpr::column(&self.ctx.root().alias, &self.config.id_column)
    }
}
