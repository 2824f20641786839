use crate::query::SelectOperator;
use crate::sql_ast::{InSubquery, SqlExpr, SubquerySource};

use super::errors::QueryBuildError;
use super::schema_path_builder::{JoinMode, PathScope};
use super::QueryCompiler;

impl QueryCompiler<'_> {
    /// Restrict the root objects to the ids returned by caller-supplied SQL
    pub(crate) fn build_select_operator(
        &mut self,
        op: &SelectOperator,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        let sql = op.sql.trim();
        if sql.is_empty() {
            return Err(QueryBuildError::invalid_operands(
                "select filter",
                "the sub-query is empty",
            ));
        }
        if scope.mode == JoinMode::Forbidden {
            return Err(QueryBuildError::invalid_operands(
                "select filter",
                "not allowed inside a node predicate",
            ));
        }

        self.ctx.add_predicate(SqlExpr::InSubquery(InSubquery {
            expr: Box::new(self.root_id_column()),
            subquery: SubquerySource::Raw(sql.to_string()),
            negated: negate,
        }));
        Ok(())
    }
}
