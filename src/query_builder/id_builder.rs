//! Resource id and database id filters.

use crate::query::{IdOperator, LogicalKind, ValueReference};
use crate::schema_mapping::SchemaPath;
use crate::sql_ast::{Operator, SqlExpr, SqlValue};

use super::errors::QueryBuildError;
use super::schema_path_builder::{JoinMode, PathScope};
use super::QueryCompiler;

impl QueryCompiler<'_> {
    /// `col = id`, or one `col IN (...)` per chunk of at most
    /// `max_in_list_size` ids, ORed together
    pub(crate) fn build_id(
        &mut self,
        op: &IdOperator,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        if op.is_empty() {
            return Err(QueryBuildError::EmptyIdList);
        }
        if scope.mode == JoinMode::Forbidden {
            return Err(QueryBuildError::invalid_operands(
                "id filter",
                "not allowed inside a node predicate",
            ));
        }

        let (column, values) = match op {
            IdOperator::DatabaseId(ids) => (
                self.root_id_column(),
                ids.iter().map(|id| SqlValue::Integer(*id)).collect::<Vec<_>>(),
            ),
            IdOperator::ResourceId(ids) => {
                let reference: ValueReference = self.config.resource_id_property.parse()?;
                let path = SchemaPath::resolve(self.mapping, self.ctx.root_type(), &reference)?;
                let root_scope = self.root_scope(scope.mode);
                let resolved = self.resolve_value(&path, &root_scope, "id filter")?;
                (
                    resolved.column,
                    ids.iter().map(|id| SqlValue::String(id.clone())).collect(),
                )
            }
        };

        if let [value] = values.as_slice() {
            let operator = if negate {
                Operator::NotEqual
            } else {
                Operator::Equal
            };
            self.ctx.add_predicate(SqlExpr::apply(
                operator,
                vec![column, SqlExpr::Placeholder(value.clone())],
            ));
            return Ok(());
        }

        let chunk_size = self.dialect.max_in_list_size().max(1);
        let operator = if negate { Operator::NotIn } else { Operator::In };
        let fragments: Vec<SqlExpr> = values
            .chunks(chunk_size)
            .map(|chunk| {
                SqlExpr::apply(
                    operator,
                    vec![
                        column.clone(),
                        SqlExpr::List(chunk.iter().cloned().map(SqlExpr::Placeholder).collect()),
                    ],
                )
            })
            .collect();
        log::debug!(
            "Id filter with {} ids split into {} IN lists",
            values.len(),
            fragments.len()
        );

        // NOT IN chunks must all hold
        let kind = if negate {
            LogicalKind::And
        } else {
            LogicalKind::Or
        };
        self.emit(fragments, kind);
        Ok(())
    }
}
