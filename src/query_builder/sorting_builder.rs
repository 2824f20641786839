//! ORDER BY clause.
//!
//! Sort keys are walked with LEFT joins so objects without a value are kept.
//! A join already added by the selection is reused when it is identical;
//! node predicates in a sort key restrict the ON clause of their own join and
//! therefore never share it with the selection.

use crate::query::{SortOrder, SortProperty};
use crate::schema_mapping::SchemaPath;
use crate::sql_ast::{OrderByItem, OrderByOrder};

use super::errors::QueryBuildError;
use super::predicate_builder::requires_left_joins;
use super::schema_path_builder::{JoinMode, NodePredicates};
use super::QueryCompiler;

impl QueryCompiler<'_> {
    pub(crate) fn build_sorting(&mut self, sorting: &[SortProperty]) -> Result<(), QueryBuildError> {
        let mut seen: Vec<SchemaPath> = Vec::with_capacity(sorting.len());

        for key in sorting {
            let path = SchemaPath::resolve(
                self.mapping,
                self.ctx.root_type(),
                &key.value_reference,
            )?;
            let display = path.display(self.mapping);

            if seen.contains(&path) {
                return Err(QueryBuildError::DuplicateSortKey(display));
            }
            if path
                .nodes()
                .iter()
                .filter_map(|n| n.predicate.as_ref())
                .any(requires_left_joins)
            {
                return Err(QueryBuildError::SortKeyRequiresOr(display));
            }

            let scope = self.root_scope(JoinMode::Left);
            let cursor = self.walk_path(&path, &scope, NodePredicates::FoldIntoJoin)?;
            let resolved = path
                .target_property()
                .and_then(|p| self.value_column(p, &cursor.table))
                .ok_or_else(|| {
                    QueryBuildError::invalid_sort_key(
                        display.clone(),
                        "sort keys must end at a simple value",
                    )
                })?;

            log::debug!("Sorting by {} {:?}", display, key.order);
            self.ctx.select_mut().order_by.push(OrderByItem {
                expression: resolved.column,
                order: match key.order {
                    SortOrder::Ascending => OrderByOrder::Asc,
                    SortOrder::Descending => OrderByOrder::Desc,
                },
            });
            seen.push(path);
        }
        Ok(())
    }
}
