//! Start id filter and row window.
//!
//! Dialects with OFFSET/FETCH get the window directly. Otherwise the
//! statement is wrapped and the window applied to a ROW_NUMBER() column
//! computed over the same ordering:
//!
//! ```sql
//! SELECT r.id, r.objectclass_id FROM (
//!   SELECT t0.id, t0.objectclass_id, ROW_NUMBER() OVER (ORDER BY t0.id ASC) AS rn
//!   FROM cityobject t0 WHERE ...
//! ) r WHERE r.rn > 10 AND r.rn <= 20 ORDER BY r.rn ASC
//! ```

use crate::query::CounterFilter;
use crate::sql_ast::{Operator, OrderByItem, OrderByOrder, Select, SqlExpr};

use super::comparison_builder::comparison_operator;
use super::errors::QueryBuildError;
use super::QueryCompiler;

const ROW_NUMBER_COLUMN: &str = "rn";

impl QueryCompiler<'_> {
    pub(crate) fn build_counter(&mut self, counter: &CounterFilter) -> Result<(), QueryBuildError> {
        let id = self.root_id_column();

        if let Some(start_id) = &counter.start_id {
            self.ctx.add_predicate(SqlExpr::apply(
                comparison_operator(start_id.operator),
                vec![id.clone(), SqlExpr::raw(start_id.value.to_string())],
            ));
        }

        // Deterministic pages need a total order
        let order_by = &mut self.ctx.select_mut().order_by;
        if !order_by.iter().any(|item| item.expression == id) {
            order_by.push(OrderByItem {
                expression: id,
                order: OrderByOrder::Asc,
            });
        }
        Ok(())
    }

    /// Close the statement, applying the row window of `counter`
    pub(crate) fn finish(mut self, counter: Option<&CounterFilter>) -> Select {
        let Some(counter) = counter.filter(|c| c.has_window()) else {
            return self.ctx.into_select();
        };

        let start = counter.start_index.unwrap_or(0);
        let hint = counter
            .count
            .and_then(|count| self.dialect.optimizer_hint(start.saturating_add(count)));

        if self.dialect.supports_offset_fetch() {
            let mut select = self.ctx.into_select();
            select.offset = (start > 0).then_some(start);
            select.fetch = counter.count;
            select.hint = hint;
            return select;
        }

        let alias = self.ctx.next_alias();
        let select = self.ctx.into_select();
        let mut outer = emulate_window(select, &alias, start, counter.count);
        outer.hint = hint;
        log::debug!(
            "Emulating OFFSET {} FETCH {:?} with ROW_NUMBER()",
            start,
            counter.count
        );
        outer
    }
}

/// Wrap `inner` and filter on its row number
fn emulate_window(mut inner: Select, alias: &str, start: u64, count: Option<u64>) -> Select {
    let order_by = std::mem::take(&mut inner.order_by);
    let columns: Vec<String> = inner
        .projection
        .iter()
        .filter_map(|item| item.output_name().map(str::to_string))
        .collect();
    inner.project(SqlExpr::RowNumber(order_by), Some(ROW_NUMBER_COLUMN));

    let mut outer = Select::from_subquery(inner, alias);
    for column in &columns {
        outer.project(SqlExpr::column(alias, column), None);
    }

    let rn = SqlExpr::column(alias, ROW_NUMBER_COLUMN);
    if start > 0 {
        outer.filters.push(SqlExpr::apply(
            Operator::GreaterThan,
            vec![rn.clone(), SqlExpr::raw(start.to_string())],
        ));
    }
    if let Some(count) = count {
        outer.filters.push(SqlExpr::apply(
            Operator::LessThanEqual,
            vec![rn.clone(), SqlExpr::raw(start.saturating_add(count).to_string())],
        ));
    }
    outer.order_by.push(OrderByItem {
        expression: rn,
        order: OrderByOrder::Asc,
    });
    outer
}
