//! Walks the predicate tree and dispatches leaves to the operator builders.
//!
//! Negation is pushed down to the leaves: NOT flips a flag, logical
//! operators swap family under De Morgan, and each leaf builder emits the
//! negated form of its operator. Nested AND/OR operands of a negated
//! operator are built positively and wrapped in a NOT instead.

use crate::query::{LogicalKind, Predicate};
use crate::sql_ast::SqlExpr;

use super::errors::QueryBuildError;
use super::schema_path_builder::{JoinMode, PathScope};
use super::QueryCompiler;

/// Whether joins of the selection must be LEFT joins
///
/// An inner join drops rows before an OR gets to look at them, so any
/// disjunction (also one produced by negating an AND) needs outer joins.
pub fn requires_left_joins(predicate: &Predicate) -> bool {
    fn visit(predicate: &Predicate, negated: bool) -> bool {
        match predicate {
            Predicate::Or(operands) => {
                operands.len() > 1 || operands.iter().any(|p| visit(p, negated))
            }
            Predicate::And(operands) => {
                (negated && operands.len() > 1) || operands.iter().any(|p| visit(p, negated))
            }
            Predicate::Not(inner) => visit(inner, !negated),
            Predicate::Comparison(_)
            | Predicate::Spatial(_)
            | Predicate::Id(_)
            | Predicate::Select(_) => false,
        }
    }
    visit(predicate, false)
}

fn flip(kind: LogicalKind) -> LogicalKind {
    match kind {
        LogicalKind::And => LogicalKind::Or,
        LogicalKind::Or => LogicalKind::And,
    }
}

impl QueryCompiler<'_> {
    pub(crate) fn build_selection(&mut self, predicate: &Predicate) -> Result<(), QueryBuildError> {
        let mode = if requires_left_joins(predicate) {
            log::debug!("Selection contains a disjunction, using LEFT joins");
            JoinMode::Left
        } else {
            JoinMode::Inner
        };
        let scope = self.root_scope(mode);

        self.ctx.push_logical(None);
        let result = self.compile_predicate(predicate, false, &scope);
        self.ctx.pop_logical();
        result
    }

    pub(crate) fn compile_predicate(
        &mut self,
        predicate: &Predicate,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        match predicate {
            Predicate::Comparison(op) => self.build_comparison(op, negate, scope),
            Predicate::Spatial(op) => self.build_spatial(op, negate, scope),
            Predicate::Id(op) => self.build_id(op, negate, scope),
            Predicate::Select(op) => self.build_select_operator(op, negate, scope),
            Predicate::Not(inner) => self.compile_predicate(inner, !negate, scope),
            Predicate::And(operands) => {
                self.compile_logical(LogicalKind::And, operands, negate, scope)
            }
            Predicate::Or(operands) => {
                self.compile_logical(LogicalKind::Or, operands, negate, scope)
            }
        }
    }

    fn compile_logical(
        &mut self,
        kind: LogicalKind,
        operands: &[Predicate],
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        match operands {
            [] => return Err(QueryBuildError::EmptyLogicalOperator(kind.to_string())),
            [single] => return self.compile_predicate(single, negate, scope),
            _ => {}
        }

        let effective = if negate { flip(kind) } else { kind };
        self.ctx.push_logical(Some(effective));

        let mut combined = Vec::with_capacity(operands.len());
        for operand in operands {
            self.ctx.push_frame();
            let wrap = negate && operand.as_logical().is_some();
            let result = self.compile_predicate(operand, negate && !wrap, scope);
            let fragments = self.ctx.pop_frame();
            if let Err(e) = result {
                self.ctx.pop_logical();
                return Err(e);
            }
            if fragments.is_empty() {
                continue;
            }
            let expr = SqlExpr::and(fragments);
            combined.push(if wrap { SqlExpr::negated(expr) } else { expr });
        }

        self.ctx.pop_logical();
        self.emit(combined, effective);
        Ok(())
    }

    /// Hand fragments combined under `kind` to the enclosing operator
    ///
    /// Conjunctions are flattened into the open frame unless an OR encloses
    /// them, in which case they are grouped eagerly.
    pub(crate) fn emit(&mut self, fragments: Vec<SqlExpr>, kind: LogicalKind) {
        if fragments.is_empty() {
            return;
        }
        match kind {
            LogicalKind::And if self.ctx.enclosing_logical() == Some(LogicalKind::Or) => {
                self.ctx.add_predicate(SqlExpr::and(fragments))
            }
            LogicalKind::And => {
                for fragment in fragments {
                    self.ctx.add_predicate(fragment);
                }
            }
            LogicalKind::Or => self.ctx.add_predicate(SqlExpr::or(fragments)),
        }
    }
}
