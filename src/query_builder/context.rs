//! Per-query mutable state threaded through all builders.
//!
//! Contract of the accumulator:
//!
//! - `scopes`: the statement under construction. The bottom scope is the
//!   outer SELECT; builders that need a correlated sub-select push a scope,
//!   fill it and pop it back out as a [`Select`].
//! - `frames`: buffers of pending predicate fragments. A leaf builder appends
//!   fragments to the top frame; the predicate builder decides how the
//!   fragments of one frame are combined. With no frame open, fragments go
//!   straight to the WHERE clause of the current scope.
//! - `logical_ops`: the logical operator enclosing the predicate being
//!   compiled (`None` at the top level).
//! - `to_table` / `target_column`: where the last resolved value reference
//!   ended.
//! - Joins are registered per scope under a fingerprint of table and ON
//!   clause so that the same hop is only joined once.

use std::collections::HashMap;

use crate::query::LogicalKind;
use crate::schema_mapping::TypeId;
use crate::sql_ast::{Join, Select, SqlExpr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub alias: String,
}

#[derive(Debug)]
struct Scope {
    select: Select,
    /// Join fingerprint -> alias
    joins: HashMap<String, String>,
}

#[derive(Debug)]
pub struct QueryContext {
    root_type: TypeId,
    root: TableRef,
    scopes: Vec<Scope>,
    frames: Vec<Vec<SqlExpr>>,
    logical_ops: Vec<Option<LogicalKind>>,
    alias_counter: usize,
    to_table: TableRef,
    target_column: Option<SqlExpr>,
}

impl QueryContext {
    pub fn new(root_type: TypeId, root_table: &str) -> Self {
        let root = TableRef {
            table: root_table.to_string(),
            alias: "t0".to_string(),
        };
        QueryContext {
            root_type,
            scopes: vec![Scope {
                select: Select::from_table(&root.table, &root.alias),
                joins: HashMap::new(),
            }],
            frames: Vec::new(),
            logical_ops: Vec::new(),
            alias_counter: 1,
            to_table: root.clone(),
            root,
            target_column: None,
        }
    }

    pub fn root_type(&self) -> TypeId {
        self.root_type
    }

    pub fn root(&self) -> &TableRef {
        &self.root
    }

    /// Fresh table alias, unique across all scopes of the statement
    pub fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.alias_counter);
        self.alias_counter += 1;
        alias
    }

    fn scope(&self) -> &Scope {
        // The outer scope is never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    fn scope_mut(&mut self) -> &mut Scope {
        let idx = self.scopes.len() - 1;
        &mut self.scopes[idx]
    }

    pub fn select(&self) -> &Select {
        &self.scope().select
    }

    pub fn select_mut(&mut self) -> &mut Select {
        &mut self.scope_mut().select
    }

    pub fn into_select(mut self) -> Select {
        self.scopes.swap_remove(0).select
    }

    /// Open a correlated sub-select over `table`
    pub fn push_scope(&mut self, table: &str) -> TableRef {
        let alias = self.next_alias();
        self.scopes.push(Scope {
            select: Select::from_table(table, &alias),
            joins: HashMap::new(),
        });
        TableRef {
            table: table.to_string(),
            alias,
        }
    }

    pub fn pop_scope(&mut self) -> Select {
        if self.scopes.len() > 1 {
            if let Some(scope) = self.scopes.pop() {
                return scope.select;
            }
        }
        log::warn!("pop_scope called on the outer statement");
        self.scope().select.clone()
    }

    pub fn find_join(&self, fingerprint: &str) -> Option<&str> {
        self.scope().joins.get(fingerprint).map(String::as_str)
    }

    pub fn add_join(&mut self, fingerprint: String, join: Join) {
        let scope = self.scope_mut();
        scope.joins.insert(fingerprint, join.table_alias.clone());
        scope.select.joins.push(join);
    }

    pub fn join_count(&self) -> usize {
        self.scope().select.joins.len()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop_frame(&mut self) -> Vec<SqlExpr> {
        self.frames.pop().unwrap_or_default()
    }

    /// Add a predicate fragment to the open frame, or to the WHERE clause
    pub fn add_predicate(&mut self, predicate: SqlExpr) {
        match self.frames.last_mut() {
            Some(frame) => frame.push(predicate),
            None => self.select_mut().filters.push(predicate),
        }
    }

    pub fn push_logical(&mut self, op: Option<LogicalKind>) {
        self.logical_ops.push(op);
    }

    pub fn pop_logical(&mut self) {
        self.logical_ops.pop();
    }

    /// Logical operator directly enclosing the predicate being compiled
    pub fn enclosing_logical(&self) -> Option<LogicalKind> {
        self.logical_ops.last().copied().flatten()
    }

    pub fn set_target(&mut self, to_table: TableRef, column: SqlExpr) {
        self.to_table = to_table;
        self.target_column = Some(column);
    }

    pub fn to_table(&self) -> &TableRef {
        &self.to_table
    }

    pub fn target_column(&self) -> Option<&SqlExpr> {
        self.target_column.as_ref()
    }
}
