//! Rendering of the SQL AST into text with `?` placeholders.

use serde::Serialize;

use super::{
    FromSource, Join, JoinType, Operator, OperatorApplication, OrderByItem, OrderByOrder, Select,
    SqlExpr, SqlValue, SubquerySource,
};

/// SQL text plus the values bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedStatement {
    pub sql: String,
    pub parameters: Vec<SqlValue>,
}

#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    parameters: Vec<SqlValue>,
}

impl SqlWriter {
    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub fn bind(&mut self, value: &SqlValue) {
        self.sql.push('?');
        self.parameters.push(value.clone());
    }

    pub fn finish(self) -> RenderedStatement {
        RenderedStatement {
            sql: self.sql,
            parameters: self.parameters,
        }
    }
}

pub trait ToSql {
    fn write_sql(&self, w: &mut SqlWriter);

    fn to_sql(&self) -> RenderedStatement {
        let mut w = SqlWriter::default();
        self.write_sql(&mut w);
        w.finish()
    }
}

fn write_separated<T: ToSql>(w: &mut SqlWriter, items: &[T], separator: &str) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            w.push(separator);
        }
        item.write_sql(w);
    }
}

/// Operand of AND/OR: nested logical operators are parenthesized
fn write_logical_operand(w: &mut SqlWriter, expr: &SqlExpr) {
    match expr {
        SqlExpr::OperatorApplicationExp(OperatorApplication {
            operator: Operator::And | Operator::Or,
            ..
        }) => {
            w.push("(");
            expr.write_sql(w);
            w.push(")");
        }
        _ => expr.write_sql(w),
    }
}

fn write_conjunction(w: &mut SqlWriter, exprs: &[SqlExpr]) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            w.push(" AND ");
        }
        if exprs.len() > 1 {
            write_logical_operand(w, expr);
        } else {
            expr.write_sql(w);
        }
    }
}

impl ToSql for SqlExpr {
    fn write_sql(&self, w: &mut SqlWriter) {
        match self {
            SqlExpr::Column(c) => {
                if let Some(alias) = &c.table_alias {
                    w.push(alias);
                    w.push(".");
                }
                w.push(&c.column);
            }
            SqlExpr::Placeholder(value) => w.bind(value),
            SqlExpr::Raw(token) => w.push(token),
            SqlExpr::ScalarFnCall(call) => {
                w.push(&call.name);
                w.push("(");
                write_separated(w, &call.args, ", ");
                w.push(")");
            }
            SqlExpr::List(items) => {
                w.push("(");
                write_separated(w, items, ", ");
                w.push(")");
            }
            SqlExpr::OperatorApplicationExp(app) => app.write_sql(w),
            SqlExpr::Exists(select) => {
                w.push("EXISTS (");
                select.write_sql(w);
                w.push(")");
            }
            SqlExpr::InSubquery(in_sub) => {
                in_sub.expr.write_sql(w);
                w.push(if in_sub.negated { " NOT IN (" } else { " IN (" });
                match &in_sub.subquery {
                    SubquerySource::Select(select) => select.write_sql(w),
                    SubquerySource::Raw(sql) => w.push(sql),
                }
                w.push(")");
            }
            SqlExpr::RowNumber(order_by) => {
                w.push("ROW_NUMBER() OVER (ORDER BY ");
                write_separated(w, order_by, ", ");
                w.push(")");
            }
        }
    }
}

impl ToSql for OperatorApplication {
    fn write_sql(&self, w: &mut SqlWriter) {
        debug_assert!(
            self.has_valid_arity(),
            "{:?} applied to {} operands",
            self.operator,
            self.operands.len()
        );
        let binary = |w: &mut SqlWriter, op: &str| {
            if let [left, right] = self.operands.as_slice() {
                left.write_sql(w);
                w.push(op);
                right.write_sql(w);
            }
        };

        match self.operator {
            Operator::Equal => binary(w, " = "),
            Operator::NotEqual => binary(w, " <> "),
            Operator::LessThan => binary(w, " < "),
            Operator::GreaterThan => binary(w, " > "),
            Operator::LessThanEqual => binary(w, " <= "),
            Operator::GreaterThanEqual => binary(w, " >= "),
            Operator::In => binary(w, " IN "),
            Operator::NotIn => binary(w, " NOT IN "),
            Operator::BboxOverlap => binary(w, " && "),
            Operator::And | Operator::Or => {
                let sep = if self.operator == Operator::And {
                    " AND "
                } else {
                    " OR "
                };
                for (i, operand) in self.operands.iter().enumerate() {
                    if i > 0 {
                        w.push(sep);
                    }
                    write_logical_operand(w, operand);
                }
            }
            Operator::Not => {
                w.push("NOT (");
                write_conjunction(w, &self.operands);
                w.push(")");
            }
            Operator::IsNull | Operator::IsNotNull => {
                if let Some(operand) = self.operands.first() {
                    operand.write_sql(w);
                }
                w.push(if self.operator == Operator::IsNull {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                });
            }
            Operator::Like | Operator::NotLike => {
                if let [value, pattern, rest @ ..] = self.operands.as_slice() {
                    value.write_sql(w);
                    w.push(if self.operator == Operator::Like {
                        " LIKE "
                    } else {
                        " NOT LIKE "
                    });
                    pattern.write_sql(w);
                    if let Some(escape) = rest.first() {
                        w.push(" ESCAPE ");
                        escape.write_sql(w);
                    }
                }
            }
            Operator::Between | Operator::NotBetween => {
                if let [value, lower, upper] = self.operands.as_slice() {
                    value.write_sql(w);
                    w.push(if self.operator == Operator::Between {
                        " BETWEEN "
                    } else {
                        " NOT BETWEEN "
                    });
                    lower.write_sql(w);
                    w.push(" AND ");
                    upper.write_sql(w);
                }
            }
        }
    }
}

impl OperatorApplication {
    /// Whether the operand count fits the operator
    pub fn has_valid_arity(&self) -> bool {
        let n = self.operands.len();
        match self.operator {
            Operator::Equal
            | Operator::NotEqual
            | Operator::LessThan
            | Operator::GreaterThan
            | Operator::LessThanEqual
            | Operator::GreaterThanEqual
            | Operator::In
            | Operator::NotIn
            | Operator::BboxOverlap => n == 2,
            Operator::IsNull | Operator::IsNotNull => n == 1,
            Operator::Like | Operator::NotLike => n == 2 || n == 3,
            Operator::Between | Operator::NotBetween => n == 3,
            Operator::And | Operator::Or | Operator::Not => n >= 1,
        }
    }
}

impl ToSql for OrderByItem {
    fn write_sql(&self, w: &mut SqlWriter) {
        self.expression.write_sql(w);
        w.push(match self.order {
            OrderByOrder::Asc => " ASC",
            OrderByOrder::Desc => " DESC",
        });
    }
}

impl ToSql for Join {
    fn write_sql(&self, w: &mut SqlWriter) {
        w.push(match self.join_type {
            JoinType::Inner => " INNER JOIN ",
            JoinType::Left => " LEFT JOIN ",
        });
        w.push(&self.table_name);
        w.push(" ");
        w.push(&self.table_alias);
        w.push(" ON ");
        write_conjunction(w, &self.joining_on);
    }
}

impl ToSql for Select {
    fn write_sql(&self, w: &mut SqlWriter) {
        w.push("SELECT ");
        if let Some(hint) = &self.hint {
            w.push(hint);
            w.push(" ");
        }
        if self.distinct {
            w.push("DISTINCT ");
        }
        if self.projection.is_empty() {
            w.push("1");
        }
        for (i, item) in self.projection.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            item.expression.write_sql(w);
            if let Some(alias) = &item.col_alias {
                w.push(" AS ");
                w.push(alias);
            }
        }

        w.push(" FROM ");
        match &self.from.source {
            FromSource::Table(table) => w.push(table),
            FromSource::Subquery(select) => {
                w.push("(");
                select.write_sql(w);
                w.push(")");
            }
        }
        w.push(" ");
        w.push(&self.from.alias);

        for join in &self.joins {
            join.write_sql(w);
        }

        if !self.filters.is_empty() {
            w.push(" WHERE ");
            write_conjunction(w, &self.filters);
        }

        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            write_separated(w, &self.order_by, ", ");
        }

        if let Some(offset) = self.offset {
            w.push(&format!(" OFFSET {} ROWS", offset));
        }
        if let Some(fetch) = self.fetch {
            w.push(&format!(" FETCH FIRST {} ROWS ONLY", fetch));
        }
    }
}
