//! Structured SQL produced by the query builder.
//!
//! The builder never assembles SQL text. It produces a [`Select`] tree whose
//! literal values are bound placeholders; [`ToSql`] renders the tree into
//! text plus ordered parameters for whoever executes it.

use serde::{Deserialize, Serialize};

pub mod to_sql;

pub use to_sql::{RenderedStatement, SqlWriter, ToSql};

/// Bound parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Date(chrono::NaiveDate),
    Timestamp(chrono::NaiveDateTime),
    /// Well-known text; the SRID is carried by the surrounding constructor call
    Geometry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    And,
    Or,
    Not,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    /// `a LIKE b [ESCAPE c]`
    Like,
    NotLike,
    /// `a BETWEEN b AND c`
    Between,
    NotBetween,
    /// Bounding box overlap (`&&`)
    BboxOverlap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// `None` for columns of an unaliased derived table
    pub table_alias: Option<String>,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFnCall {
    pub name: String,
    pub args: Vec<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubquerySource {
    Select(Box<Select>),
    /// Caller-supplied SQL, inserted verbatim
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InSubquery {
    pub expr: Box<SqlExpr>,
    pub subquery: SubquerySource,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlExpr {
    Column(ColumnRef),
    Placeholder(SqlValue),
    /// Inline SQL token (numbers, keywords, string constants from the mapping)
    Raw(String),
    ScalarFnCall(ScalarFnCall),
    List(Vec<SqlExpr>),
    OperatorApplicationExp(OperatorApplication),
    Exists(Box<Select>),
    InSubquery(InSubquery),
    /// `ROW_NUMBER() OVER (ORDER BY ...)`
    RowNumber(Vec<OrderByItem>),
}

impl SqlExpr {
    pub fn column(table_alias: &str, column: &str) -> Self {
        SqlExpr::Column(ColumnRef {
            table_alias: Some(table_alias.to_string()),
            column: column.to_string(),
        })
    }

    pub fn unqualified(column: &str) -> Self {
        SqlExpr::Column(ColumnRef {
            table_alias: None,
            column: column.to_string(),
        })
    }

    pub fn raw(token: impl Into<String>) -> Self {
        SqlExpr::Raw(token.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        SqlExpr::ScalarFnCall(ScalarFnCall {
            name: name.into(),
            args,
        })
    }

    pub fn apply(operator: Operator, operands: Vec<SqlExpr>) -> Self {
        SqlExpr::OperatorApplicationExp(OperatorApplication { operator, operands })
    }

    pub fn equals(left: SqlExpr, right: SqlExpr) -> Self {
        Self::apply(Operator::Equal, vec![left, right])
    }

    pub fn negated(inner: SqlExpr) -> Self {
        Self::apply(Operator::Not, vec![inner])
    }

    /// Conjunction; a single operand is returned as is
    pub fn and(mut operands: Vec<SqlExpr>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Self::apply(Operator::And, operands)
    }

    /// Disjunction; a single operand is returned as is
    pub fn or(mut operands: Vec<SqlExpr>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Self::apply(Operator::Or, operands)
    }

    pub fn is_or(&self) -> bool {
        matches!(
            self,
            SqlExpr::OperatorApplicationExp(OperatorApplication {
                operator: Operator::Or,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub join_type: JoinType,
    pub table_name: String,
    pub table_alias: String,
    /// ANDed join conditions
    pub joining_on: Vec<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FromSource {
    Table(String),
    Subquery(Box<Select>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromItem {
    pub source: FromSource,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expression: SqlExpr,
    pub col_alias: Option<String>,
}

impl SelectItem {
    /// Name the column is visible under to an enclosing select
    pub fn output_name(&self) -> Option<&str> {
        match (&self.col_alias, &self.expression) {
            (Some(alias), _) => Some(alias),
            (None, SqlExpr::Column(c)) => Some(&c.column),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderByOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub expression: SqlExpr,
    pub order: OrderByOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    /// Optimizer hint placed right after `SELECT`
    pub hint: Option<String>,
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: FromItem,
    pub joins: Vec<Join>,
    /// ANDed WHERE conditions
    pub filters: Vec<SqlExpr>,
    pub order_by: Vec<OrderByItem>,
    pub offset: Option<u64>,
    pub fetch: Option<u64>,
}

impl Select {
    pub fn from_table(table: &str, alias: &str) -> Self {
        Select {
            hint: None,
            distinct: false,
            projection: Vec::new(),
            from: FromItem {
                source: FromSource::Table(table.to_string()),
                alias: alias.to_string(),
            },
            joins: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            fetch: None,
        }
    }

    pub fn from_subquery(subquery: Select, alias: &str) -> Self {
        Select {
            from: FromItem {
                source: FromSource::Subquery(Box::new(subquery)),
                alias: alias.to_string(),
            },
            ..Select::from_table("", alias)
        }
    }

    pub fn project(&mut self, expression: SqlExpr, col_alias: Option<&str>) {
        self.projection.push(SelectItem {
            expression,
            col_alias: col_alias.map(str::to_string),
        });
    }

    pub fn join(&self, alias: &str) -> Option<&Join> {
        self.joins.iter().find(|j| j.table_alias == alias)
    }

    pub fn join_mut(&mut self, alias: &str) -> Option<&mut Join> {
        self.joins.iter_mut().find(|j| j.table_alias == alias)
    }
}
