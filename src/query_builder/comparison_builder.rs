//! Binary comparisons, BETWEEN, LIKE and NULL checks.

use std::collections::HashSet;

use crate::query::{
    BetweenComparison, BinaryComparison, BinaryComparisonKind, ComparisonOperator, Expression,
    LikeComparison, Literal, LogicalKind, NullComparison, Predicate, ValueReference,
};
use crate::schema_mapping::{
    GeometryStorage, PathElement, PropertyId, PropertyKind, PropertyOwner, SimpleType, TypeId,
};
use crate::sql_ast::{Operator, SqlExpr, SqlValue};

use super::context::TableRef;
use super::errors::QueryBuildError;
use super::schema_path_builder::{
    hop_conditions, Cursor, JoinMode, NodePredicates, PathScope, ResolvedValue,
};
use super::QueryCompiler;

/// Escape character of translated LIKE patterns
const LIKE_ESCAPE: char = '\\';

pub(crate) fn comparison_operator(kind: BinaryComparisonKind) -> Operator {
    match kind {
        BinaryComparisonKind::EqualTo => Operator::Equal,
        BinaryComparisonKind::NotEqualTo => Operator::NotEqual,
        BinaryComparisonKind::LessThan => Operator::LessThan,
        BinaryComparisonKind::LessThanOrEqualTo => Operator::LessThanEqual,
        BinaryComparisonKind::GreaterThan => Operator::GreaterThan,
        BinaryComparisonKind::GreaterThanOrEqualTo => Operator::GreaterThanEqual,
    }
}

fn is_text(value_type: SimpleType) -> bool {
    matches!(value_type, SimpleType::String | SimpleType::Clob)
}

/// Whether a literal can be compared with a column of `value_type`
fn literal_fits(value_type: SimpleType, literal: &Literal) -> bool {
    matches!(
        (value_type, literal),
        (SimpleType::Boolean, Literal::Boolean(_))
            | (SimpleType::Integer, Literal::Integer(_))
            | (SimpleType::Double, Literal::Integer(_) | Literal::Double(_))
            | (SimpleType::String | SimpleType::Clob, Literal::String(_))
            | (SimpleType::Date, Literal::Date(_))
            | (SimpleType::Timestamp, Literal::Date(_) | Literal::Timestamp(_))
    )
}

pub(crate) fn literal_value(literal: &Literal) -> SqlValue {
    match literal {
        Literal::Boolean(v) => SqlValue::Boolean(*v),
        Literal::Integer(v) => SqlValue::Integer(*v),
        Literal::Double(v) => SqlValue::Double(*v),
        Literal::String(v) => SqlValue::String(v.clone()),
        Literal::Date(v) => SqlValue::Date(*v),
        Literal::Timestamp(v) => SqlValue::Timestamp(*v),
        Literal::Geometry(g) => SqlValue::Geometry(g.to_wkt()),
    }
}

/// Translate a LIKE pattern with caller-defined wildcard, single character
/// and escape tokens into native SQL with `\` as the escape character
pub fn translate_like_pattern(
    pattern: &str,
    wildcard: &str,
    single_char: &str,
    escape: &str,
) -> Result<String, QueryBuildError> {
    if wildcard.is_empty() || single_char.is_empty() || escape.is_empty() {
        return Err(QueryBuildError::InvalidLikePattern(
            "wildcard, single character and escape tokens must not be empty".to_string(),
        ));
    }
    if wildcard == single_char || wildcard == escape || single_char == escape {
        return Err(QueryBuildError::InvalidLikePattern(format!(
            "wildcard `{}`, single character `{}` and escape `{}` must differ",
            wildcard, single_char, escape
        )));
    }

    fn push_literal(out: &mut String, text: &str) {
        for c in text.chars() {
            if matches!(c, '%' | '_' | LIKE_ESCAPE) {
                out.push(LIKE_ESCAPE);
            }
            out.push(c);
        }
    }

    let mut out = String::with_capacity(pattern.len() + 4);
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(escape) {
            let escaped = [wildcard, single_char, escape]
                .into_iter()
                .find(|token| after.starts_with(*token))
                .or_else(|| after.chars().next().map(|c| &after[..c.len_utf8()]));
            let Some(escaped) = escaped else {
                return Err(QueryBuildError::InvalidLikePattern(format!(
                    "`{}` ends with the escape token",
                    pattern
                )));
            };
            push_literal(&mut out, escaped);
            rest = &after[escaped.len()..];
        } else if let Some(after) = rest.strip_prefix(wildcard) {
            out.push('%');
            rest = after;
        } else if let Some(after) = rest.strip_prefix(single_char) {
            out.push('_');
            rest = after;
        } else if let Some(c) = rest.chars().next() {
            push_literal(&mut out, &rest[..c.len_utf8()]);
            rest = &rest[c.len_utf8()..];
        }
    }
    Ok(out)
}

impl QueryCompiler<'_> {
    pub(crate) fn build_comparison(
        &mut self,
        op: &ComparisonOperator,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        match op {
            ComparisonOperator::Binary(binary) => self.build_binary_comparison(binary, negate, scope),
            ComparisonOperator::Between(between) => self.build_between(between, negate, scope),
            ComparisonOperator::Like(like) => self.build_like(like, negate, scope),
            ComparisonOperator::Null(null) => self.build_null_check(null, negate, scope),
        }
    }

    fn resolve_operand(
        &mut self,
        reference: &ValueReference,
        scope: &PathScope,
        operator: &str,
    ) -> Result<ResolvedValue, QueryBuildError> {
        let path = self.resolve_path(scope, reference)?;
        self.resolve_value(&path, scope, operator)
    }

    fn check_literal(
        &self,
        resolved: &ResolvedValue,
        literal: &Literal,
    ) -> Result<(), QueryBuildError> {
        if literal_fits(resolved.value_type, literal) {
            Ok(())
        } else {
            Err(QueryBuildError::TypeMismatch {
                property: self.mapping.get_property(resolved.property).qualified_name(),
                expected: resolved.value_type.to_string(),
                found: literal.type_name().to_string(),
            })
        }
    }

    /// Column expression, truncated to a date for date literals on timestamps
    fn comparable_column(&self, resolved: &ResolvedValue, literal: &Literal) -> SqlExpr {
        match (resolved.value_type, literal) {
            (SimpleType::Timestamp, Literal::Date(_)) => {
                self.dialect.truncate_to_date(resolved.column.clone())
            }
            _ => resolved.column.clone(),
        }
    }

    fn build_binary_comparison(
        &mut self,
        binary: &BinaryComparison,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        let (reference, literal, operator) = match (&binary.left, &binary.right) {
            (Expression::ValueReference(v), Expression::Literal(l)) => (v, l, binary.operator),
            (Expression::Literal(l), Expression::ValueReference(v)) => {
                (v, l, binary.operator.flip())
            }
            _ => {
                return Err(QueryBuildError::invalid_operands(
                    binary.operator.sql(),
                    "expected one value reference and one literal",
                ))
            }
        };

        let resolved = self.resolve_operand(reference, scope, binary.operator.sql())?;
        self.check_literal(&resolved, literal)?;

        let mut column = self.comparable_column(&resolved, literal);
        let mut value = SqlExpr::Placeholder(literal_value(literal));
        if !binary.match_case && is_text(resolved.value_type) {
            column = self.dialect.upper(column);
            value = self.dialect.upper(value);
        }

        let operator = if negate { operator.negate() } else { operator };
        self.ctx.add_predicate(SqlExpr::apply(
            comparison_operator(operator),
            vec![column, value],
        ));
        Ok(())
    }

    fn build_between(
        &mut self,
        between: &BetweenComparison,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        let resolved = self.resolve_operand(&between.operand, scope, "BETWEEN")?;
        self.check_literal(&resolved, &between.lower)?;
        self.check_literal(&resolved, &between.upper)?;

        let column = self.comparable_column(&resolved, &between.lower);
        let operator = if negate {
            Operator::NotBetween
        } else {
            Operator::Between
        };
        self.ctx.add_predicate(SqlExpr::apply(
            operator,
            vec![
                column,
                SqlExpr::Placeholder(literal_value(&between.lower)),
                SqlExpr::Placeholder(literal_value(&between.upper)),
            ],
        ));
        Ok(())
    }

    fn build_like(
        &mut self,
        like: &LikeComparison,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        let pattern =
            translate_like_pattern(&like.pattern, &like.wildcard, &like.single_char, &like.escape)?;
        let resolved = self.resolve_operand(&like.operand, scope, "LIKE")?;
        if !is_text(resolved.value_type) {
            return Err(QueryBuildError::TypeMismatch {
                property: self.mapping.get_property(resolved.property).qualified_name(),
                expected: resolved.value_type.to_string(),
                found: "string pattern".to_string(),
            });
        }

        let mut column = resolved.column;
        let mut value = SqlExpr::Placeholder(SqlValue::String(pattern));
        if !like.match_case {
            column = self.dialect.upper(column);
            value = self.dialect.upper(value);
        }

        let operator = if negate {
            Operator::NotLike
        } else {
            Operator::Like
        };
        self.ctx.add_predicate(SqlExpr::apply(
            operator,
            vec![column, value, SqlExpr::raw(format!("'{}'", LIKE_ESCAPE))],
        ));
        Ok(())
    }

    fn build_null_check(
        &mut self,
        null: &NullComparison,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        let mut path = self.resolve_path(scope, &null.operand)?;
        // The implicit target type adds nothing to a null test
        let mut type_predicate = None;
        while path.len() > 2 && matches!(path.last().element, PathElement::Type(_)) {
            match path.parent() {
                Some(parent) if parent.target_property().is_some() => {
                    type_predicate = path.last().predicate.clone();
                    path = parent;
                }
                _ => break,
            }
        }
        let (Some(property), Some(parent)) = (path.target_property(), path.parent()) else {
            return Err(QueryBuildError::invalid_operands_with_context(
                "IS NULL",
                "the value reference must end at a property",
                null.operand.to_string(),
            ));
        };

        let cursor = self.walk_path(&parent, scope, NodePredicates::Filter)?;
        let node_predicate = match (path.last().predicate.clone(), type_predicate) {
            (Some(a), Some(b)) => Some(Predicate::and(vec![a, b])),
            (a, b) => a.or(b),
        };
        if node_predicate.is_some() && !self.property_has_join(property) {
            return Err(QueryBuildError::invalid_operands_with_context(
                "IS NULL",
                "a node predicate on the tested property needs a joined property",
                null.operand.to_string(),
            ));
        }

        let mut visited = HashSet::new();
        let fragments = self.null_fragments(
            property,
            &cursor,
            negate,
            scope.mode,
            node_predicate.as_ref(),
            &mut visited,
        )?;
        if fragments.is_empty() {
            return Err(QueryBuildError::NotAnAttribute {
                property: path.display(self.mapping),
                operator: "IS NULL".to_string(),
            });
        }

        // A value is null when all of its parts are null
        let kind = if negate {
            LogicalKind::Or
        } else {
            LogicalKind::And
        };
        self.emit(fragments, kind);
        Ok(())
    }

    fn null_fragments(
        &mut self,
        property: PropertyId,
        cursor: &Cursor,
        negate: bool,
        mode: JoinMode,
        node_predicate: Option<&Predicate>,
        visited: &mut HashSet<TypeId>,
    ) -> Result<Vec<SqlExpr>, QueryBuildError> {
        let mapping = self.mapping;
        let prop = mapping.get_property(property);
        let cursor = match prop.owner {
            PropertyOwner::Type(declaring) => {
                self.enter_type_table(cursor.clone(), declaring, mode)?
            }
            PropertyOwner::Attribute(_) => cursor.clone(),
        };

        if self.property_has_join(property) {
            let exists = self.correlated_exists(property, &cursor, |this, joined| {
                let mut filters = Vec::new();
                if let Some(predicate) = node_predicate {
                    let type_id = prop
                        .target_type()
                        .unwrap_or_else(|| mapping.declaring_type(property));
                    let value_cursor = Cursor {
                        entry_type: type_id,
                        type_id,
                        table: joined.clone(),
                    };
                    filters.extend(this.compile_node_predicate(
                        PathElement::Property(property),
                        &value_cursor,
                        predicate,
                    )?);
                }
                if let PropertyKind::SimpleAttribute { column, .. } = &prop.kind {
                    filters.push(SqlExpr::apply(
                        Operator::IsNotNull,
                        vec![SqlExpr::column(&joined.alias, column)],
                    ));
                }
                Ok(filters)
            })?;
            return Ok(vec![if negate {
                exists
            } else {
                SqlExpr::negated(exists)
            }]);
        }

        let null_test = |column: &str| {
            SqlExpr::apply(
                if negate {
                    Operator::IsNotNull
                } else {
                    Operator::IsNull
                },
                vec![SqlExpr::column(&cursor.table.alias, column)],
            )
        };

        let fragments = match &prop.kind {
            PropertyKind::SimpleAttribute { column, .. }
            | PropertyKind::ImplicitGeometryProperty { column, .. }
            | PropertyKind::GeometryProperty {
                storage: GeometryStorage::Inline { column },
                ..
            } => vec![null_test(column)],
            PropertyKind::GeometryProperty {
                storage: GeometryStorage::Decomposed { .. },
                ..
            } => {
                return Err(QueryBuildError::invalid_operands_with_context(
                    "IS NULL",
                    "decomposed geometry without a join",
                    prop.qualified_name(),
                ))
            }
            PropertyKind::ComplexAttribute { attributes } => attributes
                .iter()
                .filter_map(|member| match &mapping.get_property(*member).kind {
                    PropertyKind::SimpleAttribute { column, .. } => Some(null_test(column)),
                    _ => None,
                })
                .collect(),
            PropertyKind::ComplexProperty { target, .. }
            | PropertyKind::ObjectProperty { target, .. }
            | PropertyKind::FeatureProperty { target, .. } => {
                // Values stored in the same row: null when all sub-values are null
                if !visited.insert(*target) {
                    return Ok(Vec::new());
                }
                let inner = Cursor {
                    entry_type: *target,
                    type_id: *target,
                    table: cursor.table.clone(),
                };
                let mut fragments = Vec::new();
                for sub in mapping.list_properties(*target, false, true) {
                    fragments.extend(self.null_fragments(sub, &inner, negate, mode, None, visited)?);
                }
                visited.remove(target);
                fragments
            }
        };
        Ok(fragments)
    }

    /// `EXISTS (SELECT 1 FROM <value table> ... WHERE <correlation> AND <filters>)`
    ///
    /// The first hop of the property becomes the sub-select's FROM, the
    /// remaining hops inner joins inside it.
    pub(crate) fn correlated_exists<F>(
        &mut self,
        property: PropertyId,
        cursor: &Cursor,
        filters: F,
    ) -> Result<SqlExpr, QueryBuildError>
    where
        F: FnOnce(&mut Self, &TableRef) -> Result<Vec<SqlExpr>, QueryBuildError>,
    {
        let hops = self.property_hops(property);
        let Some((first, rest)) = hops.split_first() else {
            return Err(QueryBuildError::UnresolvableJoin {
                from: cursor.table.table.clone(),
                to: self.mapping.get_property(property).qualified_name(),
            });
        };

        let sub = self.ctx.push_scope(first.table);
        for condition in hop_conditions(&cursor.table, first, &sub.alias) {
            self.ctx.select_mut().filters.push(condition);
        }

        let result = (|| -> Result<Vec<SqlExpr>, QueryBuildError> {
            let mut joined = sub.clone();
            for hop in rest {
                joined = self.apply_hop(&joined, hop, JoinMode::Inner, &[], &[])?;
            }
            filters(self, &joined)
        })();

        match result {
            Ok(extra) => {
                self.ctx.select_mut().filters.extend(extra);
                let select = self.ctx.pop_scope();
                Ok(SqlExpr::Exists(Box::new(select)))
            }
            Err(e) => {
                self.ctx.pop_scope();
                Err(e)
            }
        }
    }
}
