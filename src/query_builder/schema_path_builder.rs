//! Turns a [`SchemaPath`] into joins and a value column.
//!
//! Walking a path moves a [`Cursor`] from table to table. Every hop the
//! mapping describes (extension joins up or down the type hierarchy,
//! injection joins, property joins and both halves of a join table) becomes
//! one JOIN, registered in the context under a fingerprint so the same hop is
//! joined only once per statement.
//!
//! Node predicates are compiled relative to the node carrying them with joins
//! disabled. During selection their fragments become additional predicates;
//! for sort keys they are folded into the ON clause of the hop they restrict.

use crate::query::Predicate;
use crate::schema_mapping::{
    Condition, Join as MappedJoin, PathElement, PathNode, PropertyId, PropertyJoin, PropertyKind,
    PropertyOwner, SchemaPath, SimpleType, TypeId,
};
use crate::sql_ast::{Join, JoinType, Operator, SqlExpr, SqlValue, ToSql};

use super::context::TableRef;
use super::errors::QueryBuildError;
use super::QueryCompiler;

/// Alias used while computing a join fingerprint, before the real alias exists
const PENDING_ALIAS: &str = "$join";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinMode {
    Inner,
    Left,
    /// No new joins allowed (node predicates)
    Forbidden,
}

/// What to do with node predicates met while walking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodePredicates {
    /// Compile them into predicates of the current frame
    Filter,
    /// Fold them into the ON clause of the hop they restrict
    FoldIntoJoin,
}

/// Position reached while walking a path
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cursor {
    /// Type whose table the alias points at
    pub entry_type: TypeId,
    /// Type of the values at this position, after casts
    pub type_id: TypeId,
    pub table: TableRef,
}

/// Where value references of a predicate are resolved from
#[derive(Debug, Clone)]
pub(crate) struct PathScope {
    pub origin: PathElement,
    pub cursor: Cursor,
    pub mode: JoinMode,
}

/// Column a value reference resolved to
#[derive(Debug, Clone)]
pub(crate) struct ResolvedValue {
    pub column: SqlExpr,
    pub value_type: SimpleType,
    pub property: PropertyId,
}

/// One foreign key hop: `from_column` on the current table, `to_column` on `table`
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hop<'m> {
    pub table: &'m str,
    pub from_column: &'m str,
    pub to_column: &'m str,
    pub conditions: &'m [Condition],
    pub tree_root: Option<&'m str>,
}

impl<'m> Hop<'m> {
    pub fn forward(join: &'m MappedJoin) -> Self {
        Hop {
            table: &join.table,
            from_column: &join.from_column,
            to_column: &join.to_column,
            conditions: &join.conditions,
            tree_root: join.tree_hierarchy.as_ref().map(|t| t.root_column.as_str()),
        }
    }

    /// Walk a join the other way round, from its target to `table`
    pub fn reversed(join: &'m MappedJoin, table: &'m str) -> Self {
        Hop {
            table,
            from_column: &join.to_column,
            to_column: &join.from_column,
            conditions: &[],
            tree_root: None,
        }
    }
}

/// Node predicate folded into a join
type FoldedPredicate<'p> = (PathElement, &'p Predicate);

/// Predicates restricting the value of the property at `nodes[i]`: its own,
/// and the one on an explicit target type step right after it
fn predicates_at(nodes: &[PathNode], i: usize) -> Vec<FoldedPredicate<'_>> {
    let mut predicates = Vec::new();
    if let Some(predicate) = &nodes[i].predicate {
        predicates.push((nodes[i].element, predicate));
    }
    if let Some(next) = nodes.get(i + 1) {
        if let (PathElement::Type(_), Some(predicate)) = (next.element, &next.predicate) {
            predicates.push((next.element, predicate));
        }
    }
    predicates
}

impl<'a> QueryCompiler<'a> {
    pub(crate) fn root_scope(&self, mode: JoinMode) -> PathScope {
        let root_type = self.ctx.root_type();
        PathScope {
            origin: PathElement::Type(root_type),
            cursor: Cursor {
                entry_type: root_type,
                type_id: root_type,
                table: self.ctx.root().clone(),
            },
            mode,
        }
    }

    pub(crate) fn resolve_path(
        &self,
        scope: &PathScope,
        reference: &crate::query::ValueReference,
    ) -> Result<SchemaPath, QueryBuildError> {
        Ok(SchemaPath::resolve_from(self.mapping, scope.origin, reference)?)
    }

    /// Type the values of a path element belong to
    fn element_type(&self, element: PathElement) -> TypeId {
        match element {
            PathElement::Type(t) => t,
            PathElement::Property(p) => self
                .mapping
                .get_property(p)
                .target_type()
                .unwrap_or_else(|| self.mapping.declaring_type(p)),
        }
    }

    /// Joins needed to reach the last node of `path`
    pub(crate) fn walk_path(
        &mut self,
        path: &SchemaPath,
        scope: &PathScope,
        node_predicates: NodePredicates,
    ) -> Result<Cursor, QueryBuildError> {
        let nodes = path.nodes();
        let mut cursor = scope.cursor.clone();

        if let Some(predicate) = &nodes[0].predicate {
            match node_predicates {
                NodePredicates::Filter => {
                    self.filter_node_predicate(nodes[0].element, &cursor, predicate)?
                }
                NodePredicates::FoldIntoJoin => {
                    return Err(QueryBuildError::invalid_sort_key(
                        path.display(self.mapping),
                        "a predicate on the root type needs no sort key",
                    ))
                }
            }
        }

        for i in 1..nodes.len() {
            let node = &nodes[i];
            match node.element {
                PathElement::Property(property) => {
                    let restricting = predicates_at(nodes, i);
                    match node_predicates {
                        NodePredicates::Filter => {
                            cursor = self.enter_property(
                                cursor,
                                property,
                                scope.mode,
                                &[],
                                &restricting,
                            )?;
                            if let Some(predicate) = &node.predicate {
                                self.filter_node_predicate(node.element, &cursor, predicate)?;
                            }
                        }
                        NodePredicates::FoldIntoJoin => {
                            if !restricting.is_empty() && !self.property_has_join(property) {
                                return Err(QueryBuildError::invalid_sort_key(
                                    path.display(self.mapping),
                                    "node predicates are only supported on joined properties",
                                ));
                            }
                            cursor = self.enter_property(
                                cursor,
                                property,
                                scope.mode,
                                &restricting,
                                &[],
                            )?;
                        }
                    }
                }
                PathElement::Type(type_id) => {
                    let after_property =
                        matches!(nodes[i - 1].element, PathElement::Property(_));
                    if after_property {
                        cursor.entry_type = type_id;
                        cursor.type_id = type_id;
                    } else {
                        if node_predicates == NodePredicates::FoldIntoJoin {
                            return Err(QueryBuildError::invalid_sort_key(
                                path.display(self.mapping),
                                "type casts cannot be used in sort keys",
                            ));
                        }
                        cursor.type_id = type_id;
                        let ids = self.mapping.object_class_ids(type_id);
                        let restriction = self
                            .object_class_predicate(&cursor.table.alias, &ids)
                            .ok_or_else(|| {
                                QueryBuildError::invalid_operands_with_context(
                                    "type cast",
                                    "the target type has no instantiable subtypes",
                                    path.display(self.mapping),
                                )
                            })?;
                        self.ctx.add_predicate(restriction);
                    }

                    // Folded together with the preceding property in sort keys
                    if node_predicates == NodePredicates::Filter {
                        if let Some(predicate) = &node.predicate {
                            self.filter_node_predicate(node.element, &cursor, predicate)?;
                        }
                    }
                }
            }
        }

        Ok(cursor)
    }

    /// Walk the path and return the column holding its value
    pub(crate) fn resolve_value(
        &mut self,
        path: &SchemaPath,
        scope: &PathScope,
        operator: &str,
    ) -> Result<ResolvedValue, QueryBuildError> {
        let cursor = self.walk_path(path, scope, NodePredicates::Filter)?;
        let resolved = path
            .target_property()
            .and_then(|p| self.value_column(p, &cursor.table))
            .ok_or_else(|| QueryBuildError::NotAnAttribute {
                property: path.display(self.mapping),
                operator: operator.to_string(),
            })?;
        self.ctx
            .set_target(cursor.table.clone(), resolved.column.clone());
        Ok(resolved)
    }

    /// Column of a simple attribute, or of the value member of a complex attribute
    pub(crate) fn value_column(&self, property: PropertyId, table: &TableRef) -> Option<ResolvedValue> {
        let leaf = match &self.mapping.get_property(property).kind {
            PropertyKind::SimpleAttribute { .. } => property,
            PropertyKind::ComplexAttribute { .. } => self.mapping.value_attribute(property)?,
            _ => return None,
        };
        match &self.mapping.get_property(leaf).kind {
            PropertyKind::SimpleAttribute { column, value_type } => Some(ResolvedValue {
                column: SqlExpr::column(&table.alias, column),
                value_type: *value_type,
                property: leaf,
            }),
            _ => None,
        }
    }

    pub(crate) fn property_has_join(&self, property: PropertyId) -> bool {
        let prop = self.mapping.get_property(property);
        prop.join.is_some() || prop.injection.is_some()
    }

    /// Hops leading from the declaring type's table to the table holding the value
    pub(crate) fn property_hops(&self, property: PropertyId) -> Vec<Hop<'a>> {
        let mapping = self.mapping;
        let prop = mapping.get_property(property);
        let mut hops = Vec::new();
        if let Some(index) = prop.injection {
            hops.push(Hop::forward(&mapping.get_injection(index).join));
        }
        match &prop.join {
            Some(PropertyJoin::Join(join)) => hops.push(Hop::forward(join)),
            Some(PropertyJoin::JoinTable(join_table)) => {
                hops.push(Hop::reversed(&join_table.join, &join_table.table));
                hops.push(Hop::forward(&join_table.inverse_join));
            }
            None => {}
        }
        hops
    }

    /// Move the cursor onto the value of a property
    ///
    /// `folded` node predicates go into the ON clause of the last hop.
    /// `distinguishing` ones are filtered by the caller; they only keep
    /// differently restricted joins of the same table apart.
    pub(crate) fn enter_property(
        &mut self,
        cursor: Cursor,
        property: PropertyId,
        mode: JoinMode,
        folded: &[FoldedPredicate<'_>],
        distinguishing: &[FoldedPredicate<'_>],
    ) -> Result<Cursor, QueryBuildError> {
        let mapping = self.mapping;
        let prop = mapping.get_property(property);

        // Members share the row of their complex attribute
        let declaring = match prop.owner {
            PropertyOwner::Type(t) => t,
            PropertyOwner::Attribute(_) => return Ok(cursor),
        };

        let mut cursor = self.enter_type_table(cursor, declaring, mode)?;
        let hops = self.property_hops(property);
        let last = hops.len().saturating_sub(1);
        for (i, hop) in hops.iter().enumerate() {
            let (folded, distinguishing) = if i == last {
                (folded, distinguishing)
            } else {
                (&[][..], &[][..])
            };
            cursor.table = self.apply_hop(&cursor.table, hop, mode, folded, distinguishing)?;
        }

        if let Some(target) = prop.target_type() {
            cursor.entry_type = target;
            cursor.type_id = target;
        }
        Ok(cursor)
    }

    /// Make the cursor point at the table holding the columns of `declaring`
    pub(crate) fn enter_type_table(
        &mut self,
        cursor: Cursor,
        declaring: TypeId,
        mode: JoinMode,
    ) -> Result<Cursor, QueryBuildError> {
        let mapping = self.mapping;
        let Some(target_table) = mapping.table_of(declaring) else {
            return Ok(cursor);
        };
        if target_table == cursor.table.table {
            return Ok(cursor);
        }

        let entry = cursor.entry_type;
        let mut table = cursor.table.clone();

        if mapping.is_equal_or_sub_type_of(entry, declaring) {
            for t in mapping.ancestors(entry) {
                if table.table == target_table || t == declaring {
                    break;
                }
                if let Some(join) = mapping
                    .get_type(t)
                    .extension
                    .as_ref()
                    .and_then(|ext| ext.join.as_ref())
                {
                    table = self.apply_hop(&table, &Hop::forward(join), mode, &[], &[])?;
                }
            }
        } else if mapping.is_sub_type_of(declaring, entry) {
            // Down the hierarchy: walk the extension joins backwards
            let chain: Vec<TypeId> = mapping
                .ancestors(declaring)
                .into_iter()
                .take_while(|t| *t != entry)
                .collect();
            for t in chain.into_iter().rev() {
                if table.table == target_table {
                    break;
                }
                let sub_table = mapping.table_of(t);
                let join = mapping
                    .get_type(t)
                    .extension
                    .as_ref()
                    .and_then(|ext| ext.join.as_ref());
                if let (Some(sub_table), Some(join)) = (sub_table, join) {
                    table = self.apply_hop(&table, &Hop::reversed(join, sub_table), mode, &[], &[])?;
                }
            }
        }

        if table.table != target_table {
            return Err(QueryBuildError::UnresolvableJoin {
                from: cursor.table.table,
                to: target_table.to_string(),
            });
        }

        Ok(Cursor {
            entry_type: declaring,
            type_id: cursor.type_id,
            table,
        })
    }

    /// Join `hop` onto `from`, reusing an identical join of the current scope
    pub(crate) fn apply_hop(
        &mut self,
        from: &TableRef,
        hop: &Hop<'_>,
        mode: JoinMode,
        folded: &[FoldedPredicate<'_>],
        distinguishing: &[FoldedPredicate<'_>],
    ) -> Result<TableRef, QueryBuildError> {
        let join_type = match mode {
            JoinMode::Inner => JoinType::Inner,
            JoinMode::Left => JoinType::Left,
            JoinMode::Forbidden => {
                return Err(QueryBuildError::NodePredicateRequiresJoin(
                    hop.table.to_string(),
                ))
            }
        };

        let mut pending = self.hop_on_clause(from, hop, PENDING_ALIAS, folded)?;
        // Rows picked by a node predicate are not the rows of an unfiltered join
        pending.extend(self.node_predicate_fragments(hop, PENDING_ALIAS, distinguishing)?);
        let fingerprint = join_fingerprint(hop.table, pending);
        if let Some(alias) = self.ctx.find_join(&fingerprint) {
            log::debug!("Reusing join {} {} from {}", hop.table, alias, from.alias);
            return Ok(TableRef {
                table: hop.table.to_string(),
                alias: alias.to_string(),
            });
        }

        let alias = self.ctx.next_alias();
        let joining_on = self.hop_on_clause(from, hop, &alias, folded)?;
        log::debug!(
            "Joining {} {} ({:?}) from {}",
            hop.table,
            alias,
            join_type,
            from.alias
        );
        self.ctx.add_join(
            fingerprint,
            Join {
                join_type,
                table_name: hop.table.to_string(),
                table_alias: alias.clone(),
                joining_on,
            },
        );

        Ok(TableRef {
            table: hop.table.to_string(),
            alias,
        })
    }

    fn hop_on_clause(
        &mut self,
        from: &TableRef,
        hop: &Hop<'_>,
        alias: &str,
        folded: &[FoldedPredicate<'_>],
    ) -> Result<Vec<SqlExpr>, QueryBuildError> {
        let mut on = hop_conditions(from, hop, alias);
        on.extend(self.node_predicate_fragments(hop, alias, folded)?);
        Ok(on)
    }

    /// Node predicates compiled against the table joined by `hop`
    fn node_predicate_fragments(
        &mut self,
        hop: &Hop<'_>,
        alias: &str,
        predicates: &[FoldedPredicate<'_>],
    ) -> Result<Vec<SqlExpr>, QueryBuildError> {
        let joined = TableRef {
            table: hop.table.to_string(),
            alias: alias.to_string(),
        };
        let mut fragments = Vec::new();
        for (element, predicate) in predicates {
            let type_id = self.element_type(*element);
            let cursor = Cursor {
                entry_type: type_id,
                type_id,
                table: joined.clone(),
            };
            fragments.extend(self.compile_node_predicate(*element, &cursor, predicate)?);
        }
        Ok(fragments)
    }

    /// Compile a node predicate into fragments, without adding them anywhere
    pub(crate) fn compile_node_predicate(
        &mut self,
        origin: PathElement,
        cursor: &Cursor,
        predicate: &Predicate,
    ) -> Result<Vec<SqlExpr>, QueryBuildError> {
        let scope = PathScope {
            origin,
            cursor: cursor.clone(),
            mode: JoinMode::Forbidden,
        };
        self.ctx.push_frame();
        self.ctx.push_logical(None);
        let result = self.compile_predicate(predicate, false, &scope);
        self.ctx.pop_logical();
        let fragments = self.ctx.pop_frame();
        result.map(|_| fragments)
    }

    fn filter_node_predicate(
        &mut self,
        origin: PathElement,
        cursor: &Cursor,
        predicate: &Predicate,
    ) -> Result<(), QueryBuildError> {
        for fragment in self.compile_node_predicate(origin, cursor, predicate)? {
            self.ctx.add_predicate(fragment);
        }
        Ok(())
    }
}

/// ON conditions of a hop from `from` to the table aliased `alias`
pub(crate) fn hop_conditions(from: &TableRef, hop: &Hop<'_>, alias: &str) -> Vec<SqlExpr> {
    let source = SqlExpr::column(&from.alias, hop.from_column);
    let mut on = match hop.tree_root {
        // All descendants share the root's id; the root row itself is excluded
        Some(root_column) => vec![
            SqlExpr::equals(SqlExpr::column(alias, root_column), source.clone()),
            SqlExpr::apply(
                Operator::NotEqual,
                vec![SqlExpr::column(alias, hop.to_column), source],
            ),
        ],
        None => vec![SqlExpr::equals(SqlExpr::column(alias, hop.to_column), source)],
    };
    on.extend(
        hop.conditions
            .iter()
            .map(|c| SqlExpr::equals(SqlExpr::column(alias, &c.column), condition_value(c))),
    );
    on
}

/// Mapping constants: numbers inline, everything else bound
fn condition_value(condition: &Condition) -> SqlExpr {
    let value = condition.value.as_str();
    match condition.value_type {
        SimpleType::Integer | SimpleType::Double => SqlExpr::raw(value),
        SimpleType::Boolean => SqlExpr::Placeholder(SqlValue::Boolean(matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "1"
        ))),
        SimpleType::Date => match value.parse() {
            Ok(date) => SqlExpr::Placeholder(SqlValue::Date(date)),
            Err(_) => SqlExpr::Placeholder(SqlValue::String(value.to_string())),
        },
        SimpleType::Timestamp => match value.parse() {
            Ok(ts) => SqlExpr::Placeholder(SqlValue::Timestamp(ts)),
            Err(_) => SqlExpr::Placeholder(SqlValue::String(value.to_string())),
        },
        SimpleType::String | SimpleType::Clob => {
            SqlExpr::Placeholder(SqlValue::String(value.to_string()))
        }
    }
}

fn join_fingerprint(table: &str, on: Vec<SqlExpr>) -> String {
    let rendered = SqlExpr::and(on).to_sql();
    format!("{}|{}|{:?}", table, rendered.sql, rendered.parameters)
}
