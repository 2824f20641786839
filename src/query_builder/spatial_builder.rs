//! Binary spatial and distance operators.
//!
//! Inline geometry columns are tested directly. Decomposed geometries (one
//! row per surface in a linked table) get a bounding box pre-filter on the
//! envelope of the feature plus a correlated EXISTS running the exact test
//! on the linked rows.

use crate::geometry::{GeometryObject, LengthUnit};
use crate::query::{BinarySpatialKind, DistanceKind, SpatialOperator, ValueReference};
use crate::schema_mapping::{
    GeometryStorage, PathElement, PropertyId, PropertyKind, SchemaPath,
};
use crate::sql_ast::SqlExpr;

use super::errors::QueryBuildError;
use super::schema_path_builder::{Cursor, NodePredicates, PathScope};
use super::QueryCompiler;

/// Exact test applied to a geometry column
#[derive(Debug, Clone, Copy, PartialEq)]
enum SpatialTest {
    Relation(BinarySpatialKind),
    /// Distance in database SRS units
    Within(f64),
}

impl SpatialTest {
    fn name(&self) -> String {
        match self {
            SpatialTest::Relation(kind) => kind.to_string(),
            SpatialTest::Within(_) => DistanceKind::DWithin.to_string(),
        }
    }
}

impl QueryCompiler<'_> {
    pub(crate) fn build_spatial(
        &mut self,
        op: &SpatialOperator,
        negate: bool,
        scope: &PathScope,
    ) -> Result<(), QueryBuildError> {
        let srs = self.dialect.database_srs().clone();

        // Negative operators are compiled as the negated positive one
        let (test, negate) = match op {
            SpatialOperator::Binary(binary) => match binary.operator {
                BinarySpatialKind::Disjoint => {
                    (SpatialTest::Relation(BinarySpatialKind::Intersects), !negate)
                }
                kind => (SpatialTest::Relation(kind), negate),
            },
            SpatialOperator::Distance(distance) => {
                let unit = match &distance.unit {
                    Some(unit) => LengthUnit::parse(unit)?,
                    None => srs.unit,
                };
                let value = unit.convert(distance.distance, srs.unit)?;
                if value < 0.0 {
                    return Err(QueryBuildError::invalid_operands(
                        distance.operator.to_string(),
                        "distance must not be negative",
                    ));
                }
                match distance.operator {
                    DistanceKind::DWithin => (SpatialTest::Within(value), negate),
                    DistanceKind::Beyond => (SpatialTest::Within(value), !negate),
                }
            }
        };

        let reference = match op.operand() {
            Some(reference) => reference.clone(),
            None => self.config.envelope_property.parse::<ValueReference>()?,
        };
        let path = self.resolve_path(scope, &reference)?;
        let property = path
            .target_property()
            .filter(|p| self.mapping.get_property(*p).is_geometry())
            .ok_or_else(|| QueryBuildError::NotAGeometry(path.display(self.mapping)))?;

        let geometry = self.transformer.transform(op.geometry(), srs.srid)?;
        log::debug!(
            "{} on {} with a geometry in EPSG:{}",
            test.name(),
            path.display(self.mapping),
            srs.srid
        );

        let fragments = match &self.mapping.get_property(property).kind {
            PropertyKind::GeometryProperty {
                storage: GeometryStorage::Inline { column },
                ..
            }
            | PropertyKind::ImplicitGeometryProperty { column, .. } => {
                let cursor = self.walk_path(&path, scope, NodePredicates::Filter)?;
                let column = SqlExpr::column(&cursor.table.alias, column);
                vec![self.spatial_test(test, column, &geometry)]
            }
            PropertyKind::GeometryProperty {
                storage: GeometryStorage::Decomposed { geometry_column },
                ..
            } => self.decomposed_spatial(&path, property, geometry_column, test, &geometry, scope)?,
            _ => return Err(QueryBuildError::NotAGeometry(path.display(self.mapping))),
        };

        if negate {
            self.ctx
                .add_predicate(SqlExpr::negated(SqlExpr::and(fragments)));
        } else {
            self.emit(fragments, crate::query::LogicalKind::And);
        }
        Ok(())
    }

    fn spatial_test(&self, test: SpatialTest, column: SqlExpr, geometry: &GeometryObject) -> SqlExpr {
        let geometry = self.dialect.geometry(geometry);
        match test {
            SpatialTest::Relation(BinarySpatialKind::Bbox) => {
                self.dialect.bbox_filter(column, geometry)
            }
            SpatialTest::Relation(kind) => self.dialect.spatial_relation(kind, column, geometry),
            SpatialTest::Within(distance) => {
                self.dialect.distance_within(column, geometry, distance)
            }
        }
    }

    fn decomposed_spatial(
        &mut self,
        path: &SchemaPath,
        property: PropertyId,
        geometry_column: &str,
        test: SpatialTest,
        geometry: &GeometryObject,
        scope: &PathScope,
    ) -> Result<Vec<SqlExpr>, QueryBuildError> {
        if let SpatialTest::Relation(kind @ (BinarySpatialKind::Contains | BinarySpatialKind::Equals)) =
            test
        {
            // Single surfaces cannot contain or equal the query geometry on behalf of the whole
            return Err(QueryBuildError::UnsupportedSpatialOperator {
                operator: kind.to_string(),
                property: path.display(self.mapping),
                reason: "the geometry is decomposed into several rows".to_string(),
            });
        }

        let parent = path
            .parent()
            .ok_or_else(|| QueryBuildError::NotAGeometry(path.display(self.mapping)))?;
        let cursor = self.walk_path(&parent, scope, NodePredicates::Filter)?;

        let mut fragments = Vec::new();
        if let Some(envelope_column) = self.envelope_column(&cursor, scope)? {
            let mut envelope = geometry.envelope()?;
            if let SpatialTest::Within(distance) = test {
                envelope = envelope.expand(distance);
            }
            let envelope = GeometryObject::envelope_of(envelope, geometry.srid);
            let prefilter = self
                .dialect
                .bbox_filter(envelope_column, self.dialect.geometry(&envelope));
            fragments.push(prefilter);
        } else {
            log::warn!(
                "No envelope column for {}, skipping the bounding box pre-filter",
                path.display(self.mapping)
            );
        }

        let mapping = self.mapping;
        let declaring = mapping.declaring_type(property);
        let cursor = self.enter_type_table(cursor, declaring, scope.mode)?;
        let exists = self.correlated_exists(property, &cursor, |this, joined| {
            let column = SqlExpr::column(&joined.alias, geometry_column);
            Ok(vec![this.spatial_test(test, column, geometry)])
        })?;
        fragments.push(exists);
        Ok(fragments)
    }

    /// Inline envelope column of the type at `cursor`, joined if needed
    fn envelope_column(
        &mut self,
        cursor: &Cursor,
        scope: &PathScope,
    ) -> Result<Option<SqlExpr>, QueryBuildError> {
        let reference: ValueReference = self.config.envelope_property.parse()?;
        let origin = PathElement::Type(cursor.type_id);
        let Ok(path) = SchemaPath::resolve_from(self.mapping, origin, &reference) else {
            return Ok(None);
        };
        let Some(property) = path.target_property() else {
            return Ok(None);
        };
        let column = match &self.mapping.get_property(property).kind {
            PropertyKind::GeometryProperty {
                storage: GeometryStorage::Inline { column },
                ..
            } => column.clone(),
            _ => return Ok(None),
        };

        let envelope_scope = PathScope {
            origin,
            cursor: cursor.clone(),
            mode: scope.mode,
        };
        let cursor = self.walk_path(&path, &envelope_scope, NodePredicates::Filter)?;
        Ok(Some(SqlExpr::column(&cursor.table.alias, &column)))
    }
}
