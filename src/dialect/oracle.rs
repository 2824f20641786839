use super::{wkt_placeholder, DatabaseSrs, DialectKind, SqlDialect};
use crate::geometry::GeometryObject;
use crate::query::BinarySpatialKind;
use crate::sql_ast::SqlExpr;

/// ORA-01795: maximum number of expressions in a list is 1000
const DEFAULT_MAX_IN_LIST_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct OracleDialect {
    srs: DatabaseSrs,
    max_in_list_size: usize,
    /// Pre-12c databases without OFFSET/FETCH
    legacy_pagination: bool,
}

impl OracleDialect {
    pub fn new(srs: DatabaseSrs) -> Self {
        OracleDialect {
            srs,
            max_in_list_size: DEFAULT_MAX_IN_LIST_SIZE,
            legacy_pagination: false,
        }
    }

    pub fn with_max_in_list_size(mut self, size: usize) -> Self {
        self.max_in_list_size = size;
        self
    }

    pub fn with_legacy_pagination(mut self, legacy: bool) -> Self {
        self.legacy_pagination = legacy;
        self
    }

    fn is_true(call: SqlExpr) -> SqlExpr {
        SqlExpr::equals(call, SqlExpr::raw("'TRUE'"))
    }
}

impl SqlDialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn database_srs(&self) -> &DatabaseSrs {
        &self.srs
    }

    fn supports_offset_fetch(&self) -> bool {
        !self.legacy_pagination
    }

    fn max_in_list_size(&self) -> usize {
        self.max_in_list_size
    }

    fn truncate_to_date(&self, expr: SqlExpr) -> SqlExpr {
        SqlExpr::function("TRUNC", vec![expr])
    }

    fn geometry(&self, geometry: &GeometryObject) -> SqlExpr {
        SqlExpr::function(
            "SDO_GEOMETRY",
            vec![
                wkt_placeholder(geometry),
                SqlExpr::raw(geometry.srid.to_string()),
            ],
        )
    }

    fn spatial_relation(
        &self,
        operator: BinarySpatialKind,
        column: SqlExpr,
        geometry: SqlExpr,
    ) -> SqlExpr {
        let mask = match operator {
            BinarySpatialKind::Equals => "EQUAL",
            BinarySpatialKind::Touches => "TOUCH",
            BinarySpatialKind::Within => "INSIDE+COVEREDBY",
            BinarySpatialKind::Overlaps => "OVERLAPBDYINTERSECT",
            BinarySpatialKind::Crosses => "OVERLAPBDYDISJOINT",
            BinarySpatialKind::Contains => "CONTAINS+COVERS",
            BinarySpatialKind::Disjoint => "DISJOINT",
            BinarySpatialKind::Intersects | BinarySpatialKind::Bbox => "ANYINTERACT",
        };
        Self::is_true(SqlExpr::function(
            "SDO_RELATE",
            vec![column, geometry, SqlExpr::raw(format!("'mask={}'", mask))],
        ))
    }

    fn distance_within(&self, column: SqlExpr, geometry: SqlExpr, distance: f64) -> SqlExpr {
        Self::is_true(SqlExpr::function(
            "SDO_WITHIN_DISTANCE",
            vec![
                column,
                geometry,
                SqlExpr::raw(format!("'distance={}'", distance)),
            ],
        ))
    }

    fn bbox_filter(&self, column: SqlExpr, geometry: SqlExpr) -> SqlExpr {
        Self::is_true(SqlExpr::function("SDO_FILTER", vec![column, geometry]))
    }

    fn optimizer_hint(&self, row_limit: u64) -> Option<String> {
        Some(format!("/*+ FIRST_ROWS({}) */", row_limit))
    }
}
