use super::{wkt_placeholder, DatabaseSrs, DialectKind, SqlDialect};
use crate::geometry::GeometryObject;
use crate::query::BinarySpatialKind;
use crate::sql_ast::{Operator, SqlExpr};

/// PostgreSQL bind parameters are limited to 32767 per statement
const DEFAULT_MAX_IN_LIST_SIZE: usize = 32767;

#[derive(Debug, Clone)]
pub struct PostgisDialect {
    srs: DatabaseSrs,
    max_in_list_size: usize,
}

impl PostgisDialect {
    pub fn new(srs: DatabaseSrs) -> Self {
        PostgisDialect {
            srs,
            max_in_list_size: DEFAULT_MAX_IN_LIST_SIZE,
        }
    }

    pub fn with_max_in_list_size(mut self, size: usize) -> Self {
        self.max_in_list_size = size;
        self
    }
}

impl SqlDialect for PostgisDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgis
    }

    fn database_srs(&self) -> &DatabaseSrs {
        &self.srs
    }

    fn supports_offset_fetch(&self) -> bool {
        true
    }

    fn max_in_list_size(&self) -> usize {
        self.max_in_list_size
    }

    fn truncate_to_date(&self, expr: SqlExpr) -> SqlExpr {
        SqlExpr::function("date_trunc", vec![SqlExpr::raw("'day'"), expr])
    }

    fn geometry(&self, geometry: &GeometryObject) -> SqlExpr {
        SqlExpr::function(
            "ST_GeomFromText",
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
        let name = match operator {
            BinarySpatialKind::Equals => "ST_Equals",
            BinarySpatialKind::Touches => "ST_Touches",
            BinarySpatialKind::Within => "ST_Within",
            BinarySpatialKind::Overlaps => "ST_Overlaps",
            BinarySpatialKind::Crosses => "ST_Crosses",
            BinarySpatialKind::Contains => "ST_Contains",
            BinarySpatialKind::Disjoint => "ST_Disjoint",
            BinarySpatialKind::Intersects | BinarySpatialKind::Bbox => "ST_Intersects",
        };
        SqlExpr::function(name, vec![column, geometry])
    }

    fn distance_within(&self, column: SqlExpr, geometry: SqlExpr, distance: f64) -> SqlExpr {
        SqlExpr::function(
            "ST_DWithin",
            vec![column, geometry, SqlExpr::raw(distance.to_string())],
        )
    }

    fn bbox_filter(&self, column: SqlExpr, geometry: SqlExpr) -> SqlExpr {
        SqlExpr::apply(Operator::BboxOverlap, vec![column, geometry])
    }
}
