//! Database dialect adapters.
//!
//! Everything database specific that the query builder needs goes through
//! [`SqlDialect`]: spatial function names, pagination support, IN-list
//! limits, date truncation and optimizer hints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::geometry::{GeometryObject, LengthUnit};
use crate::query::BinarySpatialKind;
use crate::sql_ast::{SqlExpr, SqlValue};

pub mod oracle;
pub mod postgis;

pub use oracle::OracleDialect;
pub use postgis::PostgisDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Postgis,
    Oracle,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Unknown dialect '{0}' (expected 'postgis' or 'oracle')")]
pub struct UnknownDialectError(pub String);

impl FromStr for DialectKind {
    type Err = UnknownDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgis" | "postgresql" | "postgres" => Ok(DialectKind::Postgis),
            "oracle" => Ok(DialectKind::Oracle),
            _ => Err(UnknownDialectError(s.to_string())),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectKind::Postgis => f.write_str("postgis"),
            DialectKind::Oracle => f.write_str("oracle"),
        }
    }
}

/// Spatial reference system of the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSrs {
    pub srid: i32,
    pub srs_name: String,
    /// Linear (or angular) unit of the SRS axes
    pub unit: LengthUnit,
}

pub trait SqlDialect: fmt::Debug + Send + Sync {
    fn kind(&self) -> DialectKind;

    fn database_srs(&self) -> &DatabaseSrs;

    /// Whether `OFFSET n ROWS FETCH FIRST m ROWS ONLY` can be used
    fn supports_offset_fetch(&self) -> bool;

    fn max_in_list_size(&self) -> usize;

    fn upper(&self, expr: SqlExpr) -> SqlExpr {
        SqlExpr::function("UPPER", vec![expr])
    }

    /// Truncate a timestamp expression to its date
    fn truncate_to_date(&self, expr: SqlExpr) -> SqlExpr;

    /// Geometry constructor binding the literal as a parameter
    fn geometry(&self, geometry: &GeometryObject) -> SqlExpr;

    /// Exact spatial relation test; `Bbox` and `Disjoint` are not passed here
    fn spatial_relation(
        &self,
        operator: BinarySpatialKind,
        column: SqlExpr,
        geometry: SqlExpr,
    ) -> SqlExpr;

    /// `distance(column, geometry) <= distance`, in SRS units
    fn distance_within(&self, column: SqlExpr, geometry: SqlExpr, distance: f64) -> SqlExpr;

    /// Cheap bounding box overlap test
    fn bbox_filter(&self, column: SqlExpr, geometry: SqlExpr) -> SqlExpr;

    /// Hint telling the optimizer how many rows will be fetched
    fn optimizer_hint(&self, _row_limit: u64) -> Option<String> {
        None
    }
}

pub(crate) fn wkt_placeholder(geometry: &GeometryObject) -> SqlExpr {
    SqlExpr::Placeholder(SqlValue::Geometry(geometry.to_wkt()))
}

/// Build the dialect adapter selected by the configuration
pub fn create_dialect(
    kind: DialectKind,
    srs: DatabaseSrs,
    max_in_list_size: Option<usize>,
    legacy_pagination: bool,
) -> Arc<dyn SqlDialect> {
    match kind {
        DialectKind::Postgis => {
            let mut dialect = PostgisDialect::new(srs);
            if let Some(size) = max_in_list_size {
                dialect = dialect.with_max_in_list_size(size);
            }
            Arc::new(dialect)
        }
        DialectKind::Oracle => {
            let mut dialect = OracleDialect::new(srs).with_legacy_pagination(legacy_pagination);
            if let Some(size) = max_in_list_size {
                dialect = dialect.with_max_in_list_size(size);
            }
            Arc::new(dialect)
        }
    }
}
