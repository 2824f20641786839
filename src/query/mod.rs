//! Abstract, database-agnostic query model.
//!
//! A [`Query`] is what the compiler consumes: a feature type filter, an
//! optional selection predicate, sort keys and a row window. It is usually
//! produced by a configuration collaborator, but it can also be read from
//! YAML:
//!
//! ```yaml
//! feature_types: ["bldg:Building"]
//! selection:
//!   comparison:
//!     binary:
//!       operator: equal_to
//!       left: { value_reference: "bldg:function" }
//!       right: { literal: { type: string, value: "1000" } }
//! sorting:
//!   - value_reference: "gml:name"
//! counter: { start_index: 0, count: 100 }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub mod counter;
pub mod expression;
pub mod predicate;
pub mod sorting;

pub use counter::{CounterFilter, StartIdFilter};
pub use expression::{Expression, Literal, PathStep, ValueReference};
pub use predicate::{
    BetweenComparison, BinaryComparison, BinaryComparisonKind, BinarySpatial, BinarySpatialKind,
    ComparisonOperator, DistanceKind, DistanceSpatial, IdOperator, LikeComparison, LogicalKind,
    NullComparison, Predicate, SelectOperator, SpatialOperator,
};
pub use sorting::{SortOrder, SortProperty};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryReadError {
    #[error("Failed to read query file: {0}")]
    Io(String),
    #[error("Failed to parse query: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Feature type names (`prefix:Name`) or registration ids
    pub feature_types: Vec<String>,
    #[serde(default)]
    pub selection: Option<Predicate>,
    #[serde(default)]
    pub sorting: Vec<SortProperty>,
    #[serde(default)]
    pub counter: Option<CounterFilter>,
}

impl Query {
    pub fn new<S: Into<String>>(feature_types: impl IntoIterator<Item = S>) -> Self {
        Query {
            feature_types: feature_types.into_iter().map(Into::into).collect(),
            selection: None,
            sorting: Vec::new(),
            counter: None,
        }
    }

    pub fn with_selection(mut self, predicate: Predicate) -> Self {
        self.selection = Some(predicate);
        self
    }

    pub fn with_sorting(mut self, sorting: Vec<SortProperty>) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn with_counter(mut self, counter: CounterFilter) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, QueryReadError> {
        serde_yaml::from_str(yaml).map_err(|e| QueryReadError::Parse(e.to_string()))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, QueryReadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| QueryReadError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }
}
