use serde::{Deserialize, Serialize};

use super::predicate::BinaryComparisonKind;

/// Restricts results to ids relative to a starting id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartIdFilter {
    pub operator: BinaryComparisonKind,
    pub value: i64,
}

/// Row window of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterFilter {
    /// Number of leading rows to skip
    #[serde(default)]
    pub start_index: Option<u64>,
    /// Maximum number of rows returned
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub start_id: Option<StartIdFilter>,
}

impl CounterFilter {
    pub fn window(start_index: u64, count: u64) -> Self {
        CounterFilter {
            start_index: Some(start_index),
            count: Some(count),
            start_id: None,
        }
    }

    /// Whether a row window (offset or limit) is requested
    pub fn has_window(&self) -> bool {
        self.start_index.unwrap_or(0) > 0 || self.count.is_some()
    }
}
