use serde::{Deserialize, Serialize};

use super::expression::ValueReference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortProperty {
    pub value_reference: ValueReference,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortProperty {
    pub fn ascending(value_reference: ValueReference) -> Self {
        SortProperty {
            value_reference,
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(value_reference: ValueReference) -> Self {
        SortProperty {
            value_reference,
            order: SortOrder::Descending,
        }
    }
}
