use serde::{Deserialize, Serialize};
use std::fmt;

use super::properties::{Join, PropertyId};

/// Handle of a type in the mapping arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    FeatureType,
    ObjectType,
    ComplexType,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::FeatureType => f.write_str("feature type"),
            TypeKind::ObjectType => f.write_str("object type"),
            TypeKind::ComplexType => f.write_str("complex type"),
        }
    }
}

/// Single-parent inheritance link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub base: TypeId,
    /// Join from the subtype's table to the base type's table, if they differ
    pub join: Option<Join>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedType {
    pub kind: TypeKind,
    /// Registration id; `None` for inline complex types
    pub id: Option<String>,
    pub name: String,
    /// Namespace prefix
    pub prefix: String,
    /// Backing table; inline complex types inherit the enclosing table
    pub table: Option<String>,
    pub object_class_id: Option<i32>,
    pub is_abstract: bool,
    /// Declared inline under a property rather than registered globally
    pub inline: bool,
    pub extension: Option<Extension>,
    /// Declared properties, in declaration order (including injected ones)
    pub properties: Vec<PropertyId>,
}

impl MappedType {
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.prefix, self.name)
    }

    /// Matches `prefix:name`, `name` or the registration id
    pub fn matches_step(&self, step: &str) -> bool {
        if self.id.as_deref() == Some(step) {
            return true;
        }
        match step.split_once(':') {
            Some((prefix, local)) => prefix == self.prefix && local == self.name,
            None => step == self.name,
        }
    }

    pub fn is_feature_type(&self) -> bool {
        self.kind == TypeKind::FeatureType
    }
}

/// Properties injected into an existing type and stored in a side table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInjection {
    pub base: TypeId,
    /// Join from the base type's table to the injection table
    pub join: Join,
    pub properties: Vec<PropertyId>,
}
