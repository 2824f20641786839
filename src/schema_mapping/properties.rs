use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::TypeId;

/// Handle of a property in the mapping arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub(crate) usize);

impl PropertyId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Scalar type of a simple attribute column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleType {
    Boolean,
    Integer,
    Double,
    String,
    Clob,
    Date,
    Timestamp,
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimpleType::Boolean => "boolean",
            SimpleType::Integer => "integer",
            SimpleType::Double => "double",
            SimpleType::String => "string",
            SimpleType::Clob => "clob",
            SimpleType::Date => "date",
            SimpleType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Role of the joined table relative to the table the join starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    /// The joined row is the parent (many-to-one)
    Parent,
    /// The joined rows are children (one-to-many)
    Child,
}

/// Extra equality condition on the joined table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub value: String,
    pub value_type: SimpleType,
}

/// Marks a self-referencing join that reaches all descendants through a root column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeHierarchy {
    pub root_column: String,
}

/// Single foreign key hop: `from_column` on the current table to `to_column` on `table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub from_column: String,
    pub to_column: String,
    pub to_role: TableRole,
    pub conditions: Vec<Condition>,
    pub tree_hierarchy: Option<TreeHierarchy>,
}

/// Many-to-many hop through an association table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinTable {
    pub table: String,
    /// Association table back to the owning table
    pub join: Join,
    /// Association table to the target table
    pub inverse_join: Join,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyJoin {
    Join(Join),
    JoinTable(JoinTable),
}

impl PropertyJoin {
    /// Table holding the property value once the join has been applied
    pub fn target_table(&self) -> &str {
        match self {
            PropertyJoin::Join(join) => &join.table,
            PropertyJoin::JoinTable(join_table) => &join_table.inverse_join.table,
        }
    }
}

/// How a geometry property is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryStorage {
    /// One geometry column on the owner's table
    Inline { column: String },
    /// Rows of a linked geometry table reached through the property's join
    Decomposed { geometry_column: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKind {
    SimpleAttribute {
        column: String,
        value_type: SimpleType,
    },
    ComplexAttribute {
        /// Members, each a `SimpleAttribute` property
        attributes: Vec<PropertyId>,
    },
    ComplexProperty {
        target: TypeId,
        inline: bool,
    },
    ObjectProperty {
        target: TypeId,
        inline: bool,
    },
    FeatureProperty {
        target: TypeId,
        inline: bool,
    },
    GeometryProperty {
        storage: GeometryStorage,
        geometry_type: Option<String>,
    },
    ImplicitGeometryProperty {
        column: String,
        lod: Option<u8>,
    },
}

/// Where a property is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyOwner {
    Type(TypeId),
    /// Member of a complex attribute
    Attribute(PropertyId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedProperty {
    pub name: String,
    /// Namespace prefix
    pub prefix: String,
    pub owner: PropertyOwner,
    pub join: Option<PropertyJoin>,
    /// Index into the mapping's injections when the property was injected
    pub injection: Option<usize>,
    pub queryable: bool,
    pub kind: PropertyKind,
}

impl MappedProperty {
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.prefix, self.name)
    }

    /// Target type of a complex, object or feature property
    pub fn target_type(&self) -> Option<TypeId> {
        match &self.kind {
            PropertyKind::ComplexProperty { target, .. }
            | PropertyKind::ObjectProperty { target, .. }
            | PropertyKind::FeatureProperty { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Whether the property's target type was declared inline
    pub fn has_inline_type(&self) -> bool {
        matches!(
            &self.kind,
            PropertyKind::ComplexProperty { inline: true, .. }
                | PropertyKind::ObjectProperty { inline: true, .. }
                | PropertyKind::FeatureProperty { inline: true, .. }
        )
    }

    pub fn is_geometry(&self) -> bool {
        matches!(
            self.kind,
            PropertyKind::GeometryProperty { .. } | PropertyKind::ImplicitGeometryProperty { .. }
        )
    }

    /// Matches `prefix:name`, `name` and `@name` spellings
    pub fn matches_step(&self, step: &str) -> bool {
        let step = step.trim_start_matches('@');
        match step.split_once(':') {
            Some((prefix, local)) => prefix == self.prefix && local == self.name,
            None => step == self.name,
        }
    }
}
