/// Schema mapping description.
///
/// This module holds the declarative form of a schema mapping as it is read
/// from YAML. Nothing here is validated; [`SchemaMapping::load`] turns a
/// description into the validated, read-only model.
///
/// Mappings are defined in YAML with the following structure:
///
/// ```yaml
/// schemas:
///   - id: bldg
///     namespaces:
///       - uri: http://www.opengis.net/citygml/building/2.0
///         prefix: bldg
/// feature_types:
///   - id: BuildingType
///     name: Building
///     schema: bldg
///     table: building
///     object_class_id: 26
///     extension:
///       base: AbstractBuildingType
///       join: { table: cityobject, from_column: id, to_column: id, to_role: parent }
///     properties:
///       - kind: simple_attribute
///         name: function
///         column: function
///         type: string
/// ```
///
/// [`SchemaMapping::load`]: super::mapping::SchemaMapping::load
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::errors::SchemaMappingError;
use super::properties::{SimpleType, TableRole};

/// Top-level mapping description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaMappingDefinition {
    /// Namespace-bearing schemas referenced by types and properties
    #[serde(default)]
    pub schemas: Vec<SchemaDefinition>,
    #[serde(default)]
    pub complex_types: Vec<TypeDefinition>,
    #[serde(default)]
    pub object_types: Vec<TypeDefinition>,
    #[serde(default)]
    pub feature_types: Vec<TypeDefinition>,
    /// Properties added to existing types and stored in side tables
    #[serde(default)]
    pub property_injections: Vec<PropertyInjectionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub id: String,
    #[serde(default)]
    pub namespaces: Vec<NamespaceDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    pub uri: String,
    /// Optional: generated as `ns1`, `ns2`, ... when omitted
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Type definition shared by feature, object and complex types.
///
/// Inline complex types (declared under a property) use the same shape but
/// must not carry `id`, `table` or `object_class_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Schema id; inline types default to the schema of their enclosing type
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub object_class_id: Option<i32>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub extension: Option<ExtensionDefinition>,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionDefinition {
    /// Id of the base type
    pub base: String,
    /// Join from this type's table to the base type's table, when they differ
    #[serde(default)]
    pub join: Option<JoinDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDefinition {
    pub table: String,
    pub from_column: String,
    pub to_column: String,
    pub to_role: TableRole,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    #[serde(default)]
    pub tree_hierarchy: Option<TreeHierarchyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub column: String,
    pub value: String,
    #[serde(rename = "type", default = "default_condition_type")]
    pub value_type: SimpleType,
}

fn default_condition_type() -> SimpleType {
    SimpleType::String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeHierarchyDefinition {
    pub root_column: String,
}

/// Many-to-many association through an intermediate table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinTableDefinition {
    pub table: String,
    /// Join from the association table back to the owning table
    #[serde(default)]
    pub join: Option<JoinDefinition>,
    /// Join from the association table to the target table
    #[serde(default)]
    pub inverse_join: Option<JoinDefinition>,
}

/// Fields common to every property kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyHeader {
    pub name: String,
    /// Namespace prefix or schema id; defaults to the owner's schema
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub join: Option<JoinDefinition>,
    #[serde(default)]
    pub join_table: Option<JoinTableDefinition>,
    #[serde(default = "default_queryable")]
    pub queryable: bool,
}

fn default_queryable() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyDefinition {
    SimpleAttribute {
        #[serde(flatten)]
        header: PropertyHeader,
        column: String,
        #[serde(rename = "type")]
        value_type: SimpleType,
    },
    ComplexAttribute {
        #[serde(flatten)]
        header: PropertyHeader,
        attributes: Vec<AttributeDefinition>,
    },
    ComplexProperty {
        #[serde(flatten)]
        header: PropertyHeader,
        #[serde(flatten)]
        target: TypeTargetDefinition,
    },
    ObjectProperty {
        #[serde(flatten)]
        header: PropertyHeader,
        #[serde(flatten)]
        target: TypeTargetDefinition,
    },
    FeatureProperty {
        #[serde(flatten)]
        header: PropertyHeader,
        #[serde(flatten)]
        target: TypeTargetDefinition,
    },
    GeometryProperty {
        #[serde(flatten)]
        header: PropertyHeader,
        /// Inline geometry column on the owner's table
        #[serde(default)]
        column: Option<String>,
        /// Geometry column of the decomposed geometry table reached by `join`
        #[serde(default)]
        geometry_column: Option<String>,
        #[serde(default)]
        geometry_type: Option<String>,
    },
    ImplicitGeometryProperty {
        #[serde(flatten)]
        header: PropertyHeader,
        column: String,
        #[serde(default)]
        lod: Option<u8>,
    },
}

impl PropertyDefinition {
    pub fn header(&self) -> &PropertyHeader {
        match self {
            PropertyDefinition::SimpleAttribute { header, .. }
            | PropertyDefinition::ComplexAttribute { header, .. }
            | PropertyDefinition::ComplexProperty { header, .. }
            | PropertyDefinition::ObjectProperty { header, .. }
            | PropertyDefinition::FeatureProperty { header, .. }
            | PropertyDefinition::GeometryProperty { header, .. }
            | PropertyDefinition::ImplicitGeometryProperty { header, .. } => header,
        }
    }
}

/// Member of a complex attribute (e.g. `value` and `uom` of a measure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub column: String,
    #[serde(rename = "type")]
    pub value_type: SimpleType,
}

/// Target type of a type-valued property: a reference XOR an inline declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeTargetDefinition {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default, rename = "type")]
    pub inline_type: Option<Box<TypeDefinition>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyInjectionDefinition {
    /// Id of the type receiving the properties
    pub base: String,
    /// Join from the base table to the injection table
    pub join: JoinDefinition,
    pub properties: Vec<PropertyDefinition>,
}

impl SchemaMappingDefinition {
    /// Parse a mapping description from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaMappingError> {
        serde_yaml::from_str(yaml).map_err(|e| SchemaMappingError::ParseError {
            error: e.to_string(),
        })
    }

    /// Read and parse a mapping description from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaMappingError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SchemaMappingError::ReadError {
            error: format!("{}: {}", path.display(), e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            SchemaMappingError::parse_error_with_context(
                e.to_string(),
                format!("While loading mapping file {}", path.display()),
            )
        })
    }
}
