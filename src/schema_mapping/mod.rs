pub mod config;
pub mod errors;
mod loader;
pub mod mapping;
pub mod properties;
pub mod schema_path;
pub mod types;

pub use config::SchemaMappingDefinition;
pub use errors::{SchemaMappingError, SchemaPathError};
pub use mapping::{Namespace, SchemaMapping};
pub use properties::{
    Condition, GeometryStorage, Join, JoinTable, MappedProperty, PropertyId, PropertyJoin,
    PropertyKind, PropertyOwner, SimpleType, TableRole, TreeHierarchy,
};
pub use schema_path::{PathElement, PathNode, SchemaPath};
pub use types::{Extension, MappedType, PropertyInjection, TypeId, TypeKind};
