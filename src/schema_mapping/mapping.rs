//! The validated, read-only schema mapping.
//!
//! Types and properties live in two arenas and refer to each other through
//! [`TypeId`] / [`PropertyId`] handles. The model never changes after
//! [`SchemaMapping::load`], so a loaded mapping can be shared across threads
//! (e.g. behind an `Arc`) without locking.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::config::SchemaMappingDefinition;
use super::errors::{SchemaMappingError, SchemaPathError};
use super::loader::MappingLoader;
use super::properties::{MappedProperty, PropertyId, PropertyKind, PropertyOwner};
use super::types::{MappedType, PropertyInjection, TypeId, TypeKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Namespace {
    pub uri: String,
    pub prefix: String,
    /// Id of the schema declaring the namespace
    pub schema: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaMapping {
    pub(crate) namespaces: Vec<Namespace>,
    pub(crate) types: Vec<MappedType>,
    pub(crate) properties: Vec<MappedProperty>,
    pub(crate) injections: Vec<PropertyInjection>,
    /// Registration id -> type
    pub(crate) type_index: HashMap<String, TypeId>,
}

impl SchemaMapping {
    /// Validate a mapping description and build the model.
    ///
    /// All validation problems are collected and returned as one
    /// [`SchemaMappingError::Validation`]; no partially validated model is
    /// ever returned.
    pub fn load(definition: &SchemaMappingDefinition) -> Result<Self, SchemaMappingError> {
        let mapping = MappingLoader::new(definition).load()?;
        log::info!(
            "Loaded schema mapping: {} types, {} properties, {} namespaces, {} injections",
            mapping.types.len(),
            mapping.properties.len(),
            mapping.namespaces.len(),
            mapping.injections.len()
        );
        Ok(mapping)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaMappingError> {
        Self::load(&SchemaMappingDefinition::from_yaml_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaMappingError> {
        Self::load(&SchemaMappingDefinition::from_yaml_file(path)?)
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn get_type(&self, id: TypeId) -> &MappedType {
        &self.types[id.0]
    }

    pub fn get_property(&self, id: PropertyId) -> &MappedProperty {
        &self.properties[id.0]
    }

    pub fn get_injection(&self, index: usize) -> &PropertyInjection {
        &self.injections[index]
    }

    /// Look up a globally registered type by its registration id
    pub fn type_by_id(&self, id: &str) -> Option<TypeId> {
        self.type_index.get(id).copied()
    }

    /// Look up a globally registered type by id or qualified name
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        if let Some(id) = self.type_by_id(name) {
            return Some(id);
        }
        self.types
            .iter()
            .enumerate()
            .find(|(_, t)| !t.inline && t.matches_step(name))
            .map(|(idx, _)| TypeId(idx))
    }

    /// All registered feature types
    pub fn feature_types(&self) -> Vec<TypeId> {
        self.type_ids()
            .filter(|id| self.get_type(*id).kind == TypeKind::FeatureType)
            .collect()
    }

    fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(TypeId)
    }

    /// The type followed by its ancestors, nearest first
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(ext) = &self.get_type(current).extension {
            // Chains are acyclic after loading; the guard keeps a hand-built model finite.
            if chain.contains(&ext.base) {
                break;
            }
            chain.push(ext.base);
            current = ext.base;
        }
        chain
    }

    /// Strict subtype test along the extension chain
    pub fn is_sub_type_of(&self, id: TypeId, base: TypeId) -> bool {
        id != base && self.ancestors(id).contains(&base)
    }

    pub fn is_equal_or_sub_type_of(&self, id: TypeId, base: TypeId) -> bool {
        id == base || self.is_sub_type_of(id, base)
    }

    /// Lowest type that is an ancestor (or equal) of every given type
    pub fn common_super_type(&self, types: &[TypeId]) -> Result<TypeId, SchemaMappingError> {
        let Some((first, rest)) = types.split_first() else {
            return Err(SchemaMappingError::NoCommonSuperType { types: vec![] });
        };

        let other_chains: Vec<HashSet<TypeId>> = rest
            .iter()
            .map(|t| self.ancestors(*t).into_iter().collect())
            .collect();

        self.ancestors(*first)
            .into_iter()
            .find(|candidate| other_chains.iter().all(|chain| chain.contains(candidate)))
            .ok_or_else(|| SchemaMappingError::NoCommonSuperType {
                types: types
                    .iter()
                    .map(|t| self.get_type(*t).qualified_name())
                    .collect(),
            })
    }

    /// All direct and transitive subtypes of a type (not including the type itself)
    pub fn list_sub_types(&self, id: TypeId, skip_abstract: bool) -> Vec<TypeId> {
        self.type_ids()
            .filter(|candidate| self.is_sub_type_of(*candidate, id))
            .filter(|candidate| !skip_abstract || !self.get_type(*candidate).is_abstract)
            .collect()
    }

    /// Properties of a type, own declarations first, then those of its ancestors
    pub fn list_properties(
        &self,
        id: TypeId,
        only_queryable: bool,
        include_inherited: bool,
    ) -> Vec<PropertyId> {
        let chain = if include_inherited {
            self.ancestors(id)
        } else {
            vec![id]
        };

        chain
            .into_iter()
            .flat_map(|t| self.get_type(t).properties.iter().copied())
            .filter(|p| !only_queryable || self.get_property(*p).queryable)
            .collect()
    }

    /// Members of a complex attribute
    pub fn list_attributes(&self, property: PropertyId) -> &[PropertyId] {
        match &self.get_property(property).kind {
            PropertyKind::ComplexAttribute { attributes } => attributes,
            _ => &[],
        }
    }

    /// Resolve a path step against the properties of a type (inherited included)
    pub fn find_property(
        &self,
        id: TypeId,
        step: &str,
    ) -> Result<Option<PropertyId>, SchemaPathError> {
        let matches: Vec<PropertyId> = self
            .list_properties(id, false, true)
            .into_iter()
            .filter(|p| self.get_property(*p).matches_step(step))
            .collect();
        self.single_match(step, matches)
    }

    /// Resolve a path step against the members of a complex attribute
    pub fn find_attribute(
        &self,
        property: PropertyId,
        step: &str,
    ) -> Result<Option<PropertyId>, SchemaPathError> {
        let matches: Vec<PropertyId> = self
            .list_attributes(property)
            .iter()
            .copied()
            .filter(|p| self.get_property(*p).matches_step(step))
            .collect();
        self.single_match(step, matches)
    }

    fn single_match(
        &self,
        step: &str,
        matches: Vec<PropertyId>,
    ) -> Result<Option<PropertyId>, SchemaPathError> {
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches[0])),
            _ => Err(SchemaPathError::Ambiguous {
                step: step.to_string(),
                candidates: matches
                    .iter()
                    .map(|p| self.get_property(*p).qualified_name())
                    .collect(),
            }),
        }
    }

    /// Member used as the value of a complex attribute: `value`, or the only member
    pub fn value_attribute(&self, property: PropertyId) -> Option<PropertyId> {
        let attributes = self.list_attributes(property);
        attributes
            .iter()
            .copied()
            .find(|a| self.get_property(*a).name == "value")
            .or_else(|| (attributes.len() == 1).then(|| attributes[0]))
    }

    /// Type declaring a property; members of complex attributes report the
    /// type declaring the complex attribute
    pub fn declaring_type(&self, property: PropertyId) -> TypeId {
        match self.get_property(property).owner {
            PropertyOwner::Type(t) => t,
            PropertyOwner::Attribute(parent) => self.declaring_type(parent),
        }
    }

    /// Backing table of a type, falling back to the nearest ancestor with a table
    pub fn table_of(&self, id: TypeId) -> Option<&str> {
        self.ancestors(id)
            .into_iter()
            .find_map(|t| self.get_type(t).table.as_deref())
    }

    /// Object class ids of a type and its subtypes, skipping abstract types
    pub fn object_class_ids(&self, id: TypeId) -> Vec<i32> {
        let mut ids: Vec<i32> = std::iter::once(id)
            .chain(self.list_sub_types(id, true))
            .filter(|t| !self.get_type(*t).is_abstract)
            .filter_map(|t| self.get_type(t).object_class_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
