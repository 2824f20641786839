//! Resolved navigation from a root type down to one target property.
//!
//! A [`SchemaPath`] is a sequence of arena handles. Consecutive nodes are
//! always parent and child in the mapping graph:
//!
//! - `Type -> Property`: a property declared on the type, an ancestor or an
//!   injection into one of them
//! - `Type -> Type`: a cast to the type itself or one of its subtypes
//! - `Property -> Type`: the target type of a type-valued property (inserted
//!   implicitly when a value reference skips it)
//! - `Property -> Property`: a member of a complex attribute

use super::errors::SchemaPathError;
use super::mapping::SchemaMapping;
use super::properties::{PropertyId, PropertyKind};
use super::types::TypeId;
use crate::query::{PathStep, Predicate, ValueReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathElement {
    Type(TypeId),
    Property(PropertyId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub element: PathElement,
    /// Node predicate restricting the values at this step
    pub predicate: Option<Predicate>,
}

impl PathNode {
    fn new(element: PathElement) -> Self {
        PathNode {
            element,
            predicate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaPath {
    nodes: Vec<PathNode>,
}

impl SchemaPath {
    /// Path consisting of the root type only
    pub fn root(root: TypeId) -> Self {
        SchemaPath {
            nodes: vec![PathNode::new(PathElement::Type(root))],
        }
    }

    /// Resolve a value reference starting at the query's root type
    pub fn resolve(
        mapping: &SchemaMapping,
        root: TypeId,
        reference: &ValueReference,
    ) -> Result<Self, SchemaPathError> {
        Self::resolve_from(mapping, PathElement::Type(root), reference)
    }

    /// Resolve a value reference relative to an arbitrary node
    ///
    /// Used for node predicates, whose operands are relative to the step
    /// that carries them.
    pub fn resolve_from(
        mapping: &SchemaMapping,
        origin: PathElement,
        reference: &ValueReference,
    ) -> Result<Self, SchemaPathError> {
        if reference.steps.is_empty() {
            return Err(SchemaPathError::EmptyPath);
        }
        let mut path = SchemaPath {
            nodes: vec![PathNode::new(origin)],
        };
        for step in &reference.steps {
            path.push_step(mapping, step)?;
        }
        log::debug!(
            "Resolved `{}` to {}",
            reference,
            path.display(mapping)
        );
        Ok(path)
    }

    fn push_step(&mut self, mapping: &SchemaMapping, step: &PathStep) -> Result<(), SchemaPathError> {
        let predicate = step.predicate.as_deref().cloned();
        let cursor = self.last().element;

        match cursor {
            PathElement::Type(type_id) => {
                if let Some(property) = mapping.find_property(type_id, &step.name)? {
                    self.push_property(mapping, property, predicate)
                } else {
                    self.push_cast(mapping, type_id, &step.name, predicate)
                }
            }
            PathElement::Property(property_id) => {
                let property = mapping.get_property(property_id);
                match &property.kind {
                    PropertyKind::ComplexAttribute { .. } => {
                        match mapping.find_attribute(property_id, &step.name)? {
                            Some(member) => self.push_property(mapping, member, predicate),
                            None => Err(SchemaPathError::UnknownProperty {
                                step: step.name.clone(),
                                parent: property.qualified_name(),
                            }),
                        }
                    }
                    PropertyKind::ComplexProperty { target, .. }
                    | PropertyKind::ObjectProperty { target, .. }
                    | PropertyKind::FeatureProperty { target, .. } => {
                        let target = *target;
                        if let Some(member) = mapping.find_property(target, &step.name)? {
                            self.nodes.push(PathNode::new(PathElement::Type(target)));
                            self.push_property(mapping, member, predicate)
                        } else {
                            self.nodes.push(PathNode::new(PathElement::Type(target)));
                            self.push_cast(mapping, target, &step.name, predicate)
                        }
                    }
                    PropertyKind::SimpleAttribute { .. }
                    | PropertyKind::GeometryProperty { .. }
                    | PropertyKind::ImplicitGeometryProperty { .. } => {
                        Err(SchemaPathError::LeafProperty {
                            property: property.qualified_name(),
                            step: step.name.clone(),
                        })
                    }
                }
            }
        }
    }

    fn push_property(
        &mut self,
        mapping: &SchemaMapping,
        property: PropertyId,
        predicate: Option<Predicate>,
    ) -> Result<(), SchemaPathError> {
        let mapped = mapping.get_property(property);
        if !mapped.queryable {
            return Err(SchemaPathError::NotQueryable {
                property: mapped.qualified_name(),
            });
        }
        self.nodes.push(PathNode {
            element: PathElement::Property(property),
            predicate,
        });
        Ok(())
    }

    /// Step naming a type: the current type itself or one of its subtypes
    fn push_cast(
        &mut self,
        mapping: &SchemaMapping,
        current: TypeId,
        step: &str,
        predicate: Option<Predicate>,
    ) -> Result<(), SchemaPathError> {
        let current_type = mapping.get_type(current);
        let cast = if current_type.matches_step(step) {
            Some(current)
        } else {
            mapping.find_type(step)
        };

        match cast {
            Some(t) if t == current => {
                let node = self.last_mut();
                node.predicate = match (node.predicate.take(), predicate) {
                    (Some(a), Some(b)) => Some(Predicate::And(vec![a, b])),
                    (a, b) => a.or(b),
                };
                Ok(())
            }
            Some(t) if mapping.is_sub_type_of(t, current) => {
                self.nodes.push(PathNode {
                    element: PathElement::Type(t),
                    predicate,
                });
                Ok(())
            }
            Some(_) => Err(SchemaPathError::InvalidTypeStep {
                step: step.to_string(),
                parent: current_type.qualified_name(),
            }),
            None => Err(SchemaPathError::UnknownProperty {
                step: step.to_string(),
                parent: current_type.qualified_name(),
            }),
        }
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> &PathNode {
        &self.nodes[0]
    }

    pub fn last(&self) -> &PathNode {
        &self.nodes[self.nodes.len() - 1]
    }

    fn last_mut(&mut self) -> &mut PathNode {
        let idx = self.nodes.len() - 1;
        &mut self.nodes[idx]
    }

    /// Property the path ends at, if it ends at a property
    pub fn target_property(&self) -> Option<PropertyId> {
        match self.last().element {
            PathElement::Property(p) => Some(p),
            PathElement::Type(_) => None,
        }
    }

    /// Copy of the first `len` nodes
    pub fn prefix(&self, len: usize) -> SchemaPath {
        SchemaPath {
            nodes: self.nodes[..len.clamp(1, self.nodes.len())].to_vec(),
        }
    }

    /// Copy without the trailing node; `None` for a single-node path
    pub fn parent(&self) -> Option<SchemaPath> {
        (self.nodes.len() > 1).then(|| self.prefix(self.nodes.len() - 1))
    }

    /// Extend a copy with one element
    pub fn child(&self, element: PathElement) -> SchemaPath {
        let mut nodes = self.nodes.clone();
        nodes.push(PathNode::new(element));
        SchemaPath { nodes }
    }

    /// Copy with all node predicates removed
    pub fn without_predicates(&self) -> SchemaPath {
        SchemaPath {
            nodes: self
                .nodes
                .iter()
                .map(|n| PathNode::new(n.element))
                .collect(),
        }
    }

    pub fn has_predicates(&self) -> bool {
        self.nodes.iter().any(|n| n.predicate.is_some())
    }

    /// Human readable form, e.g. `bldg:Building/bldg:address/core:Address`
    pub fn display(&self, mapping: &SchemaMapping) -> String {
        self.nodes
            .iter()
            .map(|n| {
                let name = match n.element {
                    PathElement::Type(t) => mapping.get_type(t).qualified_name(),
                    PathElement::Property(p) => mapping.get_property(p).qualified_name(),
                };
                if n.predicate.is_some() {
                    format!("{}[...]", name)
                } else {
                    name
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
