//! The structural model of a code base.
//!
//! A [`StructuralModel`] is the language-independent description of source
//! entities ([`Component`]s) and their [`Relation`]s produced by an external
//! extractor. The pipeline only ever reads it.
//!
//! # Invariants
//!
//! - Component ids are unique. [`StructuralModel::new`] and deserialization
//!   reject duplicates with [`ModelError::DuplicateId`].
//! - Relation targets are *not* checked here. A relation pointing at an
//!   unknown id is a model defect that the planner drops.
//!
//! # Example
//!
//! ```
//! use cartograph_core::model::{
//!     Component, ComponentKind, MemberKind, RelationKind, StructuralModel,
//! };
//!
//! let model = StructuralModel::new(vec![
//!     Component::new("base", ComponentKind::Class, "Shape")
//!         .with_member("area", MemberKind::Method),
//!     Component::new("circle", ComponentKind::Class, "Circle")
//!         .with_relation("base", RelationKind::Inherits),
//! ])
//! .unwrap();
//!
//! assert_eq!(model.len(), 2);
//! assert_eq!(model.relation_count(), 1);
//! ```

use std::{borrow::Borrow, collections::HashMap, fmt};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling a [`StructuralModel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("component id `{0}` is declared more than once")]
    DuplicateId(ComponentId),
}

/// Unique identifier of a component inside one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of source entity a component stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Class,
    Function,
    Module,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Class => write!(f, "class"),
            ComponentKind::Function => write!(f, "function"),
            ComponentKind::Module => write!(f, "module"),
        }
    }
}

/// The kind of a component member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Field,
}

/// A named member (method or field) of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    name: String,
    kind: MemberKind,
}

impl Member {
    pub fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }
}

/// The kind of a directed relation between two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Inherits,
    Depends,
    Associates,
}

impl RelationKind {
    /// All relation kinds in their canonical order.
    pub const ALL: [RelationKind; 3] = [
        RelationKind::Inherits,
        RelationKind::Depends,
        RelationKind::Associates,
    ];
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Inherits => write!(f, "inherits"),
            RelationKind::Depends => write!(f, "depends"),
            RelationKind::Associates => write!(f, "associates"),
        }
    }
}

/// An outgoing relation from the owning component to `target_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    target_id: ComponentId,
    kind: RelationKind,
}

impl Relation {
    pub fn new(target_id: impl Into<ComponentId>, kind: RelationKind) -> Self {
        Self {
            target_id: target_id.into(),
            kind,
        }
    }

    pub fn target_id(&self) -> &ComponentId {
        &self.target_id
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }
}

/// A source entity with its members and outgoing relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    id: ComponentId,
    kind: ComponentKind,
    name: String,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    relations: Vec<Relation>,
}

impl Component {
    /// Creates a component without members or relations.
    pub fn new(id: impl Into<ComponentId>, kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            members: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Returns the component with an additional member.
    pub fn with_member(mut self, name: impl Into<String>, kind: MemberKind) -> Self {
        self.members.push(Member::new(name, kind));
        self
    }

    /// Returns the component with an additional outgoing relation.
    pub fn with_relation(mut self, target_id: impl Into<ComponentId>, kind: RelationKind) -> Self {
        self.relations.push(Relation::new(target_id, kind));
        self
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Number of members that are methods.
    pub fn method_count(&self) -> usize {
        self.members
            .iter()
            .filter(|member| member.kind() == MemberKind::Method)
            .count()
    }
}

/// Wire shape of a model document, validated into a [`StructuralModel`].
#[derive(Deserialize)]
struct ModelDocument {
    #[serde(default)]
    components: Vec<Component>,
}

impl TryFrom<ModelDocument> for StructuralModel {
    type Error = ModelError;

    fn try_from(document: ModelDocument) -> Result<Self, Self::Error> {
        Self::new(document.components)
    }
}

/// An ordered, id-indexed collection of components.
///
/// The position of a component in the sequence is its *declaration index*;
/// the planner and generator use it to break ties deterministically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ModelDocument")]
pub struct StructuralModel {
    components: Vec<Component>,
    #[serde(skip)]
    index: HashMap<ComponentId, usize>,
}

impl StructuralModel {
    /// Builds a model, rejecting duplicate component ids.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateId`] for the first repeated id.
    pub fn new(components: Vec<Component>) -> Result<Self, ModelError> {
        let mut index = HashMap::with_capacity(components.len());
        for (position, component) in components.iter().enumerate() {
            if index.insert(component.id().clone(), position).is_some() {
                warn!(id:% = component.id(); "Duplicate component id");
                return Err(ModelError::DuplicateId(component.id().clone()));
            }
        }
        debug!(components = components.len(); "Built structural model");
        Ok(Self { components, index })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.index.get(id).map(|&position| &self.components[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Declaration index of the component with the given id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Iterates every relation as `(source, relation)` in declaration order,
    /// including relations whose target does not exist.
    pub fn relations(&self) -> impl Iterator<Item = (&Component, &Relation)> {
        self.components.iter().flat_map(|component| {
            component
                .relations()
                .iter()
                .map(move |relation| (component, relation))
        })
    }

    /// Total number of relations, dangling ones included.
    pub fn relation_count(&self) -> usize {
        self.components.iter().map(|c| c.relations().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructuralModel {
        StructuralModel::new(vec![
            Component::new("a", ComponentKind::Class, "Animal")
                .with_member("speak", MemberKind::Method)
                .with_member("age", MemberKind::Field),
            Component::new("d", ComponentKind::Class, "Dog")
                .with_relation("a", RelationKind::Inherits)
                .with_relation("ghost", RelationKind::Depends),
        ])
        .unwrap()
    }

    #[test]
    fn test_model_lookup() {
        let model = sample();
        assert_eq!(model.len(), 2);
        assert_eq!(model.get("d").map(Component::name), Some("Dog"));
        assert_eq!(model.position("d"), Some(1));
        assert!(!model.contains("ghost"));
    }

    #[test]
    fn test_model_rejects_duplicate_ids() {
        let err = StructuralModel::new(vec![
            Component::new("x", ComponentKind::Module, "X"),
            Component::new("x", ComponentKind::Function, "Y"),
        ])
        .unwrap_err();
        assert_eq!(err, ModelError::DuplicateId(ComponentId::new("x")));
    }

    #[test]
    fn test_relations_include_dangling() {
        let model = sample();
        let targets: Vec<&str> = model
            .relations()
            .map(|(_, relation)| relation.target_id().as_str())
            .collect();
        assert_eq!(targets, vec!["a", "ghost"]);
        assert_eq!(model.relation_count(), 2);
    }

    #[test]
    fn test_method_count() {
        let model = sample();
        assert_eq!(model.get("a").unwrap().method_count(), 1);
    }

    #[test]
    fn test_model_from_json() {
        let json = r#"{
            "components": [
                {"id": "svc", "kind": "class", "name": "UserService",
                 "members": [{"name": "login", "kind": "method"}],
                 "relations": [{"target_id": "repo", "kind": "depends"}]},
                {"id": "repo", "kind": "class", "name": "UserRepository"}
            ]
        }"#;
        let model: StructuralModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.get("repo").unwrap().relations().len(), 0);
        assert_eq!(
            model.get("svc").unwrap().relations()[0].kind(),
            RelationKind::Depends
        );
    }

    #[test]
    fn test_model_from_json_rejects_duplicates() {
        let json = r#"{"components": [
            {"id": "a", "kind": "module", "name": "A"},
            {"id": "a", "kind": "module", "name": "B"}
        ]}"#;
        let result: Result<StructuralModel, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
