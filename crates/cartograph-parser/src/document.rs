//! The elaborated form of a D2 document.
//!
//! Shape paths are stored lowercased because D2 keys are case-insensitive;
//! every lookup method lowercases its argument the same way.

use indexmap::IndexMap;

use crate::{error::Diagnostic, parser_types::EdgeOp, span::Span};

/// Style keywords and their raw values, in declaration order.
pub type StyleMap = IndexMap<String, String>;

/// Lowercases each segment of a dotted path.
pub(crate) fn canonical_path(path: &str) -> String {
    path.to_lowercase()
}

/// A shape declared explicitly or implied by a connection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeDecl {
    pub(crate) path: String,
    pub(crate) key: String,
    pub(crate) parent: Option<String>,
    pub(crate) children: Vec<String>,
    pub(crate) label: Option<String>,
    pub(crate) shape: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) style: StyleMap,
    pub(crate) attributes: IndexMap<String, String>,
    pub(crate) explicit: bool,
    pub(crate) span: Span,
}

impl ShapeDecl {
    pub(crate) fn new(path: String, key: String, parent: Option<String>, span: Span) -> Self {
        Self {
            path,
            key,
            parent,
            children: Vec::new(),
            label: None,
            shape: None,
            classes: Vec::new(),
            style: StyleMap::new(),
            attributes: IndexMap::new(),
            explicit: false,
            span,
        }
    }

    /// Canonical (lowercased) dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last path segment as written at its first occurrence.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Canonical paths of direct children, in declaration order.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The label, or the key when no label was given.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// First line of the display label; the component name by convention.
    pub fn title(&self) -> &str {
        self.display_label().lines().next().unwrap_or_default()
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn style(&self) -> &StyleMap {
        &self.style
    }

    /// Reserved attributes other than label, shape, class and style.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// `true` if the shape appeared as a statement of its own rather than
    /// only as a connection endpoint or path prefix.
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

/// An entry of the root `classes` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDef {
    pub(crate) label: Option<String>,
    pub(crate) shape: Option<String>,
    pub(crate) style: StyleMap,
}

impl ClassDef {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn style(&self) -> &StyleMap {
        &self.style
    }
}

/// Attributes of a `source-arrowhead` or `target-arrowhead`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arrowhead {
    pub(crate) label: Option<String>,
    pub(crate) shape: Option<String>,
    pub(crate) filled: Option<bool>,
}

impl Arrowhead {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn filled(&self) -> Option<bool> {
        self.filled
    }
}

/// A connection between two shapes.
///
/// `source` and `target` are the left and right endpoints as written; the
/// [`operator`](Self::operator) says which way the arrow points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub(crate) source: String,
    pub(crate) target: String,
    pub(crate) operator: EdgeOp,
    pub(crate) label: Option<String>,
    pub(crate) style: StyleMap,
    pub(crate) classes: Vec<String>,
    pub(crate) source_arrowhead: Option<Arrowhead>,
    pub(crate) target_arrowhead: Option<Arrowhead>,
    pub(crate) span: Span,
}

impl Connection {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn operator(&self) -> EdgeOp {
        self.operator
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn style(&self) -> &StyleMap {
        &self.style
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn source_arrowhead(&self) -> Option<&Arrowhead> {
        self.source_arrowhead.as_ref()
    }

    pub fn target_arrowhead(&self) -> Option<&Arrowhead> {
        self.target_arrowhead.as_ref()
    }

    pub fn span(&self) -> Span {
        self.span
    }
}

/// A D2 document after elaboration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub(crate) direction: Option<String>,
    pub(crate) vars: IndexMap<String, String>,
    pub(crate) root_style: StyleMap,
    pub(crate) root_attributes: IndexMap<String, String>,
    pub(crate) classes: IndexMap<String, ClassDef>,
    pub(crate) shapes: IndexMap<String, ShapeDecl>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) warnings: Vec<Diagnostic>,
}

impl Document {
    /// Root `direction`, if set.
    pub fn direction(&self) -> Option<&str> {
        self.direction.as_deref()
    }

    /// Flattened `vars` map, keyed by dotted path (`d2-config.layout-engine`).
    pub fn vars(&self) -> &IndexMap<String, String> {
        &self.vars
    }

    /// The layout engine requested through `vars.d2-config.layout-engine`.
    pub fn layout_engine(&self) -> Option<&str> {
        self.vars.get("d2-config.layout-engine").map(String::as_str)
    }

    /// Root reserved attributes such as `grid-columns`.
    pub fn root_attributes(&self) -> &IndexMap<String, String> {
        &self.root_attributes
    }

    pub fn root_style(&self) -> &StyleMap {
        &self.root_style
    }

    pub fn classes(&self) -> &IndexMap<String, ClassDef> {
        &self.classes
    }

    /// Every shape in first-occurrence order, containers included.
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeDecl> {
        self.shapes.values()
    }

    /// Shapes without children: the drawn nodes of the diagram.
    pub fn leaf_shapes(&self) -> impl Iterator<Item = &ShapeDecl> {
        self.shapes.values().filter(|shape| !shape.is_container())
    }

    /// Shapes with children.
    pub fn containers(&self) -> impl Iterator<Item = &ShapeDecl> {
        self.shapes.values().filter(|shape| shape.is_container())
    }

    pub fn shape(&self, path: &str) -> Option<&ShapeDecl> {
        self.shapes.get(&canonical_path(path))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Non-fatal diagnostics produced while reading.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}
