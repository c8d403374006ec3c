//! Diagram plans and the feedback records that revise them.
//!
//! A [`DiagramPlan`] is the decision record produced by the design planner:
//! which diagram type and layout to use, which components to draw, how to
//! group them and how each semantic role looks. The plan carries the selected
//! component records and the retained relations, so the text generator needs
//! nothing but the plan.
//!
//! A [`PriorFailure`] is the hint the loop controller hands back to the
//! planner after an attempt failed; it names the failure and summarizes the
//! plan that produced it so the next plan can differ meaningfully.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    model::{Component, ComponentId, RelationKind},
    quality::Metric,
    style::{SemanticRole, Theme, VisualStyle},
    validation::ContentFailure,
};

/// The kind of diagram to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    Class,
    Architecture,
    Flow,
}

impl DiagramType {
    /// All diagram types in preference order.
    pub const ALL: [DiagramType; 3] = [
        DiagramType::Class,
        DiagramType::Architecture,
        DiagramType::Flow,
    ];
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagramType::Class => write!(f, "class"),
            DiagramType::Architecture => write!(f, "architecture"),
            DiagramType::Flow => write!(f, "flow"),
        }
    }
}

/// Layout strategy of the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Hierarchical,
    Layered,
    Grid,
}

impl Layout {
    /// The layout tried after this one when a retry asks for a change.
    pub fn rotate(self) -> Self {
        match self {
            Layout::Hierarchical => Layout::Layered,
            Layout::Layered => Layout::Grid,
            Layout::Grid => Layout::Hierarchical,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Hierarchical => write!(f, "hierarchical"),
            Layout::Layered => write!(f, "layered"),
            Layout::Grid => write!(f, "grid"),
        }
    }
}

/// How the planner ranks candidate components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SelectionBias {
    /// Composite importance score (members, relations, name salience).
    #[default]
    Salience,
    /// Relation count dominates, so more relations survive the cap.
    Connectivity,
}

/// A selected component together with its inferred role.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedComponent {
    component: Component,
    role: SemanticRole,
    declaration_index: usize,
}

impl PlannedComponent {
    pub fn new(component: Component, role: SemanticRole, declaration_index: usize) -> Self {
        Self {
            component,
            role,
            declaration_index,
        }
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn id(&self) -> &ComponentId {
        self.component.id()
    }

    pub fn role(&self) -> SemanticRole {
        self.role
    }

    /// Position of the component in the structural model.
    pub fn declaration_index(&self) -> usize {
        self.declaration_index
    }
}

/// A relation retained between two selected components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlannedRelation {
    source: ComponentId,
    target: ComponentId,
    kind: RelationKind,
}

impl PlannedRelation {
    pub fn new(source: ComponentId, target: ComponentId, kind: RelationKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }

    pub fn source(&self) -> &ComponentId {
        &self.source
    }

    pub fn target(&self) -> &ComponentId {
        &self.target
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }
}

/// A named set of selected components drawn inside one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Vec<ComponentId>,
}

impl Group {
    pub fn new(name: impl Into<String>, members: Vec<ComponentId>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[ComponentId] {
        &self.members
    }
}

/// Something the planner repaired or discarded in the input model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNote {
    /// A relation whose target is not part of the model.
    DanglingRelation {
        source: ComponentId,
        target: ComponentId,
        kind: RelationKind,
    },
    /// A relation repeated verbatim on the same component.
    DuplicateRelation {
        source: ComponentId,
        target: ComponentId,
        kind: RelationKind,
    },
}

impl fmt::Display for PlanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNote::DanglingRelation {
                source,
                target,
                kind,
            } => write!(
                f,
                "dropped {kind} relation from `{source}` to unknown component `{target}`"
            ),
            PlanNote::DuplicateRelation {
                source,
                target,
                kind,
            } => write!(
                f,
                "dropped duplicate {kind} relation from `{source}` to `{target}`"
            ),
        }
    }
}

/// Decision record describing the diagram to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramPlan {
    diagram_type: DiagramType,
    layout: Layout,
    theme: Theme,
    cap: usize,
    bias: SelectionBias,
    components: Vec<PlannedComponent>,
    relations: Vec<PlannedRelation>,
    groups: Vec<Group>,
    styling: IndexMap<SemanticRole, VisualStyle>,
    notes: Vec<PlanNote>,
}

impl DiagramPlan {
    /// Creates an empty plan; populate it with the `with_*` methods.
    pub fn new(diagram_type: DiagramType, layout: Layout) -> Self {
        Self {
            diagram_type,
            layout,
            theme: Theme::default(),
            cap: 0,
            bias: SelectionBias::default(),
            components: Vec::new(),
            relations: Vec::new(),
            groups: Vec::new(),
            styling: IndexMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_bias(mut self, bias: SelectionBias) -> Self {
        self.bias = bias;
        self
    }

    /// Sets the selected components; they are kept in declaration order.
    pub fn with_components(mut self, mut components: Vec<PlannedComponent>) -> Self {
        components.sort_by_key(PlannedComponent::declaration_index);
        self.components = components;
        self
    }

    pub fn with_relations(mut self, relations: Vec<PlannedRelation>) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_styling(mut self, styling: IndexMap<SemanticRole, VisualStyle>) -> Self {
        self.styling = styling;
        self
    }

    pub fn with_notes(mut self, notes: Vec<PlanNote>) -> Self {
        self.notes = notes;
        self
    }

    pub fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// The component cap that bounded this selection.
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn bias(&self) -> SelectionBias {
        self.bias
    }

    /// Selected components in declaration order.
    pub fn components(&self) -> &[PlannedComponent] {
        &self.components
    }

    /// Ids of the selected components in declaration order.
    pub fn selected_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.components.iter().map(PlannedComponent::id)
    }

    pub fn component(&self, id: &ComponentId) -> Option<&PlannedComponent> {
        self.components.iter().find(|planned| planned.id() == id)
    }

    pub fn relations(&self) -> &[PlannedRelation] {
        &self.relations
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn styling(&self) -> &IndexMap<SemanticRole, VisualStyle> {
        &self.styling
    }

    pub fn notes(&self) -> &[PlanNote] {
        &self.notes
    }

    /// Short summary used in retry hints and logs.
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            diagram_type: self.diagram_type,
            layout: self.layout,
            cap: self.cap,
            selected: self.components.len(),
        }
    }
}

/// The parameters of a previous plan that a retry should move away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub diagram_type: DiagramType,
    pub layout: Layout,
    pub cap: usize,
    pub selected: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} diagram, {} layout, {} of at most {} components",
            self.diagram_type, self.layout, self.selected, self.cap
        )
    }
}

/// Why the previous attempt did not end the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The renderer rejected the diagram text.
    Content(ContentFailure),
    /// The diagram rendered but scored below the acceptance threshold.
    Quality { weakest: Metric },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Content(failure) => write!(f, "{failure} failure"),
            FailureCause::Quality { weakest } => write!(f, "quality shortfall ({weakest})"),
        }
    }
}

/// Feedback passed to the planner after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorFailure {
    cause: FailureCause,
    previous: PlanSummary,
}

impl PriorFailure {
    pub fn new(cause: FailureCause, previous: PlanSummary) -> Self {
        Self { cause, previous }
    }

    pub fn cause(&self) -> FailureCause {
        self.cause
    }

    pub fn previous(&self) -> PlanSummary {
        self.previous
    }
}
