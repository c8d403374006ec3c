//! Design planner.
//!
//! [`Planner::plan`] maps a [`StructuralModel`] to a [`DiagramPlan`]: the
//! diagram type, the layout, the ranked subset of components that fits the
//! cap, the groups they are drawn in and the style of each role in use.
//! After a failed attempt the loop controller passes a [`PriorFailure`] and
//! the planner revises the previous parameters so the retry differs.
//!
//! Planning never fails. Dangling and duplicate relations are dropped and
//! recorded as [`PlanNote`]s.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, trace};
use petgraph::{algo::is_cyclic_directed, graph::DiGraph, unionfind::UnionFind};

use cartograph_core::{
    model::{Component, ComponentId, ComponentKind, RelationKind, StructuralModel},
    plan::{
        DiagramPlan, DiagramType, FailureCause, Group, Layout, PlanNote, PlannedComponent,
        PlannedRelation, PriorFailure, SelectionBias,
    },
    quality::Metric,
    style::{SemanticRole, Theme, VisualStyle},
    validation::ContentFailure,
};

use crate::{config::PlannerConfig, shapes};

/// Structural counts the diagram type rules look at.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Signals {
    components: usize,
    classes: usize,
    functions: usize,
    method_bearing: usize,
    inherits: usize,
    depends: usize,
    max_fan_out: usize,
    linear_chain: bool,
}

impl Signals {
    fn collect(model: &StructuralModel, relations: &[PlannedRelation]) -> Self {
        let components = model.components();
        let mut signals = Signals {
            components: components.len(),
            classes: count_kind(components, ComponentKind::Class),
            functions: count_kind(components, ComponentKind::Function),
            method_bearing: components.iter().filter(|c| c.method_count() > 0).count(),
            ..Signals::default()
        };

        let mut fan_out: HashMap<&ComponentId, usize> = HashMap::new();
        for relation in relations {
            match relation.kind() {
                RelationKind::Inherits => signals.inherits += 1,
                RelationKind::Depends => {
                    signals.depends += 1;
                    *fan_out.entry(relation.source()).or_default() += 1;
                }
                RelationKind::Associates => {}
            }
        }
        signals.max_fan_out = fan_out.values().copied().max().unwrap_or(0);
        signals.linear_chain = is_linear_chain(relations);
        signals
    }
}

fn count_kind(components: &[Component], kind: ComponentKind) -> usize {
    components.iter().filter(|c| c.kind() == kind).count()
}

/// `true` if the dependency edges form one simple path of two or more edges.
fn is_linear_chain(relations: &[PlannedRelation]) -> bool {
    let mut graph = DiGraph::<(), ()>::new();
    let mut nodes = HashMap::new();
    for relation in relations
        .iter()
        .filter(|r| r.kind() == RelationKind::Depends)
    {
        let source = *nodes
            .entry(relation.source())
            .or_insert_with(|| graph.add_node(()));
        let target = *nodes
            .entry(relation.target())
            .or_insert_with(|| graph.add_node(()));
        graph.update_edge(source, target, ());
    }

    let edges = graph.edge_count();
    if edges < 2 || is_cyclic_directed(&graph) {
        return false;
    }
    let simple = graph.node_indices().all(|node| {
        graph.neighbors_directed(node, petgraph::Incoming).count() <= 1
            && graph.neighbors_directed(node, petgraph::Outgoing).count() <= 1
    });
    // Disjoint acyclic paths number `nodes - edges`.
    simple && graph.node_count() == edges + 1
}

/// Diagram type rules in priority order; the first match wins.
const TYPE_RULES: &[(fn(&Signals) -> bool, DiagramType)] = &[
    (|s| s.inherits > 0 && s.method_bearing > 0, DiagramType::Class),
    (|s| s.inherits == 0 && s.linear_chain, DiagramType::Flow),
    (
        |s| s.max_fan_out >= 3 && s.inherits * 4 <= s.depends,
        DiagramType::Architecture,
    ),
    (|s| s.classes > 0 || s.method_bearing > 0, DiagramType::Class),
    (|s| s.functions * 2 > s.components, DiagramType::Flow),
    (|_| true, DiagramType::Architecture),
];

/// Matching diagram types in rule order, followed by the remaining types.
fn candidates(signals: &Signals) -> Vec<DiagramType> {
    let mut types = Vec::with_capacity(DiagramType::ALL.len());
    let matching = TYPE_RULES
        .iter()
        .filter(|(matches, _)| matches(signals))
        .map(|(_, diagram_type)| *diagram_type);
    for diagram_type in matching.chain(DiagramType::ALL) {
        if !types.contains(&diagram_type) {
            types.push(diagram_type);
        }
    }
    types
}

fn layout_for(diagram_type: DiagramType, has_relations: bool) -> Layout {
    if !has_relations {
        return Layout::Grid;
    }
    match diagram_type {
        DiagramType::Class | DiagramType::Flow => Layout::Hierarchical,
        DiagramType::Architecture => Layout::Layered,
    }
}

/// The knobs a hint can turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parameters {
    diagram_type: DiagramType,
    layout: Layout,
    cap: usize,
    bias: SelectionBias,
}

/// Chooses what to draw.
#[derive(Debug, Clone)]
pub struct Planner {
    max_components: usize,
    min_components: usize,
    theme: Theme,
}

impl Planner {
    pub fn new(config: &PlannerConfig, theme: Theme) -> Self {
        Self {
            max_components: config.max_components(),
            min_components: config.min_components(),
            theme,
        }
    }

    /// Plans a diagram for `model`, revising the previous plan when `hint`
    /// describes why it failed.
    pub fn plan(&self, model: &StructuralModel, hint: Option<&PriorFailure>) -> DiagramPlan {
        let (retained, notes) = retain_relations(model);
        for note in &notes {
            debug!(note:% = note; "Dropped relation");
        }

        let signals = Signals::collect(model, &retained);
        trace!(signals:?; "Structural signals");

        let has_relations = !retained.is_empty();
        let parameters = match hint {
            None => self.initial(&signals, has_relations),
            Some(failure) => self.revise(&signals, has_relations, model.len(), failure),
        };
        debug!(
            diagram_type:% = parameters.diagram_type,
            layout:% = parameters.layout,
            cap = parameters.cap,
            bias:? = parameters.bias;
            "Chose plan parameters"
        );

        let selected = select(model, &retained, parameters.cap, parameters.bias);
        let selected_ids: HashSet<&ComponentId> = selected.iter().map(|c| c.id()).collect();
        let relations: Vec<PlannedRelation> = retained
            .iter()
            .filter(|r| selected_ids.contains(r.source()) && selected_ids.contains(r.target()))
            .cloned()
            .collect();
        let groups = group(&selected, &relations);
        let styling = self.styling(&selected);

        DiagramPlan::new(parameters.diagram_type, parameters.layout)
            .with_theme(self.theme)
            .with_cap(parameters.cap)
            .with_bias(parameters.bias)
            .with_components(selected)
            .with_relations(relations)
            .with_groups(groups)
            .with_styling(styling)
            .with_notes(notes)
    }

    fn initial(&self, signals: &Signals, has_relations: bool) -> Parameters {
        let diagram_type = candidates(signals)[0];
        Parameters {
            diagram_type,
            layout: layout_for(diagram_type, has_relations),
            cap: self.max_components.max(self.min_components),
            bias: SelectionBias::Salience,
        }
    }

    fn revise(
        &self,
        signals: &Signals,
        has_relations: bool,
        model_size: usize,
        failure: &PriorFailure,
    ) -> Parameters {
        let previous = failure.previous();
        let mut revised = Parameters {
            diagram_type: previous.diagram_type,
            layout: previous.layout,
            cap: previous.cap,
            bias: SelectionBias::Salience,
        };

        match failure.cause() {
            FailureCause::Content(ContentFailure::Syntax) => {
                revised.cap = previous.cap / 2;
                revised.layout = Layout::Grid;
            }
            FailureCause::Content(ContentFailure::Render) => {
                revised.cap = previous.cap * 2 / 3;
                revised.layout = previous.layout.rotate();
            }
            FailureCause::Quality {
                weakest: Metric::Readability | Metric::Clarity,
            } => revised.cap = previous.cap * 2 / 3,
            FailureCause::Quality {
                weakest: Metric::Structure,
            } => {
                let types = candidates(signals);
                let position = types
                    .iter()
                    .position(|t| *t == previous.diagram_type)
                    .unwrap_or(0);
                revised.diagram_type = types[(position + 1) % types.len()];
                revised.layout = layout_for(revised.diagram_type, has_relations);
            }
            FailureCause::Quality {
                weakest: Metric::Completeness,
            } => revised.bias = SelectionBias::Connectivity,
            FailureCause::Quality {
                weakest: Metric::Semantic,
            } => revised.layout = previous.layout.rotate(),
        }
        revised.cap = revised.cap.max(self.min_components);

        // A retry must not repeat the previous plan.
        let unchanged = revised.diagram_type == previous.diagram_type
            && revised.layout == previous.layout
            && revised.cap.min(model_size) == previous.selected
            && revised.bias == SelectionBias::Salience;
        if unchanged {
            revised.layout = revised.layout.rotate();
        }
        revised
    }

    fn styling(&self, selected: &[PlannedComponent]) -> IndexMap<SemanticRole, VisualStyle> {
        let mut styling = IndexMap::new();
        for component in selected {
            styling
                .entry(component.role())
                .or_insert_with(|| shapes::role_style(component.role(), self.theme));
        }
        styling
    }
}

/// Splits the model's relations into retained ones and notes about the rest.
fn retain_relations(model: &StructuralModel) -> (Vec<PlannedRelation>, Vec<PlanNote>) {
    let mut relations = Vec::new();
    let mut notes = Vec::new();
    let mut seen = HashSet::new();

    for (component, relation) in model.relations() {
        let source = component.id().clone();
        let target = relation.target_id().clone();
        let kind = relation.kind();

        if !model.contains(target.as_str()) {
            notes.push(PlanNote::DanglingRelation {
                source,
                target,
                kind,
            });
            continue;
        }
        let planned = PlannedRelation::new(source.clone(), target.clone(), kind);
        if !seen.insert(planned.clone()) {
            notes.push(PlanNote::DuplicateRelation {
                source,
                target,
                kind,
            });
            continue;
        }
        relations.push(planned);
    }
    (relations, notes)
}

/// Ranks the components and keeps the best `cap`, in declaration order.
fn select(
    model: &StructuralModel,
    relations: &[PlannedRelation],
    cap: usize,
    bias: SelectionBias,
) -> Vec<PlannedComponent> {
    let mut degree: HashMap<&ComponentId, usize> = HashMap::new();
    let mut inherits_from: HashSet<&ComponentId> = HashSet::new();
    let mut inherited_by: HashSet<&ComponentId> = HashSet::new();
    for relation in relations {
        *degree.entry(relation.source()).or_default() += 1;
        *degree.entry(relation.target()).or_default() += 1;
        if relation.kind() == RelationKind::Inherits {
            inherits_from.insert(relation.source());
            inherited_by.insert(relation.target());
        }
    }

    let mut ranked: Vec<(usize, f64)> = model
        .components()
        .iter()
        .enumerate()
        .map(|(index, component)| {
            let id = component.id();
            let is_root = inherited_by.contains(id) && !inherits_from.contains(id);
            let degree = degree.get(id).copied().unwrap_or(0);
            (index, score(component, degree, is_root, bias))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(cap);
    ranked.sort_by_key(|(index, _)| *index);

    trace!(ranked:?; "Selected components by declaration index and score");

    ranked
        .into_iter()
        .map(|(index, _)| {
            let component = &model.components()[index];
            PlannedComponent::new(component.clone(), shapes::classify(component), index)
        })
        .collect()
}

/// Composite importance of a component.
fn score(
    component: &Component,
    degree: usize,
    is_inheritance_root: bool,
    bias: SelectionBias,
) -> f64 {
    let kind_base = match component.kind() {
        ComponentKind::Class => 3.0,
        ComponentKind::Module => 2.0,
        ComponentKind::Function => 1.0,
    };
    let (member_weight, degree_weight) = match bias {
        SelectionBias::Salience => (0.5, 1.0),
        SelectionBias::Connectivity => (0.25, 3.0),
    };
    let members = component.members().len().min(10) as f64;
    let salience = if shapes::role_from_name(component.name()).is_some() {
        2.0
    } else {
        0.0
    };
    let entry_point = if shapes::is_entry_point(component.name()) {
        2.0
    } else {
        0.0
    };
    let root = if is_inheritance_root { 1.5 } else { 0.0 };

    kind_base
        + member_weight * members
        + degree_weight * degree as f64
        + salience
        + entry_point
        + root
}

/// Groups components connected through retained relations.
fn group(selected: &[PlannedComponent], relations: &[PlannedRelation]) -> Vec<Group> {
    let position: HashMap<&ComponentId, usize> = selected
        .iter()
        .enumerate()
        .map(|(i, component)| (component.id(), i))
        .collect();

    let mut sets = UnionFind::<usize>::new(selected.len());
    for relation in relations {
        if let (Some(&a), Some(&b)) = (
            position.get(relation.source()),
            position.get(relation.target()),
        ) {
            sets.union(a, b);
        }
    }
    let labels = sets.into_labeling();

    let mut members: IndexMap<usize, Vec<&PlannedComponent>> = IndexMap::new();
    for (i, component) in selected.iter().enumerate() {
        members.entry(labels[i]).or_default().push(component);
    }

    members
        .into_values()
        .map(|components| {
            let name = match components.as_slice() {
                [single] => single.component().name().to_string(),
                [first, ..] => format!("{} group", first.component().name()),
                [] => String::new(),
            };
            Group::new(name, components.iter().map(|c| c.id().clone()).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cartograph_core::{
        model::MemberKind,
        plan::PlanSummary,
    };

    use super::*;

    fn planner() -> Planner {
        Planner::new(&PlannerConfig::default(), Theme::default())
    }

    fn shapes_model() -> StructuralModel {
        StructuralModel::new(vec![
            Component::new("shape", ComponentKind::Class, "Shape")
                .with_member("area", MemberKind::Method),
            Component::new("circle", ComponentKind::Class, "Circle")
                .with_member("radius", MemberKind::Field)
                .with_relation("shape", RelationKind::Inherits),
            Component::new("logger", ComponentKind::Class, "Logger"),
        ])
        .unwrap()
    }

    fn chain_model() -> StructuralModel {
        StructuralModel::new(vec![
            Component::new("load", ComponentKind::Function, "load_input")
                .with_relation("parse", RelationKind::Depends),
            Component::new("parse", ComponentKind::Function, "parse_records")
                .with_relation("write", RelationKind::Depends),
            Component::new("write", ComponentKind::Function, "write_output"),
        ])
        .unwrap()
    }

    fn hub_model() -> StructuralModel {
        StructuralModel::new(vec![
            Component::new("app", ComponentKind::Module, "app")
                .with_relation("db", RelationKind::Depends)
                .with_relation("cache", RelationKind::Depends)
                .with_relation("queue", RelationKind::Depends),
            Component::new("db", ComponentKind::Module, "database"),
            Component::new("cache", ComponentKind::Module, "cache"),
            Component::new("queue", ComponentKind::Module, "queue"),
        ])
        .unwrap()
    }

    fn dense_model(n: usize) -> StructuralModel {
        let components = (0..n)
            .map(|i| {
                let mut component =
                    Component::new(format!("c{i}"), ComponentKind::Class, format!("Widget{i}"));
                for step in 1..=3 {
                    component = component
                        .with_relation(format!("c{}", (i + step) % n), RelationKind::Depends);
                }
                component
            })
            .collect();
        StructuralModel::new(components).unwrap()
    }

    fn failure(plan: &DiagramPlan, cause: FailureCause) -> PriorFailure {
        PriorFailure::new(cause, plan.summary())
    }

    #[test]
    fn test_class_diagram_for_inheritance() {
        let plan = planner().plan(&shapes_model(), None);
        assert_eq!(plan.diagram_type(), DiagramType::Class);
        assert_eq!(plan.layout(), Layout::Hierarchical);
        assert_eq!(plan.components().len(), 3);
        assert_eq!(plan.relations().len(), 1);
        assert!(plan.notes().is_empty());
    }

    #[test]
    fn test_flow_diagram_for_call_chain() {
        let plan = planner().plan(&chain_model(), None);
        assert_eq!(plan.diagram_type(), DiagramType::Flow);
        assert_eq!(plan.layout(), Layout::Hierarchical);
    }

    #[test]
    fn test_architecture_diagram_for_fan_out() {
        let plan = planner().plan(&hub_model(), None);
        assert_eq!(plan.diagram_type(), DiagramType::Architecture);
        assert_eq!(plan.layout(), Layout::Layered);
    }

    #[test]
    fn test_grid_layout_without_relations() {
        let model = StructuralModel::new(vec![
            Component::new("a", ComponentKind::Function, "alpha"),
            Component::new("b", ComponentKind::Function, "beta"),
        ])
        .unwrap();
        let plan = planner().plan(&model, None);
        assert_eq!(plan.layout(), Layout::Grid);
        assert_eq!(plan.groups().len(), 2);
    }

    #[test]
    fn test_dangling_and_duplicate_relations_are_noted() {
        let model = StructuralModel::new(vec![
            Component::new("a", ComponentKind::Class, "Alpha")
                .with_relation("b", RelationKind::Depends)
                .with_relation("b", RelationKind::Depends)
                .with_relation("ghost", RelationKind::Inherits),
            Component::new("b", ComponentKind::Class, "Beta"),
        ])
        .unwrap();
        let plan = planner().plan(&model, None);
        assert_eq!(plan.relations().len(), 1);
        assert_eq!(plan.notes().len(), 2);
        assert!(matches!(plan.notes()[0], PlanNote::DuplicateRelation { .. }));
        assert!(matches!(plan.notes()[1], PlanNote::DanglingRelation { .. }));
    }

    #[test]
    fn test_selection_is_capped_and_ordered() {
        let model = dense_model(50);
        let plan = planner().plan(&model, None);
        assert_eq!(plan.components().len(), 15);
        let indexes: Vec<usize> = plan
            .components()
            .iter()
            .map(PlannedComponent::declaration_index)
            .collect();
        assert!(indexes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_equal_scores_keep_declaration_order() {
        let model = StructuralModel::new(
            (0..6)
                .map(|i| Component::new(format!("f{i}"), ComponentKind::Function, format!("step{i}")))
                .collect(),
        )
        .unwrap();
        let planner = Planner::new(&PlannerConfig::new(4, 3), Theme::default());
        let plan = planner.plan(&model, None);
        let ids: Vec<&str> = plan.selected_ids().map(ComponentId::as_str).collect();
        assert_eq!(ids, vec!["f0", "f1", "f2", "f3"]);
    }

    #[test]
    fn test_entry_point_outranks_peers() {
        let model = StructuralModel::new(vec![
            Component::new("a", ComponentKind::Function, "helper_a"),
            Component::new("b", ComponentKind::Function, "helper_b"),
            Component::new("c", ComponentKind::Function, "helper_c"),
            Component::new("m", ComponentKind::Function, "main"),
        ])
        .unwrap();
        let planner = Planner::new(&PlannerConfig::new(3, 3), Theme::default());
        let plan = planner.plan(&model, None);
        assert!(plan.component(&ComponentId::from("m")).is_some());
        assert!(plan.component(&ComponentId::from("c")).is_none());
    }

    #[test]
    fn test_groups_partition_selection() {
        let model = StructuralModel::new(vec![
            Component::new("a", ComponentKind::Class, "Alpha").with_relation("b", RelationKind::Depends),
            Component::new("b", ComponentKind::Class, "Beta"),
            Component::new("c", ComponentKind::Class, "Gamma"),
            Component::new("d", ComponentKind::Class, "Delta").with_relation("c", RelationKind::Associates),
        ])
        .unwrap();
        let plan = planner().plan(&model, None);
        let groups: Vec<Vec<&str>> = plan
            .groups()
            .iter()
            .map(|g| g.members().iter().map(ComponentId::as_str).collect())
            .collect();
        assert_eq!(groups, vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(plan.groups()[0].name(), "Alpha group");
    }

    #[test]
    fn test_syntax_failure_halves_cap_and_uses_grid() {
        let planner = planner();
        let model = dense_model(50);
        let first = planner.plan(&model, None);
        let hint = failure(&first, FailureCause::Content(ContentFailure::Syntax));
        let second = planner.plan(&model, Some(&hint));
        assert_eq!(second.cap(), 7);
        assert_eq!(second.layout(), Layout::Grid);
        assert_eq!(second.components().len(), 7);
    }

    #[test]
    fn test_render_failure_rotates_layout() {
        let planner = planner();
        let model = dense_model(50);
        let first = planner.plan(&model, None);
        let hint = failure(&first, FailureCause::Content(ContentFailure::Render));
        let second = planner.plan(&model, Some(&hint));
        assert_eq!(second.cap(), 10);
        assert_eq!(second.layout(), first.layout().rotate());
    }

    #[test]
    fn test_readability_shortfall_shrinks_cap() {
        let planner = planner();
        let model = dense_model(50);
        let first = planner.plan(&model, None);
        let hint = failure(
            &first,
            FailureCause::Quality {
                weakest: Metric::Readability,
            },
        );
        let second = planner.plan(&model, Some(&hint));
        assert_eq!(second.cap(), 10);
        assert_eq!(second.layout(), first.layout());
    }

    #[test]
    fn test_structure_shortfall_switches_type() {
        let planner = planner();
        let model = shapes_model();
        let first = planner.plan(&model, None);
        let hint = failure(
            &first,
            FailureCause::Quality {
                weakest: Metric::Structure,
            },
        );
        let second = planner.plan(&model, Some(&hint));
        assert_ne!(second.diagram_type(), first.diagram_type());
    }

    #[test]
    fn test_completeness_shortfall_biases_connectivity() {
        let planner = planner();
        let model = dense_model(50);
        let first = planner.plan(&model, None);
        let hint = failure(
            &first,
            FailureCause::Quality {
                weakest: Metric::Completeness,
            },
        );
        let second = planner.plan(&model, Some(&hint));
        assert_eq!(second.bias(), SelectionBias::Connectivity);
    }

    #[test]
    fn test_cap_never_below_minimum() {
        let planner = planner();
        let model = dense_model(50);
        let previous = PlanSummary {
            diagram_type: DiagramType::Class,
            layout: Layout::Hierarchical,
            cap: 4,
            selected: 4,
        };
        let hint = PriorFailure::new(FailureCause::Content(ContentFailure::Syntax), previous);
        assert_eq!(planner.plan(&model, Some(&hint)).cap(), 3);
    }

    #[test]
    fn test_unchanged_revision_rotates_layout() {
        // Three components: shrinking the cap from 15 to 10 selects the same set.
        let planner = planner();
        let model = shapes_model();
        let first = planner.plan(&model, None);
        let hint = failure(
            &first,
            FailureCause::Quality {
                weakest: Metric::Clarity,
            },
        );
        let second = planner.plan(&model, Some(&hint));
        assert_eq!(second.layout(), first.layout().rotate());
    }

    #[test]
    fn test_empty_model() {
        let plan = planner().plan(&StructuralModel::default(), None);
        assert!(plan.components().is_empty());
        assert!(plan.groups().is_empty());
        assert_eq!(plan.layout(), Layout::Grid);
    }

    #[test]
    fn test_planning_is_deterministic() {
        let model = dense_model(30);
        assert_eq!(planner().plan(&model, None), planner().plan(&model, None));
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn model_strategy() -> impl Strategy<Value = StructuralModel> {
        (1usize..40).prop_flat_map(|n| {
            prop::collection::vec(
                (
                    prop_oneof![
                        Just(ComponentKind::Class),
                        Just(ComponentKind::Function),
                        Just(ComponentKind::Module),
                    ],
                    prop::collection::vec((0..n + 5, 0usize..3), 0..4),
                ),
                n,
            )
            .prop_map(|specs| {
                let components = specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (kind, relations))| {
                        relations.into_iter().fold(
                            Component::new(format!("c{i}"), kind, format!("Item{i}")),
                            |component, (target, kind)| {
                                component.with_relation(format!("c{target}"), RelationKind::ALL[kind])
                            },
                        )
                    })
                    .collect();
                StructuralModel::new(components).unwrap()
            })
        })
    }

    fn check_selection(model: &StructuralModel, plan: &DiagramPlan) -> Result<(), TestCaseError> {
        prop_assert!(plan.components().len() <= plan.cap());
        for id in plan.selected_ids() {
            prop_assert!(model.contains(id.as_str()));
        }
        for relation in plan.relations() {
            prop_assert!(plan.component(relation.source()).is_some());
            prop_assert!(plan.component(relation.target()).is_some());
        }
        Ok(())
    }

    fn check_groups_partition(plan: &DiagramPlan) -> Result<(), TestCaseError> {
        let mut grouped: Vec<&ComponentId> = plan
            .groups()
            .iter()
            .flat_map(|g| g.members().iter())
            .collect();
        grouped.sort();
        let mut selected: Vec<&ComponentId> = plan.selected_ids().collect();
        selected.sort();
        prop_assert_eq!(grouped, selected);
        Ok(())
    }

    proptest! {
        #[test]
        fn selection_is_bounded_subset(model in model_strategy(), cap in 3usize..20) {
            let planner = Planner::new(&PlannerConfig::new(cap, 3), Theme::default());
            let plan = planner.plan(&model, None);
            check_selection(&model, &plan)?;
            check_groups_partition(&plan)?;
        }
    }
}
