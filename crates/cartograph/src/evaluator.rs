//! Quality evaluation of rendered diagrams.
//!
//! The [`Evaluator`] scores an artifact on the five [`Metric`]s. Every score
//! is computed from the artifact itself: its text is read back with the D2
//! reader, and the plan it was generated from maps shape paths to model
//! components. Nothing here calls the renderer.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info, warn};
use petgraph::{algo::is_cyclic_directed, graph::DiGraph};

use cartograph_core::{
    artifact::DiagramArtifact,
    model::{ComponentId, RelationKind, StructuralModel},
    plan::{DiagramPlan, DiagramType},
    quality::{Metric, MetricWeights, QualityReport},
    style::StyleSignature,
};
use cartograph_parser::{Connection, Document, EdgeOp, ShapeDecl};

use crate::{config::QualityConfig, generator, shapes};

/// Names longer than this count as truncation risks.
const MAX_NAME_LENGTH: usize = 32;

/// Names that say nothing about what a component is.
const GENERIC_NAMES: &[&str] = &[
    "data", "info", "item", "items", "object", "obj", "thing", "stuff", "temp", "tmp", "misc",
    "util", "utils", "helper", "helpers", "common", "base", "node", "element", "value", "test",
    "foo", "bar", "baz", "component", "module", "class", "function",
];

/// Contribution of each relation kind to completeness.
fn relation_weight(kind: RelationKind) -> f64 {
    match kind {
        RelationKind::Inherits => 2.0,
        RelationKind::Depends => 1.0,
        RelationKind::Associates => 0.75,
    }
}

/// The improvement suggested when `metric` falls below its threshold.
fn suggestion(metric: Metric) -> &'static str {
    match metric {
        Metric::Clarity => "Improve clarity: Use longer, more descriptive component names.",
        Metric::Completeness => {
            "Include more important classes and functions to improve completeness."
        }
        Metric::Structure => "Improve structure: Add logical grouping and better hierarchy.",
        Metric::Readability => {
            "Reduce complexity: Limit to 15-20 components for better readability."
        }
        Metric::Semantic => {
            "Improve semantic accuracy: Ensure relationships correctly represent the code."
        }
    }
}

/// A connection with its direction resolved and endpoints mapped to ids.
#[derive(Debug)]
struct Edge<'a> {
    from: &'a str,
    to: &'a str,
    directed: bool,
    from_id: Option<ComponentId>,
    to_id: Option<ComponentId>,
    connection: &'a Connection,
}

impl Edge<'_> {
    fn links(&self, source: &ComponentId, target: &ComponentId) -> bool {
        let (Some(from), Some(to)) = (&self.from_id, &self.to_id) else {
            return false;
        };
        (from == source && to == target) || (!self.directed && from == target && to == source)
    }

    /// Style signature as read back from the text.
    fn signature(&self) -> String {
        let style = self.connection.style();
        let get = |key: &str| style.get(key).map(String::as_str);
        StyleSignature {
            operator: self.connection.operator().as_str(),
            stroke: get("stroke").unwrap_or_default(),
            stroke_width: get("stroke-width").unwrap_or("1"),
            stroke_dash: get("stroke-dash").unwrap_or("0"),
            arrowhead: self.connection.target_arrowhead().and_then(|a| a.shape()),
        }
        .to_string()
    }
}

/// The document, its drawn nodes and resolved connections.
struct DiagramView<'a> {
    document: &'a Document,
    nodes: Vec<&'a str>,
    edges: Vec<Edge<'a>>,
}

impl<'a> DiagramView<'a> {
    fn new(document: &'a Document, plan: &DiagramPlan) -> Self {
        let ids = generator::component_paths(plan);
        let nodes = document.leaf_shapes().map(ShapeDecl::path).collect();
        let edges = document
            .connections()
            .iter()
            .map(|connection| {
                let (from, to, directed) = match connection.operator() {
                    EdgeOp::Forward => (connection.source(), connection.target(), true),
                    EdgeOp::Backward => (connection.target(), connection.source(), true),
                    EdgeOp::Both | EdgeOp::Undirected => {
                        (connection.source(), connection.target(), false)
                    }
                };
                Edge {
                    from,
                    to,
                    directed,
                    from_id: ids.get(from).cloned(),
                    to_id: ids.get(to).cloned(),
                    connection,
                }
            })
            .collect();
        Self {
            document,
            nodes,
            edges,
        }
    }

    fn connects(&self, source: &ComponentId, target: &ComponentId) -> bool {
        self.edges.iter().any(|edge| edge.links(source, target))
    }

    /// Fraction of nodes touching at least one connection.
    fn participation(&self) -> f64 {
        let connected: HashSet<&str> = self.edges.iter().flat_map(|e| [e.from, e.to]).collect();
        let count = self.nodes.iter().filter(|n| connected.contains(*n)).count();
        count as f64 / self.nodes.len() as f64
    }

    fn single_predecessor_fraction(&self) -> f64 {
        let mut predecessors: HashMap<&str, HashSet<&str>> = HashMap::new();
        for edge in self.edges.iter().filter(|e| e.directed) {
            predecessors.entry(edge.to).or_default().insert(edge.from);
        }
        let count = self
            .nodes
            .iter()
            .filter(|n| predecessors.get(*n).is_some_and(|p| p.len() == 1))
            .count();
        count as f64 / self.nodes.len() as f64
    }

    fn is_cyclic(&self) -> bool {
        let mut graph = DiGraph::<(), ()>::new();
        let index: HashMap<&str, _> = self.nodes.iter().map(|&n| (n, graph.add_node(()))).collect();
        for edge in self.edges.iter().filter(|e| e.directed) {
            if let (Some(&from), Some(&to)) = (index.get(edge.from), index.get(edge.to)) {
                graph.add_edge(from, to, ());
            }
        }
        is_cyclic_directed(&graph)
    }
}

/// Scores rendered artifacts.
#[derive(Debug, Clone)]
pub struct Evaluator {
    weights: MetricWeights,
    suggestion_threshold: f64,
    readability_suggestion_threshold: f64,
    readability_cap: usize,
    connection_threshold: f64,
}

impl Evaluator {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            weights: *config.weights(),
            suggestion_threshold: config.suggestion_threshold(),
            readability_suggestion_threshold: config.readability_suggestion_threshold(),
            readability_cap: config.readability_cap(),
            connection_threshold: config.max_connections_per_component(),
        }
    }

    /// Scores `artifact` against the model it was generated from.
    ///
    /// Only call this for artifacts that rendered; unreadable text scores as
    /// an empty diagram.
    pub fn evaluate(&self, artifact: &DiagramArtifact, model: &StructuralModel) -> QualityReport {
        let document = match cartograph_parser::parse(artifact.source_text()) {
            Ok(document) => document,
            Err(err) => {
                warn!(err:%; "Evaluating unreadable diagram as empty");
                Document::default()
            }
        };
        let plan = artifact.plan();
        let view = DiagramView::new(&document, plan);

        let scores: IndexMap<Metric, f64> = Metric::ALL
            .into_iter()
            .map(|metric| {
                let score = match metric {
                    Metric::Clarity => clarity(view.document),
                    Metric::Completeness => completeness(&view, model),
                    Metric::Structure => structure(&view, plan.diagram_type()),
                    Metric::Readability => {
                        readability(view.document, self.readability_cap, self.connection_threshold)
                    }
                    Metric::Semantic => semantic(&view, plan),
                };
                debug!(metric:% = metric, score; "Scored metric");
                (metric, score)
            })
            .collect();

        let suggestions = self.suggestions(&scores);
        let report = QualityReport::new(scores, &self.weights, suggestions);
        info!(
            attempt = artifact.attempt_index(),
            overall = report.overall(),
            weakest:% = report.weakest();
            "Evaluated diagram"
        );
        report
    }

    fn suggestions(&self, scores: &IndexMap<Metric, f64>) -> Vec<String> {
        scores
            .iter()
            .filter(|&(&metric, &score)| {
                let threshold = match metric {
                    Metric::Readability => self.readability_suggestion_threshold,
                    _ => self.suggestion_threshold,
                };
                score < threshold
            })
            .map(|(&metric, _)| suggestion(metric).to_string())
            .collect()
    }
}

fn is_descriptive(name: &str) -> bool {
    let name = name.trim();
    let length = name.chars().count();
    if length < 3 {
        return false;
    }
    let acronym = length <= 4 && name.chars().all(|c| c.is_ascii_uppercase());
    let stem = name
        .trim_end_matches(|c: char| c.is_ascii_digit() || c == '_')
        .to_lowercase();
    !acronym && !GENERIC_NAMES.contains(&stem.as_str())
}

fn clarity(document: &Document) -> f64 {
    let names: Vec<&str> = document.leaf_shapes().map(ShapeDecl::title).collect();
    if names.is_empty() {
        return 1.0;
    }
    let total = names.len() as f64;

    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for name in &names {
        *occurrences.entry(name.to_lowercase()).or_default() += 1;
    }

    let descriptive = names.iter().filter(|n| is_descriptive(n)).count() as f64 / total;
    let overlap = names
        .iter()
        .filter(|n| occurrences[&n.to_lowercase()] > 1)
        .count() as f64
        / total;
    let truncation = names
        .iter()
        .filter(|n| n.chars().count() > MAX_NAME_LENGTH)
        .count() as f64
        / total;

    descriptive * (1.0 - 0.5 * overlap) * (1.0 - 0.5 * truncation)
}

fn completeness(view: &DiagramView, model: &StructuralModel) -> f64 {
    let mut seen = HashSet::new();
    let mut total = 0.0;
    let mut present = 0.0;

    for (component, relation) in model.relations() {
        let target = relation.target_id();
        if !model.contains(target.as_str()) {
            continue;
        }
        if !seen.insert((component.id(), target, relation.kind())) {
            continue;
        }
        let weight = relation_weight(relation.kind());
        total += weight;
        if view.connects(component.id(), target) {
            present += weight;
        }
    }

    if total == 0.0 { 1.0 } else { present / total }
}

fn structure(view: &DiagramView, diagram_type: DiagramType) -> f64 {
    if view.nodes.is_empty() {
        return 1.0;
    }
    match diagram_type {
        DiagramType::Class => view.participation(),
        DiagramType::Flow => view.single_predecessor_fraction(),
        DiagramType::Architecture => {
            let penalty = if view.is_cyclic() { 0.8 } else { 1.0 };
            view.participation() * penalty
        }
    }
}

fn readability(document: &Document, cap: usize, threshold: f64) -> f64 {
    let components = document.leaf_shapes().count();
    let connections = document.connections().len();

    let excess_components = components.saturating_sub(cap) as f64;
    let density = if components == 0 {
        0.0
    } else {
        connections as f64 / components as f64
    };
    let excess_density = (density - threshold).max(0.0);

    1.0 / (1.0 + excess_components / cap as f64 + excess_density / threshold)
}

fn semantic(view: &DiagramView, plan: &DiagramPlan) -> f64 {
    let contract: HashMap<RelationKind, String> = RelationKind::ALL
        .into_iter()
        .map(|kind| (kind, shapes::connection_style(kind).signature()))
        .collect();

    // Observed signatures per relation kind, in first-seen order.
    let mut observed: IndexMap<RelationKind, HashSet<String>> = IndexMap::new();
    for edge in &view.edges {
        let signature = edge.signature();
        let mut kinds = plan.relations().iter().filter_map(|relation| {
            edge.links(relation.source(), relation.target())
                .then_some(relation.kind())
        });
        let first = kinds.next();
        let kind = std::iter::once(first)
            .flatten()
            .chain(kinds)
            .find(|kind| contract[kind] == signature)
            .or(first);
        if let Some(kind) = kind {
            observed.entry(kind).or_default().insert(signature);
        }
    }

    if observed.is_empty() {
        return 1.0;
    }

    let faithful = observed
        .iter()
        .filter(|&(kind, signatures)| {
            let expected = &contract[kind];
            let carries_contract = signatures.len() == 1 && signatures.contains(expected);
            let distinct = observed
                .iter()
                .filter(|(other, _)| *other != kind)
                .all(|(_, others)| !others.contains(expected));
            carries_contract && distinct
        })
        .count();
    faithful as f64 / observed.len() as f64
}
