//! D2 text generation.
//!
//! The generator turns a [`DiagramPlan`] into D2 source. Output is laid out
//! in a fixed order:
//!
//! ```text
//! # header comments
//! direction / vars.d2-config / root style / grid settings
//! classes: one entry per semantic role in use
//! one container per group holding its component declarations
//! connection statements
//! ```
//!
//! Generation is pure: the same plan always yields byte-identical text.

use std::{collections::HashMap, sync::Arc};

use log::{debug, trace};

use cartograph_core::{
    artifact::DiagramArtifact,
    color::Color,
    model::{ComponentId, MemberKind},
    plan::{DiagramPlan, Layout, PlannedComponent},
    style::{ArrowOperator, VisualStyle},
};

use crate::{
    naming::{KeyAllocator, escape_label, normalize_key},
    shapes,
};

/// Members listed under a component name.
const MAX_LABEL_MEMBERS: usize = 5;

/// Line-oriented writer with two-space indentation.
#[derive(Debug, Default)]
struct Emitter {
    out: String,
    depth: usize,
}

impl Emitter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, key: &str) {
        self.line(&format!("{key}: {{"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", escape_label(text))
}

fn color_value(color: Color) -> String {
    quoted(&color.to_hex())
}

/// Direction and layout engine for a layout strategy.
fn layout_settings(layout: Layout) -> (&'static str, &'static str) {
    match layout {
        Layout::Hierarchical => ("down", "dagre"),
        Layout::Layered => ("right", "elk"),
        Layout::Grid => ("down", "dagre"),
    }
}

/// Renders [`DiagramPlan`]s as D2 text.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    background: Option<Color>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root background fill.
    pub fn with_background(mut self, background: Option<Color>) -> Self {
        self.background = background;
        self
    }

    /// Generates the D2 source for `plan` as attempt `attempt_index`.
    pub fn generate(&self, plan: Arc<DiagramPlan>, attempt_index: usize) -> DiagramArtifact {
        let keys = ComponentKeys::allocate(&plan);
        let mut emitter = Emitter::default();

        self.preamble(&mut emitter, &plan, keys.group_keys.len());
        Self::classes(&mut emitter, &plan);
        Self::groups(&mut emitter, &plan, &keys);
        Self::connections(&mut emitter, &plan, &keys);

        let source = emitter.finish();
        debug!(
            attempt = attempt_index,
            components = plan.components().len(),
            connections = plan.relations().len(),
            bytes = source.len();
            "Generated diagram source"
        );
        trace!(source = source.as_str(); "Diagram source");

        DiagramArtifact::new(source, plan, attempt_index)
    }

    fn preamble(&self, emitter: &mut Emitter, plan: &DiagramPlan, group_count: usize) {
        let summary = plan.summary();
        emitter.line("# Generated by cartograph");
        emitter.line(&format!(
            "# Diagram type: {} | Layout: {} | Theme: {}",
            summary.diagram_type,
            summary.layout,
            plan.theme()
        ));
        emitter.line(&format!("# Components: {}", summary.selected));
        emitter.blank();

        let (direction, engine) = layout_settings(plan.layout());
        emitter.line(&format!("direction: {direction}"));
        emitter.open("vars");
        emitter.open("d2-config");
        emitter.line(&format!("layout-engine: {engine}"));
        emitter.close();
        emitter.close();

        if let Some(background) = self.background {
            emitter.line(&format!("style.fill: {}", color_value(background)));
        }
        if plan.layout() == Layout::Grid && group_count > 0 {
            let columns = (group_count as f64).sqrt().ceil().max(1.0) as usize;
            emitter.line(&format!("grid-columns: {columns}"));
        }
        emitter.blank();
    }

    fn classes(emitter: &mut Emitter, plan: &DiagramPlan) {
        if plan.styling().is_empty() {
            return;
        }
        emitter.open("classes");
        for (role, style) in plan.styling() {
            emitter.open(role.class_name());
            Self::visual_style(emitter, style);
            emitter.close();
        }
        emitter.close();
        emitter.blank();
    }

    fn visual_style(emitter: &mut Emitter, style: &VisualStyle) {
        emitter.line(&format!("shape: {}", style.shape()));
        emitter.open("style");
        emitter.line(&format!("fill: {}", color_value(style.fill())));
        emitter.line(&format!("stroke: {}", color_value(style.stroke())));
        emitter.line(&format!("font-color: {}", color_value(style.font_color())));
        emitter.line(&format!("stroke-width: {}", style.stroke_width()));
        if style.border_radius() > 0 {
            emitter.line(&format!("border-radius: {}", style.border_radius()));
        }
        if style.shadow() {
            emitter.line("shadow: true");
        }
        emitter.close();
    }

    fn groups(emitter: &mut Emitter, plan: &DiagramPlan, keys: &ComponentKeys) {
        for (group, group_key) in plan.groups().iter().zip(&keys.group_keys) {
            emitter.open(group_key);
            emitter.line(&format!("label: {}", quoted(group.name())));
            for id in group.members() {
                let (Some(component), Some(key)) = (plan.component(id), keys.component_keys.get(id))
                else {
                    continue;
                };
                emitter.open(key);
                emitter.line(&format!("label: {}", quoted(&component_label(component))));
                emitter.line(&format!("class: {}", component.role().class_name()));
                emitter.close();
            }
            emitter.close();
        }
        if !plan.groups().is_empty() {
            emitter.blank();
        }
    }

    fn connections(emitter: &mut Emitter, plan: &DiagramPlan, keys: &ComponentKeys) {
        for relation in plan.relations() {
            let (Some(source), Some(target)) =
                (keys.path(relation.source()), keys.path(relation.target()))
            else {
                continue;
            };
            let style = shapes::connection_style(relation.kind());
            emitter.open(&format!("{source} {} {target}", style.operator().as_str()));
            emitter.open("style");
            emitter.line(&format!("stroke: {}", color_value(style.stroke())));
            emitter.line(&format!("stroke-width: {}", style.stroke_width()));
            if style.stroke_dash() > 0 {
                emitter.line(&format!("stroke-dash: {}", style.stroke_dash()));
            }
            emitter.close();
            if let (ArrowOperator::Directed, Some(arrowhead)) =
                (style.operator(), style.arrowhead())
            {
                emitter.line(&format!("target-arrowhead.shape: {}", arrowhead.as_str()));
            }
            emitter.close();
        }
    }
}

/// Component name followed by up to [`MAX_LABEL_MEMBERS`] members.
fn component_label(component: &PlannedComponent) -> String {
    let component = component.component();
    let mut label = component.name().to_string();
    for member in component.members().iter().take(MAX_LABEL_MEMBERS) {
        label.push('\n');
        match member.kind() {
            MemberKind::Method => {
                label.push_str("+ ");
                label.push_str(member.name());
                label.push_str("()");
            }
            MemberKind::Field => {
                label.push_str("- ");
                label.push_str(member.name());
            }
        }
    }
    label
}

/// Maps the dotted D2 path of every selected component back to its id.
///
/// Keys are allocated exactly as [`Generator::generate`] allocates them, so
/// the paths match the shapes in the generated text.
pub(crate) fn component_paths(plan: &DiagramPlan) -> HashMap<String, ComponentId> {
    let keys = ComponentKeys::allocate(plan);
    plan.selected_ids()
        .filter_map(|id| keys.path(id).map(|path| (path, id.clone())))
        .collect()
}

/// D2 keys for one plan.
///
/// Component keys are allocated first, in declaration order, so collision
/// suffixes do not depend on grouping. Group keys follow in group order.
struct ComponentKeys {
    group_keys: Vec<String>,
    component_keys: HashMap<ComponentId, String>,
    group_of: HashMap<ComponentId, usize>,
}

impl ComponentKeys {
    fn allocate(plan: &DiagramPlan) -> Self {
        let mut allocator = KeyAllocator::new();
        let component_keys: HashMap<ComponentId, String> = plan
            .components()
            .iter()
            .map(|c| {
                let key = allocator.allocate(&normalize_key(c.component().name()));
                (c.id().clone(), key)
            })
            .collect();

        let mut group_of = HashMap::new();
        let group_keys = plan
            .groups()
            .iter()
            .enumerate()
            .map(|(index, group)| {
                for member in group.members() {
                    group_of.insert(member.clone(), index);
                }
                allocator.allocate(&format!("grp_{}", normalize_key(group.name())))
            })
            .collect();

        Self {
            group_keys,
            component_keys,
            group_of,
        }
    }

    /// Dotted path `group.component` of a selected component.
    fn path(&self, id: &ComponentId) -> Option<String> {
        let key = self.component_keys.get(id)?;
        let group = self.group_keys.get(*self.group_of.get(id)?)?;
        Some(format!("{group}.{key}"))
    }
}

#[cfg(test)]
mod tests {
    use cartograph_core::{
        model::{Component, ComponentKind, RelationKind, StructuralModel},
        style::Theme,
    };

    use super::*;
    use crate::{config::PlannerConfig, planner::Planner};

    fn plan_for(components: Vec<Component>) -> Arc<DiagramPlan> {
        let model = StructuralModel::new(components).unwrap();
        Arc::new(Planner::new(&PlannerConfig::default(), Theme::default()).plan(&model, None))
    }

    fn shapes_plan() -> Arc<DiagramPlan> {
        plan_for(vec![
            Component::new("shape", ComponentKind::Class, "Shape")
                .with_member("area", MemberKind::Method)
                .with_member("name", MemberKind::Field),
            Component::new("circle", ComponentKind::Class, "Circle")
                .with_relation("shape", RelationKind::Inherits),
            Component::new("repo", ComponentKind::Class, "OrderRepository")
                .with_relation("circle", RelationKind::Associates),
        ])
    }

    fn parse(artifact: &DiagramArtifact) -> cartograph_parser::Document {
        cartograph_parser::parse(artifact.source_text()).unwrap()
    }

    #[test]
    fn test_sections_in_order() {
        let artifact = Generator::new().generate(shapes_plan(), 0);
        let text = artifact.source_text();
        let positions: Vec<usize> = ["# Generated", "direction:", "classes: {", "grp_", "->"]
            .iter()
            .map(|needle| text.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_output_reads_back() {
        let artifact = Generator::new().generate(shapes_plan(), 0);
        let doc = parse(&artifact);

        assert_eq!(doc.direction(), Some("down"));
        assert_eq!(doc.layout_engine(), Some("dagre"));
        assert_eq!(doc.leaf_shapes().count(), 3);
        assert_eq!(doc.connections().len(), 2);
        assert!(doc.warnings().is_empty());

        let titles: Vec<&str> = doc.leaf_shapes().map(|s| s.title()).collect();
        assert_eq!(titles, vec!["Shape", "Circle", "OrderRepository"]);
    }

    #[test]
    fn test_label_lists_members() {
        let artifact = Generator::new().generate(shapes_plan(), 0);
        let doc = parse(&artifact);
        let shape = doc.leaf_shapes().next().unwrap();
        assert_eq!(shape.display_label(), "Shape\n+ area()\n- name");
    }

    #[test]
    fn test_label_member_limit() {
        let component = (0..8).fold(
            Component::new("big", ComponentKind::Class, "Big"),
            |c, i| c.with_member(format!("m{i}"), MemberKind::Method),
        );
        let plan = plan_for(vec![component]);
        let label = component_label(&plan.components()[0]);
        assert_eq!(label.lines().count(), 1 + MAX_LABEL_MEMBERS);
    }

    #[test]
    fn test_connection_styles() {
        let artifact = Generator::new().generate(shapes_plan(), 0);
        let doc = parse(&artifact);

        let inherits = &doc.connections()[0];
        assert_eq!(inherits.target_arrowhead().and_then(|a| a.shape()), Some("triangle"));
        assert_eq!(inherits.style().get("stroke").map(String::as_str), Some("#2196f3"));

        let associates = &doc.connections()[1];
        assert_eq!(associates.operator(), cartograph_parser::EdgeOp::Undirected);
        assert_eq!(associates.style().get("stroke-dash").map(String::as_str), Some("5"));
        assert!(associates.target_arrowhead().is_none());
    }

    #[test]
    fn test_classes_cover_roles_in_use() {
        let plan = shapes_plan();
        let doc = parse(&Generator::new().generate(Arc::clone(&plan), 0));
        for role in plan.styling().keys() {
            assert!(doc.classes().contains_key(role.class_name()));
        }
        assert_eq!(doc.classes()["role_data"].shape(), Some("cylinder"));
    }

    #[test]
    fn test_colliding_names_get_suffixes() {
        let plan = plan_for(vec![
            Component::new("a", ComponentKind::Class, "UserService"),
            Component::new("b", ComponentKind::Class, "user-service"),
            Component::new("c", ComponentKind::Class, "label"),
        ]);
        let keys = ComponentKeys::allocate(&plan);
        assert_eq!(keys.component_keys[&ComponentId::from("a")], "user_service");
        assert_eq!(keys.component_keys[&ComponentId::from("b")], "user_service_2");
        assert_eq!(keys.component_keys[&ComponentId::from("c")], "label_node");

        let doc = parse(&Generator::new().generate(plan, 0));
        assert_eq!(doc.leaf_shapes().count(), 3);
    }

    #[test]
    fn test_names_that_lowercase_to_marks_read_back() {
        let plan = plan_for(vec![
            Component::new("ist", ComponentKind::Class, "İstanbulService")
                .with_relation("ledger", RelationKind::Depends),
            Component::new("ledger", ComponentKind::Class, "Ledger"),
        ]);
        let artifact = Generator::new().generate(plan, 0);

        assert!(!artifact.source_text().contains('\u{307}'));
        let doc = parse(&artifact);
        assert_eq!(doc.leaf_shapes().count(), 2);
        assert_eq!(doc.connections().len(), 1);
    }

    #[test]
    fn test_background_and_grid() {
        let plan = plan_for(vec![
            Component::new("a", ComponentKind::Function, "alpha"),
            Component::new("b", ComponentKind::Function, "beta"),
            Component::new("c", ComponentKind::Function, "gamma"),
        ]);
        let background = Color::new("#fafafa").ok();
        let artifact = Generator::new()
            .with_background(background)
            .generate(plan, 1);
        let doc = parse(&artifact);

        assert_eq!(artifact.attempt_index(), 1);
        assert_eq!(doc.root_style().get("fill").map(String::as_str), Some("#fafafa"));
        assert_eq!(
            doc.root_attributes().get("grid-columns").map(String::as_str),
            Some("2")
        );
    }

    #[test]
    fn test_quotes_in_names_are_escaped() {
        let plan = plan_for(vec![Component::new(
            "q",
            ComponentKind::Class,
            "Say \"hi\"",
        )]);
        let doc = parse(&Generator::new().generate(plan, 0));
        assert_eq!(doc.leaf_shapes().next().unwrap().title(), "Say \"hi\"");
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan_for(Vec::new());
        let doc = parse(&Generator::new().generate(plan, 0));
        assert_eq!(doc.shapes().count(), 0);
        assert!(doc.classes().is_empty());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator = Generator::new();
        let plan = shapes_plan();
        let first = generator.generate(Arc::clone(&plan), 0);
        let second = generator.generate(plan, 0);
        assert_eq!(first.source_text(), second.source_text());
    }
}
