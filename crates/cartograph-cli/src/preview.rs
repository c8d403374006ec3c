//! Design previews.
//!
//! A preview shows what the first attempt would draw: the diagram type and
//! layout, the selected components with their roles, the groups and the
//! repairs made to the model. Nothing is generated or rendered.

use std::fmt;

use cartograph::plan::DiagramPlan;

/// Formats a [`DiagramPlan`] as a plain-text design preview.
pub struct Preview<'a> {
    name: &'a str,
    plan: &'a DiagramPlan,
    model_size: usize,
}

impl<'a> Preview<'a> {
    pub fn new(name: &'a str, plan: &'a DiagramPlan, model_size: usize) -> Self {
        Self {
            name,
            plan,
            model_size,
        }
    }
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan;

        writeln!(f, "Cartograph preview: {}", self.name)?;
        writeln!(f, "Diagram type: {}", plan.diagram_type())?;
        writeln!(f, "Layout: {}", plan.layout())?;
        writeln!(f, "Theme: {}", plan.theme())?;
        writeln!(
            f,
            "Components: {} of {} (cap {})",
            plan.components().len(),
            self.model_size,
            plan.cap()
        )?;
        writeln!(f, "Relations: {}", plan.relations().len())?;

        if !plan.components().is_empty() {
            writeln!(f)?;
            writeln!(f, "Selected components:")?;
            for planned in plan.components() {
                let role = planned.role();
                let shape = plan
                    .styling()
                    .get(&role)
                    .map(|style| style.shape().to_string())
                    .unwrap_or_default();
                writeln!(
                    f,
                    "  - {} ({}): {} as {shape}",
                    planned.component().name(),
                    planned.id(),
                    role.class_name().trim_start_matches("role_"),
                )?;
            }
        }

        if !plan.groups().is_empty() {
            writeln!(f)?;
            writeln!(f, "Groups:")?;
            for group in plan.groups() {
                let members: Vec<&str> = group.members().iter().map(|id| id.as_str()).collect();
                writeln!(f, "  - {}: {}", group.name(), members.join(", "))?;
            }
        }

        if !plan.notes().is_empty() {
            writeln!(f)?;
            writeln!(f, "Model notes:")?;
            for note in plan.notes() {
                writeln!(f, "  - {note}")?;
            }
        }
        Ok(())
    }
}
