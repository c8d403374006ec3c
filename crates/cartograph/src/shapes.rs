//! Declarative tables for roles, shapes and connection styles.
//!
//! Every heuristic here is a `(predicate, outcome)` table evaluated in
//! order; the first matching row wins. The tables are shared by the
//! planner (roles and role styles), the generator (all of them) and the
//! evaluator (the connection style contract).

use std::sync::LazyLock;

use regex::Regex;

use cartograph_core::{
    color::Color,
    model::{Component, ComponentKind, RelationKind},
    style::{ArrowOperator, Arrowhead, ConnectionStyle, SemanticRole, Shape, Theme, VisualStyle},
};

/// Name patterns assigning a role, most specific first.
const ROLE_PATTERNS: &[(SemanticRole, &str)] = &[
    (
        SemanticRole::External,
        r"(?i)external|third_?party|vendor|partner|remote|foreign",
    ),
    (
        SemanticRole::Security,
        r"(?i)auth|security|permission|access|login|token|credential",
    ),
    (
        SemanticRole::Infrastructure,
        r"(?i)balancer|router|switch|firewall|middleware|filter$",
    ),
    (
        SemanticRole::Messaging,
        r"(?i)queue|worker|task|job|message|event|channel|broker|publisher|subscriber",
    ),
    (
        SemanticRole::Configuration,
        r"(?i)config|settings?$|properties$|environment$|constants?$|defaults?$|options",
    ),
    (
        SemanticRole::Storage,
        r"(?i)cache|store$|buffer$|session|memory",
    ),
    (
        SemanticRole::Data,
        r"(?i)(model|entity|repository|dao|record|table|schema|mapper|database|db)$|^db",
    ),
    (
        SemanticRole::Interface,
        r"(?i)api|endpoint|route|graphql|webhook|interface|gateway|proxy|adapter",
    ),
    (
        SemanticRole::Actor,
        r"(?i)(user|client|customer|actor|participant|owner|member|profile)$",
    ),
    (
        SemanticRole::Service,
        r"(?i)(service|manager|handler|processor|controller|orchestrator|coordinator|engine|facade|builder|factory)$",
    ),
];

static ROLE_RULES: LazyLock<Vec<(SemanticRole, Regex)>> = LazyLock::new(|| {
    ROLE_PATTERNS
        .iter()
        .map(|(role, pattern)| (*role, Regex::new(pattern).expect("role patterns are valid")))
        .collect()
});

static ENTRY_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(main|run|app|application|cli|server|start|entry)")
        .expect("entry point pattern is valid")
});

/// The role whose name pattern matches `name`, if any.
pub fn role_from_name(name: &str) -> Option<SemanticRole> {
    ROLE_RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(name))
        .map(|(role, _)| *role)
}

/// Role of a component: its name pattern, else a default per kind.
pub fn classify(component: &Component) -> SemanticRole {
    role_from_name(component.name()).unwrap_or(match component.kind() {
        ComponentKind::Class => SemanticRole::Component,
        ComponentKind::Function => SemanticRole::Function,
        ComponentKind::Module => SemanticRole::Module,
    })
}

/// `true` for names that look like program entry points (`main`, `App`, ...).
pub fn is_entry_point(name: &str) -> bool {
    ENTRY_POINT.is_match(name)
}

pub fn shape_for(role: SemanticRole) -> Shape {
    match role {
        SemanticRole::Service => Shape::Rectangle,
        SemanticRole::Data => Shape::Cylinder,
        SemanticRole::Interface => Shape::Oval,
        SemanticRole::Actor => Shape::Person,
        SemanticRole::External => Shape::Cloud,
        SemanticRole::Messaging => Shape::Queue,
        SemanticRole::Configuration => Shape::Page,
        SemanticRole::Storage => Shape::StoredData,
        SemanticRole::Security => Shape::Hexagon,
        SemanticRole::Infrastructure => Shape::Diamond,
        SemanticRole::Function => Shape::Rectangle,
        SemanticRole::Module => Shape::Package,
        SemanticRole::Component => Shape::Rectangle,
    }
}

/// Theme colors applied to the neutral roles.
struct Palette {
    primary: &'static str,
    secondary: &'static str,
    neutral_light: &'static str,
    neutral_dark: &'static str,
    text_primary: &'static str,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::ProfessionalBlue => Palette {
            primary: "#1976d2",
            secondary: "#42a5f5",
            neutral_light: "#f5f5f5",
            neutral_dark: "#424242",
            text_primary: "#212529",
        },
        Theme::EnterpriseGreen => Palette {
            primary: "#2e7d32",
            secondary: "#66bb6a",
            neutral_light: "#f1f8e9",
            neutral_dark: "#1b5e20",
            text_primary: "#263238",
        },
        Theme::ModernPurple => Palette {
            primary: "#7b1fa2",
            secondary: "#ba68c8",
            neutral_light: "#f3e5f5",
            neutral_dark: "#4a148c",
            text_primary: "#212121",
        },
        Theme::TechOrange => Palette {
            primary: "#e65100",
            secondary: "#ff9800",
            neutral_light: "#fff3e0",
            neutral_dark: "#e65100",
            text_primary: "#263238",
        },
    }
}

fn color(hex: &str) -> Color {
    Color::new(hex).unwrap_or_default()
}

/// Visual attributes of `role` under `theme`.
///
/// Roles with a strong conventional color (databases, actors, ...) keep it
/// in every theme; services, functions, modules and plain components take
/// the theme palette.
pub fn role_style(role: SemanticRole, theme: Theme) -> VisualStyle {
    let p = palette(theme);
    let style = |shape, fill, stroke, font| {
        VisualStyle::new(shape, color(fill), color(stroke), color(font))
    };
    let shape = shape_for(role);

    match role {
        SemanticRole::Service => style(shape, p.neutral_light, p.primary, p.text_primary)
            .with_stroke_width(2)
            .with_border_radius(8)
            .with_shadow(true),
        SemanticRole::Data => style(shape, "#e3f2fd", "#1976d2", "#0d47a1")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::Interface => style(shape, "#fff3e0", "#f57c00", "#e65100")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::Actor => style(shape, "#ffe0b2", "#ff9800", "#e65100")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::External => {
            style(shape, "#f5f5f5", "#9e9e9e", "#424242").with_stroke_width(2)
        }
        SemanticRole::Messaging => style(shape, "#fff8e1", "#ffc107", "#f57f17")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::Configuration => style(shape, "#f1f8e9", "#689f38", "#33691e")
            .with_stroke_width(1)
            .with_border_radius(3),
        SemanticRole::Storage => style(shape, "#e8f5e8", "#4caf50", "#1b5e20")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::Security => style(shape, "#f3e5f5", "#9c27b0", "#4a148c")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::Infrastructure => style(shape, "#fce4ec", "#e91e63", "#880e4f")
            .with_stroke_width(2)
            .with_shadow(true),
        SemanticRole::Function => style(shape, "#ffffff", p.secondary, p.text_primary)
            .with_stroke_width(1)
            .with_border_radius(4),
        SemanticRole::Module => style(shape, p.neutral_light, p.neutral_dark, p.text_primary)
            .with_stroke_width(1),
        SemanticRole::Component => style(shape, "#ffffff", "#757575", "#424242")
            .with_stroke_width(1)
            .with_border_radius(4),
    }
}

/// The contracted connection style of a relation kind.
pub fn connection_style(kind: RelationKind) -> ConnectionStyle {
    match kind {
        RelationKind::Inherits => ConnectionStyle::new(ArrowOperator::Directed, color("#2196f3"), 2)
            .with_arrowhead(Arrowhead::Triangle),
        RelationKind::Depends => ConnectionStyle::new(ArrowOperator::Directed, color("#4caf50"), 1)
            .with_arrowhead(Arrowhead::Arrow),
        RelationKind::Associates => {
            ConnectionStyle::new(ArrowOperator::Undirected, color("#9e9e9e"), 1).with_stroke_dash(5)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_name() {
        let cases = [
            ("UserService", Some(SemanticRole::Service)),
            ("OrderRepository", Some(SemanticRole::Data)),
            ("PaymentGateway", Some(SemanticRole::Interface)),
            ("Customer", Some(SemanticRole::Actor)),
            ("ExternalBillingApi", Some(SemanticRole::External)),
            ("EventBus", Some(SemanticRole::Messaging)),
            ("AppConfig", Some(SemanticRole::Configuration)),
            ("SessionCache", Some(SemanticRole::Storage)),
            ("AuthToken", Some(SemanticRole::Security)),
            ("LoadBalancer", Some(SemanticRole::Infrastructure)),
            ("Circle", None),
        ];
        for (name, expected) in cases {
            assert_eq!(role_from_name(name), expected, "{name}");
        }
    }

    #[test]
    fn test_classify_falls_back_to_kind() {
        let class = Component::new("c", ComponentKind::Class, "Circle");
        let function = Component::new("f", ComponentKind::Function, "compute_area");
        let module = Component::new("m", ComponentKind::Module, "geometry");
        assert_eq!(classify(&class), SemanticRole::Component);
        assert_eq!(classify(&function), SemanticRole::Function);
        assert_eq!(classify(&module), SemanticRole::Module);
    }

    #[test]
    fn test_entry_point() {
        assert!(is_entry_point("main"));
        assert!(is_entry_point("ApplicationRunner"));
        assert!(!is_entry_point("domain_model"));
    }

    #[test]
    fn test_theme_changes_neutral_roles_only() {
        let blue = role_style(SemanticRole::Service, Theme::ProfessionalBlue);
        let green = role_style(SemanticRole::Service, Theme::EnterpriseGreen);
        assert_ne!(blue.stroke(), green.stroke());

        let blue_db = role_style(SemanticRole::Data, Theme::ProfessionalBlue);
        let green_db = role_style(SemanticRole::Data, Theme::EnterpriseGreen);
        assert_eq!(blue_db, green_db);
        assert_eq!(blue_db.shape(), Shape::Cylinder);
    }

    #[test]
    fn test_connection_styles_are_distinct() {
        let signatures: Vec<String> = RelationKind::ALL
            .iter()
            .map(|&kind| connection_style(kind).signature())
            .collect();
        for (i, a) in signatures.iter().enumerate() {
            for b in &signatures[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            connection_style(RelationKind::Associates).operator(),
            ArrowOperator::Undirected
        );
    }
}
