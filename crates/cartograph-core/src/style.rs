//! Visual vocabulary shared by the planner, generator and evaluator.
//!
//! # Overview
//!
//! - [`Shape`]: The D2 shapes Cartograph emits for components.
//! - [`SemanticRole`]: The architectural role inferred for a component.
//! - [`VisualStyle`]: Shape plus fill/stroke/font attributes for one role.
//! - [`ConnectionStyle`]: Operator, stroke and arrowhead for one relation kind.
//! - [`Theme`]: Named color palettes selectable from configuration.
//!
//! Connection styles carry a [`ConnectionStyle::signature`] so a reader of the
//! generated text can check that distinct relation kinds stayed visually
//! distinct.

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::color::Color;

/// A D2 shape keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Rectangle,
    Cylinder,
    Person,
    Cloud,
    Queue,
    Page,
    StoredData,
    Hexagon,
    Diamond,
    Oval,
    Package,
}

impl Shape {
    /// The keyword written after `shape:` in D2.
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Rectangle => "rectangle",
            Shape::Cylinder => "cylinder",
            Shape::Person => "person",
            Shape::Cloud => "cloud",
            Shape::Queue => "queue",
            Shape::Page => "page",
            Shape::StoredData => "stored_data",
            Shape::Hexagon => "hexagon",
            Shape::Diamond => "diamond",
            Shape::Oval => "oval",
            Shape::Package => "package",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Architectural role of a component, inferred from its name and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticRole {
    Service,
    Data,
    Interface,
    Actor,
    External,
    Messaging,
    Configuration,
    Storage,
    Security,
    Infrastructure,
    Function,
    Module,
    Component,
}

impl SemanticRole {
    /// Class name used for this role in the generated `classes` block.
    pub fn class_name(self) -> &'static str {
        match self {
            SemanticRole::Service => "role_service",
            SemanticRole::Data => "role_data",
            SemanticRole::Interface => "role_interface",
            SemanticRole::Actor => "role_actor",
            SemanticRole::External => "role_external",
            SemanticRole::Messaging => "role_messaging",
            SemanticRole::Configuration => "role_configuration",
            SemanticRole::Storage => "role_storage",
            SemanticRole::Security => "role_security",
            SemanticRole::Infrastructure => "role_infrastructure",
            SemanticRole::Function => "role_function",
            SemanticRole::Module => "role_module",
            SemanticRole::Component => "role_component",
        }
    }
}

/// Visual attributes applied to every component with a given role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualStyle {
    shape: Shape,
    fill: Color,
    stroke: Color,
    font_color: Color,
    stroke_width: u8,
    border_radius: u8,
    shadow: bool,
}

impl VisualStyle {
    pub fn new(shape: Shape, fill: Color, stroke: Color, font_color: Color) -> Self {
        Self {
            shape,
            fill,
            stroke,
            font_color,
            stroke_width: 2,
            border_radius: 0,
            shadow: false,
        }
    }

    pub fn with_stroke_width(mut self, stroke_width: u8) -> Self {
        self.stroke_width = stroke_width;
        self
    }

    pub fn with_border_radius(mut self, border_radius: u8) -> Self {
        self.border_radius = border_radius;
        self
    }

    pub fn with_shadow(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn fill(&self) -> Color {
        self.fill
    }

    pub fn stroke(&self) -> Color {
        self.stroke
    }

    pub fn font_color(&self) -> Color {
        self.font_color
    }

    pub fn stroke_width(&self) -> u8 {
        self.stroke_width
    }

    pub fn border_radius(&self) -> u8 {
        self.border_radius
    }

    pub fn shadow(&self) -> bool {
        self.shadow
    }
}

/// Connection operator in D2 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowOperator {
    /// `->`
    Directed,
    /// `--`
    Undirected,
}

impl ArrowOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrowOperator::Directed => "->",
            ArrowOperator::Undirected => "--",
        }
    }
}

/// Target arrowhead shapes used by Cartograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrowhead {
    Triangle,
    Arrow,
    Diamond,
}

impl Arrowhead {
    pub fn as_str(self) -> &'static str {
        match self {
            Arrowhead::Triangle => "triangle",
            Arrowhead::Arrow => "arrow",
            Arrowhead::Diamond => "diamond",
        }
    }
}

/// The contracted rendering of one relation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStyle {
    operator: ArrowOperator,
    stroke: Color,
    stroke_width: u8,
    stroke_dash: u8,
    arrowhead: Option<Arrowhead>,
}

impl ConnectionStyle {
    pub fn new(operator: ArrowOperator, stroke: Color, stroke_width: u8) -> Self {
        Self {
            operator,
            stroke,
            stroke_width,
            stroke_dash: 0,
            arrowhead: None,
        }
    }

    pub fn with_stroke_dash(mut self, stroke_dash: u8) -> Self {
        self.stroke_dash = stroke_dash;
        self
    }

    pub fn with_arrowhead(mut self, arrowhead: Arrowhead) -> Self {
        self.arrowhead = Some(arrowhead);
        self
    }

    pub fn operator(&self) -> ArrowOperator {
        self.operator
    }

    pub fn stroke(&self) -> Color {
        self.stroke
    }

    pub fn stroke_width(&self) -> u8 {
        self.stroke_width
    }

    pub fn stroke_dash(&self) -> u8 {
        self.stroke_dash
    }

    pub fn arrowhead(&self) -> Option<Arrowhead> {
        self.arrowhead
    }

    /// Canonical string identifying how this style looks once rendered.
    ///
    /// Two connections with equal signatures are visually indistinguishable.
    pub fn signature(&self) -> String {
        StyleSignature {
            operator: self.operator.as_str(),
            stroke: &self.stroke.to_hex(),
            stroke_width: &self.stroke_width.to_string(),
            stroke_dash: &self.stroke_dash.to_string(),
            arrowhead: self.arrowhead.map(Arrowhead::as_str),
        }
        .to_string()
    }
}

/// Borrowed view used to build style signatures from either a
/// [`ConnectionStyle`] or attributes read back from D2 text.
#[derive(Debug, Clone, Copy)]
pub struct StyleSignature<'a> {
    pub operator: &'a str,
    pub stroke: &'a str,
    pub stroke_width: &'a str,
    pub stroke_dash: &'a str,
    pub arrowhead: Option<&'a str>,
}

impl fmt::Display for StyleSignature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.operator,
            self.stroke.to_ascii_lowercase(),
            self.stroke_width,
            self.stroke_dash,
            self.arrowhead.unwrap_or("none")
        )
    }
}

/// Named color palettes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    ProfessionalBlue,
    EnterpriseGreen,
    ModernPurple,
    TechOrange,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "professional_blue" => Ok(Self::ProfessionalBlue),
            "enterprise_green" => Ok(Self::EnterpriseGreen),
            "modern_purple" => Ok(Self::ModernPurple),
            "tech_orange" => Ok(Self::TechOrange),
            _ => Err(format!("unknown theme `{s}`")),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::ProfessionalBlue => write!(f, "professional_blue"),
            Theme::EnterpriseGreen => write!(f, "enterprise_green"),
            Theme::ModernPurple => write!(f, "modern_purple"),
            Theme::TechOrange => write!(f, "tech_orange"),
        }
    }
}
