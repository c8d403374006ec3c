//! Configuration types for the Cartograph pipeline.
//!
//! All sections implement [`serde::Deserialize`] with every field defaulted,
//! so a configuration file only needs the values it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining every section.
//! - [`WorkflowConfig`] - Attempt budget and acceptance policy of the loop.
//! - [`PlannerConfig`] - Bounds on the number of selected components.
//! - [`QualityConfig`] - Metric weights and evaluator thresholds.
//! - [`RendererConfig`] - How the external `d2` tool is invoked.
//! - [`StyleConfig`] - Theme and background color of generated diagrams.
//!
//! # Example
//!
//! ```
//! # use cartograph::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.workflow().max_attempts(), 3);
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use cartograph_core::{
    color::Color,
    quality::{MetricWeights, WeightsError},
    style::Theme,
};

/// Invariant violations found by [`AppConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("workflow.max_attempts must be at least 1")]
    NoAttempts,

    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("planner.min_components ({min}) must be between 1 and planner.max_components ({max})")]
    ComponentBounds { min: usize, max: usize },

    #[error("quality.readability_cap must be at least 1")]
    ReadabilityCap,

    #[error("quality.max_connections_per_component must be positive, got {0}")]
    ConnectionThreshold(f64),

    #[error("quality.weights: {0}")]
    Weights(#[from] WeightsError),

    #[error("renderer.executable must not be empty")]
    EmptyExecutable,

    #[error("renderer.timeout_secs must be at least 1")]
    ZeroTimeout,

    #[error("style.background_color: {0}")]
    BackgroundColor(String),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    workflow: WorkflowConfig,

    #[serde(default)]
    planner: PlannerConfig,

    #[serde(default)]
    quality: QualityConfig,

    #[serde(default)]
    renderer: RendererConfig,

    #[serde(default)]
    style: StyleConfig,
}

impl AppConfig {
    pub fn workflow(&self) -> &WorkflowConfig {
        &self.workflow
    }

    pub fn planner(&self) -> &PlannerConfig {
        &self.planner
    }

    pub fn quality(&self) -> &QualityConfig {
        &self.quality
    }

    pub fn renderer(&self) -> &RendererConfig {
        &self.renderer
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn with_workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    /// Checks every cross-field invariant of the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, section by section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.workflow.validate()?;
        self.planner.validate()?;
        self.quality.validate()?;
        self.renderer.validate()?;
        self.style.background_color()?;
        Ok(())
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

/// Attempt budget and acceptance policy of the loop controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Maximum number of generation cycles.
    max_attempts: usize,

    /// Overall score at or above which an artifact is accepted.
    acceptance_threshold: f64,

    /// Lowest overall score a degraded result may have.
    min_degraded_score: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            acceptance_threshold: 0.65,
            min_degraded_score: 0.0,
        }
    }
}

impl WorkflowConfig {
    pub fn new(max_attempts: usize, acceptance_threshold: f64, min_degraded_score: f64) -> Self {
        Self {
            max_attempts,
            acceptance_threshold,
            min_degraded_score,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn acceptance_threshold(&self) -> f64 {
        self.acceptance_threshold
    }

    pub fn min_degraded_score(&self) -> f64 {
        self.min_degraded_score
    }

    /// Replaces the attempt budget, keeping the thresholds.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        check_unit("workflow.acceptance_threshold", self.acceptance_threshold)?;
        check_unit("workflow.min_degraded_score", self.min_degraded_score)
    }
}

/// Bounds on the component selection of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Cap of the first attempt.
    max_components: usize,

    /// Floor that retry hints never lower the cap below.
    min_components: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_components: 15,
            min_components: 3,
        }
    }
}

impl PlannerConfig {
    pub fn new(max_components: usize, min_components: usize) -> Self {
        Self {
            max_components,
            min_components,
        }
    }

    pub fn max_components(&self) -> usize {
        self.max_components
    }

    pub fn min_components(&self) -> usize {
        self.min_components
    }

    /// Replaces the first-attempt cap, keeping the floor.
    pub fn with_max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_components == 0 || self.min_components > self.max_components {
            return Err(ConfigError::ComponentBounds {
                min: self.min_components,
                max: self.max_components,
            });
        }
        Ok(())
    }
}

/// Weights and thresholds of the quality evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    weights: MetricWeights,

    /// Metrics scoring below this get a suggestion.
    suggestion_threshold: f64,

    /// Readability's own suggestion threshold.
    readability_suggestion_threshold: f64,

    /// Component count above which readability is penalised.
    readability_cap: usize,

    /// Connections per component above which readability is penalised.
    max_connections_per_component: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            weights: MetricWeights::default(),
            suggestion_threshold: 0.7,
            readability_suggestion_threshold: 0.6,
            readability_cap: 15,
            max_connections_per_component: 3.0,
        }
    }
}

impl QualityConfig {
    pub fn weights(&self) -> &MetricWeights {
        &self.weights
    }

    pub fn suggestion_threshold(&self) -> f64 {
        self.suggestion_threshold
    }

    pub fn readability_suggestion_threshold(&self) -> f64 {
        self.readability_suggestion_threshold
    }

    pub fn readability_cap(&self) -> usize {
        self.readability_cap
    }

    pub fn max_connections_per_component(&self) -> f64 {
        self.max_connections_per_component
    }

    pub fn with_weights(mut self, weights: MetricWeights) -> Self {
        self.weights = weights;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        check_unit("quality.suggestion_threshold", self.suggestion_threshold)?;
        check_unit(
            "quality.readability_suggestion_threshold",
            self.readability_suggestion_threshold,
        )?;
        if self.readability_cap == 0 {
            return Err(ConfigError::ReadabilityCap);
        }
        if !(self.max_connections_per_component.is_finite()
            && self.max_connections_per_component > 0.0)
        {
            return Err(ConfigError::ConnectionThreshold(
                self.max_connections_per_component,
            ));
        }
        Ok(())
    }
}

/// How the external renderer is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Program name or path of the `d2` executable.
    executable: String,

    timeout_secs: u64,

    /// Extra arguments placed before the input and output paths.
    args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            executable: "d2".to_string(),
            timeout_secs: 30,
            args: Vec::new(),
        }
    }
}

impl RendererConfig {
    pub fn new(executable: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            executable: executable.into(),
            timeout_secs,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.executable.trim().is_empty() {
            return Err(ConfigError::EmptyExecutable);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Visual styling configuration for generated diagrams.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    theme: Theme,

    /// Diagram background as a CSS color string.
    #[serde(default)]
    background_color: Option<String>,
}

impl StyleConfig {
    pub fn new(theme: Theme, background_color: Option<String>) -> Self {
        Self {
            theme,
            background_color,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Returns the parsed background [`Color`], or `None` if no color is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BackgroundColor`] if the configured string is
    /// not a valid CSS color.
    pub fn background_color(&self) -> Result<Option<Color>, ConfigError> {
        self.background_color
            .as_deref()
            .map(Color::new)
            .transpose()
            .map_err(ConfigError::BackgroundColor)
    }
}
