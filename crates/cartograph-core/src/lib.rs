//! Cartograph Core Types and Definitions
//!
//! This crate provides the foundational data records shared by every stage of
//! the Cartograph pipeline. It includes:
//!
//! - **Model**: The structural model produced by an external extractor ([`model`] module)
//! - **Plan**: Diagram plans chosen by the design planner ([`plan`] module)
//! - **Style**: Shapes, visual styles and connection styles ([`style`] module)
//! - **Artifact**: Immutable generated diagram text ([`artifact::DiagramArtifact`])
//! - **Validation**: Renderer verdicts and diagnostics ([`validation`] module)
//! - **Quality**: Metrics, weights and quality reports ([`quality`] module)
//! - **Colors**: Color handling with CSS color support ([`color::Color`])

pub mod artifact;
pub mod color;
pub mod model;
pub mod plan;
pub mod quality;
pub mod style;
pub mod validation;
