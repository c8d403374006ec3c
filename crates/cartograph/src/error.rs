//! Error types for Cartograph operations.
//!
//! This module provides the main error type [`CartographError`] which wraps
//! the error conditions of loading models, configuration and diagram text.
//! Workflow outcomes (a failed or degraded run) are *not* errors; they are
//! reported through [`crate::workflow::Outcome`].

use std::io;

use thiserror::Error;

use cartograph_parser::error::ParseError;

use crate::config::ConfigError;

/// The main error type for Cartograph operations.
///
/// # Diagnostic Variants
///
/// `Model` and `Parse` keep the source text they failed on so callers can
/// render labelled snippets pointing at the offending span.
#[derive(Debug, Error)]
pub enum CartographError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid structural model: {err}")]
    Model { err: serde_json::Error, src: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{err}")]
    Parse { err: ParseError, src: String },
}

impl CartographError {
    /// Create a new `Model` error with the JSON text that failed to load.
    pub fn new_model_error(err: serde_json::Error, src: impl Into<String>) -> Self {
        Self::Model {
            err,
            src: src.into(),
        }
    }

    /// Create a new `Parse` error with the associated D2 source.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}
