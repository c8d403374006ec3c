//! Command-line argument definitions for the Cartograph CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, configuration file
//! selection, planner and style overrides, the attempt budget, extra outputs
//! and logging verbosity.

use clap::Parser;

use cartograph::style::Theme;

/// Command-line arguments for the Cartograph diagram tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a structural model (JSON) or a directory of models
    #[arg(help = "Path to the input model file or directory")]
    pub input: String,

    /// Path to the output D2 file, or the output directory in directory mode
    ///
    /// Defaults to `diagram.d2`, or `diagrams` when the input is a directory.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log at debug level, overriding `--log-level`
    #[arg(short, long)]
    pub verbose: bool,

    /// Maximum number of generation attempts per model
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Maximum number of components drawn on the first attempt
    #[arg(long)]
    pub max_components: Option<usize>,

    /// Color theme (professional_blue, enterprise_green, modern_purple, tech_orange)
    #[arg(long)]
    pub theme: Option<Theme>,

    /// Write a `<stem>.report.txt` next to each diagram
    #[arg(long)]
    pub report: bool,

    /// Keep the rendered SVG as `<stem>.svg` next to each diagram
    #[arg(long)]
    pub svg: bool,

    /// Print the planned design for each model without generating diagrams
    #[arg(long)]
    pub preview: bool,
}
