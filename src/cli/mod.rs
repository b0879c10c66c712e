//! CLI module for stackplan
//!
//! This module provides the command-line interface for stackplan,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// stackplan - multi-stack deployment plans for web applications
///
/// Declares a network, a managed container service and a static site
/// distribution, and synthesizes them into one ordered provisioning plan.
#[derive(Parser, Debug, Clone)]
#[command(name = "stackplan")]
#[command(version)]
#[command(about = "Synthesize multi-stack deployment plans", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute; `synth` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
    /// YAML output
    Yaml,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Synthesize the deployment plan
    Synth(commands::synth::SynthArgs),

    /// Synthesize, stage assets and submit the plan to a backend
    Deploy(commands::deploy::DeployArgs),

    /// Render the declaration graph in DOT format
    Graph(commands::graph::GraphArgs),

    /// Show the outputs of the plan
    Outputs(commands::outputs::OutputsArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Directory or file to write (defaults to ./stackplan.toml)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// The subcommand to run, defaulting to `synth` over the configured paths
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Synth(commands::synth::SynthArgs::default()))
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
