//! Subcommands module for stackplan CLI
//!
//! This module contains all the subcommand implementations.

pub mod deploy;
pub mod graph;
pub mod outputs;
pub mod synth;

use crate::cli::output::OutputFormatter;
use crate::cli::OutputFormat;
use anyhow::Result;
use stackplan::config::Config;
use stackplan::orchestrator::{DeploymentOrchestrator, PathSelection};
use stackplan::plan::DeploymentPlan;
use std::path::Path;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Requested output format
    pub format: OutputFormat,
    /// Verbosity level
    pub verbosity: u8,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.output.color;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            config,
            output,
            format: cli.output,
            verbosity: cli.verbosity(),
        }
    }

    /// Paths to build: the flag if given, the configured default otherwise
    pub fn selection(&self, flag: Option<PathSelection>) -> PathSelection {
        flag.unwrap_or(self.config.deployment.paths)
    }

    /// Orchestrator over the loaded configuration
    pub fn orchestrator(&self) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(self.config.clone())
    }

    /// Synthesize the plan for `selection`
    pub fn plan(&self, selection: PathSelection) -> Result<DeploymentPlan> {
        let orchestrator = self.orchestrator();
        self.output.info(&format!(
            "Planning {:?} for {} in {}",
            selection,
            self.config.app_name,
            orchestrator.environment()
        ));
        Ok(orchestrator.plan(selection)?)
    }

    /// Print `content` or write it to `out`
    pub fn emit(&self, content: &str, out: Option<&Path>) -> Result<()> {
        match out {
            Some(path) => {
                std::fs::write(path, content)?;
                self.output
                    .info(&format!("Wrote {}", path.display()));
            }
            None => {
                print!("{}", content);
                if !content.ends_with('\n') {
                    println!();
                }
                self.output.flush();
            }
        }
        Ok(())
    }
}
