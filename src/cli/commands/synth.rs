//! Synth command - synthesize the deployment plan
//!
//! Prints the plan as a table of declarations per stack in human mode, or the
//! full plan document in JSON/YAML mode.

use super::CommandContext;
use crate::cli::output::kind_label;
use crate::cli::OutputFormat;
use anyhow::Result;
use clap::Parser;
use stackplan::orchestrator::PathSelection;
use std::path::PathBuf;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone, Default)]
pub struct SynthArgs {
    /// Delivery paths to build
    #[arg(long, value_enum)]
    pub path: Option<PathSelection>,

    /// Write the plan document to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl SynthArgs {
    /// Execute the synth command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let plan = ctx.plan(ctx.selection(self.path))?;

        let document = match ctx.format {
            OutputFormat::Yaml => Some(plan.to_yaml()?),
            OutputFormat::Json => Some(plan.to_json()?),
            OutputFormat::Human if self.out.is_some() => Some(plan.to_json()?),
            OutputFormat::Human => None,
        };
        if let Some(document) = document {
            ctx.emit(&document, self.out.as_deref())?;
            return Ok(0);
        }

        ctx.output.banner(&format!(
            "PLAN {} ({})",
            ctx.config.app_name, plan.environment
        ));

        let position = |id: &str| {
            plan.order
                .iter()
                .position(|o| o == id)
                .map_or_else(String::new, |p| (p + 1).to_string())
        };
        for stack in &plan.stacks {
            ctx.output.section(&stack.name);
            let rows: Vec<Vec<String>> = stack
                .declarations
                .iter()
                .map(|d| {
                    vec![
                        position(&d.id),
                        d.logical_id.clone(),
                        kind_label(d.kind, ctx.output.use_color()),
                        d.depends_on.join(", "),
                    ]
                })
                .collect();
            ctx.output.table(&["#", "Id", "Kind", "Depends on"], &rows);

            for (name, value) in &stack.outputs {
                ctx.output.key_value(name, value);
            }
        }

        ctx.output.success(&format!(
            "\n{} stacks, {} declarations",
            plan.stacks.len(),
            plan.declaration_count()
        ));

        Ok(0)
    }
}
