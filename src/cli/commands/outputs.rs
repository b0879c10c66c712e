//! Outputs command - show the user-facing outputs of the plan

use super::CommandContext;
use crate::cli::OutputFormat;
use anyhow::Result;
use clap::Parser;
use indexmap::IndexMap;
use stackplan::orchestrator::PathSelection;

/// Arguments for the outputs command
#[derive(Parser, Debug, Clone)]
pub struct OutputsArgs {
    /// Delivery paths to build
    #[arg(long, value_enum)]
    pub path: Option<PathSelection>,
}

impl OutputsArgs {
    /// Execute the outputs command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let plan = ctx.plan(ctx.selection(self.path))?;

        let mut by_stack: IndexMap<&str, IndexMap<&str, &str>> = IndexMap::new();
        for (stack, name, value) in plan.outputs() {
            by_stack.entry(stack).or_default().insert(name, value);
        }

        match ctx.format {
            OutputFormat::Json => ctx.emit(&serde_json::to_string_pretty(&by_stack)?, None)?,
            OutputFormat::Yaml => ctx.emit(&serde_yaml::to_string(&by_stack)?, None)?,
            OutputFormat::Human => {
                let rows: Vec<Vec<String>> = plan
                    .outputs()
                    .into_iter()
                    .map(|(stack, name, value)| {
                        vec![stack.to_string(), name.to_string(), value.to_string()]
                    })
                    .collect();
                ctx.output.table(&["Stack", "Output", "Value"], &rows);
            }
        }

        Ok(0)
    }
}
