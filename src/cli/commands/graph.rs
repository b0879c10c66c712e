//! Graph command - render the declaration graph
//!
//! Emits DOT with one cluster per stack; pipe into `dot -Tsvg` to view.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use stackplan::orchestrator::PathSelection;
use std::path::PathBuf;

/// Arguments for the graph command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Delivery paths to build
    #[arg(long, value_enum)]
    pub path: Option<PathSelection>,

    /// Write the DOT document to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl GraphArgs {
    /// Execute the graph command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let plan = ctx.plan(ctx.selection(self.path))?;
        ctx.emit(&plan.to_dot()?, self.out.as_deref())?;
        Ok(0)
    }
}
