//! Deploy command - synthesize and submit the plan
//!
//! Builds the plan, stages the static assets if the static path is selected,
//! and hands the plan to the configured backend. No backend call happens if
//! any of the earlier steps fails.

use super::CommandContext;
use crate::cli::OutputFormat;
use anyhow::Result;
use clap::Parser;
use stackplan::backend::{DryRunBackend, PlanDirectoryBackend, ProvisioningBackend};
use stackplan::config::{BackendKind, PlanFormat};
use stackplan::orchestrator::PathSelection;
use std::path::PathBuf;

/// Arguments for the deploy command
#[derive(Parser, Debug, Clone)]
pub struct DeployArgs {
    /// Delivery paths to build
    #[arg(long, value_enum)]
    pub path: Option<PathSelection>,

    /// Log the plan instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Directory the plan is written into
    #[arg(long, env = "STACKPLAN_OUT_DIR")]
    pub out_dir: Option<PathBuf>,

    /// Format of written plan files
    #[arg(long, value_enum)]
    pub format: Option<PlanFormat>,
}

impl DeployArgs {
    fn backend(&self, ctx: &CommandContext) -> Box<dyn ProvisioningBackend> {
        let deployment = &ctx.config.deployment;
        if self.dry_run || deployment.backend == BackendKind::DryRun {
            return Box::new(DryRunBackend::new());
        }
        Box::new(PlanDirectoryBackend::new(
            self.out_dir.clone().unwrap_or_else(|| deployment.out_dir.clone()),
            self.format.unwrap_or(deployment.format),
        ))
    }

    /// Execute the deploy command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let selection = ctx.selection(self.path);
        let backend = self.backend(ctx);
        let orchestrator = ctx.orchestrator();

        if ctx.config.static_site.destructive_teardown && selection != PathSelection::Container {
            ctx.output
                .warning("Destructive teardown is enabled for the static site bucket");
        }

        ctx.output.info(&format!(
            "Deploying {:?} for {} in {} via {}",
            selection,
            ctx.config.app_name,
            orchestrator.environment(),
            backend.name()
        ));
        let outcome = orchestrator.run(selection, backend.as_ref()).await?;

        match ctx.format {
            OutputFormat::Json => ctx.emit(&serde_json::to_string_pretty(&outcome)?, None)?,
            OutputFormat::Yaml => ctx.emit(&serde_yaml::to_string(&outcome)?, None)?,
            OutputFormat::Human => {
                ctx.output.banner(&format!("DEPLOY {}", ctx.config.app_name));
                ctx.output.key_value("backend", &outcome.receipt.backend);
                ctx.output
                    .key_value("stacks", &outcome.receipt.stacks.to_string());
                ctx.output.key_value(
                    "declarations",
                    &outcome.receipt.declarations.to_string(),
                );
                for file in &outcome.receipt.files {
                    ctx.output.key_value("wrote", &file.display().to_string());
                }
                if let Some(assets) = &outcome.assets {
                    ctx.output.key_value(
                        "assets",
                        &format!("{} files, {} bytes", assets.files.len(), assets.total_bytes),
                    );
                }

                ctx.output.section("Outputs");
                if let Some(url) = &outcome.service_url {
                    ctx.output.key_value("ServiceUrl", url);
                }
                if let Some(domain) = &outcome.distribution_domain {
                    ctx.output.key_value("DistributionDomain", domain);
                }
                ctx.output.success("\nPlan submitted.");
            }
        }

        Ok(0)
    }
}
