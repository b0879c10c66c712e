//! Provisioning backends.
//!
//! A backend receives a finished [`DeploymentPlan`] and is the only
//! asynchronous part of a run. Its errors are returned to the caller as they
//! are.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::PlanFormat;
use crate::error::{Error, Result};
use crate::plan::DeploymentPlan;

/// What a backend reports after accepting a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    /// Backend name
    pub backend: String,
    /// Number of stacks submitted
    pub stacks: usize,
    /// Number of declarations submitted
    pub declarations: usize,
    /// Files written, if the backend writes any
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

impl SubmissionReceipt {
    fn for_plan(backend: &str, plan: &DeploymentPlan) -> Self {
        Self {
            backend: backend.to_string(),
            stacks: plan.stacks.len(),
            declarations: plan.declaration_count(),
            files: Vec::new(),
        }
    }
}

/// Accepts synthesized plans for provisioning
#[async_trait]
pub trait ProvisioningBackend: Send + Sync + Debug {
    /// Backend name used in logs and errors
    fn name(&self) -> &str;

    /// Hand the plan over
    async fn submit(&self, plan: &DeploymentPlan) -> Result<SubmissionReceipt>;
}

/// Logs the plan and accepts it without side effects
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend;

impl DryRunBackend {
    /// Create a dry-run backend
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvisioningBackend for DryRunBackend {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn submit(&self, plan: &DeploymentPlan) -> Result<SubmissionReceipt> {
        for stack in &plan.stacks {
            tracing::info!(
                stack = %stack.name,
                declarations = stack.declarations.len(),
                outputs = stack.outputs.len(),
                "Dry run: stack accepted"
            );
        }
        Ok(SubmissionReceipt::for_plan(self.name(), plan))
    }
}

/// Writes the plan and one file per stack into a directory
#[derive(Debug, Clone)]
pub struct PlanDirectoryBackend {
    out_dir: PathBuf,
    format: PlanFormat,
}

impl PlanDirectoryBackend {
    /// Create a backend writing into `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>, format: PlanFormat) -> Self {
        Self {
            out_dir: out_dir.into(),
            format,
        }
    }

    /// Target directory
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self.format {
            PlanFormat::Json => serde_json::to_string_pretty(value)?,
            PlanFormat::Yaml => serde_yaml::to_string(value)?,
        })
    }

    async fn write(&self, file_name: String, content: String) -> Result<PathBuf> {
        let path = self.out_dir.join(file_name);
        tokio::fs::write(&path, content).await.map_err(|e| {
            Error::backend(
                self.name(),
                format!("failed to write {}", path.display()),
                Some(Box::new(e)),
            )
        })?;
        tracing::debug!(path = %path.display(), "Wrote plan file");
        Ok(path)
    }
}

#[async_trait]
impl ProvisioningBackend for PlanDirectoryBackend {
    fn name(&self) -> &str {
        "plan-directory"
    }

    async fn submit(&self, plan: &DeploymentPlan) -> Result<SubmissionReceipt> {
        tokio::fs::create_dir_all(&self.out_dir).await.map_err(|e| {
            Error::backend(
                self.name(),
                format!("failed to create {}", self.out_dir.display()),
                Some(Box::new(e)),
            )
        })?;

        let extension = self.format.extension();
        let mut receipt = SubmissionReceipt::for_plan(self.name(), plan);
        receipt
            .files
            .push(self.write(format!("plan.{}", extension), self.render(plan)?).await?);
        for stack in &plan.stacks {
            let path = self
                .write(format!("{}.{}", stack.name, extension), self.render(stack)?)
                .await?;
            receipt.files.push(path);
        }

        tracing::info!(
            out_dir = %self.out_dir.display(),
            files = receipt.files.len(),
            "Plan written"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::plan::PlannedStack;
    use indexmap::IndexMap;

    fn plan() -> DeploymentPlan {
        DeploymentPlan {
            environment: Environment::new("123", "us-east-1"),
            stacks: vec![PlannedStack {
                name: "AppNetwork".to_string(),
                declarations: vec![],
                outputs: IndexMap::new(),
            }],
            order: vec![],
        }
    }

    #[tokio::test]
    async fn test_dry_run() {
        let receipt = DryRunBackend::new().submit(&plan()).await.unwrap();
        assert_eq!(receipt.backend, "dry-run");
        assert_eq!(receipt.stacks, 1);
        assert!(receipt.files.is_empty());
    }

    #[tokio::test]
    async fn test_plan_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("out");
        let backend = PlanDirectoryBackend::new(&out, PlanFormat::Yaml);

        let receipt = backend.submit(&plan()).await.unwrap();
        assert_eq!(
            receipt.files,
            vec![out.join("plan.yaml"), out.join("AppNetwork.yaml")]
        );
        let written = std::fs::read_to_string(out.join("plan.yaml")).unwrap();
        assert!(written.contains("AppNetwork"));
    }
}
