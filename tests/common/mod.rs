//! Shared test utilities and fixtures for the stackplan test suite.
//!
//! This module provides:
//! - Fixed environments and configurations
//! - Collaborator doubles (image source, asset folders)
//! - Recording and failing provisioning backends
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use stackplan::assets::PrebuiltImage;
use stackplan::backend::{ProvisioningBackend, SubmissionReceipt};
use stackplan::config::Config;
use stackplan::environment::Environment;
use stackplan::error::{Error, Result};
use stackplan::orchestrator::DeploymentOrchestrator;
use stackplan::plan::DeploymentPlan;
use stackplan::stacks::StackContext;

// ============================================================================
// Fixtures
// ============================================================================

/// Account and region of the reference scenario
pub fn test_environment() -> Environment {
    Environment::new("123", "us-east-1")
}

/// Stack context for the `Games` application
pub fn test_context() -> StackContext {
    StackContext::new("Games", test_environment())
}

/// Configuration for the `Games` application
pub fn test_config() -> Config {
    Config {
        app_name: "Games".to_string(),
        ..Config::default()
    }
}

/// A registry image that needs no filesystem
pub fn test_image() -> PrebuiltImage {
    PrebuiltImage::new(
        "123.dkr.ecr.us-east-1.amazonaws.com/games:v1",
        "arn:aws:ecr:us-east-1:123:repository/games",
    )
}

/// Orchestrator wired to the fixtures above
pub fn test_orchestrator(config: Config) -> DeploymentOrchestrator {
    DeploymentOrchestrator::new(config)
        .with_environment(test_environment())
        .with_image_source(test_image())
}

/// A small static site on disk
pub fn site_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("index.html"), "<!doctype html><h1>Games</h1>").unwrap();
    fs::create_dir(dir.path().join("js")).unwrap();
    fs::write(dir.path().join("js/app.js"), "console.log('ok')").unwrap();
    dir
}

/// A directory the container image can be built from
pub fn image_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Dockerfile"), "FROM nginx:alpine\nCOPY . /usr/share/nginx/html\n").unwrap();
    fs::write(dir.path().join("index.html"), "<h1>container</h1>").unwrap();
    dir
}

// ============================================================================
// Backends
// ============================================================================

/// Records how many plans it received
#[derive(Debug, Default)]
pub struct RecordingBackend {
    submissions: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn submit(&self, plan: &DeploymentPlan) -> Result<SubmissionReceipt> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(SubmissionReceipt {
            backend: self.name().to_string(),
            stacks: plan.stacks.len(),
            declarations: plan.declaration_count(),
            files: Vec::new(),
        })
    }
}

/// Rejects every plan
#[derive(Debug, Default)]
pub struct FailingBackend;

#[async_trait]
impl ProvisioningBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn submit(&self, _plan: &DeploymentPlan) -> Result<SubmissionReceipt> {
        Err(Error::backend(self.name(), "quota exceeded", None))
    }
}
