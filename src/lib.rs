//! # stackplan - Multi-Stack Deployment Plans
//!
//! stackplan declares the infrastructure of a web application as a small set of
//! stacks and synthesizes them into one deterministic, dependency-ordered
//! provisioning plan. Two independent delivery paths are supported: a managed
//! container service behind a private network, and a static site served from a
//! private bucket through a content-delivery distribution.
//!
//! ## Core Concepts
//!
//! - **Declarations**: typed, named infrastructure objects with a configuration
//!   payload; reading another declaration's attribute makes it a dependency
//! - **Stacks**: named groups of declarations with user-facing outputs
//! - **Assembly**: published stacks; a stack may only read from stacks
//!   published before it
//! - **Policies**: least-privilege statements attached to roles and buckets
//! - **Plan**: every declaration of every stack in provisioning order, with
//!   references rendered as `${stack/id.Attribute}` tokens
//! - **Backends**: receive the finished plan
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                             │
//! │                    (clap-based command parsing)                     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Deployment Orchestrator                        │
//! │          (environment resolution, path selection, staging)          │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │  NetworkStack   │──▶│    ComputeStack     │   │ StaticDeliveryStack │
//! │ (vpc, subnets)  │   │ (roles, connector,  │   │ (bucket, identity,  │
//! │                 │   │  service)           │   │  distribution)      │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!          │                         │                         │
//!          └─────────────────────────┼─────────────────────────┘
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Assembly + Declaration Graph                        │
//! │        (publish barrier, cycle detection, topological order)        │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   Provisioning Backend (async)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use stackplan::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = Config::load(None)?;
//! let orchestrator = DeploymentOrchestrator::new(config);
//!
//! let outcome = orchestrator
//!     .run(PathSelection::Both, &DryRunBackend::new())
//!     .await?;
//!
//! if let Some(url) = &outcome.service_url {
//!     println!("service: {}", url);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.
    //!
    //! # Example
    //!
    //! ```rust
    //! use stackplan::prelude::*;
    //!
    //! let mut stack = Stack::new("AppNetwork");
    //! let vpc = stack
    //!     .declare(ResourceDeclaration::new(ResourceKind::Network, "Vpc"))
    //!     .unwrap();
    //! assert_eq!(vpc.qualified(), "AppNetwork/Vpc");
    //! ```

    // Errors
    pub use crate::error::{Error, Result};

    // Declarations
    pub use crate::graph::{
        ConfigValue, DeclarationGraph, ResourceDeclaration, ResourceKind, ResourceRef, ValueExpr,
    };

    // Stacks and synthesis
    pub use crate::assembly::Assembly;
    pub use crate::plan::{DeploymentPlan, PlannedDeclaration, PlannedStack};
    pub use crate::stack::{Built, Stack};
    pub use crate::stacks::{
        ComputeServiceHandle, ComputeStack, ComputeStackBuilder, DistributionHandle,
        NetworkStack, NetworkTopology, StackContext, StaticDeliveryStack,
    };

    // Policies
    pub use crate::policy::{grant, Effect, PolicyDocument, PolicyStatement, Principal, StatementBuilder};

    // Orchestration
    pub use crate::assets::{
        DirectoryImageAsset, ImageReference, ImageSource, LocalAssetDirectory, PrebuiltImage,
        StaticAssets,
    };
    pub use crate::backend::{DryRunBackend, PlanDirectoryBackend, ProvisioningBackend};
    pub use crate::config::Config;
    pub use crate::environment::Environment;
    pub use crate::orchestrator::{DeploymentOrchestrator, PathSelection};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for stackplan operations.
///
/// Plan-time failures (cycles, duplicate ids, unresolved references, empty
/// statements, out-of-order steps) are fatal and are raised before any backend
/// call.
pub mod error;

/// Resource declarations, deferred references and the dependency graph.
pub mod graph;

/// Target account and region.
pub mod environment;

/// Least-privilege policy statements and documents.
pub mod policy;

// ============================================================================
// Stacks and Synthesis
// ============================================================================

/// Stacks: named groups of declarations with outputs.
pub mod stack;

/// The network, compute and static delivery stacks.
pub mod stacks;

/// Published stacks and plan synthesis.
pub mod assembly;

/// The synthesized deployment plan.
pub mod plan;

// ============================================================================
// Orchestration
// ============================================================================

/// Container image and static asset collaborators.
pub mod assets;

/// Provisioning backends.
pub mod backend;

/// Runs the selected delivery paths end to end.
pub mod orchestrator;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration management for stackplan behavior.
///
/// Handles loading and merging configuration from config files and
/// environment variables.
pub mod config;

pub use error::{Error, Result};

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of stackplan.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
