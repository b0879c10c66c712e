//! Error types for Stackplan.
//!
//! Every failure in the plan-time taxonomy (cycles, duplicate ids, unresolved
//! cross-stack references, empty policy statements, out-of-order component
//! steps) is detected before anything is handed to a provisioning backend and
//! is fatal to the current run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Stackplan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Stackplan.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// The declaration graph has no valid topological order.
    #[error("Dependency cycle detected between declarations: {}", members.join(" -> "))]
    Cycle {
        /// Declarations participating in the cycle
        members: Vec<String>,
    },

    /// Two declarations in one stack share an id.
    #[error("Declaration '{id}' is declared more than once in stack '{stack}'")]
    DuplicateId {
        /// Owning stack
        stack: String,
        /// Colliding declaration id
        id: String,
    },

    /// A reference was read before its source was published, or points nowhere.
    #[error("Unresolved reference to '{reference}': {reason}")]
    UnresolvedReference {
        /// The reference that could not be resolved
        reference: String,
        /// Why resolution failed
        reason: String,
    },

    // ========================================================================
    // Policy Errors
    // ========================================================================
    /// A policy statement would grant nothing.
    #[error("Refusing to build a policy statement with no {missing}")]
    EmptyStatement {
        /// Which part of the statement is empty ("actions" or "resources")
        missing: &'static str,
    },

    /// A built stack violates an access invariant.
    #[error("Policy violation in stack '{stack}': {message}")]
    PolicyViolation {
        /// Offending stack
        stack: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Stack Errors
    // ========================================================================
    /// A component step ran before the step it depends on.
    #[error("Step '{step}' requires '{prerequisite}' to be built first")]
    DependencyOrder {
        /// Step that was invoked
        step: &'static str,
        /// Missing prerequisite
        prerequisite: &'static str,
    },

    /// Two stacks in one deployment share a name.
    #[error("Stack '{0}' is already part of this deployment")]
    DuplicateStack(String),

    /// Two outputs in one stack share a name.
    #[error("Output '{name}' is declared more than once in stack '{stack}'")]
    DuplicateOutput {
        /// Owning stack
        stack: String,
        /// Output name
        name: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// The static asset collaborator could not stage its directory.
    #[error("Failed to stage static assets from '{path}': {message}")]
    AssetStaging {
        /// Asset directory
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The container image collaborator could not produce a reference.
    #[error("Failed to resolve container image from '{path}': {message}")]
    ImageSource {
        /// Image source directory
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The provisioning backend rejected or failed the plan.
    #[error("Provisioning backend '{backend}' failed: {message}")]
    Backend {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new duplicate id error.
    pub fn duplicate_id(stack: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            stack: stack.into(),
            id: id.into(),
        }
    }

    /// Creates a new unresolved reference error.
    pub fn unresolved(reference: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a new dependency order error.
    pub fn dependency_order(step: &'static str, prerequisite: &'static str) -> Self {
        Self::DependencyOrder { step, prerequisite }
    }

    /// Creates a new invalid config error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new backend error.
    pub fn backend(
        backend: impl Into<String>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
            source,
        }
    }

    /// Returns true if this error means the plan itself is structurally invalid.
    ///
    /// Such errors are never retried.
    pub fn is_plan_error(&self) -> bool {
        matches!(
            self,
            Error::Cycle { .. }
                | Error::DuplicateId { .. }
                | Error::DuplicateStack(_)
                | Error::DuplicateOutput { .. }
                | Error::UnresolvedReference { .. }
                | Error::EmptyStatement { .. }
                | Error::DependencyOrder { .. }
                | Error::PolicyViolation { .. }
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_plan_error() => 2,
            Error::Config(_) | Error::InvalidConfig { .. } => 3,
            Error::AssetStaging { .. } | Error::ImageSource { .. } => 4,
            Error::Backend { .. } => 5,
            _ => 1,
        }
    }
}
