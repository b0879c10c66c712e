//! The three stacks of a deployment.
//!
//! - [`network::NetworkStack`]: virtual network split into public and private
//!   subnets
//! - [`compute::ComputeStack`]: managed container service reachable through a
//!   connector into the private subnets
//! - [`static_site::StaticDeliveryStack`]: bucket served only through a
//!   content-delivery distribution
//!
//! Every stack builder takes a [`StackContext`] and returns a
//! [`Built`](crate::stack::Built) stack plus a typed handle consumers read from.

pub mod compute;
pub mod network;
pub mod static_site;

use crate::environment::Environment;

pub use compute::{ComputeServiceHandle, ComputeStack, ComputeStackBuilder};
pub use network::{NetworkStack, NetworkTopology, SubnetRef};
pub use static_site::{DistributionHandle, StaticDeliveryStack};

/// Values every stack is constructed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackContext {
    /// Application name, prefixed to stack and resource names
    pub app_name: String,
    /// Target environment, resolved once per deployment
    pub environment: Environment,
}

impl StackContext {
    /// Create a context
    pub fn new(app_name: impl Into<String>, environment: Environment) -> Self {
        Self {
            app_name: app_name.into(),
            environment,
        }
    }

    /// Name of a stack of this application
    pub fn stack_name(&self, suffix: &str) -> String {
        format!("{}{}", self.app_name, suffix)
    }
}
