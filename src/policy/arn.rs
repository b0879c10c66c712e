//! ARN formatting scoped to a deployment environment.

use crate::environment::Environment;

/// Pieces of an Amazon Resource Name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnComponents {
    /// Service namespace (e.g. `ssm`)
    pub service: String,
    /// Resource type (e.g. `parameter`)
    pub resource: String,
    /// Optional resource name appended after `/`
    pub resource_name: Option<String>,
}

impl ArnComponents {
    /// Regional ARN components
    pub fn new(service: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            resource: resource.into(),
            resource_name: None,
        }
    }

    /// Set the resource name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }
}

/// Format an ARN in the given environment
///
/// Unset account or region render as backend pseudo tokens.
pub fn format(components: &ArnComponents, env: &Environment) -> String {
    let mut arn = format!(
        "arn:aws:{}:{}:{}:{}",
        components.service,
        env.region_or_token(),
        env.account_or_token(),
        components.resource
    );
    if let Some(name) = &components.resource_name {
        arn.push('/');
        arn.push_str(name.trim_start_matches('/'));
    }
    arn
}
