//! Target deployment environment (account and region).
//!
//! Both values are optional. An empty value means "use the ambient default",
//! which the provisioning backend resolves; plan construction renders it as a
//! pseudo token so the plan stays environment-agnostic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Variables consulted, in order, for the account identifier
pub const ACCOUNT_VARS: [&str; 2] = ["STACKPLAN_ACCOUNT", "CDK_DEFAULT_ACCOUNT"];

/// Variables consulted, in order, for the region identifier
pub const REGION_VARS: [&str; 2] = ["STACKPLAN_REGION", "CDK_DEFAULT_REGION"];

/// Pseudo token for an account resolved by the backend
pub const ACCOUNT_TOKEN: &str = "${AWS::AccountId}";

/// Pseudo token for a region resolved by the backend
pub const REGION_TOKEN: &str = "${AWS::Region}";

/// Account and region a deployment targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    /// Account identifier, empty for the ambient default
    #[serde(default)]
    pub account: String,
    /// Region identifier, empty for the ambient default
    #[serde(default)]
    pub region: String,
}

impl Environment {
    /// Create an explicit environment
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Resolve from explicit values, falling back to environment variables
    pub fn resolve(account: Option<&str>, region: Option<&str>) -> Self {
        let account = account
            .map(str::to_string)
            .or_else(|| first_var(&ACCOUNT_VARS))
            .unwrap_or_default();
        let region = region
            .map(str::to_string)
            .or_else(|| first_var(&REGION_VARS))
            .unwrap_or_default();

        tracing::debug!(account = %account, region = %region, "Resolved deployment environment");
        Self { account, region }
    }

    /// Account, or the backend pseudo token when unset
    pub fn account_or_token(&self) -> &str {
        if self.account.is_empty() {
            ACCOUNT_TOKEN
        } else {
            &self.account
        }
    }

    /// Region, or the backend pseudo token when unset
    pub fn region_or_token(&self) -> &str {
        if self.region.is_empty() {
            REGION_TOKEN
        } else {
            &self.region
        }
    }

    /// Whether both values are left to the backend
    pub fn is_agnostic(&self) -> bool {
        self.account.is_empty() && self.region.is_empty()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_or_token(), self.region_or_token())
    }
}

fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}
