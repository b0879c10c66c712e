//! Resource declarations and the dependency graph built from them.
//!
//! A [`ResourceDeclaration`] is the atomic unit of a deployment: one typed,
//! named infrastructure object with a configuration payload. Its dependencies
//! are the union of what it declares explicitly and every declaration its
//! configuration reads an attribute from.
//!
//! ## Example
//!
//! ```rust
//! use stackplan::graph::{ResourceDeclaration, ResourceKind, ResourceRef};
//!
//! let vpc = ResourceRef::new("AppNetwork", "Vpc");
//! let subnet = ResourceDeclaration::new(ResourceKind::Subnet, "PrivateSubnet1")
//!     .with("vpc_id", vpc.attr("VpcId"))
//!     .with("cidr_block", "10.0.128.0/18");
//!
//! assert!(subnet.dependencies().contains(&vpc));
//! ```

pub mod dependencies;
pub mod reference;

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use dependencies::DeclarationGraph;
pub use reference::{AttrRef, ConfigValue, ResourceRef, ValueExpr};

/// Kind of infrastructure object a declaration describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Virtual network address space
    Network,
    /// Public or private subnet of a network
    Subnet,
    /// Network-level traffic filter
    SecurityGroup,
    /// Assumable identity
    Role,
    /// Access statement attached to a role or bucket
    PolicyStatement,
    /// Object storage bucket
    Bucket,
    /// Identity restricting bucket access to a distribution
    AccessIdentity,
    /// Content-delivery distribution
    Distribution,
    /// Reference to a pre-built container image
    ContainerImage,
    /// Managed container-compute service
    ComputeService,
    /// Binding of a compute service to private subnets
    NetworkConnector,
    /// Upload of a local directory into a bucket
    BucketDeployment,
}

impl ResourceKind {
    /// Get the plain string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::Role => "role",
            ResourceKind::PolicyStatement => "policy_statement",
            ResourceKind::Bucket => "bucket",
            ResourceKind::AccessIdentity => "access_identity",
            ResourceKind::Distribution => "distribution",
            ResourceKind::ContainerImage => "container_image",
            ResourceKind::ComputeService => "compute_service",
            ResourceKind::NetworkConnector => "network_connector",
            ResourceKind::BucketDeployment => "bucket_deployment",
        }
    }

    /// Attributes the provisioning backend computes for this kind
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Network => &["VpcId", "CidrBlock"],
            ResourceKind::Subnet => &["SubnetId", "AvailabilityZone"],
            ResourceKind::SecurityGroup => &["GroupId"],
            ResourceKind::Role => &["Arn", "RoleName"],
            ResourceKind::Bucket => &["Arn", "BucketName", "RegionalDomainName", "WebsiteUrl"],
            ResourceKind::AccessIdentity => &["Id", "S3CanonicalUserId"],
            ResourceKind::Distribution => &["Id", "DomainName"],
            ResourceKind::ContainerImage => &["ImageUri", "RepositoryArn"],
            ResourceKind::ComputeService => &["Arn", "ServiceUrl"],
            ResourceKind::NetworkConnector => &["Arn"],
            ResourceKind::PolicyStatement | ResourceKind::BucketDeployment => &[],
        }
    }

    /// Whether the backend exposes `attribute` for this kind
    pub fn exposes(&self, attribute: &str) -> bool {
        self.attributes().contains(&attribute)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One infrastructure object and what it depends on
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    id: String,
    kind: ResourceKind,
    config: IndexMap<String, ConfigValue>,
    depends_on: BTreeSet<ResourceRef>,
}

impl ResourceDeclaration {
    /// Create a declaration with an empty configuration
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            config: IndexMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Set a configuration entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Add an explicit dependency
    pub fn depends_on(mut self, reference: &ResourceRef) -> Self {
        self.depends_on.insert(reference.clone());
        self
    }

    /// Declaration id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declaration kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Configuration payload, in insertion order
    pub fn config(&self) -> &IndexMap<String, ConfigValue> {
        &self.config
    }

    /// Look up one configuration entry
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// Dependencies declared with [`depends_on`](Self::depends_on)
    pub fn explicit_dependencies(&self) -> &BTreeSet<ResourceRef> {
        &self.depends_on
    }

    /// All dependencies: explicit ones plus every declaration the config reads
    pub fn dependencies(&self) -> BTreeSet<ResourceRef> {
        let mut deps = self.depends_on.clone();
        for value in self.config.values() {
            value.referenced_resources(&mut deps);
        }
        deps
    }
}
