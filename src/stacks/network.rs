//! Network stack: one address space, public and private subnet groups.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StackContext;
use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::graph::{ResourceDeclaration, ResourceKind, ResourceRef, ValueExpr};
use crate::stack::{Built, Stack};

/// Smallest subnet the network stack carves out
const MAX_SUBNET_PREFIX: u8 = 28;

/// An IPv4 network in CIDR notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    address: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Network address
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Prefix length
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Split into `count` equally sized blocks, lowest addresses first
    ///
    /// The block size is the smallest power of two that fits `count`, so
    /// trailing address space may stay unused.
    pub fn split(&self, count: usize) -> Result<Vec<Ipv4Cidr>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let bits = usize::BITS - (count - 1).leading_zeros();
        let prefix = u32::from(self.prefix) + if count == 1 { 0 } else { bits };
        if prefix > u32::from(MAX_SUBNET_PREFIX) {
            return Err(Error::invalid_config(
                "cidr",
                format!("{} is too small for {} subnets", self, count),
            ));
        }

        let base = u64::from(u32::from(self.address));
        let size = 1u64 << (32 - prefix);
        Ok((0..count as u64)
            .map(|i| Ipv4Cidr {
                address: Ipv4Addr::from((base + i * size) as u32),
                prefix: prefix as u8,
            })
            .collect())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: &str| Error::invalid_config("cidr", format!("'{}': {}", s, message));

        let (address, prefix) = s
            .split_once('/')
            .ok_or_else(|| invalid("expected <address>/<prefix>"))?;
        let address: Ipv4Addr = address.parse().map_err(|_| invalid("bad address"))?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid("bad prefix"))?;
        if prefix > 32 {
            return Err(invalid("prefix exceeds 32"));
        }

        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        if u32::from(address) & !mask != 0 {
            return Err(invalid("host bits set"));
        }
        Ok(Self { address, prefix })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

/// Handle onto one subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRef {
    /// Declaration address
    pub reference: ResourceRef,
    /// Availability zone the subnet lives in
    pub availability_zone: String,
    /// Address block of the subnet
    pub cidr: String,
}

impl SubnetRef {
    /// Deferred subnet id
    pub fn subnet_id(&self) -> ValueExpr {
        self.reference.attr("SubnetId")
    }
}

/// Read-only view of a built network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTopology {
    /// The network declaration
    pub vpc: ResourceRef,
    /// Public subnets ordered by availability zone
    pub public_subnets: Vec<SubnetRef>,
    /// Private subnets ordered by availability zone
    pub private_subnets: Vec<SubnetRef>,
}

impl NetworkTopology {
    /// Name of the stack owning the network
    pub fn stack_name(&self) -> &str {
        &self.vpc.stack
    }

    /// Deferred network id
    pub fn vpc_id(&self) -> ValueExpr {
        self.vpc.attr("VpcId")
    }

    /// Deferred ids of the private subnets
    pub fn private_subnet_ids(&self) -> Vec<ValueExpr> {
        self.private_subnets.iter().map(SubnetRef::subnet_id).collect()
    }
}

/// Builds the network stack
#[derive(Debug, Clone)]
pub struct NetworkStack {
    context: StackContext,
    config: NetworkConfig,
}

impl NetworkStack {
    /// Create a builder
    pub fn new(context: &StackContext, config: &NetworkConfig) -> Self {
        Self {
            context: context.clone(),
            config: config.clone(),
        }
    }

    /// Declare the network and its subnets
    pub fn build(self) -> Result<Built<NetworkTopology>> {
        let cidr: Ipv4Cidr = self.config.cidr.parse()?;
        let azs = usize::from(self.config.max_azs);
        if azs == 0 {
            return Err(Error::invalid_config("network.max_azs", "must be at least 1"));
        }
        let blocks = cidr.split(azs * 2)?;

        let mut stack = Stack::new(self.context.stack_name("Network"));
        let vpc = stack.declare(
            ResourceDeclaration::new(ResourceKind::Network, "Vpc")
                .with("cidr_block", cidr.to_string())
                .with("enable_dns_hostnames", true)
                .with("enable_dns_support", true),
        )?;

        let zones: Vec<String> = (0..azs)
            .map(|i| availability_zone(self.context.environment.region_or_token(), i))
            .collect();

        let mut public_subnets = Vec::with_capacity(azs);
        let mut private_subnets = Vec::with_capacity(azs);
        for (group, public) in [(&mut public_subnets, true), (&mut private_subnets, false)] {
            let offset = if public { 0 } else { azs };
            let label = if public { "Public" } else { "Private" };
            for (i, zone) in zones.iter().enumerate() {
                let block = blocks[offset + i];
                let id = format!("{}Subnet{}", label, i + 1);
                let reference = stack.declare(
                    ResourceDeclaration::new(ResourceKind::Subnet, id)
                        .with("vpc_id", vpc.attr("VpcId"))
                        .with("cidr_block", block.to_string())
                        .with("availability_zone", zone.as_str())
                        .with("map_public_ip_on_launch", public)
                        .with("subnet_type", label.to_ascii_lowercase()),
                )?;
                group.push(SubnetRef {
                    reference,
                    availability_zone: zone.clone(),
                    cidr: block.to_string(),
                });
            }
        }

        tracing::debug!(
            stack = %stack.name(),
            cidr = %cidr,
            azs,
            "Built network topology"
        );

        Ok(Built {
            stack,
            handle: NetworkTopology {
                vpc,
                public_subnets,
                private_subnets,
            },
        })
    }
}

/// Zone name for index `i` of a region: `us-east-1a`, `us-east-1b`, ...
fn availability_zone(region: &str, index: usize) -> String {
    let letter = char::from(b'a' + (index % 26) as u8);
    format!("{}{}", region, letter)
}
