//! Compute stack: a managed container service behind the private network.
//!
//! The stack is assembled in six strictly ordered steps. Each step checks that
//! the one before it has run and fails with
//! [`Error::DependencyOrder`](crate::error::Error::DependencyOrder) otherwise,
//! before declaring anything, so a failed build never leaves a partial service
//! in the stack.
//!
//! 1. [`create_security_group`](ComputeStackBuilder::create_security_group)
//! 2. [`create_instance_role`](ComputeStackBuilder::create_instance_role)
//! 3. [`create_image_pull_role`](ComputeStackBuilder::create_image_pull_role)
//! 4. [`reference_image`](ComputeStackBuilder::reference_image)
//! 5. [`create_service`](ComputeStackBuilder::create_service)
//! 6. [`finish`](ComputeStackBuilder::finish)
//!
//! The network must be bound with
//! [`bind_network`](ComputeStackBuilder::bind_network) first, and only a
//! topology whose stack is already published can be bound.

use super::network::NetworkTopology;
use super::StackContext;
use crate::assembly::Assembly;
use crate::assets::ImageReference;
use crate::config::ComputeConfig;
use crate::error::{Error, Result};
use crate::graph::{ConfigValue, ResourceDeclaration, ResourceKind, ResourceRef, ValueExpr};
use crate::policy::statements;
use crate::stack::{Built, Stack};

/// Principal the running service assumes
pub const INSTANCE_PRINCIPAL: &str = "tasks.apprunner.amazonaws.com";

/// Principal that pulls the image on deploy
pub const BUILD_PRINCIPAL: &str = "build.apprunner.amazonaws.com";

/// Name of the service URL output
pub const SERVICE_URL_OUTPUT: &str = "ServiceUrl";

/// Handle onto a built compute stack
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeServiceHandle {
    /// The compute service
    pub service: ResourceRef,
    /// Role assumed by the running service
    pub instance_role: ResourceRef,
    /// Role used to pull the image
    pub image_pull_role: ResourceRef,
    /// Security group of the connector
    pub security_group: ResourceRef,
    /// Connector into the private subnets
    pub connector: ResourceRef,
    /// Container image declaration
    pub image: ResourceRef,
    /// Public service URL
    pub url: ValueExpr,
}

/// Step-by-step builder of the compute stack
#[derive(Debug)]
pub struct ComputeStackBuilder {
    context: StackContext,
    config: ComputeConfig,
    image_source: ImageReference,
    stack: Stack,
    network: Option<NetworkTopology>,
    security_group: Option<ResourceRef>,
    instance_role: Option<ResourceRef>,
    image_pull_role: Option<ResourceRef>,
    image: Option<ResourceRef>,
    connector: Option<ResourceRef>,
    service: Option<ResourceRef>,
    role_policies: Vec<ResourceRef>,
}

impl ComputeStackBuilder {
    /// Start an empty compute stack
    pub fn new(context: &StackContext, config: &ComputeConfig, image: ImageReference) -> Self {
        Self {
            stack: Stack::new(context.stack_name("Compute")),
            context: context.clone(),
            config: config.clone(),
            image_source: image,
            network: None,
            security_group: None,
            instance_role: None,
            image_pull_role: None,
            image: None,
            connector: None,
            service: None,
            role_policies: Vec::new(),
        }
    }

    /// Name of the stack being built
    pub fn stack_name(&self) -> &str {
        self.stack.name()
    }

    /// Bind the network the service runs in
    pub fn bind_network(&mut self, assembly: &Assembly, topology: &NetworkTopology) -> Result<()> {
        if !assembly.is_published(topology.stack_name()) {
            return Err(Error::unresolved(
                &topology.vpc,
                format!(
                    "network stack '{}' must be published before the compute stack reads it",
                    topology.stack_name()
                ),
            ));
        }
        assembly.require(&topology.vpc)?;
        for subnet in &topology.private_subnets {
            assembly.require(&subnet.reference)?;
        }
        if topology.private_subnets.is_empty() {
            return Err(Error::unresolved(
                &topology.vpc,
                "network has no private subnets",
            ));
        }

        self.network = Some(topology.clone());
        Ok(())
    }

    /// Step 1: security group with all outbound and no inbound traffic
    pub fn create_security_group(&mut self) -> Result<ResourceRef> {
        let network = self
            .network
            .as_ref()
            .ok_or_else(|| Error::dependency_order("create_security_group", "bind_network"))?;

        let egress = ConfigValue::map([
            ("protocol", ConfigValue::from("-1")),
            ("cidr_ip", ConfigValue::from("0.0.0.0/0")),
        ]);
        let reference = self.stack.declare(
            ResourceDeclaration::new(ResourceKind::SecurityGroup, "ServiceSecurityGroup")
                .with("vpc_id", network.vpc_id())
                .with(
                    "description",
                    format!("{} compute service", self.context.app_name),
                )
                .with("allow_all_outbound", true)
                .with("egress", ConfigValue::list([egress]))
                .with("ingress", ConfigValue::List(Vec::new())),
        )?;
        self.security_group = Some(reference.clone());
        Ok(reference)
    }

    /// Step 2: role of the running service
    ///
    /// Grants parameter reads below the application namespace and log writes,
    /// nothing else.
    pub fn create_instance_role(&mut self) -> Result<ResourceRef> {
        if self.security_group.is_none() {
            return Err(Error::dependency_order(
                "create_instance_role",
                "create_security_group",
            ));
        }

        let parameters =
            statements::read_parameters_by_path(&self.context.app_name, &self.context.environment)?;
        let logs = statements::write_logs()?;

        let role = self.stack.declare(
            ResourceDeclaration::new(ResourceKind::Role, "InstanceRole")
                .with("assumed_by", INSTANCE_PRINCIPAL),
        )?;
        self.role_policies.push(self.stack.attach(&role, &parameters)?);
        self.role_policies.push(self.stack.attach(&role, &logs)?);

        self.instance_role = Some(role.clone());
        Ok(role)
    }

    /// Step 3: pull-only role for the image repository
    pub fn create_image_pull_role(&mut self) -> Result<ResourceRef> {
        if self.instance_role.is_none() {
            return Err(Error::dependency_order(
                "create_image_pull_role",
                "create_instance_role",
            ));
        }

        let pull =
            statements::pull_image(ValueExpr::literal(&self.image_source.repository_arn))?;
        let login = statements::registry_login()?;

        let role = self.stack.declare(
            ResourceDeclaration::new(ResourceKind::Role, "ImagePullRole")
                .with("role_name", format!("{}ImagePullRole", self.context.app_name))
                .with("assumed_by", BUILD_PRINCIPAL),
        )?;
        self.role_policies.push(self.stack.attach(&role, &pull)?);
        self.role_policies.push(self.stack.attach(&role, &login)?);

        self.image_pull_role = Some(role.clone());
        Ok(role)
    }

    /// Step 4: reference the pre-built container image
    pub fn reference_image(&mut self) -> Result<ResourceRef> {
        let pull_role = self
            .image_pull_role
            .as_ref()
            .ok_or_else(|| Error::dependency_order("reference_image", "create_image_pull_role"))?;

        let mut declaration = ResourceDeclaration::new(ResourceKind::ContainerImage, "Image")
            .with("image_uri", self.image_source.image_uri.as_str())
            .with("asset_hash", self.image_source.asset_hash.as_str())
            .with("repository_arn", self.image_source.repository_arn.as_str())
            .with("access_role_arn", pull_role.attr("Arn"));
        if let Some(directory) = &self.image_source.directory {
            declaration = declaration.with("directory", directory.display().to_string());
        }

        let reference = self.stack.declare(declaration)?;
        self.image = Some(reference.clone());
        Ok(reference)
    }

    /// Step 5: network connector and the service itself
    pub fn create_service(&mut self) -> Result<ResourceRef> {
        let (
            Some(network),
            Some(security_group),
            Some(instance_role),
            Some(pull_role),
            Some(image),
        ) = (
            self.network.as_ref(),
            self.security_group.as_ref(),
            self.instance_role.as_ref(),
            self.image_pull_role.as_ref(),
            self.image.as_ref(),
        ) else {
            return Err(Error::dependency_order("create_service", "reference_image"));
        };

        let subnets = ConfigValue::list(network.private_subnet_ids());
        let connector = ResourceDeclaration::new(ResourceKind::NetworkConnector, "VpcConnector")
            .with(
                "connector_name",
                format!("{}VpcConnector", self.context.app_name),
            )
            .with("subnets", subnets)
            .with(
                "security_groups",
                ConfigValue::list([security_group.attr("GroupId")]),
            );

        let mut service = ResourceDeclaration::new(ResourceKind::ComputeService, "Service")
            .with("service_name", self.context.app_name.as_str())
            .with("cpu", self.config.cpu.as_str())
            .with("memory", self.config.memory.as_str())
            .with(
                "image",
                ConfigValue::map([
                    ("identifier", ConfigValue::from(image.attr("ImageUri"))),
                    ("port", ConfigValue::from(self.config.port)),
                    ("repository_type", ConfigValue::from("ECR")),
                ]),
            )
            .with("access_role_arn", pull_role.attr("Arn"))
            .with("instance_role_arn", instance_role.attr("Arn"))
            .with("egress_type", "VPC");
        for policy in &self.role_policies {
            service = service.depends_on(policy);
        }

        let connector = self.stack.declare(connector)?;
        let service = self
            .stack
            .declare(service.with("vpc_connector_arn", connector.attr("Arn")))?;

        self.connector = Some(connector);
        self.service = Some(service.clone());
        Ok(service)
    }

    /// Step 6: declare the URL output and hand the stack over
    pub fn finish(mut self) -> Result<Built<ComputeServiceHandle>> {
        let (
            Some(service),
            Some(instance_role),
            Some(image_pull_role),
            Some(security_group),
            Some(connector),
            Some(image),
        ) = (
            self.service.take(),
            self.instance_role.take(),
            self.image_pull_role.take(),
            self.security_group.take(),
            self.connector.take(),
            self.image.take(),
        ) else {
            return Err(Error::dependency_order("finish", "create_service"));
        };

        let url = ValueExpr::https(service.attr("ServiceUrl"));
        self.stack.add_output(SERVICE_URL_OUTPUT, url.clone())?;

        tracing::debug!(
            stack = %self.stack.name(),
            declarations = self.stack.declarations().len(),
            "Built compute stack"
        );

        Ok(Built {
            stack: self.stack,
            handle: ComputeServiceHandle {
                service,
                instance_role,
                image_pull_role,
                security_group,
                connector,
                image,
                url,
            },
        })
    }
}

/// Builds the compute stack in one call
pub struct ComputeStack;

impl ComputeStack {
    /// Run every step against a published network
    pub fn build(
        context: &StackContext,
        config: &ComputeConfig,
        assembly: &Assembly,
        topology: &NetworkTopology,
        image: ImageReference,
    ) -> Result<Built<ComputeServiceHandle>> {
        let mut builder = ComputeStackBuilder::new(context, config, image);
        builder.bind_network(assembly, topology)?;
        builder.create_security_group()?;
        builder.create_instance_role()?;
        builder.create_image_pull_role()?;
        builder.reference_image()?;
        builder.create_service()?;
        builder.finish()
    }
}
