//! Deployment orchestration.
//!
//! The [`DeploymentOrchestrator`] resolves the environment once, builds the
//! stacks of the selected delivery paths in dependency order, publishes each
//! into one [`Assembly`], synthesizes the plan and hands it to a
//! [`ProvisioningBackend`]. Everything up to the backend call is synchronous
//! and free of side effects; any error aborts the run before submission.
//!
//! ```text
//!   container path:  NetworkStack ──publish──▶ ComputeStack ──publish──┐
//!                                                                      ├──▶ synthesize ──▶ backend
//!   static path:     StaticDeliveryStack ─────────────────publish─────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::assembly::Assembly;
use crate::assets::{DirectoryImageAsset, ImageSource, LocalAssetDirectory, StagedAssets, StaticAssets};
use crate::backend::{ProvisioningBackend, SubmissionReceipt};
use crate::config::Config;
use crate::environment::Environment;
use crate::error::Result;
use crate::plan::DeploymentPlan;
use crate::stacks::compute::SERVICE_URL_OUTPUT;
use crate::stacks::static_site::DISTRIBUTION_DOMAIN_OUTPUT;
use crate::stacks::{ComputeStack, NetworkStack, StackContext, StaticDeliveryStack};

/// One of the two independent delivery paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPath {
    /// Network and managed container service
    Container,
    /// Bucket behind a content-delivery distribution
    Static,
}

/// Which delivery paths a run builds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PathSelection {
    /// Container path only
    #[default]
    Container,
    /// Static path only
    Static,
    /// Both paths
    Both,
}

impl PathSelection {
    /// Selected paths, container first
    pub fn paths(&self) -> Vec<DeliveryPath> {
        match self {
            PathSelection::Container => vec![DeliveryPath::Container],
            PathSelection::Static => vec![DeliveryPath::Static],
            PathSelection::Both => vec![DeliveryPath::Container, DeliveryPath::Static],
        }
    }

    /// Whether `path` is selected
    pub fn includes(&self, path: DeliveryPath) -> bool {
        self.paths().contains(&path)
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    /// The submitted plan
    pub plan: DeploymentPlan,
    /// Backend receipt
    pub receipt: SubmissionReceipt,
    /// Staged static assets, if the static path ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<StagedAssets>,
    /// Compute service URL, if the container path ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    /// Distribution domain, if the static path ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_domain: Option<String>,
}

/// Builds and submits deployment plans
#[derive(Debug)]
pub struct DeploymentOrchestrator {
    config: Config,
    environment: Environment,
    image_source: Box<dyn ImageSource>,
    assets: Box<dyn StaticAssets>,
}

impl DeploymentOrchestrator {
    /// Create an orchestrator with directory-backed collaborators
    pub fn new(config: Config) -> Self {
        let environment = Environment::resolve(
            config.environment.account.as_deref(),
            config.environment.region.as_deref(),
        );
        Self {
            image_source: Box::new(DirectoryImageAsset::new(&config.compute.image_dir)),
            assets: Box::new(LocalAssetDirectory::new(&config.static_site.asset_path)),
            environment,
            config,
        }
    }

    /// Replace the resolved environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Replace the container image collaborator
    pub fn with_image_source(mut self, source: impl ImageSource + 'static) -> Self {
        self.image_source = Box::new(source);
        self
    }

    /// Replace the static asset collaborator
    pub fn with_static_assets(mut self, assets: impl StaticAssets + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    /// Environment every stack is built for
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build and publish the selected stacks
    pub fn assemble(&self, selection: PathSelection) -> Result<Assembly> {
        let context = StackContext::new(&self.config.app_name, self.environment.clone());
        let mut assembly = Assembly::new(self.environment.clone());

        if selection.includes(DeliveryPath::Container) {
            tracing::info!(image = %self.image_source.describe(), "Building container path");
            let network = NetworkStack::new(&context, &self.config.network).build()?;
            assembly.publish(network.stack)?;

            let image = self
                .image_source
                .resolve(&self.config.app_name, &self.environment)?;
            let compute = ComputeStack::build(
                &context,
                &self.config.compute,
                &assembly,
                &network.handle,
                image,
            )?;
            assembly.publish(compute.stack)?;
        }

        if selection.includes(DeliveryPath::Static) {
            tracing::info!(assets = %self.assets.location(), "Building static path");
            let site = StaticDeliveryStack::new(&context, &self.config.static_site)
                .build(&self.assets.location())?;
            assembly.publish(site.stack)?;
        }

        Ok(assembly)
    }

    /// Synthesize the plan for `selection` without submitting it
    pub fn plan(&self, selection: PathSelection) -> Result<DeploymentPlan> {
        tracing::info!(
            app = %self.config.app_name,
            environment = %self.environment,
            ?selection,
            "Planning deployment"
        );
        self.assemble(selection)?.synthesize()
    }

    /// Plan, stage assets and submit to `backend`
    pub async fn run(
        &self,
        selection: PathSelection,
        backend: &dyn ProvisioningBackend,
    ) -> Result<DeploymentOutcome> {
        let plan = self.plan(selection)?;

        let assets = if selection.includes(DeliveryPath::Static) {
            Some(self.assets.stage()?)
        } else {
            None
        };

        tracing::info!(backend = backend.name(), "Submitting plan");
        let receipt = backend.submit(&plan).await?;

        Ok(DeploymentOutcome {
            service_url: plan.output(SERVICE_URL_OUTPUT).map(String::from),
            distribution_domain: plan.output(DISTRIBUTION_DOMAIN_OUTPUT).map(String::from),
            assets,
            receipt,
            plan,
        })
    }
}
