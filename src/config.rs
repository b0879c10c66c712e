//! Configuration module for stackplan
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/stackplan/stackplan.toml)
//! - User configuration (~/.stackplan.toml)
//! - Project configuration (./stackplan.toml)
//! - Environment variables
//!
//! Later sources win. Files are merged key by key, so a project file only
//! needs to name the settings it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::orchestrator::PathSelection;
use crate::stacks::network::Ipv4Cidr;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name, prefixed to every stack and named resource
    pub app_name: String,

    /// Target account and region
    pub environment: EnvironmentConfig,

    /// Which delivery paths to build and where plans go
    pub deployment: DeploymentConfig,

    /// Network stack settings
    pub network: NetworkConfig,

    /// Compute stack settings
    pub compute: ComputeConfig,

    /// Static delivery stack settings
    pub static_site: StaticSiteConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "WebApp".to_string(),
            environment: EnvironmentConfig::default(),
            deployment: DeploymentConfig::default(),
            network: NetworkConfig::default(),
            compute: ComputeConfig::default(),
            static_site: StaticSiteConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Target environment; unset values fall back to the ambient variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Account id
    pub account: Option<String>,
    /// Region name
    pub region: Option<String>,
}

/// Where plans are written on deploy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Log the plan and accept it
    DryRun,
    /// Write the plan into `deployment.out_dir`
    #[default]
    Directory,
}

/// Serialization format of written plans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlanFormat {
    /// Pretty JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl PlanFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            PlanFormat::Json => "json",
            PlanFormat::Yaml => "yaml",
        }
    }
}

/// Deployment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Delivery paths built when none is given on the command line
    pub paths: PathSelection,
    /// Provisioning backend used by `deploy`
    pub backend: BackendKind,
    /// Output directory of the directory backend
    pub out_dir: PathBuf,
    /// Format of written plans
    pub format: PlanFormat,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            paths: PathSelection::Container,
            backend: BackendKind::Directory,
            out_dir: PathBuf::from("stackplan.out"),
            format: PlanFormat::Json,
        }
    }
}

/// Network settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address space of the virtual network
    pub cidr: String,
    /// Number of availability zones to spread subnets over
    pub max_azs: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
        }
    }
}

/// CPU tier of the compute service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuTier {
    /// 0.25 vCPU
    QuarterVcpu,
    /// 0.5 vCPU
    #[default]
    HalfVcpu,
    /// 1 vCPU
    OneVcpu,
    /// 2 vCPU
    TwoVcpu,
    /// 4 vCPU
    FourVcpu,
}

impl CpuTier {
    /// Provider notation
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuTier::QuarterVcpu => "0.25 vCPU",
            CpuTier::HalfVcpu => "0.5 vCPU",
            CpuTier::OneVcpu => "1 vCPU",
            CpuTier::TwoVcpu => "2 vCPU",
            CpuTier::FourVcpu => "4 vCPU",
        }
    }
}

/// Memory tier of the compute service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    /// 0.5 GB
    HalfGb,
    /// 1 GB
    #[default]
    OneGb,
    /// 2 GB
    TwoGb,
    /// 3 GB
    ThreeGb,
    /// 4 GB
    FourGb,
}

impl MemoryTier {
    /// Provider notation
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::HalfGb => "0.5 GB",
            MemoryTier::OneGb => "1 GB",
            MemoryTier::TwoGb => "2 GB",
            MemoryTier::ThreeGb => "3 GB",
            MemoryTier::FourGb => "4 GB",
        }
    }
}

/// Compute settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    /// Directory the container image is built from
    pub image_dir: PathBuf,
    /// Port the container listens on
    pub port: u16,
    /// CPU tier
    pub cpu: CpuTier,
    /// Memory tier
    pub memory: MemoryTier,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("."),
            port: 80,
            cpu: CpuTier::HalfVcpu,
            memory: MemoryTier::OneGb,
        }
    }
}

/// Static site settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSiteConfig {
    /// Local directory uploaded into the bucket
    pub asset_path: PathBuf,
    /// Default document of bucket and distribution
    pub index_document: String,
    /// Destroy the bucket and its objects when the stack is torn down
    pub destructive_teardown: bool,
}

impl Default for StaticSiteConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from("wwwroot"),
            index_document: "index.html".to_string(),
            destructive_teardown: false,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Colored human output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when neither `-v` nor `RUST_LOG` is given
    pub level: Option<String>,
    /// Emit logs as JSON lines
    pub json: bool,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                merge_values(&mut merged, Self::read_file(&path)?);
                Self::typed(merged.clone(), &path)?;
            } else if config_path == Some(&path) {
                return Err(Error::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
        }

        let mut config: Config = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a single file on top of the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut merged = serde_json::to_value(Config::default())?;
        merge_values(&mut merged, Self::read_file(path)?);
        Self::typed(merged, path)
    }

    /// Deserialize a merged tree, blaming `path` for type mismatches
    fn typed(merged: serde_json::Value, path: &Path) -> Result<Self> {
        serde_json::from_value(merged).map_err(|e| parse_error(path, e))
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path takes priority
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        paths.push(PathBuf::from("/etc/stackplan/stackplan.toml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".stackplan.toml"));
        }

        paths.push(PathBuf::from("stackplan.toml"));

        if let Ok(env_config) = std::env::var("STACKPLAN_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Parse one file into an untyped tree
    fn read_file(path: &Path) -> Result<serde_json::Value> {
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| parse_error(path, e)),
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
            "toml" => toml::from_str(&content).map_err(|e| parse_error(path, e)),
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e| parse_error(path, e)),
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("STACKPLAN_APP_NAME") {
            self.app_name = name;
        }
        if let Some(account) = lookup("STACKPLAN_ACCOUNT") {
            self.environment.account = Some(account);
        }
        if let Some(region) = lookup("STACKPLAN_REGION") {
            self.environment.region = Some(region);
        }
        if let Some(path) = lookup("STACKPLAN_ASSET_PATH") {
            self.static_site.asset_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("STACKPLAN_IMAGE_DIR") {
            self.compute.image_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("STACKPLAN_DESTRUCTIVE_TEARDOWN") {
            self.static_site.destructive_teardown =
                matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(dir) = lookup("STACKPLAN_OUT_DIR") {
            self.deployment.out_dir = PathBuf::from(dir);
        }
        if lookup("NO_COLOR").is_some() {
            self.output.color = false;
        }
    }

    /// Reject settings no stack can be built from
    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() || !self.app_name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::invalid_config(
                "app_name",
                format!("'{}' must be non-empty and alphanumeric", self.app_name),
            ));
        }

        let cidr: Ipv4Cidr = self
            .network
            .cidr
            .parse()
            .map_err(|e: Error| Error::invalid_config("network.cidr", e.to_string()))?;

        if !(1..=6).contains(&self.network.max_azs) {
            return Err(Error::invalid_config(
                "network.max_azs",
                format!("{} is outside 1..=6", self.network.max_azs),
            ));
        }

        cidr.split(usize::from(self.network.max_azs) * 2)
            .map_err(|e| Error::invalid_config("network.cidr", e.to_string()))?;

        if self.compute.port == 0 {
            return Err(Error::invalid_config("compute.port", "port must not be 0"));
        }

        if self.static_site.index_document.is_empty() {
            return Err(Error::invalid_config(
                "static_site.index_document",
                "must not be empty",
            ));
        }

        Ok(())
    }
}

fn parse_error(path: &Path, error: impl std::fmt::Display) -> Error {
    Error::Config(format!("{}: {}", path.display(), error))
}

/// Merge `overlay` into `base`, recursing into tables
fn merge_values(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.cidr, "10.0.0.0/16");
        assert_eq!(config.network.max_azs, 2);
        assert_eq!(config.compute.port, 80);
        assert_eq!(config.compute.cpu.as_str(), "0.5 vCPU");
        assert_eq!(config.compute.memory.as_str(), "1 GB");
        assert!(!config.static_site.destructive_teardown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_merge_is_deep() {
        let mut base = serde_json::to_value(Config::default()).unwrap();
        merge_values(
            &mut base,
            serde_json::json!({ "network": { "max_azs": 3 } }),
        );
        let merged: Config = serde_json::from_value(base).unwrap();
        assert_eq!(merged.network.max_azs, 3);
        assert_eq!(merged.network.cidr, "10.0.0.0/16");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "app_name = \"Games\"\n[static_site]\ndestructive_teardown = true"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.app_name, "Games");
        assert!(config.static_site.destructive_teardown);
        assert_eq!(config.static_site.index_document, "index.html");
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "deployment:\n  paths: both\n  backend: dry_run").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.deployment.paths, PathSelection::Both);
        assert_eq!(config.deployment.backend, BackendKind::DryRun);
    }

    #[test]
    fn test_wrong_type_names_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[network]\nmax_azs = \"two\"").unwrap();

        let err = Config::load(Some(&file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "network: [unclosed").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = PathBuf::from("/nonexistent/stackplan.toml");
        assert!(matches!(Config::load(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_override() {
        let vars: HashMap<&str, &str> = [
            ("STACKPLAN_APP_NAME", "Games"),
            ("STACKPLAN_REGION", "eu-west-1"),
            ("STACKPLAN_DESTRUCTIVE_TEARDOWN", "yes"),
            ("NO_COLOR", "1"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.app_name, "Games");
        assert_eq!(config.environment.region.as_deref(), Some("eu-west-1"));
        assert!(config.static_site.destructive_teardown);
        assert!(!config.output.color);
    }

    #[test]
    fn test_validate() {
        let mut config = Config {
            app_name: "my-app".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { ref key, .. }) if key == "app_name"
        ));

        config.app_name = "App".to_string();
        config.network.max_azs = 7;
        assert!(config.validate().is_err());

        config.network.max_azs = 2;
        config.network.cidr = "10.0.0.0/30".to_string();
        assert!(config.validate().is_err());

        config.network.cidr = "10.0.0.0/16".to_string();
        config.compute.port = 0;
        assert!(config.validate().is_err());
    }
}
