//! Packaging collaborators: container images and static asset folders.
//!
//! Both collaborators are traits so the orchestrator can be driven without a
//! filesystem in tests. The directory-based implementations fingerprint their
//! directory with SHA-256 over relative paths and file contents, skipping
//! hidden entries.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::policy::arn::{self, ArnComponents};

/// A container image the compute service can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Directory the image was built from, if any
    pub directory: Option<PathBuf>,
    /// Content hash used as the image tag
    pub asset_hash: String,
    /// Fully qualified image URI
    pub image_uri: String,
    /// ARN of the repository holding the image
    pub repository_arn: String,
}

/// Produces the container image reference for a deployment
pub trait ImageSource: Send + Sync + fmt::Debug {
    /// Human-readable description for logs
    fn describe(&self) -> String;

    /// Resolve the image for `app_name` in `environment`
    fn resolve(&self, app_name: &str, environment: &Environment) -> Result<ImageReference>;
}

/// Image built from a local directory containing a `Dockerfile`
#[derive(Debug, Clone)]
pub struct DirectoryImageAsset {
    directory: PathBuf,
}

impl DirectoryImageAsset {
    /// Create a source for `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::ImageSource {
            path: self.directory.clone(),
            message: message.into(),
        }
    }
}

impl ImageSource for DirectoryImageAsset {
    fn describe(&self) -> String {
        format!("image built from {}", self.directory.display())
    }

    fn resolve(&self, app_name: &str, environment: &Environment) -> Result<ImageReference> {
        if !self.directory.is_dir() {
            return Err(self.error("directory does not exist"));
        }
        if !self.directory.join("Dockerfile").is_file() {
            return Err(self.error("no Dockerfile in directory"));
        }

        let files = collect_files(&self.directory).map_err(|e| self.error(e.to_string()))?;
        let asset_hash =
            fingerprint(&self.directory, &files).map_err(|e| self.error(e.to_string()))?;

        let repository = format!("{}-container-assets", app_name.to_ascii_lowercase());
        let image_uri = format!(
            "{}.dkr.ecr.{}.amazonaws.com/{}:{}",
            environment.account_or_token(),
            environment.region_or_token(),
            repository,
            asset_hash
        );
        let repository_arn = arn::format(
            &ArnComponents::new("ecr", "repository").with_name(repository),
            environment,
        );

        tracing::debug!(
            directory = %self.directory.display(),
            files = files.len(),
            hash = %asset_hash,
            "Fingerprinted container image directory"
        );

        Ok(ImageReference {
            directory: Some(self.directory.clone()),
            asset_hash,
            image_uri,
            repository_arn,
        })
    }
}

/// An image that already exists in a registry
#[derive(Debug, Clone)]
pub struct PrebuiltImage {
    image_uri: String,
    repository_arn: String,
}

impl PrebuiltImage {
    /// Reference an existing image
    pub fn new(image_uri: impl Into<String>, repository_arn: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            repository_arn: repository_arn.into(),
        }
    }
}

impl ImageSource for PrebuiltImage {
    fn describe(&self) -> String {
        format!("prebuilt image {}", self.image_uri)
    }

    fn resolve(&self, _app_name: &str, _environment: &Environment) -> Result<ImageReference> {
        let tag = self
            .image_uri
            .rsplit_once(':')
            .map(|(_, tag)| tag.to_string())
            .unwrap_or_else(|| "latest".to_string());
        Ok(ImageReference {
            directory: None,
            asset_hash: tag,
            image_uri: self.image_uri.clone(),
            repository_arn: self.repository_arn.clone(),
        })
    }
}

/// A folder of static files verified to be uploadable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedAssets {
    /// Asset root
    pub root: PathBuf,
    /// Files relative to the root, sorted
    pub files: Vec<PathBuf>,
    /// Sum of file sizes
    pub total_bytes: u64,
    /// Content hash of the folder
    pub asset_hash: String,
}

/// Provides the static files uploaded into the bucket
pub trait StaticAssets: Send + Sync + fmt::Debug {
    /// Location recorded as the upload source in the plan
    fn location(&self) -> String;

    /// Verify the assets and fingerprint them
    fn stage(&self) -> Result<StagedAssets>;
}

/// Static assets read from a local directory
#[derive(Debug, Clone)]
pub struct LocalAssetDirectory {
    path: PathBuf,
}

impl LocalAssetDirectory {
    /// Create a collaborator for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::AssetStaging {
            path: self.path.clone(),
            message: message.into(),
        }
    }
}

impl StaticAssets for LocalAssetDirectory {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn stage(&self) -> Result<StagedAssets> {
        if !self.path.exists() {
            return Err(self.error("directory does not exist"));
        }
        if !self.path.is_dir() {
            return Err(self.error("not a directory"));
        }

        let files = collect_files(&self.path).map_err(|e| self.error(e.to_string()))?;
        if files.is_empty() {
            return Err(self.error("directory is empty"));
        }

        let mut total_bytes = 0;
        for file in &files {
            total_bytes += std::fs::metadata(self.path.join(file))?.len();
        }
        let asset_hash = fingerprint(&self.path, &files).map_err(|e| self.error(e.to_string()))?;

        tracing::info!(
            path = %self.path.display(),
            files = files.len(),
            bytes = total_bytes,
            "Staged static assets"
        );

        Ok(StagedAssets {
            root: self.path.clone(),
            files,
            total_bytes,
            asset_hash,
        })
    }
}

/// Regular files below `root`, relative and sorted, hidden entries skipped
fn collect_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn fingerprint(root: &Path, files: &[PathBuf]) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.to_string_lossy().replace('\\', "/").as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(root.join(file))?);
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
