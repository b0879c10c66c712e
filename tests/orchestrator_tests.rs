//! End-to-end orchestration tests: path selection, collaborators and
//! backend submission.

mod common;

use pretty_assertions::assert_eq;
use stackplan::assets::{DirectoryImageAsset, LocalAssetDirectory};
use stackplan::backend::PlanDirectoryBackend;
use stackplan::config::{Config, PlanFormat, StaticSiteConfig};
use stackplan::error::Error;
use stackplan::orchestrator::PathSelection;

use common::*;

#[tokio::test]
async fn test_container_path_end_to_end() {
    let orchestrator = test_orchestrator(test_config());
    let backend = RecordingBackend::new();

    let outcome = orchestrator
        .run(PathSelection::Container, &backend)
        .await
        .unwrap();

    assert_eq!(backend.submissions(), 1);
    let names: Vec<&str> = outcome.plan.stacks.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["GamesNetwork", "GamesCompute"]);

    let network = outcome.plan.stack("GamesNetwork").unwrap();
    assert!(network
        .declarations
        .iter()
        .any(|d| d.logical_id.starts_with("PrivateSubnet")));

    let url = outcome.service_url.unwrap();
    assert!(url.starts_with("https://"));
    assert!(outcome.distribution_domain.is_none());
    assert!(outcome.assets.is_none());
    assert_eq!(outcome.receipt.stacks, 2);
}

#[tokio::test]
async fn test_static_path_end_to_end() {
    let site = site_dir();
    let orchestrator = test_orchestrator(test_config())
        .with_static_assets(LocalAssetDirectory::new(site.path()));
    let backend = RecordingBackend::new();

    let outcome = orchestrator.run(PathSelection::Static, &backend).await.unwrap();

    assert_eq!(backend.submissions(), 1);
    assert!(outcome
        .distribution_domain
        .as_deref()
        .unwrap()
        .starts_with("https://"));
    assert!(outcome.service_url.is_none());

    let assets = outcome.assets.unwrap();
    assert_eq!(assets.files.len(), 2);
    assert_eq!(assets.total_bytes, 46);

    let upload = outcome
        .plan
        .declaration("GamesStaticDelivery/SiteDeployment")
        .unwrap();
    assert_eq!(
        upload.config["sources"],
        serde_json::json!([site.path().display().to_string()])
    );
}

#[tokio::test]
async fn test_both_paths_share_one_plan() {
    let site = site_dir();
    let orchestrator = test_orchestrator(test_config())
        .with_static_assets(LocalAssetDirectory::new(site.path()));

    let outcome = orchestrator
        .run(PathSelection::Both, &RecordingBackend::new())
        .await
        .unwrap();

    assert_eq!(outcome.plan.stacks.len(), 3);
    assert!(outcome.service_url.is_some());
    assert!(outcome.distribution_domain.is_some());
    assert_eq!(outcome.plan.outputs().len(), 2);
}

#[test]
fn test_planning_is_deterministic() {
    let orchestrator = test_orchestrator(test_config())
        .with_static_assets(LocalAssetDirectory::new("/tmp/site"));

    let first = orchestrator.plan(PathSelection::Both).unwrap();
    let second = orchestrator.plan(PathSelection::Both).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[tokio::test]
async fn test_missing_assets_abort_before_submission() {
    let orchestrator = test_orchestrator(test_config())
        .with_static_assets(LocalAssetDirectory::new("/definitely/not/here"));
    let backend = RecordingBackend::new();

    let err = orchestrator
        .run(PathSelection::Static, &backend)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AssetStaging { .. }));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(backend.submissions(), 0);
}

#[tokio::test]
async fn test_backend_failure_is_reported() {
    let orchestrator = test_orchestrator(test_config());

    let err = orchestrator
        .run(PathSelection::Container, &FailingBackend)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Backend { .. }));
    assert!(err.to_string().contains("quota exceeded"));
    assert!(!err.is_plan_error());
}

#[test]
fn test_image_built_from_directory() {
    let dir = image_dir();
    let orchestrator = test_orchestrator(test_config())
        .with_image_source(DirectoryImageAsset::new(dir.path()));

    let plan = orchestrator.plan(PathSelection::Container).unwrap();
    let image = plan.declaration("GamesCompute/Image").unwrap();
    let uri = image.config["image_uri"].as_str().unwrap();
    assert!(uri.starts_with("123.dkr.ecr.us-east-1.amazonaws.com/games-container-assets:"));
    assert_eq!(
        image.config["directory"],
        serde_json::json!(dir.path().display().to_string())
    );
}

#[test]
fn test_image_directory_without_dockerfile_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let orchestrator = test_orchestrator(test_config())
        .with_image_source(DirectoryImageAsset::new(dir.path()));

    let err = orchestrator.plan(PathSelection::Container).unwrap_err();
    assert!(matches!(err, Error::ImageSource { .. }));
}

#[test]
fn test_static_path_needs_no_image() {
    let dir = tempfile::TempDir::new().unwrap();
    let orchestrator = test_orchestrator(test_config())
        .with_image_source(DirectoryImageAsset::new(dir.path()))
        .with_static_assets(LocalAssetDirectory::new("/tmp/site"));

    let plan = orchestrator.plan(PathSelection::Static).unwrap();
    assert_eq!(plan.stacks.len(), 1);
}

#[test]
fn test_teardown_setting_reaches_the_bucket() {
    let config = Config {
        static_site: StaticSiteConfig {
            destructive_teardown: true,
            ..StaticSiteConfig::default()
        },
        ..test_config()
    };
    let orchestrator =
        test_orchestrator(config).with_static_assets(LocalAssetDirectory::new("/tmp/site"));

    let plan = orchestrator.plan(PathSelection::Static).unwrap();
    let bucket = plan.declaration("GamesStaticDelivery/SiteBucket").unwrap();
    assert_eq!(bucket.config["removal_policy"], "destroy");
    assert_eq!(bucket.config["auto_delete_objects"], true);

    let retained = test_orchestrator(test_config())
        .with_static_assets(LocalAssetDirectory::new("/tmp/site"))
        .plan(PathSelection::Static)
        .unwrap();
    let bucket = retained.declaration("GamesStaticDelivery/SiteBucket").unwrap();
    assert_eq!(bucket.config["removal_policy"], "retain");
    assert_eq!(bucket.config["auto_delete_objects"], false);
}

#[tokio::test]
async fn test_plan_directory_backend_writes_every_stack() {
    let out = tempfile::TempDir::new().unwrap();
    let orchestrator = test_orchestrator(test_config());
    let backend = PlanDirectoryBackend::new(out.path(), PlanFormat::Json);

    let outcome = orchestrator
        .run(PathSelection::Container, &backend)
        .await
        .unwrap();

    assert_eq!(outcome.receipt.files.len(), 3);
    assert!(out.path().join("plan.json").exists());
    assert!(out.path().join("GamesCompute.json").exists());

    let written = std::fs::read_to_string(out.path().join("plan.json")).unwrap();
    let reread: stackplan::plan::DeploymentPlan = serde_json::from_str(&written).unwrap();
    assert_eq!(reread, outcome.plan);
}
