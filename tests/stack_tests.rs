//! Stack construction tests for the network, compute and static delivery
//! stacks.

mod common;

use pretty_assertions::assert_eq;
use stackplan::assembly::Assembly;
use stackplan::assets::ImageSource;
use stackplan::config::{ComputeConfig, NetworkConfig, StaticSiteConfig};
use stackplan::error::Error;
use stackplan::graph::ResourceKind;
use stackplan::stacks::{ComputeStack, ComputeStackBuilder, NetworkStack, StaticDeliveryStack};

use common::*;

#[test]
fn test_network_subnets_ordered_by_zone() {
    let config = NetworkConfig {
        cidr: "10.20.0.0/16".to_string(),
        max_azs: 3,
    };
    let built = NetworkStack::new(&test_context(), &config).build().unwrap();

    let zones: Vec<&str> = built
        .handle
        .private_subnets
        .iter()
        .map(|s| s.availability_zone.as_str())
        .collect();
    assert_eq!(zones, vec!["us-east-1a", "us-east-1b", "us-east-1c"]);

    let public: Vec<&str> = built
        .handle
        .public_subnets
        .iter()
        .map(|s| s.cidr.as_str())
        .collect();
    assert_eq!(public, vec!["10.20.0.0/19", "10.20.32.0/19", "10.20.64.0/19"]);

    let subnets = built
        .stack
        .declarations()
        .iter()
        .filter(|d| d.kind() == ResourceKind::Subnet)
        .count();
    assert_eq!(subnets, 6);
}

#[test]
fn test_compute_service_bound_to_private_subnets() {
    let network = NetworkStack::new(&test_context(), &NetworkConfig::default())
        .build()
        .unwrap();
    let private_ids: Vec<String> = network
        .handle
        .private_subnet_ids()
        .iter()
        .map(|e| e.render())
        .collect();

    let mut assembly = Assembly::new(test_environment());
    assembly.publish(network.stack).unwrap();
    let image = test_image().resolve("Games", &test_environment()).unwrap();
    let compute = ComputeStack::build(
        &test_context(),
        &ComputeConfig::default(),
        &assembly,
        &network.handle,
        image,
    )
    .unwrap();
    assembly.publish(compute.stack).unwrap();

    let plan = assembly.synthesize().unwrap();
    let connector = plan.declaration("GamesCompute/VpcConnector").unwrap();
    assert_eq!(connector.config["connector_name"], "GamesVpcConnector");
    assert_eq!(
        connector.config["subnets"],
        serde_json::json!(private_ids)
    );
    assert_eq!(
        connector.config["security_groups"],
        serde_json::json!(["${GamesCompute/ServiceSecurityGroup.GroupId}"])
    );

    let sg = plan.declaration("GamesCompute/ServiceSecurityGroup").unwrap();
    assert_eq!(sg.config["allow_all_outbound"], true);
    assert_eq!(sg.config["ingress"], serde_json::json!([]));

    let service = plan.declaration("GamesCompute/Service").unwrap();
    assert_eq!(service.config["image"]["port"], 80);
    assert!(service.depends_on.contains(&"GamesCompute/VpcConnector".to_string()));
}

#[test]
fn test_compute_steps_enforce_order() {
    let image = test_image().resolve("Games", &test_environment()).unwrap();
    let mut builder = ComputeStackBuilder::new(&test_context(), &ComputeConfig::default(), image);

    assert!(matches!(
        builder.create_instance_role(),
        Err(Error::DependencyOrder { prerequisite: "create_security_group", .. })
    ));
    assert!(matches!(
        builder.reference_image(),
        Err(Error::DependencyOrder { .. })
    ));
    assert!(matches!(builder.finish(), Err(Error::DependencyOrder { .. })));
}

#[test]
fn test_compute_rejects_unpublished_network() {
    let network = NetworkStack::new(&test_context(), &NetworkConfig::default())
        .build()
        .unwrap();
    let assembly = Assembly::new(test_environment());
    let image = test_image().resolve("Games", &test_environment()).unwrap();

    let err = ComputeStack::build(
        &test_context(),
        &ComputeConfig::default(),
        &assembly,
        &network.handle,
        image,
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference { .. }));
}

#[test]
fn test_static_stack_upload_waits_for_bucket_and_distribution() {
    let built = StaticDeliveryStack::new(&test_context(), &StaticSiteConfig::default())
        .build("/tmp/site")
        .unwrap();
    let mut assembly = Assembly::new(test_environment());
    assembly.publish(built.stack).unwrap();
    let plan = assembly.synthesize().unwrap();

    let position = |id: &str| plan.order.iter().position(|o| o == id).unwrap();
    let upload = position("GamesStaticDelivery/SiteDeployment");
    assert!(position("GamesStaticDelivery/SiteBucket") < upload);
    assert!(position("GamesStaticDelivery/Distribution") < upload);
    assert!(position("GamesStaticDelivery/SiteBucketPolicy1") < position("GamesStaticDelivery/Distribution"));

    let deployment = plan.declaration("GamesStaticDelivery/SiteDeployment").unwrap();
    assert_eq!(deployment.config["sources"], serde_json::json!(["/tmp/site"]));
    assert_eq!(deployment.config["distribution_paths"], serde_json::json!(["/*"]));

    let distribution = plan.declaration("GamesStaticDelivery/Distribution").unwrap();
    assert_eq!(
        distribution.config["default_behavior"]["viewer_protocol_policy"],
        "redirect-to-https"
    );
    assert_eq!(
        distribution.config["default_behavior"]["allowed_methods"],
        serde_json::json!(["GET", "HEAD", "OPTIONS"])
    );
}

#[test]
fn test_static_stack_does_not_touch_the_filesystem() {
    let built = StaticDeliveryStack::new(&test_context(), &StaticSiteConfig::default())
        .build("/definitely/not/here")
        .unwrap();
    assert!(built.handle.domain.render().starts_with("https://"));
}
