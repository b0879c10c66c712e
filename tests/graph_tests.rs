//! Declaration graph tests: ordering, cycles, duplicate ids and
//! cross-stack references.

mod common;

use pretty_assertions::assert_eq;
use stackplan::assembly::Assembly;
use stackplan::error::Error;
use stackplan::graph::{DeclarationGraph, ResourceDeclaration, ResourceKind, ResourceRef};
use stackplan::graph::dependencies::DependencyType;
use stackplan::stack::Stack;

use common::*;

fn declaration(kind: ResourceKind, id: &str) -> ResourceDeclaration {
    ResourceDeclaration::new(kind, id)
}

#[test]
fn test_every_declaration_after_its_dependencies() {
    let mut stack = Stack::new("App");
    let role = stack.declare(declaration(ResourceKind::Role, "Role")).unwrap();
    let image = stack
        .declare(declaration(ResourceKind::ContainerImage, "Image").with("role", role.attr("Arn")))
        .unwrap();
    stack
        .declare(
            declaration(ResourceKind::ComputeService, "Service")
                .with("image", image.attr("ImageUri"))
                .with("role", role.attr("Arn")),
        )
        .unwrap();

    let order: Vec<&str> = stack.resolve().unwrap().iter().map(|d| d.id()).collect();
    assert_eq!(order, vec!["Role", "Image", "Service"]);
}

#[test]
fn test_synthetic_cycle_is_rejected() {
    let mut stack = Stack::new("App");
    let a = ResourceRef::new("App", "A");
    let b = ResourceRef::new("App", "B");
    stack
        .declare(declaration(ResourceKind::Role, "A").depends_on(&b))
        .unwrap();
    stack
        .declare(declaration(ResourceKind::Role, "B").with("arn", a.attr("Arn")))
        .unwrap();

    match stack.resolve() {
        Err(Error::Cycle { members }) => {
            assert_eq!(members, vec!["App/A".to_string(), "App/B".to_string()]);
        }
        other => panic!("expected a cycle, got {:?}", other.map(|o| o.len())),
    }
}

#[test]
fn test_cycle_is_detected_before_publish() {
    let mut assembly = Assembly::new(test_environment());
    let mut stack = Stack::new("App");
    stack
        .declare(declaration(ResourceKind::Role, "A").depends_on(&ResourceRef::new("App", "A")))
        .unwrap();

    assert!(matches!(assembly.publish(stack), Err(Error::Cycle { .. })));
    assert!(!assembly.is_published("App"));
}

#[test]
fn test_duplicate_id_within_and_across_stacks() {
    let mut first = Stack::new("First");
    first.declare(declaration(ResourceKind::Bucket, "Site")).unwrap();
    assert!(matches!(
        first.declare(declaration(ResourceKind::Bucket, "Site")),
        Err(Error::DuplicateId { .. })
    ));

    let mut second = Stack::new("Second");
    second.declare(declaration(ResourceKind::Bucket, "Site")).unwrap();

    let mut assembly = Assembly::new(test_environment());
    assembly.publish(first).unwrap();
    assembly.publish(second).unwrap();
    let plan = assembly.synthesize().unwrap();
    assert!(plan.declaration("First/Site").is_some());
    assert!(plan.declaration("Second/Site").is_some());
}

#[test]
fn test_cross_stack_read_requires_published_source() {
    let mut consumer = Stack::new("Consumer");
    consumer
        .declare(
            declaration(ResourceKind::SecurityGroup, "Sg")
                .with("vpc_id", ResourceRef::new("Producer", "Vpc").attr("VpcId")),
        )
        .unwrap();

    let mut assembly = Assembly::new(test_environment());
    let err = assembly.publish(consumer.clone()).unwrap_err();
    assert!(matches!(err, Error::UnresolvedReference { .. }));
    assert!(err.to_string().contains("Producer/Vpc"));

    let mut producer = Stack::new("Producer");
    producer.declare(declaration(ResourceKind::Network, "Vpc")).unwrap();
    assembly.publish(producer).unwrap();
    assembly.publish(consumer).unwrap();

    let graph = assembly.dependency_graph().unwrap();
    assert_eq!(
        graph.dependencies_of(&ResourceRef::new("Consumer", "Sg")),
        vec![ResourceRef::new("Producer", "Vpc")]
    );
    assert!(graph.to_dot().contains("style=bold"));
}

#[test]
fn test_graph_primitives() {
    let mut graph = DeclarationGraph::new();
    let vpc = ResourceRef::new("Net", "Vpc");
    let subnet = ResourceRef::new("Net", "Subnet");
    graph.declare(vpc.clone(), ResourceKind::Network).unwrap();
    graph.declare(subnet.clone(), ResourceKind::Subnet).unwrap();
    graph
        .add_dependency(&subnet, &vpc, DependencyType::Attribute)
        .unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert!(!graph.has_cycles());
    assert_eq!(graph.resolve().unwrap(), vec![vpc, subnet]);
}
