//! Plan Synthesis Benchmarks for stackplan
//!
//! Measures the planning path end to end:
//! - Declaration graph resolution at growing sizes
//! - Full plan synthesis per delivery path and zone count
//! - Submission through the dry-run backend
//!
//! Run with: cargo bench --bench synthesis_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stackplan::prelude::*;
use stackplan::config::NetworkConfig;
use tokio::runtime::Runtime;

// ============================================================================
// Helper Functions
// ============================================================================

fn orchestrator(max_azs: u8) -> DeploymentOrchestrator {
    let config = Config {
        app_name: "Bench".to_string(),
        network: NetworkConfig {
            cidr: "10.0.0.0/16".to_string(),
            max_azs,
        },
        ..Config::default()
    };
    DeploymentOrchestrator::new(config)
        .with_environment(Environment::new("123456789012", "us-east-1"))
        .with_image_source(PrebuiltImage::new(
            "123456789012.dkr.ecr.us-east-1.amazonaws.com/bench:v1",
            "arn:aws:ecr:us-east-1:123456789012:repository/bench",
        ))
        .with_static_assets(LocalAssetDirectory::new("/srv/site"))
}

/// A chain of `size` roles, each reading the previous one's ARN
fn chain_stack(size: usize) -> Stack {
    let mut stack = Stack::new("Chain");
    let mut previous: Option<ResourceRef> = None;
    for i in 0..size {
        let mut declaration = ResourceDeclaration::new(ResourceKind::Role, format!("Role{}", i));
        if let Some(previous) = &previous {
            declaration = declaration.with("trusts", previous.attr("Arn"));
        }
        previous = Some(stack.declare(declaration).unwrap());
    }
    stack
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_graph_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_resolution");
    for size in [10usize, 100, 1000] {
        let stack = chain_stack(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &stack, |b, stack| {
            b.iter(|| black_box(stack.resolve().unwrap().len()))
        });
    }
    group.finish();
}

fn bench_plan_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_synthesis");
    for (name, selection) in [
        ("container", PathSelection::Container),
        ("static", PathSelection::Static),
        ("both", PathSelection::Both),
    ] {
        let orchestrator = orchestrator(2);
        group.bench_function(name, |b| {
            b.iter(|| black_box(orchestrator.plan(selection).unwrap()))
        });
    }
    group.finish();
}

fn bench_zone_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("zone_scaling");
    for max_azs in 1u8..=6 {
        let orchestrator = orchestrator(max_azs);
        group.bench_with_input(BenchmarkId::from_parameter(max_azs), &orchestrator, |b, o| {
            b.iter(|| black_box(o.plan(PathSelection::Container).unwrap()))
        });
    }
    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let plan = orchestrator(3).plan(PathSelection::Both).unwrap();
    let mut group = c.benchmark_group("plan_serialization");
    group.bench_function("json", |b| b.iter(|| black_box(plan.to_json().unwrap())));
    group.bench_function("yaml", |b| b.iter(|| black_box(plan.to_yaml().unwrap())));
    group.bench_function("dot", |b| b.iter(|| black_box(plan.to_dot().unwrap())));
    group.finish();
}

fn bench_dry_run_submission(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let orchestrator = orchestrator(2);
    let backend = DryRunBackend::new();

    c.bench_function("dry_run_container", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(
                orchestrator
                    .run(PathSelection::Container, &backend)
                    .await
                    .unwrap(),
            )
        })
    });
}

criterion_group!(graph_benches, bench_graph_resolution);

criterion_group!(
    synthesis_benches,
    bench_plan_synthesis,
    bench_zone_scaling,
    bench_serialization,
);

criterion_group!(submission_benches, bench_dry_run_submission);

criterion_main!(graph_benches, synthesis_benches, submission_benches);
