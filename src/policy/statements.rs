//! Construction helpers for the minimal statements the stacks need.
//!
//! Each helper names exactly the actions its use case requires.

use super::arn::{self, ArnComponents};
use super::{grant, PolicyStatement, Principal, StatementBuilder};
use crate::environment::Environment;
use crate::error::Result;
use crate::graph::ValueExpr;

/// Log-group/log-stream resources; group names are unknown before first write
pub const ALL_LOG_STREAMS: &str = "arn:aws:logs:*:*:log-group:*:log-stream:*";

/// Read parameters below `<namespace>/` by path
pub fn read_parameters_by_path(namespace: &str, env: &Environment) -> Result<PolicyStatement> {
    let parameters = arn::format(
        &ArnComponents::new("ssm", "parameter").with_name(format!("{}/*", namespace)),
        env,
    );
    StatementBuilder::allow()
        .action("ssm:GetParametersByPath")
        .resource(parameters)
        .build()
}

/// Create log groups and streams and write events to them
pub fn write_logs() -> Result<PolicyStatement> {
    StatementBuilder::allow()
        .actions([
            "logs:DescribeLogGroups",
            "logs:CreateLogGroup",
            "logs:CreateLogStream",
            "logs:PutLogEvents",
        ])
        .resource(ALL_LOG_STREAMS)
        .build()
}

/// Pull layers of images from one repository
pub fn pull_image(repository_arn: ValueExpr) -> Result<PolicyStatement> {
    StatementBuilder::allow()
        .actions([
            "ecr:BatchCheckLayerAvailability",
            "ecr:BatchGetImage",
            "ecr:GetDownloadUrlForLayer",
        ])
        .resource(repository_arn)
        .build()
}

/// Obtain a registry login token; the action only accepts `*` as resource
pub fn registry_login() -> Result<PolicyStatement> {
    StatementBuilder::allow()
        .action("ecr:GetAuthorizationToken")
        .resource("*")
        .build()
}

/// Let `principal` read every object of a bucket
pub fn read_objects(bucket_arn: ValueExpr, principal: Principal) -> Result<PolicyStatement> {
    grant(
        principal,
        ["s3:GetObject"],
        [ValueExpr::join([bucket_arn, ValueExpr::literal("/*")])],
    )
}
