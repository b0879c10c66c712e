//! Static delivery stack: a private bucket served through a distribution.

use super::StackContext;
use crate::config::StaticSiteConfig;
use crate::error::{Error, Result};
use crate::graph::{ConfigValue, ResourceDeclaration, ResourceKind, ResourceRef, ValueExpr};
use crate::policy::{statements, Principal};
use crate::stack::{Built, Stack};

/// Name of the distribution domain output
pub const DISTRIBUTION_DOMAIN_OUTPUT: &str = "DistributionDomain";

/// Methods the distribution forwards
pub const ALLOWED_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

/// Handle onto a built static delivery stack
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionHandle {
    /// Content bucket
    pub bucket: ResourceRef,
    /// Identity the distribution reads the bucket with
    pub access_identity: ResourceRef,
    /// Bucket policy statement granting the identity read access
    pub bucket_policy: ResourceRef,
    /// The distribution
    pub distribution: ResourceRef,
    /// Upload of the local assets
    pub deployment: ResourceRef,
    /// Public distribution domain
    pub domain: ValueExpr,
}

/// Builds the static delivery stack
#[derive(Debug, Clone)]
pub struct StaticDeliveryStack {
    context: StackContext,
    config: StaticSiteConfig,
}

impl StaticDeliveryStack {
    /// Create a builder
    pub fn new(context: &StackContext, config: &StaticSiteConfig) -> Self {
        Self {
            context: context.clone(),
            config: config.clone(),
        }
    }

    /// Declare bucket, identity, distribution and upload of `asset_location`
    ///
    /// The location is recorded as given; checking it is the job of the
    /// [`StaticAssets`](crate::assets::StaticAssets) collaborator.
    pub fn build(self, asset_location: &str) -> Result<Built<DistributionHandle>> {
        let mut stack = Stack::new(self.context.stack_name("StaticDelivery"));
        let index = self.config.index_document.as_str();

        let (removal_policy, auto_delete) = if self.config.destructive_teardown {
            tracing::warn!(
                stack = %stack.name(),
                "Destructive teardown enabled: the site bucket and all its objects are deleted with the stack"
            );
            ("destroy", true)
        } else {
            ("retain", false)
        };

        let bucket = stack.declare(
            ResourceDeclaration::new(ResourceKind::Bucket, "SiteBucket")
                .with("website_index_document", index)
                .with("public_read_access", false)
                .with("block_public_access", "block_all")
                .with("removal_policy", removal_policy)
                .with("auto_delete_objects", auto_delete),
        )?;

        let identity = stack.declare(
            ResourceDeclaration::new(ResourceKind::AccessIdentity, "OriginAccessIdentity").with(
                "comment",
                format!("{} distribution access to {}", self.context.app_name, bucket.id),
            ),
        )?;

        let read = statements::read_objects(
            bucket.attr("Arn"),
            Principal::canonical_user(identity.attr("S3CanonicalUserId")),
        )?;
        let bucket_policy = stack.attach(&bucket, &read)?;

        let distribution = stack.declare(
            ResourceDeclaration::new(ResourceKind::Distribution, "Distribution")
                .with("default_root_object", index)
                .with(
                    "origin",
                    ConfigValue::map([
                        ("domain_name", ConfigValue::from(bucket.attr("RegionalDomainName"))),
                        (
                            "origin_access_identity",
                            ConfigValue::from(identity.attr("Id")),
                        ),
                    ]),
                )
                .with(
                    "default_behavior",
                    ConfigValue::map([
                        ("compress", ConfigValue::from(true)),
                        ("allowed_methods", ConfigValue::list(ALLOWED_METHODS)),
                        (
                            "viewer_protocol_policy",
                            ConfigValue::from("redirect-to-https"),
                        ),
                    ]),
                )
                .depends_on(&bucket_policy),
        )?;

        let deployment = stack.declare(
            ResourceDeclaration::new(ResourceKind::BucketDeployment, "SiteDeployment")
                .with("sources", ConfigValue::list([asset_location]))
                .with("destination_bucket", bucket.attr("BucketName"))
                .with("distribution_id", distribution.attr("Id"))
                .with("distribution_paths", ConfigValue::list(["/*"]))
                .depends_on(&bucket)
                .depends_on(&distribution),
        )?;

        verify_private_bucket(&stack, &bucket, &identity)?;

        let domain = ValueExpr::https(distribution.attr("DomainName"));
        stack.add_output(DISTRIBUTION_DOMAIN_OUTPUT, domain.clone())?;

        tracing::debug!(
            stack = %stack.name(),
            assets = %asset_location,
            removal_policy,
            "Built static delivery stack"
        );

        Ok(Built {
            stack,
            handle: DistributionHandle {
                bucket,
                access_identity: identity,
                bucket_policy,
                distribution,
                deployment,
                domain,
            },
        })
    }
}

/// Every statement on the bucket must name only the distribution's identity
fn verify_private_bucket(stack: &Stack, bucket: &ResourceRef, identity: &ResourceRef) -> Result<()> {
    let expected = Principal::canonical_user(identity.attr("S3CanonicalUserId"));
    for statement in stack.policy_document(bucket).statements() {
        let restricted = !statement.principals().is_empty()
            && statement.principals().iter().all(|p| *p == expected);
        if statement.is_public() || !restricted {
            return Err(Error::PolicyViolation {
                stack: stack.name().to_string(),
                message: format!(
                    "bucket '{}' must only be readable by access identity '{}'",
                    bucket.id, identity.id
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::policy::StatementBuilder;

    fn context() -> StackContext {
        StackContext::new("Games", Environment::new("123", "us-east-1"))
    }

    fn build(config: &StaticSiteConfig) -> Built<DistributionHandle> {
        StaticDeliveryStack::new(&context(), config)
            .build("/tmp/site")
            .unwrap()
    }

    #[test]
    fn test_build_static_stack() {
        let built = build(&StaticSiteConfig::default());
        assert_eq!(built.stack.name(), "GamesStaticDelivery");
        assert_eq!(
            built.handle.domain.render(),
            "https://${GamesStaticDelivery/Distribution.DomainName}"
        );

        let behavior = built
            .stack
            .get("Distribution")
            .and_then(|d| d.get("default_behavior"))
            .unwrap();
        assert_eq!(behavior.get("compress").and_then(ConfigValue::as_bool), Some(true));
        assert_eq!(behavior.get("allowed_methods").unwrap().as_list().unwrap().len(), 3);

        let deployment = built.stack.get("SiteDeployment").unwrap();
        assert!(deployment
            .explicit_dependencies()
            .contains(&built.handle.distribution));
        assert!(deployment.explicit_dependencies().contains(&built.handle.bucket));
    }

    #[test]
    fn test_bucket_read_only_through_identity() {
        let built = build(&StaticSiteConfig::default());
        let document = built.stack.policy_document(&built.handle.bucket);
        assert_eq!(document.statements().len(), 1);

        let statement = &document.statements()[0];
        assert!(!statement.is_public());
        assert_eq!(
            statement.principals().iter().collect::<Vec<_>>(),
            vec![&Principal::canonical_user(
                built.handle.access_identity.attr("S3CanonicalUserId")
            )]
        );
        assert_eq!(
            document.effective_actions().into_iter().collect::<Vec<_>>(),
            vec!["s3:GetObject"]
        );
    }

    #[test]
    fn test_teardown_retains_by_default() {
        let built = build(&StaticSiteConfig::default());
        let bucket = built.stack.get("SiteBucket").unwrap();
        assert_eq!(bucket.get("removal_policy").unwrap().as_str(), Some("retain"));
        assert_eq!(bucket.get("auto_delete_objects").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn test_destructive_teardown() {
        let config = StaticSiteConfig {
            destructive_teardown: true,
            ..StaticSiteConfig::default()
        };
        let built = build(&config);
        let bucket = built.stack.get("SiteBucket").unwrap();
        assert_eq!(bucket.get("removal_policy").unwrap().as_str(), Some("destroy"));
        assert_eq!(bucket.get("auto_delete_objects").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_public_statement_is_rejected() {
        let mut built = build(&StaticSiteConfig::default());
        let public = StatementBuilder::allow()
            .action("s3:GetObject")
            .resource("*")
            .principal(Principal::Anyone)
            .build()
            .unwrap();
        built.stack.attach(&built.handle.bucket, &public).unwrap();

        let err = verify_private_bucket(
            &built.stack,
            &built.handle.bucket,
            &built.handle.access_identity,
        )
        .unwrap_err();
        assert!(matches!(err, Error::PolicyViolation { .. }));
    }
}
