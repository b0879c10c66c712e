//! Least-privilege security policy composition.
//!
//! Statements are built with [`StatementBuilder`] (or [`grant`] for the
//! common principal-scoped case) and are immutable once built. Attaching a
//! statement to a role or bucket is a separate step performed on the owning
//! [`Stack`](crate::stack::Stack), so one statement can be attached to several
//! resources.
//!
//! The builder refuses statements with no actions or no resources. Picking a
//! minimal action set is left to the construction helpers in [`statements`];
//! wildcard actions are allowed but logged.

pub mod arn;
pub mod statements;

use std::collections::BTreeSet;
use std::fmt;

use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{ConfigValue, ValueExpr};

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effect {
    /// Grant the listed actions
    Allow,
    /// Revoke the listed actions, overriding any Allow
    Deny,
}

impl Effect {
    /// Get the plain string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Who a resource-based statement applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    /// A cloud service (e.g. `tasks.apprunner.amazonaws.com`)
    Service(String),
    /// A canonical user id, typically a distribution's access identity
    CanonicalUser(ValueExpr),
    /// Anyone, including anonymous callers
    Anyone,
}

impl Principal {
    /// Service principal
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(name.into())
    }

    /// Canonical user principal
    pub fn canonical_user(id: ValueExpr) -> Self {
        Principal::CanonicalUser(id)
    }

    /// Whether this principal admits unauthenticated callers
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Principal::Anyone)
    }

    fn to_config(&self) -> ConfigValue {
        match self {
            Principal::Service(name) => ConfigValue::map([("service", name.as_str())]),
            Principal::CanonicalUser(id) => {
                ConfigValue::map([("canonical_user", ConfigValue::Expr(id.clone()))])
            }
            Principal::Anyone => ConfigValue::from("*"),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Service(name) => write!(f, "service:{}", name),
            Principal::CanonicalUser(id) => write!(f, "canonical-user:{}", id),
            Principal::Anyone => f.write_str("*"),
        }
    }
}

/// An immutable access statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyStatement {
    effect: Effect,
    actions: BTreeSet<String>,
    resources: BTreeSet<ValueExpr>,
    principals: BTreeSet<Principal>,
}

impl PolicyStatement {
    /// Statement effect
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Actions, sorted
    pub fn actions(&self) -> &BTreeSet<String> {
        &self.actions
    }

    /// Resource locators, sorted
    pub fn resources(&self) -> &BTreeSet<ValueExpr> {
        &self.resources
    }

    /// Principals; empty for identity-based statements
    pub fn principals(&self) -> &BTreeSet<Principal> {
        &self.principals
    }

    /// Whether any principal admits unauthenticated callers
    pub fn is_public(&self) -> bool {
        self.principals.iter().any(Principal::is_unrestricted)
    }

    /// Render as a declaration configuration payload
    pub fn to_config(&self) -> ConfigValue {
        let mut entries = vec![
            ("effect", ConfigValue::from(self.effect.as_str())),
            (
                "actions",
                ConfigValue::list(self.actions.iter().map(String::as_str)),
            ),
            (
                "resources",
                ConfigValue::list(self.resources.iter().cloned()),
            ),
        ];
        if !self.principals.is_empty() {
            entries.push((
                "principals",
                ConfigValue::List(self.principals.iter().map(Principal::to_config).collect()),
            ));
        }
        ConfigValue::map(entries)
    }
}

/// Builder for [`PolicyStatement`]
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    effect: Effect,
    actions: BTreeSet<String>,
    resources: BTreeSet<ValueExpr>,
    principals: BTreeSet<Principal>,
}

impl StatementBuilder {
    /// Start an Allow statement
    pub fn allow() -> Self {
        Self::with_effect(Effect::Allow)
    }

    /// Start a Deny statement
    pub fn deny() -> Self {
        Self::with_effect(Effect::Deny)
    }

    fn with_effect(effect: Effect) -> Self {
        Self {
            effect,
            actions: BTreeSet::new(),
            resources: BTreeSet::new(),
            principals: BTreeSet::new(),
        }
    }

    /// Add one action
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.insert(action.into());
        self
    }

    /// Add several actions
    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Add one resource locator
    pub fn resource(mut self, resource: impl Into<ValueExpr>) -> Self {
        self.resources.insert(resource.into());
        self
    }

    /// Add several resource locators
    pub fn resources<I, R>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ValueExpr>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    /// Add a principal
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principals.insert(principal);
        self
    }

    /// Build the statement
    pub fn build(self) -> Result<PolicyStatement> {
        if self.actions.is_empty() {
            return Err(Error::EmptyStatement { missing: "actions" });
        }
        if self.resources.is_empty() {
            return Err(Error::EmptyStatement {
                missing: "resources",
            });
        }

        for action in self.actions.iter().filter(|a| a.ends_with('*')) {
            tracing::warn!(action = %action, "Policy statement uses a wildcard action");
        }

        Ok(PolicyStatement {
            effect: self.effect,
            actions: self.actions,
            resources: self.resources,
            principals: self.principals,
        })
    }
}

/// Allow `principal` to perform `actions` on `resources`
pub fn grant<A, S, R, V>(principal: Principal, actions: A, resources: R) -> Result<PolicyStatement>
where
    A: IntoIterator<Item = S>,
    S: Into<String>,
    R: IntoIterator<Item = V>,
    V: Into<ValueExpr>,
{
    StatementBuilder::allow()
        .principal(principal)
        .actions(actions)
        .resources(resources)
        .build()
}

/// The statements attached to one resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement
    pub fn push(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    /// Attached statements in attachment order
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Effective `(action, resource)` pairs: union of Allow minus Deny
    pub fn effective_permissions(&self) -> BTreeSet<(String, String)> {
        let denies: Vec<&PolicyStatement> = self
            .statements
            .iter()
            .filter(|s| s.effect == Effect::Deny)
            .collect();

        let mut permissions = BTreeSet::new();
        for statement in self.statements.iter().filter(|s| s.effect == Effect::Allow) {
            for action in &statement.actions {
                for resource in &statement.resources {
                    let resource = resource.render();
                    let denied = denies.iter().any(|deny| {
                        deny.actions.iter().any(|p| pattern_matches(p, action))
                            && deny
                                .resources
                                .iter()
                                .any(|p| pattern_matches(&p.render(), &resource))
                    });
                    if !denied {
                        permissions.insert((action.clone(), resource));
                    }
                }
            }
        }
        permissions
    }

    /// Actions granted on at least one resource
    pub fn effective_actions(&self) -> BTreeSet<String> {
        self.effective_permissions()
            .into_iter()
            .map(|(action, _)| action)
            .collect()
    }

    /// Whether `action` on `resource` is effectively allowed
    pub fn allows(&self, action: &str, resource: &str) -> bool {
        self.effective_permissions()
            .iter()
            .any(|(a, r)| pattern_matches(a, action) && pattern_matches(r, resource))
    }
}

/// Match a `*`-glob pattern against a concrete value
fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == value {
        return true;
    }
    if !pattern.contains('*') {
        return false;
    }
    Glob::new(&wildcard_glob(pattern))
        .map(|glob| glob.compile_matcher().is_match(value))
        .unwrap_or(false)
}

/// Glob source where only `*` is special; `${...}` tokens stay literal
fn wildcard_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    for (i, piece) in pattern.split('*').enumerate() {
        if i > 0 && !glob.ends_with('*') {
            glob.push('*');
        }
        glob.push_str(&globset::escape(piece));
    }
    glob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_actions_rejected() {
        let err = StatementBuilder::allow().resource("*").build().unwrap_err();
        assert!(matches!(err, Error::EmptyStatement { missing: "actions" }));
    }

    #[test]
    fn test_empty_resources_rejected() {
        let err = grant(
            Principal::service("tasks.apprunner.amazonaws.com"),
            ["s3:GetObject"],
            Vec::<ValueExpr>::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyStatement { missing: "resources" }));
    }

    #[test]
    fn test_grant_builds_allow_statement() {
        let statement = grant(
            Principal::canonical_user(ValueExpr::literal("abc")),
            ["s3:GetObject"],
            ["arn:aws:s3:::bucket/*"],
        )
        .unwrap();
        assert_eq!(statement.effect(), Effect::Allow);
        assert_eq!(statement.principals().len(), 1);
        assert!(!statement.is_public());
    }

    #[test]
    fn test_public_principal_detected() {
        let statement = grant(Principal::Anyone, ["s3:GetObject"], ["*"]).unwrap();
        assert!(statement.is_public());
        assert!(Principal::Anyone.is_unrestricted());
        assert!(!Principal::service("tasks.apprunner.amazonaws.com").is_unrestricted());
    }

    #[test]
    fn test_effective_permissions_subtract_deny() {
        let mut doc = PolicyDocument::new();
        doc.push(
            StatementBuilder::allow()
                .actions(["logs:CreateLogGroup", "logs:PutLogEvents"])
                .resource("arn:aws:logs:*:*:log-group:*")
                .build()
                .unwrap(),
        );
        doc.push(
            StatementBuilder::deny()
                .action("logs:Create*")
                .resource("*")
                .build()
                .unwrap(),
        );

        let actions = doc.effective_actions();
        assert_eq!(actions.len(), 1);
        assert!(actions.contains("logs:PutLogEvents"));
        assert!(doc.allows("logs:PutLogEvents", "arn:aws:logs:*:*:log-group:*"));
        assert!(!doc.allows("logs:CreateLogGroup", "arn:aws:logs:*:*:log-group:*"));
    }

    #[test]
    fn test_token_patterns_match_literally() {
        assert!(pattern_matches("${Site/Bucket.Arn}/*", "${Site/Bucket.Arn}/private/*"));
        assert!(!pattern_matches("${Site/Other.Arn}/*", "${Site/Bucket.Arn}/index.html"));
        assert!(pattern_matches("s3:**", "s3:GetObject"));
        assert_eq!(wildcard_glob("a[1]?*"), "a[[]1[]][?]*");
    }

    #[test]
    fn test_statement_config_is_sorted() {
        let statement = StatementBuilder::allow()
            .actions(["b:Two", "a:One"])
            .resource("*")
            .build()
            .unwrap();
        let config = statement.to_config();
        let actions = config.get("actions").and_then(ConfigValue::as_list).unwrap();
        assert_eq!(actions[0].as_str(), Some("a:One"));
        assert!(config.get("principals").is_none());
    }
}
