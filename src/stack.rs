//! Stacks: named, independently synthesizable groups of declarations.
//!
//! A stack owns its declarations exclusively. Other stacks only ever hold
//! [`ResourceRef`] handles into it, which the [`Assembly`](crate::assembly::Assembly)
//! resolves once the stack has been published.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::graph::dependencies::DependencyType;
use crate::graph::{DeclarationGraph, ResourceDeclaration, ResourceKind, ResourceRef, ValueExpr};
use crate::policy::{PolicyDocument, PolicyStatement};

/// A policy statement attached to a role or bucket
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAttachment {
    /// The `PolicyStatement` declaration recording the attachment
    pub id: ResourceRef,
    /// The role or bucket the statement is attached to
    pub target: ResourceRef,
    /// The attached statement
    pub statement: PolicyStatement,
}

/// A user-facing stack output
#[derive(Debug, Clone, PartialEq)]
pub struct StackOutput {
    /// Output name
    pub name: String,
    /// Deferred value, resolved when the plan is synthesized
    pub value: ValueExpr,
}

/// A stack under construction or published
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    declarations: Vec<ResourceDeclaration>,
    index: HashMap<String, usize>,
    outputs: IndexMap<String, StackOutput>,
    attachments: Vec<PolicyAttachment>,
}

impl Stack {
    /// Create an empty stack
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            index: HashMap::new(),
            outputs: IndexMap::new(),
            attachments: Vec::new(),
        }
    }

    /// Stack name, unique per deployment
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a declaration and return its address
    pub fn declare(&mut self, declaration: ResourceDeclaration) -> Result<ResourceRef> {
        if self.index.contains_key(declaration.id()) {
            return Err(Error::duplicate_id(&self.name, declaration.id()));
        }

        let reference = ResourceRef::new(&self.name, declaration.id());
        tracing::debug!(
            stack = %self.name,
            id = %declaration.id(),
            kind = %declaration.kind(),
            "Declared resource"
        );
        self.index
            .insert(declaration.id().to_string(), self.declarations.len());
        self.declarations.push(declaration);
        Ok(reference)
    }

    /// Look up a declaration by id
    pub fn get(&self, id: &str) -> Option<&ResourceDeclaration> {
        self.index.get(id).map(|&i| &self.declarations[i])
    }

    /// Whether `reference` points at a declaration of this stack
    pub fn contains(&self, reference: &ResourceRef) -> bool {
        reference.stack == self.name && self.index.contains_key(&reference.id)
    }

    /// Declarations in declaration order
    pub fn declarations(&self) -> &[ResourceDeclaration] {
        &self.declarations
    }

    /// Attach a statement to a role or bucket of this stack
    pub fn attach(
        &mut self,
        target: &ResourceRef,
        statement: &PolicyStatement,
    ) -> Result<ResourceRef> {
        let kind = self
            .get(&target.id)
            .filter(|_| target.stack == self.name)
            .map(ResourceDeclaration::kind)
            .ok_or_else(|| {
                Error::unresolved(target, format!("not declared in stack '{}'", self.name))
            })?;

        let attribute = match kind {
            ResourceKind::Role => "RoleName",
            ResourceKind::Bucket => "BucketName",
            other => {
                return Err(Error::PolicyViolation {
                    stack: self.name.clone(),
                    message: format!(
                        "statements attach to roles or buckets, not to {} '{}'",
                        other, target.id
                    ),
                })
            }
        };

        let ordinal = self
            .attachments
            .iter()
            .filter(|a| &a.target == target)
            .count()
            + 1;
        let declaration = ResourceDeclaration::new(
            ResourceKind::PolicyStatement,
            format!("{}Policy{}", target.id, ordinal),
        )
        .with("attached_to", target.attr(attribute))
        .with("statement", statement.to_config());

        let id = self.declare(declaration)?;
        self.attachments.push(PolicyAttachment {
            id: id.clone(),
            target: target.clone(),
            statement: statement.clone(),
        });
        Ok(id)
    }

    /// All attachments in attachment order
    pub fn attachments(&self) -> &[PolicyAttachment] {
        &self.attachments
    }

    /// Statements attached to `target`
    pub fn policy_document(&self, target: &ResourceRef) -> PolicyDocument {
        let mut document = PolicyDocument::new();
        for attachment in self.attachments.iter().filter(|a| &a.target == target) {
            document.push(attachment.statement.clone());
        }
        document
    }

    /// Declare a user-facing output
    pub fn add_output(&mut self, name: impl Into<String>, value: ValueExpr) -> Result<()> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(Error::DuplicateOutput {
                stack: self.name.clone(),
                name,
            });
        }
        self.outputs
            .insert(name.clone(), StackOutput { name, value });
        Ok(())
    }

    /// Look up an output
    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.outputs.get(name)
    }

    /// Outputs in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &StackOutput> {
        self.outputs.values()
    }

    /// Declarations of other stacks this stack reads from
    pub fn external_references(&self) -> BTreeSet<ResourceRef> {
        let mut external: BTreeSet<ResourceRef> = self
            .declarations
            .iter()
            .flat_map(ResourceDeclaration::dependencies)
            .collect();
        for output in self.outputs.values() {
            external.extend(output.value.references().into_iter().map(|a| a.target.clone()));
        }
        external.retain(|r| r.stack != self.name);
        external
    }

    /// Build the graph of this stack's own declarations
    ///
    /// References into other stacks are skipped here; the assembly checks them.
    pub fn dependency_graph(&self) -> Result<DeclarationGraph> {
        let mut graph = DeclarationGraph::new();
        for declaration in &self.declarations {
            graph.declare(
                ResourceRef::new(&self.name, declaration.id()),
                declaration.kind(),
            )?;
        }

        for declaration in &self.declarations {
            let dependent = ResourceRef::new(&self.name, declaration.id());
            for dependency in declaration.dependencies() {
                if dependency.stack != self.name {
                    continue;
                }
                let dependency_type = if declaration.explicit_dependencies().contains(&dependency)
                {
                    DependencyType::Explicit
                } else {
                    DependencyType::Attribute
                };
                graph.add_dependency(&dependent, &dependency, dependency_type)?;
            }
        }

        for output in self.outputs.values() {
            for attr in output.value.references() {
                if attr.target.stack == self.name && !graph.contains(&attr.target) {
                    return Err(Error::unresolved(
                        attr,
                        format!("output '{}' reads an undeclared resource", output.name),
                    ));
                }
            }
        }

        Ok(graph)
    }

    /// Declarations in provisioning order
    pub fn resolve(&self) -> Result<Vec<&ResourceDeclaration>> {
        let order = self.dependency_graph()?.resolve()?;
        Ok(order
            .iter()
            .filter_map(|reference| self.get(&reference.id))
            .collect())
    }
}

/// A stack together with the handle consumers use to read from it
#[derive(Debug, Clone)]
pub struct Built<H> {
    /// The built stack, ready to publish
    pub stack: Stack,
    /// Typed handle onto the stack's resources and outputs
    pub handle: H,
}
