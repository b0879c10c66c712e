//! The assembly: published stacks and plan synthesis.
//!
//! Stacks are built independently and then published into an [`Assembly`].
//! Publishing is the barrier for cross-stack reads: a stack may only reference
//! declarations of stacks that were published before it, and a published stack
//! is never mutated again.

use indexmap::IndexMap;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::graph::dependencies::DependencyType;
use crate::graph::{AttrRef, DeclarationGraph, ResourceDeclaration, ResourceRef};
use crate::plan::{DeploymentPlan, PlannedDeclaration, PlannedStack};
use crate::stack::Stack;

/// Published stacks of one deployment
#[derive(Debug, Clone)]
pub struct Assembly {
    environment: Environment,
    stacks: IndexMap<String, Stack>,
}

impl Assembly {
    /// Create an empty assembly targeting `environment`
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            stacks: IndexMap::new(),
        }
    }

    /// Target environment
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Publish a completed stack
    pub fn publish(&mut self, stack: Stack) -> Result<()> {
        if self.stacks.contains_key(stack.name()) {
            return Err(Error::DuplicateStack(stack.name().to_string()));
        }

        stack.resolve()?;
        for reference in stack.external_references() {
            self.require(&reference)?;
        }

        tracing::info!(
            stack = %stack.name(),
            declarations = stack.declarations().len(),
            "Published stack"
        );
        self.stacks.insert(stack.name().to_string(), stack);
        Ok(())
    }

    /// Whether a stack of that name has been published
    pub fn is_published(&self, name: &str) -> bool {
        self.stacks.contains_key(name)
    }

    /// Look up a published stack
    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.get(name)
    }

    /// Published stacks in publish order
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    /// Resolve a handle into a published stack
    pub fn require(&self, reference: &ResourceRef) -> Result<&ResourceDeclaration> {
        let stack = self.stacks.get(&reference.stack).ok_or_else(|| {
            Error::unresolved(
                reference,
                format!("stack '{}' has not been published", reference.stack),
            )
        })?;
        stack.get(&reference.id).ok_or_else(|| {
            Error::unresolved(
                reference,
                format!("no such declaration in stack '{}'", reference.stack),
            )
        })
    }

    fn resolve_attribute(&self, attr: &AttrRef) -> Result<String> {
        let declaration = self.require(&attr.target)?;
        if !declaration.kind().exposes(&attr.attribute) {
            return Err(Error::unresolved(
                attr,
                format!(
                    "{} '{}' has no attribute '{}'",
                    declaration.kind(),
                    attr.target.id,
                    attr.attribute
                ),
            ));
        }
        Ok(attr.token())
    }

    /// Build the graph over every published declaration
    pub fn dependency_graph(&self) -> Result<DeclarationGraph> {
        let mut graph = DeclarationGraph::new();
        for stack in self.stacks.values() {
            for declaration in stack.declarations() {
                graph.declare(
                    ResourceRef::new(stack.name(), declaration.id()),
                    declaration.kind(),
                )?;
            }
        }

        for stack in self.stacks.values() {
            for declaration in stack.declarations() {
                let dependent = ResourceRef::new(stack.name(), declaration.id());
                for dependency in declaration.dependencies() {
                    self.require(&dependency)?;
                    let dependency_type = if dependency.stack != stack.name() {
                        DependencyType::CrossStack
                    } else if declaration.explicit_dependencies().contains(&dependency) {
                        DependencyType::Explicit
                    } else {
                        DependencyType::Attribute
                    };
                    graph.add_dependency(&dependent, &dependency, dependency_type)?;
                }
            }
        }
        Ok(graph)
    }

    /// Synthesize every published stack into one plan
    pub fn synthesize(&self) -> Result<DeploymentPlan> {
        let graph = self.dependency_graph()?;
        let order = graph.resolve()?;
        let resolver = |attr: &AttrRef| self.resolve_attribute(attr);

        let mut stacks = Vec::with_capacity(self.stacks.len());
        for stack in self.stacks.values() {
            let mut declarations = Vec::with_capacity(stack.declarations().len());
            for reference in order.iter().filter(|r| r.stack == stack.name()) {
                let Some(declaration) = stack.get(&reference.id) else {
                    continue;
                };
                let mut config = IndexMap::new();
                for (key, value) in declaration.config() {
                    config.insert(key.clone(), value.resolve(&resolver)?);
                }
                declarations.push(PlannedDeclaration {
                    id: reference.qualified(),
                    logical_id: reference.id.clone(),
                    kind: declaration.kind(),
                    config,
                    depends_on: graph
                        .dependencies_of(reference)
                        .iter()
                        .map(ResourceRef::qualified)
                        .collect(),
                });
            }

            let mut outputs = IndexMap::new();
            for output in stack.outputs() {
                outputs.insert(output.name.clone(), output.value.resolve(&resolver)?);
            }

            stacks.push(PlannedStack {
                name: stack.name().to_string(),
                declarations,
                outputs,
            });
        }

        let plan = DeploymentPlan {
            environment: self.environment.clone(),
            stacks,
            order: order.iter().map(ResourceRef::qualified).collect(),
        };
        tracing::info!(
            stacks = plan.stacks.len(),
            declarations = plan.declaration_count(),
            environment = %self.environment,
            "Synthesized deployment plan"
        );
        Ok(plan)
    }
}
