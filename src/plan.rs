//! The synthesized deployment plan.
//!
//! A [`DeploymentPlan`] is the immutable result of synthesizing an
//! [`Assembly`](crate::assembly::Assembly): every declaration of every stack,
//! in provisioning order, with attribute references rendered as
//! `${stack/id.Attribute}` tokens the backend substitutes with concrete
//! identifiers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::Result;
use crate::graph::dependencies::DependencyType;
use crate::graph::{DeclarationGraph, ResourceKind, ResourceRef};

/// One resolved declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDeclaration {
    /// Qualified id, `stack/id`
    pub id: String,
    /// Id within the owning stack
    pub logical_id: String,
    /// Declaration kind
    pub kind: ResourceKind,
    /// Configuration with every reference rendered
    pub config: IndexMap<String, serde_json::Value>,
    /// Qualified ids of direct dependencies, sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// One stack of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStack {
    /// Stack name
    pub name: String,
    /// Declarations in provisioning order
    pub declarations: Vec<PlannedDeclaration>,
    /// Rendered outputs
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

/// Resolved, ordered declarations of every published stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Target environment
    pub environment: Environment,
    /// Stacks in publish order
    pub stacks: Vec<PlannedStack>,
    /// Global provisioning order, qualified ids
    pub order: Vec<String>,
}

impl DeploymentPlan {
    /// Whether the plan contains no stacks
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Look up a stack by name
    pub fn stack(&self, name: &str) -> Option<&PlannedStack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    /// Look up a declaration by qualified id
    pub fn declaration(&self, id: &str) -> Option<&PlannedDeclaration> {
        self.stacks
            .iter()
            .flat_map(|s| s.declarations.iter())
            .find(|d| d.id == id)
    }

    /// Total number of declarations
    pub fn declaration_count(&self) -> usize {
        self.stacks.iter().map(|s| s.declarations.len()).sum()
    }

    /// First output named `name` across all stacks
    pub fn output(&self, name: &str) -> Option<&str> {
        self.stacks
            .iter()
            .find_map(|s| s.outputs.get(name))
            .map(String::as_str)
    }

    /// Every output as `(stack, name, value)`
    pub fn outputs(&self) -> Vec<(&str, &str, &str)> {
        self.stacks
            .iter()
            .flat_map(|s| {
                s.outputs
                    .iter()
                    .map(move |(name, value)| (s.name.as_str(), name.as_str(), value.as_str()))
            })
            .collect()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Rebuild the dependency graph of the plan
    pub fn graph(&self) -> Result<DeclarationGraph> {
        let mut graph = DeclarationGraph::new();
        for stack in &self.stacks {
            for declaration in &stack.declarations {
                graph.declare(
                    ResourceRef::new(&stack.name, &declaration.logical_id),
                    declaration.kind,
                )?;
            }
        }

        for stack in &self.stacks {
            for declaration in &stack.declarations {
                let dependent = ResourceRef::new(&stack.name, &declaration.logical_id);
                for qualified in &declaration.depends_on {
                    let dependency = parse_qualified(qualified);
                    let dependency_type = if dependency.stack == stack.name {
                        DependencyType::Attribute
                    } else {
                        DependencyType::CrossStack
                    };
                    graph.add_dependency(&dependent, &dependency, dependency_type)?;
                }
            }
        }
        Ok(graph)
    }

    /// Render the dependency graph in DOT format
    pub fn to_dot(&self) -> Result<String> {
        Ok(self.graph()?.to_dot())
    }
}

fn parse_qualified(qualified: &str) -> ResourceRef {
    match qualified.split_once('/') {
        Some((stack, id)) => ResourceRef::new(stack, id),
        None => ResourceRef::new("", qualified),
    }
}
