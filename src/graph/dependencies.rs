//! Declaration Dependency Tracking
//!
//! This module builds the directed graph of declarations used to:
//!
//! - Detect duplicate ids and dangling references
//! - Detect dependency cycles
//! - Produce the provisioning order (dependencies before dependents)
//! - Render the graph for visualization

use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::{ResourceKind, ResourceRef};
use crate::error::{Error, Result};

/// Why one declaration depends on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Declared with `depends_on`
    Explicit,
    /// The dependent's configuration reads an attribute of the dependency
    Attribute,
    /// Either of the above, crossing a stack boundary
    CrossStack,
}

/// A node in the declaration graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationNode {
    /// Address of the declaration
    pub reference: ResourceRef,
    /// Declaration kind
    pub kind: ResourceKind,
}

/// The dependency graph over declarations of one or more stacks
#[derive(Debug, Clone, Default)]
pub struct DeclarationGraph {
    /// Edges point from a dependency to its dependent
    graph: DiGraph<DeclarationNode, DependencyType>,
    /// Map from declaration address to node index
    node_indices: HashMap<ResourceRef, NodeIndex>,
}

impl DeclarationGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration
    pub fn declare(&mut self, reference: ResourceRef, kind: ResourceKind) -> Result<NodeIndex> {
        if self.node_indices.contains_key(&reference) {
            return Err(Error::duplicate_id(&reference.stack, &reference.id));
        }

        let idx = self.graph.add_node(DeclarationNode {
            reference: reference.clone(),
            kind,
        });
        self.node_indices.insert(reference, idx);
        Ok(idx)
    }

    /// Record that `dependent` must be provisioned after `dependency`
    pub fn add_dependency(
        &mut self,
        dependent: &ResourceRef,
        dependency: &ResourceRef,
        dependency_type: DependencyType,
    ) -> Result<()> {
        let to_idx = *self
            .node_indices
            .get(dependent)
            .ok_or_else(|| Error::unresolved(dependent, "declaration is not part of the graph"))?;
        let from_idx = *self.node_indices.get(dependency).ok_or_else(|| {
            Error::unresolved(dependency, format!("required by '{}' but never declared", dependent))
        })?;

        self.graph.update_edge(from_idx, to_idx, dependency_type);
        Ok(())
    }

    /// Whether a declaration is part of the graph
    pub fn contains(&self, reference: &ResourceRef) -> bool {
        self.node_indices.contains_key(reference)
    }

    /// Check for dependency cycles
    pub fn has_cycles(&self) -> bool {
        !self.get_cycles().is_empty()
    }

    /// Get all cycles in the graph, each as a list of qualified ids
    pub fn get_cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                // A single node is only a cycle if it depends on itself
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut members: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx))
                    .map(|n| n.reference.qualified())
                    .collect();
                members.sort();
                members
            })
            .collect()
    }

    /// Topological order: every declaration after all of its dependencies
    pub fn resolve(&self) -> Result<Vec<ResourceRef>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx))
                .map(|n| n.reference.clone())
                .collect()),
            Err(_) => {
                let members = self.get_cycles().into_iter().next().unwrap_or_default();
                Err(Error::Cycle { members })
            }
        }
    }

    /// Direct dependencies of a declaration, sorted
    pub fn dependencies_of(&self, reference: &ResourceRef) -> Vec<ResourceRef> {
        let mut deps: Vec<ResourceRef> = self
            .node_indices
            .get(reference)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .filter_map(|n| self.graph.node_weight(n))
                    .map(|n| n.reference.clone())
                    .collect()
            })
            .unwrap_or_default();
        deps.sort();
        deps
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Generate a DOT format representation for visualization
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph plan {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        let mut by_stack: Vec<(&str, Vec<&DeclarationNode>)> = Vec::new();
        for idx in self.graph.node_indices() {
            if let Some(node) = self.graph.node_weight(idx) {
                let stack = node.reference.stack.as_str();
                match by_stack.iter().position(|(s, _)| *s == stack) {
                    Some(i) => by_stack[i].1.push(node),
                    None => by_stack.push((stack, vec![node])),
                }
            }
        }

        for (i, (stack, nodes)) in by_stack.iter().enumerate() {
            output.push_str(&format!("  subgraph cluster_{} {{\n", i));
            output.push_str(&format!("    label=\"{}\";\n", stack));
            for node in nodes {
                output.push_str(&format!(
                    "    \"{}\" [label=\"{}\\n{}\"];\n",
                    node.reference.qualified(),
                    node.reference.id,
                    node.kind
                ));
            }
            output.push_str("  }\n");
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = self
                .graph
                .node_weight(edge.source())
                .map(|n| n.reference.qualified())
                .unwrap_or_default();
            let target = self
                .graph
                .node_weight(edge.target())
                .map(|n| n.reference.qualified())
                .unwrap_or_default();

            let style = match edge.weight() {
                DependencyType::Explicit => "solid",
                DependencyType::Attribute => "dashed",
                DependencyType::CrossStack => "bold",
            };

            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}];\n",
                source, target, style
            ));
        }

        output.push_str("}\n");
        output
    }
}
