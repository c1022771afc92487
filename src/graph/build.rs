//! Component graph construction.
//!
//! Nodes are deduplicated by `(name, prefix)`, linked through their child
//! references, and the root set is reduced to nodes without parents. The
//! flat node list stays available for passes that ignore graph position.

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::GraphError;
use crate::spec::{ChildRef, ComponentSpec, Prefix};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub component: Rc<ComponentSpec>,
    /// Distinct child nodes, in declaration order.
    pub children: Vec<NodeId>,
    /// Back-references, only used for readiness checks.
    pub parents: Vec<NodeId>,
}

/// One resolved child reference: `parent.children[child_ref]` matched `child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub parent: NodeId,
    pub child: NodeId,
    pub child_ref: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    nodes: Vec<GraphNode>,
    roots: Vec<NodeId>,
    edges: Vec<Edge>,
}

impl ComponentGraph {
    pub fn build(components: Vec<ComponentSpec>, diagnostics: &mut Diagnostics) -> Self {
        let mut graph = Self::default();

        // 1) One node per identity.
        let mut by_identity: BTreeMap<(String, Prefix), NodeId> = BTreeMap::new();
        for component in components {
            let key = (component.name.clone(), component.prefix);
            if by_identity.contains_key(&key) {
                diagnostics.info(
                    Stage::Graph,
                    component.full_name(),
                    "duplicate component identity ignored",
                );
                continue;
            }
            let id = NodeId(graph.nodes.len());
            by_identity.insert(key, id);
            graph.nodes.push(GraphNode {
                component: Rc::new(component),
                children: Vec::new(),
                parents: Vec::new(),
            });
        }

        // 2) Link every child reference to each component it matches.
        for index in 0..graph.nodes.len() {
            let parent = NodeId(index);
            let component = Rc::clone(&graph.nodes[index].component);
            for (child_ref, child) in component.children.iter().enumerate() {
                let matches = graph.matching(child);
                if matches.is_empty() {
                    diagnostics.warn(
                        Stage::Graph,
                        component.full_name(),
                        format!(
                            "child reference {}_{} matches no component; edge skipped",
                            child.child_prefix, child.child_name
                        ),
                    );
                    continue;
                }
                for matched in matches {
                    graph.link(parent, matched);
                    graph.edges.push(Edge {
                        parent,
                        child: matched,
                        child_ref,
                    });
                }
            }
        }

        // 3) Keep only parentless nodes as traversal entry points.
        graph.roots = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parents.is_empty())
            .map(|(index, _)| NodeId(index))
            .collect();

        tracing::debug!(
            nodes = graph.nodes.len(),
            roots = graph.roots.len(),
            edges = graph.edges.len(),
            "component graph built"
        );
        graph
    }

    fn matching(&self, child: &ChildRef) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.component.matches(child))
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes[parent.0].children.contains(&child) {
            self.nodes[parent.0].children.push(child);
        }
        if !self.nodes[child.0].parents.contains(&parent) {
            self.nodes[child.0].parents.push(parent);
        }
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn component(&self, id: NodeId) -> &ComponentSpec {
        &self.nodes[id.0].component
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The child reference an edge was resolved from.
    pub fn child_ref(&self, edge: &Edge) -> &ChildRef {
        &self.component(edge.parent).children[edge.child_ref]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Every component, regardless of graph position.
    pub fn components(&self) -> impl Iterator<Item = &ComponentSpec> {
        self.nodes.iter().map(|node| node.component.as_ref())
    }

    pub fn find(&self, name: &str, prefix: Prefix) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.component.identity() == (name, prefix))
            .map(NodeId)
    }

    pub fn full_name(&self, id: NodeId) -> String {
        self.component(id).full_name()
    }

    /// Depth-first search with temp/perm marks over every node, so cycles
    /// with no root leading into them are found too.
    pub fn find_cycle(&self) -> Option<Vec<NodeId>> {
        #[derive(Copy, Clone, PartialEq, Eq)]
        enum Mark {
            Temp,
            Perm,
        }

        fn dfs(
            graph: &ComponentGraph,
            v: NodeId,
            marks: &mut BTreeMap<NodeId, Mark>,
            stack: &mut Vec<NodeId>,
        ) -> Option<Vec<NodeId>> {
            match marks.get(&v) {
                Some(Mark::Perm) => return None,
                Some(Mark::Temp) => {
                    // v is on the current path => cycle from its first occurrence
                    let start = stack.iter().position(|n| *n == v).unwrap_or(0);
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(v);
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(v, Mark::Temp);
            stack.push(v);
            for &child in &graph.node(v).children {
                if let Some(cycle) = dfs(graph, child, marks, stack) {
                    return Some(cycle);
                }
            }
            stack.pop();
            marks.insert(v, Mark::Perm);
            None
        }

        let mut marks = BTreeMap::new();
        let mut stack = Vec::new();
        for id in self.node_ids() {
            stack.clear();
            if let Some(cycle) = dfs(self, id, &mut marks, &mut stack) {
                return Some(cycle);
            }
        }
        None
    }

    pub fn check_acyclic(&self) -> Result<(), GraphError> {
        match self.find_cycle() {
            Some(cycle) => Err(GraphError::Cycle {
                members: cycle.into_iter().map(|id| self.full_name(id)).collect(),
            }),
            None => Ok(()),
        }
    }
}
