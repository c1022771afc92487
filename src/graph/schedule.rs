//! Dependency-ordered traversal of a component graph.

use crate::error::GraphError;
use crate::graph::{ComponentGraph, NodeId};
use crate::spec::ComponentSpec;
use std::collections::VecDeque;

impl ComponentGraph {
    /// Breadth-first walk from the roots that never visits a node before all
    /// of its parents. A node whose parents are not all done goes back to the
    /// end of the queue. Visited flags live only for the duration of one call,
    /// so the same graph can be walked again by another visitor.
    ///
    /// Returns the visit order. Fails with [`GraphError::Stalled`] when a full
    /// pass over the queue makes no progress, which happens when a queued node
    /// waits on a parent that can never run (a cycle feeding into it).
    pub fn traverse<F>(&self, mut visit: F) -> Result<Vec<NodeId>, GraphError>
    where
        F: FnMut(NodeId, &ComponentSpec),
    {
        let mut visited = vec![false; self.len()];
        let mut order = Vec::with_capacity(self.len());
        let mut queue: VecDeque<NodeId> = self.roots().iter().copied().collect();
        let mut requeued_in_a_row = 0usize;

        while let Some(id) = queue.pop_front() {
            let node = self.node(id);
            if node.parents.iter().any(|parent| !visited[parent.0]) {
                queue.push_back(id);
                requeued_in_a_row += 1;
                if requeued_in_a_row > queue.len() {
                    let mut pending: Vec<String> =
                        queue.iter().map(|id| self.full_name(*id)).collect();
                    pending.sort();
                    pending.dedup();
                    return Err(GraphError::Stalled { pending });
                }
                continue;
            }
            requeued_in_a_row = 0;

            if visited[id.0] {
                continue;
            }
            visit(id, node.component.as_ref());
            visited[id.0] = true;
            order.push(id);

            for &child in &node.children {
                if !visited[child.0] {
                    queue.push_back(child);
                }
            }
        }

        Ok(order)
    }

    /// Flat pass over every component, ignoring graph position.
    pub fn for_each_component<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &ComponentSpec),
    {
        for id in self.node_ids() {
            visit(id, self.component(id));
        }
    }

    /// Nodes the scheduler can never reach from a root.
    pub fn unreachable(&self) -> Vec<NodeId> {
        let mut seen = vec![false; self.len()];
        let mut stack: Vec<NodeId> = self.roots().to_vec();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            stack.extend(self.node(id).children.iter().copied());
        }
        self.node_ids().filter(|id| !seen[id.0]).collect()
    }
}
