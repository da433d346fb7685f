//! The "awaiting-for" graph between builds.
//!
//! An edge `a -> b` means that some thread resolving build `a` is currently
//! blocked on tasks owned by build `b`. The weight counts how many such waits
//! are in flight, so that the edge only disappears once the last of them
//! ends. Before a new wait is allowed, we check that it would not close a
//! loop: a build that ends up waiting on itself can never make progress.

use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::BuildId;
use crate::error::BuildPath;

#[derive(Default)]
pub(crate) struct AwaitGraph {
    graph: DiGraph<BuildId, usize>,
    nodes: HashMap<BuildId, NodeIndex>,
}

impl AwaitGraph {
    fn node(&mut self, build: &BuildId) -> NodeIndex {
        if let Some(&index) = self.nodes.get(build) {
            return index;
        }

        let index = self.graph.add_node(build.clone());
        self.nodes.insert(build.clone(), index);
        index
    }

    /// Records that `requester` is about to wait on `producer`.
    ///
    /// Fails with the offending loop if `producer` already waits, directly or
    /// through other builds, on `requester`.
    pub(crate) fn enter(
        &mut self,
        requester: &BuildId,
        producer: &BuildId,
    ) -> Result<(), BuildPath> {
        let from = self.node(requester);
        let to = self.node(producer);

        if let Some(mut path) = self.path(to, from) {
            path.insert(0, requester.clone());
            return Err(BuildPath(path));
        }

        match self.graph.find_edge(from, to) {
            Some(edge) => self.graph[edge] += 1,
            None => {
                self.graph.add_edge(from, to, 1);
            }
        }

        Ok(())
    }

    /// Removes one wait of `requester` on `producer`.
    pub(crate) fn leave(&mut self, requester: &BuildId, producer: &BuildId) {
        let (Some(&from), Some(&to)) = (self.nodes.get(requester), self.nodes.get(producer)) else {
            return;
        };

        if let Some(edge) = self.graph.find_edge(from, to) {
            self.graph[edge] -= 1;
            if self.graph[edge] == 0 {
                self.graph.remove_edge(edge);
            }
        }
    }

    /// Currently active waits as `(requester, producer, count)`.
    pub(crate) fn edges(&self) -> Vec<(BuildId, BuildId, usize)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((
                    self.graph[from].clone(),
                    self.graph[to].clone(),
                    self.graph[edge],
                ))
            })
            .collect()
    }

    /// Shortest chain of builds leading from `from` to `to`, both included.
    fn path(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<BuildId>> {
        let (_, path) = astar(&self.graph, from, |node| node == to, |_| 1usize, |_| 0)?;
        Some(path.into_iter().map(|node| self.graph[node].clone()).collect())
    }
}
