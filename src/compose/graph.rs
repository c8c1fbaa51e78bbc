//! Ordering graph over included fragments.
//!
//! Nodes are added in registration order, so a node's index doubles as its
//! registration rank. An edge `a -> b` means `a` must come before `b`.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::compose::errors::ComposeError;

/// Precedence constraints between fragments.
#[derive(Debug, Clone, Default)]
pub struct OrderGraph<'a> {
    graph: DiGraph<&'a str, ()>,
    nodes: HashMap<&'a str, NodeIndex>,
}

impl<'a> OrderGraph<'a> {
    /// Create a graph whose nodes are the given names, in registration order.
    pub fn new(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut graph = OrderGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };
        for name in names {
            let node = graph.graph.add_node(name);
            graph.nodes.insert(name, node);
        }
        graph
    }

    /// Check if a name is a node of this graph.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Require `before` to come before `after`.
    ///
    /// Returns false if either side is not a node.
    pub fn add_edge(&mut self, before: &str, after: &str) -> bool {
        match (self.nodes.get(before), self.nodes.get(after)) {
            (Some(&from), Some(&to)) => {
                if !self.graph.contains_edge(from, to) {
                    self.graph.add_edge(from, to, ());
                }
                true
            }
            _ => false,
        }
    }

    /// Number of constraint edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Topological order that keeps registration order wherever the
    /// constraints allow.
    ///
    /// Kahn's algorithm with the ready set ordered by registration index:
    /// among all fragments whose predecessors are placed, the earliest
    /// registered goes next.
    pub fn stable_order(&self) -> Result<Vec<&'a str>, ComposeError> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.graph[node]);
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(ComposeError::Cycle {
                fragments: self.cycle_participants(),
            });
        }

        Ok(order)
    }

    /// The earliest-registered strongly connected component with more than
    /// one node, in registration order.
    fn cycle_participants(&self) -> Vec<String> {
        let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || scc.iter().any(|&n| self.graph.contains_edge(n, n))
            })
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        cycles.sort();

        cycles
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|n| self.graph[n].to_string())
            .collect()
    }
}
