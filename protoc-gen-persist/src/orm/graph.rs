//! Message dependency graph
//!
//! An edge `from -> to` means the row of `from` refers to a row of `to`, so
//! `to` has to exist first. Nullable edges can be deferred: the referring row
//! is written with a null key and filled in later.

use std::collections::HashMap;

use crate::error::SchemaError;

/// One foreign-key dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Message holding the foreign key
    pub from: String,
    /// Message the key points at
    pub to: String,
    /// Field that declares the association
    pub field: String,
    /// Whether the foreign key may be null
    pub nullable: bool,
}

/// Messages in declaration order plus their dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    edges: Vec<Edge>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    /// A graph with `nodes` in declaration order and no edges
    pub fn new(nodes: impl IntoIterator<Item = String>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            edges: Vec::new(),
        }
    }

    /// Add a dependency. Edges to unknown nodes are kept but never block.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// All edges, in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The edge that closes a cycle made only of non-nullable edges, if any
    pub fn find_required_cycle(&self) -> Option<&Edge> {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.as_str(), i))
            .collect();
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if marks[start] == Mark::Unvisited {
                if let Some(edge) = self.visit(start, &index, &mut marks) {
                    return Some(edge);
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: usize,
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
    ) -> Option<&Edge> {
        marks[node] = Mark::InProgress;
        let name = &self.nodes[node];
        for edge in self.edges.iter().filter(|e| !e.nullable && &e.from == name) {
            let Some(&next) = index.get(edge.to.as_str()) else {
                continue;
            };
            match marks[next] {
                Mark::InProgress => return Some(edge),
                Mark::Unvisited => {
                    if let Some(found) = self.visit(next, index, marks) {
                        return Some(found);
                    }
                }
                Mark::Done => {}
            }
        }
        marks[node] = Mark::Done;
        None
    }

    /// Dependency order: every message after the messages it requires
    ///
    /// Ties are broken by declaration order. When every remaining message
    /// still waits on another, the earliest one whose pending edges are all
    /// nullable goes next.
    pub fn order(&self) -> Result<Vec<String>, SchemaError> {
        if let Some(edge) = self.find_required_cycle() {
            return Err(SchemaError::CyclicAssociation {
                from: edge.from.clone(),
                to: edge.to.clone(),
                field: edge.field.clone(),
            });
        }

        let mut emitted = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        while order.len() < self.nodes.len() {
            let pending = |node: usize| -> Vec<&Edge> {
                let name = &self.nodes[node];
                self.edges
                    .iter()
                    .filter(|e| &e.from == name && &e.to != name)
                    .filter(|e| {
                        self.nodes
                            .iter()
                            .position(|n| n == &e.to)
                            .is_some_and(|target| !emitted[target])
                    })
                    .collect()
            };

            let free = (0..self.nodes.len()).find(|&n| !emitted[n] && pending(n).is_empty());
            let next = match free {
                Some(node) => node,
                None => (0..self.nodes.len())
                    .find(|&n| !emitted[n] && pending(n).iter().all(|e| e.nullable))
                    .ok_or_else(|| {
                        let stuck = (0..self.nodes.len())
                            .find(|&n| !emitted[n])
                            .and_then(|n| pending(n).first().copied().cloned());
                        match stuck {
                            Some(edge) => SchemaError::CyclicAssociation {
                                from: edge.from,
                                to: edge.to,
                                field: edge.field,
                            },
                            None => SchemaError::malformed("association graph", "unresolvable order"),
                        }
                    })?,
            };
            emitted[next] = true;
            order.push(self.nodes[next].clone());
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, nullable: bool) -> Edge {
        Edge {
            from: from.into(),
            to: to.into(),
            field: format!("{}_ref", to.to_lowercase()),
            nullable,
        }
    }

    fn graph(nodes: &[&str], edges: Vec<Edge>) -> DependencyGraph {
        let mut graph = DependencyGraph::new(nodes.iter().map(|n| n.to_string()));
        for e in edges {
            graph.add_edge(e);
        }
        graph
    }

    #[test]
    fn test_dependencies_come_first() {
        let g = graph(
            &["Article", "Comment", "Author"],
            vec![edge("Article", "Author", false), edge("Comment", "Article", true)],
        );
        assert_eq!(g.order().unwrap(), vec!["Author", "Article", "Comment"]);
    }

    #[test]
    fn test_independent_nodes_keep_declaration_order() {
        let g = graph(&["C", "A", "B"], vec![]);
        assert_eq!(g.order().unwrap(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_required_cycle_is_rejected() {
        let g = graph(&["A", "B"], vec![edge("A", "B", false), edge("B", "A", false)]);
        let err = g.order().unwrap_err();
        assert_eq!(
            err,
            SchemaError::CyclicAssociation {
                from: "B".into(),
                to: "A".into(),
                field: "a_ref".into(),
            }
        );
    }

    #[test]
    fn test_required_self_reference_is_a_cycle() {
        let g = graph(&["Node"], vec![edge("Node", "Node", false)]);
        assert!(g.find_required_cycle().is_some());
        let g = graph(&["Node"], vec![edge("Node", "Node", true)]);
        assert_eq!(g.order().unwrap(), vec!["Node"]);
    }

    #[test]
    fn test_nullable_edge_breaks_cycle() {
        let g = graph(
            &["A", "B", "C"],
            vec![
                edge("A", "B", true),
                edge("B", "C", false),
                edge("C", "A", false),
            ],
        );
        assert!(g.find_required_cycle().is_none());
        // A waits on B only through a nullable key, so it goes first.
        assert_eq!(g.order().unwrap(), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let build = || {
            graph(
                &["Tag", "Article", "Author", "Comment"],
                vec![edge("Article", "Author", true), edge("Comment", "Article", true)],
            )
        };
        assert_eq!(build().order().unwrap(), build().order().unwrap());
    }
}
