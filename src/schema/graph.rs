//! Table dependency graph and creation-order planning.
//!
//! An edge A -> B in the dependency sense ("A needs B first") is stored as
//! a petgraph edge B -> A (prerequisite to dependent), so a topological
//! pass emits prerequisites before the tables that link to them.
//!
//! Cycles never abort the plan. Strongly connected components of size > 1
//! form the circular set; the condensation of the graph is acyclic, so a
//! Kahn pass over components places each circular group at the first point
//! all of its external prerequisites are satisfied. Ties are always broken
//! by the smallest original table index, which makes the order
//! deterministic and turns the no-dependency case into the identity order.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

/// Dependency graph over the tables of one base.
pub struct DependencyGraph {
    /// Edges run prerequisite -> dependent. Node insertion order matches
    /// the raw schema's table order.
    graph: DiGraph<String, ()>,
    index_of: HashMap<String, NodeIndex>,
}

/// The computed creation order plus the flagged circular set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationPlan {
    /// Total order over table ids.
    pub order: Vec<String>,
    /// Tables that are part of a dependency cycle.
    pub circular: BTreeSet<String>,
    /// The individual cycles (strongly connected components of size > 1).
    pub groups: Vec<BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build a graph containing every table, in raw schema order.
    pub fn new<I, S>(table_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();
        for id in table_ids {
            let id = id.into();
            let node = graph.add_node(id.clone());
            index_of.insert(id, node);
        }
        Self { graph, index_of }
    }

    /// Record that `table` depends on `prerequisite` existing first.
    ///
    /// Self-dependencies are not edges; the normalizer flags them as
    /// circular directly. Duplicate edges collapse.
    pub fn add_dependency(&mut self, table: &str, prerequisite: &str) {
        if table == prerequisite {
            return;
        }
        let (Some(&dependent), Some(&prereq)) =
            (self.index_of.get(table), self.index_of.get(prerequisite))
        else {
            debug_assert!(false, "dependency on a table missing from the graph");
            return;
        };
        self.graph.update_edge(prereq, dependent, ());
    }

    /// Compute the creation order and the circular set.
    pub fn creation_plan(&self) -> CreationPlan {
        let node_count = self.graph.node_count();
        let sccs = tarjan_scc(&self.graph);

        let mut component_of = vec![0usize; node_count];
        for (component, members) in sccs.iter().enumerate() {
            for &node in members {
                component_of[node.index()] = component;
            }
        }

        // Members per component as original indices, ascending.
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); sccs.len()];
        for (component, nodes) in sccs.iter().enumerate() {
            let mut indices: Vec<usize> = nodes.iter().map(|n| n.index()).collect();
            indices.sort_unstable();
            members[component] = indices;
        }

        let mut circular = BTreeSet::new();
        let mut groups = Vec::new();
        for indices in &members {
            if indices.len() > 1 {
                let group: BTreeSet<String> = indices
                    .iter()
                    .map(|&i| self.graph[NodeIndex::new(i)].clone())
                    .collect();
                circular.extend(group.iter().cloned());
                groups.push(group);
            }
        }

        // Condensation: edges and in-degrees between distinct components.
        let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); sccs.len()];
        let mut indegree = vec![0usize; sccs.len()];
        for edge in self.graph.edge_references() {
            let from = component_of[edge.source().index()];
            let to = component_of[edge.target().index()];
            if from != to && adjacency[from].insert(to) {
                indegree[to] += 1;
            }
        }

        // Kahn over components, smallest original index first.
        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
        for (component, indices) in members.iter().enumerate() {
            if indegree[component] == 0 {
                ready.push(Reverse((indices[0], component)));
            }
        }

        let mut order = Vec::with_capacity(node_count);
        while let Some(Reverse((_, component))) = ready.pop() {
            for &index in &members[component] {
                order.push(self.graph[NodeIndex::new(index)].clone());
            }
            for &next in &adjacency[component] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(Reverse((members[next][0], next)));
                }
            }
        }

        debug_assert_eq!(order.len(), node_count);
        CreationPlan {
            order,
            circular,
            groups,
        }
    }
}
