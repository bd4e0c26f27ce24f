use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// An ordered (source, target) pair. A pair and its reverse are distinct
/// edges; source == target marks a self-loop.
pub type Edge = (String, String);

/// Canonical graph representation consumed by the layout core: unique node
/// identifiers induced from the edge list, a deduplicated directed edge
/// list, and optional per-edge weights.
///
/// Constructed once per layout request and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<String>,
    edges: Vec<Edge>,
    edge_set: HashSet<Edge>,
    weights: HashMap<Edge, f32>,
}

impl Graph {
    /// Build a graph from (source, target) pairs. Duplicate directed pairs
    /// are removed; the first occurrence wins for ordering.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = Edge>,
    {
        Self::build(edges.into_iter().map(|(source, target)| (source, target, None)))
    }

    /// Build a graph from (source, target, weight) triples.
    pub fn from_weighted_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (String, String, f32)>,
    {
        Self::build(
            edges
                .into_iter()
                .map(|(source, target, weight)| (source, target, Some(weight))),
        )
    }

    fn build<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (String, String, Option<f32>)>,
    {
        let mut graph = Graph::default();
        let mut node_set = BTreeSet::new();
        for (source, target, weight) in edges {
            node_set.insert(source.clone());
            node_set.insert(target.clone());
            let edge = (source, target);
            if graph.edge_set.contains(&edge) {
                continue;
            }
            if let Some(weight) = weight {
                graph.weights.insert(edge.clone(), weight);
            }
            graph.edge_set.insert(edge.clone());
            graph.edges.push(edge);
        }
        graph.nodes = node_set.into_iter().collect();
        graph
    }

    /// Node identifiers in deterministic (sorted) order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Weight of an edge; absent weights imply a uniform 1.0.
    pub fn weight(&self, edge: &Edge) -> f32 {
        self.weights.get(edge).copied().unwrap_or(1.0)
    }

    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edge_set.contains(edge)
    }

    /// True when the opposite direction of `edge` is also present.
    pub fn has_reverse(&self, edge: &Edge) -> bool {
        self.edge_set.contains(&(edge.1.clone(), edge.0.clone()))
    }

    pub fn is_self_loop(edge: &Edge) -> bool {
        edge.0 == edge.1
    }

    /// Connected components of the induced undirected graph, each as an
    /// ordered node set. Components are returned in order of their smallest
    /// node identifier.
    pub fn connected_components(&self) -> Vec<BTreeSet<String>> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for (source, target) in &self.edges {
            adjacency.entry(source).or_default().push(target);
            adjacency.entry(target).or_default().push(source);
        }

        let mut components = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if visited.contains(node.as_str()) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut queue = VecDeque::from([node.as_str()]);
            visited.insert(node);
            while let Some(current) = queue.pop_front() {
                component.insert(current.to_string());
                if let Some(neighbours) = adjacency.get(current) {
                    for &next in neighbours {
                        if visited.insert(next) {
                            queue.push_back(next);
                        }
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// The subgraph induced by `component`: edges whose endpoints both lie
    /// inside the component, with their weights.
    pub fn component_subgraph(&self, component: &BTreeSet<String>) -> Graph {
        Graph::build(self.edges.iter().filter_map(|(source, target)| {
            if component.contains(source) && component.contains(target) {
                let weight = self.weights.get(&(source.clone(), target.clone())).copied();
                Some((source.clone(), target.clone(), weight))
            } else {
                None
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str) -> Edge {
        (source.to_string(), target.to_string())
    }

    #[test]
    fn duplicate_directed_pairs_are_removed() {
        let graph = Graph::from_edges(vec![edge("a", "b"), edge("a", "b"), edge("b", "a")]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_reverse(&edge("a", "b")));
    }

    #[test]
    fn nodes_are_induced_and_sorted() {
        let graph = Graph::from_edges(vec![edge("c", "a"), edge("b", "c")]);
        assert_eq!(graph.nodes(), ["a", "b", "c"]);
    }

    #[test]
    fn missing_weight_defaults_to_one() {
        let graph = Graph::from_weighted_edges(vec![("a".to_string(), "b".to_string(), 2.5)]);
        assert_eq!(graph.weight(&edge("a", "b")), 2.5);
        assert_eq!(graph.weight(&edge("b", "a")), 1.0);
    }

    #[test]
    fn components_split_disconnected_graphs() {
        let graph = Graph::from_edges(vec![edge("a", "b"), edge("c", "d"), edge("d", "c")]);
        let components = graph.connected_components();
        assert_eq!(components.len(), 2);
        assert!(components[0].contains("a") && components[0].contains("b"));
        assert!(components[1].contains("c") && components[1].contains("d"));

        let sub = graph.component_subgraph(&components[1]);
        assert_eq!(sub.edge_count(), 2);
        assert_eq!(sub.nodes(), ["c", "d"]);
    }

    #[test]
    fn self_loop_detection() {
        assert!(Graph::is_self_loop(&edge("a", "a")));
        assert!(!Graph::is_self_loop(&edge("a", "b")));
    }
}
