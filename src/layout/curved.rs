use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{NodeLayoutConfig, RoutingConfig};
use crate::error::LayoutError;
use crate::geometry::Point;
use crate::graph::{Edge, Graph};

use super::force::{RelaxOptions, RepulsionSource, relax};
use super::routing::{node_position, selfloop_angles, selfloop_seed_points};
use super::spline::smooth_path;

/// Control points allotted per unit of normalized edge length.
const CONTROL_POINTS_PER_UNIT: f32 = 10.0;
/// Every chain has at least one and at most this many control points.
const MAX_CONTROL_POINTS: usize = 5;
/// Self-loop chains always carry this many control points.
const SELFLOOP_CONTROL_POINTS: usize = 5;
/// Lateral seed offset (relative to edge length) that keeps anti-parallel
/// chains from intertwining when parallel edges are kept separate.
const PARALLEL_EDGE_OFFSET: f32 = 1e-3;
/// Node clearance multiplier during control point optimization.
const NODE_CLEARANCE_FACTOR: f32 = 2.0;

/// Route edges as curved paths that avoid nodes and each other: each edge
/// becomes a chain of mobile control points relaxed against the fixed node
/// positions by the shared force simulation, then smoothed.
pub(super) fn curved_edge_paths(
    graph: &Graph,
    positions: &BTreeMap<String, Point>,
    config: &RoutingConfig,
    node_config: &NodeLayoutConfig,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    let mut nonloops = Vec::new();
    let mut selfloops = Vec::new();
    for edge in graph.edges() {
        if Graph::is_self_loop(edge) {
            selfloops.push(edge.clone());
        } else {
            nonloops.push(edge.clone());
        }
    }

    let mut paths = if config.bundle_parallel_edges {
        // Optimize one canonical direction per bidirectional pair; the
        // reverse path is reconstructed afterwards by reversal.
        let mut canonical = Vec::new();
        let mut reconstructed = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for edge in &nonloops {
            if graph.has_reverse(edge) {
                let key = if edge.0 < edge.1 {
                    (edge.0.clone(), edge.1.clone())
                } else {
                    (edge.1.clone(), edge.0.clone())
                };
                if !seen.insert(key) {
                    reconstructed.push(edge.clone());
                    continue;
                }
            }
            canonical.push(edge.clone());
        }
        let mut paths = optimize_nonloop_chains(&canonical, positions, config, node_config)?;
        for edge in reconstructed {
            let reverse = (edge.1.clone(), edge.0.clone());
            let mut path = paths[&reverse].clone();
            path.reverse();
            paths.insert(edge, path);
        }
        paths
    } else {
        optimize_nonloop_chains(&nonloops, positions, config, node_config)?
    };

    if !selfloops.is_empty() {
        let loop_paths = optimize_selfloop_chains(&selfloops, positions, config, &paths)?;
        paths.extend(loop_paths);
    }
    Ok(paths)
}

/// Number of control points for an edge: grows with its length relative to
/// the canvas scale, floored at one and capped at five.
fn control_point_count(edge_length: f32, scale: f32) -> usize {
    let scale_norm = (2.0 * scale * scale).sqrt();
    ((edge_length / scale_norm * CONTROL_POINTS_PER_UNIT) as usize).clamp(1, MAX_CONTROL_POINTS)
}

/// Seed chains on the straight line between endpoints, expand every edge
/// into sub-edges through its chain, relax the expanded point set with the
/// real nodes held fixed, and smooth the resulting paths.
fn optimize_nonloop_chains(
    edges: &[Edge],
    positions: &BTreeMap<String, Point>,
    config: &RoutingConfig,
    node_config: &NodeLayoutConfig,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    let mut arena: Vec<Point> = positions.values().copied().collect();
    let node_index: HashMap<&str, usize> = positions
        .keys()
        .enumerate()
        .map(|(i, node)| (node.as_str(), i))
        .collect();
    let mut fixed = vec![true; arena.len()];
    let mut sizes = vec![NODE_CLEARANCE_FACTOR * node_config.node_size; arena.len()];

    let edge_set: HashSet<(&str, &str)> = edges
        .iter()
        .map(|edge| (edge.0.as_str(), edge.1.as_str()))
        .collect();

    let mut chains: Vec<(Edge, Vec<usize>)> = Vec::with_capacity(edges.len());
    let mut expanded: Vec<(usize, usize, f32)> = Vec::new();
    for edge in edges {
        let source = node_position(positions, &edge.0)?;
        let target = node_position(positions, &edge.1)?;
        let chord = target - source;
        let count = control_point_count(chord.norm(), node_config.scale);

        // Offset the seeds ever so slightly to one side, so bi-directional
        // chains do not overlap completely and intertwine.
        let offset = if !config.bundle_parallel_edges
            && edge_set.contains(&(edge.1.as_str(), edge.0.as_str()))
        {
            chord.orthogonal() * (PARALLEL_EDGE_OFFSET * chord.norm())
        } else {
            Point::ZERO
        };

        let mut handles = Vec::with_capacity(count);
        for i in 1..=count {
            let fraction = i as f32 / (count + 1) as f32;
            arena.push(source.lerp(target, fraction) - offset);
            fixed.push(false);
            sizes.push(0.0);
            handles.push(arena.len() - 1);
        }

        let source_handle = node_index[edge.0.as_str()];
        let target_handle = node_index[edge.1.as_str()];
        let mut previous = source_handle;
        for &handle in &handles {
            expanded.push((previous, handle, 1.0));
            previous = handle;
        }
        expanded.push((previous, target_handle, 1.0));
        chains.push((edge.clone(), handles));
    }

    let repulsion = if config.bundle_parallel_edges {
        // Control points are repulsed by nodes but not by each other, so
        // parallel edges can share a path.
        RepulsionSource::FixedOnly
    } else {
        RepulsionSource::All
    };
    relax(
        &mut arena,
        &fixed,
        &sizes,
        &expanded,
        &RelaxOptions {
            k: config.k,
            iterations: config.iterations,
            initial_temperature: Some(config.initial_temperature),
            repulsion,
        },
    );

    let mut paths = BTreeMap::new();
    for (edge, handles) in chains {
        let mut control = Vec::with_capacity(handles.len() + 2);
        control.push(positions[&edge.0]);
        control.extend(handles.iter().map(|&handle| arena[handle]));
        control.push(positions[&edge.1]);
        paths.insert(edge, smooth_path(&control, config.path_resolution));
    }
    Ok(paths)
}

/// Self-loop chains are seeded on a circle next to the node and optimized
/// against the already-resolved non-loop paths, whose interior points are
/// injected as fixed obstacle anchors.
fn optimize_selfloop_chains(
    selfloops: &[Edge],
    positions: &BTreeMap<String, Point>,
    config: &RoutingConfig,
    resolved_paths: &BTreeMap<Edge, Vec<Point>>,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    let angles = selfloop_angles(selfloops, positions, config, resolved_paths)?;

    let mut arena: Vec<Point> = positions.values().copied().collect();
    let node_index: HashMap<&str, usize> = positions
        .keys()
        .enumerate()
        .map(|(i, node)| (node.as_str(), i))
        .collect();
    for path in resolved_paths.values() {
        if path.len() > 2 {
            arena.extend(&path[1..path.len() - 1]);
        }
    }
    let mut fixed = vec![true; arena.len()];
    let mut sizes = vec![0.0f32; arena.len()];

    let mut chains: Vec<(Edge, Vec<usize>)> = Vec::with_capacity(selfloops.len());
    let mut expanded: Vec<(usize, usize, f32)> = Vec::new();
    for edge in selfloops {
        let anchor = node_position(positions, &edge.0)?;
        let seeds = selfloop_seed_points(
            anchor,
            config.selfloop_radius,
            angles[edge],
            SELFLOOP_CONTROL_POINTS,
        );
        let mut handles = Vec::with_capacity(seeds.len());
        for seed in seeds {
            arena.push(seed);
            fixed.push(false);
            sizes.push(0.0);
            handles.push(arena.len() - 1);
        }
        let node_handle = node_index[edge.0.as_str()];
        let mut previous = node_handle;
        for &handle in &handles {
            expanded.push((previous, handle, 1.0));
            previous = handle;
        }
        expanded.push((previous, node_handle, 1.0));
        chains.push((edge.clone(), handles));
    }

    relax(
        &mut arena,
        &fixed,
        &sizes,
        &expanded,
        &RelaxOptions {
            k: config.k,
            iterations: config.iterations,
            initial_temperature: Some(config.initial_temperature),
            repulsion: RepulsionSource::All,
        },
    );

    let mut paths = BTreeMap::new();
    for (edge, handles) in chains {
        let anchor = positions[&edge.0];
        let mut control = Vec::with_capacity(handles.len() + 2);
        control.push(anchor);
        control.extend(handles.iter().map(|&handle| arena[handle]));
        control.push(anchor);
        paths.insert(edge, smooth_path(&control, config.path_resolution));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str) -> Edge {
        (source.to_string(), target.to_string())
    }

    fn square_positions() -> BTreeMap<String, Point> {
        let mut positions = BTreeMap::new();
        positions.insert("a".to_string(), Point::new(-0.5, -0.5));
        positions.insert("b".to_string(), Point::new(0.5, -0.5));
        positions.insert("c".to_string(), Point::new(0.5, 0.5));
        positions.insert("d".to_string(), Point::new(-0.5, 0.5));
        positions
    }

    #[test]
    fn curved_paths_preserve_endpoints() {
        let graph = Graph::from_edges(vec![edge("a", "c"), edge("b", "d")]);
        let positions = square_positions();
        let config = RoutingConfig::default();
        let paths =
            curved_edge_paths(&graph, &positions, &config, &NodeLayoutConfig::default()).unwrap();
        for ((source, target), path) in &paths {
            assert_eq!(path.len(), config.path_resolution);
            assert!(path[0].distance(positions[source]) < 1e-4);
            assert!(path.last().unwrap().distance(positions[target]) < 1e-4);
        }
    }

    #[test]
    fn bundled_parallel_edges_share_a_reversed_path() {
        let graph = Graph::from_edges(vec![edge("a", "b"), edge("b", "a")]);
        let positions = square_positions();
        let config = RoutingConfig::default();
        let paths =
            curved_edge_paths(&graph, &positions, &config, &NodeLayoutConfig::default()).unwrap();
        let forward = &paths[&edge("a", "b")];
        let backward = &paths[&edge("b", "a")];
        let mut reversed = backward.clone();
        reversed.reverse();
        assert_eq!(forward, &reversed);
    }

    #[test]
    fn separated_parallel_edges_diverge() {
        let graph = Graph::from_edges(vec![edge("a", "b"), edge("b", "a")]);
        let positions = square_positions();
        let config = RoutingConfig {
            bundle_parallel_edges: false,
            ..RoutingConfig::default()
        };
        let paths =
            curved_edge_paths(&graph, &positions, &config, &NodeLayoutConfig::default()).unwrap();
        let forward = &paths[&edge("a", "b")];
        let backward = &paths[&edge("b", "a")];
        let mut reversed = backward.clone();
        reversed.reverse();
        // Repulsion between the two chains pushes them apart.
        let max_gap = forward
            .iter()
            .zip(&reversed)
            .map(|(p, q)| p.distance(*q))
            .fold(0.0f32, f32::max);
        assert!(max_gap > 1e-3);
    }

    #[test]
    fn self_loop_chain_stays_near_its_node() {
        let graph = Graph::from_edges(vec![edge("a", "a"), edge("b", "c")]);
        let positions = square_positions();
        let config = RoutingConfig::default();
        let paths =
            curved_edge_paths(&graph, &positions, &config, &NodeLayoutConfig::default()).unwrap();
        let path = &paths[&edge("a", "a")];
        assert!(path[0].distance(positions["a"]) < 1e-4);
        assert!(path.last().unwrap().distance(positions["a"]) < 1e-4);
        // The loop extends away from the node but stays in its vicinity.
        let max_distance = path
            .iter()
            .map(|point| point.distance(positions["a"]))
            .fold(0.0f32, f32::max);
        assert!(max_distance > 0.01);
        assert!(max_distance < 10.0 * config.selfloop_radius);
    }

    #[test]
    fn chain_length_scales_with_edge_length() {
        assert_eq!(control_point_count(0.05, 1.0), 1);
        assert_eq!(control_point_count(0.5, 1.0), 3);
        assert_eq!(control_point_count(10.0, 1.0), 5);
    }
}
