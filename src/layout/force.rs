use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::NodeLayoutConfig;
use crate::error::LayoutError;
use crate::geometry::{MIN_DISTANCE, Point};
use crate::graph::Graph;

/// Node counts up to this run the dense solver, which materializes the full
/// pairwise distance buffers; beyond it the sparse solver bounds memory at
/// the cost of per-row looping.
const DENSE_NODE_LIMIT: usize = 500;

/// Initial temperature as a fraction of the position-domain span.
const TEMPERATURE_SPAN_FRACTION: f32 = 0.1;

/// Displacement norms below this are not used as divisors...
const MIN_DISPLACEMENT: f32 = 0.01;
/// ...this stands in for them instead.
const DISPLACEMENT_FALLBACK: f32 = 0.1;

/// Which points exert repulsion during a relaxation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RepulsionSource {
    /// Every other point repulses (classic Fruchterman-Reingold).
    All,
    /// Only fixed anchor points repulse mobile ones; mobile points pass
    /// through each other. Lets parallel edges share a curved path.
    FixedOnly,
}

#[derive(Debug, Clone)]
pub(crate) struct RelaxOptions {
    pub k: f32,
    pub iterations: usize,
    /// `None` derives the temperature from the current position extent.
    pub initial_temperature: Option<f32>,
    pub repulsion: RepulsionSource,
}

/// Constrained point-set relaxation: attraction along `edges`, repulsion
/// per `options.repulsion`, fixed points never move. This single primitive
/// backs node placement, curved-edge control point optimization and the
/// self-loop obstacle avoidance pass.
///
/// `sizes` adds clearance: the repulsive distance between two points is
/// reduced by the sum of their sizes before flooring.
pub(crate) fn relax(
    positions: &mut [Point],
    fixed: &[bool],
    sizes: &[f32],
    edges: &[(usize, usize, f32)],
    options: &RelaxOptions,
) {
    if positions.len() < 2 || options.iterations == 0 {
        return;
    }
    let _span = tracing::debug_span!("relax", points = positions.len()).entered();
    if positions.len() <= DENSE_NODE_LIMIT {
        relax_dense(positions, fixed, sizes, edges, options);
    } else {
        relax_sparse(positions, fixed, sizes, edges, options);
    }
}

fn initial_temperature(positions: &[Point], options: &RelaxOptions) -> f32 {
    if let Some(temperature) = options.initial_temperature {
        return temperature;
    }
    let mut min = positions[0];
    let mut max = positions[0];
    for point in positions {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    (max.x - min.x).max(max.y - min.y) * TEMPERATURE_SPAN_FRACTION
}

/// Whether point `j` exerts repulsion under the configured source.
fn repulses(options: &RelaxOptions, fixed: &[bool], j: usize) -> bool {
    match options.repulsion {
        RepulsionSource::All => true,
        RepulsionSource::FixedOnly => fixed[j],
    }
}

/// Move every mobile point along its net displacement, normalized and
/// capped by the temperature.
fn apply_displacements(
    positions: &mut [Point],
    fixed: &[bool],
    displacements: &[Point],
    temperature: f32,
) {
    for (i, displacement) in displacements.iter().enumerate() {
        if fixed[i] {
            continue;
        }
        let mut length = displacement.norm();
        if length < MIN_DISPLACEMENT {
            length = DISPLACEMENT_FALLBACK;
        }
        positions[i] += *displacement * (temperature / length);
    }
}

/// Dense solver: materializes the full pairwise delta and distance
/// tensors each iteration, trading O(n^2) memory for a tight update pass.
fn relax_dense(
    positions: &mut [Point],
    fixed: &[bool],
    sizes: &[f32],
    edges: &[(usize, usize, f32)],
    options: &RelaxOptions,
) {
    let total = positions.len();
    let mut adjacency = vec![0.0f32; total * total];
    for &(source, target, weight) in edges {
        adjacency[source * total + target] += weight;
    }

    let mut temperature = initial_temperature(positions, options);
    let cooling = temperature / (options.iterations + 1) as f32;
    let mut deltas = vec![Point::ZERO; total * total];
    let mut distances = vec![0.0f32; total * total];
    let mut displacements = vec![Point::ZERO; total];
    for _ in 0..options.iterations {
        for i in 0..total {
            for j in 0..total {
                let delta = positions[i] - positions[j];
                deltas[i * total + j] = delta;
                distances[i * total + j] = delta.norm().max(MIN_DISTANCE);
            }
        }
        for i in 0..total {
            if fixed[i] {
                displacements[i] = Point::ZERO;
                continue;
            }
            let mut displacement = Point::ZERO;
            for j in 0..total {
                if j == i || !repulses(options, fixed, j) {
                    continue;
                }
                let index = i * total + j;
                let direction = deltas[index] / distances[index];
                let clearance = (distances[index] - sizes[i] - sizes[j]).max(MIN_DISTANCE);
                displacement += direction * (options.k * options.k / clearance);
            }
            for j in 0..total {
                let index = i * total + j;
                let weight = adjacency[index];
                if weight != 0.0 {
                    let direction = deltas[index] / distances[index];
                    displacement -=
                        direction * (weight * distances[index] * distances[index] / options.k);
                }
            }
            displacements[i] = displacement;
        }
        apply_displacements(positions, fixed, &displacements, temperature);
        temperature -= cooling;
    }
}

/// Sparse solver: recomputes each row on the fly and walks adjacency
/// lists for attraction, bounding memory for large point counts.
fn relax_sparse(
    positions: &mut [Point],
    fixed: &[bool],
    sizes: &[f32],
    edges: &[(usize, usize, f32)],
    options: &RelaxOptions,
) {
    let total = positions.len();
    let mut adjacency: Vec<Vec<(usize, f32)>> = vec![Vec::new(); total];
    for &(source, target, weight) in edges {
        adjacency[source].push((target, weight));
    }
    // Same accumulation order as the dense solver, so both variants agree.
    for row in &mut adjacency {
        row.sort_unstable_by_key(|&(target, _)| target);
    }

    let mut temperature = initial_temperature(positions, options);
    let cooling = temperature / (options.iterations + 1) as f32;
    let mut displacements = vec![Point::ZERO; total];
    for _ in 0..options.iterations {
        for i in 0..total {
            if fixed[i] {
                displacements[i] = Point::ZERO;
                continue;
            }
            let mut displacement = Point::ZERO;
            for j in 0..total {
                if j == i || !repulses(options, fixed, j) {
                    continue;
                }
                let delta = positions[i] - positions[j];
                let distance = delta.norm().max(MIN_DISTANCE);
                let clearance = (distance - sizes[i] - sizes[j]).max(MIN_DISTANCE);
                displacement += (delta / distance) * (options.k * options.k / clearance);
            }
            for &(j, weight) in &adjacency[i] {
                let delta = positions[i] - positions[j];
                let distance = delta.norm().max(MIN_DISTANCE);
                displacement -= (delta / distance) * (weight * distance * distance / options.k);
            }
            displacements[i] = displacement;
        }
        apply_displacements(positions, fixed, &displacements, temperature);
        temperature -= cooling;
    }
}

/// Compute a position for every node referenced by the edge list using
/// Fruchterman-Reingold attraction-repulsion simulation.
///
/// Supplied `positions` seed the simulation; nodes in `config.fixed` keep
/// their supplied coordinates verbatim. Unless fixed nodes are present the
/// result is re-centered and rescaled so the maximum absolute coordinate
/// equals `config.scale` less the node-size margin, then translated to
/// `config.center`.
///
/// Each connected component of the induced undirected graph is laid out
/// independently with the same parameters. Components share one coordinate
/// frame and are not mutually offset, so disconnected components may
/// overlap; callers wanting separation must pre-offset via fixed positions.
pub fn layout_nodes(
    graph: &Graph,
    positions: Option<&BTreeMap<String, Point>>,
    config: &NodeLayoutConfig,
) -> Result<BTreeMap<String, Point>, LayoutError> {
    let components = graph.connected_components();
    if components.len() <= 1 {
        return layout_component(graph, positions, config);
    }

    let mut combined = BTreeMap::new();
    for component in components {
        let subgraph = graph.component_subgraph(&component);
        let component_positions = positions.map(|map| {
            map.iter()
                .filter(|(node, _)| component.contains(*node))
                .map(|(node, position)| (node.clone(), *position))
                .collect::<BTreeMap<_, _>>()
        });
        combined.extend(layout_component(
            &subgraph,
            component_positions.as_ref(),
            config,
        )?);
    }
    Ok(combined)
}

fn layout_component(
    graph: &Graph,
    positions: Option<&BTreeMap<String, Point>>,
    config: &NodeLayoutConfig,
) -> Result<BTreeMap<String, Point>, LayoutError> {
    let nodes = graph.nodes();
    if nodes.is_empty() {
        return Ok(BTreeMap::new());
    }
    let index: BTreeMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.as_str(), i))
        .collect();

    let mut fixed = vec![false; nodes.len()];
    for node in &config.fixed {
        if let Some(&i) = index.get(node.as_str()) {
            fixed[i] = true;
        }
    }
    let has_fixed = fixed.iter().any(|&is_fixed| is_fixed);

    // Size of the already-positioned domain, used to place random initial
    // positions and to adjust k for layouts not near the unit frame.
    let domain_size = positions
        .map(|map| {
            map.values()
                .flat_map(|point| [point.x.abs(), point.y.abs()])
                .fold(0.0f32, f32::max)
        })
        .filter(|&size| size > 0.0)
        .unwrap_or(1.0);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let center = Point::from(config.center);
    let mut coordinates: Vec<Point> = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let supplied = positions.and_then(|map| map.get(node)).copied();
        match supplied {
            Some(position) => coordinates.push(position),
            None => {
                if fixed[i] {
                    return Err(LayoutError::MissingPosition(node.clone()));
                }
                let random = Point::new(rng.random::<f32>(), rng.random::<f32>());
                coordinates.push(random * domain_size + center);
            }
        }
    }

    let k = config.k.unwrap_or_else(|| {
        if has_fixed {
            domain_size / (nodes.len() as f32).sqrt()
        } else {
            (1.0 / nodes.len() as f32).sqrt()
        }
    });

    let edges: Vec<(usize, usize, f32)> = graph
        .edges()
        .iter()
        .filter(|edge| !Graph::is_self_loop(edge))
        .map(|edge| (index[edge.0.as_str()], index[edge.1.as_str()], graph.weight(edge)))
        .collect();

    let options = RelaxOptions {
        k,
        iterations: config.iterations,
        initial_temperature: config.initial_temperature,
        repulsion: RepulsionSource::All,
    };
    let sizes = vec![0.0f32; nodes.len()];
    relax(&mut coordinates, &fixed, &sizes, &edges, &options);

    if !has_fixed {
        rescale_to_frame(&mut coordinates, config.scale - config.node_size, center);
    }

    Ok(nodes
        .iter()
        .cloned()
        .zip(coordinates)
        .collect())
}

/// Re-center each axis on zero and scale so the largest magnitude
/// coordinate equals `scale` (aspect ratio preserved), then translate to
/// `center`.
fn rescale_to_frame(positions: &mut [Point], scale: f32, center: Point) {
    if positions.is_empty() {
        return;
    }
    let total = positions.len() as f32;
    let mut mean = Point::ZERO;
    for point in positions.iter() {
        mean += *point;
    }
    mean = mean / total;

    let mut limit = 0.0f32;
    for point in positions.iter_mut() {
        *point -= mean;
        limit = limit.max(point.x.abs()).max(point.y.abs());
    }
    if limit > 0.0 {
        for point in positions.iter_mut() {
            *point = *point * (scale / limit) + center;
        }
    } else {
        for point in positions.iter_mut() {
            *point += center;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str) -> (String, String) {
        (source.to_string(), target.to_string())
    }

    fn triangle() -> Graph {
        Graph::from_edges(vec![edge("a", "b"), edge("b", "c"), edge("c", "a")])
    }

    #[test]
    fn every_induced_node_gets_a_position() {
        let graph = triangle();
        let layout = layout_nodes(&graph, None, &NodeLayoutConfig::default()).unwrap();
        assert_eq!(
            layout.keys().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        for position in layout.values() {
            assert!(position.is_finite());
        }
    }

    #[test]
    fn unconstrained_layout_is_bounded_by_scale() {
        let graph = Graph::from_edges(vec![
            edge("a", "b"),
            edge("b", "c"),
            edge("c", "d"),
            edge("d", "a"),
            edge("a", "c"),
        ]);
        let config = NodeLayoutConfig {
            scale: 2.0,
            ..NodeLayoutConfig::default()
        };
        let layout = layout_nodes(&graph, None, &config).unwrap();
        for position in layout.values() {
            assert!(position.x.abs() <= 2.0 + 1e-4);
            assert!(position.y.abs() <= 2.0 + 1e-4);
        }
        // The rescale makes the extremes touch the frame.
        let max = layout
            .values()
            .flat_map(|p| [p.x.abs(), p.y.abs()])
            .fold(0.0f32, f32::max);
        assert!((max - 2.0).abs() < 1e-4);
    }

    #[test]
    fn fixed_nodes_never_move() {
        let graph = triangle();
        let mut positions = BTreeMap::new();
        positions.insert("a".to_string(), Point::new(0.25, -0.75));
        let config = NodeLayoutConfig {
            fixed: ["a".to_string()].into_iter().collect(),
            ..NodeLayoutConfig::default()
        };
        let layout = layout_nodes(&graph, Some(&positions), &config).unwrap();
        assert_eq!(layout["a"], Point::new(0.25, -0.75));
    }

    #[test]
    fn fixed_node_without_position_is_structural_error() {
        let graph = triangle();
        let config = NodeLayoutConfig {
            fixed: ["b".to_string()].into_iter().collect(),
            ..NodeLayoutConfig::default()
        };
        let err = layout_nodes(&graph, None, &config).unwrap_err();
        assert!(matches!(err, LayoutError::MissingPosition(node) if node == "b"));
    }

    #[test]
    fn layout_is_deterministic_for_a_seed() {
        let graph = triangle();
        let config = NodeLayoutConfig::default();
        let first = layout_nodes(&graph, None, &config).unwrap();
        let second = layout_nodes(&graph, None, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn disconnected_components_are_laid_out_independently() {
        let graph = Graph::from_edges(vec![edge("a", "b"), edge("x", "y")]);
        let layout = layout_nodes(&graph, None, &NodeLayoutConfig::default()).unwrap();
        assert_eq!(layout.len(), 4);
        for position in layout.values() {
            assert!(position.x.abs() <= 1.0 + 1e-4);
            assert!(position.y.abs() <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn dense_and_sparse_solvers_agree() {
        let mut positions = vec![
            Point::new(0.1, 0.2),
            Point::new(0.9, 0.1),
            Point::new(0.4, 0.8),
            Point::new(0.6, 0.4),
        ];
        let mut sparse_positions = positions.clone();
        let fixed = vec![false; 4];
        let sizes = vec![0.0; 4];
        let edges = vec![(0usize, 1usize, 1.0f32), (1, 2, 1.0), (2, 3, 1.0)];
        let options = RelaxOptions {
            k: 0.5,
            iterations: 30,
            initial_temperature: None,
            repulsion: RepulsionSource::All,
        };
        relax_dense(&mut positions, &fixed, &sizes, &edges, &options);
        relax_sparse(&mut sparse_positions, &fixed, &sizes, &edges, &options);
        for (dense, sparse) in positions.iter().zip(&sparse_positions) {
            assert!(dense.distance(*sparse) < 1e-4);
        }
    }

    #[test]
    fn rescale_centers_and_bounds() {
        let mut positions = vec![Point::new(2.0, 2.0), Point::new(4.0, 2.0)];
        rescale_to_frame(&mut positions, 1.0, Point::ZERO);
        assert!(positions[0].distance(Point::new(-1.0, 0.0)) < 1e-6);
        assert!(positions[1].distance(Point::new(1.0, 0.0)) < 1e-6);
    }
}
