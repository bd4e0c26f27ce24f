use std::collections::{BTreeMap, HashSet};

use crate::config::{BundlingConfig, RouteStrategy};
use crate::error::{LayoutError, Warning};
use crate::geometry::{Point, Segment};
use crate::graph::{Edge, Graph};

use super::routing::node_position;
use super::spline::smooth_path;

/// Floor for squared control-point distances in the electrostatic term.
const MIN_FORCE_DISTANCE_SQUARED: f32 = 1e-12;
/// Floor for displacement norms before they are used as divisors.
const MIN_STEP_NORM: f32 = 1e-12;

/// A compatible edge pair: indices into the canonical edge list, the
/// product compatibility score, and whether the second chain has to be
/// iterated in reverse order when forces are exchanged.
#[derive(Debug, Clone, Copy)]
struct CompatiblePair {
    first: usize,
    second: usize,
    score: f32,
    reverse: bool,
}

/// Force-directed edge bundling after Holten & van Wijk: edges with
/// similar geometry are attracted towards each other and settle into
/// shared curved bundles. Instead of doubling the control point count per
/// cycle, a new point is inserted between each existing pair.
///
/// Self-loops cannot be bundled (they have no direction) and are skipped
/// with a warning. Bidirectional pairs are collapsed to one canonical
/// direction and the reverse path is reconstructed by reversal. Each
/// connected component is bundled independently.
pub(super) fn bundled_edge_paths(
    graph: &Graph,
    positions: &BTreeMap<String, Point>,
    config: &BundlingConfig,
    resolution: usize,
    warnings: &mut Vec<Warning>,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    let components = graph.connected_components();
    if components.len() <= 1 {
        return bundle_component(graph, positions, config, resolution, warnings);
    }
    let mut paths = BTreeMap::new();
    for component in components {
        let subgraph = graph.component_subgraph(&component);
        paths.extend(bundle_component(
            &subgraph, positions, config, resolution, warnings,
        )?);
    }
    Ok(paths)
}

fn bundle_component(
    graph: &Graph,
    positions: &BTreeMap<String, Point>,
    config: &BundlingConfig,
    resolution: usize,
    warnings: &mut Vec<Warning>,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    // Bundling is undefined for zero-length edges.
    let mut edges = Vec::new();
    for edge in graph.edges() {
        if Graph::is_self_loop(edge) {
            tracing::warn!(source = %edge.0, "skipping self-loop in edge bundling");
            warnings.push(Warning::SelfLoopSkipped {
                edge: edge.clone(),
                strategy: RouteStrategy::Bundled,
            });
        } else {
            edges.push(edge.clone());
        }
    }

    // Collapse bidirectional pairs onto one canonical direction.
    let mut canonical: Vec<Edge> = Vec::new();
    let mut canonical_set: HashSet<Edge> = HashSet::new();
    let mut reverse_edges: Vec<Edge> = Vec::new();
    for edge in edges {
        let reverse = (edge.1.clone(), edge.0.clone());
        if canonical_set.contains(&reverse) {
            reverse_edges.push(edge);
        } else {
            canonical_set.insert(edge.clone());
            canonical.push(edge);
        }
    }

    let segments = canonical
        .iter()
        .map(|edge| {
            Ok(Segment::new(
                node_position(positions, &edge.0)?,
                node_position(positions, &edge.1)?,
            ))
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;

    // Shorter edges are stiffer and resist bending more.
    let stiffness: Vec<f32> = segments
        .iter()
        .map(|segment| config.k / segment.length)
        .collect();

    let pairs = compatible_pairs(&segments, config.compatibility_threshold);

    let mut chains: Vec<Vec<Point>> = segments
        .iter()
        .map(|segment| vec![segment.p0, segment.p1])
        .collect();

    let _span = tracing::debug_span!(
        "bundle_edges",
        edges = canonical.len(),
        pairs = pairs.len()
    )
    .entered();

    let mut step_size = config.step_size;
    let mut iterations = config.total_iterations;
    for _ in 0..config.total_cycles {
        for chain in &mut chains {
            *chain = subdivide(chain);
        }
        for _ in 0..iterations {
            let mut forces = spring_forces(&chains, &stiffness);
            electrostatic_forces(&chains, &pairs, &mut forces);
            apply_forces(&mut chains, &forces, step_size);
        }
        step_size /= 2.0;
        iterations = iterations * 2 / 3;
    }

    if config.straighten_by > 0.0 {
        for chain in &mut chains {
            straighten(chain, config.straighten_by);
        }
    }

    let mut paths: BTreeMap<Edge, Vec<Point>> = canonical
        .into_iter()
        .zip(&chains)
        .map(|(edge, chain)| (edge, smooth_path(chain, resolution)))
        .collect();

    // Add the previously collapsed bi-directional edges back in.
    for edge in reverse_edges {
        let reverse = (edge.1.clone(), edge.0.clone());
        let mut path = paths[&reverse].clone();
        path.reverse();
        paths.insert(edge, path);
    }
    Ok(paths)
}

/// Compatibility of every edge pair, short-circuited on any factor that
/// drops the running product below the threshold to bound the O(E^2) cost.
fn compatible_pairs(segments: &[Segment], threshold: f32) -> Vec<CompatiblePair> {
    let _span = tracing::debug_span!("edge_compatibility", edges = segments.len()).entered();
    let mut pairs = Vec::new();
    for first in 0..segments.len() {
        for second in first + 1..segments.len() {
            let p = &segments[first];
            let q = &segments[second];
            let Some(score) = compatibility_score(p, q, threshold) else {
                continue;
            };

            // Whether one chain runs counter to the other: compare
            // source-source/target-target against source-target pairings.
            let aligned = p.p0.distance(q.p0).min(p.p1.distance(q.p1));
            let crossed = p.p0.distance(q.p1).min(p.p1.distance(q.p0));
            pairs.push(CompatiblePair {
                first,
                second,
                score,
                reverse: aligned > crossed,
            });
        }
    }
    pairs
}

/// Product of the four compatibility factors, or `None` as soon as the
/// running product falls below `threshold`.
fn compatibility_score(p: &Segment, q: &Segment, threshold: f32) -> Option<f32> {
    let mut score = scale_compatibility(p, q);
    if score < threshold {
        return None;
    }
    score *= position_compatibility(p, q);
    if score < threshold {
        return None;
    }
    score *= angle_compatibility(p, q);
    if score < threshold {
        return None;
    }
    score *= visibility_compatibility(p, q);
    if score < threshold {
        return None;
    }
    Some(score)
}

/// High when the segments are nearly parallel or antiparallel.
fn angle_compatibility(p: &Segment, q: &Segment) -> f32 {
    p.unit_vector.dot(q.unit_vector).clamp(-1.0, 1.0).abs()
}

/// High when the segment lengths are similar. This uses the corrected
/// formula from Graser et al. (2019); the original paper's version is not
/// confined to [0, 1].
fn scale_compatibility(p: &Segment, q: &Segment) -> f32 {
    let average = 0.5 * (p.length + q.length);
    2.0 / (average / p.length.min(q.length) + p.length.max(q.length) / average)
}

/// High when the segment midpoints are close.
fn position_compatibility(p: &Segment, q: &Segment) -> f32 {
    let average = 0.5 * (p.length + q.length);
    average / (average + p.midpoint.distance(q.midpoint))
}

/// Low when bundling the pair would occlude one of the end points.
fn visibility_compatibility(p: &Segment, q: &Segment) -> f32 {
    visibility(p, q).min(visibility(q, p))
}

fn visibility(p: &Segment, q: &Segment) -> f32 {
    let projection = Segment::new(p.project(q.p0), p.project(q.p1));
    let displacement = p.midpoint.distance(projection.midpoint);
    (1.0 - 2.0 * displacement / projection.length).max(0.0)
}

/// Insert a new control point at the midpoint of every adjacent pair,
/// growing a chain of n points to 2(n-1)+1.
fn subdivide(chain: &[Point]) -> Vec<Point> {
    let mut subdivided = Vec::with_capacity(2 * chain.len() - 1);
    for pair in chain.windows(2) {
        subdivided.push(pair[0]);
        subdivided.push(pair[0].lerp(pair[1], 0.5));
    }
    subdivided.push(*chain.last().unwrap());
    subdivided
}

/// Spring force pulling each interior control point towards the midpoint
/// of its neighbours, scaled by the edge stiffness per segment.
fn spring_forces(chains: &[Vec<Point>], stiffness: &[f32]) -> Vec<Vec<Point>> {
    chains
        .iter()
        .zip(stiffness)
        .map(|(chain, &k_edge)| {
            let mut forces = vec![Point::ZERO; chain.len()];
            let k_point = k_edge / (chain.len() - 1) as f32;
            for i in 1..chain.len() - 1 {
                let delta = (chain[i - 1] - chain[i]) + (chain[i + 1] - chain[i]);
                forces[i] = delta * k_point;
            }
            forces
        })
        .collect()
}

/// Electrostatic attraction between corresponding control points of every
/// compatible pair, inversely proportional to their squared distance. The
/// two endpoint anchors of each chain never move.
fn electrostatic_forces(chains: &[Vec<Point>], pairs: &[CompatiblePair], forces: &mut [Vec<Point>]) {
    for pair in pairs {
        let total = chains[pair.first].len();
        for i in 1..total - 1 {
            let j = if pair.reverse { total - 1 - i } else { i };
            let delta = chains[pair.second][j] - chains[pair.first][i];
            let distance_squared = delta.norm_squared().max(MIN_FORCE_DISTANCE_SQUARED);
            let displacement = delta * (pair.score / distance_squared);
            forces[pair.first][i] += displacement;
            forces[pair.second][j] -= displacement;
        }
    }
}

/// Move every interior control point along its net force, clamped to the
/// current step size.
fn apply_forces(chains: &mut [Vec<Point>], forces: &[Vec<Point>], step_size: f32) {
    for (chain, chain_forces) in chains.iter_mut().zip(forces) {
        for i in 1..chain.len() - 1 {
            let norm = chain_forces[i].norm().max(MIN_STEP_NORM);
            chain[i] += chain_forces[i] * (norm.min(step_size) / norm);
        }
    }
}

/// Blend a path with the straight line between its end points.
fn straighten(chain: &mut [Point], straighten_by: f32) {
    let first = chain[0];
    let last = *chain.last().unwrap();
    let total = chain.len();
    for (i, point) in chain.iter_mut().enumerate() {
        let straight = first.lerp(last, i as f32 / (total - 1) as f32);
        *point = *point * (1.0 - straighten_by) + straight * straighten_by;
    }
}
