use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::config::{LayoutConfig, RouteStrategy, RoutingConfig};
use crate::error::{LayoutError, Warning};
use crate::geometry::Point;
use crate::graph::{Edge, Graph};

use super::spline::{resample_path, smooth_path};
use super::{bundling, curved};

/// Samples taken along each resolved path when scoring candidate self-loop
/// angles.
const SELFLOOP_AVOIDANCE_SAMPLES: usize = 100;
/// Size of the discretized angle set scanned by the self-loop heuristic.
const SELFLOOP_ANGLE_CANDIDATES: usize = 36;
/// Self-loop direction used when there is no other geometry to avoid.
const DEFAULT_SELFLOOP_ANGLE: f32 = FRAC_PI_2;

/// Result of an edge routing pass: one path per routed edge plus the
/// warnings raised for edges that had to be skipped.
#[derive(Debug, Clone)]
pub struct Routing {
    pub paths: BTreeMap<Edge, Vec<Point>>,
    pub warnings: Vec<Warning>,
}

/// Produce a path for every edge according to the configured strategy.
///
/// Routing is a pure function of (edges, positions, config): identical
/// inputs yield identical paths.
pub fn route_edges(
    graph: &Graph,
    positions: &BTreeMap<String, Point>,
    config: &LayoutConfig,
) -> Result<Routing, LayoutError> {
    let mut warnings = Vec::new();
    let paths = match config.routing.strategy {
        RouteStrategy::Straight => {
            straight_paths(graph, positions, &config.routing, &mut warnings)?
        }
        RouteStrategy::Arced => arced_paths(graph, positions, &config.routing)?,
        RouteStrategy::Curved => {
            curved::curved_edge_paths(graph, positions, &config.routing, &config.node_layout)?
        }
        RouteStrategy::Bundled => bundling::bundled_edge_paths(
            graph,
            positions,
            &config.bundling,
            config.routing.path_resolution,
            &mut warnings,
        )?,
    };
    Ok(Routing { paths, warnings })
}

pub(super) fn node_position(
    positions: &BTreeMap<String, Point>,
    node: &str,
) -> Result<Point, LayoutError> {
    positions
        .get(node)
        .copied()
        .ok_or_else(|| LayoutError::MissingPosition(node.to_string()))
}

/// Straight lines from source to target. Bidirectional pairs are offset by
/// half the edge width to either side of the direct line so the two
/// directions do not coincide. Self-loops cannot be drawn straight and are
/// skipped with a warning.
fn straight_paths(
    graph: &Graph,
    positions: &BTreeMap<String, Point>,
    config: &RoutingConfig,
    warnings: &mut Vec<Warning>,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    let mut paths = BTreeMap::new();
    for edge in graph.edges() {
        if Graph::is_self_loop(edge) {
            tracing::warn!(source = %edge.0, "skipping self-loop in straight routing");
            warnings.push(Warning::SelfLoopSkipped {
                edge: edge.clone(),
                strategy: RouteStrategy::Straight,
            });
            continue;
        }
        let source = node_position(positions, &edge.0)?;
        let target = node_position(positions, &edge.1)?;
        let path = if graph.has_reverse(edge) {
            let offset = (target - source).orthogonal() * (config.edge_width * 0.5);
            vec![source + offset, target + offset]
        } else {
            vec![source, target]
        };
        paths.insert(edge.clone(), path);
    }
    Ok(paths)
}

/// Quadratic Bezier arcs between nodes. The middle control point sits
/// perpendicular off the chord midpoint at `arc_curvature` times the chord
/// length. Self-loops are placed on a tangent circle.
fn arced_paths(
    graph: &Graph,
    positions: &BTreeMap<String, Point>,
    config: &RoutingConfig,
) -> Result<BTreeMap<Edge, Vec<Point>>, LayoutError> {
    let mut paths = BTreeMap::new();
    let mut selfloops = Vec::new();
    for edge in graph.edges() {
        if Graph::is_self_loop(edge) {
            selfloops.push(edge.clone());
            continue;
        }
        let source = node_position(positions, &edge.0)?;
        let target = node_position(positions, &edge.1)?;
        let chord = target - source;
        let control = source + chord * 0.5 + chord.orthogonal() * (config.arc_curvature * chord.norm());
        paths.insert(
            edge.clone(),
            smooth_path(&[source, control, target], config.path_resolution),
        );
    }

    if !selfloops.is_empty() {
        let angles = selfloop_angles(&selfloops, positions, config, &paths)?;
        for edge in selfloops {
            let anchor = node_position(positions, &edge.0)?;
            let angle = angles[&edge];
            paths.insert(
                edge,
                selfloop_path(anchor, config.selfloop_radius, angle, config.path_resolution),
            );
        }
    }
    Ok(paths)
}

/// Resolve one starting angle per self-loop: the configured angle when
/// supplied, otherwise the clearance-maximizing heuristic against the
/// already-resolved paths.
pub(super) fn selfloop_angles(
    selfloops: &[Edge],
    positions: &BTreeMap<String, Point>,
    config: &RoutingConfig,
    resolved_paths: &BTreeMap<Edge, Vec<Point>>,
) -> Result<BTreeMap<Edge, f32>, LayoutError> {
    if let Some(angle) = config.selfloop_angle {
        return Ok(selfloops.iter().map(|edge| (edge.clone(), angle)).collect());
    }

    let avoid: Vec<Point> = resolved_paths
        .values()
        .flat_map(|path| resample_path(path, SELFLOOP_AVOIDANCE_SAMPLES))
        .collect();

    let mut angles = BTreeMap::new();
    for edge in selfloops {
        let anchor = node_position(positions, &edge.0)?;
        angles.insert(
            edge.clone(),
            optimal_selfloop_angle(anchor, config.selfloop_radius, &avoid),
        );
    }
    Ok(angles)
}

/// Scan a discretized candidate set and keep the angle whose loop center
/// lies farthest from the points to avoid. An offset-maximization
/// heuristic, not a proof-optimal placement.
fn optimal_selfloop_angle(anchor: Point, radius: f32, avoid: &[Point]) -> f32 {
    if avoid.is_empty() {
        return DEFAULT_SELFLOOP_ANGLE;
    }
    let mut best_angle = DEFAULT_SELFLOOP_ANGLE;
    let mut best_clearance = f32::MIN;
    for candidate in 0..SELFLOOP_ANGLE_CANDIDATES {
        let angle = TAU * candidate as f32 / SELFLOOP_ANGLE_CANDIDATES as f32;
        let center = anchor + Point::from_angle(angle) * radius;
        let clearance = avoid
            .iter()
            .map(|point| point.distance(center))
            .fold(f32::MAX, f32::min);
        if clearance > best_clearance {
            best_clearance = clearance;
            best_angle = angle;
        }
    }
    best_angle
}

/// Closed self-loop path: `total` points around a circle of `radius`
/// tangent to the node, starting and ending at the node position.
pub(super) fn selfloop_path(position: Point, radius: f32, angle: f32, total: usize) -> Vec<Point> {
    let direction = Point::from_angle(angle);
    let center = position + direction * radius;
    // The walk starts opposite to the direction the loop extends in, which
    // is exactly the node position.
    let start = angle + PI;
    (0..total.max(2))
        .map(|i| {
            let fraction = i as f32 / (total.max(2) - 1) as f32;
            center + Point::from_angle(start + TAU * fraction) * radius
        })
        .collect()
}

/// `total` seed points on the self-loop circle, node position excluded.
/// Used to initialize control point chains for curved self-loops.
pub(super) fn selfloop_seed_points(
    position: Point,
    radius: f32,
    angle: f32,
    total: usize,
) -> Vec<Point> {
    let direction = Point::from_angle(angle);
    let center = position + direction * radius;
    let start = angle + PI;
    (1..=total)
        .map(|i| center + Point::from_angle(start + TAU * i as f32 / (total + 1) as f32) * radius)
        .collect()
}
