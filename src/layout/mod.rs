mod bundling;
mod curved;
mod force;
mod routing;
mod spline;

pub use force::layout_nodes;
pub use routing::{Routing, route_edges};
pub use spline::{resample_path, smooth_path};

use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Warning};
use crate::geometry::Point;
use crate::graph::{Edge, Graph};

/// A computed layout snapshot: one position per node, one path per routed
/// edge, and the warnings raised for edges that were skipped.
#[derive(Debug, Clone)]
pub struct Layout {
    pub positions: BTreeMap<String, Point>,
    pub paths: BTreeMap<Edge, Vec<Point>>,
    pub warnings: Vec<Warning>,
}

/// Compute node positions and edge paths in one call.
///
/// Supplied `positions` seed the node placement (and pin nodes listed in
/// `config.node_layout.fixed`); the routed paths follow the configured
/// strategy. The result is deterministic for a fixed seed.
pub fn compute_layout(
    graph: &Graph,
    positions: Option<&BTreeMap<String, Point>>,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let positions = layout_nodes(graph, positions, &config.node_layout)?;
    let routing = route_edges(graph, &positions, config)?;
    Ok(Layout {
        positions,
        paths: routing.paths,
        warnings: routing.warnings,
    })
}
