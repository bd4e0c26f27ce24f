use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Path-generation strategy applied by the edge router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStrategy {
    Straight,
    Curved,
    Arced,
    Bundled,
}

impl RouteStrategy {
    pub fn name(self) -> &'static str {
        match self {
            RouteStrategy::Straight => "straight",
            RouteStrategy::Curved => "curved",
            RouteStrategy::Arced => "arced",
            RouteStrategy::Bundled => "bundled",
        }
    }
}

impl fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RouteStrategy {
    type Err = LayoutError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "straight" => Ok(RouteStrategy::Straight),
            "curved" => Ok(RouteStrategy::Curved),
            "arced" => Ok(RouteStrategy::Arced),
            "bundled" => Ok(RouteStrategy::Bundled),
            other => Err(LayoutError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Parameters of the force-directed node placement pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeLayoutConfig {
    /// Spring constant (optimal inter-node distance). `None` selects
    /// `1/sqrt(n)`, adjusted by the position-domain size when fixed nodes
    /// are present.
    pub k: Option<f32>,
    pub iterations: usize,
    /// Largest per-iteration displacement. `None` selects 10% of the
    /// position-domain span.
    pub initial_temperature: Option<f32>,
    /// Center of the layout frame.
    pub center: (f32, f32),
    /// Maximum absolute coordinate on any axis after rescaling.
    pub scale: f32,
    /// Node radius, used as a rescale margin and for edge clearance during
    /// curved routing.
    pub node_size: f32,
    /// Nodes whose caller-supplied positions are never mutated.
    pub fixed: BTreeSet<String>,
    /// Seed for randomly drawn initial positions.
    pub seed: u64,
}

impl Default for NodeLayoutConfig {
    fn default() -> Self {
        Self {
            k: None,
            iterations: 50,
            initial_temperature: None,
            center: (0.0, 0.0),
            scale: 1.0,
            node_size: 0.0,
            fixed: BTreeSet::new(),
            seed: 0,
        }
    }
}

/// Parameters of the edge routing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub strategy: RouteStrategy,
    /// Edge width in layout units; bidirectional straight edges are offset
    /// by half of it to each side.
    pub edge_width: f32,
    pub selfloop_radius: f32,
    /// Starting angle of self-loops in radians. `None` selects the angle
    /// that maximizes clearance from other resolved paths.
    pub selfloop_angle: Option<f32>,
    /// Bulge of arced edges relative to the straight-line distance.
    pub arc_curvature: f32,
    /// Number of points per resolved curved, arced or bundled path.
    pub path_resolution: usize,
    /// Spring constant of the curved-edge control point relaxation. Small
    /// values give taut edges, large values bulging arcs.
    pub k: f32,
    pub initial_temperature: f32,
    pub iterations: usize,
    /// If true, parallel (including bi-directional) edges share one curved
    /// path; if false, repulsion between control points separates them.
    pub bundle_parallel_edges: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RouteStrategy::Straight,
            edge_width: 0.01,
            selfloop_radius: 0.1,
            selfloop_angle: None,
            arc_curvature: 1.0,
            path_resolution: 100,
            k: 0.1,
            initial_temperature: 0.01,
            iterations: 50,
            bundle_parallel_edges: true,
        }
    }
}

/// Parameters of force-directed edge bundling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlingConfig {
    /// Stiffness of the springs connecting control points.
    pub k: f32,
    /// Edge pairs scoring below this are not bundled together. Zero bundles
    /// everything, one disables bundling of non-identical edges.
    pub compatibility_threshold: f32,
    /// Subdivision cycles; the control point count roughly doubles each.
    pub total_cycles: usize,
    /// Force iterations in the first cycle, reduced by 1/3 each cycle.
    pub total_iterations: usize,
    /// Maximum per-iteration step in the first cycle, halved each cycle.
    pub step_size: f32,
    /// Post-hoc blend towards the straight line: 0 fully bundled, 1 fully
    /// straight.
    pub straighten_by: f32,
}

impl Default for BundlingConfig {
    fn default() -> Self {
        Self {
            k: 500.0,
            compatibility_threshold: 0.05,
            total_cycles: 6,
            total_iterations: 50,
            step_size: 0.04,
            straighten_by: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_layout: NodeLayoutConfig,
    pub routing: RoutingConfig,
    pub bundling: BundlingConfig,
}

/// Load a config file, falling back to defaults when no path is given.
/// Missing fields take their default values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: LayoutConfig = serde_json::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LayoutConfig::default();
        assert_eq!(config.node_layout.iterations, 50);
        assert_eq!(config.node_layout.scale, 1.0);
        assert_eq!(config.routing.strategy, RouteStrategy::Straight);
        assert_eq!(config.routing.path_resolution, 100);
        assert_eq!(config.bundling.k, 500.0);
        assert_eq!(config.bundling.compatibility_threshold, 0.05);
        assert_eq!(config.bundling.total_cycles, 6);
        assert_eq!(config.bundling.step_size, 0.04);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{"routing": {"strategy": "bundled"}}"#).unwrap();
        assert_eq!(config.routing.strategy, RouteStrategy::Bundled);
        assert_eq!(config.routing.path_resolution, 100);
        assert_eq!(config.bundling.total_cycles, 6);
    }

    #[test]
    fn unknown_strategy_name_is_a_structural_error() {
        let err = "zigzag".parse::<RouteStrategy>().unwrap_err();
        assert!(err.to_string().contains("zigzag"));
        assert_eq!(
            "arced".parse::<RouteStrategy>().unwrap(),
            RouteStrategy::Arced
        );
    }
}
