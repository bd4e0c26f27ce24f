pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod layout;

pub use config::{
    BundlingConfig, LayoutConfig, NodeLayoutConfig, RouteStrategy, RoutingConfig, load_config,
};
pub use error::{LayoutError, Warning};
pub use geometry::{Point, Segment};
pub use graph::{Edge, Graph};
pub use layout::{Layout, Routing, compute_layout, layout_nodes, route_edges};
