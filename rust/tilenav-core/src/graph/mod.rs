pub mod cache;
pub mod map_graph;
pub mod movement;

pub use cache::{static_fingerprint, GraphCache};
pub use map_graph::{Directionality, Edge, EdgeKind, MapGraph};
pub use movement::{Direction, DIRECTION_ORDER};
