pub mod map_level;
pub mod provider;
pub mod router;

pub use map_level::MapLevelGraph;
pub use provider::{MapDataProvider, MapStore};
pub use router::{ObserverSnapshot, RouteTarget, WorldRouter};
