//! Navigation engine
//!
//! Everything here is synchronous and deterministic for a given input:
//! - Boundaries are synthesized once per level and patched on edits
//! - Queries never mutate shared state (path searches clone the graph)
//! - Random choices only come from a caller-supplied RNG
//! - Structural edits only happen inside an `EditSession`

pub mod boundary;
pub mod flee;
pub mod graph;
pub mod location;
pub mod obstacle;
pub mod sweep;
pub mod visibility;
pub mod waypoints;


pub use boundary::{Boundary, IntersectMode};
pub use graph::{Graph, GraphVertex, ShortestPath, VertexId};
pub use location::{EditSession, LevelDescription, Location, LocationBuilder, path_length};
pub use obstacle::{AgentId, BoundarySource, Footprint, ItemId, Obstacle, ObstacleArena, ObstacleId, ObstacleKind};
pub use sweep::{HitMode, SweepFilter, SweepHit};
pub use waypoints::{PathWayPoint, WaypointGraph};
