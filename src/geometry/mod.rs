//! Geometry kernel
//!
//! Pure value types, no engine state:
//! - Axis-aligned rectangles for culling
//! - Polygons with containment, distance and corner offsets
//! - Floor regions (polygons with per-edge adjacency and fog-of-war state)
//!
//! Winding convention: walking along any edge, the "inside" that the
//! polygon's perpendiculars point into is on the right. For floor regions
//! that is the walkable area; obstacle footprints are wound the other way so
//! their perpendiculars point out of the obstacle, again into walkable space.

pub mod polygon;
pub mod rect;
pub mod region;

pub use polygon::Polygon;
pub use rect::Rect;
pub use region::{EdgeType, FloorRegion};
