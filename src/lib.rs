//! Dungeon Nav - 2D spatial reasoning for polygonal dungeon layouts
//!
//! Core modules:
//! - `geometry`: Pure 2D kernel (rectangles, polygons, floor regions)
//! - `nav`: Boundaries, swept-square collision, waypoint graph, pathfinding,
//!   fog of war and flee selection, all owned by a `Location`
//! - `settings`: Data-driven engine constants
//! - `error`: Construction-time geometry failures

pub mod error;
pub mod geometry;
pub mod nav;
pub mod settings;

pub use error::{GeometryError, Result};
pub use nav::{Location, LocationBuilder};
pub use settings::NavSettings;

use glam::Vec2;

/// Engine constants
pub mod consts {
    /// Linear tolerance in world units (positional snapping)
    pub const E_TOL_LINEAR: f32 = 1.0e-4;
    /// Degenerate-direction tolerance
    pub const E_TOL_MACHINE: f32 = 1.0e-12;
    /// Angular tolerance (on cosines) for anti-parallel edge detection
    pub const E_TOL_ANGULAR: f32 = 1.0e-6;

    /// Default agent disc radius
    pub const AGENT_RADIUS: f32 = 0.25;
    /// Anything this close is always visible
    pub const MELEE_RANGE: f32 = 0.75;
    /// Maximum line-of-sight distance
    pub const PERCEPTION_RANGE: f32 = 10.0;

    /// How far fog-of-war sample points are pulled off the walls towards the
    /// region centroid, so a sight line ending on a corner doesn't graze it.
    pub const VISIBILITY_INSET: f32 = 0.01;

    /// Relaxation passes when pushing a point clear of nearby walls
    pub const NUDGE_PASSES: usize = 4;
}

/// Perpendicular with the "y to x" handedness: for a boundary edge direction,
/// this points away from the wall into walkable space.
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// 2D cross product (z component of the 3D cross product)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Project `p` onto the infinite line through `origin` with unit direction `dir`
#[inline]
pub fn drop_on_line(p: Vec2, origin: Vec2, dir: Vec2) -> Vec2 {
    origin + dir * (p - origin).dot(dir)
}

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= consts::E_TOL_MACHINE {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Points within `E_TOL_LINEAR` of each other are the same point
#[inline]
pub fn coincident(a: Vec2, b: Vec2) -> bool {
    (a - b).length() <= consts::E_TOL_LINEAR
}
