//! Construction-time geometry failures
//!
//! These mean the level data is malformed. A `Location` is never handed out
//! half-built: the builder and the structural edits return them and stop.
//! Query-time "no answer" outcomes are not errors and never show up here.

use glam::Vec2;

use crate::nav::ObstacleId;

/// Malformed level geometry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A polygon needs at least three points
    #[error("polygon has {count} points, at least 3 are required")]
    TooFewPoints { count: usize },

    /// Zero-length edge in a floor region or footprint
    #[error("degenerate edge at {at:?}")]
    DegenerateEdge { at: Vec2 },

    /// Consecutive boundary points closer than the linear tolerance
    #[error("coincident boundary points around {at:?}")]
    CoincidentBoundaryPoints { at: Vec2 },

    /// Adjacent edges run back on themselves, the bisector is undefined
    #[error("knife-edge corner at {at:?}, cannot offset")]
    KnifeEdge { at: Vec2 },

    /// The boundary walk stepped onto an edge it had already consumed
    #[error("boundary walk revisited edge {from:?} -> {to:?}")]
    EdgeRevisited { from: Vec2, to: Vec2 },

    /// The boundary walk ran out of external edges before closing its loop
    #[error("boundary walk could not continue from {at:?}")]
    BoundaryNotClosed { at: Vec2 },

    /// An obstacle footprint vertex lies outside every floor region
    #[error("obstacle {id:?} footprint vertex {at:?} is not on the floor")]
    ObstacleOutsideFloor { id: ObstacleId, at: Vec2 },

    /// Floor region vertex outside the non-negative quadrant or the world bounds
    #[error("floor region vertex {at:?} is outside the world bounds")]
    RegionOutOfBounds { at: Vec2 },

    /// Handle refers to an obstacle that has since been removed
    #[error("obstacle {id:?} no longer exists")]
    StaleObstacle { id: ObstacleId },
}

pub type Result<T> = std::result::Result<T, GeometryError>;
