//! Obstacles and the handles that refer to them
//!
//! Scenery and fixed agents live in a generation-checked arena. Boundaries,
//! waypoints and floor regions only ever hold `ObstacleId`s, so a handle to
//! a removed obstacle is detected instead of dangling.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::geometry::{Polygon, Rect};

/// Generation-checked handle into the obstacle arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObstacleId {
    index: u32,
    generation: u32,
}

/// Opaque id for items placed on the floor (owned by the inventory side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Opaque id for moving characters tracked as transient occupants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// What a boundary loop was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundarySource {
    /// Wall chain walked from floor-region external edges
    Floor,
    /// Footprint of a blocking piece of scenery
    Obstacle(ObstacleId),
    /// Footprint of a character that never moves
    FixedAgent(ObstacleId),
}

impl BoundarySource {
    /// The obstacle this boundary belongs to, if any
    pub fn obstacle(&self) -> Option<ObstacleId> {
        match self {
            BoundarySource::Floor => None,
            BoundarySource::Obstacle(id) | BoundarySource::FixedAgent(id) => Some(*id),
        }
    }
}

/// Kind of static obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObstacleKind {
    #[default]
    Scenery,
    FixedAgent,
}

/// Footprint shape, relative to the obstacle position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Footprint {
    /// Axis-aligned rectangle centred on the position
    Rect { width: f32, height: f32 },
    /// Rectangle sheared along x by `shear * dy`, for isometric art
    Sheared { width: f32, height: f32, shear: f32 },
    /// Arbitrary simple polygon, any winding
    Polygon(Vec<Vec2>),
}

impl Footprint {
    /// Square footprint covering a disc of `radius`
    pub fn square(radius: f32) -> Self {
        Footprint::Rect {
            width: 2.0 * radius,
            height: 2.0 * radius,
        }
    }

    /// Offsets wound so the edge perpendiculars point out of the obstacle
    fn offsets(&self) -> Vec<Vec2> {
        match self {
            Footprint::Rect { width, height } => Self::corners(*width, *height, 0.0),
            Footprint::Sheared {
                width,
                height,
                shear,
            } => Self::corners(*width, *height, *shear),
            Footprint::Polygon(points) => points.clone(),
        }
    }

    fn corners(width: f32, height: f32, shear: f32) -> Vec<Vec2> {
        let (hw, hh) = (0.5 * width, 0.5 * height);
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
            .into_iter()
            .map(|(dx, dy)| Vec2::new(dx + shear * dy, dy))
            .collect()
    }
}

/// A static obstacle: scenery (chests, pillars, doors) or a fixed agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Vec2,
    pub footprint: Footprint,
    pub kind: ObstacleKind,
    /// Agents can't walk through it
    pub blocks_movement: bool,
    /// Agents can't see through it
    pub blocks_visibility: bool,
}

impl Obstacle {
    /// Blocking scenery with a rectangular footprint
    pub fn scenery(pos: Vec2, width: f32, height: f32) -> Self {
        Self {
            pos,
            footprint: Footprint::Rect { width, height },
            kind: ObstacleKind::Scenery,
            blocks_movement: true,
            blocks_visibility: true,
        }
    }

    /// A character that never moves; blocks movement but not sight
    pub fn fixed_agent(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            footprint: Footprint::square(radius),
            kind: ObstacleKind::FixedAgent,
            blocks_movement: true,
            blocks_visibility: false,
        }
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_blocking(mut self, blocks_movement: bool, blocks_visibility: bool) -> Self {
        self.blocks_movement = blocks_movement;
        self.blocks_visibility = blocks_visibility;
        self
    }

    /// Does this obstacle need a boundary at all?
    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.blocks_movement || self.blocks_visibility
    }

    /// World-space footprint polygon, wound with outward perpendiculars
    pub fn footprint_polygon(&self) -> Result<Polygon> {
        let points: Vec<Vec2> = self.footprint.offsets().into_iter().map(|o| self.pos + o).collect();
        for (i, &p) in points.iter().enumerate() {
            if crate::coincident(p, points[(i + 1) % points.len()]) {
                return Err(GeometryError::DegenerateEdge { at: p });
            }
        }
        let mut poly = Polygon::new(points)?;
        // Outward perpendiculars need the opposite winding to floor regions
        if poly.signed_area() < 0.0 {
            poly.reverse();
        }
        Ok(poly)
    }

    /// Bounds of the footprint
    pub fn bounds(&self) -> Rect {
        let points: Vec<Vec2> = self.footprint.offsets().into_iter().map(|o| self.pos + o).collect();
        Rect::from_points(&points)
    }

    pub fn source(&self, id: ObstacleId) -> BoundarySource {
        match self.kind {
            ObstacleKind::Scenery => BoundarySource::Obstacle(id),
            ObstacleKind::FixedAgent => BoundarySource::FixedAgent(id),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    obstacle: Option<Obstacle>,
}

/// Arena of obstacles addressed by generation-checked handles
#[derive(Debug, Clone, Default)]
pub struct ObstacleArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ObstacleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, obstacle: Obstacle) -> ObstacleId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.obstacle = Some(obstacle);
            return ObstacleId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            obstacle: Some(obstacle),
        });
        ObstacleId {
            index,
            generation: 0,
        }
    }

    /// Remove and return the obstacle; the handle (and any copies) go stale
    pub fn remove(&mut self, id: ObstacleId) -> Result<Obstacle> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation && s.obstacle.is_some())
            .ok_or(GeometryError::StaleObstacle { id })?;
        let obstacle = slot.obstacle.take().ok_or(GeometryError::StaleObstacle { id })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Ok(obstacle)
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.obstacle.as_ref())
    }

    pub fn get_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.obstacle.as_mut())
    }

    #[inline]
    pub fn contains(&self, id: ObstacleId) -> bool {
        self.get(id).is_some()
    }

    /// Live obstacles in slot order (stable across runs)
    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.obstacle.as_ref().map(|o| {
                (
                    ObstacleId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    o,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.obstacle.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handle_detected() {
        let mut arena = ObstacleArena::new();
        let a = arena.insert(Obstacle::scenery(Vec2::new(2.0, 2.0), 1.0, 1.0));
        assert!(arena.contains(a));

        arena.remove(a).unwrap();
        assert!(!arena.contains(a));
        assert_eq!(arena.remove(a), Err(GeometryError::StaleObstacle { id: a }));

        // Slot is reused with a new generation, the old handle stays dead
        let b = arena.insert(Obstacle::scenery(Vec2::new(3.0, 3.0), 1.0, 1.0));
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).map(|o| o.pos), Some(Vec2::new(3.0, 3.0)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_footprint_winding_points_outward() {
        let obstacle = Obstacle::scenery(Vec2::new(5.0, 5.0), 2.0, 1.0);
        let poly = obstacle.footprint_polygon().unwrap();
        assert!(poly.signed_area() > 0.0);
        // First edge runs along the bottom, its perpendicular points down (out)
        let (a, b) = poly.edge(0);
        let n = crate::perpendicular(b - a);
        assert!(n.y < 0.0);
        assert_eq!(obstacle.bounds(), Rect::from_centre(Vec2::new(5.0, 5.0), 2.0, 1.0));
    }

    #[test]
    fn test_polygon_footprint_is_rewound() {
        // Floor-style winding gets flipped to obstacle winding
        let obstacle = Obstacle::scenery(Vec2::new(5.0, 5.0), 1.0, 1.0).with_footprint(Footprint::Polygon(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, -1.0),
        ]));
        let poly = obstacle.footprint_polygon().unwrap();
        assert!(poly.signed_area() > 0.0);
    }

    #[test]
    fn test_sheared_footprint() {
        let obstacle = Obstacle::scenery(Vec2::new(5.0, 5.0), 1.0, 1.0).with_footprint(Footprint::Sheared {
            width: 2.0,
            height: 1.0,
            shear: 1.0,
        });
        let poly = obstacle.footprint_polygon().unwrap();
        assert_eq!(poly.point(0), Vec2::new(3.5, 4.5));
        assert_eq!(poly.point(2), Vec2::new(6.5, 5.5));
    }

    #[test]
    fn test_fixed_agent_blocks_movement_only() {
        let agent = Obstacle::fixed_agent(Vec2::new(1.0, 1.0), 0.25);
        assert!(agent.blocks_movement);
        assert!(!agent.blocks_visibility);
        assert!(agent.is_blocking());
        assert_eq!(agent.bounds().width(), 0.5);
    }

    #[test]
    fn test_degenerate_footprint_rejected() {
        let obstacle = Obstacle::scenery(Vec2::new(5.0, 5.0), 0.0, 1.0);
        assert!(matches!(
            obstacle.footprint_polygon(),
            Err(GeometryError::DegenerateEdge { .. })
        ));
    }
}
