//! Floor regions
//!
//! One contiguous walkable area. Besides its outline it remembers which
//! edges are shared with a neighbouring region, whether it has been seen,
//! and what currently sits on it.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::polygon::Polygon;
use super::rect::Rect;
use crate::error::{GeometryError, Result};
use crate::nav::{ItemId, ObstacleId};

/// Whether an edge is a wall or an opening into another region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeType {
    /// Shared with another floor region, not a wall
    Internal,
    /// Borders the void or an obstacle
    #[default]
    External,
}

/// A walkable polygon with adjacency, fog-of-war and content tracking
#[derive(Debug, Clone)]
pub struct FloorRegion {
    polygon: Polygon,
    edge_types: Vec<EdgeType>,
    /// Scratch marks for the boundary walk, cleared afterwards
    temp_marks: Vec<bool>,
    visible: bool,
    obstacles: BTreeSet<ObstacleId>,
    items: BTreeSet<ItemId>,
}

impl FloorRegion {
    /// Region from an outline; either winding is accepted and normalised so
    /// the walkable side is to the right of each edge.
    pub fn new(points: Vec<Vec2>) -> Result<Self> {
        for (i, &p) in points.iter().enumerate() {
            if crate::coincident(p, points[(i + 1) % points.len().max(1)]) {
                return Err(GeometryError::DegenerateEdge { at: p });
            }
        }
        let mut polygon = Polygon::new(points)?;
        if polygon.signed_area() > 0.0 {
            polygon.reverse();
        }
        let n = polygon.n_points();
        Ok(Self {
            polygon,
            edge_types: vec![EdgeType::External; n],
            temp_marks: vec![false; n],
            visible: false,
            obstacles: BTreeSet::new(),
            items: BTreeSet::new(),
        })
    }

    /// Axis-aligned rectangular room with its corner at (x, y)
    pub fn rectangle(x: f32, y: f32, w: f32, h: f32) -> Result<Self> {
        Self::new(vec![
            Vec2::new(x, y),
            Vec2::new(x, y + h),
            Vec2::new(x + w, y + h),
            Vec2::new(x + w, y),
        ])
    }

    #[inline]
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.polygon.n_points()
    }

    #[inline]
    pub fn point(&self, i: usize) -> Vec2 {
        self.polygon.point(i)
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect {
        self.polygon.bounding_box()
    }

    #[inline]
    pub fn point_inside(&self, p: Vec2) -> bool {
        self.polygon.point_inside(p)
    }

    /// Split edge `index - 1` with a new vertex; both halves keep its type
    pub fn insert_point(&mut self, index: usize, point: Vec2) {
        let index = index.clamp(1, self.n_points());
        let edge_type = self.edge_types[index - 1];
        self.polygon.insert_point(index, point);
        self.edge_types.insert(index, edge_type);
        self.temp_marks.insert(index, false);
    }

    #[inline]
    pub fn edge_type(&self, i: usize) -> EdgeType {
        self.edge_types[i % self.edge_types.len()]
    }

    pub fn set_edge_type(&mut self, i: usize, edge_type: EdgeType) {
        let n = self.edge_types.len();
        self.edge_types[i % n] = edge_type;
    }

    /// True if either edge meeting at vertex `i` is internal
    pub fn corner_borders_internal_edge(&self, i: usize) -> bool {
        let n = self.n_points();
        self.edge_type(i) == EdgeType::Internal || self.edge_type(i + n - 1) == EdgeType::Internal
    }

    #[inline]
    pub fn temp_mark(&self, i: usize) -> bool {
        self.temp_marks[i % self.temp_marks.len()]
    }

    pub fn set_temp_mark(&mut self, i: usize, mark: bool) {
        let n = self.temp_marks.len();
        self.temp_marks[i % n] = mark;
    }

    pub fn clear_temp_marks(&mut self) {
        self.temp_marks.iter_mut().for_each(|m| *m = false);
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn obstacles(&self) -> &BTreeSet<ObstacleId> {
        &self.obstacles
    }

    pub fn add_obstacle(&mut self, id: ObstacleId) {
        self.obstacles.insert(id);
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> bool {
        self.obstacles.remove(&id)
    }

    pub fn items(&self) -> &BTreeSet<ItemId> {
        &self.items
    }

    pub fn add_item(&mut self, id: ItemId) {
        self.items.insert(id);
    }

    pub fn remove_item(&mut self, id: ItemId) -> bool {
        self.items.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_winding_is_floor_winding() {
        let region = FloorRegion::rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        assert!(region.polygon().signed_area() < 0.0);
        assert_eq!(region.point(0), Vec2::new(0.0, 0.0));
        assert_eq!(region.point(1), Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_counter_clockwise_input_is_rewound() {
        let region = FloorRegion::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(0.0, 4.0),
        ])
        .unwrap();
        assert!(region.polygon().signed_area() < 0.0);
    }

    #[test]
    fn test_degenerate_edge_rejected() {
        let err = FloorRegion::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 4.0),
            Vec2::new(4.0, 0.0),
        ])
        .unwrap_err();
        assert_eq!(err, GeometryError::DegenerateEdge { at: Vec2::ZERO });
    }

    #[test]
    fn test_insert_point_inherits_edge_type() {
        let mut region = FloorRegion::rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        region.set_edge_type(2, EdgeType::Internal);
        region.insert_point(3, Vec2::new(5.0, 2.0));
        assert_eq!(region.n_points(), 5);
        assert_eq!(region.edge_type(2), EdgeType::Internal);
        assert_eq!(region.edge_type(3), EdgeType::Internal);
        assert_eq!(region.edge_type(4), EdgeType::External);
        assert!(!region.temp_mark(3));
    }

    #[test]
    fn test_corner_borders_internal_edge() {
        let mut region = FloorRegion::rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        region.set_edge_type(1, EdgeType::Internal);
        assert!(region.corner_borders_internal_edge(1));
        assert!(region.corner_borders_internal_edge(2));
        assert!(!region.corner_borders_internal_edge(0));
        assert!(!region.corner_borders_internal_edge(3));
    }

    #[test]
    fn test_contents_tracking() {
        let mut region = FloorRegion::rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        region.add_item(ItemId(7));
        assert!(region.items().contains(&ItemId(7)));
        assert!(region.remove_item(ItemId(7)));
        assert!(!region.remove_item(ItemId(7)));
        assert!(region.items().is_empty());
        assert!(region.obstacles().is_empty());
    }
}
