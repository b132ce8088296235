//! Corner waypoints and the graph built over them
//!
//! Every reflex corner of a boundary (a corner an agent has to walk around)
//! gets a waypoint, pushed off the corner along the bisector of the two wall
//! normals just far enough for an agent disc to clear both walls. Waypoints
//! whose push-off crosses another boundary are inactive; waypoints that end
//! up off the floor are ineligible. The rest become graph vertices, joined
//! whenever an agent-sized square can slide between them.

use glam::Vec2;

use super::boundary::Boundary;
use super::graph::{Graph, VertexId};
use super::obstacle::{BoundarySource, ObstacleId};
use super::sweep::{self, HitMode, SweepFilter};
use crate::consts::{E_TOL_ANGULAR, E_TOL_LINEAR};
use crate::error::{GeometryError, Result};
use crate::geometry::{FloorRegion, Rect};

/// A navigable point next to a reflex boundary corner
#[derive(Debug, Clone, PartialEq)]
pub struct PathWayPoint {
    origin: Vec2,
    point: Vec2,
    source: BoundarySource,
    active: bool,
    eligible: bool,
    vertex: Option<VertexId>,
}

impl PathWayPoint {
    /// The boundary corner this waypoint clears
    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Where an agent stands
    #[inline]
    pub fn point(&self) -> Vec2 {
        self.point
    }

    #[inline]
    pub fn source(&self) -> BoundarySource {
        self.source
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Graph vertex, for active eligible waypoints
    #[inline]
    pub fn vertex(&self) -> Option<VertexId> {
        self.vertex
    }

    #[inline]
    fn usable(&self) -> bool {
        self.active && self.eligible
    }
}

/// Waypoints for every reflex corner of `boundary`
///
/// A corner whose walls fold straight back on each other has no defined
/// bisector and fails the build.
pub fn corner_waypoints(boundary: &Boundary, radius: f32) -> Result<Vec<PathWayPoint>> {
    let polygon = boundary.polygon();
    let n = polygon.n_points();
    let mut waypoints = Vec::new();
    for i in 0..n {
        let here = polygon.point(i);
        let d0 = here - polygon.point(i + n - 1);
        let d1 = polygon.point(i + 1) - here;
        if d0.length() < E_TOL_LINEAR || d1.length() < E_TOL_LINEAR {
            return Err(GeometryError::CoincidentBoundaryPoints { at: here });
        }
        let (d0, d1) = (d0.normalize(), d1.normalize());
        let turn = crate::cross(d0, d1);
        if turn.abs() <= E_TOL_ANGULAR && d0.dot(d1) < 0.0 {
            return Err(GeometryError::KnifeEdge { at: here });
        }
        // Walkable side is on the right, so a left turn wraps around it
        if turn <= E_TOL_ANGULAR {
            continue;
        }
        let (bisector, ratio) = polygon.corner_bisector(i)?;
        let offset = radius / ratio + E_TOL_LINEAR;
        waypoints.push(PathWayPoint {
            origin: here,
            point: here + bisector * offset,
            source: boundary.source(),
            active: false,
            eligible: false,
            vertex: None,
        });
    }
    Ok(waypoints)
}

fn segment_clear(boundaries: &[Boundary], a: Vec2, b: Vec2, width: f32) -> bool {
    sweep::intersect(boundaries, a, b, width, &SweepFilter::movement(false), HitMode::Any).is_none()
}

/// Waypoints plus the visibility graph connecting the usable ones
#[derive(Debug, Clone, Default)]
pub struct WaypointGraph {
    waypoints: Vec<PathWayPoint>,
    graph: Graph,
}

impl WaypointGraph {
    /// Place waypoints on every boundary and connect all mutually reachable pairs
    pub fn build(boundaries: &[Boundary], regions: &[FloorRegion], radius: f32) -> Result<Self> {
        let mut waypoints = Vec::new();
        for boundary in boundaries {
            waypoints.extend(corner_waypoints(boundary, radius)?);
        }
        for wp in &mut waypoints {
            wp.active = segment_clear(boundaries, wp.origin, wp.point, 0.0);
            wp.eligible = regions.iter().any(|r| r.point_inside(wp.point));
        }

        let mut graph = Graph::new();
        for wp in waypoints.iter_mut().filter(|wp| wp.usable()) {
            wp.vertex = Some(graph.add_vertex(wp.point, wp.source.obstacle()));
        }
        let ids: Vec<VertexId> = graph.vertices().map(|(id, _)| id).collect();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let (Some(pa), Some(pb)) = (graph.pos(a), graph.pos(b)) else {
                    continue;
                };
                if (pb - pa).length() > E_TOL_LINEAR && segment_clear(boundaries, pa, pb, radius) {
                    graph.add_edge(a, b);
                }
            }
        }

        log::info!(
            "Built waypoint graph: {} waypoints, {} vertices, {} edges",
            waypoints.len(),
            graph.n_vertices(),
            graph.n_edges()
        );
        Ok(Self { waypoints, graph })
    }

    pub fn waypoints(&self) -> &[PathWayPoint] {
        &self.waypoints
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Waypoints that are graph vertices
    pub fn usable_waypoints(&self) -> impl Iterator<Item = &PathWayPoint> + '_ {
        self.waypoints.iter().filter(|wp| wp.usable())
    }

    /// Patch the graph after an obstacle's boundary has been removed
    ///
    /// `boundaries` must already exclude the removed obstacle; `footprint`
    /// is its old bounding box.
    pub fn remove_obstacle(
        &mut self,
        id: ObstacleId,
        footprint: Rect,
        boundaries: &[Boundary],
        radius: f32,
    ) {
        let before = self.waypoints.len();
        let graph = &mut self.graph;
        self.waypoints.retain(|wp| {
            if wp.source.obstacle() != Some(id) {
                return true;
            }
            if let Some(v) = wp.vertex {
                graph.remove_vertex(v);
            }
            false
        });
        log::debug!("Dropped {} waypoints of {:?}", before - self.waypoints.len(), id);

        // Waypoints that were cut off by the obstacle may be usable now
        let mut activated = 0;
        for i in 0..self.waypoints.len() {
            let wp = &self.waypoints[i];
            if wp.active || !segment_clear(boundaries, wp.origin, wp.point, 0.0) {
                continue;
            }
            self.waypoints[i].active = true;
            if !self.waypoints[i].eligible {
                continue;
            }
            let point = self.waypoints[i].point;
            let v = self.graph.add_vertex(point, self.waypoints[i].source.obstacle());
            self.waypoints[i].vertex = Some(v);
            let others: Vec<(VertexId, Vec2)> = self
                .graph
                .vertices()
                .filter(|&(other, _)| other != v)
                .map(|(other, vertex)| (other, vertex.pos()))
                .collect();
            for (other, pos) in others {
                if (pos - point).length() > E_TOL_LINEAR && segment_clear(boundaries, point, pos, radius) {
                    self.graph.add_edge(v, other);
                }
            }
            activated += 1;
        }

        // Pairs whose corridor ran over the obstacle may now see each other
        let area = footprint.expand(radius);
        let vertices: Vec<(VertexId, Vec2)> = self.graph.vertices().map(|(v, vertex)| (v, vertex.pos())).collect();
        let mut added = 0;
        for (i, &(a, pa)) in vertices.iter().enumerate() {
            for &(b, pb) in &vertices[i + 1..] {
                if self.graph.are_connected(a, b) || !Rect::of_segment(pa, pb).overlaps(&area) {
                    continue;
                }
                if (pb - pa).length() > E_TOL_LINEAR
                    && segment_clear(boundaries, pa, pb, radius)
                    && self.graph.add_edge(a, b)
                {
                    added += 1;
                }
            }
        }
        log::debug!(
            "Incremental update: {} waypoints activated, {} edges added",
            activated,
            added
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::nav::boundary::{obstacle_boundary, synthesize_floor_boundaries};
    use crate::nav::obstacle::{Footprint, Obstacle, ObstacleArena};

    fn level(obstacles: &[Obstacle]) -> (Vec<Boundary>, Vec<FloorRegion>, Vec<ObstacleId>) {
        let mut regions = vec![FloorRegion::rectangle(0.0, 0.0, 5.0, 5.0).unwrap()];
        let mut boundaries = synthesize_floor_boundaries(&mut regions).unwrap();
        let mut arena = ObstacleArena::new();
        let mut ids = Vec::new();
        for obstacle in obstacles {
            let id = arena.insert(obstacle.clone());
            boundaries.push(obstacle_boundary(id, obstacle, &regions).unwrap().unwrap());
            ids.push(id);
        }
        (boundaries, regions, ids)
    }

    #[test]
    fn test_room_corners_are_not_waypoints() {
        let (boundaries, _, _) = level(&[]);
        assert!(corner_waypoints(&boundaries[0], 0.25).unwrap().is_empty());
    }

    #[test]
    fn test_pillar_corners_offset_by_radius_over_ratio() {
        let (boundaries, regions, ids) = level(&[Obstacle::scenery(Vec2::new(2.5, 2.5), 1.0, 1.0)]);
        let waypoints = corner_waypoints(&boundaries[1], 0.25).unwrap();
        assert_eq!(waypoints.len(), 4);
        let offset = 0.25 * std::f32::consts::SQRT_2 + E_TOL_LINEAR;
        let expected = Vec2::new(2.0, 2.0) + Vec2::new(-1.0, -1.0).normalize() * offset;
        assert!(waypoints.iter().any(|wp| (wp.point() - expected).length() < 1.0e-5));
        assert!(waypoints.iter().all(|wp| wp.source() == BoundarySource::Obstacle(ids[0])));

        let built = WaypointGraph::build(&boundaries, &regions, 0.25).unwrap();
        assert_eq!(built.usable_waypoints().count(), 4);
        // Round the four sides, never across the pillar
        assert_eq!(built.graph().n_edges(), 4);
    }

    #[test]
    fn test_waypoint_pushed_through_wall_is_inactive() {
        // Left side of the pillar is 0.1 from the west wall
        let (boundaries, regions, _) = level(&[Obstacle::scenery(Vec2::new(0.6, 2.5), 1.0, 1.0)]);
        let built = WaypointGraph::build(&boundaries, &regions, 0.25).unwrap();
        let (usable, unusable): (Vec<_>, Vec<_>) = built.waypoints().iter().partition(|wp| wp.usable());
        assert_eq!(usable.len(), 2);
        assert_eq!(unusable.len(), 2);
        for wp in unusable {
            assert!(!wp.is_active());
            assert!(!wp.is_eligible());
            assert_eq!(wp.vertex(), None);
        }
        assert_eq!(built.graph().n_edges(), 1);
    }

    #[test]
    fn test_knife_edge_corner_fails() {
        let regions = vec![FloorRegion::rectangle(0.0, 0.0, 10.0, 10.0).unwrap()];
        let mut arena = ObstacleArena::new();
        let spike = Obstacle::scenery(Vec2::new(5.0, 5.0), 1.0, 1.0).with_footprint(Footprint::Polygon(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.0, 1.0),
        ]));
        let id = arena.insert(spike.clone());
        let boundary = obstacle_boundary(id, &spike, &regions).unwrap().unwrap();
        assert!(matches!(
            corner_waypoints(&boundary, 0.25),
            Err(GeometryError::KnifeEdge { .. })
        ));
    }

    #[test]
    fn test_collinear_corner_is_skipped() {
        let boundary = Boundary::floor(
            Polygon::new(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 2.0),
                Vec2::new(0.0, 4.0),
                Vec2::new(4.0, 4.0),
                Vec2::new(4.0, 0.0),
            ])
            .unwrap(),
        );
        assert!(corner_waypoints(&boundary, 0.25).unwrap().is_empty());
    }

    #[test]
    fn test_remove_obstacle_drops_its_waypoints() {
        let pillar = Obstacle::scenery(Vec2::new(2.5, 2.5), 1.0, 1.0);
        let (mut boundaries, regions, ids) = level(&[pillar.clone()]);
        let mut built = WaypointGraph::build(&boundaries, &regions, 0.25).unwrap();
        boundaries.retain(|b| b.source().obstacle() != Some(ids[0]));
        built.remove_obstacle(ids[0], pillar.bounds(), &boundaries, 0.25);
        assert!(built.waypoints().is_empty());
        assert_eq!(built.graph().n_vertices(), 0);
    }
}
