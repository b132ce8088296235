//! Boundary synthesis
//!
//! Turns placed floor regions into closed wall loops, and blocking obstacle
//! footprints into their own loops. Every boundary is wound so the edge
//! perpendiculars point into walkable space; the swept-square test relies on
//! that to tell walking into a wall from walking away from it.
//!
//! Floor loops come from three passes over the regions:
//! 1. Imprint: vertices of one region lying on another's edge are inserted
//!    into that edge, so T-junctions become shared corners.
//! 2. Classify: an edge exactly opposed by another region's edge is internal.
//! 3. Walk: chains of external edges are followed, hopping between regions
//!    at shared corners, until each loop closes.

use glam::Vec2;

use super::obstacle::{BoundarySource, Obstacle, ObstacleId};
use crate::coincident;
use crate::consts::E_TOL_LINEAR;
use crate::error::{GeometryError, Result};
use crate::geometry::{EdgeType, FloorRegion, Polygon, Rect};

/// What a sweep is testing for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectMode {
    Movement,
    Visibility,
}

/// A closed loop that agents can't cross (or can't see across)
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    polygon: Polygon,
    source: BoundarySource,
    blocks_movement: bool,
    blocks_visibility: bool,
}

impl Boundary {
    /// Wall loop walked from floor regions; blocks everything
    pub fn floor(polygon: Polygon) -> Self {
        Self {
            polygon,
            source: BoundarySource::Floor,
            blocks_movement: true,
            blocks_visibility: true,
        }
    }

    #[inline]
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    #[inline]
    pub fn source(&self) -> BoundarySource {
        self.source
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect {
        self.polygon.bounding_box()
    }

    /// Should a sweep of this kind collide with this boundary?
    pub fn blocks(&self, mode: IntersectMode, can_fly: bool, outdoors: bool) -> bool {
        match (self.source, mode) {
            (BoundarySource::Floor, IntersectMode::Movement) => !can_fly,
            (BoundarySource::Floor, IntersectMode::Visibility) => !outdoors,
            (_, IntersectMode::Movement) => self.blocks_movement,
            (_, IntersectMode::Visibility) => self.blocks_visibility,
        }
    }
}

/// Insert other regions' vertices that lie on an edge into that edge
pub fn imprint_vertices(regions: &mut [FloorRegion]) {
    let mut imprinted = 0;
    for r in 0..regions.len() {
        let mut j = 0;
        while j < regions[r].n_points() {
            let p0 = regions[r].point(j);
            let p1 = regions[r].point(j + 1);
            let len = (p1 - p0).length();
            if len == 0.0 {
                j += 1;
                continue;
            }
            let dir = (p1 - p0) / len;

            // Nearest foreign vertex strictly inside the edge; the remainder
            // of the edge is checked again on the next pass of the loop.
            let mut best: Option<(f32, Vec2)> = None;
            for (r2, other) in regions.iter().enumerate() {
                if r2 == r {
                    continue;
                }
                for &p in other.polygon().points() {
                    let on_line = crate::drop_on_line(p, p0, dir);
                    if (on_line - p).length() > E_TOL_LINEAR {
                        continue;
                    }
                    let along = (p - p0).dot(dir);
                    if along >= E_TOL_LINEAR
                        && along <= len - E_TOL_LINEAR
                        && best.is_none_or(|(d, _)| along < d)
                    {
                        best = Some((along, on_line));
                    }
                }
            }

            if let Some((_, point)) = best {
                log::debug!("Imprint {:?} between {:?} and {:?}", point, p0, p1);
                regions[r].insert_point(j + 1, point);
                imprinted += 1;
            }
            j += 1;
        }
    }
    log::debug!("Imprinted {} vertices", imprinted);
}

/// Mark edges that are exactly opposed by another region's edge as internal
pub fn classify_internal_edges(regions: &mut [FloorRegion]) {
    let mut internal = Vec::new();
    for (r, region) in regions.iter().enumerate() {
        for j in 0..region.n_points() {
            let (p0, p1) = region.polygon().edge(j);
            if p0 == p1 {
                continue;
            }
            for (r2, other) in regions.iter().enumerate().skip(r + 1) {
                for j2 in 0..other.n_points() {
                    let (p2, p3) = other.polygon().edge(j2);
                    // Regions share a winding, so a shared edge is always opposed
                    if coincident(p0, p3) && coincident(p1, p2) {
                        internal.push((r, j));
                        internal.push((r2, j2));
                    }
                }
            }
        }
    }
    log::debug!("{} internal edges", internal.len());
    for (r, j) in internal {
        regions[r].set_edge_type(j, EdgeType::Internal);
    }
}

fn is_open_external(region: &FloorRegion, j: usize) -> bool {
    !region.temp_mark(j) && region.edge_type(j) == EdgeType::External
}

fn find_open_edge(regions: &[FloorRegion], starting_at: Option<Vec2>) -> Option<(usize, usize)> {
    regions.iter().enumerate().find_map(|(r, region)| {
        (0..region.n_points())
            .find(|&j| {
                is_open_external(region, j) && starting_at.is_none_or(|p| coincident(p, region.point(j)))
            })
            .map(|j| (r, j))
    })
}

fn walk_loops(regions: &mut [FloorRegion]) -> Result<Vec<Boundary>> {
    let mut boundaries = Vec::new();
    while let Some(start) = find_open_edge(regions, None) {
        let start_point = regions[start.0].point(start.1);
        let mut current = start;
        // The loop's first point goes in last, when the walk returns to it
        let mut points = Vec::new();
        loop {
            let (r, j) = current;
            let n = regions[r].n_points();
            let next = (j + 1) % n;
            let from = regions[r].point(j);
            let to = regions[r].point(next);
            if regions[r].temp_mark(j) {
                return Err(GeometryError::EdgeRevisited { from, to });
            }
            points.push(to);
            regions[r].set_temp_mark(j, true);

            if current.0 == start.0 && next == start.1 {
                break;
            }
            if regions[r].edge_type(next) == EdgeType::External {
                current = (r, next);
                continue;
            }
            match find_open_edge(regions, Some(to)) {
                Some(edge) => current = edge,
                None if coincident(to, start_point) => break,
                None => return Err(GeometryError::BoundaryNotClosed { at: to }),
            }
        }
        log::debug!("Closed floor boundary with {} points", points.len());
        boundaries.push(Boundary::floor(Polygon::new(points)?));
    }
    Ok(boundaries)
}

/// Walk every chain of external edges into a closed boundary loop
pub fn walk_boundaries(regions: &mut [FloorRegion]) -> Result<Vec<Boundary>> {
    let result = walk_loops(regions);
    for region in regions.iter_mut() {
        region.clear_temp_marks();
    }
    result
}

/// All three floor passes
pub fn synthesize_floor_boundaries(regions: &mut [FloorRegion]) -> Result<Vec<Boundary>> {
    imprint_vertices(regions);
    classify_internal_edges(regions);
    let boundaries = walk_boundaries(regions)?;
    log::info!(
        "Synthesized {} floor boundaries from {} regions",
        boundaries.len(),
        regions.len()
    );
    Ok(boundaries)
}

/// Boundary for a blocking obstacle (None if it blocks nothing)
///
/// Every footprint vertex has to be on the floor.
pub fn obstacle_boundary(id: ObstacleId, obstacle: &Obstacle, regions: &[FloorRegion]) -> Result<Option<Boundary>> {
    if !obstacle.is_blocking() {
        return Ok(None);
    }
    let polygon = obstacle.footprint_polygon()?;
    if let Some(&at) = polygon
        .points()
        .iter()
        .find(|&&p| !regions.iter().any(|r| r.point_inside(p)))
    {
        return Err(GeometryError::ObstacleOutsideFloor { id, at });
    }
    Ok(Some(Boundary {
        polygon,
        source: obstacle.source(id),
        blocks_movement: obstacle.blocks_movement,
        blocks_visibility: obstacle.blocks_visibility,
    }))
}
