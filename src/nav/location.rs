//! Location: one loaded level
//!
//! Owns the floor regions, the boundaries synthesized from them, the
//! obstacle arena, and the waypoint graph. Queries take `&self`. Structural
//! edits (adding, removing, opening and closing obstacles) go through an
//! [`EditSession`], which holds the only mutable borrow while it lives.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::boundary::{self, Boundary};
use super::obstacle::{AgentId, ItemId, Obstacle, ObstacleArena, ObstacleId};
use super::sweep::{self, HitMode, SweepFilter};
use super::waypoints::{PathWayPoint, WaypointGraph};
use crate::error::{GeometryError, Result};
use crate::geometry::FloorRegion;
use crate::settings::NavSettings;

/// Total length of a path walked from `src`
pub fn path_length(src: Vec2, path: &[Vec2]) -> f32 {
    path.iter()
        .fold((src, 0.0), |(prev, total), &p| (p, total + (p - prev).length()))
        .1
}

/// A level as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDescription {
    pub settings: NavSettings,
    /// Floor region outlines, either winding
    pub regions: Vec<Vec<Vec2>>,
    pub obstacles: Vec<Obstacle>,
}

impl LevelDescription {
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn into_builder(self) -> Result<LocationBuilder> {
        let mut builder = LocationBuilder::new(self.settings);
        for outline in self.regions {
            builder.add_region(FloorRegion::new(outline)?);
        }
        for obstacle in self.obstacles {
            builder.add_obstacle(obstacle);
        }
        Ok(builder)
    }
}

/// Collects regions and obstacles, then builds a [`Location`] in one go
#[derive(Debug, Clone, Default)]
pub struct LocationBuilder {
    settings: NavSettings,
    regions: Vec<FloorRegion>,
    obstacles: ObstacleArena,
}

impl LocationBuilder {
    pub fn new(settings: NavSettings) -> Self {
        Self {
            settings,
            regions: Vec::new(),
            obstacles: ObstacleArena::new(),
        }
    }

    pub fn add_region(&mut self, region: FloorRegion) -> &mut Self {
        self.regions.push(region);
        self
    }

    /// Axis-aligned rectangular room
    pub fn add_room(&mut self, x: f32, y: f32, w: f32, h: f32) -> Result<&mut Self> {
        self.regions.push(FloorRegion::rectangle(x, y, w, h)?);
        Ok(self)
    }

    /// Obstacles are validated against the floor at build time
    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> ObstacleId {
        self.obstacles.insert(obstacle)
    }

    /// Synthesize boundaries and the waypoint graph
    ///
    /// Fails on malformed level data; nothing is returned half-built.
    pub fn build(self) -> Result<Location> {
        let Self {
            settings,
            mut regions,
            obstacles,
        } = self;

        let limit = settings.world_size();
        for region in &regions {
            for &p in region.polygon().points() {
                let outside = limit.is_some_and(|(w, h)| p.x > w || p.y > h);
                if p.x < 0.0 || p.y < 0.0 || outside {
                    return Err(GeometryError::RegionOutOfBounds { at: p });
                }
            }
        }

        let boundaries = boundary::synthesize_floor_boundaries(&mut regions)?;
        let mut location = Location {
            n_floor_boundaries: boundaries.len(),
            settings,
            regions,
            boundaries,
            obstacles,
            placements: BTreeMap::new(),
            items: BTreeMap::new(),
            agents: BTreeMap::new(),
            nav: WaypointGraph::default(),
            full_rebuilds: 0,
        };
        let ids: Vec<ObstacleId> = location.obstacles.iter().map(|(id, _)| id).collect();
        for id in ids {
            location.place_obstacle(id)?;
        }
        location.rebuild_obstacles()?;
        location.full_rebuilds = 0;

        log::info!(
            "Built location: {} regions, {} boundaries, {} obstacles",
            location.regions.len(),
            location.boundaries.len(),
            location.obstacles.len()
        );
        Ok(location)
    }
}

/// A built level, ready for queries
#[derive(Debug, Clone)]
pub struct Location {
    pub(super) settings: NavSettings,
    pub(super) regions: Vec<FloorRegion>,
    /// Floor loops first, then one per blocking obstacle
    pub(super) boundaries: Vec<Boundary>,
    n_floor_boundaries: usize,
    obstacles: ObstacleArena,
    /// Region each obstacle was registered in
    placements: BTreeMap<ObstacleId, usize>,
    items: BTreeMap<ItemId, usize>,
    /// Characters that move, so have no boundary
    pub(super) agents: BTreeMap<AgentId, Vec2>,
    nav: WaypointGraph,
    full_rebuilds: usize,
}

impl Location {
    #[inline]
    pub fn settings(&self) -> &NavSettings {
        &self.settings
    }

    pub fn regions(&self) -> &[FloorRegion] {
        &self.regions
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn obstacles(&self) -> &ObstacleArena {
        &self.obstacles
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id)
    }

    pub fn waypoints(&self) -> &[PathWayPoint] {
        self.nav.waypoints()
    }

    pub fn graph(&self) -> &super::graph::Graph {
        self.nav.graph()
    }

    pub(crate) fn usable_waypoints(&self) -> impl Iterator<Item = &PathWayPoint> + '_ {
        self.nav.usable_waypoints()
    }

    /// Number of full waypoint-graph rebuilds caused by edits since the build
    pub fn full_rebuilds(&self) -> usize {
        self.full_rebuilds
    }

    /// Far corner of the level (max x and y over all floor regions)
    pub fn calculate_size(&self) -> Vec2 {
        self.regions
            .iter()
            .map(|r| r.bounding_box().max)
            .fold(Vec2::ZERO, Vec2::max)
    }

    /// Index of the first floor region containing `pos`
    pub fn region_at(&self, pos: Vec2) -> Option<usize> {
        self.regions.iter().position(|r| r.point_inside(pos))
    }

    /// Start a structural edit
    pub fn edit(&mut self) -> EditSession<'_> {
        EditSession { location: self }
    }

    // === Sweeps ===

    pub fn movement_filter(&self, can_fly: bool) -> SweepFilter {
        SweepFilter::movement(can_fly)
    }

    pub fn visibility_filter(&self) -> SweepFilter {
        SweepFilter::visibility(self.settings.outdoors)
    }

    /// Where a square of half-width `width` swept from `start` to `end`
    /// has to stop, or None if the way is clear
    pub fn intersect_swept_square_with_boundaries(
        &self,
        start: Vec2,
        end: Vec2,
        width: f32,
        filter: &SweepFilter,
        hit_mode: HitMode,
    ) -> Option<Vec2> {
        sweep::intersect(&self.boundaries, start, end, width, filter, hit_mode).map(|hit| hit.point)
    }

    pub(crate) fn is_clear(&self, start: Vec2, end: Vec2, width: f32, filter: &SweepFilter) -> bool {
        sweep::intersect(&self.boundaries, start, end, width, filter, HitMode::Any).is_none()
    }

    /// Movement sweep for `mover` that also stops short of other agents
    pub fn intersect_with_boundaries_and_agents(&self, mover: Option<AgentId>, start: Vec2, end: Vec2) -> Option<Vec2> {
        let radius = self.settings.agent_radius;
        let others = self
            .agents
            .iter()
            .filter(|&(&id, _)| Some(id) != mover)
            .map(|(_, &pos)| pos);
        sweep::intersect_with_agents(
            &self.boundaries,
            others,
            radius,
            start,
            end,
            radius,
            &self.movement_filter(false),
        )
        .map(|hit| hit.point)
    }

    // === Pathfinding ===

    /// Shortest walkable route from `src` to `dest`, excluding `src`
    ///
    /// Empty when `dest` can't be reached, or when a walker's `src` or `dest`
    /// is off the floor. `ignore` lets the final leg pass through one
    /// obstacle (the thing being walked up to); the returned path then stops
    /// where it meets that obstacle.
    pub fn calculate_path_to(&self, src: Vec2, dest: Vec2, ignore: Option<ObstacleId>, can_fly: bool) -> Vec<Vec2> {
        if !can_fly && (self.region_at(src).is_none() || self.region_at(dest).is_none()) {
            log::trace!("No path {:?} -> {:?}: off the floor", src, dest);
            return Vec::new();
        }
        let radius = self.settings.agent_radius;
        let filter = self.movement_filter(can_fly);
        let last_leg = filter.ignoring(ignore);

        let mut path = if self.is_clear(src, dest, radius, &last_leg) {
            log::trace!("Direct path {:?} -> {:?}", src, dest);
            vec![dest]
        } else {
            let mut graph = self.nav.graph().clone();
            let existing: Vec<_> = graph.vertices().map(|(v, vertex)| (v, vertex.pos())).collect();
            let start = graph.add_vertex(src, None);
            let end = graph.add_vertex(dest, None);
            for (v, pos) in existing {
                if self.is_clear(src, pos, radius, &filter) {
                    graph.add_edge(start, v);
                }
                if self.is_clear(pos, dest, radius, &last_leg) {
                    graph.add_edge(v, end);
                }
            }
            let Some(route) = graph.shortest_path(start, end) else {
                log::trace!("No path {:?} -> {:?}", src, dest);
                return Vec::new();
            };
            log::trace!("Path {:?} -> {:?}: {} legs, length {}", src, dest, route.vertices.len() - 1, route.length);
            route.vertices[1..].iter().filter_map(|&v| graph.pos(v)).collect()
        };

        if ignore.is_some() {
            let from = if path.len() >= 2 { path[path.len() - 2] } else { src };
            let hit = self.intersect_swept_square_with_boundaries(from, dest, radius, &filter, HitMode::Earliest);
            if let (Some(hit), Some(last)) = (hit, path.last_mut()) {
                *last = hit;
            }
        }
        path
    }

    // === Transient agents ===

    pub fn set_agent_position(&mut self, id: AgentId, pos: Vec2) {
        self.agents.insert(id, pos);
    }

    pub fn remove_agent(&mut self, id: AgentId) -> Option<Vec2> {
        self.agents.remove(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = (AgentId, Vec2)> + '_ {
        self.agents.iter().map(|(&id, &pos)| (id, pos))
    }

    /// Would an agent at `pos` overlap any moving agent other than `exclude`?
    pub fn collide_with_transient(&self, exclude: Option<AgentId>, pos: Vec2) -> bool {
        let reach = 2.0 * self.settings.agent_radius;
        self.agents
            .iter()
            .any(|(&id, &other)| Some(id) != exclude && (other - pos).length() <= reach)
    }

    // === Items ===

    /// Record an item lying at `pos`; false if `pos` is off the floor
    pub fn add_item(&mut self, id: ItemId, pos: Vec2) -> bool {
        self.remove_item(id);
        let Some(index) = self.region_at(pos) else {
            log::debug!("Item {:?} at {:?} is off the floor", id, pos);
            return false;
        };
        self.regions[index].add_item(id);
        self.items.insert(id, index);
        true
    }

    pub fn remove_item(&mut self, id: ItemId) -> bool {
        match self.items.remove(&id) {
            Some(index) => self.regions[index].remove_item(id),
            None => false,
        }
    }

    // === Structural upkeep ===

    /// Check an obstacle fits the floor and record which region holds it
    fn place_obstacle(&mut self, id: ObstacleId) -> Result<()> {
        let obstacle = self.obstacles.get(id).ok_or(GeometryError::StaleObstacle { id })?;
        boundary::obstacle_boundary(id, obstacle, &self.regions)?;
        if let Some(index) = self.region_at(obstacle.pos) {
            self.regions[index].add_obstacle(id);
            self.placements.insert(id, index);
        }
        Ok(())
    }

    fn unplace_obstacle(&mut self, id: ObstacleId) {
        if let Some(index) = self.placements.remove(&id) {
            self.regions[index].remove_obstacle(id);
        }
    }

    /// Rebuild obstacle boundaries, waypoints and the graph from scratch
    fn rebuild_obstacles(&mut self) -> Result<()> {
        self.boundaries.truncate(self.n_floor_boundaries);
        for (id, obstacle) in self.obstacles.iter() {
            if let Some(b) = boundary::obstacle_boundary(id, obstacle, &self.regions)? {
                self.boundaries.push(b);
            }
        }
        self.nav = WaypointGraph::build(&self.boundaries, &self.regions, self.settings.agent_radius)?;
        self.full_rebuilds += 1;
        Ok(())
    }

    /// Drop an obstacle's boundary and patch the graph around the gap
    fn remove_obstacle_boundary(&mut self, id: ObstacleId, obstacle: &Obstacle) {
        let before = self.boundaries.len();
        self.boundaries.retain(|b| b.source().obstacle() != Some(id));
        if self.boundaries.len() != before {
            self.nav
                .remove_obstacle(id, obstacle.bounds(), &self.boundaries, self.settings.agent_radius);
        }
    }
}

/// Exclusive edit phase for a [`Location`]
///
/// No query can run while a session is alive.
pub struct EditSession<'a> {
    location: &'a mut Location,
}

impl EditSession<'_> {
    /// Add an obstacle; the graph is rebuilt
    ///
    /// On failure the location is left as it was.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> Result<ObstacleId> {
        let loc = &mut *self.location;
        let id = loc.obstacles.insert(obstacle);
        let result = loc.place_obstacle(id).and_then(|_| loc.rebuild_obstacles());
        if let Err(e) = result {
            log::warn!("Rejected obstacle: {}", e);
            loc.unplace_obstacle(id);
            loc.obstacles.remove(id)?;
            loc.rebuild_obstacles()?;
            return Err(e);
        }
        log::info!("Added obstacle {:?}", id);
        Ok(id)
    }

    /// Remove an obstacle, patching the graph incrementally
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Result<Obstacle> {
        let loc = &mut *self.location;
        let obstacle = loc.obstacles.remove(id).inspect_err(|_| {
            log::warn!("Remove of stale obstacle {:?}", id);
        })?;
        loc.unplace_obstacle(id);
        loc.remove_obstacle_boundary(id, &obstacle);
        log::info!("Removed obstacle {:?}", id);
        Ok(obstacle)
    }

    /// Change what an obstacle blocks (opening or closing a door)
    ///
    /// Opening to fully passable takes the incremental path; any other
    /// change rebuilds the graph.
    pub fn set_obstacle_blocking(&mut self, id: ObstacleId, blocks_movement: bool, blocks_visibility: bool) -> Result<()> {
        let loc = &mut *self.location;
        let Some(obstacle) = loc.obstacles.get_mut(id) else {
            log::warn!("Blocking change on stale obstacle {:?}", id);
            return Err(GeometryError::StaleObstacle { id });
        };
        let old = (obstacle.blocks_movement, obstacle.blocks_visibility);
        if old == (blocks_movement, blocks_visibility) {
            return Ok(());
        }
        let was_blocking = obstacle.is_blocking();
        obstacle.blocks_movement = blocks_movement;
        obstacle.blocks_visibility = blocks_visibility;

        if was_blocking && !obstacle.is_blocking() {
            let opened = obstacle.clone();
            loc.remove_obstacle_boundary(id, &opened);
            log::info!("Opened obstacle {:?}", id);
            return Ok(());
        }
        if let Err(e) = loc.rebuild_obstacles() {
            if let Some(obstacle) = loc.obstacles.get_mut(id) {
                (obstacle.blocks_movement, obstacle.blocks_visibility) = old;
            }
            loc.rebuild_obstacles()?;
            return Err(e);
        }
        log::info!(
            "Obstacle {:?} now blocks movement: {}, visibility: {}",
            id,
            blocks_movement,
            blocks_visibility
        );
        Ok(())
    }
}
