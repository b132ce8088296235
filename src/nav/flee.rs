//! Picking places to go: flee points, idle spots and free space
//!
//! Random choices draw from a caller-supplied RNG so a seeded `Pcg32` gives
//! the same answers run after run.

use glam::Vec2;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::boundary::IntersectMode;
use super::location::{Location, path_length};
use super::obstacle::BoundarySource;
use crate::consts::{E_TOL_LINEAR, NUDGE_PASSES};
use crate::{closest_point_on_segment, perpendicular};

impl Location {
    /// A waypoint to run to, away from `threat`
    ///
    /// Candidates lie beyond an agent radius from `from` and on the far side
    /// from the threat (any side if the threat is on top of us). One is drawn
    /// at random and rejected if unreachable or if the threat would get
    /// there first. Callers may simply ask again.
    pub fn find_flee_point<R: Rng + ?Sized>(&self, rng: &mut R, from: Vec2, threat: Vec2, can_fly: bool) -> Option<Vec2> {
        let radius = self.settings.agent_radius;
        let away = (from - threat).normalize_or_zero();
        let candidates: Vec<Vec2> = self
            .usable_waypoints()
            .map(|wp| wp.point())
            .filter(|&p| {
                let offset = p - from;
                offset.length() > radius && (away == Vec2::ZERO || offset.normalize().dot(away) >= -E_TOL_LINEAR)
            })
            .collect();
        let &target = candidates.choose(rng)?;

        let ours = self.calculate_path_to(from, target, None, can_fly);
        if ours.is_empty() {
            return None;
        }
        let theirs = self.calculate_path_to(threat, target, None, can_fly);
        if !theirs.is_empty() && path_length(threat, &theirs) < path_length(from, &ours) {
            log::trace!("Flee point {:?} rejected, threat gets there first", target);
            return None;
        }
        Some(target)
    }

    /// A random waypoint nobody is standing on, seen (or unseen) from `from`,
    /// from which `from` can be walked back to
    pub fn find_free_way_point<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        from: Vec2,
        want_visible: bool,
        can_fly: bool,
    ) -> Option<Vec2> {
        let mut candidates: Vec<Vec2> = self
            .usable_waypoints()
            .map(|wp| wp.point())
            .filter(|&p| !self.collide_with_transient(None, p) && self.visibility_test(from, p) == want_visible)
            .collect();
        candidates.shuffle(rng);
        candidates
            .into_iter()
            .find(|&p| !self.calculate_path_to(p, from, None, can_fly).is_empty())
    }

    /// Is there room for an agent at `pos`?
    fn has_clearance(&self, pos: Vec2) -> bool {
        let radius = self.settings.agent_radius;
        self.region_at(pos).is_some()
            && self
                .boundaries
                .iter()
                .filter(|b| b.blocks(IntersectMode::Movement, false, self.settings.outdoors))
                .all(|b| {
                    let inside_obstacle = b.source() != BoundarySource::Floor && b.polygon().point_inside(pos);
                    !inside_obstacle && b.polygon().distance_from(pos) >= radius
                })
    }

    /// Points `pos` would be pushed to by each wall it overlaps
    fn push_off_walls(&self, pos: Vec2, out: &mut Vec<Vec2>) {
        let radius = self.settings.agent_radius;
        let clearance = radius + E_TOL_LINEAR;
        let walls = self
            .boundaries
            .iter()
            .filter(|b| b.blocks(IntersectMode::Movement, false, self.settings.outdoors));
        for boundary in walls {
            let buried = boundary.source() != BoundarySource::Floor && boundary.polygon().point_inside(pos);
            for (a, b) in boundary.polygon().edges() {
                let closest = closest_point_on_segment(pos, a, b);
                if !buried && (pos - closest).length() >= radius {
                    continue;
                }
                let normal = perpendicular(b - a).normalize_or_zero();
                out.push(closest + normal * clearance);
            }
        }
    }

    /// Move a destination out of any wall or obstacle it is too close to
    ///
    /// Gives the point with room for an agent that is the shortest walk from
    /// `src` (ties go to the one nearest `pos`), or `pos` itself when it is
    /// fine as it is or nothing better is found.
    pub fn nudge_to_free_space(&self, src: Vec2, pos: Vec2) -> Vec2 {
        if self.has_clearance(pos) {
            return pos;
        }
        let mut found = Vec::new();
        let mut seeds = vec![pos];
        // Pushing off one wall can land too close to another (corners)
        for _ in 0..NUDGE_PASSES {
            let mut pushed = Vec::new();
            for &seed in &seeds {
                self.push_off_walls(seed, &mut pushed);
            }
            let (free, blocked): (Vec<Vec2>, Vec<Vec2>) = pushed.into_iter().partition(|&p| self.has_clearance(p));
            found.extend(free);
            if blocked.is_empty() {
                break;
            }
            seeds = blocked;
        }

        // Shortest walk from src first, so a door pushes towards the mover's side
        let nudged = found
            .into_iter()
            .filter_map(|p| {
                let path = self.calculate_path_to(src, p, None, false);
                (!path.is_empty()).then(|| (p, path_length(src, &path), (p - pos).length()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));
        match nudged {
            Some((p, _, _)) => {
                log::trace!("Nudged {:?} to {:?}", pos, p);
                p
            }
            None => pos,
        }
    }
}
