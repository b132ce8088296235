//! Swept-square intersection
//!
//! The primitive every other query is built on: slide a square of half-width
//! `w` from `start` to `end` and report where it first touches a boundary.
//! Movement uses the agent radius as `w`; line of sight uses zero width.
//!
//! Each boundary edge is moved into the sweep's local frame, where the sweep
//! is the box [-w, w] x [0, len] moving along +y. Edges facing away from the
//! sweep are ignored, so an agent already touching a wall can always step
//! away from it.

use glam::Vec2;

use super::boundary::{Boundary, IntersectMode};
use super::obstacle::ObstacleId;
use crate::geometry::Rect;
use crate::perpendicular;

/// Result of a sweep that touched something
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Where the sweep has to stop
    pub point: Vec2,
    /// Distance travelled from the start before stopping
    pub distance: f32,
}

/// Whether the caller needs the first obstruction or just any obstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitMode {
    #[default]
    Earliest,
    Any,
}

/// Which boundaries a sweep collides with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepFilter {
    pub mode: IntersectMode,
    /// Obstacle to pass through (the thing being walked up to)
    pub ignore: Option<ObstacleId>,
    pub can_fly: bool,
    pub outdoors: bool,
}

impl SweepFilter {
    pub fn movement(can_fly: bool) -> Self {
        Self {
            mode: IntersectMode::Movement,
            ignore: None,
            can_fly,
            outdoors: false,
        }
    }

    pub fn visibility(outdoors: bool) -> Self {
        Self {
            mode: IntersectMode::Visibility,
            ignore: None,
            can_fly: false,
            outdoors,
        }
    }

    pub fn ignoring(mut self, ignore: Option<ObstacleId>) -> Self {
        self.ignore = ignore;
        self
    }

    fn accepts(&self, boundary: &Boundary) -> bool {
        if self.ignore.is_some() && boundary.source().obstacle() == self.ignore {
            return false;
        }
        boundary.blocks(self.mode, self.can_fly, self.outdoors)
    }
}

/// Running state of one sweep over many segments
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    hit: Option<f32>,
    done: bool,
    hit_mode: HitMode,
}

impl Accumulator {
    fn new(hit_mode: HitMode) -> Self {
        Self {
            hit: None,
            done: false,
            hit_mode,
        }
    }

    fn record(&mut self, distance: f32) {
        if self.hit.is_none_or(|d| distance < d) {
            self.hit = Some(distance);
        }
        // Nothing can be closer than zero
        if distance == 0.0 || self.hit_mode == HitMode::Any {
            self.done = true;
        }
    }
}

/// A square swept along a segment, in its own frame
#[derive(Debug, Clone, Copy)]
pub struct SweptSquare {
    start: Vec2,
    /// Forward axis
    dv: Vec2,
    /// Lateral axis
    du: Vec2,
    width: f32,
    ymax: f32,
}

impl SweptSquare {
    /// Sweep from `start` to `end`; None if they coincide
    pub fn new(start: Vec2, end: Vec2, width: f32) -> Option<Self> {
        Self::with_reach(start, end, width, 0.0)
    }

    /// Sweep whose box reaches `extra` past `end`
    pub fn with_reach(start: Vec2, end: Vec2, width: f32, extra: f32) -> Option<Self> {
        let delta = end - start;
        let len = delta.length();
        if len == 0.0 {
            return None;
        }
        let dv = delta / len;
        Some(Self {
            start,
            dv,
            du: perpendicular(dv),
            width,
            ymax: len + extra,
        })
    }

    /// World-space box that contains everything the sweep can touch
    pub fn bounds(&self) -> Rect {
        Rect::of_segment(self.start, self.start + self.dv * (self.ymax + self.width)).expand(1.5 * self.width)
    }

    #[inline]
    fn to_local(&self, p: Vec2) -> Vec2 {
        let d = p - self.start;
        Vec2::new(d.dot(self.du), d.dot(self.dv))
    }

    fn test_segment(&self, p0: Vec2, p1: Vec2, acc: &mut Accumulator) {
        let w = self.width;
        let (xmin, xmax, ymin, ymax) = (-w, w, 0.0, self.ymax);
        let p0 = self.to_local(p0);
        let p1 = self.to_local(p1);
        let dp = p1 - p0;
        let dp_len_sq = dp.length_squared();
        if dp_len_sq == 0.0 {
            return;
        }
        // Moving along or away from this wall is always allowed
        if perpendicular(dp).y >= 0.0 {
            return;
        }

        if (p0.x < xmin && p1.x < xmin)
            || (p0.x > xmax && p1.x > xmax)
            || (p0.y < ymin && p1.y < ymin)
            || (p0.y > ymax + w && p1.y > ymax + w)
        {
            return;
        }

        if p0.y <= ymax || p1.y <= ymax {
            // Liang-Barsky against the box; f64 since the parameters divide
            // by small differences
            let mut tmin = 0.0_f64;
            let mut tmax = 1.0_f64;
            let mut clip = |t: f64, normal: Vec2| {
                if dp.dot(normal) < 0.0 {
                    tmin = tmin.max(t);
                } else {
                    tmax = tmax.min(t);
                }
            };
            if p1.x != p0.x {
                let span = f64::from(p1.x - p0.x);
                clip(f64::from(xmin - p0.x) / span, Vec2::NEG_X);
                clip(f64::from(xmax - p0.x) / span, Vec2::X);
            }
            if p1.y != p0.y {
                let span = f64::from(p1.y - p0.y);
                clip(f64::from(ymin - p0.y) / span, Vec2::NEG_Y);
                clip(f64::from(ymax - p0.y) / span, Vec2::Y);
            }
            if tmin <= tmax {
                let i0 = p0 + dp * tmin as f32;
                let i1 = p0 + dp * tmax as f32;
                let distance = (i0.y.min(i1.y) - w).clamp(0.0, ymax);
                acc.record(distance);
            }
        }

        if !acc.done {
            // Rounded cap at the far end of the sweep
            let end = Vec2::new(0.0, ymax);
            let t = ((end - p0).dot(dp) / dp_len_sq).clamp(0.0, 1.0);
            let closest = p0 + dp * t;
            if closest.y > ymax && (closest - end).length() <= w {
                acc.record((ymax - w).max(0.0));
            }
        }
    }

    fn finish(&self, acc: Accumulator) -> Option<SweepHit> {
        acc.hit.map(|distance| SweepHit {
            point: self.start + self.dv * distance,
            distance,
        })
    }

    fn sweep_boundaries(&self, boundaries: &[Boundary], filter: &SweepFilter, acc: &mut Accumulator) {
        let bounds = self.bounds();
        for boundary in boundaries {
            if acc.done {
                return;
            }
            if !filter.accepts(boundary) || !boundary.bounding_box().overlaps(&bounds) {
                continue;
            }
            for (p0, p1) in boundary.polygon().edges() {
                self.test_segment(p0, p1, acc);
                if acc.done {
                    return;
                }
            }
        }
    }

    fn sweep_square(&self, centre: Vec2, half: f32, acc: &mut Accumulator) {
        // Wound with outward perpendiculars, like an obstacle footprint
        let corners = [
            centre + Vec2::new(-half, -half),
            centre + Vec2::new(half, -half),
            centre + Vec2::new(half, half),
            centre + Vec2::new(-half, half),
        ];
        for i in 0..4 {
            if acc.done {
                return;
            }
            self.test_segment(corners[i], corners[(i + 1) % 4], acc);
        }
    }
}

/// Sweep a square against the boundaries the filter accepts
///
/// A zero-length sweep reports nothing.
pub fn intersect(
    boundaries: &[Boundary],
    start: Vec2,
    end: Vec2,
    width: f32,
    filter: &SweepFilter,
    hit_mode: HitMode,
) -> Option<SweepHit> {
    let square = SweptSquare::new(start, end, width)?;
    let mut acc = Accumulator::new(hit_mode);
    square.sweep_boundaries(boundaries, filter, &mut acc);
    square.finish(acc)
}

/// Sweep against boundaries and against other agents' square footprints
///
/// The box reaches one half-width past `end` so the mover keeps its
/// clearance from whatever is standing at the destination.
pub fn intersect_with_agents(
    boundaries: &[Boundary],
    agents: impl IntoIterator<Item = Vec2>,
    agent_half_width: f32,
    start: Vec2,
    end: Vec2,
    width: f32,
    filter: &SweepFilter,
) -> Option<SweepHit> {
    let square = SweptSquare::with_reach(start, end, width, width)?;
    let mut acc = Accumulator::new(HitMode::Earliest);
    square.sweep_boundaries(boundaries, filter, &mut acc);
    for centre in agents {
        if acc.done {
            break;
        }
        square.sweep_square(centre, agent_half_width, &mut acc);
    }
    square.finish(acc)
}
