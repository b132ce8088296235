//! Polygons
//!
//! A closed loop of points with a cached bounding box. Edge `i` runs from
//! point `i` to point `i + 1` (wrapping).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rect::Rect;
use crate::consts::{E_TOL_ANGULAR, E_TOL_LINEAR, E_TOL_MACHINE};
use crate::error::{GeometryError, Result};
use crate::{closest_point_on_segment, perpendicular};

/// A simple closed polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Vec2>,
    bounds: Rect,
}

impl Polygon {
    /// Build a polygon, rejecting fewer than three points
    pub fn new(points: Vec<Vec2>) -> Result<Self> {
        if points.len() < 3 {
            return Err(GeometryError::TooFewPoints {
                count: points.len(),
            });
        }
        let bounds = Rect::from_points(&points);
        Ok(Self { points, bounds })
    }

    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn point(&self, i: usize) -> Vec2 {
        self.points[i % self.points.len()]
    }

    /// Endpoints of edge `i`
    #[inline]
    pub fn edge(&self, i: usize) -> (Vec2, Vec2) {
        (self.point(i), self.point(i + 1))
    }

    /// Iterate over all edges as (start, end)
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        (0..self.points.len()).map(move |i| self.edge(i))
    }

    #[inline]
    pub fn bounding_box(&self) -> Rect {
        self.bounds
    }

    /// Insert a point so that it becomes index `index` (splitting edge `index - 1`)
    pub fn insert_point(&mut self, index: usize, point: Vec2) {
        let index = index.clamp(1, self.points.len());
        self.points.insert(index, point);
        self.bounds = self.bounds.union(&Rect::new(point, point));
    }

    /// Signed area; negative when the interior is to the right of each edge
    /// (the floor-region winding)
    pub fn signed_area(&self) -> f32 {
        self.edges().map(|(a, b)| crate::cross(a, b)).sum::<f32>() * 0.5
    }

    /// Reverse the point order
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Area-weighted centroid (vertex mean for degenerate polygons)
    pub fn centroid(&self) -> Vec2 {
        let mut area = 0.0;
        let mut c = Vec2::ZERO;
        for (a, b) in self.edges() {
            let w = crate::cross(a, b);
            area += w;
            c += (a + b) * w;
        }
        if area.abs() <= E_TOL_MACHINE {
            return self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32;
        }
        c / (3.0 * area)
    }

    /// Point-in-polygon by ray crossing; points on (or within the linear
    /// tolerance of) an edge count as inside.
    pub fn point_inside(&self, p: Vec2) -> bool {
        if !self.bounds.expand(E_TOL_LINEAR).contains(p) {
            return false;
        }
        if self
            .edges()
            .any(|(a, b)| (closest_point_on_segment(p, a, b) - p).length() <= E_TOL_LINEAR)
        {
            return true;
        }

        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from `p` to the nearest point of the outline
    pub fn distance_from(&self, p: Vec2) -> f32 {
        self.edges()
            .map(|(a, b)| (closest_point_on_segment(p, a, b) - p).length())
            .fold(f32::MAX, f32::min)
    }

    /// Unit bisector of the two edge normals at vertex `i`, and the cosine of
    /// half the turn between them.
    ///
    /// Fails on coincident neighbours and on knife-edge corners where the two
    /// edges run back along each other.
    pub fn corner_bisector(&self, i: usize) -> Result<(Vec2, f32)> {
        let n = self.points.len();
        let prev = self.point(i + n - 1);
        let here = self.point(i);
        let next = self.point(i + 1);
        let d0 = here - prev;
        let d1 = next - here;
        if d0.length() < E_TOL_LINEAR || d1.length() < E_TOL_LINEAR {
            return Err(GeometryError::CoincidentBoundaryPoints { at: here });
        }
        let n0 = perpendicular(d0.normalize());
        let n1 = perpendicular(d1.normalize());
        let sum = n0 + n1;
        let mag = sum.length();
        if mag <= E_TOL_MACHINE || n0.dot(n1) <= -1.0 + E_TOL_ANGULAR {
            return Err(GeometryError::KnifeEdge { at: here });
        }
        Ok((sum / mag, 0.5 * mag))
    }

    /// Vertex `i` moved `distance` along the bisector of its edge normals
    pub fn offset_inwards(&self, i: usize, distance: f32) -> Result<Vec2> {
        let (bisector, _) = self.corner_bisector(i)?;
        Ok(self.point(i) + bisector * distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_too_few_points() {
        let err = Polygon::new(vec![Vec2::ZERO, Vec2::X]).unwrap_err();
        assert_eq!(err, GeometryError::TooFewPoints { count: 2 });
    }

    #[test]
    fn test_point_inside_triangle() {
        let poly = Polygon::new(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(0.5, -1.1),
            Vec2::new(-0.1, 0.8),
        ])
        .unwrap();
        assert!(poly.point_inside(Vec2::new(0.0, -1.05)));
        // A vertex is on the boundary
        assert!(poly.point_inside(Vec2::new(0.5, -1.1)));
        assert!(!poly.point_inside(Vec2::new(0.0, -1.1)));
    }

    #[test]
    fn test_point_inside_concave() {
        let poly = Polygon::new(vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.9, -0.9),
        ])
        .unwrap();
        assert!(poly.point_inside(Vec2::new(0.91, -0.91)));
        assert!(!poly.point_inside(Vec2::new(0.0, 0.5)));
    }

    #[test]
    fn test_point_on_edge_is_inside() {
        let poly = square();
        assert!(poly.point_inside(Vec2::new(1.0, 0.0)));
        assert!(poly.point_inside(Vec2::new(2.0, 1.5)));
        assert!(!poly.point_inside(Vec2::new(2.01, 1.5)));
    }

    #[test]
    fn test_distance_from() {
        let poly = square();
        assert!((poly.distance_from(Vec2::new(3.0, 1.0)) - 1.0).abs() < 1.0e-6);
        assert!((poly.distance_from(Vec2::new(1.0, 1.5)) - 0.5).abs() < 1.0e-6);
        // Beyond a corner the nearest feature is the vertex
        assert!((poly.distance_from(Vec2::new(3.0, 3.0)) - 2.0_f32.sqrt()).abs() < 1.0e-5);
    }

    #[test]
    fn test_signed_area_and_centroid() {
        let poly = square();
        assert!((poly.signed_area() + 4.0).abs() < 1.0e-5);
        assert!((poly.centroid() - Vec2::new(1.0, 1.0)).length() < 1.0e-5);
    }

    #[test]
    fn test_offset_inwards_moves_into_interior() {
        let poly = square();
        // Floor winding: the normals point in, so corners move inside
        let p = poly.offset_inwards(0, 2.0_f32.sqrt()).unwrap();
        assert!((p - Vec2::new(1.0, 1.0)).length() < 1.0e-5);
        assert!(poly.point_inside(p));
    }

    #[test]
    fn test_corner_bisector_half_angle() {
        let poly = square();
        let (bisector, ratio) = poly.corner_bisector(1).unwrap();
        assert!((bisector.length() - 1.0).abs() < 1.0e-5);
        assert!((ratio - std::f32::consts::FRAC_1_SQRT_2).abs() < 1.0e-5);
    }

    #[test]
    fn test_offset_knife_edge_fails() {
        let poly = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ])
        .unwrap();
        let err = poly.offset_inwards(1, 0.5).unwrap_err();
        assert_eq!(err, GeometryError::KnifeEdge { at: Vec2::new(2.0, 0.0) });
    }

    #[test]
    fn test_offset_coincident_fails() {
        let poly = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
        ])
        .unwrap();
        assert!(matches!(
            poly.offset_inwards(1, 0.5),
            Err(GeometryError::CoincidentBoundaryPoints { .. })
        ));
    }

    #[test]
    fn test_insert_point_grows_bounds() {
        let mut poly = square();
        poly.insert_point(1, Vec2::new(-1.0, 1.0));
        assert_eq!(poly.n_points(), 5);
        assert_eq!(poly.point(1), Vec2::new(-1.0, 1.0));
        assert_eq!(poly.bounding_box().min.x, -1.0);
    }

    proptest! {
        #[test]
        fn prop_vertices_and_centroid_inside_rectangles(
            x in 0.0f32..50.0, y in 0.0f32..50.0, w in 0.5f32..20.0, h in 0.5f32..20.0
        ) {
            let poly = Polygon::new(vec![
                Vec2::new(x, y),
                Vec2::new(x, y + h),
                Vec2::new(x + w, y + h),
                Vec2::new(x + w, y),
            ]).unwrap();
            for &p in poly.points() {
                prop_assert!(poly.point_inside(p));
            }
            prop_assert!(poly.point_inside(poly.centroid()));
        }

        #[test]
        fn prop_vertices_and_centroid_inside_regular_polygons(
            cx in 5.0f32..20.0, cy in 5.0f32..20.0, r in 0.5f32..4.0,
            n in 3usize..9, phase in 0.0f32..1.0
        ) {
            let points: Vec<Vec2> = (0..n)
                .map(|i| {
                    let theta = phase - (i as f32) * std::f32::consts::TAU / n as f32;
                    Vec2::new(cx, cy) + Vec2::new(theta.cos(), theta.sin()) * r
                })
                .collect();
            let poly = Polygon::new(points).unwrap();
            for &p in poly.points() {
                prop_assert!(poly.point_inside(p));
            }
            prop_assert!(poly.point_inside(poly.centroid()));
        }
    }
}
