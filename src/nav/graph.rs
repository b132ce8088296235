//! Waypoint graph
//!
//! Vertices live in a slot arena addressed by `VertexId`; neighbour lists
//! hold ids and Euclidean weights. Removing a vertex leaves an empty slot,
//! so ids handed out earlier never alias a different vertex.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;

use super::obstacle::ObstacleId;
use crate::consts::E_TOL_LINEAR;

/// Stable handle of a graph vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct GraphVertex {
    pos: Vec2,
    /// Obstacle whose corner produced this vertex
    owner: Option<ObstacleId>,
    neighbours: Vec<(VertexId, f32)>,
    // Per-query scratch, reset at the start of every search
    visited: bool,
    distance: f32,
    traceback: Option<VertexId>,
}

impl GraphVertex {
    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn owner(&self) -> Option<ObstacleId> {
        self.owner
    }

    pub fn neighbours(&self) -> &[(VertexId, f32)] {
        &self.neighbours
    }
}

/// Result of a successful search
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPath {
    /// Vertices from start to end inclusive
    pub vertices: Vec<VertexId>,
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    distance: f32,
    id: VertexId,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; ids break ties
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sparse undirected graph over waypoints
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Option<GraphVertex>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, pos: Vec2, owner: Option<ObstacleId>) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Some(GraphVertex {
            pos,
            owner,
            neighbours: Vec::new(),
            visited: false,
            distance: 0.0,
            traceback: None,
        }));
        id
    }

    /// Remove a vertex and every edge touching it
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<GraphVertex> {
        let vertex = self.vertices.get_mut(id.index())?.take()?;
        for &(n, _) in &vertex.neighbours {
            if let Some(Some(other)) = self.vertices.get_mut(n.index()) {
                other.neighbours.retain(|&(m, _)| m != id);
            }
        }
        Some(vertex)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&GraphVertex> {
        self.vertices.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn pos(&self, id: VertexId) -> Option<Vec2> {
        self.vertex(id).map(GraphVertex::pos)
    }

    /// Live vertices in id order
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &GraphVertex)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (VertexId(i as u32), v)))
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.iter().flatten().count()
    }

    pub fn n_edges(&self) -> usize {
        self.vertices.iter().flatten().map(|v| v.neighbours.len()).sum::<usize>() / 2
    }

    pub fn are_connected(&self, a: VertexId, b: VertexId) -> bool {
        self.vertex(a).is_some_and(|v| v.neighbours.iter().any(|&(n, _)| n == b))
    }

    /// Connect two live vertices with their Euclidean distance as weight
    ///
    /// Self-loops, duplicates and edges no longer than the linear tolerance
    /// are refused.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> bool {
        if a == b || self.are_connected(a, b) {
            return false;
        }
        let (Some(pa), Some(pb)) = (self.pos(a), self.pos(b)) else {
            return false;
        };
        let weight = (pb - pa).length();
        if weight <= E_TOL_LINEAR {
            return false;
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(Some(v)) = self.vertices.get_mut(from.index()) {
                v.neighbours.push((to, weight));
            }
        }
        true
    }

    /// Dijkstra from `start` to `end`
    ///
    /// Scratch fields are reset first, so a graph can be searched repeatedly.
    pub fn shortest_path(&mut self, start: VertexId, end: VertexId) -> Option<ShortestPath> {
        for v in self.vertices.iter_mut().flatten() {
            v.visited = false;
            v.distance = f32::INFINITY;
            v.traceback = None;
        }
        let first = self.vertices.get_mut(start.index())?.as_mut()?;
        first.distance = 0.0;

        let mut heap = BinaryHeap::new();
        heap.push(Frontier { distance: 0.0, id: start });
        while let Some(Frontier { distance, id }) = heap.pop() {
            let Some(current) = self.vertices[id.index()].as_mut() else {
                continue;
            };
            if current.visited {
                continue;
            }
            current.visited = true;
            if id == end {
                break;
            }
            let neighbours = current.neighbours.clone();
            for (n, weight) in neighbours {
                let Some(next) = self.vertices[n.index()].as_mut() else {
                    continue;
                };
                let candidate = distance + weight;
                if !next.visited && candidate < next.distance {
                    next.distance = candidate;
                    next.traceback = Some(id);
                    heap.push(Frontier {
                        distance: candidate,
                        id: n,
                    });
                }
            }
        }

        let last = self.vertex(end)?;
        if !last.visited {
            return None;
        }
        let length = last.distance;
        let mut vertices = vec![end];
        let mut at = end;
        while let Some(prev) = self.vertex(at).and_then(|v| v.traceback) {
            vertices.push(prev);
            at = prev;
        }
        vertices.reverse();
        Some(ShortestPath { vertices, length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_edges_refused() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vec2::new(1.0, 1.0), None);
        let b = graph.add_vertex(Vec2::new(1.0, 1.00001), None);
        let c = graph.add_vertex(Vec2::new(2.0, 1.0), None);
        assert!(!graph.add_edge(a, b));
        assert!(!graph.add_edge(a, a));
        assert!(graph.add_edge(a, c));
        assert!(!graph.add_edge(c, a));
        assert_eq!(graph.n_edges(), 1);
        assert!(graph.are_connected(c, a));
    }

    #[test]
    fn test_shortest_path_prefers_cheaper_route() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vec2::new(0.0, 0.0), None);
        let b = graph.add_vertex(Vec2::new(5.0, 5.0), None);
        let c = graph.add_vertex(Vec2::new(5.0, 0.5), None);
        let d = graph.add_vertex(Vec2::new(10.0, 0.0), None);
        graph.add_edge(a, b);
        graph.add_edge(b, d);
        graph.add_edge(a, c);
        graph.add_edge(c, d);

        let path = graph.shortest_path(a, d).unwrap();
        assert_eq!(path.vertices, vec![a, c, d]);
        assert!((path.length - 2.0 * 5.0_f32.hypot(0.5)).abs() < 1.0e-4);

        // Searching again gives the same answer (scratch is reset)
        assert_eq!(graph.shortest_path(a, d).unwrap(), path);
        assert_eq!(graph.shortest_path(d, a).unwrap().vertices, vec![d, c, a]);
    }

    #[test]
    fn test_unreachable() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vec2::new(0.0, 0.0), None);
        let b = graph.add_vertex(Vec2::new(1.0, 0.0), None);
        let c = graph.add_vertex(Vec2::new(9.0, 0.0), None);
        graph.add_edge(a, b);
        assert_eq!(graph.shortest_path(a, c), None);
        assert_eq!(graph.shortest_path(a, a).unwrap().vertices, vec![a]);
    }

    #[test]
    fn test_remove_vertex_drops_edges() {
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vec2::new(0.0, 0.0), None);
        let b = graph.add_vertex(Vec2::new(1.0, 0.0), None);
        let c = graph.add_vertex(Vec2::new(2.0, 0.0), None);
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        assert!(graph.remove_vertex(b).is_some());
        assert!(graph.remove_vertex(b).is_none());
        assert_eq!(graph.n_vertices(), 2);
        assert_eq!(graph.n_edges(), 0);
        assert!(graph.vertex(a).unwrap().neighbours().is_empty());
        assert_eq!(graph.shortest_path(a, c), None);
        // Ids are never reused
        let d = graph.add_vertex(Vec2::new(3.0, 0.0), None);
        assert_ne!(d, b);
    }

    #[test]
    fn test_ties_resolve_deterministically() {
        // Two equal-length routes around a square
        let mut graph = Graph::new();
        let a = graph.add_vertex(Vec2::new(0.0, 0.0), None);
        let b = graph.add_vertex(Vec2::new(0.0, 1.0), None);
        let c = graph.add_vertex(Vec2::new(1.0, 0.0), None);
        let d = graph.add_vertex(Vec2::new(1.0, 1.0), None);
        graph.add_edge(a, c);
        graph.add_edge(c, d);
        graph.add_edge(a, b);
        graph.add_edge(b, d);
        let first = graph.shortest_path(a, d).unwrap();
        for _ in 0..5 {
            assert_eq!(graph.clone().shortest_path(a, d).unwrap(), first);
        }
    }
}
