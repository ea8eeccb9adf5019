pub mod extract;

use std::collections::BTreeMap;

use crate::core::shared::{EdgeIdx, FaceIdx, LoopIdx, Vec2, Vec3, VertexIdx};

pub use extract::extract;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BmVertex {
    pub position: Vec3,
    /// Incident edges in ascending order.
    pub edges: Vec<EdgeIdx>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BmEdge {
    /// Endpoints, smaller index first.
    pub vertices: [VertexIdx; 2],
    /// Incident faces in ascending order. More than two for non-manifold edges.
    pub faces: Vec<FaceIdx>,
}

/// One corner of a face: the step from `vertex` along `edge` to the next
/// corner of the same face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BmLoop {
    pub vertex: VertexIdx,
    pub edge: EdgeIdx,
    pub face: FaceIdx,
    pub next: LoopIdx,
    pub prev: LoopIdx,
    pub radial_next: LoopIdx,
    pub radial_prev: LoopIdx,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BmFace {
    pub vertices: Vec<VertexIdx>,
    /// `edges[i]` joins `vertices[i]` and `vertices[i + 1]` (cyclically).
    pub edges: Vec<EdgeIdx>,
    pub loops: Vec<LoopIdx>,
    pub normal: Vec3,
}

/// Optional per-entity data. A layer is present only if it holds at least one
/// non-default value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyAttributes {
    pub vertex_crease: Option<Vec<f32>>,
    pub edge_crease: Option<Vec<f32>>,
    pub face_holes: Option<Vec<bool>>,
    /// `TEXCOORD_n` per loop, keyed by `n`.
    pub tex_coords: BTreeMap<usize, Vec<Vec2>>,
    /// `COLOR_n` per loop, keyed by `n`.
    pub colors: BTreeMap<usize, Vec<Vec3>>,
}

/// The four linked record sets of a polygon mesh. Indices are positions in
/// the owning vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Topology {
    pub vertices: Vec<BmVertex>,
    pub edges: Vec<BmEdge>,
    pub loops: Vec<BmLoop>,
    pub faces: Vec<BmFace>,
    pub attributes: TopologyAttributes,
}

impl Topology {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.loops.is_empty() && self.faces.is_empty()
    }

    /// Recomputes `vertex.edges` from edge endpoints and `edge.faces` from face
    /// edge lists. References to missing records are ignored.
    pub fn rebuild_adjacency(&mut self) {
        for vertex in &mut self.vertices {
            vertex.edges.clear();
        }
        for edge in &mut self.edges {
            edge.faces.clear();
        }

        for (e, edge) in self.edges.iter().enumerate() {
            let [a, b] = edge.vertices;
            if let Some(vertex) = self.vertices.get_mut(a.get()) {
                vertex.edges.push(EdgeIdx::from(e));
            }
            if a != b {
                if let Some(vertex) = self.vertices.get_mut(b.get()) {
                    vertex.edges.push(EdgeIdx::from(e));
                }
            }
        }

        for (f, face) in self.faces.iter().enumerate() {
            let f = FaceIdx::from(f);
            for e in &face.edges {
                if let Some(edge) = self.edges.get_mut(e.get()) {
                    if edge.faces.last() != Some(&f) {
                        edge.faces.push(f);
                    }
                }
            }
        }
    }

    /// Links the loops of every edge into one radial cycle, in loop order. A
    /// loop that is alone on its edge points to itself.
    pub fn link_radial_cycles(&mut self) {
        let mut by_edge: Vec<Vec<LoopIdx>> = vec![Vec::new(); self.edges.len()];
        for (l, lp) in self.loops.iter_mut().enumerate() {
            match by_edge.get_mut(lp.edge.get()) {
                Some(group) => group.push(LoopIdx::from(l)),
                None => {
                    lp.radial_next = LoopIdx::from(l);
                    lp.radial_prev = LoopIdx::from(l);
                }
            }
        }

        for group in by_edge {
            let n = group.len();
            for (k, &l) in group.iter().enumerate() {
                let lp = &mut self.loops[l.get()];
                lp.radial_next = group[(k + 1) % n];
                lp.radial_prev = group[(k + n - 1) % n];
            }
        }
    }

    /// The radial cycle starting at `start`, following `radial_next` until it
    /// returns to `start`. Stops early if the links are broken.
    pub fn radial_cycle(&self, start: LoopIdx) -> Vec<LoopIdx> {
        let mut out = Vec::new();
        let mut current = start;
        while let Some(lp) = self.loops.get(current.get()) {
            out.push(current);
            current = lp.radial_next;
            if current == start || out.len() > self.loops.len() {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lp(edge: usize) -> BmLoop {
        BmLoop {
            edge: EdgeIdx::from(edge),
            ..Default::default()
        }
    }

    #[test]
    fn radial_cycles_follow_loop_order() {
        let mut topology = Topology {
            edges: vec![BmEdge::default(), BmEdge::default()],
            loops: vec![lp(0), lp(1), lp(0), lp(0)],
            ..Default::default()
        };
        topology.link_radial_cycles();

        let next: Vec<usize> = topology.loops.iter().map(|l| l.radial_next.get()).collect();
        let prev: Vec<usize> = topology.loops.iter().map(|l| l.radial_prev.get()).collect();
        assert_eq!(next, vec![2, 1, 3, 0]);
        assert_eq!(prev, vec![3, 1, 0, 2]);

        let cycle = topology.radial_cycle(LoopIdx::from(2));
        assert_eq!(cycle, vec![LoopIdx::from(2), LoopIdx::from(3), LoopIdx::from(0)]);
    }

    #[test]
    fn radial_cycle_stops_on_broken_links() {
        let mut topology = Topology {
            loops: vec![lp(0), lp(0)],
            ..Default::default()
        };
        topology.loops[0].radial_next = LoopIdx::from(1);
        topology.loops[1].radial_next = LoopIdx::from(1);
        assert_eq!(topology.radial_cycle(LoopIdx::from(0)).len(), 3);

        topology.loops[1].radial_next = LoopIdx::from(7);
        assert_eq!(topology.radial_cycle(LoopIdx::from(0)).len(), 2);
    }

    #[test]
    fn adjacency_ignores_dangling_references() {
        let mut topology = Topology {
            vertices: vec![BmVertex::default(); 2],
            edges: vec![BmEdge {
                vertices: [VertexIdx::from(0), VertexIdx::from(5)],
                faces: Vec::new(),
            }],
            faces: vec![BmFace {
                edges: vec![EdgeIdx::from(0), EdgeIdx::from(3), EdgeIdx::from(0)],
                ..Default::default()
            }],
            ..Default::default()
        };
        topology.rebuild_adjacency();

        assert_eq!(topology.vertices[0].edges, vec![EdgeIdx::from(0)]);
        assert!(topology.vertices[1].edges.is_empty());
        assert_eq!(topology.edges[0].faces, vec![FaceIdx::from(0)]);
    }
}
