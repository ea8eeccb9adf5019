pub mod builder;

use std::collections::BTreeMap;

use crate::core::shared::{Vec2, Vec3};

/// Represents a polygon mesh snapshot.
/// It consists of vertex positions and a list of faces, where each face is an
/// ordered cycle of at least three vertex indices. Per-corner ("loop") data is
/// stored in face order: the corners of face 0 first, then those of face 1, and
/// so on. A [`PolygonMesh`] is only ever created through
/// [`MeshBuilder`](builder::MeshBuilder), which checks these invariants.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonMesh {
    pub(crate) name: String,
    pub(crate) positions: Vec<Vec3>,
    pub(crate) faces: Vec<Vec<usize>>,

    /// `TEXCOORD_n` layers keyed by `n`, one value per loop.
    pub(crate) tex_coords: BTreeMap<usize, Vec<Vec2>>,
    /// `COLOR_n` layers keyed by `n`, one value per loop.
    pub(crate) colors: BTreeMap<usize, Vec<Vec3>>,

    // subdivision surface data
    pub(crate) vertex_creases: Option<Vec<f32>>,
    pub(crate) edge_creases: BTreeMap<[usize; 2], f32>,
    pub(crate) face_holes: Option<Vec<bool>>,
}

impl PolygonMesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Total number of face corners.
    pub fn num_loops(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }

    pub fn tex_coords(&self, layer: usize) -> Option<&[Vec2]> {
        self.tex_coords.get(&layer).map(Vec::as_slice)
    }

    pub fn tex_coord_layers(&self) -> impl Iterator<Item = (usize, &[Vec2])> {
        self.tex_coords.iter().map(|(n, v)| (*n, v.as_slice()))
    }

    pub fn colors(&self, layer: usize) -> Option<&[Vec3]> {
        self.colors.get(&layer).map(Vec::as_slice)
    }

    pub fn color_layers(&self) -> impl Iterator<Item = (usize, &[Vec3])> {
        self.colors.iter().map(|(n, v)| (*n, v.as_slice()))
    }

    pub fn vertex_creases(&self) -> Option<&[f32]> {
        self.vertex_creases.as_deref()
    }

    /// Crease of the edge between `a` and `b`, in either order.
    pub fn edge_crease(&self, a: usize, b: usize) -> f32 {
        self.edge_creases.get(&sorted_pair(a, b)).copied().unwrap_or(0.0)
    }

    /// Non-zero edge creases keyed by sorted vertex pair.
    pub fn edge_creases(&self) -> &BTreeMap<[usize; 2], f32> {
        &self.edge_creases
    }

    pub fn face_holes(&self) -> Option<&[bool]> {
        self.face_holes.as_deref()
    }

    /// Returns true if any face has four or more corners.
    pub fn has_ngons(&self) -> bool {
        self.faces.iter().any(|f| f.len() > 3)
    }

    /// Fan triangulation of every face, used for the plain glTF geometry that
    /// accompanies the topology extension.
    pub fn triangulate(&self) -> Vec<[usize; 3]> {
        let mut out = Vec::with_capacity(self.num_loops().saturating_sub(2 * self.faces.len()));
        for face in &self.faces {
            for i in 1..face.len() - 1 {
                out.push([face[0], face[i], face[i + 1]]);
            }
        }
        out
    }
}

pub(crate) fn sorted_pair(a: usize, b: usize) -> [usize; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

/// The first edge that `face` walks more than once, in either direction.
pub(crate) fn repeated_edge(face: &[usize]) -> Option<[usize; 2]> {
    let n = face.len();
    let mut edges: Vec<[usize; 2]> = (0..n).map(|i| sorted_pair(face[i], face[(i + 1) % n])).collect();
    edges.sort_unstable();
    edges.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
}

#[cfg(test)]
mod tests {
    use super::builder::MeshBuilder;

    #[test]
    fn triangulate_quad_and_pentagon() {
        let mut builder = MeshBuilder::new();
        builder.add_vertices((0..6).map(|i| [i as f32, 0.0, 0.0]));
        builder.add_face(vec![0, 1, 2, 3]);
        builder.add_face(vec![1, 2, 3, 4, 5]);
        let mesh = builder.build().unwrap();

        assert!(mesh.has_ngons());
        assert_eq!(mesh.num_loops(), 9);
        assert_eq!(
            mesh.triangulate(),
            vec![[0, 1, 2], [0, 2, 3], [1, 2, 3], [1, 3, 4], [1, 4, 5]]
        );
    }

    #[test]
    fn repeated_edges() {
        use super::repeated_edge;
        assert_eq!(repeated_edge(&[0, 1, 2, 3]), None);
        assert_eq!(repeated_edge(&[0, 1, 2, 1]), Some([0, 1]));
        assert_eq!(repeated_edge(&[0, 1, 0]), Some([0, 1]));
        // a vertex visited twice without reusing an edge is fine
        assert_eq!(repeated_edge(&[0, 1, 2, 0, 3, 4]), None);
    }

    #[test]
    fn edge_crease_is_unordered() {
        let mut builder = MeshBuilder::new();
        builder.add_vertices([[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        builder.add_face(vec![0, 1, 2]);
        builder.set_edge_crease(2, 1, 0.5);
        let mesh = builder.build().unwrap();

        assert_eq!(mesh.edge_crease(1, 2), 0.5);
        assert_eq!(mesh.edge_crease(2, 1), 0.5);
        assert_eq!(mesh.edge_crease(0, 1), 0.0);
        assert!(!mesh.has_ngons());
    }
}
