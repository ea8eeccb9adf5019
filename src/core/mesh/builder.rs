use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::shared::{Vec2, Vec3};
use super::{repeated_edge, sorted_pair, PolygonMesh};

/// Collects vertex, face and attribute data and validates it into a
/// [`PolygonMesh`].
#[derive(Debug, Default)]
pub struct MeshBuilder {
    name: String,
    positions: Vec<Vec3>,
    faces: Vec<Vec<usize>>,
    tex_coords: BTreeMap<usize, Vec<Vec2>>,
    colors: BTreeMap<usize, Vec<Vec3>>,
    vertex_creases: Option<Vec<f32>>,
    edge_creases: BTreeMap<[usize; 2], f32>,
    face_holes: Option<Vec<bool>>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    /// Adds a vertex and returns its index.
    pub fn add_vertex(&mut self, position: Vec3) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    pub fn add_vertices(&mut self, positions: impl IntoIterator<Item = Vec3>) {
        self.positions.extend(positions);
    }

    /// Adds a face given as an ordered cycle of vertex indices and returns its
    /// index. The loops of the face follow those of all previously added faces.
    pub fn add_face(&mut self, vertices: Vec<usize>) -> usize {
        self.faces.push(vertices);
        self.faces.len() - 1
    }

    /// Sets the `TEXCOORD_<layer>` values, one per loop in face order.
    pub fn set_tex_coords(&mut self, layer: usize, values: Vec<Vec2>) {
        self.tex_coords.insert(layer, values);
    }

    /// Sets the `COLOR_<layer>` values, one per loop in face order.
    pub fn set_colors(&mut self, layer: usize, values: Vec<Vec3>) {
        self.colors.insert(layer, values);
    }

    pub fn set_vertex_creases(&mut self, values: Vec<f32>) {
        self.vertex_creases = Some(values);
    }

    /// Sets the crease of the edge between `a` and `b`. A zero crease removes
    /// the entry.
    pub fn set_edge_crease(&mut self, a: usize, b: usize, value: f32) {
        let key = sorted_pair(a, b);
        if value == 0.0 {
            self.edge_creases.remove(&key);
        } else {
            self.edge_creases.insert(key, value);
        }
    }

    pub fn set_face_holes(&mut self, values: Vec<bool>) {
        self.face_holes = Some(values);
    }

    pub fn build(self) -> Result<PolygonMesh, Err> {
        self.check_faces()?;
        self.check_attributes()?;

        let Self {
            name,
            positions,
            faces,
            tex_coords,
            colors,
            vertex_creases,
            edge_creases,
            face_holes,
        } = self;

        Ok(PolygonMesh {
            name,
            positions,
            faces,
            tex_coords,
            colors,
            vertex_creases,
            edge_creases,
            face_holes,
        })
    }

    fn check_faces(&self) -> Result<(), Err> {
        let num_vertices = self.positions.len();
        for (face, vertices) in self.faces.iter().enumerate() {
            if vertices.len() < 3 {
                return Err(Err::FaceTooSmall { face, len: vertices.len() });
            }
            if let Some(&vertex) = vertices.iter().find(|&&v| v >= num_vertices) {
                return Err(Err::VertexOutOfRange { face, vertex, num_vertices });
            }
            if let Some(edge) = repeated_edge(vertices) {
                return Err(Err::RepeatedEdge { face, edge });
            }
        }
        Ok(())
    }

    fn check_attributes(&self) -> Result<(), Err> {
        let num_loops: usize = self.faces.iter().map(Vec::len).sum();
        for (layer, values) in &self.tex_coords {
            if values.len() != num_loops {
                return Err(Err::LoopLayerLength {
                    name: format!("TEXCOORD_{}", layer),
                    expected: num_loops,
                    found: values.len(),
                });
            }
        }
        for (layer, values) in &self.colors {
            if values.len() != num_loops {
                return Err(Err::LoopLayerLength {
                    name: format!("COLOR_{}", layer),
                    expected: num_loops,
                    found: values.len(),
                });
            }
        }
        if let Some(creases) = &self.vertex_creases {
            if creases.len() != self.positions.len() {
                return Err(Err::VertexLayerLength {
                    expected: self.positions.len(),
                    found: creases.len(),
                });
            }
        }
        if let Some(holes) = &self.face_holes {
            if holes.len() != self.faces.len() {
                return Err(Err::FaceLayerLength {
                    expected: self.faces.len(),
                    found: holes.len(),
                });
            }
        }
        for &[a, b] in self.edge_creases.keys() {
            if a == b || b >= self.positions.len() {
                return Err(Err::InvalidCreaseEdge(a, b));
            }
        }
        Ok(())
    }
}

#[remain::sorted]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Err {
    #[error("Face attribute layer has {found} values, expected {expected}")]
    FaceLayerLength { expected: usize, found: usize },
    #[error("Face {face} has {len} vertices; at least 3 are required")]
    FaceTooSmall { face: usize, len: usize },
    #[error("Crease set on invalid edge ({0}, {1})")]
    InvalidCreaseEdge(usize, usize),
    #[error("Loop attribute {name} has {found} values, expected {expected}")]
    LoopLayerLength { name: String, expected: usize, found: usize },
    #[error("Face {face} walks edge {edge:?} more than once")]
    RepeatedEdge { face: usize, edge: [usize; 2] },
    #[error("Vertex attribute layer has {found} values, expected {expected}")]
    VertexLayerLength { expected: usize, found: usize },
    #[error("Face {face} references vertex {vertex}, but the mesh has {num_vertices} vertices")]
    VertexOutOfRange { face: usize, vertex: usize, num_vertices: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshBuilder {
        let mut builder = MeshBuilder::new();
        builder.add_vertices([[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        builder
    }

    #[test]
    fn rejects_small_face() {
        let mut builder = triangle();
        builder.add_face(vec![0, 1]);
        assert_eq!(builder.build(), Err(Err::FaceTooSmall { face: 0, len: 2 }));
    }

    #[test]
    fn rejects_out_of_range_vertex() {
        let mut builder = triangle();
        builder.add_face(vec![0, 1, 3]);
        assert_eq!(
            builder.build(),
            Err(Err::VertexOutOfRange { face: 0, vertex: 3, num_vertices: 3 })
        );
    }

    #[test]
    fn rejects_repeated_edge() {
        let mut builder = triangle();
        builder.add_face(vec![0, 1, 2, 1]);
        assert_eq!(builder.build(), Err(Err::RepeatedEdge { face: 0, edge: [0, 1] }));
    }

    #[test]
    fn rejects_short_loop_layer() {
        let mut builder = triangle();
        builder.add_face(vec![0, 1, 2]);
        builder.set_tex_coords(0, vec![[0.0, 0.0]; 2]);
        assert!(matches!(builder.build(), Err(Err::LoopLayerLength { expected: 3, found: 2, .. })));
    }

    #[test]
    fn rejects_crease_on_missing_vertex() {
        let mut builder = triangle();
        builder.add_face(vec![0, 1, 2]);
        builder.set_edge_crease(0, 5, 1.0);
        assert_eq!(builder.build(), Err(Err::InvalidCreaseEdge(0, 5)));
    }

    #[test]
    fn zero_crease_clears_entry() {
        let mut builder = triangle();
        builder.add_face(vec![0, 1, 2]);
        builder.set_edge_crease(0, 1, 1.0);
        builder.set_edge_crease(1, 0, 0.0);
        let mesh = builder.build().unwrap();
        assert!(mesh.edge_creases().is_empty());
    }
}
