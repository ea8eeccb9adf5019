use std::collections::HashMap;

use crate::core::mesh::{sorted_pair, PolygonMesh};
use crate::core::shared::{polygon_normal, EdgeIdx, FaceIdx, LoopIdx, VertexIdx, UP};

use super::{BmEdge, BmFace, BmLoop, BmVertex, Topology, TopologyAttributes};

impl Topology {
    pub fn from_mesh(mesh: &PolygonMesh) -> Self {
        extract(mesh)
    }
}

/// Builds the linked vertex, edge, loop and face records of `mesh`.
///
/// Edges are numbered in order of first appearance while walking the faces;
/// loops are numbered face by face.
pub fn extract(mesh: &PolygonMesh) -> Topology {
    let vertices = mesh
        .positions()
        .iter()
        .map(|&position| BmVertex {
            position,
            edges: Vec::new(),
        })
        .collect();

    let mut edges: Vec<BmEdge> = Vec::new();
    let mut edge_map: HashMap<[usize; 2], EdgeIdx> = HashMap::new();
    let mut loops = Vec::with_capacity(mesh.num_loops());
    let mut faces = Vec::with_capacity(mesh.num_faces());

    for (f, face_vertices) in mesh.faces().iter().enumerate() {
        let n = face_vertices.len();
        let first_loop = loops.len();
        let mut face = BmFace {
            vertices: face_vertices.iter().map(|&v| VertexIdx::from(v)).collect(),
            edges: Vec::with_capacity(n),
            loops: Vec::with_capacity(n),
            normal: polygon_normal(face_vertices.iter().map(|&v| mesh.positions()[v])).unwrap_or(UP),
        };

        for i in 0..n {
            let key = sorted_pair(face_vertices[i], face_vertices[(i + 1) % n]);
            let edge = *edge_map.entry(key).or_insert_with(|| {
                edges.push(BmEdge {
                    vertices: [VertexIdx::from(key[0]), VertexIdx::from(key[1])],
                    faces: Vec::new(),
                });
                EdgeIdx::from(edges.len() - 1)
            });

            let l = LoopIdx::from(first_loop + i);
            loops.push(BmLoop {
                vertex: VertexIdx::from(face_vertices[i]),
                edge,
                face: FaceIdx::from(f),
                next: LoopIdx::from(first_loop + (i + 1) % n),
                prev: LoopIdx::from(first_loop + (i + n - 1) % n),
                radial_next: l,
                radial_prev: l,
            });
            face.edges.push(edge);
            face.loops.push(l);
        }
        faces.push(face);
    }

    let attributes = extract_attributes(mesh, &edges);
    let mut topology = Topology {
        vertices,
        edges,
        loops,
        faces,
        attributes,
    };
    topology.rebuild_adjacency();
    topology.link_radial_cycles();

    log::debug!(
        "Extracted topology of '{}': {} vertices, {} edges, {} loops, {} faces",
        mesh.name(),
        topology.vertices.len(),
        topology.edges.len(),
        topology.loops.len(),
        topology.faces.len()
    );
    topology
}

fn extract_attributes(mesh: &PolygonMesh, edges: &[BmEdge]) -> TopologyAttributes {
    let vertex_crease = mesh
        .vertex_creases()
        .filter(|creases| creases.iter().any(|&c| c != 0.0))
        .map(<[f32]>::to_vec);

    let edge_crease = if mesh.edge_creases().is_empty() {
        None
    } else {
        let creases: Vec<f32> = edges
            .iter()
            .map(|e| mesh.edge_crease(e.vertices[0].get(), e.vertices[1].get()))
            .collect();
        // creases on vertex pairs that are not edges of any face are lost
        creases.iter().any(|&c| c != 0.0).then_some(creases)
    };

    let face_holes = mesh
        .face_holes()
        .filter(|holes| holes.iter().any(|&h| h))
        .map(<[bool]>::to_vec);

    let tex_coords = mesh
        .tex_coord_layers()
        .filter(|(_, values)| values.iter().any(|uv| *uv != [0.0; 2]))
        .map(|(n, values)| (n, values.to_vec()))
        .collect();

    let colors = mesh
        .color_layers()
        .filter(|(_, values)| values.iter().any(|c| *c != [0.0; 3]))
        .map(|(n, values)| (n, values.to_vec()))
        .collect();

    TopologyAttributes {
        vertex_crease,
        edge_crease,
        face_holes,
        tex_coords,
        colors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::builder::MeshBuilder;

    fn two_quads() -> PolygonMesh {
        let mut builder = MeshBuilder::new();
        builder.add_vertices([
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
        ]);
        builder.add_face(vec![0, 1, 4, 3]);
        builder.add_face(vec![1, 2, 5, 4]);
        builder.build().unwrap()
    }

    #[test]
    fn edges_are_shared_and_sorted() {
        let topology = extract(&two_quads());
        assert_eq!(topology.edges.len(), 7);
        assert_eq!(topology.loops.len(), 8);

        let shared = topology.faces[0].edges[1];
        assert_eq!(topology.faces[1].edges[3], shared);
        assert_eq!(topology.edges[shared.get()].vertices, [VertexIdx::from(1), VertexIdx::from(4)]);
        assert_eq!(topology.edges[shared.get()].faces, vec![FaceIdx::from(0), FaceIdx::from(1)]);
        for edge in &topology.edges {
            assert!(edge.vertices[0] < edge.vertices[1]);
        }
    }

    #[test]
    fn loops_cycle_within_faces() {
        let topology = extract(&two_quads());
        for face in &topology.faces {
            let n = face.loops.len();
            for (i, l) in face.loops.iter().enumerate() {
                let lp = topology.loops[l.get()];
                assert_eq!(lp.next, face.loops[(i + 1) % n]);
                assert_eq!(lp.prev, face.loops[(i + n - 1) % n]);
                assert_eq!(lp.vertex, face.vertices[i]);
                assert_eq!(lp.edge, face.edges[i]);
            }
        }
        assert_eq!(topology.faces[1].loops[0], LoopIdx::from(4));
    }

    #[test]
    fn vertex_edges_are_symmetric() {
        let topology = extract(&two_quads());
        for (v, vertex) in topology.vertices.iter().enumerate() {
            for e in &vertex.edges {
                assert!(topology.edges[e.get()].vertices.contains(&VertexIdx::from(v)));
            }
        }
        for (e, edge) in topology.edges.iter().enumerate() {
            for v in edge.vertices {
                assert!(topology.vertices[v.get()].edges.contains(&EdgeIdx::from(e)));
            }
        }
        assert_eq!(topology.vertices[1].edges.len(), 3);
    }

    #[test]
    fn normals_fall_back_to_up() {
        let mut builder = MeshBuilder::new();
        builder.add_vertices([[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        builder.add_face(vec![0, 1, 2]);
        builder.add_face(vec![0, 3, 1]);
        let topology = extract(&builder.build().unwrap());
        assert_eq!(topology.faces[0].normal, UP);
        assert_eq!(topology.faces[1].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn default_attributes_are_omitted() {
        let mut builder = MeshBuilder::new();
        builder.add_vertices([[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
        builder.add_face(vec![0, 1, 2, 3]);
        builder.set_tex_coords(0, vec![[0.0; 2]; 4]);
        builder.set_tex_coords(1, vec![[0.5; 2]; 4]);
        builder.set_colors(0, vec![[0.0; 3]; 4]);
        builder.set_vertex_creases(vec![0.0; 4]);
        builder.set_face_holes(vec![true]);
        builder.set_edge_crease(3, 0, 1.0);
        let topology = extract(&builder.build().unwrap());

        let attributes = &topology.attributes;
        assert_eq!(attributes.tex_coords.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert!(attributes.colors.is_empty());
        assert!(attributes.vertex_crease.is_none());
        assert_eq!(attributes.face_holes, Some(vec![true]));
        assert_eq!(attributes.edge_crease, Some(vec![0.0, 0.0, 0.0, 1.0]));
    }
}
