use thiserror::Error;

use crate::core::buffer::{self, AccessorReader, Element};
use crate::core::mesh::builder::{self, MeshBuilder};
use crate::core::mesh::{repeated_edge, PolygonMesh};
use crate::core::shared::{EdgeIdx, FaceIdx, LoopIdx, Vec2, Vec3, VertexIdx, UP};
use crate::core::topology::{BmEdge, BmFace, BmLoop, BmVertex, Topology, TopologyAttributes};
use crate::io::gltf::extension::{self, parse_layer, ExtMeshBmesh, CREASE, HOLES};

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("Buffer error: {0}")]
    BufferError(#[from] buffer::Err),
    #[error("The {section} section claims {count} records, more than the limit of {limit}")]
    CountOutOfRange { section: &'static str, count: usize, limit: usize },
    #[error("Invalid extension block: {0}")]
    ExtensionError(#[from] extension::Err),
    #[error("Mesh construction error: {0}")]
    MeshError(#[from] builder::Err),
}

/// Rebuilds the topology records described by `block`.
///
/// Missing or short arrays degrade to defaults instead of failing: positions
/// become zero, edge endpoints become vertex 0, every missing loop field of
/// loop `i` becomes `i`, and faces without offsets are empty. Accessors that
/// cannot be read at all, and record counts larger than the buffers could
/// plausibly describe, are reported as errors.
pub fn decode(block: &ExtMeshBmesh, reader: &AccessorReader) -> Result<Topology, Err> {
    block.validate()?;
    check_counts(block, reader.count_limit())?;
    for idx in block.accessor_indices() {
        reader.accessor(idx)?;
    }

    let mut topology = Topology {
        vertices: decode_vertices(block, reader)?,
        edges: decode_edges(block, reader)?,
        loops: decode_loops(block, reader)?,
        faces: decode_faces(block, reader)?,
        attributes: decode_attributes(block, reader)?,
    };
    topology.rebuild_adjacency();

    log::debug!(
        "Decoded topology: {} vertices, {} edges, {} loops, {} faces",
        topology.vertices.len(),
        topology.edges.len(),
        topology.loops.len(),
        topology.faces.len()
    );
    Ok(topology)
}

/// Every record count, times the wire values one record needs at least, must
/// stay within `limit`.
fn check_counts(block: &ExtMeshBmesh, limit: usize) -> Result<(), Err> {
    let sections = [
        ("vertices", block.vertices.count, 1),
        ("edges", block.edges.count, 2),
        ("loops", block.loops.count, 1),
        ("faces", block.faces.count, 1),
    ];
    for (section, count, per_record) in sections {
        if count.checked_mul(per_record).map_or(true, |n| n > limit) {
            return Err(Err::CountOutOfRange { section, count, limit });
        }
    }
    Ok(())
}

/// Reads an optional field, broadcasting a single default element to `count`.
fn read_field<E: Element>(
    reader: &AccessorReader,
    accessor: Option<usize>,
    count: usize,
) -> Result<Option<Vec<E>>, Err> {
    match accessor {
        Some(idx) => Ok(Some(reader.resolve_accessor(idx, count)?)),
        None => Ok(None),
    }
}

/// Pads or truncates `values` to `count` elements.
fn fit<T: Copy>(mut values: Vec<T>, count: usize, default: T, what: &str) -> Vec<T> {
    if values.len() < count {
        log::warn!("{}: {} values for {} records, padding with defaults", what, values.len(), count);
        values.resize(count, default);
    }
    values.truncate(count);
    values
}

fn decode_vertices(block: &ExtMeshBmesh, reader: &AccessorReader) -> Result<Vec<BmVertex>, Err> {
    let count = block.vertices.count;
    let positions = match read_field::<Vec3>(reader, block.vertices.positions, count)? {
        Some(positions) => fit(positions, count, [0.0; 3], "vertex positions"),
        None => {
            if count > 0 {
                log::warn!("Vertex positions are missing; using the origin for {} vertices", count);
            }
            vec![[0.0; 3]; count]
        }
    };
    Ok(positions
        .into_iter()
        .map(|position| BmVertex {
            position,
            edges: Vec::new(),
        })
        .collect())
}

fn decode_edges(block: &ExtMeshBmesh, reader: &AccessorReader) -> Result<Vec<BmEdge>, Err> {
    let count = block.edges.count;
    let wanted = count.checked_mul(2).ok_or(Err::CountOutOfRange {
        section: "edges",
        count,
        limit: reader.count_limit(),
    })?;
    let flat = read_field::<u32>(reader, block.edges.vertices, wanted)?.unwrap_or_default();
    if flat.len() < wanted {
        log::warn!("Edge endpoints cover {} of {} edges", flat.len() / 2, count);
    }
    let endpoint = |i: usize| VertexIdx::from(flat.get(i).copied().unwrap_or(0) as usize);
    Ok((0..count)
        .map(|i| BmEdge {
            vertices: [endpoint(2 * i), endpoint(2 * i + 1)],
            faces: Vec::new(),
        })
        .collect())
}

fn decode_loops(block: &ExtMeshBmesh, reader: &AccessorReader) -> Result<Vec<BmLoop>, Err> {
    let data = &block.loops;
    let count = data.count;
    let field = |accessor: Option<usize>, name: &str| -> Result<Vec<u32>, Err> {
        let values = read_field::<u32>(reader, accessor, count)?.unwrap_or_default();
        if values.len() < count {
            log::debug!("Loop field {} covers {} of {} loops; using loop ids for the rest", name, values.len(), count);
        }
        Ok(values)
    };
    let vertex = field(data.topology_vertex, "topology_vertex")?;
    let edge = field(data.topology_edge, "topology_edge")?;
    let face = field(data.topology_face, "topology_face")?;
    let next = field(data.topology_next, "topology_next")?;
    let prev = field(data.topology_prev, "topology_prev")?;
    let radial_next = field(data.topology_radial_next, "topology_radial_next")?;
    let radial_prev = field(data.topology_radial_prev, "topology_radial_prev")?;

    let at = |values: &[u32], i: usize| values.get(i).map_or(i, |&v| v as usize);
    Ok((0..count)
        .map(|i| BmLoop {
            vertex: VertexIdx::from(at(&vertex, i)),
            edge: EdgeIdx::from(at(&edge, i)),
            face: FaceIdx::from(at(&face, i)),
            next: LoopIdx::from(at(&next, i)),
            prev: LoopIdx::from(at(&prev, i)),
            radial_next: LoopIdx::from(at(&radial_next, i)),
            radial_prev: LoopIdx::from(at(&radial_prev, i)),
        })
        .collect())
}

fn decode_faces(block: &ExtMeshBmesh, reader: &AccessorReader) -> Result<Vec<BmFace>, Err> {
    let data = &block.faces;
    let count = data.count;
    let normals = read_field::<Vec3>(reader, data.normals, count)?.unwrap_or_default();

    let Some(offsets) = read_field::<[u32; 3]>(reader, data.offsets, count)? else {
        if count > 0 {
            log::warn!("Face offsets are missing; decoding {} empty faces", count);
        }
        return Ok((0..count)
            .map(|i| BmFace {
                normal: normals.get(i).copied().unwrap_or(UP),
                ..Default::default()
            })
            .collect());
    };
    if offsets.len() < count {
        log::warn!("Face offsets cover {} of {} faces", offsets.len(), count);
    }

    let vertices = read_field::<u32>(reader, data.vertices, 0)?.unwrap_or_default();
    let edges = read_field::<u32>(reader, data.edges, 0)?.unwrap_or_default();
    let loops = read_field::<u32>(reader, data.loops, 0)?.unwrap_or_default();
    Ok((0..count)
        .map(|i| BmFace {
            vertices: face_slice(&vertices, &offsets, i, 0).iter().map(|&v| VertexIdx::from(v as usize)).collect(),
            edges: face_slice(&edges, &offsets, i, 1).iter().map(|&e| EdgeIdx::from(e as usize)).collect(),
            loops: face_slice(&loops, &offsets, i, 2).iter().map(|&l| LoopIdx::from(l as usize)).collect(),
            normal: normals.get(i).copied().unwrap_or(UP),
        })
        .collect())
}

/// The part of `list` owned by face `i`: from its own start in column `k` of
/// `offsets` to the next face's start, or to the end for the last face.
fn face_slice<'a>(list: &'a [u32], offsets: &[[u32; 3]], i: usize, k: usize) -> &'a [u32] {
    let Some(start) = offsets.get(i).map(|o| o[k] as usize) else {
        return &[];
    };
    let end = offsets.get(i + 1).map_or(list.len(), |o| o[k] as usize);
    let start = start.min(list.len());
    let end = end.clamp(start, list.len());
    &list[start..end]
}

fn decode_attributes(block: &ExtMeshBmesh, reader: &AccessorReader) -> Result<TopologyAttributes, Err> {
    let mut out = TopologyAttributes::default();

    let vertex_count = block.vertices.count;
    if let Some(crease) = read_field::<f32>(reader, block.vertices.attributes.get(CREASE).copied(), vertex_count)? {
        out.vertex_crease = Some(fit(crease, vertex_count, 0.0, "vertex CREASE"));
    }

    let edge_count = block.edges.count;
    if let Some(crease) = read_field::<f32>(reader, block.edges.attributes.get(CREASE).copied(), edge_count)? {
        out.edge_crease = Some(fit(crease, edge_count, 0.0, "edge CREASE"));
    }

    let face_count = block.faces.count;
    if let Some(holes) = read_field::<u8>(reader, block.faces.attributes.get(HOLES).copied(), face_count)? {
        let holes = fit(holes, face_count, 0, "face HOLES");
        out.face_holes = Some(holes.into_iter().map(|h| h != 0).collect());
    }

    let loop_count = block.loops.count;
    for (name, &idx) in &block.loops.attributes {
        if let Some(layer) = parse_layer(name, "TEXCOORD_") {
            let values: Vec<Vec2> = reader.resolve_accessor(idx, loop_count)?;
            out.tex_coords.insert(layer, fit(values, loop_count, [0.0; 2], name));
        } else if let Some(layer) = parse_layer(name, "COLOR_") {
            let values: Vec<Vec3> = reader.resolve_accessor(idx, loop_count)?;
            out.colors.insert(layer, fit(values, loop_count, [0.0; 3], name));
        }
    }
    Ok(out)
}

/// Builds the output polygon mesh from decoded records.
///
/// Faces with fewer than three vertices, with a vertex id outside the vertex
/// list or walking an edge twice are dropped. Per-loop values are looked up through each face's loop
/// list; missing ones become zero.
pub fn build_mesh(topology: &Topology) -> Result<PolygonMesh, Err> {
    let num_vertices = topology.vertices.len();
    let mut builder = MeshBuilder::new();
    builder.add_vertices(topology.vertices.iter().map(|v| v.position));

    let kept: Vec<(usize, &BmFace)> = topology
        .faces
        .iter()
        .enumerate()
        .filter(|(f, face)| {
            let ids: Vec<usize> = face.vertices.iter().map(|v| v.get()).collect();
            let valid = ids.len() >= 3 && ids.iter().all(|&v| v < num_vertices) && repeated_edge(&ids).is_none();
            if !valid {
                log::debug!("Dropping face {} with {} vertices", f, face.vertices.len());
            }
            valid
        })
        .collect();
    if kept.len() < topology.faces.len() {
        log::warn!("Dropped {} degenerate faces", topology.faces.len() - kept.len());
    }

    for (_, face) in &kept {
        builder.add_face(face.vertices.iter().map(|v| v.get()).collect());
    }

    let attributes = &topology.attributes;
    for (&layer, values) in &attributes.tex_coords {
        builder.set_tex_coords(layer, per_corner(&kept, values, [0.0; 2]));
    }
    for (&layer, values) in &attributes.colors {
        builder.set_colors(layer, per_corner(&kept, values, [0.0; 3]));
    }
    if let Some(crease) = &attributes.vertex_crease {
        let mut crease = crease.clone();
        crease.resize(num_vertices, 0.0);
        builder.set_vertex_creases(crease);
    }
    if let Some(crease) = &attributes.edge_crease {
        for (edge, &value) in topology.edges.iter().zip(crease) {
            let [a, b] = edge.vertices;
            if value != 0.0 && a != b && a.get() < num_vertices && b.get() < num_vertices {
                builder.set_edge_crease(a.get(), b.get(), value);
            }
        }
    }
    if let Some(holes) = &attributes.face_holes {
        builder.set_face_holes(kept.iter().map(|&(f, _)| holes.get(f).copied().unwrap_or(false)).collect());
    }

    Ok(builder.build()?)
}

fn per_corner<T: Copy>(faces: &[(usize, &BmFace)], values: &[T], default: T) -> Vec<T> {
    faces
        .iter()
        .flat_map(|&(_, face)| {
            (0..face.vertices.len()).map(move |k| {
                face.loops
                    .get(k)
                    .and_then(|l| values.get(l.get()))
                    .copied()
                    .unwrap_or(default)
            })
        })
        .collect()
}
