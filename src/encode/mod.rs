use thiserror::Error;

use crate::core::buffer::{self, BufferArena, Element, SparsePolicy};
use crate::core::shared::{Vec3, UP};
use crate::core::topology::{BmLoop, Topology};
use crate::io::gltf::extension::{
    color_name, tex_coord_name, EdgeData, ExtMeshBmesh, FaceData, LoopData, VertexData, CREASE, HOLES,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Arrays shorter than this are always written dense.
    pub sparse_min_len: usize,
    /// Arrays with a smaller fraction of non-default values are written sparse.
    pub sparse_max_density: f32,
    /// Leave meshes made only of triangles without the extension.
    pub skip_triangle_meshes: bool,
}

impl Default for Config {
    fn default() -> Self {
        let policy = SparsePolicy::default();
        Self {
            sparse_min_len: policy.min_len,
            sparse_max_density: policy.max_density,
            skip_triangle_meshes: true,
        }
    }
}

impl Config {
    pub fn sparse_policy(&self) -> SparsePolicy {
        SparsePolicy {
            min_len: self.sparse_min_len,
            max_density: self.sparse_max_density,
        }
    }
}

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("Buffer error: {0}")]
    BufferError(#[from] buffer::Err),
}

/// Writes `topology` into `arena` and returns the extension block describing
/// it. Empty arrays produce no accessor, so an empty topology only carries
/// zero counts.
pub fn encode(topology: &Topology, arena: &mut BufferArena, cfg: &Config) -> Result<ExtMeshBmesh, Err> {
    let mut writer = Writer {
        arena,
        policy: cfg.sparse_policy(),
    };

    let out = ExtMeshBmesh {
        vertices: encode_vertices(topology, &mut writer)?,
        edges: encode_edges(topology, &mut writer)?,
        loops: encode_loops(topology, &mut writer)?,
        faces: encode_faces(topology, &mut writer)?,
    };

    log::debug!(
        "Encoded topology: {} vertices, {} edges, {} loops, {} faces, {} accessors in total",
        out.vertices.count,
        out.edges.count,
        out.loops.count,
        out.faces.count,
        writer.arena.accessors().len()
    );
    Ok(out)
}

struct Writer<'a> {
    arena: &'a mut BufferArena,
    policy: SparsePolicy,
}

impl Writer<'_> {
    fn dense<E: Element>(&mut self, values: &[E]) -> Option<usize> {
        (!values.is_empty()).then(|| self.arena.create_dense_accessor(values))
    }

    fn sparse<E: Element>(&mut self, values: &[E]) -> Result<Option<usize>, buffer::Err> {
        if values.is_empty() {
            return Ok(None);
        }
        self.arena.create_sparse_accessor(values).map(Some)
    }

    fn optimized<E: Element>(&mut self, values: &[E]) -> Result<Option<usize>, buffer::Err> {
        if values.is_empty() {
            return Ok(None);
        }
        let policy = self.policy;
        self.arena.create_optimized_accessor(values, &policy).map(Some)
    }
}

/// Converts an index to its uint32 wire form.
fn wire<T: Copy + Into<usize>>(idx: T) -> Result<u32, buffer::Err> {
    buffer::wire_index(idx.into())
}

fn flatten<'a, T, I>(lists: I) -> Result<Vec<u32>, buffer::Err>
where
    T: Copy + Into<usize> + 'a,
    I: IntoIterator<Item = &'a [T]>,
{
    lists.into_iter().flatten().map(|&i| wire(i)).collect()
}

fn encode_vertices(topology: &Topology, writer: &mut Writer) -> Result<VertexData, Err> {
    let positions: Vec<Vec3> = topology.vertices.iter().map(|v| v.position).collect();
    let edges = flatten(topology.vertices.iter().map(|v| v.edges.as_slice()))?;

    let mut data = VertexData {
        count: topology.vertices.len(),
        positions: writer.dense(&positions),
        edges: writer.dense(&edges),
        ..Default::default()
    };
    if let Some(crease) = &topology.attributes.vertex_crease {
        if let Some(idx) = writer.optimized(crease)? {
            data.attributes.insert(CREASE.to_owned(), idx);
        }
    }
    Ok(data)
}

fn encode_edges(topology: &Topology, writer: &mut Writer) -> Result<EdgeData, Err> {
    let vertices = flatten(topology.edges.iter().map(|e| e.vertices.as_slice()))?;
    let faces = flatten(topology.edges.iter().map(|e| e.faces.as_slice()))?;

    let mut data = EdgeData {
        count: topology.edges.len(),
        vertices: writer.dense(&vertices),
        faces: writer.dense(&faces),
        ..Default::default()
    };
    if let Some(crease) = &topology.attributes.edge_crease {
        if let Some(idx) = writer.optimized(crease)? {
            data.attributes.insert(CREASE.to_owned(), idx);
        }
    }
    Ok(data)
}

fn encode_loops(topology: &Topology, writer: &mut Writer) -> Result<LoopData, Err> {
    let loops = &topology.loops;
    let field = |f: fn(&BmLoop) -> usize| -> Result<Vec<u32>, buffer::Err> {
        loops.iter().map(|l| wire(f(l))).collect()
    };
    let vertex = field(|l| l.vertex.get())?;
    let edge = field(|l| l.edge.get())?;
    let face = field(|l| l.face.get())?;
    let next = field(|l| l.next.get())?;
    let prev = field(|l| l.prev.get())?;
    let radial_next = field(|l| l.radial_next.get())?;
    let radial_prev = field(|l| l.radial_prev.get())?;

    let mut data = LoopData {
        count: loops.len(),
        topology_vertex: writer.optimized(&vertex)?,
        topology_edge: writer.optimized(&edge)?,
        topology_face: writer.optimized(&face)?,
        topology_next: writer.optimized(&next)?,
        topology_prev: writer.optimized(&prev)?,
        topology_radial_next: writer.optimized(&radial_next)?,
        topology_radial_prev: writer.optimized(&radial_prev)?,
        ..Default::default()
    };
    for (&layer, values) in &topology.attributes.tex_coords {
        if let Some(idx) = writer.sparse(values)? {
            data.attributes.insert(tex_coord_name(layer), idx);
        }
    }
    for (&layer, values) in &topology.attributes.colors {
        if let Some(idx) = writer.sparse(values)? {
            data.attributes.insert(color_name(layer), idx);
        }
    }
    Ok(data)
}

fn encode_faces(topology: &Topology, writer: &mut Writer) -> Result<FaceData, Err> {
    let faces = &topology.faces;
    let vertices = flatten(faces.iter().map(|f| f.vertices.as_slice()))?;
    let edges = flatten(faces.iter().map(|f| f.edges.as_slice()))?;
    let loops = flatten(faces.iter().map(|f| f.loops.as_slice()))?;

    let mut offsets = Vec::with_capacity(faces.len());
    let mut start = [0usize; 3];
    for face in faces {
        offsets.push([wire(start[0])?, wire(start[1])?, wire(start[2])?]);
        start[0] += face.vertices.len();
        start[1] += face.edges.len();
        start[2] += face.loops.len();
    }

    let normals: Vec<Vec3> = faces
        .iter()
        .map(|f| if f.normal.iter().all(|c| c.is_finite()) { f.normal } else { UP })
        .collect();

    let mut data = FaceData {
        count: faces.len(),
        vertices: writer.dense(&vertices),
        offsets: writer.dense(&offsets),
        edges: writer.dense(&edges),
        loops: writer.dense(&loops),
        normals: writer.dense(&normals),
        ..Default::default()
    };
    if let Some(holes) = &topology.attributes.face_holes {
        let holes: Vec<u8> = holes.iter().map(|&h| u8::from(h)).collect();
        if let Some(idx) = writer.optimized(&holes)? {
            data.attributes.insert(HOLES.to_owned(), idx);
        }
    }
    Ok(data)
}
