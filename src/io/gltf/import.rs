use crate::core::buffer::AccessorReader;
use crate::core::mesh::builder::MeshBuilder;
use crate::core::mesh::PolygonMesh;
use crate::core::shared::Vec3;

use super::document::{Primitive, MODE_TRIANGLES};
use super::extension::{ExtMeshBmesh, EXTENSION_NAME};
use super::file::GltfAsset;
use super::hooks::{BmeshExtension, PrimitiveHook};
use super::Err;

/// Reads the meshes of a glTF asset, one [`PolygonMesh`] per primitive.
///
/// Each primitive is offered to the hooks first; if none of them produces a
/// mesh, the plain triangle geometry is used. A primitive that cannot be read
/// at all is skipped with a warning.
pub struct GltfImporter {
    hooks: Vec<Box<dyn PrimitiveHook>>,
}

impl Default for GltfImporter {
    fn default() -> Self {
        Self::new(vec![Box::new(BmeshExtension::default())])
    }
}

impl GltfImporter {
    pub fn new(hooks: Vec<Box<dyn PrimitiveHook>>) -> Self {
        Self { hooks }
    }

    pub fn import(&self, asset: &GltfAsset) -> Vec<PolygonMesh> {
        let reader = asset.reader();
        let mut out = Vec::new();
        for (m, mesh) in asset.document.meshes.iter().enumerate() {
            let base_name = mesh.name.clone().unwrap_or_else(|| format!("mesh_{}", m));
            for (p, primitive) in mesh.primitives.iter().enumerate() {
                let name = if mesh.primitives.len() == 1 {
                    base_name.clone()
                } else {
                    format!("{}.{}", base_name, p)
                };
                let restored = self.hooks.iter().find_map(|h| h.on_import_primitive(primitive, &reader));
                let imported = match restored {
                    Some(mesh) => Ok(mesh),
                    None => plain_mesh(primitive, &reader),
                };
                match imported {
                    Ok(mut mesh) => {
                        mesh.set_name(&name);
                        out.push(mesh);
                    }
                    Err(e) => log::warn!("Skipping primitive {} of mesh '{}': {}", p, base_name, e),
                }
            }
        }
        out
    }
}

/// Builds a triangle mesh from `POSITION` and `indices`.
fn plain_mesh(primitive: &Primitive, reader: &AccessorReader) -> Result<PolygonMesh, Err> {
    if primitive.mode() != MODE_TRIANGLES {
        return Err(Err::UnsupportedPrimitiveMode(primitive.mode()));
    }
    let positions: Vec<Vec3> = match primitive.attributes.get("POSITION") {
        Some(&idx) => reader.read_accessor(idx)?,
        None => Vec::new(),
    };
    let indices: Vec<u32> = match primitive.indices {
        Some(idx) => reader.read_accessor(idx)?,
        None => (0..positions.len() as u32).collect(),
    };

    let mut builder = MeshBuilder::new();
    builder.add_vertices(positions);
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]];
        if a == b || b == c || a == c {
            log::debug!("Skipping degenerate triangle {:?}", triangle);
            continue;
        }
        builder.add_face(triangle.iter().map(|&i| i as usize).collect());
    }
    Ok(builder.build()?)
}

/// Record counts of one primitive, as listed by `inspect`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSummary {
    pub mesh: usize,
    pub primitive: usize,
    pub name: Option<String>,
    /// `[vertices, edges, loops, faces]` of the extension block, if present and
    /// well formed.
    pub topology: Option<[usize; 4]>,
    /// Triangles of the plain geometry.
    pub triangles: usize,
}

/// Summarizes every primitive of `asset` without decoding any topology.
pub fn summarize(asset: &GltfAsset) -> Vec<PrimitiveSummary> {
    let document = &asset.document;
    let mut out = Vec::new();
    for (m, mesh) in document.meshes.iter().enumerate() {
        for (p, primitive) in mesh.primitives.iter().enumerate() {
            let topology = primitive
                .extensions
                .get(EXTENSION_NAME)
                .and_then(|value| serde_json::from_value::<ExtMeshBmesh>(value.clone()).ok())
                .map(|block| [block.vertices.count, block.edges.count, block.loops.count, block.faces.count]);
            let index_count = primitive
                .indices
                .or_else(|| primitive.attributes.get("POSITION").copied())
                .and_then(|idx| document.accessors.get(idx))
                .map_or(0, |accessor| accessor.count);
            out.push(PrimitiveSummary {
                mesh: m,
                primitive: p,
                name: mesh.name.clone(),
                topology,
                triangles: index_count / 3,
            });
        }
    }
    out
}
