use serde::Deserialize;

use crate::core::buffer::{AccessorReader, BufferArena};
use crate::core::mesh::PolygonMesh;
use crate::core::topology::Topology;
use crate::decode;
use crate::encode;

use super::document::{push_unique, Primitive};
use super::extension::{ExtMeshBmesh, EXTENSION_NAME};
use super::Err;

/// What an extension tells the exporter about itself once per document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDeclaration {
    pub name: String,
    pub required: bool,
    /// Top-level keys of the extension block.
    pub properties: Vec<String>,
}

/// Shared state of one document export. Hooks write their binary data into
/// `arena` and record the extensions they actually attached.
#[derive(Debug, Default)]
pub struct ExportContext {
    pub arena: BufferArena,
    extensions_used: Vec<String>,
}

impl ExportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `name` is used by the document. Repeated calls are
    /// ignored.
    pub fn use_extension(&mut self, name: &str) {
        push_unique(&mut self.extensions_used, name);
    }

    pub fn extensions_used(&self) -> &[String] {
        &self.extensions_used
    }
}

/// Per-primitive extension points of the glTF exporter and importer.
///
/// Hooks never fail the surrounding operation: a hook that cannot handle a
/// primitive leaves it untouched (export) or returns `None` (import).
pub trait PrimitiveHook {
    /// Called once per exported mesh, after its plain primitive was built.
    fn on_gather_mesh_primitive(&self, mesh: &PolygonMesh, primitive: &mut Primitive, ctx: &mut ExportContext);

    /// Called once per exported document.
    fn on_gather_document_extensions(&self) -> Option<ExtensionDeclaration>;

    /// Called once per imported primitive. A returned mesh replaces the plain
    /// triangle geometry of the primitive.
    fn on_import_primitive(&self, primitive: &Primitive, reader: &AccessorReader) -> Option<PolygonMesh>;
}

/// Attaches `EXT_mesh_bmesh` to exported primitives and rebuilds polygon
/// meshes from it on import.
#[derive(Debug, Clone, Default)]
pub struct BmeshExtension {
    pub cfg: encode::Config,
}

impl BmeshExtension {
    pub fn new(cfg: encode::Config) -> Self {
        Self { cfg }
    }

    fn export(&self, mesh: &PolygonMesh, arena: &mut BufferArena) -> Result<serde_json::Value, Err> {
        let topology = Topology::from_mesh(mesh);
        let block = encode::encode(&topology, arena, &self.cfg)?;
        Ok(serde_json::to_value(block)?)
    }

    fn import(&self, value: &serde_json::Value, reader: &AccessorReader) -> Result<PolygonMesh, Err> {
        let block = ExtMeshBmesh::deserialize(value)?;
        let topology = decode::decode(&block, reader)?;
        Ok(decode::build_mesh(&topology)?)
    }
}

impl PrimitiveHook for BmeshExtension {
    fn on_gather_mesh_primitive(&self, mesh: &PolygonMesh, primitive: &mut Primitive, ctx: &mut ExportContext) {
        if self.cfg.skip_triangle_meshes && !mesh.has_ngons() {
            log::debug!("Mesh '{}' has only triangles; skipping {}", mesh.name(), EXTENSION_NAME);
            return;
        }

        let checkpoint = ctx.arena.checkpoint();
        match self.export(mesh, &mut ctx.arena) {
            Ok(block) => {
                primitive.extensions.insert(EXTENSION_NAME.to_owned(), block);
                ctx.use_extension(EXTENSION_NAME);
                log::info!(
                    "Attached {} to mesh '{}' ({} vertices, {} faces)",
                    EXTENSION_NAME,
                    mesh.name(),
                    mesh.num_vertices(),
                    mesh.num_faces()
                );
            }
            Err(e) => {
                ctx.arena.rollback(checkpoint);
                log::warn!("Failed to export {} for mesh '{}': {}", EXTENSION_NAME, mesh.name(), e);
            }
        }
    }

    fn on_gather_document_extensions(&self) -> Option<ExtensionDeclaration> {
        Some(ExtensionDeclaration {
            name: EXTENSION_NAME.to_owned(),
            required: false,
            properties: ["vertices", "edges", "loops", "faces"].map(String::from).to_vec(),
        })
    }

    fn on_import_primitive(&self, primitive: &Primitive, reader: &AccessorReader) -> Option<PolygonMesh> {
        let value = primitive.extensions.get(EXTENSION_NAME)?;
        match self.import(value, reader) {
            Ok(mesh) => {
                log::info!(
                    "Restored {} vertices and {} faces from {}",
                    mesh.num_vertices(),
                    mesh.num_faces(),
                    EXTENSION_NAME
                );
                Some(mesh)
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", EXTENSION_NAME, e);
                None
            }
        }
    }
}
