use crate::core::buffer;
use crate::core::mesh::PolygonMesh;
use crate::encode;

use super::document::{Asset, Buffer, GltfDocument, Mesh, Node, Primitive, Scene};
use super::file::GltfAsset;
use super::hooks::{BmeshExtension, ExportContext, PrimitiveHook};
use super::Err;

pub struct ExportOptions {
    /// Written to `asset.generator`.
    pub generator: String,
    /// Called for every exported mesh, in order.
    pub hooks: Vec<Box<dyn PrimitiveHook>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::with_config(encode::Config::default())
    }
}

impl ExportOptions {
    /// Options running only the `EXT_mesh_bmesh` hook with `cfg`.
    pub fn with_config(cfg: encode::Config) -> Self {
        Self {
            generator: concat!("bmesh-gltf ", env!("CARGO_PKG_VERSION")).to_owned(),
            hooks: vec![Box::new(BmeshExtension::new(cfg))],
        }
    }
}

/// Writes polygon meshes as a glTF asset: one node and one triangulated
/// primitive per mesh, extended by the configured hooks.
#[derive(Default)]
pub struct GltfExporter {
    options: ExportOptions,
}

impl GltfExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn export(&self, meshes: &[PolygonMesh]) -> Result<GltfAsset, Err> {
        let mut ctx = ExportContext::new();
        let mut document = GltfDocument {
            asset: Asset {
                generator: Some(self.options.generator.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        for mesh in meshes {
            let mut primitive = plain_primitive(mesh, &mut ctx)?;
            for hook in &self.options.hooks {
                hook.on_gather_mesh_primitive(mesh, &mut primitive, &mut ctx);
            }
            document.nodes.push(Node {
                name: non_empty(mesh.name()),
                mesh: Some(document.meshes.len()),
                ..Default::default()
            });
            document.meshes.push(Mesh {
                name: non_empty(mesh.name()),
                primitives: vec![primitive],
                ..Default::default()
            });
        }
        document.scenes.push(Scene {
            nodes: (0..document.nodes.len()).collect(),
            ..Default::default()
        });
        document.scene = Some(0);

        for name in ctx.extensions_used() {
            document.use_extension(name);
        }
        for declaration in self.options.hooks.iter().filter_map(|h| h.on_gather_document_extensions()) {
            if declaration.required && ctx.extensions_used().contains(&declaration.name) {
                document.require_extension(&declaration.name);
            }
        }

        let (bin, buffer_views, accessors) = ctx.arena.into_parts();
        document.accessors = accessors;
        document.buffer_views = buffer_views;
        let buffers = if bin.is_empty() {
            Vec::new()
        } else {
            document.buffers.push(Buffer {
                byte_length: bin.len(),
                ..Default::default()
            });
            vec![bin]
        };

        log::info!(
            "Exported {} meshes ({} accessors, {} buffer bytes)",
            document.meshes.len(),
            document.accessors.len(),
            buffers.first().map_or(0, Vec::len)
        );
        Ok(GltfAsset { document, buffers })
    }
}

fn non_empty(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_owned())
}

/// The fan-triangulated geometry that any glTF reader understands.
fn plain_primitive(mesh: &PolygonMesh, ctx: &mut ExportContext) -> Result<Primitive, Err> {
    let mut primitive = Primitive::default();
    if mesh.positions().is_empty() {
        return Ok(primitive);
    }
    let position = ctx.arena.create_dense_accessor(mesh.positions());
    primitive.attributes.insert("POSITION".to_owned(), position);

    let indices = mesh
        .triangulate()
        .into_iter()
        .flatten()
        .map(buffer::wire_index)
        .collect::<Result<Vec<u32>, _>>()?;
    if !indices.is_empty() {
        primitive.indices = Some(ctx.arena.create_dense_accessor(&indices));
    }
    Ok(primitive)
}
