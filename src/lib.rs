// lib.rs

/// Contains the interface between `PolygonMesh` objects and 3D geometry files
/// such as obj and gltf.
pub mod io;

/// Writes a topology into glTF buffers as an `EXT_mesh_bmesh` block.
pub mod encode;

/// Reads an `EXT_mesh_bmesh` block back into a topology and a polygon mesh.
pub mod decode;

/// Contains the shared definitions, native objects, and the buffer.
pub mod core;

/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::core::buffer::{AccessorReader, BufferArena, SparsePolicy};
    pub use crate::core::mesh::{builder::MeshBuilder, PolygonMesh};
    pub use crate::core::shared::{EdgeIdx, FaceIdx, LoopIdx, VertexIdx};
    pub use crate::core::topology::{extract, Topology};
    pub use crate::decode::{self, build_mesh, decode};
    pub use crate::encode::{self, encode};
    pub use crate::io::gltf::{
        BmeshExtension, ExportOptions, ExtMeshBmesh, GltfAsset, GltfExporter, GltfImporter, PrimitiveHook,
        EXTENSION_NAME,
    };
}
