/// glTF documents, the `EXT_mesh_bmesh` extension and the exporter/importer
/// hooks that carry it.
pub mod gltf;

/// Wavefront OBJ input and output.
pub mod obj;
