pub mod document;
pub mod export;
pub mod extension;
pub mod file;
pub mod hooks;
pub mod import;

use thiserror::Error;

use crate::core::buffer;
use crate::core::mesh::builder;
use crate::{decode, encode};

pub use export::{ExportOptions, GltfExporter};
pub use extension::{ExtMeshBmesh, EXTENSION_NAME};
pub use file::GltfAsset;
pub use hooks::{BmeshExtension, ExportContext, ExtensionDeclaration, PrimitiveHook};
pub use import::{summarize, GltfImporter, PrimitiveSummary};

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Buffer error: {0}")]
    BufferError(#[from] buffer::Err),
    #[error("Topology decoding error: {0}")]
    DecodeError(#[from] decode::Err),
    #[error("Topology encoding error: {0}")]
    EncodeError(#[from] encode::Err),
    #[error("Invalid extension block: {0}")]
    ExtensionError(#[from] extension::Err),
    #[error("GLB error: {0}")]
    GlbError(#[from] gltf::Error),
    #[error("GLB of {0} bytes exceeds the 32-bit length field")]
    GlbTooLarge(usize),
    #[error("Invalid buffer uri: {0}")]
    InvalidUri(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Mesh construction error: {0}")]
    MeshError(#[from] builder::Err),
    #[error("Unsupported primitive mode {0}; only triangles are read")]
    UnsupportedPrimitiveMode(u32),
}
