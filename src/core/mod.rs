/// Binary buffers, buffer views and accessors of a glTF document.
pub mod buffer;

/// Polygon meshes and their builder.
pub mod mesh;

pub mod shared;

/// The BMesh adjacency model: vertices, edges, loops and faces.
pub mod topology;
