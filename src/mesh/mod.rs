//! Mesh payload parsing and buffer consolidation
//!
//! Mesh files are never stored in an archive directly. Their vertex and
//! index data is merged into a handful of shared buffers keyed by vertex
//! format, and the archive keeps a mesh reference pointing into them.

mod consolidator;
mod payload;

pub use consolidator::{
    index_buffer_name, vertex_buffer_name, BufferRecord, Consolidator, FlushedBuffer, MeshBuffer,
    MeshRef,
};
pub use payload::{build_mesh_payload, MeshHeader, MeshPayload};
