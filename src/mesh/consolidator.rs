use crate::archive::EntryType;
use crate::config::ConsolidatorConfig;
use crate::error::{Result, XipError};
use crate::mesh::payload::MeshPayload;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest per-buffer index position a mesh key can carry (24 bits)
const MAX_KEY_INDEX: usize = 1 << 24;

/// Shared vertex/index storage for meshes with the same vertex format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshBuffer {
    format_tag: u32,
    vertex_stride: u32,
    vertices: Vec<u8>,
    vertex_count: usize,
    indices: Vec<u16>,
}

impl MeshBuffer {
    fn new(format_tag: u32, vertex_stride: u32) -> Self {
        Self {
            format_tag,
            vertex_stride,
            vertices: Vec::new(),
            vertex_count: 0,
            indices: Vec::new(),
        }
    }

    pub fn format_tag(&self) -> u32 {
        self.format_tag
    }

    /// Bytes per vertex, fixed when the buffer is allocated
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }

    pub fn vertices(&self) -> &[u8] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// `~<n>.ib` record: every index as a little-endian u16
    pub fn index_buffer_bytes(&self) -> Vec<u8> {
        self.indices.iter().flat_map(|i| i.to_le_bytes()).collect()
    }

    /// `~<n>.vb` record: i32 vertex count, u32 format tag, raw vertex bytes
    pub fn vertex_buffer_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.vertices.len());
        out.extend_from_slice(&(self.vertex_count as i32).to_le_bytes());
        out.extend_from_slice(&self.format_tag.to_le_bytes());
        out.extend_from_slice(&self.vertices);
        out
    }
}

/// Result of placing one mesh into a shared buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRef {
    /// `(buffer_index << 24) | first index position within the buffer`
    pub key: u32,
    /// Triangle count, `index_count / 3`
    pub primitive_count: u32,
    pub buffer_index: usize,
}

/// One generated buffer file, named and typed for inclusion in an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferRecord {
    pub name: String,
    pub kind: EntryType,
    pub data: Vec<u8>,
}

/// Paths written by [`Consolidator::flush_buffers`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushedBuffer {
    pub index: usize,
    pub ib_path: PathBuf,
    pub vb_path: PathBuf,
}

pub fn index_buffer_name(index: usize) -> String {
    format!("~{}.ib", index)
}

pub fn vertex_buffer_name(index: usize) -> String {
    format!("~{}.vb", index)
}

/// Merges per-mesh vertex and index data into capacity-bounded buffers
///
/// Each build owns one consolidator. Insertion order matters: buffers are
/// chosen first-fit and mesh keys encode positions in the merged streams,
/// so meshes must be added one at a time from a single thread.
#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    config: ConsolidatorConfig,
    buffers: Vec<MeshBuffer>,
}

impl Consolidator {
    pub fn new(config: ConsolidatorConfig) -> Self {
        Self {
            config,
            buffers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ConsolidatorConfig {
        &self.config
    }

    pub fn buffers(&self) -> &[MeshBuffer] {
        &self.buffers
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Pick the first buffer with a matching format and stride and room for
    /// `incoming_vertices`, allocating a new one if none fits
    pub fn select_buffer(
        &mut self,
        format_tag: u32,
        vertex_stride: u32,
        incoming_vertices: usize,
    ) -> Result<usize> {
        if incoming_vertices > self.config.max_vertices {
            return Err(XipError::Overflow {
                what: "mesh vertex count",
                value: incoming_vertices as u64,
            });
        }

        let found = self.buffers.iter().position(|buffer| {
            buffer.format_tag == format_tag
                && buffer.vertex_stride == vertex_stride
                && buffer.vertex_count + incoming_vertices <= self.config.max_vertices
        });
        if let Some(index) = found {
            return Ok(index);
        }

        if self.buffers.len() >= self.config.max_buffers {
            return Err(XipError::TooManyBuffers {
                limit: self.config.max_buffers,
            });
        }

        self.buffers.push(MeshBuffer::new(format_tag, vertex_stride));
        debug!(
            buffer = self.buffers.len() - 1,
            format_tag,
            vertex_stride,
            "allocated mesh buffer"
        );
        Ok(self.buffers.len() - 1)
    }

    /// Append a mesh payload to a shared buffer and rebase its indices
    pub fn add_mesh(&mut self, raw: &[u8]) -> Result<MeshRef> {
        let mesh = MeshPayload::parse(raw)?;
        let header = mesh.header;
        let incoming = header.vertex_count as usize;

        if let Some(index) = mesh.indices().find(|&i| i as usize >= incoming) {
            return Err(XipError::IndexOutOfRange {
                index,
                vertex_count: header.vertex_count,
            });
        }

        let buffer_index =
            self.select_buffer(header.format_tag, header.vertex_stride, incoming)?;
        let buffer = &mut self.buffers[buffer_index];

        let first_index = buffer.indices.len();
        if first_index >= MAX_KEY_INDEX {
            return Err(XipError::Overflow {
                what: "mesh key index position",
                value: first_index as u64,
            });
        }

        // Rebase against the vertex count before this mesh is appended
        let base = buffer.vertex_count;
        let rebased = mesh
            .indices()
            .map(|i| {
                u16::try_from(base + i as usize).map_err(|_| XipError::Overflow {
                    what: "rebased index",
                    value: (base + i as usize) as u64,
                })
            })
            .collect::<Result<Vec<u16>>>()?;

        buffer.vertices.extend_from_slice(mesh.vertices);
        buffer.vertex_count += incoming;
        buffer.indices.extend_from_slice(&rebased);

        let key = ((buffer_index as u32) << 24) | first_index as u32;
        debug!(
            buffer = buffer_index,
            key,
            vertices = incoming,
            indices = header.index_count,
            "merged mesh"
        );

        Ok(MeshRef {
            key,
            primitive_count: mesh.primitive_count(),
            buffer_index,
        })
    }

    /// Index and vertex buffer records for every buffer, in buffer order
    pub fn buffer_records(&self) -> Vec<BufferRecord> {
        self.buffers
            .iter()
            .enumerate()
            .flat_map(|(i, buffer)| {
                [
                    BufferRecord {
                        name: index_buffer_name(i),
                        kind: EntryType::IndexBuffer,
                        data: buffer.index_buffer_bytes(),
                    },
                    BufferRecord {
                        name: vertex_buffer_name(i),
                        kind: EntryType::VertexBuffer,
                        data: buffer.vertex_buffer_bytes(),
                    },
                ]
            })
            .collect()
    }

    /// Write `~<n>.ib` and `~<n>.vb` for every buffer into `dir`
    pub fn flush_buffers<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<FlushedBuffer>> {
        let dir = dir.as_ref();
        let mut flushed = Vec::with_capacity(self.buffers.len());

        for (i, buffer) in self.buffers.iter().enumerate() {
            let ib_path = dir.join(index_buffer_name(i));
            std::fs::write(&ib_path, buffer.index_buffer_bytes())
                .map_err(|e| XipError::at_path(&ib_path, e))?;

            let vb_path = dir.join(vertex_buffer_name(i));
            std::fs::write(&vb_path, buffer.vertex_buffer_bytes())
                .map_err(|e| XipError::at_path(&vb_path, e))?;

            flushed.push(FlushedBuffer {
                index: i,
                ib_path,
                vb_path,
            });
        }

        if !flushed.is_empty() {
            info!(
                count = flushed.len(),
                dir = %dir.display(),
                "wrote mesh buffers"
            );
        }
        Ok(flushed)
    }
}
