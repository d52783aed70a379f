use crate::error::{Result, XipError};

/// Mesh payload header (24 bytes, all u32 little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHeader {
    pub primitive_type: u32,
    pub face_count: u32,
    /// Opaque vertex format identifier (FVF)
    pub format_tag: u32,
    pub vertex_stride: u32,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl MeshHeader {
    pub const SIZE: usize = 24;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(XipError::TruncatedMesh {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        let field = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };

        Ok(Self {
            primitive_type: field(0),
            face_count: field(1),
            format_tag: field(2),
            vertex_stride: field(3),
            vertex_count: field(4),
            index_count: field(5),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let fields = [
            self.primitive_type,
            self.face_count,
            self.format_tag,
            self.vertex_stride,
            self.vertex_count,
            self.index_count,
        ];
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Total payload length implied by the declared counts, if it fits in memory
    pub fn payload_len(&self) -> Option<usize> {
        let vertex_bytes = (self.vertex_count as usize).checked_mul(self.vertex_stride as usize)?;
        let index_bytes = (self.index_count as usize).checked_mul(2)?;
        Self::SIZE.checked_add(vertex_bytes)?.checked_add(index_bytes)
    }
}

/// A parsed mesh file borrowing its vertex and index bytes
#[derive(Debug, Clone, Copy)]
pub struct MeshPayload<'a> {
    pub header: MeshHeader,
    /// `vertex_count * vertex_stride` raw bytes, never interpreted
    pub vertices: &'a [u8],
    /// `index_count` little-endian u16 values
    pub index_bytes: &'a [u8],
}

impl<'a> MeshPayload<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = MeshHeader::from_bytes(bytes)?;

        let expected = header.payload_len().ok_or(XipError::TruncatedMesh {
            expected: usize::MAX,
            actual: bytes.len(),
        })?;
        if bytes.len() < expected {
            return Err(XipError::TruncatedMesh {
                expected,
                actual: bytes.len(),
            });
        }

        let vertex_end =
            MeshHeader::SIZE + header.vertex_count as usize * header.vertex_stride as usize;

        Ok(Self {
            header,
            vertices: &bytes[MeshHeader::SIZE..vertex_end],
            index_bytes: &bytes[vertex_end..expected],
        })
    }

    pub fn indices(&self) -> impl Iterator<Item = u16> + 'a {
        self.index_bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Triangle-list primitive count
    pub fn primitive_count(&self) -> u32 {
        self.header.index_count / 3
    }
}

/// Assemble a mesh payload from its parts
pub fn build_mesh_payload(
    format_tag: u32,
    vertex_stride: u32,
    vertices: &[u8],
    indices: &[u16],
) -> Vec<u8> {
    let vertex_count = if vertex_stride == 0 {
        0
    } else {
        (vertices.len() / vertex_stride as usize) as u32
    };

    let header = MeshHeader {
        primitive_type: 4,
        face_count: (indices.len() / 3) as u32,
        format_tag,
        vertex_stride,
        vertex_count,
        index_count: indices.len() as u32,
    };

    let mut out = Vec::with_capacity(MeshHeader::SIZE + vertices.len() + indices.len() * 2);
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(vertices);
    for index in indices {
        out.extend_from_slice(&index.to_le_bytes());
    }
    out
}
