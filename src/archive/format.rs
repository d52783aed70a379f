use crate::error::{Result, XipError};
use serde::Serialize;
use std::io::Write;

/// Magic tag at the start of every archive
pub const MAGIC: [u8; 4] = *b"XIP0";

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// File entry table record size in bytes
pub const FILE_ENTRY_SIZE: usize = 16;

/// Name entry table record size in bytes
pub const NAME_ENTRY_SIZE: usize = 4;

/// Archive entry types, stored as u32 in the file entry table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum EntryType {
    Generic = 0,
    Mesh = 1,
    Texture = 2,
    Wave = 3,
    MeshReference = 4,
    IndexBuffer = 5,
    VertexBuffer = 6,
}

impl EntryType {
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Generic),
            1 => Ok(Self::Mesh),
            2 => Ok(Self::Texture),
            3 => Ok(Self::Wave),
            4 => Ok(Self::MeshReference),
            5 => Ok(Self::IndexBuffer),
            6 => Ok(Self::VertexBuffer),
            _ => Err(XipError::UnknownEntryType(value)),
        }
    }

    /// Human-readable label used by the inspector
    pub fn label(self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Mesh => "Mesh",
            Self::Texture => "Texture",
            Self::Wave => "Wave",
            Self::MeshReference => "Mesh Reference",
            Self::IndexBuffer => "Index Buffer",
            Self::VertexBuffer => "Vertex Buffer",
        }
    }

    /// Entries whose bytes live in consolidated buffers rather than the data blob
    pub fn is_buffer_backed(self) -> bool {
        matches!(
            self,
            Self::MeshReference | Self::IndexBuffer | Self::VertexBuffer
        )
    }
}

/// Archive header (16 bytes)
///
/// Layout:
/// - Magic: "XIP0" (4 bytes)
/// - Data Offset: uint32
/// - File Count: uint16
/// - Name Count: uint16
/// - Data Size: uint32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub data_offset: u32,
    pub file_count: u16,
    pub name_count: u16,
    pub data_size: u32,
}

impl ArchiveHeader {
    /// Byte offset of the name block for the given table sizes
    pub fn name_block_offset(file_count: usize, name_count: usize) -> usize {
        HEADER_SIZE + file_count * FILE_ENTRY_SIZE + name_count * NAME_ENTRY_SIZE
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&self.data_offset.to_le_bytes())?;
        writer.write_all(&self.file_count.to_le_bytes())?;
        writer.write_all(&self.name_count.to_le_bytes())?;
        writer.write_all(&self.data_size.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(reader: &mut SliceReader<'_>) -> Result<Self> {
        let magic = reader.take(4, "header magic")?;
        if magic != MAGIC {
            return Err(XipError::InvalidFormat(format!(
                "bad magic {:?}, expected \"XIP0\"",
                String::from_utf8_lossy(magic)
            )));
        }

        Ok(Self {
            data_offset: reader.read_u32("header data offset")?,
            file_count: reader.read_u16("header file count")?,
            name_count: reader.read_u16("header name count")?,
            data_size: reader.read_u32("header data size")?,
        })
    }
}

/// File entry table record (16 bytes)
///
/// For `MeshReference` entries `offset` holds the mesh key and `size` the
/// primitive count; neither refers to the data blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub offset: u32,
    pub size: u32,
    pub kind: EntryType,
    pub timestamp: u32,
}

impl FileEntry {
    pub fn new(offset: u32, size: u32, kind: EntryType) -> Self {
        Self {
            offset,
            size,
            kind,
            timestamp: 0,
        }
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.offset.to_le_bytes())?;
        writer.write_all(&self.size.to_le_bytes())?;
        writer.write_all(&(self.kind as u32).to_le_bytes())?;
        writer.write_all(&self.timestamp.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(reader: &mut SliceReader<'_>) -> Result<Self> {
        let offset = reader.read_u32("file entry offset")?;
        let size = reader.read_u32("file entry size")?;
        let kind = EntryType::from_u32(reader.read_u32("file entry type")?)?;
        let timestamp = reader.read_u32("file entry timestamp")?;
        Ok(Self {
            offset,
            size,
            kind,
            timestamp,
        })
    }
}

/// Name entry table record (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameEntry {
    /// Index into the file entry table
    pub data_index: u16,
    /// Offset of a null-terminated name in the name block
    pub name_offset: u16,
}

impl NameEntry {
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.data_index.to_le_bytes())?;
        writer.write_all(&self.name_offset.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from(reader: &mut SliceReader<'_>) -> Result<Self> {
        Ok(Self {
            data_index: reader.read_u16("name entry data index")?,
            name_offset: reader.read_u16("name entry name offset")?,
        })
    }
}

/// Bounds-checked little-endian reader over an in-memory archive
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(XipError::TruncatedInput {
                what,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
