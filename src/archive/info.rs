use crate::archive::codec::Archive;
use crate::archive::format::{EntryType, MAGIC};
use crate::error::Result;
use serde::Serialize;
use std::fmt;

/// Read-only summary of an archive's header and directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub magic: String,
    pub data_offset: u32,
    pub file_count: u16,
    pub name_count: u16,
    pub data_size: u32,
    pub entries: Vec<InfoEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoEntry {
    pub name: String,
    pub kind: EntryType,
    pub label: &'static str,
    /// Blob offset, or the mesh key for mesh references
    pub offset: u32,
    /// Byte size, or the primitive count for mesh references
    pub size: u32,
}

impl ArchiveInfo {
    pub fn from_archive(archive: &Archive) -> Result<Self> {
        let header = archive.header()?;
        let entries = archive
            .directory()?
            .into_iter()
            .map(|e| InfoEntry {
                name: e.name.into_owned(),
                kind: e.entry.kind,
                label: e.entry.kind.label(),
                offset: e.entry.offset,
                size: e.entry.size,
            })
            .collect();

        Ok(Self {
            magic: String::from_utf8_lossy(&MAGIC).into_owned(),
            data_offset: header.data_offset,
            file_count: header.file_count,
            name_count: header.name_count,
            data_size: header.data_size,
            entries,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ArchiveInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "XIP Header:")?;
        writeln!(f, "  Magic: {}", self.magic)?;
        writeln!(f, "  Data Offset: {:#010X}", self.data_offset)?;
        writeln!(f, "  Files: {}", self.file_count)?;
        writeln!(f, "  Names: {}", self.name_count)?;
        writeln!(f, "  Data Size: {:#010X} ({} bytes)", self.data_size, self.data_size)?;
        writeln!(f, "XIP File Names:")?;
        for entry in &self.entries {
            writeln!(f, "  {}: {}", entry.label, entry.name)?;
        }
        Ok(())
    }
}

/// Decode `archive_bytes` and summarise it without touching the file system
pub fn info(archive_bytes: &[u8]) -> Result<ArchiveInfo> {
    ArchiveInfo::from_archive(&Archive::decode(archive_bytes)?)
}
