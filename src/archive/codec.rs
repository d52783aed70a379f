//! In-memory archive model and its byte encoding
//!
//! ```text
//! Header          16 bytes
//! FileEntry[n]    16 bytes each
//! NameEntry[m]     4 bytes each
//! Name block      null-terminated names, up to data_offset
//! Data blob       data_size bytes
//! ```

use crate::archive::format::{
    ArchiveHeader, EntryType, FileEntry, NameEntry, SliceReader, FILE_ENTRY_SIZE, NAME_ENTRY_SIZE,
};
use crate::archive::name_table::NameTable;
use crate::error::{Result, XipError};
use std::borrow::Cow;

/// Decoded archive
///
/// The header is not stored; [`Archive::header`] derives it from the
/// concrete section lengths, so encoding never writes stale offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub files: Vec<FileEntry>,
    pub names: Vec<NameEntry>,
    pub name_table: NameTable,
    pub data: Vec<u8>,
}

/// A name entry resolved against its file entry
#[derive(Debug, Clone)]
pub struct DirectoryEntry<'a> {
    pub name: Cow<'a, str>,
    pub file_index: usize,
    pub entry: &'a FileEntry,
}

impl Archive {
    /// Header describing this archive's current layout
    pub fn header(&self) -> Result<ArchiveHeader> {
        let file_count = u16::try_from(self.files.len()).map_err(|_| XipError::Overflow {
            what: "file count",
            value: self.files.len() as u64,
        })?;
        let name_count = u16::try_from(self.names.len()).map_err(|_| XipError::Overflow {
            what: "name count",
            value: self.names.len() as u64,
        })?;

        let data_offset =
            ArchiveHeader::name_block_offset(self.files.len(), self.names.len()) + self.name_table.len();
        let data_offset = u32::try_from(data_offset).map_err(|_| XipError::Overflow {
            what: "data offset",
            value: data_offset as u64,
        })?;
        let data_size = u32::try_from(self.data.len()).map_err(|_| XipError::Overflow {
            what: "data size",
            value: self.data.len() as u64,
        })?;

        Ok(ArchiveHeader {
            data_offset,
            file_count,
            name_count,
            data_size,
        })
    }

    /// Serialize the archive to its on-disk byte layout
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = self.header()?;
        let mut out = Vec::with_capacity(header.data_offset as usize + self.data.len());

        header.write_to(&mut out)?;
        for entry in &self.files {
            entry.write_to(&mut out)?;
        }
        for name in &self.names {
            name.write_to(&mut out)?;
        }
        out.extend_from_slice(self.name_table.as_bytes());
        out.extend_from_slice(&self.data);

        Ok(out)
    }

    /// Parse an archive from its on-disk byte layout
    ///
    /// Every name must be terminated inside the name block. Entry offsets
    /// are only checked when an entry's bytes are requested.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = SliceReader::new(bytes);
        let header = ArchiveHeader::read_from(&mut reader)?;

        let file_count = header.file_count as usize;
        let name_count = header.name_count as usize;

        let table_len = file_count * FILE_ENTRY_SIZE + name_count * NAME_ENTRY_SIZE;
        if reader.remaining() < table_len {
            return Err(XipError::TruncatedInput {
                what: "entry tables",
                needed: table_len,
                available: reader.remaining(),
            });
        }

        let mut files = Vec::with_capacity(file_count);
        for _ in 0..file_count {
            files.push(FileEntry::read_from(&mut reader)?);
        }

        let mut names = Vec::with_capacity(name_count);
        for _ in 0..name_count {
            names.push(NameEntry::read_from(&mut reader)?);
        }

        let name_block_start = reader.position();
        let data_offset = header.data_offset as usize;
        if data_offset < name_block_start {
            return Err(XipError::InvalidFormat(format!(
                "data offset {} precedes end of entry tables at {}",
                data_offset, name_block_start
            )));
        }

        let name_block = reader.take(data_offset - name_block_start, "name block")?;
        let data = reader.take(header.data_size as usize, "data blob")?;

        let name_table = NameTable::from_bytes(name_block.to_vec());
        for name in &names {
            name_table.get(name.name_offset as usize)?;
        }

        Ok(Self {
            files,
            names,
            name_table,
            data: data.to_vec(),
        })
    }

    /// Bytes of the file entry at `index`, bounds-checked against the data blob
    pub fn entry_data(&self, index: usize) -> Result<&[u8]> {
        let entry = self.files.get(index).ok_or_else(|| {
            XipError::InvalidFormat(format!(
                "file entry {} does not exist ({} entries)",
                index,
                self.files.len()
            ))
        })?;

        if entry.kind == EntryType::MeshReference {
            return Err(XipError::InvalidFormat(format!(
                "file entry {} is a mesh reference and has no data",
                index
            )));
        }

        let start = entry.offset as usize;
        let end = start + entry.size as usize;
        if end > self.data.len() {
            return Err(XipError::OutOfRange {
                index,
                offset: entry.offset as u64,
                size: entry.size as u64,
                data_size: self.data.len() as u64,
            });
        }

        Ok(&self.data[start..end])
    }

    /// Name entries paired with their file entries through `data_index`
    pub fn directory(&self) -> Result<Vec<DirectoryEntry<'_>>> {
        self.names
            .iter()
            .map(|name| {
                let file_index = name.data_index as usize;
                let entry = self.files.get(file_index).ok_or_else(|| {
                    XipError::InvalidFormat(format!(
                        "name entry points at file entry {} ({} entries)",
                        file_index,
                        self.files.len()
                    ))
                })?;

                Ok(DirectoryEntry {
                    name: self.name_table.name_at(name.name_offset as usize)?,
                    file_index,
                    entry,
                })
            })
            .collect()
    }
}

/// Parse an archive from bytes
pub fn decode(bytes: &[u8]) -> Result<Archive> {
    Archive::decode(bytes)
}

/// Serialize an archive to bytes
pub fn encode(archive: &Archive) -> Result<Vec<u8>> {
    archive.encode()
}
