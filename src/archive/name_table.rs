//! Null-terminated filename block
//!
//! Names are stored back to back, each followed by a single zero byte.
//! Name entries address them by byte offset, which is a u16 on disk, so a
//! name must start within the first 64 KiB of the block.

use crate::error::{Result, XipError};
use std::borrow::Cow;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    block: Vec<u8>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing name block read from an archive
    pub fn from_bytes(block: Vec<u8>) -> Self {
        Self { block }
    }

    /// Append a name and return the offset it starts at
    pub fn push(&mut self, name: &str) -> Result<u16> {
        if name.as_bytes().contains(&0) {
            return Err(XipError::InvalidFormat(format!(
                "name contains a zero byte: {:?}",
                name
            )));
        }

        let offset = u16::try_from(self.block.len()).map_err(|_| XipError::Overflow {
            what: "name offset",
            value: self.block.len() as u64,
        })?;

        self.block.extend_from_slice(name.as_bytes());
        self.block.push(0);
        Ok(offset)
    }

    /// Raw bytes of the name starting at `offset`, without its terminator
    pub fn get(&self, offset: usize) -> Result<&[u8]> {
        let tail = self
            .block
            .get(offset..)
            .ok_or(XipError::UnterminatedName { offset })?;

        tail.iter()
            .position(|&b| b == 0)
            .map(|end| &tail[..end])
            .ok_or(XipError::UnterminatedName { offset })
    }

    /// Name at `offset` decoded as text
    pub fn name_at(&self, offset: usize) -> Result<Cow<'_, str>> {
        self.get(offset).map(String::from_utf8_lossy)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.block
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.block
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }
}
