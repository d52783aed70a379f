mod codec;
mod format;
mod info;
mod name_table;
mod reader;
mod writer;

pub use codec::{decode, encode, Archive, DirectoryEntry};
pub use format::{
    ArchiveHeader, EntryType, FileEntry, NameEntry, SliceReader, FILE_ENTRY_SIZE, HEADER_SIZE,
    MAGIC, NAME_ENTRY_SIZE,
};
pub use info::{info, ArchiveInfo, InfoEntry};
pub use name_table::NameTable;
pub use reader::{extract, ArchiveReader, ExtractSummary};
pub use writer::{build_directory, ArchiveBuilder, BuildReport};
