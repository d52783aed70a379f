//! xip-rs: reader and writer for XIP asset archives
//!
//! An XIP archive bundles generic files, textures, sounds and mesh data
//! behind a small header, a file entry table, a name table and one data
//! blob. This library provides:
//! - Bit-exact decoding and encoding of the container
//! - Mesh buffer consolidation: many small meshes merged into a few shared,
//!   vertex-format-keyed index/vertex buffers with rebased indices
//! - Building an archive from a directory, extraction and inspection
//!
//! # Example
//!
//! ```no_run
//! use xip_rs::{ArchiveBuilder, ArchiveReader, EntryType};
//!
//! let mut builder = ArchiveBuilder::default();
//! builder.add_file("readme.txt", EntryType::Generic, b"Hello")?;
//! let (archive, _buffers) = builder.finish()?;
//! std::fs::write("example.xip", archive.encode()?)?;
//!
//! let reader = ArchiveReader::open("example.xip")?;
//! println!("{}", reader.info()?);
//! # Ok::<(), xip_rs::XipError>(())
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod mesh;
pub mod source;

pub use archive::{
    build_directory, decode, encode, extract, info, Archive, ArchiveBuilder, ArchiveHeader,
    ArchiveInfo, ArchiveReader, BuildReport, DirectoryEntry, EntryType, ExtractSummary, FileEntry,
    InfoEntry, NameEntry, NameTable, FILE_ENTRY_SIZE, HEADER_SIZE, MAGIC, NAME_ENTRY_SIZE,
};
pub use config::{BuildConfig, ConsolidatorConfig, ExtractOptions, XipConfig};
pub use error::{Result, XipError};
pub use mesh::{Consolidator, FlushedBuffer, MeshBuffer, MeshRef};
pub use source::{classify, walk_source_dir, SourceFile};
