use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for xip operations
pub type Result<T> = std::result::Result<T, XipError>;

/// Unified error type for all xip operations
#[derive(Debug, Error)]
pub enum XipError {
    // Container errors
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    #[error("Truncated input reading {what}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Entry {index} out of range: offset {offset} + size {size} exceeds data size {data_size}")]
    OutOfRange {
        index: usize,
        offset: u64,
        size: u64,
        data_size: u64,
    },

    #[error("Unterminated name at name block offset {offset}")]
    UnterminatedName { offset: usize },

    #[error("File not found in archive: {0}")]
    FileNotFound(String),

    #[error("Unknown entry type: {0}")]
    UnknownEntryType(u32),

    #[error("{what} does not fit its on-disk field: {value}")]
    Overflow { what: &'static str, value: u64 },

    #[error("File/name entry count mismatch: {files} file entries, {names} name entries")]
    CountMismatch { files: usize, names: usize },

    // Mesh consolidation errors
    #[error("Truncated mesh payload: expected {expected} bytes, got {actual}")]
    TruncatedMesh { expected: usize, actual: usize },

    #[error("Too many mesh buffers (limit {limit})")]
    TooManyBuffers { limit: usize },

    #[error("Mesh index {index} does not address one of its {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: u32 },

    // Extraction errors
    #[error("Unsafe path in archive: {0}")]
    UnsafePath(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("I/O error on {}: {source}", path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Configuration and reporting
    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl XipError {
    /// Attach the offending path to an I/O error
    pub fn at_path(path: impl Into<PathBuf>, source: io::Error) -> Self {
        XipError::PathIo {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for XipError {
    fn from(err: toml::de::Error) -> Self {
        XipError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for XipError {
    fn from(err: toml::ser::Error) -> Self {
        XipError::Config(err.to_string())
    }
}
