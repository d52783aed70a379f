//! Source-side collaborators for building archives: directory walking,
//! file classification and archive name normalisation

use crate::archive::EntryType;
use crate::error::{Result, XipError};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A file to be added to an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source root
    pub relative_path: PathBuf,
    pub kind: EntryType,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(relative_path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        let relative_path = relative_path.into();
        Self {
            kind: classify(&relative_path),
            relative_path,
            data,
        }
    }

    /// Name as stored in the archive, with `\` separators
    pub fn archive_name(&self) -> String {
        archive_name(&self.relative_path)
    }
}

/// Map a file extension to its archive entry type
pub fn classify(path: &Path) -> EntryType {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xm" => EntryType::Mesh,
        "ib" => EntryType::IndexBuffer,
        "vb" => EntryType::VertexBuffer,
        "xbx" | "bmp" | "tga" => EntryType::Texture,
        "wav" => EntryType::Wave,
        _ => EntryType::Generic,
    }
}

/// Rewrite both `/` and `\` separators to the archive's `\`
pub fn normalize_archive_name(name: &str) -> String {
    name.replace('/', "\\")
}

/// Archive name for a relative path
pub fn archive_name(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    normalize_archive_name(&parts.join("\\"))
}

/// Final component of an archive name
pub fn base_name(name: &str) -> &str {
    name.rsplit(['\\', '/']).next().unwrap_or(name)
}

/// Texture format file sharing the stem of `name`
pub fn companion_texture_name(name: &str) -> String {
    let base_start = name.len() - base_name(name).len();
    match name[base_start..].rfind('.') {
        Some(dot) => format!("{}.xbx", &name[..base_start + dot]),
        None => format!("{}.xbx", name),
    }
}

/// Read every file below `root`, ordered by path
pub fn walk_source_dir<P: AsRef<Path>>(root: P) -> Result<Vec<SourceFile>> {
    let root = root.as_ref();
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            XipError::at_path(path, io::Error::from(e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).map_err(|_| {
            XipError::InvalidFormat(format!("{} is outside {}", path.display(), root.display()))
        })?;
        let data = std::fs::read(path).map_err(|e| XipError::at_path(path, e))?;

        files.push(SourceFile::new(relative, data));
    }

    Ok(files)
}
