use crate::archive::codec::{Archive, DirectoryEntry};
use crate::archive::format::ArchiveHeader;
use crate::archive::info::ArchiveInfo;
use crate::config::ExtractOptions;
use crate::error::{Result, XipError};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Decoded archive with name lookup and extraction
pub struct ArchiveReader {
    archive: Archive,
    source: Option<PathBuf>,
}

/// What [`ArchiveReader::extract_to`] did with each entry
#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    pub written: Vec<PathBuf>,
    /// Mesh references and buffers, which have no standalone file form
    pub skipped: Vec<String>,
    /// Entries that failed in best-effort mode, with the error text
    pub failed: Vec<(String, String)>,
}

impl ArchiveReader {
    /// Read and decode an archive file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| XipError::at_path(path, e))?;

        let archive = Archive::decode(&bytes).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to decode archive");
            e
        })?;

        Ok(Self {
            archive,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            archive: Archive::decode(bytes)?,
            source: None,
        })
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn into_archive(self) -> Archive {
        self.archive
    }

    /// File the archive was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn header(&self) -> Result<ArchiveHeader> {
        self.archive.header()
    }

    pub fn entry_count(&self) -> usize {
        self.archive.names.len()
    }

    /// Directory entries in name table order
    pub fn entries(&self) -> Result<Vec<DirectoryEntry<'_>>> {
        self.archive.directory()
    }

    /// Check if a name exists, ignoring ASCII case and separator style
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<usize> {
        let wanted = name.replace('/', "\\");
        self.archive.names.iter().find_map(|n| {
            let stored = self.archive.name_table.get(n.name_offset as usize).ok()?;
            stored
                .eq_ignore_ascii_case(wanted.as_bytes())
                .then_some(n.data_index as usize)
        })
    }

    /// Bytes of the named entry, including the builder's trailing zero
    pub fn read_entry(&self, name: &str) -> Result<&[u8]> {
        let index = self
            .find(name)
            .ok_or_else(|| XipError::FileNotFound(name.to_string()))?;
        self.archive.entry_data(index)
    }

    /// Build the read-only inspection report
    pub fn info(&self) -> Result<ArchiveInfo> {
        ArchiveInfo::from_archive(&self.archive)
    }

    /// Write every data entry below `dir`
    ///
    /// Mesh references and index/vertex buffers are skipped: turning them
    /// back into mesh files would need the inverse of consolidation.
    pub fn extract_to<P: AsRef<Path>>(
        &self,
        dir: P,
        options: &ExtractOptions,
    ) -> Result<ExtractSummary> {
        let dir = dir.as_ref();
        let chunk_size = options.chunk_size.max(1);
        let mut summary = ExtractSummary::default();

        for entry in self.archive.directory()? {
            let name = entry.name.as_ref();

            if entry.entry.kind.is_buffer_backed() {
                info!("Skipping {}, which is a {}", name, entry.entry.kind.label());
                summary.skipped.push(name.to_string());
                continue;
            }

            match self.extract_entry(dir, &entry, chunk_size) {
                Ok(path) => {
                    debug!(name, path = %path.display(), "extracted");
                    summary.written.push(path);
                }
                Err(e) if options.best_effort => {
                    warn!(name, error = %e, "failed to extract entry, continuing");
                    summary.failed.push((name.to_string(), e.to_string()));
                }
                Err(e) => {
                    warn!(name, error = %e, "failed to extract entry");
                    return Err(e);
                }
            }
        }

        info!(
            written = summary.written.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            dir = %dir.display(),
            "extraction finished"
        );
        Ok(summary)
    }

    fn extract_entry(
        &self,
        dir: &Path,
        entry: &DirectoryEntry<'_>,
        chunk_size: usize,
    ) -> Result<PathBuf> {
        let data = self.archive.entry_data(entry.file_index)?;
        let path = destination_path(dir, &entry.name)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| XipError::at_path(parent, e))?;
        }

        let mut file = File::create(&path).map_err(|e| XipError::at_path(&path, e))?;
        for chunk in data.chunks(chunk_size) {
            file.write_all(chunk)
                .map_err(|e| XipError::at_path(&path, e))?;
        }
        file.flush().map_err(|e| XipError::at_path(&path, e))?;

        Ok(path)
    }
}

/// Map an archive name onto a path below `dir`, refusing names that would
/// leave it
fn destination_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut path = dir.to_path_buf();
    let mut depth = 0;

    for part in name.split(['\\', '/']).filter(|p| !p.is_empty()) {
        if part == "." || part == ".." || part.contains(':') {
            return Err(XipError::UnsafePath(name.to_string()));
        }
        path.push(part);
        depth += 1;
    }

    if depth == 0 || name.starts_with(['\\', '/']) {
        return Err(XipError::UnsafePath(name.to_string()));
    }
    Ok(path)
}

/// Decode `archive_bytes` and extract it below `dir` with default options
pub fn extract<P: AsRef<Path>>(archive_bytes: &[u8], dir: P) -> Result<ExtractSummary> {
    ArchiveReader::from_bytes(archive_bytes)?.extract_to(dir, &ExtractOptions::default())
}
