use crate::archive::codec::Archive;
use crate::archive::format::{EntryType, FileEntry, NameEntry};
use crate::archive::name_table::NameTable;
use crate::config::{ConsolidatorConfig, XipConfig};
use crate::error::{Result, XipError};
use crate::mesh::{Consolidator, FlushedBuffer};
use crate::source::{
    base_name, companion_texture_name, normalize_archive_name, walk_source_dir, SourceFile,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Assembles file entries, names and the data blob for a new archive
///
/// Mesh inputs are merged into the builder's [`Consolidator`] and recorded
/// as mesh references; everything else is copied into the data blob with a
/// trailing zero byte.
pub struct ArchiveBuilder {
    files: Vec<FileEntry>,
    names: Vec<NameEntry>,
    name_table: NameTable,
    data: Vec<u8>,
    consolidator: Consolidator,
    mesh_count: usize,
}

impl ArchiveBuilder {
    pub fn new(config: ConsolidatorConfig) -> Self {
        Self {
            files: Vec::new(),
            names: Vec::new(),
            name_table: NameTable::new(),
            data: Vec::new(),
            consolidator: Consolidator::new(config),
            mesh_count: 0,
        }
    }

    pub fn consolidator(&self) -> &Consolidator {
        &self.consolidator
    }

    pub fn entry_count(&self) -> usize {
        self.files.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.mesh_count
    }

    pub fn contains_kind(&self, kind: EntryType) -> bool {
        self.files.iter().any(|f| f.kind == kind)
    }

    /// Add one input file under its relative path
    pub fn add_file(&mut self, path: &str, kind: EntryType, data: &[u8]) -> Result<()> {
        let name = normalize_archive_name(path);

        match kind {
            EntryType::Mesh => self.add_mesh(&name, data),
            _ => self.add_data(&name, kind, data),
        }
    }

    pub fn add_source(&mut self, source: &SourceFile) -> Result<()> {
        self.add_file(&source.archive_name(), source.kind, &source.data)
    }

    /// Add a batch of inputs
    ///
    /// A texture with a companion `.xbx` file in the batch is left to that
    /// file. One without is added as-is and its name is returned.
    pub fn add_sources(&mut self, sources: &[SourceFile]) -> Result<Vec<String>> {
        let known: HashSet<String> = sources
            .iter()
            .map(|s| s.archive_name().to_lowercase())
            .collect();
        let mut missing_companions = Vec::new();

        for source in sources {
            if source.kind == EntryType::Texture {
                let name = source.archive_name();
                let companion = companion_texture_name(&name);

                if !companion.eq_ignore_ascii_case(&name) {
                    if known.contains(&companion.to_lowercase()) {
                        debug!(name = %name, companion = %companion, "texture replaced by companion");
                        continue;
                    }
                    warn!(
                        path = %source.relative_path.display(),
                        companion = %companion,
                        "missing companion texture"
                    );
                    missing_companions.push(name);
                }
            }

            self.add_source(source).map_err(|e| {
                warn!(path = %source.relative_path.display(), error = %e, "failed to add file");
                e
            })?;
        }
        Ok(missing_companions)
    }

    fn add_mesh(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mesh = self.consolidator.add_mesh(data)?;
        let entry = FileEntry::new(mesh.key, mesh.primitive_count, EntryType::MeshReference);

        // Mesh references are listed by file name only
        self.push_entry(base_name(name), entry)?;
        self.mesh_count += 1;

        debug!(name, key = mesh.key, primitives = mesh.primitive_count, "added mesh reference");
        Ok(())
    }

    fn add_data(&mut self, name: &str, kind: EntryType, data: &[u8]) -> Result<()> {
        let offset = u32::try_from(self.data.len()).map_err(|_| XipError::Overflow {
            what: "data offset",
            value: self.data.len() as u64,
        })?;
        let size = u32::try_from(data.len() + 1).map_err(|_| XipError::Overflow {
            what: "entry size",
            value: data.len() as u64 + 1,
        })?;

        self.push_entry(name, FileEntry::new(offset, size, kind))?;
        self.data.extend_from_slice(data);
        self.data.push(0);

        debug!(name, kind = kind.label(), size, "added file");
        Ok(())
    }

    fn push_entry(&mut self, name: &str, entry: FileEntry) -> Result<()> {
        let data_index = u16::try_from(self.files.len()).map_err(|_| XipError::Overflow {
            what: "file count",
            value: self.files.len() as u64 + 1,
        })?;
        let name_offset = self.name_table.push(name)?;

        self.files.push(entry);
        self.names.push(NameEntry {
            data_index,
            name_offset,
        });
        Ok(())
    }

    /// Add the consolidator's current index and vertex buffers as entries,
    /// returning how many were added
    pub fn embed_buffers(&mut self) -> Result<usize> {
        let records = self.consolidator.buffer_records();
        for record in &records {
            self.add_data(&record.name, record.kind, &record.data)?;
        }
        Ok(records.len())
    }

    /// Sort the directory and produce the archive
    ///
    /// File and name entries are reordered together by case-insensitive
    /// name, so `names[i].data_index == i` afterwards. The name block keeps
    /// insertion order.
    pub fn finish(self) -> Result<(Archive, Consolidator)> {
        if self.files.len() != self.names.len() {
            return Err(XipError::CountMismatch {
                files: self.files.len(),
                names: self.names.len(),
            });
        }

        let keys = self
            .names
            .iter()
            .map(|n| {
                self.name_table
                    .name_at(n.name_offset as usize)
                    .map(|name| name.to_lowercase())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..self.names.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        let mut files = Vec::with_capacity(self.files.len());
        let mut names = Vec::with_capacity(self.names.len());
        for (position, &old) in order.iter().enumerate() {
            let name = self.names[old];
            files.push(self.files[name.data_index as usize]);
            names.push(NameEntry {
                // position < files.len(), which push_entry kept within u16
                data_index: position as u16,
                name_offset: name.name_offset,
            });
        }

        let archive = Archive {
            files,
            names,
            name_table: self.name_table,
            data: self.data,
        };
        Ok((archive, self.consolidator))
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new(ConsolidatorConfig::default())
    }
}

/// Outcome of [`build_directory`]
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub archive_path: PathBuf,
    pub file_count: usize,
    pub data_size: usize,
    pub mesh_count: usize,
    pub buffers: Vec<FlushedBuffer>,
    /// Textures added without their `.xbx` companion
    pub missing_companions: Vec<String>,
    /// Buffers were generated but are not in the archive yet; build again
    pub needs_second_pass: bool,
}

/// `~<n>.ib` / `~<n>.vb` directly inside `buffer_dir`, left over from an
/// earlier build
///
/// `buffer_dir` is relative to the source root.
fn is_generated_buffer(source: &SourceFile, buffer_dir: &Path) -> bool {
    if !matches!(source.kind, EntryType::IndexBuffer | EntryType::VertexBuffer) {
        return false;
    }
    if source.relative_path.parent().unwrap_or(Path::new("")) != buffer_dir {
        return false;
    }

    source
        .relative_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix('~'))
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Location of `buffer_dir` relative to `source_dir`, if it lies inside it
fn buffer_dir_in_source(source_dir: &Path, buffer_dir: &Path) -> Option<PathBuf> {
    if let Ok(relative) = buffer_dir.strip_prefix(source_dir) {
        return Some(relative.to_path_buf());
    }

    let source_dir = source_dir.canonicalize().ok()?;
    let buffer_dir = buffer_dir.canonicalize().ok()?;
    buffer_dir
        .strip_prefix(&source_dir)
        .ok()
        .map(Path::to_path_buf)
}

/// Build an archive from every file below `source_dir`
///
/// Mesh buffers are written to the configured buffer directory (the
/// source directory by default) once the archive has been encoded. With
/// `embed_buffers` they are also added to the archive in the same pass;
/// otherwise a second build that picks up the written files is needed.
/// The archive is written to a temporary file next to `archive_path` and
/// renamed into place.
pub fn build_directory<S: AsRef<Path>, A: AsRef<Path>>(
    source_dir: S,
    archive_path: A,
    config: &XipConfig,
) -> Result<BuildReport> {
    let source_dir = source_dir.as_ref();
    let archive_path = archive_path.as_ref();
    let embed = config.build.embed_buffers;

    let buffer_dir = config
        .build
        .buffer_dir
        .clone()
        .unwrap_or_else(|| source_dir.to_path_buf());

    let mut sources = walk_source_dir(source_dir)?;
    if embed {
        if let Some(generated) = buffer_dir_in_source(source_dir, &buffer_dir) {
            sources.retain(|s| {
                let stale = is_generated_buffer(s, &generated);
                if stale {
                    debug!(path = %s.relative_path.display(), "skipping stale mesh buffer");
                }
                !stale
            });
        }
    }

    let mut builder = ArchiveBuilder::new(config.consolidator);
    let missing_companions = builder.add_sources(&sources)?;

    if embed {
        builder.embed_buffers()?;
    }

    let has_buffers = builder.contains_kind(EntryType::IndexBuffer)
        || builder.contains_kind(EntryType::VertexBuffer);
    let needs_second_pass = !builder.consolidator().is_empty() && !has_buffers;

    let mesh_count = builder.mesh_count();
    let (archive, consolidator) = builder.finish()?;
    let bytes = archive.encode()?;

    let buffers = if consolidator.is_empty() {
        Vec::new()
    } else {
        std::fs::create_dir_all(&buffer_dir).map_err(|e| XipError::at_path(&buffer_dir, e))?;
        consolidator.flush_buffers(&buffer_dir)?
    };
    if needs_second_pass {
        warn!(
            dir = %buffer_dir.display(),
            "mesh buffers were written but not added to the archive; run the build again"
        );
    }

    write_atomic(archive_path, &bytes)?;

    info!(
        path = %archive_path.display(),
        files = archive.files.len(),
        meshes = mesh_count,
        bytes = bytes.len(),
        "archive created"
    );

    Ok(BuildReport {
        archive_path: archive_path.to_path_buf(),
        file_count: archive.files.len(),
        data_size: archive.data.len(),
        mesh_count,
        buffers,
        missing_companions,
        needs_second_pass,
    })
}

/// Write `bytes` to `path` through a temporary file in the same directory
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| XipError::at_path(dir, e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.flush())
        .map_err(|e| XipError::at_path(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| XipError::at_path(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::format::{FILE_ENTRY_SIZE, HEADER_SIZE, NAME_ENTRY_SIZE};
    use crate::mesh::build_mesh_payload;

    fn names_of(archive: &Archive) -> Vec<String> {
        archive
            .directory()
            .unwrap()
            .into_iter()
            .map(|e| e.name.into_owned())
            .collect()
    }

    #[test]
    fn test_data_entries() {
        let mut builder = ArchiveBuilder::default();
        builder.add_file("a.txt", EntryType::Generic, b"hi").unwrap();
        builder
            .add_file("tex/box.xbx", EntryType::Texture, &[0u8; 16])
            .unwrap();

        let (archive, consolidator) = builder.finish().unwrap();
        assert!(consolidator.is_empty());
        assert_eq!(archive.data.len(), 3 + 17);
        assert_eq!(archive.files[0], FileEntry::new(0, 3, EntryType::Generic));
        assert_eq!(archive.files[1], FileEntry::new(3, 17, EntryType::Texture));
        assert_eq!(archive.entry_data(0).unwrap(), b"hi\0");
        assert_eq!(names_of(&archive), vec!["a.txt", "tex\\box.xbx"]);
    }

    #[test]
    fn test_mesh_becomes_reference() {
        let mut builder = ArchiveBuilder::default();
        let mesh = build_mesh_payload(0x112, 4, &[0u8; 12], &[0, 1, 2]);
        builder.add_file("models/ship.xm", EntryType::Mesh, &mesh).unwrap();

        assert_eq!(builder.mesh_count(), 1);
        let (archive, consolidator) = builder.finish().unwrap();

        assert!(archive.data.is_empty());
        assert_eq!(archive.files[0], FileEntry::new(0, 1, EntryType::MeshReference));
        assert_eq!(names_of(&archive), vec!["ship.xm"]);
        assert_eq!(consolidator.buffers().len(), 1);
    }

    #[test]
    fn test_sorted_case_insensitively_with_back_references() {
        let mut builder = ArchiveBuilder::default();
        builder.add_file("b.txt", EntryType::Generic, b"b").unwrap();
        builder.add_file("C.txt", EntryType::Generic, b"c").unwrap();
        builder.add_file("a.txt", EntryType::Generic, b"a").unwrap();

        let (archive, _) = builder.finish().unwrap();
        assert_eq!(names_of(&archive), vec!["a.txt", "b.txt", "C.txt"]);

        for (i, name) in archive.names.iter().enumerate() {
            assert_eq!(name.data_index as usize, i);
        }
        assert_eq!(archive.entry_data(0).unwrap(), b"a\0");
        assert_eq!(archive.entry_data(2).unwrap(), b"c\0");

        // Name block stays in insertion order
        assert_eq!(archive.name_table.as_bytes(), b"b.txt\0C.txt\0a.txt\0");
    }

    #[test]
    fn test_offset_invariant() {
        let mut builder = ArchiveBuilder::default();
        builder.add_file("one", EntryType::Generic, b"1").unwrap();
        builder.add_file("two", EntryType::Wave, b"22").unwrap();

        let (archive, _) = builder.finish().unwrap();
        let header = archive.header().unwrap();
        assert_eq!(
            header.data_offset as usize,
            HEADER_SIZE + 2 * FILE_ENTRY_SIZE + 2 * NAME_ENTRY_SIZE + archive.name_table.len()
        );
    }

    #[test]
    fn test_count_mismatch() {
        let mut builder = ArchiveBuilder::default();
        builder.add_file("a.txt", EntryType::Generic, b"a").unwrap();
        builder.names.clear();

        assert!(matches!(
            builder.finish(),
            Err(XipError::CountMismatch { files: 1, names: 0 })
        ));
    }

    #[test]
    fn test_embed_buffers() {
        let mut builder = ArchiveBuilder::default();
        let mesh = build_mesh_payload(1, 4, &[5u8; 12], &[0, 1, 2]);
        builder.add_file("ship.xm", EntryType::Mesh, &mesh).unwrap();

        assert_eq!(builder.embed_buffers().unwrap(), 2);
        let (archive, _) = builder.finish().unwrap();

        let directory = archive.directory().unwrap();
        let kinds: Vec<_> = directory.iter().map(|e| (e.name.as_ref(), e.entry.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("ship.xm", EntryType::MeshReference),
                ("~0.ib", EntryType::IndexBuffer),
                ("~0.vb", EntryType::VertexBuffer),
            ]
        );
        assert_eq!(archive.entry_data(1).unwrap(), &[0, 0, 1, 0, 2, 0, 0]);
    }

    #[test]
    fn test_generated_buffer_detection() {
        let root = Path::new("");
        assert!(is_generated_buffer(&SourceFile::new("~0.ib", vec![]), root));
        assert!(is_generated_buffer(&SourceFile::new("~12.vb", vec![]), root));
        assert!(!is_generated_buffer(&SourceFile::new("~x.ib", vec![]), root));
        assert!(!is_generated_buffer(&SourceFile::new("sub/~0.ib", vec![]), root));
        assert!(!is_generated_buffer(&SourceFile::new("~0.txt", vec![]), root));

        let buf = Path::new("buf");
        assert!(is_generated_buffer(&SourceFile::new("buf/~0.ib", vec![]), buf));
        assert!(!is_generated_buffer(&SourceFile::new("~0.ib", vec![]), buf));
        assert!(!is_generated_buffer(&SourceFile::new("buf/sub/~0.vb", vec![]), buf));
    }

    #[test]
    fn test_buffer_dir_in_source() {
        let source = Path::new("assets");
        assert_eq!(buffer_dir_in_source(source, source), Some(PathBuf::new()));
        assert_eq!(
            buffer_dir_in_source(source, &source.join("buf")),
            Some(PathBuf::from("buf"))
        );
        assert_eq!(buffer_dir_in_source(source, Path::new("elsewhere/buf")), None);
    }

    #[test]
    fn test_texture_companions() {
        let sources = vec![
            SourceFile::new("ui/panel.bmp", vec![1, 2]),
            SourceFile::new("ui/panel.xbx", vec![3; 8]),
            SourceFile::new("ui/lone.tga", vec![4; 4]),
            SourceFile::new("ui/solo.xbx", vec![5; 4]),
        ];
        assert_eq!(sources[0].kind, EntryType::Texture);

        let mut builder = ArchiveBuilder::default();
        let missing = builder.add_sources(&sources).unwrap();
        assert_eq!(missing, vec!["ui\\lone.tga".to_string()]);

        let (archive, _) = builder.finish().unwrap();
        assert_eq!(
            names_of(&archive),
            vec!["ui\\lone.tga", "ui\\panel.xbx", "ui\\solo.xbx"]
        );
        assert_eq!(archive.entry_data(1).unwrap(), &[3, 3, 3, 3, 3, 3, 3, 3, 0]);
    }

    #[test]
    fn test_mesh_error_aborts() {
        let mut builder = ArchiveBuilder::new(ConsolidatorConfig::new(1, 65536).unwrap());
        builder
            .add_file("a.xm", EntryType::Mesh, &build_mesh_payload(1, 4, &[0u8; 12], &[0, 1, 2]))
            .unwrap();

        let result =
            builder.add_file("b.xm", EntryType::Mesh, &build_mesh_payload(2, 4, &[0u8; 12], &[0, 1, 2]));
        assert!(matches!(result, Err(XipError::TooManyBuffers { limit: 1 })));
        assert_eq!(builder.entry_count(), 1);
    }
}
