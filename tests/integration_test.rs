//! Integration tests for xip-rs library

use std::path::Path;
use tempfile::TempDir;
use xip_rs::mesh::build_mesh_payload;
use xip_rs::{
    build_directory, decode, encode, info, Archive, ArchiveBuilder, ArchiveReader, EntryType,
    XipConfig, FILE_ENTRY_SIZE, HEADER_SIZE, NAME_ENTRY_SIZE,
};

/// Helper: the three-file asset folder used by most tests
fn write_asset_folder(dir: &Path) {
    std::fs::write(dir.join("a.txt"), b"hi").unwrap();
    std::fs::write(dir.join("tex.xbx"), [0u8; 16]).unwrap();

    let vertices: Vec<u8> = (0..36).collect();
    std::fs::write(dir.join("mesh.xm"), build_mesh_payload(0x152, 12, &vertices, &[0, 1, 2]))
        .unwrap();
}

fn two_pass_config() -> XipConfig {
    let mut config = XipConfig::default();
    config.build.embed_buffers = false;
    config
}

#[test]
fn test_build_decode_info_scenario() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_asset_folder(source.path());

    let archive_path = out.path().join("assets.xip");
    let report = build_directory(source.path(), &archive_path, &two_pass_config()).unwrap();

    assert_eq!(report.file_count, 3);
    assert_eq!(report.mesh_count, 1);
    assert_eq!(report.data_size, 3 + 17);
    assert!(report.needs_second_pass);

    let bytes = std::fs::read(&archive_path).unwrap();
    let archive = decode(&bytes).unwrap();
    let header = archive.header().unwrap();

    assert_eq!(&bytes[0..4], b"XIP0");
    assert_eq!(header.file_count, 3);
    assert_eq!(header.name_count, 3);
    assert_eq!(header.data_size, 20);
    assert_eq!(
        header.data_offset as usize,
        HEADER_SIZE + 3 * FILE_ENTRY_SIZE + 3 * NAME_ENTRY_SIZE + archive.name_table.len()
    );

    let report = info(&bytes).unwrap();
    let listed: Vec<_> = report
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.label))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("a.txt", "Generic"),
            ("mesh.xm", "Mesh Reference"),
            ("tex.xbx", "Texture"),
        ]
    );

    // The mesh reference carries the key and primitive count, not blob bytes
    let mesh = &report.entries[1];
    assert_eq!(mesh.offset, 0);
    assert_eq!(mesh.size, 1);
}

#[test]
fn test_two_pass_build_includes_buffers() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_asset_folder(source.path());
    let archive_path = out.path().join("assets.xip");
    let config = two_pass_config();

    let first = build_directory(source.path(), &archive_path, &config).unwrap();
    assert!(first.needs_second_pass);
    assert!(source.path().join("~0.ib").exists());
    assert!(source.path().join("~0.vb").exists());

    let second = build_directory(source.path(), &archive_path, &config).unwrap();
    assert!(!second.needs_second_pass);
    assert_eq!(second.file_count, 5);

    let reader = ArchiveReader::open(&archive_path).unwrap();
    let kinds: Vec<_> = reader
        .entries()
        .unwrap()
        .iter()
        .map(|e| e.entry.kind)
        .collect();
    assert!(kinds.contains(&EntryType::IndexBuffer));
    assert!(kinds.contains(&EntryType::VertexBuffer));

    assert_eq!(reader.read_entry("~0.ib").unwrap(), &[0, 0, 1, 0, 2, 0, 0]);
}

#[test]
fn test_single_pass_embeds_buffers() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_asset_folder(source.path());
    let archive_path = out.path().join("assets.xip");

    let report = build_directory(source.path(), &archive_path, &XipConfig::default()).unwrap();
    assert!(!report.needs_second_pass);
    assert_eq!(report.file_count, 5);
    assert_eq!(report.buffers.len(), 1);

    // A rebuild skips the stale buffer files it just wrote
    let again = build_directory(source.path(), &archive_path, &XipConfig::default()).unwrap();
    assert_eq!(again.file_count, 5);

    let reader = ArchiveReader::open(&archive_path).unwrap();
    let vb = reader.read_entry("~0.vb").unwrap();
    assert_eq!(&vb[0..4], &3i32.to_le_bytes());
    assert_eq!(&vb[4..8], &0x152u32.to_le_bytes());
    assert_eq!(vb.len(), 8 + 36 + 1);
}

#[test]
fn test_separate_buffer_dir() {
    let source = TempDir::new().unwrap();
    let buffers = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_asset_folder(source.path());

    let mut config = XipConfig::default();
    config.build.buffer_dir = Some(buffers.path().to_path_buf());

    let report = build_directory(source.path(), out.path().join("a.xip"), &config).unwrap();
    assert_eq!(report.buffers[0].ib_path, buffers.path().join("~0.ib"));
    assert!(!source.path().join("~0.ib").exists());
}

#[test]
fn test_roundtrip_preserves_archive() {
    let mut builder = ArchiveBuilder::default();
    builder.add_file("menu/main.xap", EntryType::Generic, b"<xap/>").unwrap();
    builder.add_file("click.wav", EntryType::Wave, &[1, 2, 3, 4]).unwrap();
    builder
        .add_file("ship.xm", EntryType::Mesh, &build_mesh_payload(1, 4, &[0u8; 16], &[0, 1, 2, 3, 2, 1]))
        .unwrap();
    builder.embed_buffers().unwrap();
    let (archive, _) = builder.finish().unwrap();

    let bytes = encode(&archive).unwrap();
    let decoded: Archive = decode(&bytes).unwrap();

    assert_eq!(decoded, archive);
    assert_eq!(encode(&decoded).unwrap(), bytes);
}

#[test]
fn test_extract_built_archive() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let extracted = TempDir::new().unwrap();
    write_asset_folder(source.path());
    std::fs::create_dir_all(source.path().join("menu")).unwrap();
    std::fs::write(source.path().join("menu").join("main.xap"), b"<xap/>").unwrap();

    let archive_path = out.path().join("assets.xip");
    build_directory(source.path(), &archive_path, &XipConfig::default()).unwrap();

    let reader = ArchiveReader::open(&archive_path).unwrap();
    let summary = reader
        .extract_to(extracted.path(), &Default::default())
        .unwrap();

    assert_eq!(summary.written.len(), 3);
    assert_eq!(summary.skipped.len(), 3);
    assert!(summary.failed.is_empty());

    // Stored sizes include the trailing zero the builder appends
    let xap = std::fs::read(extracted.path().join("menu").join("main.xap")).unwrap();
    assert_eq!(xap, b"<xap/>\0");
    assert!(!extracted.path().join("mesh.xm").exists());
}

#[test]
fn test_config_file_limits_consolidation() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(source.path().join("a.xm"), build_mesh_payload(1, 4, &[0u8; 12], &[0, 1, 2]))
        .unwrap();
    std::fs::write(source.path().join("b.xm"), build_mesh_payload(2, 4, &[0u8; 12], &[0, 1, 2]))
        .unwrap();

    let config = XipConfig::from_toml_str("[consolidator]\nmax_buffers = 1\n").unwrap();
    let archive_path = out.path().join("meshes.xip");
    let result = build_directory(source.path(), &archive_path, &config);

    assert!(matches!(result, Err(xip_rs::XipError::TooManyBuffers { limit: 1 })));
    assert!(!archive_path.exists());
}

#[test]
fn test_rebuild_with_buffer_dir_inside_source() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(source.path().join("m.xm"), build_mesh_payload(1, 4, &[0u8; 12], &[0, 1, 2]))
        .unwrap();

    let mut config = XipConfig::default();
    config.build.buffer_dir = Some(source.path().join("buf"));
    let archive_path = out.path().join("m.xip");

    let first = build_directory(source.path(), &archive_path, &config).unwrap();
    let first_bytes = std::fs::read(&archive_path).unwrap();
    assert!(source.path().join("buf").join("~0.ib").exists());

    let second = build_directory(source.path(), &archive_path, &config).unwrap();
    let second_bytes = std::fs::read(&archive_path).unwrap();

    assert_eq!(first.file_count, 3);
    assert_eq!(second.file_count, 3);
    assert_eq!(first_bytes, second_bytes);

    let reader = ArchiveReader::from_bytes(&second_bytes).unwrap();
    assert!(!reader.contains("buf\\~0.ib"));
    assert!(reader.contains("~0.ib"));
}

#[test]
fn test_texture_without_companion_is_reported() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(source.path().join("back.bmp"), [1u8; 8]).unwrap();
    std::fs::write(source.path().join("logo.tga"), [2u8; 8]).unwrap();
    std::fs::write(source.path().join("logo.xbx"), [3u8; 8]).unwrap();

    let report =
        build_directory(source.path(), out.path().join("t.xip"), &XipConfig::default()).unwrap();

    assert_eq!(report.missing_companions, vec!["back.bmp".to_string()]);
    assert_eq!(report.file_count, 2);

    let reader = ArchiveReader::open(&report.archive_path).unwrap();
    assert!(reader.contains("back.bmp"));
    assert!(reader.contains("logo.xbx"));
    assert!(!reader.contains("logo.tga"));
}

#[test]
fn test_failed_build_writes_no_buffers() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::write(source.path().join("a.xm"), build_mesh_payload(1, 4, &[0u8; 12], &[0, 1, 2]))
        .unwrap();

    // Fill the name block so the embedded buffer names no longer fit a u16 offset
    for i in 0..327 {
        let name = format!("f{:03}{}", i, "x".repeat(196));
        std::fs::write(source.path().join(name), b"").unwrap();
    }

    let archive_path = out.path().join("full.xip");
    let result = build_directory(source.path(), &archive_path, &XipConfig::default());

    assert!(matches!(
        result,
        Err(xip_rs::XipError::Overflow {
            what: "name offset",
            ..
        })
    ));
    assert!(!source.path().join("~0.ib").exists());
    assert!(!source.path().join("~0.vb").exists());
    assert!(!archive_path.exists());
}
