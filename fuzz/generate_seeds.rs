//! Generate seed corpus for fuzzing

use std::fs;
use xip_rs::mesh::build_mesh_payload;
use xip_rs::{ArchiveBuilder, EntryType};

fn write_seed(
    corpus_dir: &str,
    name: &str,
    builder: ArchiveBuilder,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = format!("{}/{}.xip", corpus_dir, name);
    let (archive, _) = builder.finish()?;
    fs::write(&path, archive.encode()?)?;
    println!("Generated: {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    // Empty archive
    write_seed(corpus_dir, "seed_empty", ArchiveBuilder::default())?;

    // Single small file
    let mut builder = ArchiveBuilder::default();
    builder.add_file("test.txt", EntryType::Generic, b"Hello, World!")?;
    write_seed(corpus_dir, "seed_single_small", builder)?;

    // Every data entry type, nested names
    let mut builder = ArchiveBuilder::default();
    builder.add_file("menu/main.xap", EntryType::Generic, b"<xap/>")?;
    builder.add_file("skin/panel.xbx", EntryType::Texture, &[0u8; 64])?;
    builder.add_file("sound/click.wav", EntryType::Wave, &[1u8; 32])?;
    write_seed(corpus_dir, "seed_multi", builder)?;

    // Meshes with embedded buffers
    let mut builder = ArchiveBuilder::default();
    let vertices: Vec<u8> = (0..48).collect();
    builder.add_file(
        "ship.xm",
        EntryType::Mesh,
        &build_mesh_payload(0x152, 12, &vertices, &[0, 1, 2, 2, 3, 0]),
    )?;
    builder.add_file(
        "rock.xm",
        EntryType::Mesh,
        &build_mesh_payload(0x002, 4, &[7u8; 12], &[0, 1, 2]),
    )?;
    builder.embed_buffers()?;
    write_seed(corpus_dir, "seed_meshes", builder)?;

    // Binary data
    let mut builder = ArchiveBuilder::default();
    let binary_data: Vec<u8> = (0..=255).collect();
    builder.add_file("binary.bin", EntryType::Generic, &binary_data)?;
    write_seed(corpus_dir, "seed_binary", builder)?;

    println!("\nSeed corpus generated in {}", corpus_dir);
    Ok(())
}
