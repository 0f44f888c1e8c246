//! Package a few files into one BDP file, then unpack and verify them.
//!
//! Run with:
//!   cargo run --example file-roundtrip -- [-v|-vv] [FILE...]
//!
//! With no files the example packages its own source (run it from the
//! workspace root). `-v` logs at debug level, `-vv` at trace level.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;

use bdp::codec::{PackageReader, PackageWriter, Streamed};
use tracing::info;
use tracing::level_filters::LevelFilter;

fn init_logging(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut level = LevelFilter::INFO;
    let mut inputs: Vec<PathBuf> = Vec::new();
    for arg in std::env::args_os().skip(1) {
        match arg.to_str() {
            Some("-v") => level = LevelFilter::DEBUG,
            Some("-vv") => level = LevelFilter::TRACE,
            _ => inputs.push(PathBuf::from(arg)),
        }
    }
    init_logging(level);

    if inputs.is_empty() {
        inputs.push(PathBuf::from(file!()));
    }

    let dir = std::env::temp_dir().join(format!("bdp-example-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let package_path = dir.join("bundle.bdp");

    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(&package_path)?;

    // 16-bit names are plenty for paths; 64-bit values take files of any size.
    let mut writer = PackageWriter::create(file, 16, 64)?;
    for input in &inputs {
        let name = input.to_string_lossy();
        let stored = File::open(input)?;
        writer.write_pair_with(name.as_bytes(), Streamed::new(stored))?;
        info!(path = %input.display(), "packaged");
    }
    let mut file = writer.finish()?;
    info!(path = %package_path.display(), bytes = file.metadata()?.len(), "package written");

    file.seek(SeekFrom::Start(0))?;
    let mut reader = PackageReader::open(file)?;
    let mut count = 0usize;
    for pair in reader.pairs() {
        let pair = pair?;
        let name = String::from_utf8_lossy(pair.name.as_bytes()).into_owned();
        let original = fs::read(&name)?;
        if pair.value.as_bytes() != original.as_slice() {
            return Err(format!("{name}: unpacked contents differ").into());
        }
        info!(name = %name, bytes = pair.value.len(), "verified");
        count += 1;
    }

    eprintln!("{count} file(s) round-tripped through {}", package_path.display());
    fs::remove_dir_all(&dir)?;
    Ok(())
}
