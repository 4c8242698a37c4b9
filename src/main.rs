//! Main entry point for the sanctuary-unzip CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use sanctuary_unzip::{Cli, LocalFileReader, ReadAt, ZipExtractor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let archive = Path::new(&cli.file);

    if cli.list {
        let reader = Arc::new(
            LocalFileReader::new(archive)
                .with_context(|| format!("cannot open {}", archive.display()))?,
        );
        return list_files(&ZipExtractor::new(reader)).await;
    }

    let summary = sanctuary_unzip::extract(archive, Path::new(&cli.extract_dir))
        .await
        .with_context(|| format!("failed to extract {}", archive.display()))?;
    log::info!(
        "{} files, {} directories, {} skipped",
        summary.files,
        summary.directories,
        summary.skipped
    );

    println!("Extraction completed");

    Ok(())
}

/// Print the stored name of every entry, one per line.
async fn list_files<R: ReadAt + 'static>(extractor: &ZipExtractor<R>) -> Result<()> {
    let entries = extractor
        .list_files()
        .await
        .context("failed to read central directory")?;

    for entry in &entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        log::debug!(
            "{} {:>10} {:04}-{:02}-{:02} {:02}:{:02}",
            entry.file_name,
            entry.uncompressed_size,
            year,
            month,
            day,
            hour,
            minute
        );
        println!("{}", entry.file_name);
    }

    Ok(())
}
