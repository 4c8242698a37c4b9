//! # sanctuary-unzip
//!
//! Extracts a ZIP archive (by default `pixel-sanctuary.zip`) into a
//! destination directory (by default the current one).
//!
//! Every entry is written at its stored relative path, creating
//! intermediate directories and overwriting files that already exist.
//! Entry names are sanitized first, so absolute names and `..` components
//! cannot place files outside the destination. Each file's size and CRC-32
//! are checked after decompression.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let summary = sanctuary_unzip::extract(Path::new("pixel-sanctuary.zip"), Path::new(".")).await?;
//!     println!("{} files", summary.files);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

use std::path::Path;
use std::sync::Arc;

pub use cli::Cli;
pub use error::{ErrorKind, ExtractError};
pub use io::{LocalFileReader, ReadAt};
pub use zip::{ExtractSummary, ZipExtractor, ZipFileEntry};

/// Extract every entry of the archive at `archive_path` into `destination_dir`.
///
/// The archive is opened for the duration of the call only. Fails with
/// [`ErrorKind::ArchiveNotFound`] or [`ErrorKind::ArchiveCorrupt`] before
/// anything is written when the archive is missing or structurally invalid.
pub async fn extract(archive_path: &Path, destination_dir: &Path) -> error::Result<ExtractSummary> {
    let reader = Arc::new(LocalFileReader::new(archive_path)?);
    let extractor = ZipExtractor::new(reader);
    extractor.extract_all(destination_dir).await
}
