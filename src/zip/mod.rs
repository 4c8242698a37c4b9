//! ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`path`]: Mapping of stored entry names onto safe relative paths
//! - [`extractor`]: Decompression, integrity checks and writing to disk
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, and validates all of it before the first
//! entry is written out.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED, DEFLATE and BZIP2 compression methods
//! - Archives with a comment or with data prepended to them
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No LZMA, Zstandard or other compression methods

mod extractor;
mod parser;
mod path;
mod structures;

pub use extractor::{ExtractSummary, ZipExtractor};
pub use parser::ZipParser;
pub use path::sanitize_entry_path;
pub use structures::*;
