use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

use crc::{CRC_32_ISO_HDLC, Crc};
use flate2::read::DeflateDecoder;

use crate::error::{ExtractError, Result};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::path::sanitize_entry_path;
use super::structures::{CompressionMethod, ZipFileEntry};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Initial buffer for decompressed data; the declared size is not trusted for allocation
const MAX_PREALLOC: u64 = 1 << 20;

/// What an extraction run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract file data to memory.
    ///
    /// The decompressed bytes are checked against the declared size and
    /// CRC-32 before they are returned.
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            return Err(ExtractError::Unsupported(format!(
                "{} is encrypted",
                entry.file_name
            )));
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(ExtractError::Unsupported(format!(
                "compression method {} for {}",
                method, entry.file_name
            )));
        }

        let data_offset = self.parser.get_data_offset(entry).await?;

        if entry.compressed_size > self.parser.reader().size() {
            return Err(ExtractError::corrupt(format!(
                "{} claims {} compressed bytes, more than the archive holds",
                entry.file_name, entry.compressed_size
            )));
        }
        let mut compressed = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut compressed)
            .await?;

        let data = decompress(entry, compressed)?;

        if data.len() as u64 != entry.uncompressed_size {
            return Err(ExtractError::corrupt(format!(
                "{} decompressed to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            )));
        }

        let crc32 = CRC32.checksum(&data);
        if crc32 != entry.crc32 {
            return Err(ExtractError::corrupt(format!(
                "bad CRC-32 for {}: {:08x}, expected {:08x}",
                entry.file_name, crc32, entry.crc32
            )));
        }

        Ok(data)
    }

    /// Extract file to disk, replacing whatever is at `output_path`
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ExtractError::write(parent, e))?;
            }
        }

        let data = self.extract_to_memory(entry).await?;

        fs::write(output_path, &data)
            .await
            .map_err(|e| ExtractError::write(output_path, e))?;

        Ok(())
    }

    /// Extract every entry under `destination`, in central directory order.
    ///
    /// The whole central directory is parsed before anything is written.
    pub async fn extract_all(&self, destination: &Path) -> Result<ExtractSummary> {
        let entries = self.list_files().await?;

        fs::create_dir_all(destination)
            .await
            .map_err(|e| ExtractError::write(destination, e))?;

        let mut summary = ExtractSummary::default();
        for entry in &entries {
            let Some(relative) = sanitize_entry_path(&entry.file_name) else {
                log::warn!("Skipping: {:?} (empty path)", entry.file_name);
                summary.skipped += 1;
                continue;
            };
            let output_path = destination.join(relative);

            if entry.is_directory {
                log::debug!("   creating: {}", output_path.display());
                fs::create_dir_all(&output_path)
                    .await
                    .map_err(|e| ExtractError::write(&output_path, e))?;
                summary.directories += 1;
            } else {
                log::info!("  extracting: {}", output_path.display());
                self.extract_to_file(entry, &output_path).await?;
                summary.files += 1;
            }
        }

        Ok(summary)
    }
}

fn decompress(entry: &ZipFileEntry, compressed: Vec<u8>) -> Result<Vec<u8>> {
    let limit = entry.uncompressed_size.saturating_add(1);
    let capacity = entry.uncompressed_size.min(MAX_PREALLOC) as usize;

    // One byte past the declared size is enough to detect a mismatch
    let decoded = match entry.compression_method {
        CompressionMethod::Stored => return Ok(compressed),
        CompressionMethod::Deflate => read_limited(
            DeflateDecoder::new(compressed.as_slice()),
            limit,
            capacity,
        ),
        CompressionMethod::Bzip2 => read_limited(
            bzip2::read::BzDecoder::new(compressed.as_slice()),
            limit,
            capacity,
        ),
        CompressionMethod::Unknown(method) => {
            return Err(ExtractError::Unsupported(format!(
                "compression method {}",
                method
            )));
        }
    };

    decoded.map_err(|e| {
        ExtractError::corrupt(format!("failed to decompress {}: {}", entry.file_name, e))
    })
}

fn read_limited(reader: impl Read, limit: u64, capacity: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(capacity);
    reader.take(limit).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn entry(method: CompressionMethod, data: &[u8]) -> ZipFileEntry {
        ZipFileEntry {
            file_name: "a.txt".into(),
            flags: 0,
            compression_method: method,
            compressed_size: 0,
            uncompressed_size: data.len() as u64,
            crc32: CRC32.checksum(data),
            lfh_offset: 0,
            last_mod_time: 0,
            last_mod_date: 0,
            is_directory: false,
        }
    }

    #[test]
    fn crc_matches_reference_value() {
        assert_eq!(CRC32.checksum(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn inflate() {
        let data = b"hello hello hello hello";
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress(&entry(CompressionMethod::Deflate, data), compressed).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn garbage_deflate_is_corrupt() {
        let err = decompress(
            &entry(CompressionMethod::Deflate, b"hello"),
            vec![0xff; 16],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchiveCorrupt);
    }

    #[test]
    fn output_is_capped_past_declared_size() {
        let data = vec![b'x'; 4096];
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut small = entry(CompressionMethod::Deflate, &data);
        small.uncompressed_size = 10;
        let out = decompress(&small, compressed).unwrap();
        assert_eq!(out.len(), 11);
    }
}
