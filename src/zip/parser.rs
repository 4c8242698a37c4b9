//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Archives with data prepended to them (self-extracting stubs and the
//! like) are handled by measuring how far the central directory sits from
//! where the EOCD says it should be, and shifting every offset by that much.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::error::{ExtractError, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Upper half of code page 437, used for names without the UTF-8 flag.
const CP437_HIGH: &str = "ÇüéâäàåçêëèïîìÄÅ\
                          ÉæÆôöòûùÿÖÜ¢£¥₧ƒ\
                          áíóúñÑªº¿⌐¬½¼¡«»\
                          ░▒▓│┤╡╢╖╕╣║╗╝╜╛┐\
                          └┴┬├─┼╞╟╚╔╩╦╠═╬╧\
                          ╨╤╥╙╘╒╓╫╪┘┌█▄▌▐▀\
                          αßΓπΣσµτΦΘΩδ∞φε∩\
                          ≡±≥≤⌠⌡÷≈°∙·√ⁿ²■\u{a0}";

/// Location of the central directory, already shifted by any prepended data.
struct CentralDirectory {
    offset: u64,
    size: u64,
    total_entries: u64,
    /// Bytes in front of the archive proper
    prefix: u64,
}

/// Low-level ZIP file parser.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Tries the no-comment case first, then searches backwards through
    /// the last 64 KiB for a signature whose comment length lines up with
    /// the end of the file.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(ExtractError::corrupt("file is too small to be a ZIP archive"));
        }

        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ExtractError::corrupt("not a ZIP archive"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// The record is expected directly in front of its locator, which in
    /// turn sits directly in front of the regular EOCD. Reading it from
    /// that position rather than from the offset stored in the locator
    /// keeps prefixed archives working.
    ///
    /// # Returns
    ///
    /// The parsed record and its actual offset in the file.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<(Zip64EOCD, u64)> {
        let trailer = (Zip64EOCDLocator::SIZE + Zip64EOCD::MIN_SIZE) as u64;
        if eocd_offset < trailer {
            return Err(ExtractError::corrupt("missing zip64 end of central directory"));
        }

        let locator_offset = eocd_offset - Zip64EOCDLocator::SIZE as u64;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;
        if locator.total_disks > 1 {
            return Err(ExtractError::Unsupported("multi-disk archives".into()));
        }

        let eocd64_offset = eocd_offset - trailer;
        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(eocd64_offset, &mut eocd64_buf)
            .await?;

        Ok((Zip64EOCD::from_bytes(&eocd64_buf)?, eocd64_offset))
    }

    async fn locate_central_directory(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (offset, size, total_entries, cd_end) = if eocd.is_zip64() {
            let (eocd64, eocd64_offset) = self.read_zip64_eocd(eocd_offset).await?;
            if eocd64.disk_number != eocd64.disk_with_cd
                || eocd64.disk_entries != eocd64.total_entries
            {
                return Err(ExtractError::Unsupported("multi-disk archives".into()));
            }
            (
                eocd64.cd_offset,
                eocd64.cd_size,
                eocd64.total_entries,
                eocd64_offset,
            )
        } else {
            if eocd.is_multi_disk() {
                return Err(ExtractError::Unsupported("multi-disk archives".into()));
            }
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
                eocd_offset,
            )
        };

        let declared_end = offset
            .checked_add(size)
            .ok_or_else(|| ExtractError::corrupt("central directory size overflows"))?;
        let prefix = cd_end.checked_sub(declared_end).ok_or_else(|| {
            ExtractError::corrupt("central directory overlaps end of central directory")
        })?;

        if prefix > 0 {
            log::debug!("archive is preceded by {} bytes of other data", prefix);
        }

        Ok(CentralDirectory {
            offset: offset + prefix,
            size,
            total_entries,
            prefix,
        })
    }

    /// List all files in the ZIP archive.
    ///
    /// Reads the whole Central Directory in one go and parses every entry,
    /// so a structurally broken archive is rejected before anything is
    /// extracted.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let cd = self.locate_central_directory().await?;
        log::debug!(
            "central directory at {} ({} bytes, {} entries)",
            cd.offset,
            cd.size,
            cd.total_entries
        );

        let mut cd_data = vec![0u8; cd.size as usize];
        self.reader.read_exact_at(cd.offset, &mut cd_data).await?;

        // Every CDFH is at least 46 bytes, so this also caps the allocation
        let max_entries = cd.size / CDFH_MIN_SIZE as u64;
        if cd.total_entries > max_entries {
            return Err(ExtractError::corrupt(format!(
                "central directory declares {} entries but only has room for {}",
                cd.total_entries, max_entries
            )));
        }

        let mut entries = Vec::with_capacity(cd.total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..cd.total_entries {
            let mut entry = Self::parse_cdfh(&mut cursor)?;
            entry.lfh_offset = entry.lfh_offset.saturating_add(cd.prefix);
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(ExtractError::corrupt("invalid central directory file header"));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        let file_name = decode_file_name(&file_name_bytes, flags);

        let is_directory = file_name.ends_with('/');

        let extra_field_end = cursor.position() + extra_field_length as u64;
        if extra_field_end > cursor.get_ref().len() as u64 {
            return Err(ExtractError::corrupt("extra field runs past central directory"));
        }

        while cursor.position() + 4 <= extra_field_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()?;
            let field_end = cursor.position() + field_size as u64;
            if field_end > extra_field_end {
                return Err(ExtractError::corrupt("corrupt extra field"));
            }

            if header_id == ZIP64_EXTRA_ID {
                // Only the header fields saturated at 0xFFFFFFFF are present, in this order
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }
            cursor.set_position(field_end);
        }

        cursor.set_position(extra_field_end + file_comment_length as u64);

        Ok(ZipFileEntry {
            file_name,
            flags,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            is_directory,
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header has its own extra field, which may differ in
    /// length from the central directory's, so the header has to be read to
    /// find where the data begins. The name stored there must match the
    /// central directory entry.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf).await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ExtractError::corrupt(format!(
                "invalid local file header for {}",
                entry.file_name
            )));
        }

        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        let mut name_buf = vec![0u8; file_name_length as usize];
        self.reader
            .read_exact_at(entry.lfh_offset + LFH_SIZE as u64, &mut name_buf)
            .await?;
        if decode_file_name(&name_buf, entry.flags) != entry.file_name {
            return Err(ExtractError::corrupt(format!(
                "file name in directory {:?} and header {:?} differ",
                entry.file_name,
                String::from_utf8_lossy(&name_buf)
            )));
        }

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Decode a stored file name.
///
/// Names flagged as UTF-8 are decoded as such; anything else is code page
/// 437. A NUL byte terminates the name.
fn decode_file_name(raw: &[u8], flags: u16) -> String {
    let raw = match raw.iter().position(|&b| b == 0) {
        Some(nul) => &raw[..nul],
        None => raw,
    };

    if flags & FLAG_UTF8 != 0 || raw.is_ascii() {
        return String::from_utf8_lossy(raw).into_owned();
    }

    raw.iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP437_HIGH
                    .chars()
                    .nth((b - 0x80) as usize)
                    .unwrap_or(char::REPLACEMENT_CHARACTER)
            }
        })
        .collect()
}
