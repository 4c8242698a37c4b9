use super::ReadAt;
use async_trait::async_trait;
use std::io;
use std::path::Path;

use crate::error::{ExtractError, Result};

/// Local file reader with random access support
pub struct LocalFileReader {
    file: std::fs::File,
    size: u64,
}

impl LocalFileReader {
    /// Open `path` for positioned reads.
    ///
    /// A missing file is reported as [`ExtractError::ArchiveNotFound`],
    /// anything else that prevents opening it as [`ExtractError::ArchiveRead`].
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExtractError::ArchiveNotFound(path.to_path_buf()),
            _ => ExtractError::ArchiveRead(e),
        })?;
        let metadata = file.metadata().map_err(ExtractError::ArchiveRead)?;
        if metadata.is_dir() {
            return Err(ExtractError::corrupt(format!("{} is a directory", path.display())));
        }
        Ok(Self {
            file,
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset).map_err(ExtractError::ArchiveRead)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            // seek_read moves the cursor, but every read here is positioned
            self.file.seek_read(buf, offset).map_err(ExtractError::ArchiveRead)
        }

        #[cfg(not(any(unix, windows)))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))
                .and_then(|_| file.read(buf))
                .map_err(ExtractError::ArchiveRead)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
