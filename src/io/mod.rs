mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::{ExtractError, Result};

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer starting at `offset`.
    ///
    /// Running out of data before the buffer is full means the archive
    /// is shorter than its own records claim.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.is_none_or(|end| end > self.size()) {
            return Err(ExtractError::corrupt(format!(
                "record at offset {} with length {} extends past end of archive",
                offset,
                buf.len()
            )));
        }

        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(ExtractError::corrupt("unexpected end of archive"));
            }
            filled += n;
        }
        Ok(())
    }
}
