use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const PAGE_SIZE: usize = 4096;

/// One heap file on disk, seen as a sequence of fixed-size pages numbered
/// from 0. Pages are the unit of I/O; everything above works on whole-page
/// buffers obtained through the buffer pool.
pub struct PageManager {
    file: File,
}

impl PageManager {
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self { file })
    }

    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self { file })
    }

    /// Remove the file from disk. Any open handle keeps working until
    /// dropped; callers close the file first.
    pub fn destroy(path: &Path) -> StorageResult<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> StorageResult<()> {
        let offset = Self::page_offset(page_id);
        if offset >= self.file.metadata()?.len() {
            return Err(StorageError::PageNotFound(page_id));
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;

        Ok(())
    }

    pub fn write_page(&mut self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> StorageResult<()> {
        let offset = Self::page_offset(page_id);

        // Extend the file if the page lies past its current end.
        let file_size = self.file.metadata()?.len();
        if offset >= file_size {
            self.file.set_len(offset + PAGE_SIZE as u64)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }

    pub fn num_pages(&self) -> StorageResult<u32> {
        let file_size = self.file.metadata()?.len();
        Ok((file_size / PAGE_SIZE as u64) as u32)
    }

    /// Grow the file by one zeroed page and return its number.
    pub fn allocate_page(&mut self) -> StorageResult<PageId> {
        let current_pages = self.num_pages()?;
        let new_page_id = PageId(current_pages);

        self.file
            .set_len((current_pages as u64 + 1) * PAGE_SIZE as u64)?;

        Ok(new_page_id)
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id.0 as u64 * PAGE_SIZE as u64
    }
}
