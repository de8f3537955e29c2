use crate::access::record::{Record, Rid};
use crate::access::scan::HeapScan;
use crate::storage::buffer::lru::LruReplacer;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::error::StorageError;
use crate::storage::page::{utils, HeapPage, PageId};
use crate::storage::PageManager;
use anyhow::Result;
use std::path::Path;

/// Frames the default buffer pool holds for a file opened by path.
const DEFAULT_POOL_FRAMES: usize = 64;

/// A file of unordered variable-length records spread over slotted pages.
///
/// Records are addressed by their [`Rid`]; an insert picks the first page
/// with room (allocating a fresh one only when no page has any), and delete
/// and get go straight to the page the Rid names.
pub struct HeapFile {
    buffer_pool: BufferPoolManager,
}

impl HeapFile {
    /// Create a new, empty heap file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let page_manager = PageManager::create(path)?;
        Ok(Self::with_page_manager(page_manager))
    }

    /// Open an existing heap file.
    pub fn open(path: &Path) -> Result<Self> {
        let page_manager = PageManager::open(path)?;
        Ok(Self::with_page_manager(page_manager))
    }

    /// Remove a heap file from disk.
    pub fn destroy(path: &Path) -> Result<()> {
        PageManager::destroy(path)?;
        Ok(())
    }

    /// Build a heap file over an externally constructed buffer pool.
    pub fn new(buffer_pool: BufferPoolManager) -> Self {
        Self { buffer_pool }
    }

    fn with_page_manager(page_manager: PageManager) -> Self {
        let replacer = Box::new(LruReplacer::new(DEFAULT_POOL_FRAMES));
        Self::new(BufferPoolManager::new(
            page_manager,
            replacer,
            DEFAULT_POOL_FRAMES,
        ))
    }

    /// Insert a record and return its Rid.
    ///
    /// Walks the existing pages in ascending page order and takes the first
    /// one with room. Pages without room are only ever probed under a read
    /// pin, so they are released unmodified. When every page is full, exactly
    /// one new page is allocated, initialized, and used.
    pub fn insert(&mut self, data: &[u8]) -> Result<Rid> {
        if data.len() > HeapPage::MAX_RECORD_SIZE {
            return Err(StorageError::RecordTooLarge {
                size: data.len(),
                max: HeapPage::MAX_RECORD_SIZE,
            }
            .into());
        }

        let required = HeapPage::required_space_for(data.len());
        for page_no in 0..self.buffer_pool.num_pages()? {
            let page_id = PageId(page_no);
            let fits = {
                let guard = self.buffer_pool.fetch_page(page_id)?;
                utils::heap_page_from_guard(&guard).free_space() >= required
            };
            if !fits {
                continue;
            }

            let mut guard = self.buffer_pool.fetch_page_write(page_id)?;
            let mut page = HeapPage::from_data(&mut guard);
            let slot_id = page.insert_record(data)?;
            return Ok(Rid::new(page_id, slot_id));
        }

        let (page_id, mut guard) = self.buffer_pool.new_page()?;
        let mut page = HeapPage::new(&mut guard);
        let slot_id = page.insert_record(data)?;
        Ok(Rid::new(page_id, slot_id))
    }

    /// Fetch the record at `rid`. The payload is copied out of the page
    /// before the page is released, so the returned record owns its bytes.
    /// Reads never dirty a page.
    pub fn get(&self, rid: Rid) -> Result<Record> {
        let guard = self.buffer_pool.fetch_page(rid.page_id)?;
        let page = utils::heap_page_from_guard(&guard);
        let data = page.get_record(rid.slot_id)?.to_vec();
        Ok(Record::new(rid, data))
    }

    /// Delete the record at `rid`.
    ///
    /// The page is taken under a write pin before the slot is validated, so
    /// it is written back even when the delete reports an invalid slot. The
    /// cost is one spurious write-back on a no-op delete; the delete path
    /// keeps a single pin mode in exchange.
    pub fn delete(&mut self, rid: Rid) -> Result<()> {
        let mut guard = self.buffer_pool.fetch_page_write(rid.page_id)?;
        let mut page = HeapPage::from_data(&mut guard);
        page.delete_record(rid.slot_id)?;
        Ok(())
    }

    /// Open a cursor over every valid record in the file, in ascending
    /// (page, slot) order. Cursors are independent of each other and of
    /// later mutations through `self`.
    pub fn scan(&self) -> HeapScan {
        HeapScan::new(self.buffer_pool.clone())
    }

    /// Pages currently in the file.
    pub fn num_pages(&self) -> Result<u32> {
        Ok(self.buffer_pool.num_pages()?)
    }

    /// Flush all dirty pages and close the file.
    pub fn close(self) -> Result<()> {
        self.buffer_pool.flush_all()?;
        Ok(())
    }
}
