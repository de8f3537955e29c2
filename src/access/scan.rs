//! Sequential scan over every valid record in a heap file.

use crate::access::record::{Record, Rid};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::{utils, PageId};
use anyhow::Result;

/// A resumable cursor over a heap file.
///
/// The cursor remembers the page and slot of the last record it returned and
/// resumes right after them on the next call, walking pages in ascending
/// number order and slots in ascending index order, skipping deleted slots.
/// Each call pins the page it inspects with a read guard and releases it
/// before returning, so dropping the cursor mid-scan holds nothing back and
/// no close step is needed. Cursors over the same file are independent.
pub struct HeapScan {
    buffer_pool: BufferPoolManager,
    current_page: Option<PageId>,
    current_slot: Option<u16>,
    exhausted: bool,
}

impl HeapScan {
    pub(crate) fn new(buffer_pool: BufferPoolManager) -> Self {
        Self {
            buffer_pool,
            current_page: None,
            current_slot: None,
            exhausted: false,
        }
    }

    /// Advance to the next valid record. `Ok(None)` signals the end of the
    /// file; once reached, the cursor stays exhausted.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            if let Some(page_id) = self.current_page {
                let guard = self.buffer_pool.fetch_page(page_id)?;
                let page = utils::heap_page_from_guard(&guard);
                if let Some((slot_id, data)) = page.next_record(self.current_slot)? {
                    self.current_slot = Some(slot_id);
                    let rid = Rid::new(page_id, slot_id);
                    return Ok(Some(Record::new(rid, data.to_vec())));
                }
            }

            // This page is done (or the scan has not started): move to the
            // next page number, or finish.
            let next_page = match self.current_page {
                Some(page_id) => page_id.0 + 1,
                None => 0,
            };
            if next_page >= self.buffer_pool.num_pages()? {
                self.exhausted = true;
                self.current_page = None;
                self.current_slot = None;
                return Ok(None);
            }
            self.current_page = Some(PageId(next_page));
            self.current_slot = None;
        }
    }
}

impl Iterator for HeapScan {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
