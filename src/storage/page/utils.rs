//! Utility functions for page operations.

use crate::storage::buffer::PageReadGuard;
use crate::storage::page::HeapPage;
use crate::storage::PAGE_SIZE;

/// Create a temporary HeapPage view from a PageReadGuard.
///
/// The returned page borrows from the guard and must not outlive it; the
/// guard keeps the frame pinned, so the bytes stay resident for exactly
/// that long. Only the read-side operations are ever used on the result.
pub fn heap_page_from_guard(guard: &PageReadGuard) -> HeapPage<'_> {
    // SAFETY: the guard pins the frame, so the data neither moves nor gets
    // evicted while the view exists; the view does not outlive the guard;
    // the *mut cast only serves HeapPage's constructor signature and no
    // write goes through it.
    let page_data = unsafe { std::slice::from_raw_parts_mut(guard.as_ptr() as *mut u8, PAGE_SIZE) };
    let page_array = unsafe { &mut *(page_data.as_mut_ptr() as *mut [u8; PAGE_SIZE]) };
    HeapPage::from_data(page_array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::buffer::lru::LruReplacer;
    use crate::storage::buffer::BufferPoolManager;
    use crate::storage::error::StorageResult;
    use crate::storage::PageManager;
    use tempfile::tempdir;

    #[test]
    fn test_heap_page_from_guard() -> StorageResult<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.db");
        let page_manager = PageManager::create(&file_path)?;
        let replacer = Box::new(LruReplacer::new(10));
        let buffer_pool = BufferPoolManager::new(page_manager, replacer, 10);

        let (page_id, mut guard) = buffer_pool.new_page()?;
        let mut page = HeapPage::new(&mut guard);
        page.insert_record(b"via guard")?;
        drop(guard);

        let read_guard = buffer_pool.fetch_page(page_id)?;
        let page = heap_page_from_guard(&read_guard);
        assert_eq!(page.num_slots(), 1);
        assert_eq!(page.get_record(0)?, b"via guard");

        Ok(())
    }
}
