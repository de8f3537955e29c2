pub mod lru;
pub mod replacer;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::storage::{PageManager, PAGE_SIZE};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use replacer::{FrameId, Replacer};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

struct Frame {
    data: Box<[u8; PAGE_SIZE]>,
    page_id: Option<PageId>,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
            page_id: None,
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    fn reset(&mut self) {
        self.page_id = None;
        self.pin_count.store(0, Ordering::SeqCst);
        self.is_dirty.store(false, Ordering::SeqCst);
        self.data.fill(0);
    }
}

/// In-memory cache of pages with pin/release semantics.
///
/// Pages are handed out as RAII guards: a [`PageReadGuard`] releases its page
/// unmodified on drop, a [`PageWriteGuard`] marks it dirty at fetch time and
/// the dirty page is written back on eviction or flush. A pinned frame is
/// never evicted, so guards double as residency proofs for any borrowed view
/// into the page.
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    page_table: DashMap<PageId, FrameId>,
    frames: RwLock<HashMap<FrameId, Frame>>,
    replacer: Mutex<Box<dyn Replacer>>,
    page_manager: Mutex<PageManager>,
    next_frame_id: AtomicU32,
    max_frames: usize,
}

impl BufferPoolManager {
    pub fn new(page_manager: PageManager, replacer: Box<dyn Replacer>, max_frames: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                page_table: DashMap::new(),
                frames: RwLock::new(HashMap::with_capacity(max_frames)),
                replacer: Mutex::new(replacer),
                page_manager: Mutex::new(page_manager),
                next_frame_id: AtomicU32::new(0),
                max_frames,
            }),
        }
    }

    /// Pin an existing page for reading. The page is released unmodified
    /// when the guard drops.
    pub fn fetch_page(&self, page_id: PageId) -> StorageResult<PageReadGuard> {
        let frame_id = self.pin_frame(page_id, false)?;
        let frames = self.inner.frames.read();
        let frame = frames.get(&frame_id).ok_or(StorageError::BufferPoolFull)?;
        let data = frame.data.as_ref() as *const [u8; PAGE_SIZE];
        Ok(PageReadGuard {
            inner: self.inner.clone(),
            frame_id,
            data,
        })
    }

    /// Pin an existing page for writing. The page is marked dirty up front
    /// and written back whenever it leaves the pool.
    pub fn fetch_page_write(&self, page_id: PageId) -> StorageResult<PageWriteGuard> {
        let frame_id = self.pin_frame(page_id, true)?;
        let mut frames = self.inner.frames.write();
        let frame = frames
            .get_mut(&frame_id)
            .ok_or(StorageError::BufferPoolFull)?;
        let data = frame.data.as_mut() as *mut [u8; PAGE_SIZE];
        drop(frames);
        Ok(PageWriteGuard {
            inner: self.inner.clone(),
            frame_id,
            data,
        })
    }

    /// Allocate a fresh page at the end of the file and pin it for writing.
    /// The buffer starts zeroed; callers initialize it before unpinning.
    pub fn new_page(&self) -> StorageResult<(PageId, PageWriteGuard)> {
        let frame_id = self.free_frame()?;
        let page_id = match self.inner.page_manager.lock().allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                // The claimed frame is still empty; hand it back to the
                // replacer instead of stranding it.
                self.inner.replacer.lock().unpin(frame_id);
                return Err(e);
            }
        };

        let mut frames = self.inner.frames.write();
        let frame = frames
            .get_mut(&frame_id)
            .ok_or(StorageError::BufferPoolFull)?;
        frame.reset();
        frame.page_id = Some(page_id);
        frame.pin_count.store(1, Ordering::SeqCst);
        frame.is_dirty.store(true, Ordering::SeqCst);
        let data = frame.data.as_mut() as *mut [u8; PAGE_SIZE];
        drop(frames);

        self.inner.page_table.insert(page_id, frame_id);
        self.inner.replacer.lock().pin(frame_id);

        Ok((
            page_id,
            PageWriteGuard {
                inner: self.inner.clone(),
                frame_id,
                data,
            },
        ))
    }

    /// Pages currently in the file, resident or not. Page numbers are dense,
    /// so ascending iteration over `0..num_pages()` visits the whole file.
    pub fn num_pages(&self) -> StorageResult<u32> {
        self.inner.page_manager.lock().num_pages()
    }

    pub fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        if let Some(frame_id) = self.inner.page_table.get(&page_id).map(|e| *e.value()) {
            let frames = self.inner.frames.read();
            if let Some(frame) = frames.get(&frame_id) {
                if frame.is_dirty.load(Ordering::SeqCst) {
                    self.inner
                        .page_manager
                        .lock()
                        .write_page(page_id, frame.data.as_ref())?;
                    frame.is_dirty.store(false, Ordering::SeqCst);
                }
            }
        }
        Ok(())
    }

    pub fn flush_all(&self) -> StorageResult<()> {
        let frames = self.inner.frames.read();
        let mut page_manager = self.inner.page_manager.lock();

        for frame in frames.values() {
            if let Some(page_id) = frame.page_id {
                if frame.is_dirty.load(Ordering::SeqCst) {
                    page_manager.write_page(page_id, frame.data.as_ref())?;
                    frame.is_dirty.store(false, Ordering::SeqCst);
                }
            }
        }

        Ok(())
    }

    /// Make `page_id` resident and pinned, loading it from disk on a miss.
    fn pin_frame(&self, page_id: PageId, dirty: bool) -> StorageResult<FrameId> {
        if let Some(frame_id) = self.inner.page_table.get(&page_id).map(|e| *e.value()) {
            let frames = self.inner.frames.read();
            if let Some(frame) = frames.get(&frame_id) {
                frame.pin_count.fetch_add(1, Ordering::SeqCst);
                if dirty {
                    frame.is_dirty.store(true, Ordering::SeqCst);
                }
                self.inner.replacer.lock().pin(frame_id);
                return Ok(frame_id);
            }
        }

        let frame_id = self.free_frame()?;
        let loaded = {
            let mut page_manager = self.inner.page_manager.lock();
            let mut frames = self.inner.frames.write();
            let frame = frames
                .get_mut(&frame_id)
                .ok_or(StorageError::BufferPoolFull)?;
            page_manager
                .read_page(page_id, frame.data.as_mut())
                .map(|()| {
                    frame.page_id = Some(page_id);
                    frame.pin_count.store(1, Ordering::SeqCst);
                    frame.is_dirty.store(dirty, Ordering::SeqCst);
                })
        };
        if let Err(e) = loaded {
            // The frame never received the page; make it evictable again so
            // repeated failed fetches cannot drain the pool.
            self.inner.replacer.lock().unpin(frame_id);
            return Err(e);
        }

        self.inner.page_table.insert(page_id, frame_id);
        self.inner.replacer.lock().pin(frame_id);
        Ok(frame_id)
    }

    /// Produce an empty frame, growing the pool up to its limit and evicting
    /// an unpinned page (written back first if dirty) beyond that.
    fn free_frame(&self) -> StorageResult<FrameId> {
        {
            let mut frames = self.inner.frames.write();
            if frames.len() < self.inner.max_frames {
                let frame_id = self.inner.next_frame_id.fetch_add(1, Ordering::SeqCst);
                frames.insert(frame_id, Frame::new());
                return Ok(frame_id);
            }
        }

        let victim = self
            .inner
            .replacer
            .lock()
            .evict()
            .ok_or(StorageError::BufferPoolFull)?;

        // Write back the victim without holding the frames lock, then reset.
        let evicted = {
            let frames = self.inner.frames.read();
            frames.get(&victim).and_then(|frame| {
                frame
                    .page_id
                    .map(|id| (id, frame.is_dirty.load(Ordering::SeqCst), frame.data.clone()))
            })
        };
        if let Some((old_page_id, dirty, data)) = evicted {
            if dirty {
                self.inner
                    .page_manager
                    .lock()
                    .write_page(old_page_id, data.as_ref())?;
            }
            self.inner.page_table.remove(&old_page_id);
        }

        let mut frames = self.inner.frames.write();
        if let Some(frame) = frames.get_mut(&victim) {
            frame.reset();
        }

        Ok(victim)
    }

    fn unpin(inner: &BufferPoolInner, frame_id: FrameId) {
        let last_pin = {
            let frames = inner.frames.read();
            match frames.get(&frame_id) {
                Some(frame) => frame.pin_count.fetch_sub(1, Ordering::SeqCst) == 1,
                None => false,
            }
        };
        if last_pin {
            inner.replacer.lock().unpin(frame_id);
        }
    }
}

pub struct PageReadGuard {
    inner: Arc<BufferPoolInner>,
    frame_id: FrameId,
    data: *const [u8; PAGE_SIZE],
}

impl Deref for PageReadGuard {
    type Target = [u8; PAGE_SIZE];

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.data }
    }
}

impl Drop for PageReadGuard {
    fn drop(&mut self) {
        BufferPoolManager::unpin(&self.inner, self.frame_id);
    }
}

pub struct PageWriteGuard {
    inner: Arc<BufferPoolInner>,
    frame_id: FrameId,
    data: *mut [u8; PAGE_SIZE],
}

impl Deref for PageWriteGuard {
    type Target = [u8; PAGE_SIZE];

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.data }
    }
}

impl DerefMut for PageWriteGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.data }
    }
}

impl Drop for PageWriteGuard {
    fn drop(&mut self) {
        BufferPoolManager::unpin(&self.inner, self.frame_id);
    }
}

// The raw pointers track pinned frames whose storage never moves while the
// guard lives, so the guards can cross threads like the references they
// stand in for.
unsafe impl Send for PageReadGuard {}
unsafe impl Sync for PageReadGuard {}
unsafe impl Send for PageWriteGuard {}
unsafe impl Sync for PageWriteGuard {}
