use std::fmt::Debug;

pub type FrameId = u32;

/// Eviction policy seam for the buffer pool. Frames move between pinned
/// (never evictable) and unpinned (fair game) as guards are taken and
/// dropped.
pub trait Replacer: Send + Sync + Debug {
    /// Select a frame to evict. Returns None if no frame can be evicted.
    fn evict(&mut self) -> Option<FrameId>;

    /// Mark a frame as pinned (not evictable).
    fn pin(&mut self, frame_id: FrameId);

    /// Mark a frame as unpinned (evictable).
    fn unpin(&mut self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}
