//! Storage layer error types.

use crate::storage::page::PageId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("page is full: requires {required} bytes but only {available} available")]
    PageFull { required: usize, available: usize },

    #[error("invalid slot {slot_id}: out of range or deleted (page has {num_slots} slots)")]
    InvalidSlot { slot_id: u16, num_slots: u16 },

    #[error("record of {size} bytes exceeds the page capacity of {max} bytes")]
    RecordTooLarge { size: usize, max: usize },

    #[error("page {0} does not exist")]
    PageNotFound(PageId),

    #[error("corrupted page: {0}")]
    Corrupted(String),

    #[error("buffer pool is full: cannot allocate new frame")]
    BufferPoolFull,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
