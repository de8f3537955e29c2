//! Storage layer for heapdb.
//!
//! This module provides the paged foundation the record manager sits on:
//!
//! - **PageManager**: one file of fixed-size (4KB) pages, the unit of I/O
//! - **BufferPoolManager**: in-memory page cache with pin/release guards
//!   and LRU eviction
//! - **HeapPage**: slotted page format for variable-length records
//!
//! The access layer never touches the disk directly; it obtains whole-page
//! buffers from the buffer pool and edits them through the slotted-page
//! operations.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPoolManager, PageReadGuard, PageWriteGuard};
pub use disk::{PageManager, PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::{HeapPage, PageId};
