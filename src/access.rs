//! Access layer for record-oriented operations.
//!
//! This module turns the storage layer's raw pages into a record manager:
//!
//! - **HeapFile**: a file of unordered variable-length records
//! - **Rid**: the stable (page, slot) address of one record
//! - **Record**: a payload copied out of its page, together with its Rid
//! - **HeapScan**: a cursor over every valid record in a file
//!
//! The access layer handles multi-page placement and traversal so callers
//! work with logical records rather than page offsets.

pub mod heap;
pub mod record;
pub mod scan;

pub use heap::HeapFile;
pub use record::{Record, Rid};
pub use scan::HeapScan;
