use crate::storage::error::{StorageError, StorageResult};
use crate::storage::PAGE_SIZE;

// Header structure (8 bytes)
const NUM_SLOTS_OFFSET: usize = 0;
const DATA_START_OFFSET: usize = 4;
pub const HEADER_SIZE: usize = 8;

// Slot entry (8 bytes: 4 for offset, 4 for length)
pub const SLOT_SIZE: usize = 8;

// A slot with this length has been deleted. Its offset is left as-is.
const DELETED: i32 = -1;

/// A slotted page: header at the front, slot array growing toward higher
/// offsets, record payloads packed from the page end toward lower offsets.
/// Slot indices are never reused; delete only invalidates the slot.
pub struct HeapPage<'a> {
    data: &'a mut [u8; PAGE_SIZE],
}

impl<'a> HeapPage<'a> {
    /// The largest record an empty page can hold.
    pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - HEADER_SIZE - SLOT_SIZE;

    /// Initialize a freshly allocated page: no slots, data heap at the page
    /// end. Must be called exactly once, before any other operation.
    pub fn new(data: &'a mut [u8; PAGE_SIZE]) -> Self {
        data[NUM_SLOTS_OFFSET..NUM_SLOTS_OFFSET + 4].copy_from_slice(&0u32.to_le_bytes());
        data[DATA_START_OFFSET..DATA_START_OFFSET + 4]
            .copy_from_slice(&(PAGE_SIZE as u32).to_le_bytes());
        Self { data }
    }

    /// Reattach to a page that was initialized earlier.
    pub fn from_data(data: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { data }
    }

    /// Space an insert of `record_len` bytes consumes: the payload plus one
    /// new slot entry.
    pub fn required_space_for(record_len: usize) -> usize {
        record_len + SLOT_SIZE
    }

    /// Append a record. Returns the new slot number, or `PageFull` without
    /// mutating anything if the gap between the slot array and the data heap
    /// is too small. O(1); no existing slot or payload moves.
    pub fn insert_record(&mut self, record: &[u8]) -> StorageResult<u16> {
        let (num_slots, data_start) = self.checked_header()?;

        let slot_array_end = HEADER_SIZE + num_slots as usize * SLOT_SIZE;
        let free_space = data_start - slot_array_end;
        let required = Self::required_space_for(record.len());
        if free_space < required {
            return Err(StorageError::PageFull {
                required,
                available: free_space,
            });
        }

        let new_data_start = data_start - record.len();
        self.data[new_data_start..data_start].copy_from_slice(record);
        self.write_slot(num_slots as usize, new_data_start as u32, record.len() as i32);
        self.set_data_start(new_data_start as u32);
        self.set_num_slots(num_slots + 1);

        Ok(num_slots as u16)
    }

    /// Lazily delete the record in `slot_id` by writing the deleted sentinel
    /// into its length. The payload bytes and the slot's offset are left in
    /// place; no space is reclaimed.
    pub fn delete_record(&mut self, slot_id: u16) -> StorageResult<()> {
        let (num_slots, _) = self.checked_header()?;
        let (_, length) = self.checked_slot(slot_id, num_slots)?;
        if length == DELETED {
            return Err(StorageError::InvalidSlot {
                slot_id,
                num_slots: num_slots as u16,
            });
        }
        self.set_slot_length(slot_id as usize, DELETED);
        Ok(())
    }

    /// Borrow the record in `slot_id`. The view is only valid while the page
    /// buffer is; callers that outlive the page must copy first.
    pub fn get_record(&self, slot_id: u16) -> StorageResult<&[u8]> {
        let (num_slots, _) = self.checked_header()?;
        let (offset, length) = self.checked_slot(slot_id, num_slots)?;
        if length == DELETED {
            return Err(StorageError::InvalidSlot {
                slot_id,
                num_slots: num_slots as u16,
            });
        }
        self.payload(offset, length)
    }

    /// Find the first valid slot strictly after `after` (`None` starts at
    /// slot 0). `Ok(None)` means no valid slot remains on this page.
    /// Chaining calls from each returned slot visits every valid record
    /// exactly once, in ascending slot order.
    pub fn next_record(&self, after: Option<u16>) -> StorageResult<Option<(u16, &[u8])>> {
        let (num_slots, _) = self.checked_header()?;
        let start = match after {
            Some(slot) => slot as u32 + 1,
            None => 0,
        };
        for slot in start..num_slots {
            let (offset, length) = self.read_slot(slot as usize);
            if length != DELETED {
                return Ok(Some((slot as u16, self.payload(offset, length)?)));
            }
        }
        Ok(None)
    }

    /// Bytes left between the slot array and the data heap.
    pub fn free_space(&self) -> usize {
        let slot_array_end = HEADER_SIZE + self.num_slots_raw() as usize * SLOT_SIZE;
        (self.data_start_raw() as usize).saturating_sub(slot_array_end)
    }

    /// Slots ever allocated on this page, including deleted ones.
    pub fn num_slots(&self) -> u16 {
        self.num_slots_raw() as u16
    }

    /// Current start of the data heap.
    pub fn data_start(&self) -> usize {
        self.data_start_raw() as usize
    }

    /// Validate the header against the page bounds before trusting it.
    fn checked_header(&self) -> StorageResult<(u32, usize)> {
        let num_slots = self.num_slots_raw();
        let data_start = self.data_start_raw() as usize;
        let slot_array_end = HEADER_SIZE + num_slots as usize * SLOT_SIZE;
        if slot_array_end > PAGE_SIZE || data_start > PAGE_SIZE || data_start < slot_array_end {
            return Err(StorageError::Corrupted(format!(
                "header out of bounds: {} slots, data heap at {}",
                num_slots, data_start
            )));
        }
        Ok((num_slots, data_start))
    }

    /// Range-check a slot number and read its entry.
    fn checked_slot(&self, slot_id: u16, num_slots: u32) -> StorageResult<(u32, i32)> {
        if slot_id as u32 >= num_slots {
            return Err(StorageError::InvalidSlot {
                slot_id,
                num_slots: num_slots as u16,
            });
        }
        Ok(self.read_slot(slot_id as usize))
    }

    /// Range-check a slot's recorded payload location.
    fn payload(&self, offset: u32, length: i32) -> StorageResult<&[u8]> {
        if length < 0 {
            return Err(StorageError::Corrupted(format!(
                "negative record length {}",
                length
            )));
        }
        let start = offset as usize;
        let end = start + length as usize;
        if start < HEADER_SIZE || end > PAGE_SIZE {
            return Err(StorageError::Corrupted(format!(
                "record bytes [{}, {}) fall outside the page",
                start, end
            )));
        }
        Ok(&self.data[start..end])
    }

    fn read_slot(&self, slot: usize) -> (u32, i32) {
        let base = HEADER_SIZE + slot * SLOT_SIZE;
        let offset = u32::from_le_bytes([
            self.data[base],
            self.data[base + 1],
            self.data[base + 2],
            self.data[base + 3],
        ]);
        let length = i32::from_le_bytes([
            self.data[base + 4],
            self.data[base + 5],
            self.data[base + 6],
            self.data[base + 7],
        ]);
        (offset, length)
    }

    fn write_slot(&mut self, slot: usize, offset: u32, length: i32) {
        let base = HEADER_SIZE + slot * SLOT_SIZE;
        self.data[base..base + 4].copy_from_slice(&offset.to_le_bytes());
        self.data[base + 4..base + 8].copy_from_slice(&length.to_le_bytes());
    }

    fn set_slot_length(&mut self, slot: usize, length: i32) {
        let base = HEADER_SIZE + slot * SLOT_SIZE;
        self.data[base + 4..base + 8].copy_from_slice(&length.to_le_bytes());
    }

    fn num_slots_raw(&self) -> u32 {
        u32::from_le_bytes([
            self.data[NUM_SLOTS_OFFSET],
            self.data[NUM_SLOTS_OFFSET + 1],
            self.data[NUM_SLOTS_OFFSET + 2],
            self.data[NUM_SLOTS_OFFSET + 3],
        ])
    }

    fn set_num_slots(&mut self, count: u32) {
        self.data[NUM_SLOTS_OFFSET..NUM_SLOTS_OFFSET + 4].copy_from_slice(&count.to_le_bytes());
    }

    fn data_start_raw(&self) -> u32 {
        u32::from_le_bytes([
            self.data[DATA_START_OFFSET],
            self.data[DATA_START_OFFSET + 1],
            self.data[DATA_START_OFFSET + 2],
            self.data[DATA_START_OFFSET + 3],
        ])
    }

    fn set_data_start(&mut self, data_start: u32) {
        self.data[DATA_START_OFFSET..DATA_START_OFFSET + 4]
            .copy_from_slice(&data_start.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        let mut data = Box::new([0xFFu8; PAGE_SIZE]);
        let page = HeapPage::new(&mut data);

        assert_eq!(page.num_slots(), 0);
        assert_eq!(page.data_start(), PAGE_SIZE);
        assert_eq!(page.free_space(), PAGE_SIZE - HEADER_SIZE);
    }

    #[test]
    fn test_insert_and_get() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        let rec1 = b"This is the first record.";
        let rec2 = b"This is a slightly longer, second record.";

        let slot1 = page.insert_record(rec1)?;
        let slot2 = page.insert_record(rec2)?;
        assert_eq!(slot1, 0);
        assert_eq!(slot2, 1);

        assert_eq!(page.get_record(slot1)?, rec1);
        assert_eq!(page.get_record(slot2)?, rec2);
        assert_eq!(page.num_slots(), 2);

        Ok(())
    }

    #[test]
    fn test_layout_after_three_inserts() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        page.insert_record(&[b'a'; 27])?;
        page.insert_record(&[b'b'; 44])?;
        page.insert_record(&[b'c'; 23])?;

        assert_eq!(page.num_slots(), 3);
        assert_eq!(page.data_start(), PAGE_SIZE - 27 - 44 - 23);

        // Payloads pack from the page end down, each slot recording where
        // its record landed.
        assert_eq!(page.read_slot(0), (4069, 27));
        assert_eq!(page.read_slot(1), (4025, 44));
        assert_eq!(page.read_slot(2), (4002, 23));

        drop(page);

        // The on-page encoding is two little-endian u32 header fields
        // followed by (u32 offset, i32 length) slot entries.
        assert_eq!(&data[0..4], &3u32.to_le_bytes());
        assert_eq!(&data[4..8], &4002u32.to_le_bytes());
        assert_eq!(&data[16..20], &4025u32.to_le_bytes());
        assert_eq!(&data[20..24], &44i32.to_le_bytes());

        Ok(())
    }

    #[test]
    fn test_delete_keeps_other_slots_intact() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        page.insert_record(&[b'a'; 27])?;
        page.insert_record(&[b'b'; 44])?;
        page.insert_record(&[b'c'; 23])?;

        page.delete_record(1)?;

        assert!(matches!(
            page.get_record(1),
            Err(StorageError::InvalidSlot { slot_id: 1, .. })
        ));
        // Lazy delete: only the length changed, the offset survives.
        assert_eq!(page.read_slot(1), (4025, DELETED));
        assert_eq!(page.read_slot(0), (4069, 27));
        assert_eq!(page.read_slot(2), (4002, 23));
        assert_eq!(page.get_record(0)?, &[b'a'; 27]);
        assert_eq!(page.get_record(2)?, &[b'c'; 23]);
        assert_eq!(page.data_start(), 4002);

        Ok(())
    }

    #[test]
    fn test_invalid_delete_mutates_nothing() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);
        page.insert_record(b"only record")?;
        page.delete_record(0)?;
        drop(page);

        let before = *data;
        let mut page = HeapPage::from_data(&mut data);

        // Out of range.
        assert!(matches!(
            page.delete_record(5),
            Err(StorageError::InvalidSlot { slot_id: 5, .. })
        ));
        // Already deleted.
        assert!(matches!(
            page.delete_record(0),
            Err(StorageError::InvalidSlot { slot_id: 0, .. })
        ));
        drop(page);

        assert_eq!(&before[..], &data[..]);
        Ok(())
    }

    #[test]
    fn test_page_full_leaves_page_untouched() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        let record = vec![0xAA; 1000];
        let mut inserted = 0;
        while page.free_space() >= HeapPage::required_space_for(record.len()) {
            page.insert_record(&record)?;
            inserted += 1;
        }
        assert!(inserted > 0);

        let num_slots = page.num_slots();
        let data_start = page.data_start();
        assert!(matches!(
            page.insert_record(&record),
            Err(StorageError::PageFull { .. })
        ));
        assert_eq!(page.num_slots(), num_slots);
        assert_eq!(page.data_start(), data_start);

        Ok(())
    }

    #[test]
    fn test_next_record_skips_deleted() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        page.insert_record(&[b'a'; 27])?;
        page.insert_record(&[b'b'; 44])?;
        page.insert_record(&[b'c'; 23])?;
        page.delete_record(1)?;

        let (slot, record) = page.next_record(None)?.expect("first valid slot");
        assert_eq!(slot, 0);
        assert_eq!(record.len(), 27);

        let (slot, record) = page.next_record(Some(slot))?.expect("second valid slot");
        assert_eq!(slot, 2);
        assert_eq!(record.len(), 23);

        assert!(page.next_record(Some(slot))?.is_none());
        Ok(())
    }

    #[test]
    fn test_next_record_on_empty_page() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let page = HeapPage::new(&mut data);
        assert!(page.next_record(None)?.is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_slot_on_empty_page() {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let page = HeapPage::new(&mut data);
        assert!(page.get_record(0).is_err());
        assert!(page.get_record(100).is_err());
    }

    #[test]
    fn test_empty_record() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        let slot = page.insert_record(&[])?;
        assert_eq!(page.get_record(slot)?.len(), 0);
        assert_eq!(page.data_start(), PAGE_SIZE);
        Ok(())
    }

    #[test]
    fn test_max_record_fills_fresh_page() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        let mut page = HeapPage::new(&mut data);

        let record = vec![0x5A; HeapPage::MAX_RECORD_SIZE];
        let slot = page.insert_record(&record)?;
        assert_eq!(page.get_record(slot)?, &record[..]);
        assert_eq!(page.free_space(), 0);
        Ok(())
    }

    #[test]
    fn test_corrupted_header_is_reported() {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        HeapPage::new(&mut data);
        // A data heap start beyond the page end cannot be trusted.
        data[4..8].copy_from_slice(&(PAGE_SIZE as u32 + 1).to_le_bytes());

        let mut page = HeapPage::from_data(&mut data);
        assert!(matches!(
            page.insert_record(b"x"),
            Err(StorageError::Corrupted(_))
        ));
    }

    #[test]
    fn test_reattach_existing_page() -> StorageResult<()> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        {
            let mut page = HeapPage::new(&mut data);
            page.insert_record(b"persistent record")?;
        }
        {
            let page = HeapPage::from_data(&mut data);
            assert_eq!(page.num_slots(), 1);
            assert_eq!(page.get_record(0)?, b"persistent record");
        }
        Ok(())
    }
}
