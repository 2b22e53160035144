//! Page - the fixed-size unit of storage and of tree-node identity.
//!
//! A [`Page`] is a raw byte buffer with typed accessors for the header
//! fields and for the two cell formats:
//!
//! ```text
//! ┌──────────┬─────────────────────────────────────────────────────┐
//! │ header   │ body                                                │
//! │ 13 bytes │ leaf:     row0 row1 row2 ...                        │
//! │          │ internal: ptr0 key0 ptr1 key1 ... ptrN              │
//! └──────────┴─────────────────────────────────────────────────────┘
//! ```
//!
//! Internal cells are untagged 8-byte slots: even slots are child pointers,
//! odd slots are keys. The page never checks that a caller respects that
//! parity; the tree engine goes through
//! [`InternalNode`](crate::index::btree::InternalNode) instead.

use crate::common::config::{INTERNAL_CELL_SIZE, ROW_SIZE};
use crate::common::{Key, PageId};

use super::page_header::{read_u32, PageHeader, PageType};
use super::row::Row;

/// One 8-byte internal slot, typed by what the caller stores in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalCell {
    Pointer(PageId),
    Key(Key),
}

/// A page of data.
///
/// The size is chosen at runtime (see [`Config`](crate::Config)); every
/// page in one file has the same size.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code (copying a page
/// should be explicit). A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use stratadb::storage::page::{Page, Row};
///
/// let mut page = Page::new(60);
/// page.init_leaf();
/// page.set_leaf_row(0, Row::new(7));
/// page.set_cell_count(1);
/// assert_eq!(page.leaf_row(0).key, 7);
/// ```
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page.
    pub fn new(page_size: usize) -> Self {
        assert!(
            page_size >= PageHeader::SIZE,
            "page size {} cannot hold a header",
            page_size
        );
        Self {
            data: vec![0u8; page_size].into_boxed_slice(),
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of this page in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of 8-byte slots in the body (hard capacity, not the split
    /// threshold).
    #[inline]
    pub fn slot_count(&self) -> usize {
        (self.size() - PageHeader::SIZE) / INTERNAL_CELL_SIZE
    }

    /// CRC32 of the whole page image. Not stored anywhere.
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.data)
    }

    // ========================================================================
    // Header
    // ========================================================================

    fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data);
    }

    #[inline]
    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[PageHeader::OFFSET_PAGE_TYPE])
    }

    #[inline]
    pub fn set_page_type(&mut self, page_type: PageType) {
        self.data[PageHeader::OFFSET_PAGE_TYPE] = page_type as u8;
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.page_type() == PageType::Leaf
    }

    pub fn set_is_leaf(&mut self, is_leaf: bool) {
        self.set_page_type(if is_leaf {
            PageType::Leaf
        } else {
            PageType::Internal
        });
    }

    pub fn parent(&self) -> Option<PageId> {
        self.header().parent
    }

    pub fn set_parent(&mut self, parent: Option<PageId>) {
        let mut header = self.header();
        header.parent = parent;
        self.set_header(&header);
    }

    pub fn next_leaf(&self) -> Option<PageId> {
        self.header().next_leaf
    }

    pub fn set_next_leaf(&mut self, next: Option<PageId>) {
        let mut header = self.header();
        header.next_leaf = next;
        self.set_header(&header);
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        read_u32(&self.data, PageHeader::OFFSET_CELL_COUNT) as usize
    }

    /// # Panics
    /// Panics if `count` exceeds the number of body slots.
    pub fn set_cell_count(&mut self, count: usize) {
        assert!(
            count <= self.slot_count(),
            "cell count {} exceeds {} slots",
            count,
            self.slot_count()
        );
        let offset = PageHeader::OFFSET_CELL_COUNT;
        self.data[offset..offset + 4].copy_from_slice(&(count as u32).to_le_bytes());
    }

    /// Turn this page into an empty root leaf.
    pub fn init_leaf(&mut self) {
        self.set_header(&PageHeader::new(PageType::Leaf));
    }

    /// Turn this page into an empty, detached internal node.
    pub fn init_internal(&mut self) {
        self.set_header(&PageHeader::new(PageType::Internal));
    }

    /// Tag this page as abandoned. Its parent link is pointed at the page
    /// that absorbed it so that only the live root ever carries -1.
    pub fn mark_orphaned(&mut self, absorbed_by: PageId) {
        self.set_header(&PageHeader {
            page_type: PageType::Orphaned,
            parent: Some(absorbed_by),
            next_leaf: None,
            cell_count: 0,
        });
    }

    // ========================================================================
    // Leaf cells
    // ========================================================================

    /// Number of rows the body can physically hold.
    #[inline]
    pub fn leaf_slots(&self) -> usize {
        (self.size() - PageHeader::SIZE) / ROW_SIZE
    }

    fn leaf_offset(&self, index: usize) -> usize {
        assert!(
            index < self.leaf_slots(),
            "leaf slot {} out of range ({} slots)",
            index,
            self.leaf_slots()
        );
        PageHeader::SIZE + index * ROW_SIZE
    }

    pub fn leaf_row(&self, index: usize) -> Row {
        let offset = self.leaf_offset(index);
        Row::from_bytes(&self.data[offset..offset + ROW_SIZE])
    }

    #[inline]
    pub fn leaf_key(&self, index: usize) -> Key {
        self.leaf_row(index).key
    }

    pub fn set_leaf_row(&mut self, index: usize, row: Row) {
        let offset = self.leaf_offset(index);
        row.write_to(&mut self.data[offset..offset + ROW_SIZE]);
    }

    pub fn copy_leaf_row(&mut self, src: usize, dst: usize) {
        let src_offset = self.leaf_offset(src);
        let dst_offset = self.leaf_offset(dst);
        self.data
            .copy_within(src_offset..src_offset + ROW_SIZE, dst_offset);
    }

    /// Rows `0..cell_count` in slot order.
    pub fn leaf_rows(&self) -> Vec<Row> {
        (0..self.cell_count()).map(|i| self.leaf_row(i)).collect()
    }

    // ========================================================================
    // Internal cells
    // ========================================================================

    fn internal_offset(&self, index: usize) -> usize {
        assert!(
            index < self.slot_count(),
            "internal slot {} out of range ({} slots)",
            index,
            self.slot_count()
        );
        PageHeader::SIZE + index * INTERNAL_CELL_SIZE
    }

    fn read_slot(&self, index: usize) -> [u8; 8] {
        let offset = self.internal_offset(index);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + INTERNAL_CELL_SIZE]);
        buf
    }

    fn write_slot(&mut self, index: usize, bytes: [u8; 8]) {
        let offset = self.internal_offset(index);
        self.data[offset..offset + INTERNAL_CELL_SIZE].copy_from_slice(&bytes);
    }

    /// Read slot `index` as a key. Meaningful for odd indices.
    pub fn internal_key(&self, index: usize) -> Key {
        Key::from_le_bytes(self.read_slot(index))
    }

    pub fn set_internal_key(&mut self, index: usize, key: Key) {
        self.write_slot(index, key.to_le_bytes());
    }

    /// Read slot `index` as a child pointer. Meaningful for even indices.
    pub fn internal_pointer(&self, index: usize) -> PageId {
        PageId::new(u64::from_le_bytes(self.read_slot(index)) as u32)
    }

    pub fn set_internal_pointer(&mut self, index: usize, page_id: PageId) {
        self.write_slot(index, (page_id.0 as u64).to_le_bytes());
    }

    /// Copy one slot, whatever it holds.
    pub fn copy_internal_cell(&mut self, src: usize, dst: usize) {
        let bytes = self.read_slot(src);
        self.write_slot(dst, bytes);
    }

    /// Shift slots `at..cell_count` up by one, write `cell` at `at` and
    /// bump the cell count.
    pub fn insert_internal_cell(&mut self, at: usize, cell: InternalCell) {
        let count = self.cell_count();
        assert!(at <= count, "insert position {} past count {}", at, count);
        for i in (at..count).rev() {
            self.copy_internal_cell(i, i + 1);
        }
        match cell {
            InternalCell::Pointer(page_id) => self.set_internal_pointer(at, page_id),
            InternalCell::Key(key) => self.set_internal_key(at, key),
        }
        self.set_cell_count(count + 1);
    }

    /// Remove slot `at`, shifting the rest down by one.
    pub fn erase_internal_cell(&mut self, at: usize) {
        let count = self.cell_count();
        assert!(at < count, "erase position {} past count {}", at, count);
        for i in at + 1..count {
            self.copy_internal_cell(i, i - 1);
        }
        self.set_cell_count(count - 1);
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
