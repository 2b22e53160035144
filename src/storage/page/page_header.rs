//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`] containing the node metadata:
//! - [`PageType`] discriminator (internal / leaf / orphaned)
//! - parent link, used for root discovery and upward propagation
//! - next-leaf link, forming the ordered leaf chain
//! - cell count

use crate::common::config::HEADER_SIZE;
use crate::common::PageId;

/// Kind of node stored in a page.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
/// A zeroed page reads back as `Internal`, so freshly allocated pages must
/// be initialized explicitly before use.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Separator keys and child pointers.
    #[default]
    Internal = 0,
    /// Sorted records plus the next-leaf link.
    Leaf = 1,
    /// Abandoned by a merge or root collapse. Never reused.
    Orphaned = 2,
}

impl PageType {
    /// Convert from u8, treating unknown values as orphaned.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => PageType::Internal,
            1 => PageType::Leaf,
            _ => PageType::Orphaned,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (13 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     parent (i32, -1 = root, little-endian)
/// 5       4     next_leaf (i32, -1 = end of chain, little-endian)
/// 9       4     cell_count (u32, little-endian)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Kind of this page.
    pub page_type: PageType,
    /// Parent page, `None` for the root.
    pub parent: Option<PageId>,
    /// Next leaf in key order, `None` for the last leaf.
    pub next_leaf: Option<PageId>,
    /// Number of cells in the body.
    pub cell_count: u32,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self::new(PageType::Leaf)
    }
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    /// Offset of each field within the header.
    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_PARENT: usize = 1;
    pub const OFFSET_NEXT_LEAF: usize = 5;
    pub const OFFSET_CELL_COUNT: usize = 9;

    /// Create a detached, empty header of the given type.
    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type,
            parent: None,
            next_leaf: None,
            cell_count: 0,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            parent: PageId::from_link(read_i32(data, Self::OFFSET_PARENT)),
            next_leaf: PageId::from_link(read_i32(data, Self::OFFSET_NEXT_LEAF)),
            cell_count: read_u32(data, Self::OFFSET_CELL_COUNT),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_PARENT..Self::OFFSET_PARENT + 4]
            .copy_from_slice(&PageId::to_link(self.parent).to_le_bytes());
        data[Self::OFFSET_NEXT_LEAF..Self::OFFSET_NEXT_LEAF + 4]
            .copy_from_slice(&PageId::to_link(self.next_leaf).to_le_bytes());
        data[Self::OFFSET_CELL_COUNT..Self::OFFSET_CELL_COUNT + 4]
            .copy_from_slice(&self.cell_count.to_le_bytes());
    }
}

pub(crate) fn read_i32(data: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

// ============================================================================
// TESTS
// ============================================================================
