//! Logical view of an internal page.

use crate::common::{Error, Key, PageId, Result};
use crate::storage::page::{Page, PageType};

/// An internal node as two parallel arrays.
///
/// On disk the node is a flat `ptr, key, ptr, ..., ptr` run of untagged
/// slots. The engine reads it into this form, edits the vectors, and
/// writes it back, so no rebalancing code has to track slot parity.
///
/// Invariant: `children.len() == keys.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub keys: Vec<Key>,
    pub children: Vec<PageId>,
}

impl InternalNode {
    /// A node with two children split by `key`.
    pub fn new(left: PageId, key: Key, right: PageId) -> Self {
        Self {
            keys: vec![key],
            children: vec![left, right],
        }
    }

    /// Decode the internal page `page_id`.
    ///
    /// # Errors
    /// `Error::Corrupted` if the page is not internal or its cell count is
    /// even.
    pub fn read(page_id: PageId, page: &Page) -> Result<Self> {
        if page.page_type() != PageType::Internal {
            return Err(Error::Corrupted(format!(
                "{} is {:?}, expected an internal node",
                page_id,
                page.page_type()
            )));
        }
        let count = page.cell_count();
        if count % 2 == 0 {
            return Err(Error::Corrupted(format!(
                "{} has an even internal cell count {}",
                page_id, count
            )));
        }

        let keys = (1..count).step_by(2).map(|i| page.internal_key(i)).collect();
        let children = (0..count)
            .step_by(2)
            .map(|i| page.internal_pointer(i))
            .collect();
        Ok(Self { keys, children })
    }

    /// Encode into `page`, leaving its parent link alone.
    pub fn write_to(&self, page: &mut Page) {
        debug_assert_eq!(self.children.len(), self.keys.len() + 1);

        page.set_page_type(PageType::Internal);
        for (i, &child) in self.children.iter().enumerate() {
            page.set_internal_pointer(2 * i, child);
        }
        for (i, &key) in self.keys.iter().enumerate() {
            page.set_internal_key(2 * i + 1, key);
        }
        page.set_cell_count(self.cell_count());
    }

    /// On-page cell count (`2 * keys + 1`).
    #[inline]
    pub fn cell_count(&self) -> usize {
        2 * self.keys.len() + 1
    }

    /// Position of `child` among the children.
    pub fn child_index(&self, child: PageId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Index of the child whose subtree may hold `key`: the child left of
    /// the first separator greater than `key`, or the last child.
    pub fn route(&self, key: Key) -> usize {
        self.keys.partition_point(|&k| k <= key)
    }
}
