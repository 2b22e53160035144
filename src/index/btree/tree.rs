//! B+tree engine: descent, root discovery, insertion and deletion.
//!
//! Separators follow one rule everywhere: for child `i` of an internal
//! node, every key below it is `>= keys[i-1]` and `< keys[i]`. A split
//! promotes the first key of the new right-hand page, descent sends a key
//! equal to a separator right, and borrows reset the separator to the first
//! key of the right-hand page.
//!
//! A leaf of `n` rows splits at `(n - 1) / 2`: the left page keeps the rows
//! before it and the row at the split point moves right and is promoted.

use std::path::Path;

use log::{debug, info, warn};

use crate::common::config::{Capacity, Config};
use crate::common::{Error, Key, PageId, Result};
use crate::pager::{Pager, PagerStats};
use crate::storage::page::{PageType, Row};

use super::node::InternalNode;

/// A B+tree of `i64` keys stored in one paged file.
///
/// # Example
/// ```
/// use stratadb::{BPlusTree, Config, Error};
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = Config::default().with_page_size(60);
/// let mut tree = BPlusTree::open_with(dir.path().join("t.db"), config).unwrap();
///
/// for key in [5, 3, 8, 1, 9, 2] {
///     tree.insert(key).unwrap();
/// }
/// assert!(matches!(tree.insert(3), Err(Error::DuplicateKey(3))));
/// tree.delete(8).unwrap();
/// assert_eq!(tree.scan().unwrap(), vec![1, 2, 3, 5, 9]);
/// tree.close().unwrap();
/// ```
pub struct BPlusTree {
    pub(super) pager: Pager,
    pub(super) root: PageId,
    pub(super) capacity: Capacity,
}

impl BPlusTree {
    /// Open a tree file with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, Config::default())
    }

    /// Open (or create) a tree file and discover its root.
    ///
    /// A file must always be reopened with the page size it was created
    /// with; the page size is not recorded in the file.
    pub fn open_with<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        let pager = Pager::open(path, config)?;
        let mut tree = Self {
            pager,
            root: PageId::new(0),
            capacity: config.capacity(),
        };
        tree.root = tree.find_root()?;

        info!(
            "opened tree: {} pages, root {}",
            tree.pager.page_count(),
            tree.root
        );
        Ok(tree)
    }

    /// Current root page.
    #[inline]
    pub fn root(&self) -> PageId {
        self.root
    }

    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn pager_stats(&self) -> PagerStats {
        self.pager.stats()
    }

    /// Page numbers in use, including orphaned pages.
    pub fn page_count(&self) -> u32 {
        self.pager.page_count()
    }

    /// CRC32 of every resident page, in page order.
    pub fn fingerprint(&self) -> Vec<(PageId, u32)> {
        self.pager.fingerprint()
    }

    /// Write every resident page back to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.pager.flush_all()
    }

    /// Flush and release the file.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        info!("closed tree: {} pages, root {}", self.pager.page_count(), self.root);
        Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Follow parent links up from page 0 until a page without a parent.
    ///
    /// # Errors
    /// `Error::Corrupted` if the chain is longer than the number of pages
    /// (a cycle).
    pub fn find_root(&mut self) -> Result<PageId> {
        let mut current = PageId::new(0);
        for _ in 0..=self.pager.page_count() {
            match self.pager.page(current)?.parent() {
                None => return Ok(current),
                Some(parent) => current = parent,
            }
        }
        Err(Error::Corrupted(
            "parent chain from page 0 does not reach a root".to_string(),
        ))
    }

    /// Descend from `root` to the leaf whose key range covers `key`.
    pub fn find_leaf(&mut self, root: PageId, key: Key) -> Result<PageId> {
        let mut current = root;
        for _ in 0..=self.pager.page_count() {
            let page = self.pager.page(current)?;
            if page.is_leaf() {
                return Ok(current);
            }
            let node = InternalNode::read(current, page)?;
            current = node.children[node.route(key)];
        }
        Err(Error::Corrupted(format!(
            "descent from {} does not reach a leaf",
            root
        )))
    }

    /// Whether `key` is in the tree.
    pub fn search(&mut self, key: Key) -> Result<bool> {
        let leaf_id = self.find_leaf(self.root, key)?;
        let page = self.pager.page(leaf_id)?;
        Ok((0..page.cell_count()).any(|i| page.leaf_key(i) == key))
    }

    // ========================================================================
    // Insert
    // ========================================================================

    /// Insert `key`.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if the key is present; nothing changes
    /// - `Error::PageOutOfBounds` if the splits this insert triggers would
    ///   need pages past `max_pages`; nothing changes
    pub fn insert(&mut self, key: Key) -> Result<()> {
        let leaf_id = self.find_leaf(self.root, key)?;
        let (pos, count) = {
            let page = self.pager.page(leaf_id)?;
            let count = page.cell_count();
            let mut pos = count;
            while pos > 0 {
                let existing = page.leaf_key(pos - 1);
                if existing == key {
                    return Err(Error::DuplicateKey(key));
                }
                if existing < key {
                    break;
                }
                pos -= 1;
            }
            (pos, count)
        };

        // A split must never fail halfway, so the pages are checked up front.
        if count + 1 > self.capacity.max_leaf_rows {
            let needed = self.split_cost(leaf_id)?;
            self.pager.ensure_room(needed)?;
        }

        let page = self.pager.page_mut(leaf_id)?;
        for i in (pos..count).rev() {
            page.copy_leaf_row(i, i + 1);
        }
        page.set_leaf_row(pos, Row::new(key));
        page.set_cell_count(count + 1);

        if count + 1 > self.capacity.max_leaf_rows {
            self.split_leaf(leaf_id)?;
        }
        Ok(())
    }

    /// Pages a split starting at `leaf_id` allocates: the new leaf, one per
    /// full ancestor, and a new root if every ancestor is full.
    fn split_cost(&mut self, leaf_id: PageId) -> Result<u32> {
        let mut needed = 1;
        let mut current = leaf_id;
        for _ in 0..=self.pager.page_count() {
            let Some(parent_id) = self.pager.page(current)?.parent() else {
                return Ok(needed + 1);
            };
            let node = InternalNode::read(parent_id, self.pager.page(parent_id)?)?;
            if node.keys.len() < self.capacity.max_internal_keys {
                return Ok(needed);
            }
            needed += 1;
            current = parent_id;
        }
        Err(Error::Corrupted(format!(
            "parent chain from {} does not reach a root",
            leaf_id
        )))
    }

    /// Move the upper half of an overflowing leaf into a new right sibling.
    fn split_leaf(&mut self, left_id: PageId) -> Result<()> {
        let (rows, parent, next) = {
            let page = self.pager.page(left_id)?;
            (page.leaf_rows(), page.parent(), page.next_leaf())
        };
        let mid = (rows.len() - 1) / 2;
        let separator = rows[mid].key;

        let right_id = self.pager.allocate()?;
        {
            let right = self.pager.page_mut(right_id)?;
            right.init_leaf();
            right.set_parent(parent);
            right.set_next_leaf(next);
            for (i, row) in rows[mid..].iter().enumerate() {
                right.set_leaf_row(i, *row);
            }
            right.set_cell_count(rows.len() - mid);
        }
        {
            let left = self.pager.page_mut(left_id)?;
            left.set_cell_count(mid);
            left.set_next_leaf(Some(right_id));
        }

        debug!(
            "split leaf {} at key {}: {} rows stay, {} move to {}",
            left_id,
            separator,
            mid,
            rows.len() - mid,
            right_id
        );
        self.insert_into_parent(left_id, separator, right_id)
    }

    /// Hang `right` next to `left` in their parent under `key`, growing a
    /// new root or splitting the parent as needed.
    fn insert_into_parent(&mut self, left: PageId, key: Key, right: PageId) -> Result<()> {
        let Some(parent_id) = self.pager.page(left)?.parent() else {
            let root_id = self.pager.allocate()?;
            {
                let page = self.pager.page_mut(root_id)?;
                page.init_internal();
                InternalNode::new(left, key, right).write_to(page);
            }
            self.set_parent(left, Some(root_id))?;
            self.set_parent(right, Some(root_id))?;
            self.root = root_id;

            debug!("new root {} over {} and {}", root_id, left, right);
            return Ok(());
        };

        let mut node = InternalNode::read(parent_id, self.pager.page(parent_id)?)?;
        let at = node
            .child_index(left)
            .ok_or_else(|| not_a_child(left, parent_id))?;
        node.keys.insert(at, key);
        node.children.insert(at + 1, right);
        self.set_parent(right, Some(parent_id))?;

        if node.keys.len() <= self.capacity.max_internal_keys {
            node.write_to(self.pager.page_mut(parent_id)?);
            return Ok(());
        }
        self.split_internal(parent_id, node)
    }

    /// Split an overfull internal node, promoting its middle key.
    fn split_internal(&mut self, page_id: PageId, node: InternalNode) -> Result<()> {
        let mid = (node.keys.len() - 1) / 2;
        let promoted = node.keys[mid];
        let left = InternalNode {
            keys: node.keys[..mid].to_vec(),
            children: node.children[..=mid].to_vec(),
        };
        let right = InternalNode {
            keys: node.keys[mid + 1..].to_vec(),
            children: node.children[mid + 1..].to_vec(),
        };

        let parent = self.pager.page(page_id)?.parent();
        let right_id = self.pager.allocate()?;
        {
            let page = self.pager.page_mut(right_id)?;
            page.init_internal();
            page.set_parent(parent);
            right.write_to(page);
        }
        left.write_to(self.pager.page_mut(page_id)?);
        for &child in &right.children {
            self.set_parent(child, Some(right_id))?;
        }

        debug!(
            "split internal {} at key {}: {} keys stay, {} move to {}",
            page_id,
            promoted,
            left.keys.len(),
            right.keys.len(),
            right_id
        );
        self.insert_into_parent(page_id, promoted, right_id)
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Remove `key`.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if the key is absent; nothing changes.
    pub fn delete(&mut self, key: Key) -> Result<()> {
        let leaf_id = self.find_leaf(self.root, key)?;
        let page = self.pager.page_mut(leaf_id)?;
        let count = page.cell_count();

        let pos = (0..count)
            .find(|&i| page.leaf_key(i) == key)
            .ok_or(Error::KeyNotFound(key))?;
        for i in pos + 1..count {
            page.copy_leaf_row(i, i - 1);
        }
        page.set_cell_count(count - 1);

        if leaf_id == self.root || count - 1 >= self.capacity.min_leaf_rows {
            return Ok(());
        }
        self.rebalance_leaf(leaf_id)
    }

    /// Refill an underflowing non-root leaf: borrow from the left, borrow
    /// from the right, merge with the left, merge with the right.
    fn rebalance_leaf(&mut self, leaf_id: PageId) -> Result<()> {
        let parent_id = self.parent_of(leaf_id)?;
        let mut parent = InternalNode::read(parent_id, self.pager.page(parent_id)?)?;
        let idx = parent
            .child_index(leaf_id)
            .ok_or_else(|| not_a_child(leaf_id, parent_id))?;
        let left = idx.checked_sub(1).map(|i| parent.children[i]);
        let right = parent.children.get(idx + 1).copied();
        let min = self.capacity.min_leaf_rows;

        if let Some(left_id) = left {
            if self.pager.page(left_id)?.cell_count() > min {
                let row = {
                    let page = self.pager.page_mut(left_id)?;
                    let n = page.cell_count();
                    let row = page.leaf_row(n - 1);
                    page.set_cell_count(n - 1);
                    row
                };
                {
                    let page = self.pager.page_mut(leaf_id)?;
                    let n = page.cell_count();
                    for i in (0..n).rev() {
                        page.copy_leaf_row(i, i + 1);
                    }
                    page.set_leaf_row(0, row);
                    page.set_cell_count(n + 1);
                }
                parent.keys[idx - 1] = row.key;
                parent.write_to(self.pager.page_mut(parent_id)?);

                debug!("leaf {} borrowed key {} from {}", leaf_id, row.key, left_id);
                return Ok(());
            }
        }

        if let Some(right_id) = right {
            if self.pager.page(right_id)?.cell_count() > min {
                let (row, new_first) = {
                    let page = self.pager.page_mut(right_id)?;
                    let n = page.cell_count();
                    let row = page.leaf_row(0);
                    for i in 1..n {
                        page.copy_leaf_row(i, i - 1);
                    }
                    page.set_cell_count(n - 1);
                    (row, page.leaf_key(0))
                };
                {
                    let page = self.pager.page_mut(leaf_id)?;
                    let n = page.cell_count();
                    page.set_leaf_row(n, row);
                    page.set_cell_count(n + 1);
                }
                parent.keys[idx] = new_first;
                parent.write_to(self.pager.page_mut(parent_id)?);

                debug!("leaf {} borrowed key {} from {}", leaf_id, row.key, right_id);
                return Ok(());
            }
        }

        if left.is_none() && right.is_none() {
            warn!("leaf {} underflows but is an only child", leaf_id);
            return Ok(());
        }
        let candidates = [
            left.map(|left_id| (left_id, leaf_id, idx - 1)),
            right.map(|right_id| (leaf_id, right_id, idx)),
        ];
        for (left_id, right_id, separator) in candidates.into_iter().flatten() {
            if self.merge_leaves(left_id, right_id)? {
                return self.delete_internal(parent_id, separator);
            }
        }

        warn!("leaf {} underflows and no sibling has room to merge", leaf_id);
        Ok(())
    }

    /// Append `right_id`'s rows to `left_id` and orphan `right_id`.
    /// Returns `false` (and changes nothing) if the rows would not fit.
    fn merge_leaves(&mut self, left_id: PageId, right_id: PageId) -> Result<bool> {
        let (rows, next) = {
            let page = self.pager.page(right_id)?;
            (page.leaf_rows(), page.next_leaf())
        };

        let max = self.capacity.max_leaf_rows;
        let left = self.pager.page_mut(left_id)?;
        let n = left.cell_count();
        if n + rows.len() > max {
            return Ok(false);
        }
        for (i, row) in rows.iter().enumerate() {
            left.set_leaf_row(n + i, *row);
        }
        left.set_cell_count(n + rows.len());
        left.set_next_leaf(next);

        self.pager.page_mut(right_id)?.mark_orphaned(left_id);
        debug!("merged leaf {} into {}", right_id, left_id);
        Ok(true)
    }

    /// Remove separator `key_idx` (and the child to its right) from an
    /// internal node, then collapse the root or rebalance as needed.
    fn delete_internal(&mut self, page_id: PageId, key_idx: usize) -> Result<()> {
        let mut node = InternalNode::read(page_id, self.pager.page(page_id)?)?;
        node.keys.remove(key_idx);
        node.children.remove(key_idx + 1);

        if page_id == self.root && node.keys.is_empty() {
            let child = node.children[0];
            self.set_parent(child, None)?;
            self.pager.page_mut(page_id)?.mark_orphaned(child);
            self.root = child;

            debug!("root collapsed from {} to {}", page_id, child);
            return Ok(());
        }

        node.write_to(self.pager.page_mut(page_id)?);
        if page_id == self.root || node.keys.len() >= self.capacity.min_internal_keys {
            return Ok(());
        }
        self.rebalance_internal(page_id)
    }

    /// Refill an underflowing non-root internal node, with the same
    /// preference order as leaves. Borrowing rotates through the parent
    /// separator.
    fn rebalance_internal(&mut self, page_id: PageId) -> Result<()> {
        let parent_id = self.parent_of(page_id)?;
        let mut parent = InternalNode::read(parent_id, self.pager.page(parent_id)?)?;
        let idx = parent
            .child_index(page_id)
            .ok_or_else(|| not_a_child(page_id, parent_id))?;
        let left = idx.checked_sub(1).map(|i| parent.children[i]);
        let right = parent.children.get(idx + 1).copied();
        let min = self.capacity.min_internal_keys;

        let mut node = InternalNode::read(page_id, self.pager.page(page_id)?)?;

        if let Some(left_id) = left {
            let mut sibling = InternalNode::read(left_id, self.pager.page(left_id)?)?;
            if sibling.keys.len() > min {
                if let (Some(key), Some(child)) = (sibling.keys.pop(), sibling.children.pop()) {
                    node.keys.insert(0, parent.keys[idx - 1]);
                    node.children.insert(0, child);
                    parent.keys[idx - 1] = key;

                    sibling.write_to(self.pager.page_mut(left_id)?);
                    node.write_to(self.pager.page_mut(page_id)?);
                    parent.write_to(self.pager.page_mut(parent_id)?);
                    self.set_parent(child, Some(page_id))?;

                    debug!("internal {} borrowed {} from {}", page_id, child, left_id);
                    return Ok(());
                }
            }
        }

        if let Some(right_id) = right {
            let mut sibling = InternalNode::read(right_id, self.pager.page(right_id)?)?;
            if sibling.keys.len() > min {
                let key = sibling.keys.remove(0);
                let child = sibling.children.remove(0);
                node.keys.push(parent.keys[idx]);
                node.children.push(child);
                parent.keys[idx] = key;

                sibling.write_to(self.pager.page_mut(right_id)?);
                node.write_to(self.pager.page_mut(page_id)?);
                parent.write_to(self.pager.page_mut(parent_id)?);
                self.set_parent(child, Some(page_id))?;

                debug!("internal {} borrowed {} from {}", page_id, child, right_id);
                return Ok(());
            }
        }

        if left.is_none() && right.is_none() {
            warn!("internal {} underflows but is an only child", page_id);
            return Ok(());
        }
        // Left merge first; the right merge can still fit when the right
        // sibling is itself under the floor.
        let candidates = [
            left.map(|left_id| (left_id, page_id, idx - 1)),
            right.map(|right_id| (page_id, right_id, idx)),
        ];
        for (left_id, right_id, separator) in candidates.into_iter().flatten() {
            if self.merge_internal(left_id, right_id, parent.keys[separator])? {
                return self.delete_internal(parent_id, separator);
            }
        }

        warn!(
            "internal {} underflows and no sibling has room to merge; it stays under the floor",
            page_id
        );
        Ok(())
    }

    /// Pull `separator` down between two siblings and fold `right_id` into
    /// `left_id`. Returns `false` (and changes nothing) if the result would
    /// exceed the key capacity.
    fn merge_internal(&mut self, left_id: PageId, right_id: PageId, separator: Key) -> Result<bool> {
        let mut left = InternalNode::read(left_id, self.pager.page(left_id)?)?;
        let right = InternalNode::read(right_id, self.pager.page(right_id)?)?;
        if left.keys.len() + 1 + right.keys.len() > self.capacity.max_internal_keys {
            return Ok(false);
        }

        left.keys.push(separator);
        left.keys.extend_from_slice(&right.keys);
        left.children.extend_from_slice(&right.children);
        left.write_to(self.pager.page_mut(left_id)?);
        for &child in &right.children {
            self.set_parent(child, Some(left_id))?;
        }
        self.pager.page_mut(right_id)?.mark_orphaned(left_id);

        debug!("merged internal {} into {}", right_id, left_id);
        Ok(true)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn set_parent(&mut self, page_id: PageId, parent: Option<PageId>) -> Result<()> {
        self.pager.page_mut(page_id)?.set_parent(parent);
        Ok(())
    }

    fn parent_of(&mut self, page_id: PageId) -> Result<PageId> {
        self.pager
            .page(page_id)?
            .parent()
            .ok_or_else(|| Error::Corrupted(format!("non-root {} has no parent", page_id)))
    }

    /// Kind of `page_id`, loading it if needed.
    pub(super) fn page_type(&mut self, page_id: PageId) -> Result<PageType> {
        Ok(self.pager.page(page_id)?.page_type())
    }
}

fn not_a_child(child: PageId, parent: PageId) -> Error {
    Error::Corrupted(format!("{} is not listed as a child of {}", child, parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// 60-byte pages: 4 rows per leaf, 1 key per internal node.
    fn create_small_tree() -> (BPlusTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let config = Config::default().with_page_size(60);
        (BPlusTree::open_with(&path, config).unwrap(), dir)
    }

    fn leaf_keys(tree: &mut BPlusTree, page_id: PageId) -> Vec<Key> {
        let page = tree.pager.page(page_id).unwrap();
        page.leaf_rows().into_iter().map(|row| row.key).collect()
    }

    fn internal(tree: &mut BPlusTree, page_id: PageId) -> InternalNode {
        InternalNode::read(page_id, tree.pager.page(page_id).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_tree_root_is_page_zero() {
        let (mut tree, _dir) = create_small_tree();
        assert_eq!(tree.root(), PageId::new(0));
        assert_eq!(tree.find_root().unwrap(), PageId::new(0));
        assert!(!tree.search(1).unwrap());
    }

    #[test]
    fn test_insert_keeps_leaf_sorted() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8, 1] {
            tree.insert(key).unwrap();
        }
        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![1, 3, 5, 8]);
        assert_eq!(tree.root(), PageId::new(0));
        assert_eq!(tree.pager_stats().pages_allocated, 0);
    }

    #[test]
    fn test_fifth_insert_splits_leaf_and_grows_root() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8, 1, 9] {
            tree.insert(key).unwrap();
        }

        // One new leaf plus one new root.
        assert_eq!(tree.pager_stats().pages_allocated, 2);
        let root = tree.root();
        assert_eq!(root, PageId::new(2));
        assert_eq!(
            internal(&mut tree, root),
            InternalNode::new(PageId::new(0), 5, PageId::new(1))
        );
        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![1, 3]);
        assert_eq!(leaf_keys(&mut tree, PageId::new(1)), vec![5, 8, 9]);

        let left = tree.pager.page(PageId::new(0)).unwrap();
        assert_eq!(left.next_leaf(), Some(PageId::new(1)));
        assert_eq!(left.parent(), Some(root));

        tree.insert(2).unwrap();
        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![1, 2, 3]);
        assert_eq!(tree.pager_stats().pages_allocated, 2);
    }

    #[test]
    fn test_duplicate_insert_rejected_without_change() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8] {
            tree.insert(key).unwrap();
        }
        let before = tree.fingerprint();
        assert!(matches!(tree.insert(3), Err(Error::DuplicateKey(3))));
        assert_eq!(tree.fingerprint(), before);
    }

    #[test]
    fn test_key_equal_to_separator_lives_right() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8, 1, 9] {
            tree.insert(key).unwrap();
        }
        assert_eq!(tree.find_leaf(tree.root(), 5).unwrap(), PageId::new(1));
        assert_eq!(tree.find_leaf(tree.root(), 4).unwrap(), PageId::new(0));
        assert!(tree.search(5).unwrap());
        tree.delete(5).unwrap();
        assert!(!tree.search(5).unwrap());
    }

    #[test]
    fn test_internal_split_promotes_middle_key() {
        let (mut tree, _dir) = create_small_tree();
        for key in 1..=7 {
            tree.insert(key).unwrap();
        }
        // Leaves: 0:[1,2] 1:[3,4] 3:[5,6,7]. Root 2 overflowed with keys
        // [3, 5]: 3 moved up to new root 5, right half [5] went to page 4.
        let root = tree.root();
        assert_eq!(root, PageId::new(5));
        assert_eq!(
            internal(&mut tree, root),
            InternalNode::new(PageId::new(2), 3, PageId::new(4))
        );
        assert_eq!(
            internal(&mut tree, PageId::new(4)),
            InternalNode::new(PageId::new(1), 5, PageId::new(3))
        );
        let left = internal(&mut tree, PageId::new(2));
        assert!(left.keys.is_empty());
        assert_eq!(left.children, vec![PageId::new(0)]);

        // Moved children point at their new parent.
        for child in [1, 3] {
            let page = tree.pager.page(PageId::new(child)).unwrap();
            assert_eq!(page.parent(), Some(PageId::new(4)));
        }
        assert_eq!(tree.find_root().unwrap(), root);
    }

    #[test]
    fn test_delete_missing_key_is_byte_identical() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8, 1, 9, 2] {
            tree.insert(key).unwrap();
        }
        let before = tree.fingerprint();
        assert!(matches!(tree.delete(4), Err(Error::KeyNotFound(4))));
        assert_eq!(tree.fingerprint(), before);
    }

    #[test]
    fn test_delete_borrows_from_left() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8, 1, 9, 2] {
            tree.insert(key).unwrap();
        }
        tree.delete(5).unwrap();
        tree.delete(8).unwrap();

        // Leaf 1 fell to [9]; leaf 0 had 3 rows and gave up its last one.
        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![1, 2]);
        assert_eq!(leaf_keys(&mut tree, PageId::new(1)), vec![3, 9]);
        let root = tree.root();
        assert_eq!(internal(&mut tree, root).keys, vec![3]);
    }

    #[test]
    fn test_delete_borrows_from_right() {
        let (mut tree, _dir) = create_small_tree();
        for key in 1..=5 {
            tree.insert(key).unwrap();
        }
        tree.delete(1).unwrap();

        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![2, 3]);
        assert_eq!(leaf_keys(&mut tree, PageId::new(1)), vec![4, 5]);
        let root = tree.root();
        assert_eq!(internal(&mut tree, root).keys, vec![4]);
    }

    #[test]
    fn test_merge_collapses_root() {
        let (mut tree, _dir) = create_small_tree();
        for key in [5, 3, 8, 1, 9, 2] {
            tree.insert(key).unwrap();
        }
        let old_root = tree.root();
        for key in [5, 8, 9] {
            tree.delete(key).unwrap();
        }

        // Leaf 1 merged into leaf 0, the root lost its only key and the
        // merged leaf took over.
        assert_eq!(tree.root(), PageId::new(0));
        assert_eq!(tree.find_root().unwrap(), PageId::new(0));
        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![1, 2, 3]);

        let page0 = tree.pager.page(PageId::new(0)).unwrap();
        assert_eq!(page0.parent(), None);
        assert_eq!(page0.next_leaf(), None);

        for orphan in [PageId::new(1), old_root] {
            let page = tree.pager.page(orphan).unwrap();
            assert_eq!(page.page_type(), PageType::Orphaned);
            assert_eq!(page.parent(), Some(PageId::new(0)));
        }
    }

    #[test]
    fn test_root_leaf_may_underflow() {
        let (mut tree, _dir) = create_small_tree();
        tree.insert(1).unwrap();
        tree.delete(1).unwrap();
        assert_eq!(tree.root(), PageId::new(0));
        assert_eq!(tree.pager.page(PageId::new(0)).unwrap().cell_count(), 0);
        assert!(matches!(tree.delete(1), Err(Error::KeyNotFound(1))));
    }

    #[test]
    fn test_page_ceiling_rejects_insert_before_any_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let config = Config::default().with_page_size(60).with_max_pages(2);
        let mut tree = BPlusTree::open_with(&path, config).unwrap();

        for key in 1..=4 {
            tree.insert(key).unwrap();
        }
        let before = tree.fingerprint();

        // The split would take page 1 and the new root page 2.
        assert!(matches!(
            tree.insert(5),
            Err(Error::PageOutOfBounds { page_id: PageId(2), max_pages: 2 })
        ));
        assert_eq!(tree.fingerprint(), before);
        assert_eq!(tree.page_count(), 1);
        assert!(!tree.search(5).unwrap());
        assert_eq!(tree.scan().unwrap(), vec![1, 2, 3, 4]);
        tree.check_invariants().unwrap();

        // Inserts that fit without a split still work.
        tree.delete(1).unwrap();
        tree.insert(5).unwrap();
        assert_eq!(tree.scan().unwrap(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_odd_leaf_capacity_splits_before_median() {
        // 61-byte pages hold 5 rows per leaf.
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let config = Config::default().with_page_size(61);
        let mut tree = BPlusTree::open_with(&path, config).unwrap();
        assert_eq!(tree.capacity().max_leaf_rows, 5);

        for key in 1..=6 {
            tree.insert(key).unwrap();
        }
        assert_eq!(leaf_keys(&mut tree, PageId::new(0)), vec![1, 2]);
        assert_eq!(leaf_keys(&mut tree, PageId::new(1)), vec![3, 4, 5, 6]);
        let root = tree.root();
        assert_eq!(
            internal(&mut tree, root),
            InternalNode::new(PageId::new(0), 3, PageId::new(1))
        );
        tree.check_invariants().unwrap();
    }

    /// 85-byte pages: 8 rows per leaf (min 4), 3 keys per internal node
    /// (min 2).
    fn create_medium_tree() -> (BPlusTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let config = Config::default().with_page_size(85);
        (BPlusTree::open_with(&path, config).unwrap(), dir)
    }

    /// Lay out a root over internal nodes over leaves. `groups[i]` lists
    /// the first keys of the leaves under internal node `i`; each leaf holds
    /// four consecutive keys. Leaves take pages from 0, internal nodes come
    /// next and the root is last.
    fn build_two_levels(tree: &mut BPlusTree, groups: &[&[Key]]) {
        let leaf_count: usize = groups.iter().map(|g| g.len()).sum();
        let root_id = PageId::new((leaf_count + groups.len()) as u32);
        for _ in 0..root_id.0 {
            tree.pager.allocate().unwrap();
        }

        let mut leaf = 0u32;
        let mut root = InternalNode {
            keys: Vec::new(),
            children: Vec::new(),
        };
        for (g, firsts) in groups.iter().enumerate() {
            let node_id = PageId::new((leaf_count + g) as u32);
            let mut node = InternalNode {
                keys: firsts[1..].to_vec(),
                children: Vec::new(),
            };
            for &first in firsts.iter() {
                let page = tree.pager.page_mut(PageId::new(leaf)).unwrap();
                page.init_leaf();
                page.set_parent(Some(node_id));
                if (leaf as usize) + 1 < leaf_count {
                    page.set_next_leaf(Some(PageId::new(leaf + 1)));
                }
                for i in 0..4 {
                    page.set_leaf_row(i, Row::new(first + i as Key));
                }
                page.set_cell_count(4);
                node.children.push(PageId::new(leaf));
                leaf += 1;
            }

            let page = tree.pager.page_mut(node_id).unwrap();
            page.init_internal();
            page.set_parent(Some(root_id));
            node.write_to(page);

            if g > 0 {
                root.keys.push(firsts[0]);
            }
            root.children.push(node_id);
        }

        let page = tree.pager.page_mut(root_id).unwrap();
        page.init_internal();
        root.write_to(page);
        tree.root = root_id;
        tree.check_invariants().unwrap();
    }

    fn node(keys: &[Key], children: &[u32]) -> InternalNode {
        InternalNode {
            keys: keys.to_vec(),
            children: children.iter().map(|&c| PageId::new(c)).collect(),
        }
    }

    #[test]
    fn test_internal_borrow_from_left_rotates_separator() {
        let (mut tree, _dir) = create_medium_tree();
        // Leaves 0-3 under page 7, leaves 4-6 under page 8, root page 9.
        build_two_levels(&mut tree, &[&[0, 10, 20, 30], &[100, 110, 120]]);

        // Leaves 4 and 5 merge, page 8 drops to one key and takes leaf 3
        // from page 7 through the root separator.
        tree.delete(110).unwrap();

        assert_eq!(internal(&mut tree, PageId::new(9)), node(&[30], &[7, 8]));
        assert_eq!(internal(&mut tree, PageId::new(7)), node(&[10, 20], &[0, 1, 2]));
        assert_eq!(
            internal(&mut tree, PageId::new(8)),
            node(&[100, 120], &[3, 4, 6])
        );
        let moved = tree.pager.page(PageId::new(3)).unwrap();
        assert_eq!(moved.parent(), Some(PageId::new(8)));
        tree.check_invariants().unwrap();
        assert!(!tree.search(110).unwrap());
        assert!(tree.search(30).unwrap());
    }

    #[test]
    fn test_internal_borrow_from_right_rotates_separator() {
        let (mut tree, _dir) = create_medium_tree();
        // Leaves 0-2 under page 7, leaves 3-6 under page 8, root page 9.
        build_two_levels(&mut tree, &[&[0, 10, 20], &[100, 110, 120, 130]]);

        // Leaves 0 and 1 merge, page 7 drops to one key and takes leaf 3
        // from page 8 through the root separator.
        tree.delete(10).unwrap();

        assert_eq!(internal(&mut tree, PageId::new(9)), node(&[110], &[7, 8]));
        assert_eq!(
            internal(&mut tree, PageId::new(7)),
            node(&[20, 100], &[0, 2, 3])
        );
        assert_eq!(
            internal(&mut tree, PageId::new(8)),
            node(&[120, 130], &[4, 5, 6])
        );
        let moved = tree.pager.page(PageId::new(3)).unwrap();
        assert_eq!(moved.parent(), Some(PageId::new(7)));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_internal_merges_right_when_left_is_too_full() {
        let (mut tree, _dir) = create_medium_tree();
        // Leaves 0-2 under page 8, 3-5 under page 9, 6-7 under page 10
        // (already one key short), root page 11.
        build_two_levels(&mut tree, &[&[0, 10, 20], &[100, 110, 120], &[200, 210]]);

        // Page 9 drops to one key. Merging with page 8 would need four
        // keys, merging with page 10 needs three.
        tree.delete(110).unwrap();

        assert_eq!(internal(&mut tree, PageId::new(11)), node(&[100], &[8, 9]));
        assert_eq!(
            internal(&mut tree, PageId::new(9)),
            node(&[120, 200, 210], &[3, 5, 6, 7])
        );
        let absorbed = tree.pager.page(PageId::new(10)).unwrap();
        assert_eq!(absorbed.page_type(), PageType::Orphaned);
        assert_eq!(absorbed.parent(), Some(PageId::new(9)));
        for leaf in [6, 7] {
            let page = tree.pager.page(PageId::new(leaf)).unwrap();
            assert_eq!(page.parent(), Some(PageId::new(9)));
        }
        tree.check_invariants().unwrap();
    }
}
