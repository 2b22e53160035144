//! Ordered traversal, level-order dump and structural checks.

use std::collections::VecDeque;
use std::fmt::Write as _;

use crate::common::{Error, Key, PageId, Result};
use crate::storage::page::PageType;

use super::node::InternalNode;
use super::tree::BPlusTree;

impl BPlusTree {
    /// Every key in ascending order, read along the leaf chain.
    pub fn scan(&mut self) -> Result<Vec<Key>> {
        Ok(self
            .leaves()?
            .into_iter()
            .flat_map(|(_, keys)| keys)
            .collect())
    }

    /// Each leaf with its keys, in chain order.
    pub fn leaves(&mut self) -> Result<Vec<(PageId, Vec<Key>)>> {
        let mut leaves = Vec::new();
        let mut current = Some(self.find_leaf(self.root, Key::MIN)?);

        while let Some(page_id) = current {
            if leaves.len() > self.pager.page_count() as usize {
                return Err(Error::Corrupted("leaf chain loops".to_string()));
            }
            let page = self.pager.page(page_id)?;
            let keys = page.leaf_rows().into_iter().map(|row| row.key).collect();
            leaves.push((page_id, keys));
            current = page.next_leaf();
        }
        Ok(leaves)
    }

    /// Number of keys in the tree.
    pub fn len(&mut self) -> Result<usize> {
        Ok(self.leaves()?.iter().map(|(_, keys)| keys.len()).sum())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Render the tree level by level, one page per line.
    ///
    /// ```text
    /// level 0
    ///   Page(2) internal [5]
    /// level 1
    ///   Page(0) leaf [1, 2, 3]
    ///   Page(1) leaf [5, 8, 9]
    /// ```
    pub fn dump(&mut self) -> Result<String> {
        let mut out = String::new();
        let mut queue = VecDeque::from([(self.root, 0usize)]);
        let mut current_level = None;

        while let Some((page_id, level)) = queue.pop_front() {
            if current_level != Some(level) {
                let _ = writeln!(out, "level {}", level);
                current_level = Some(level);
            }
            let page = self.pager.page(page_id)?;
            if page.is_leaf() {
                let keys: Vec<Key> = page.leaf_rows().into_iter().map(|row| row.key).collect();
                let _ = writeln!(out, "  {} leaf {:?}", page_id, keys);
            } else {
                let node = InternalNode::read(page_id, page)?;
                let _ = writeln!(out, "  {} internal {:?}", page_id, node.keys);
                queue.extend(node.children.iter().map(|&child| (child, level + 1)));
            }
        }
        Ok(out)
    }

    /// Verify the structural invariants of the whole file.
    ///
    /// Checks, in order: key ordering and separator bounds in every node,
    /// parent links, node capacities, uniform leaf depth, the leaf chain
    /// (which must start at page 0), and that the root is the only page
    /// without a parent and is what root discovery finds.
    ///
    /// Minimum occupancy is not checked.
    ///
    /// # Errors
    /// `Error::Corrupted` describing the first violation found.
    pub fn check_invariants(&mut self) -> Result<()> {
        if self.pager.page(self.root)?.parent().is_some() {
            return Err(corrupted(format!("root {} has a parent", self.root)));
        }

        let mut leaves = Vec::new();
        let mut leaf_depth = None;
        self.check_subtree(self.root, None, None, 0, &mut leaf_depth, &mut leaves)?;

        if leaves.first() != Some(&PageId::new(0)) {
            return Err(corrupted(format!(
                "leftmost leaf is {:?}, expected Page(0)",
                leaves.first()
            )));
        }
        let chain: Vec<PageId> = self.leaves()?.into_iter().map(|(id, _)| id).collect();
        if chain != leaves {
            return Err(corrupted(format!(
                "leaf chain {:?} differs from tree order {:?}",
                chain, leaves
            )));
        }

        let mut roots = Vec::new();
        for id in 0..self.pager.page_count() {
            let page_id = PageId::new(id);
            if self.pager.page(page_id)?.parent().is_none() {
                roots.push(page_id);
            }
        }
        if roots != [self.root] {
            return Err(corrupted(format!(
                "pages without a parent: {:?}, expected only {}",
                roots, self.root
            )));
        }

        let discovered = self.find_root()?;
        if discovered != self.root {
            return Err(corrupted(format!(
                "root discovery found {}, expected {}",
                discovered, self.root
            )));
        }
        Ok(())
    }

    /// Check one subtree whose keys must lie in `[lower, upper)`.
    fn check_subtree(
        &mut self,
        page_id: PageId,
        lower: Option<Key>,
        upper: Option<Key>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<PageId>,
    ) -> Result<()> {
        if depth > self.pager.page_count() as usize {
            return Err(corrupted(format!("{} is part of a cycle", page_id)));
        }
        let in_bounds = |key: Key| lower.map_or(true, |lo| key >= lo) && upper.map_or(true, |hi| key < hi);

        match self.page_type(page_id)? {
            PageType::Orphaned => Err(corrupted(format!("{} is orphaned but reachable", page_id))),
            PageType::Leaf => {
                let page = self.pager.page(page_id)?;
                if page.cell_count() > self.capacity.max_leaf_rows {
                    return Err(corrupted(format!(
                        "leaf {} holds {} rows (max {})",
                        page_id,
                        page.cell_count(),
                        self.capacity.max_leaf_rows
                    )));
                }
                let keys: Vec<Key> = page.leaf_rows().into_iter().map(|row| row.key).collect();
                check_sorted(page_id, &keys)?;
                if let Some(&key) = keys.iter().find(|&&key| !in_bounds(key)) {
                    return Err(corrupted(format!(
                        "leaf {} key {} outside [{:?}, {:?})",
                        page_id, key, lower, upper
                    )));
                }

                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(corrupted(format!(
                            "leaf {} at depth {}, other leaves at {}",
                            page_id, depth, expected
                        )));
                    }
                    Some(_) => {}
                }
                leaves.push(page_id);
                Ok(())
            }
            PageType::Internal => {
                let node = InternalNode::read(page_id, self.pager.page(page_id)?)?;
                if node.cell_count() > self.capacity.max_internal_rows {
                    return Err(corrupted(format!(
                        "internal {} holds {} cells (max {})",
                        page_id,
                        node.cell_count(),
                        self.capacity.max_internal_rows
                    )));
                }
                check_sorted(page_id, &node.keys)?;
                if let Some(&key) = node.keys.iter().find(|&&key| !in_bounds(key)) {
                    return Err(corrupted(format!(
                        "internal {} key {} outside [{:?}, {:?})",
                        page_id, key, lower, upper
                    )));
                }

                for (i, &child) in node.children.iter().enumerate() {
                    let parent = self.pager.page(child)?.parent();
                    if parent != Some(page_id) {
                        return Err(corrupted(format!(
                            "{} lists child {} whose parent is {:?}",
                            page_id, child, parent
                        )));
                    }
                    let child_lower = if i == 0 { lower } else { Some(node.keys[i - 1]) };
                    let child_upper = node.keys.get(i).copied().or(upper);
                    self.check_subtree(child, child_lower, child_upper, depth + 1, leaf_depth, leaves)?;
                }
                Ok(())
            }
        }
    }
}

fn check_sorted(page_id: PageId, keys: &[Key]) -> Result<()> {
    match keys.windows(2).find(|pair| pair[0] >= pair[1]) {
        Some(pair) => Err(corrupted(format!(
            "{} keys out of order: {} then {}",
            page_id, pair[0], pair[1]
        ))),
        None => Ok(()),
    }
}

fn corrupted(reason: String) -> Error {
    Error::Corrupted(reason)
}
