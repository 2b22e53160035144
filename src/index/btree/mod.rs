//! B+tree index over a paged file.
//!
//! # Layout
//! - Leaves hold sorted [`Row`](crate::storage::page::Row)s and link to the
//!   next leaf, so a scan walks the bottom level left to right.
//! - Internal nodes hold `ptr, key, ptr, ..., ptr`; the engine edits them
//!   through [`InternalNode`].
//! - The root is whichever page has no parent. It is found at open time by
//!   climbing parent links from page 0, which is always the leftmost leaf.
//!
//! # Components
//! - [`BPlusTree`] - search, insert, delete, root discovery
//! - [`InternalNode`] - logical view of an internal page
//! - diagnostics - scan, level-order dump, invariant checker

mod diagnostics;
mod node;
mod tree;

pub use node::InternalNode;
pub use tree::BPlusTree;
