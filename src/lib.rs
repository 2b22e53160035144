//! StrataDB - a single-file, page-organized B+tree storage engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            StrataDB                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Index Layer (index/btree)                 │   │
//! │  │   BPlusTree: find_leaf / insert / delete / find_root     │   │
//! │  │   split · borrow · merge · root collapse · scan · dump   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓  page numbers                    │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                   Pager (pager/)                         │   │
//! │  │     page table · monotonic allocator · flush-all         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Storage Layer (storage/)                 │   │
//! │  │          DiskManager + Page + PageHeader + Row           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Key, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`pager`] - Page table and allocation
//! - [`index`] - The B+tree
//!
//! # Quick Start
//! ```no_run
//! use stratadb::BPlusTree;
//!
//! let mut tree = BPlusTree::open("my_table.db").unwrap();
//! tree.insert(42).unwrap();
//! tree.insert(7).unwrap();
//! assert_eq!(tree.scan().unwrap(), vec![7, 42]);
//! tree.close().unwrap();
//! ```

pub mod common;
pub mod index;
pub mod pager;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{Capacity, Config, PAGE_SIZE};
pub use common::{Error, Key, PageId, Result};

pub use index::btree::{BPlusTree, InternalNode};
pub use pager::{Pager, PagerStats};
pub use storage::page::{Page, PageHeader, PageType, Row};
pub use storage::DiskManager;
