//! Page table management.
//!
//! The pager is the in-memory layer between the tree engine and the file.
//! It keeps every page it has touched resident for the life of the session.
//!
//! # Components
//! - [`Pager`] - Page table, allocator, flush
//! - [`PagerStats`] - I/O counters

#[allow(clippy::module_inception)]
mod pager;
mod stats;

pub use pager::Pager;
pub use stats::PagerStats;
