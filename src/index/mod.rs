//! Index structures.
//!
//! - [`btree`] - B+tree keyed by `i64`

pub mod btree;
