//! Common types and utilities shared across StrataDB.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and runtime [`Config`](config::Config)
//! - Error types
//! - Identifiers ([`PageId`], [`Key`])

pub mod config;
pub mod error;
mod page_id;

pub use error::{Error, Result};
pub use page_id::PageId;

/// Record key. Ordering is plain signed integer ordering.
pub type Key = i64;
