//! Error types for StrataDB.

use thiserror::Error;

use crate::common::{Key, PageId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in StrataDB.
///
/// `KeyNotFound` and `DuplicateKey` are ordinary outcomes: the tree is left
/// untouched and the caller may carry on. Everything else means the file or
/// the configuration cannot be trusted for the rest of the session.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delete of a key that is not in the tree.
    #[error("key {0} not found")]
    KeyNotFound(Key),

    /// Insert of a key that is already in the tree.
    #[error("key {0} already exists")]
    DuplicateKey(Key),

    /// Page number at or past the configured ceiling.
    #[error("{page_id} is out of bounds (max pages: {max_pages})")]
    PageOutOfBounds { page_id: PageId, max_pages: u32 },

    /// Writing a page back failed; the flush stopped at this page.
    #[error("failed to flush {page_id}: {source}")]
    Flush {
        page_id: PageId,
        #[source]
        source: std::io::Error,
    },

    /// The configuration cannot describe a usable tree file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// On-disk structure violates a tree invariant.
    #[error("tree corrupted: {0}")]
    Corrupted(String),
}
