//! Configuration for StrataDB.
//!
//! Compile-time defaults live here as constants; [`Config`] carries the
//! runtime-selectable values and [`Capacity`] derives the node capacities
//! that follow from a page size.

use crate::common::{Error, Result};

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems. Smaller sizes are accepted at
/// runtime (see [`Config::with_page_size`]), which is how tests force
/// splits and merges with only a handful of keys.
pub const PAGE_SIZE: usize = 4096;

/// Size of the fixed page header in bytes.
pub const HEADER_SIZE: usize = 13;

/// Size of one leaf record (a single `i64` key).
pub const ROW_SIZE: usize = 8;

/// Size of one internal cell (a child pointer or a key).
pub const INTERNAL_CELL_SIZE: usize = 8;

/// Smallest body that holds one internal key plus the transient overflow
/// pair: `pointer, key, pointer` and two more slots.
pub const MIN_BODY_SLOTS: usize = 5;

/// Smallest page size accepted by [`Config::validate`].
pub const MIN_PAGE_SIZE: usize = HEADER_SIZE + MIN_BODY_SLOTS * INTERNAL_CELL_SIZE;

/// Default ceiling on page numbers.
///
/// Parent and sibling links are stored as signed 32-bit integers on disk
/// (-1 meaning "none"), so page numbers must stay within `i32::MAX`.
pub const DEFAULT_MAX_PAGES: u32 = i32::MAX as u32;

/// Runtime configuration for a tree file.
///
/// # Example
/// ```
/// use stratadb::Config;
///
/// let config = Config::default().with_page_size(60).with_max_pages(100);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.capacity().max_leaf_rows, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Page size in bytes.
    pub page_size: usize,
    /// Page numbers at or past this value are rejected.
    pub max_pages: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl Config {
    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the page number ceiling.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Check that the configuration describes a usable tree file.
    pub fn validate(&self) -> Result<()> {
        if self.page_size < MIN_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "page size {} is below the minimum of {}",
                self.page_size, MIN_PAGE_SIZE
            )));
        }
        if self.max_pages == 0 || self.max_pages > DEFAULT_MAX_PAGES {
            return Err(Error::InvalidConfig(format!(
                "max_pages must be between 1 and {}, got {}",
                DEFAULT_MAX_PAGES, self.max_pages
            )));
        }
        Ok(())
    }

    /// Node capacities implied by the page size.
    pub fn capacity(&self) -> Capacity {
        Capacity::for_page_size(self.page_size)
    }
}

/// Split and merge thresholds for one page size.
///
/// Both node kinds reserve room for one entry past their maximum so that
/// an insert can land first and the split can happen afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// A leaf splits once it holds more rows than this.
    pub max_leaf_rows: usize,
    /// Non-root leaves below this rebalance.
    pub min_leaf_rows: usize,
    /// Largest odd internal cell count (`2 * keys + 1`).
    pub max_internal_rows: usize,
    pub max_internal_keys: usize,
    pub min_internal_keys: usize,
}

impl Capacity {
    /// Derive capacities from a page size.
    ///
    /// The page size must already satisfy [`MIN_PAGE_SIZE`].
    pub fn for_page_size(page_size: usize) -> Self {
        let body_size = page_size.saturating_sub(HEADER_SIZE);

        let max_leaf_rows = (body_size / ROW_SIZE).saturating_sub(1);
        let min_leaf_rows = max_leaf_rows.div_ceil(2);

        let mut max_internal_rows = (body_size / INTERNAL_CELL_SIZE).saturating_sub(2);
        if max_internal_rows % 2 == 0 {
            max_internal_rows = max_internal_rows.saturating_sub(1);
        }
        let max_internal_keys = max_internal_rows / 2;
        let min_internal_keys = max_internal_keys.div_ceil(2);

        Self {
            max_leaf_rows,
            min_leaf_rows,
            max_internal_rows,
            max_internal_keys,
            min_internal_keys,
        }
    }
}
