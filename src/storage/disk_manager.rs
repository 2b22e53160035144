//! Disk Manager - low-level file I/O for tree pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages at fixed offsets
//! - Tracking how many pages the file spans
//! - Syncing the file at the end of a flush

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single tree file.
///
/// # File Layout
/// The tree is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0     P       2P       ...      N×P        (P = page size)
/// ```
///
/// The file length does not have to be a multiple of the page size; a
/// trailing partial page counts as a page and reads back zero-padded.
///
/// # Durability
/// Writes are not synced individually. The pager writes every resident page
/// and then calls [`DiskManager::sync`] once.
pub struct DiskManager {
    file: File,
    page_size: usize,
    /// Number of pages the file spans, rounded up.
    page_count: u32,
}

impl DiskManager {
    /// Open a tree file, creating an empty one if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its length cannot be
    /// determined.
    pub fn open_or_create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_size = file.metadata()?.len();
        let page_count = file_size.div_ceil(page_size as u64) as u32;

        Ok(Self {
            file,
            page_size,
            page_count,
        })
    }

    /// Open an existing file without write access.
    #[cfg(test)]
    pub(crate) fn open_read_only<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let page_count = file.metadata()?.len().div_ceil(page_size as u64) as u32;
        Ok(Self {
            file,
            page_size,
            page_count,
        })
    }

    /// Read a page from disk into `page`.
    ///
    /// Bytes past the end of the file are left zeroed.
    pub fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        debug_assert_eq!(page.size(), self.page_size);

        self.file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;

        let buf = page.as_mut_slice();
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf[filled..].fill(0);

        Ok(())
    }

    /// Write a page to disk, extending the file if needed.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> std::io::Result<()> {
        debug_assert_eq!(page.size(), self.page_size);

        self.file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        self.file.write_all(page.as_slice())?;

        if page_id.0 >= self.page_count {
            self.page_count = page_id.0 + 1;
        }
        Ok(())
    }

    /// Flush file contents and metadata to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of pages the file spans.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the current length of the file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
