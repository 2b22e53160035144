//! Pager - the page table between the tree engine and the file.
//!
//! The [`Pager`] provides:
//! - Lazy, read-on-demand materialization of pages by number
//! - Monotonic allocation of new page numbers
//! - Write-all-on-close flushing

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, trace};

use crate::common::config::Config;
use crate::common::{Error, PageId, Result};
use crate::pager::PagerStats;
use crate::storage::page::Page;
use crate::storage::DiskManager;

/// Owns every resident page of one tree file.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────┐
/// │                        Pager                         │
/// │  ┌────────────────────────┐   ┌──────────────────┐   │
/// │  │ pages: PageId → Page   │   │   DiskManager    │   │
/// │  │ (arena, never evicts)  │──▶│ offset = id × P  │   │
/// │  └────────────────────────┘   └──────────────────┘   │
/// │  next_page_id (monotonic)     stats                  │
/// └──────────────────────────────────────────────────────┘
/// ```
///
/// Other components hold page numbers, never references that outlive a
/// single call, so a page and the page it is being split into are never
/// aliased.
///
/// Pages stay resident until the pager is dropped. Nothing reaches the
/// file until [`Pager::flush_all`].
pub struct Pager {
    disk: DiskManager,
    pages: BTreeMap<PageId, Page>,
    /// Pages that existed in the file when it was opened.
    disk_pages: u32,
    next_page_id: u32,
    config: Config,
    stats: PagerStats,
}

impl Pager {
    /// Open (or create) the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        config.validate()?;
        let disk = DiskManager::open_or_create(path, config.page_size)?;
        let disk_pages = disk.page_count();

        Ok(Self {
            disk,
            pages: BTreeMap::new(),
            disk_pages,
            // Page 0 always exists, even before it is first written.
            next_page_id: disk_pages.max(1),
            config,
            stats: PagerStats::default(),
        })
    }

    /// Make `page_id` resident.
    ///
    /// Pages inside the file are read from it. Pages past the end start
    /// zeroed, except page 0, which starts as an empty root leaf.
    ///
    /// # Errors
    /// - `Error::PageOutOfBounds` if `page_id` is at or past `max_pages`
    /// - I/O errors from the read
    pub fn load(&mut self, page_id: PageId) -> Result<()> {
        self.check_bounds(page_id)?;

        if self.pages.contains_key(&page_id) {
            self.stats.cache_hits += 1;
            return Ok(());
        }
        self.stats.cache_misses += 1;

        let mut page = Page::new(self.config.page_size);
        if page_id.0 < self.disk_pages {
            self.disk.read_page(page_id, &mut page)?;
            self.stats.pages_read += 1;
            trace!("read {} from disk", page_id);
        } else if page_id.0 == 0 {
            page.init_leaf();
        }

        self.pages.insert(page_id, page);
        Ok(())
    }

    /// Borrow a page, loading it first if needed.
    pub fn page(&mut self, page_id: PageId) -> Result<&Page> {
        self.load(page_id)?;
        self.pages
            .get(&page_id)
            .ok_or_else(|| Error::Corrupted(format!("{} vanished after load", page_id)))
    }

    /// Mutably borrow a page, loading it first if needed.
    pub fn page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        self.load(page_id)?;
        self.pages
            .get_mut(&page_id)
            .ok_or_else(|| Error::Corrupted(format!("{} vanished after load", page_id)))
    }

    /// Hand out the next unused page number with a zeroed resident page.
    ///
    /// Numbers are never reused, including those of pages orphaned by
    /// merges.
    ///
    /// # Errors
    /// `Error::PageOutOfBounds` once `max_pages` numbers are in use.
    pub fn allocate(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.next_page_id);
        self.check_bounds(page_id)?;

        self.pages
            .insert(page_id, Page::new(self.config.page_size));
        self.next_page_id += 1;
        self.stats.pages_allocated += 1;

        debug!("allocated {}", page_id);
        Ok(page_id)
    }

    /// Check that `count` more pages can be allocated without crossing
    /// `max_pages`.
    ///
    /// # Errors
    /// `Error::PageOutOfBounds` naming the first page number past the
    /// ceiling.
    pub fn ensure_room(&self, count: u32) -> Result<()> {
        if self.next_page_id as u64 + count as u64 > self.config.max_pages as u64 {
            return Err(Error::PageOutOfBounds {
                page_id: PageId::new(self.config.max_pages),
                max_pages: self.config.max_pages,
            });
        }
        Ok(())
    }

    /// Write every resident page to its offset, then sync.
    ///
    /// # Errors
    /// Stops at the first failing write and returns `Error::Flush` naming
    /// that page. Pages before it have been written; nothing is retried.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut written = 0;
        for (&page_id, page) in &self.pages {
            self.disk
                .write_page(page_id, page)
                .map_err(|source| Error::Flush { page_id, source })?;
            written += 1;
        }
        self.stats.pages_written += written;
        self.disk.sync()?;

        debug!("flushed {} pages", written);
        Ok(())
    }

    /// Number of page numbers in use (on disk or allocated).
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.next_page_id
    }

    /// Number of pages currently held in memory.
    #[inline]
    pub fn resident_count(&self) -> usize {
        self.pages.len()
    }

    pub fn stats(&self) -> PagerStats {
        self.stats
    }

    /// CRC32 of every resident page, in page order.
    pub fn fingerprint(&self) -> Vec<(PageId, u32)> {
        self.pages
            .iter()
            .map(|(&page_id, page)| (page_id, page.checksum()))
            .collect()
    }

    fn check_bounds(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.config.max_pages {
            return Err(Error::PageOutOfBounds {
                page_id,
                max_pages: self.config.max_pages,
            });
        }
        Ok(())
    }
}
