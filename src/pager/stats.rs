//! Pager I/O statistics.

use std::fmt;

/// Counters kept by the [`Pager`](super::Pager).
///
/// The pager is single-threaded and owned by value, so these are plain
/// integers; [`Pager::stats`](super::Pager::stats) hands out a copy.
///
/// # Example
/// ```
/// use stratadb::PagerStats;
///
/// let stats = PagerStats::default();
/// assert_eq!(stats.pages_read, 0);
/// println!("{}", stats);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PagerStats {
    /// Lookups that found the page already resident.
    pub cache_hits: u64,
    /// Lookups that had to materialize the page.
    pub cache_misses: u64,
    /// Pages read from the file.
    pub pages_read: u64,
    /// Pages written to the file.
    pub pages_written: u64,
    /// Page numbers handed out by the allocator.
    pub pages_allocated: u64,
}

impl PagerStats {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for PagerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, read: {}, written: {}, allocated: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.pages_read,
            self.pages_written,
            self.pages_allocated,
            self.hit_rate() * 100.0
        )
    }
}
