//! Page identifier type.

use std::fmt;

/// Identifies a page in the tree file.
///
/// Page `n` lives at byte offset `n * page_size`. On disk, parent and
/// next-leaf links are signed 32-bit values where -1 means "none"; that bit
/// pattern is exactly [`PageId::INVALID`], so links round-trip through
/// [`PageId::from_link`] / [`PageId::to_link`] without a special case.
///
/// # Example
/// ```
/// use stratadb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(PageId::from_link(-1), None);
/// assert_eq!(PageId::to_link(Some(page_id)), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID (-1 when read as a signed link).
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode a signed on-disk link.
    #[inline]
    pub fn from_link(link: i32) -> Option<PageId> {
        if link < 0 {
            None
        } else {
            Some(PageId(link as u32))
        }
    }

    /// Encode an optional page as a signed on-disk link.
    #[inline]
    pub fn to_link(page: Option<PageId>) -> i32 {
        match page {
            Some(pid) if pid.is_valid() => pid.0 as i32,
            _ => -1,
        }
    }

    /// Byte offset of this page in a file of `page_size` pages.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        self.0 as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_invalid() {
        assert!(!PageId::INVALID.is_valid());
        assert_eq!(PageId::INVALID.0, u32::MAX);
    }

    #[test]
    fn test_page_id_links() {
        assert_eq!(PageId::from_link(-1), None);
        assert_eq!(PageId::from_link(7), Some(PageId::new(7)));
        assert_eq!(PageId::to_link(None), -1);
        assert_eq!(PageId::to_link(Some(PageId::INVALID)), -1);
        assert_eq!(PageId::to_link(Some(PageId::new(7))), 7);
    }

    #[test]
    fn test_page_id_offset() {
        assert_eq!(PageId::new(0).offset(60), 0);
        assert_eq!(PageId::new(3).offset(4096), 3 * 4096);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42)), "Page(42)");
        assert_eq!(format!("{}", PageId::INVALID), "Page(INVALID)");
    }
}
