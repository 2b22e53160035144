//! Leaf record format.

use crate::common::config::ROW_SIZE;
use crate::common::Key;

/// One leaf record.
///
/// Only the key is stored today; the record payload is reserved. Growing
/// `Row` means growing [`ROW_SIZE`], which shrinks the leaf capacity.
///
/// # Layout (8 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     key (i64, little-endian)
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Row {
    pub key: Key,
}

impl Row {
    /// Size of a row in bytes.
    pub const SIZE: usize = ROW_SIZE;

    #[inline]
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Decode a row from the first [`Row::SIZE`] bytes of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&data[..Self::SIZE]);
        Self {
            key: Key::from_le_bytes(buf),
        }
    }

    /// Encode this row into the first [`Row::SIZE`] bytes of `data`.
    pub fn write_to(&self, data: &mut [u8]) {
        data[..Self::SIZE].copy_from_slice(&self.key.to_le_bytes());
    }
}
