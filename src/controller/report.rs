//! # Raw Input Reports
//!
//! Fixed-capacity buffer holding the most recent HID input report.

use crate::protocol::constants::REPORT_SIZE;

/// A bounded HID report buffer.
///
/// The session owns one `RawReport` and reuses it for every read. Only the
/// first [`RawReport::len`] bytes are meaningful; all accessors are
/// bounds-checked against that length.
///
/// # Examples
///
/// ```
/// use procon_bridge::controller::report::RawReport;
///
/// let report = RawReport::from_bytes(&[0x30, 0x00, 0x00, 0x02]);
/// assert_eq!(report.report_id(), Some(0x30));
/// assert_eq!(report.get(3), Some(0x02));
/// assert_eq!(report.get(4), None);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct RawReport {
    buf: [u8; REPORT_SIZE],
    len: usize,
}

impl Default for RawReport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawReport")
            .field("len", &self.len)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

impl RawReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: [0u8; REPORT_SIZE],
            len: 0,
        }
    }

    /// Copies `bytes` into a new report, truncating to 64 bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut report = Self::new();
        let len = bytes.len().min(REPORT_SIZE);
        report.buf[..len].copy_from_slice(&bytes[..len]);
        report.len = len;
        report
    }

    /// Whole backing buffer, for a read to fill.
    ///
    /// Call [`RawReport::set_len`] with the number of bytes read afterwards.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Records how many bytes of the buffer are valid (clamped to capacity).
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(REPORT_SIZE);
    }

    /// Number of valid bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are valid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Valid bytes of the report.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Leading report-ID byte, if any.
    #[must_use]
    pub fn report_id(&self) -> Option<u8> {
        self.get(0)
    }

    /// Byte at `offset`, or `None` past the valid length.
    #[must_use]
    pub fn get(&self, offset: usize) -> Option<u8> {
        self.as_bytes().get(offset).copied()
    }

    /// `N` consecutive bytes starting at `offset`, if all are valid.
    #[must_use]
    pub fn group<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        let slice = self.as_bytes().get(offset..end)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Some(out)
    }
}
