//! Word-level access to a memory-mapped window.
//!
//! Register blocks and reserved memory are both reached through
//! [`MappedRegion`]. Offsets are byte offsets from the start of the window.
//! Every access is checked against the window size and natural alignment
//! before it reaches the bus, and each call performs exactly one bus access.

use crate::{Error, Result};

pub trait MappedRegion {
    /// Size of the mapped window in bytes.
    fn size(&self) -> usize;

    fn read32(&self, offset: usize) -> Result<u32>;

    fn write32(&mut self, offset: usize, value: u32) -> Result<()>;

    fn read64(&self, offset: usize) -> Result<u64>;

    fn write64(&mut self, offset: usize, value: u64) -> Result<()>;
}

/// Validate a `width`-byte access at `offset` inside a window of `size` bytes.
pub fn check_access(offset: usize, width: usize, size: usize) -> Result<()> {
    if offset % width != 0 {
        return Err(Error::Unaligned { offset, width });
    }
    match offset.checked_add(width) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfBounds {
            offset,
            width,
            size,
        }),
    }
}

/// Write `values` as consecutive 32-bit words starting at `offset`.
///
/// Words are written in slice order. Hardware may treat some registers as
/// triggers, so callers rely on this ordering.
pub fn write_words<R: MappedRegion + ?Sized>(
    region: &mut R,
    offset: usize,
    values: &[u32],
) -> Result<()> {
    for (i, value) in values.iter().enumerate() {
        region.write32(offset + 4 * i, *value)?;
    }
    Ok(())
}

/// Read `values.len()` consecutive 32-bit words starting at `offset`.
pub fn read_words<R: MappedRegion + ?Sized>(
    region: &R,
    offset: usize,
    values: &mut [u32],
) -> Result<()> {
    for (i, value) in values.iter_mut().enumerate() {
        *value = region.read32(offset + 4 * i)?;
    }
    Ok(())
}
