//! Owned opaque memory blocks handed to a solver engine.

use std::ffi::c_void;

use crate::error::{QcqpError, Result};

/// Fixed-size, 8-byte aligned byte block.
///
/// Allocated once, released on drop, never resized or cloned. Only the engine
/// that created it interprets its contents.
#[derive(Debug)]
pub struct OpaqueRegion {
    words: Vec<u64>,
    size: usize,
}

impl OpaqueRegion {
    /// Allocate `size` bytes, zero-filled.
    pub fn try_new(size: usize) -> Result<Self> {
        let len = size.div_ceil(8);
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .map_err(|e| QcqpError::Allocation {
                size,
                reason: e.to_string(),
            })?;
        words.resize(len, 0);
        Ok(Self { words, size })
    }

    /// Requested size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.words.as_ptr().cast()
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.words.as_mut_ptr().cast()
    }
}

/// Allocate a zero-length-safe `f64` buffer of `len` entries filled with `fill`.
pub(crate) fn try_filled(len: usize, fill: f64) -> Result<Vec<f64>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| QcqpError::Allocation {
        size: len.saturating_mul(std::mem::size_of::<f64>()),
        reason: e.to_string(),
    })?;
    buf.resize(len, fill);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_rounds_up_to_words() {
        let region = OpaqueRegion::try_new(13).unwrap();
        assert_eq!(region.size(), 13);
        assert_eq!(region.words.len(), 2);
        assert_eq!(region.as_ptr() as usize % 8, 0);
    }

    #[test]
    fn empty_region_is_valid() {
        let region = OpaqueRegion::try_new(0).unwrap();
        assert_eq!(region.size(), 0);
    }

    #[test]
    fn absurd_size_fails_instead_of_aborting() {
        let err = try_filled(usize::MAX / 4, 0.0).unwrap_err();
        assert!(matches!(err, QcqpError::Allocation { .. }));
    }
}
