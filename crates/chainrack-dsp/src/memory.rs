//! Linear sample memory for module-backed plugins.
//!
//! A module sees one flat, growable region of `f32` samples. Regions are
//! handed out by a bump allocator as [`MemoryView`]s. Growing or resetting
//! the memory advances its epoch, and any view taken under an older epoch
//! must be reacquired before it can be read again. Offsets survive growth, so
//! reacquiring is cheap.

use crate::error::{ModuleError, Result};

/// Samples per growth step (64 KiB of `f32`).
pub const PAGE_SAMPLES: usize = 16 * 1024;

/// Handle to a region of a [`LinearMemory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryView {
    offset: usize,
    len: usize,
    epoch: u64,
}

impl MemoryView {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug)]
pub struct LinearMemory {
    data: Vec<f32>,
    used: usize,
    epoch: u64,
    limit: usize,
}

impl LinearMemory {
    /// `limit` caps total size in samples.
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            used: 0,
            epoch: 0,
            limit,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Grow by whole pages. Invalidates every outstanding view.
    pub fn grow(&mut self, pages: usize) -> Result<()> {
        let requested = self.data.len() + pages * PAGE_SAMPLES;
        if requested > self.limit {
            return Err(ModuleError::MemoryLimit {
                requested,
                limit: self.limit,
            });
        }
        self.data.resize(requested, 0.0);
        self.epoch += 1;
        Ok(())
    }

    /// Allocate a zeroed region of `len` samples, growing if needed.
    pub fn reserve(&mut self, len: usize) -> Result<MemoryView> {
        let end = self.used + len;
        if end > self.data.len() {
            let missing = end - self.data.len();
            self.grow(missing.div_ceil(PAGE_SAMPLES))?;
        }
        let view = MemoryView {
            offset: self.used,
            len,
            epoch: self.epoch,
        };
        self.data[view.offset..end].fill(0.0);
        self.used = end;
        Ok(view)
    }

    /// Forget every allocation. Invalidates every outstanding view.
    pub fn reset(&mut self) {
        self.used = 0;
        self.epoch += 1;
    }

    /// Drop the backing storage.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.reset();
    }

    pub fn is_stale(&self, view: &MemoryView) -> bool {
        view.epoch != self.epoch
    }

    /// Re-issue `view` under the current epoch.
    pub fn reacquire(&self, view: &MemoryView) -> Result<MemoryView> {
        self.check_bounds(view)?;
        Ok(MemoryView {
            epoch: self.epoch,
            ..*view
        })
    }

    pub fn slice(&self, view: &MemoryView) -> Result<&[f32]> {
        self.check(view)?;
        Ok(&self.data[view.offset..view.offset + view.len])
    }

    pub fn slice_mut(&mut self, view: &MemoryView) -> Result<&mut [f32]> {
        self.check(view)?;
        Ok(&mut self.data[view.offset..view.offset + view.len])
    }

    /// Borrow two non-overlapping regions mutably at once.
    pub fn pair_mut(
        &mut self,
        first: &MemoryView,
        second: &MemoryView,
    ) -> Result<(&mut [f32], &mut [f32])> {
        self.check(first)?;
        self.check(second)?;
        let (low, high, swapped) = if first.offset <= second.offset {
            (first, second, false)
        } else {
            (second, first, true)
        };
        if low.offset + low.len > high.offset {
            return Err(ModuleError::OutOfBounds {
                offset: high.offset,
                len: high.len,
                size: low.offset + low.len,
            });
        }
        let (head, tail) = self.data.split_at_mut(high.offset);
        let low_slice = &mut head[low.offset..low.offset + low.len];
        let high_slice = &mut tail[..high.len];
        Ok(if swapped {
            (high_slice, low_slice)
        } else {
            (low_slice, high_slice)
        })
    }

    fn check(&self, view: &MemoryView) -> Result<()> {
        if self.is_stale(view) {
            return Err(ModuleError::StaleView {
                view: view.epoch,
                memory: self.epoch,
            });
        }
        self.check_bounds(view)
    }

    fn check_bounds(&self, view: &MemoryView) -> Result<()> {
        if view.offset + view.len > self.used {
            return Err(ModuleError::OutOfBounds {
                offset: view.offset,
                len: view.len,
                size: self.used,
            });
        }
        Ok(())
    }
}
