// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted raster target shared between the UI thread and raster
//! workers.
//!
//! A [`SharedRasterBitmap`] value *is* one counted reference to the shared
//! storage. [`acquire`](SharedRasterBitmap::acquire) hands out another one,
//! and dropping (or [`release`](SharedRasterBitmap::release)-ing) a value
//! gives it back. The holder count is observable, which is what the
//! dispatcher's teardown uses as its completion signal: every release
//! notifies a condition variable, and
//! [`wait_until_sole_holder`](SharedRasterBitmap::wait_until_sole_holder)
//! sleeps on it until every other holder is gone.
//!
//! The pixels sit behind a single non-recursive lock. It is only held for one
//! copy or read at a time, never across a raster task's playback.
//!
//! A raster task that gives its reference back without finishing leaves part
//! of the bitmap holding older pixels. It marks the bitmap as needing a full
//! repaint before releasing, and the dispatcher consumes that mark the next
//! time it reuses the generation.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::RasterError;
use crate::pixel::{PixelBuffer, Rgba8};

struct BitmapShared {
    generation: u64,
    holders: AtomicUsize,
    needs_repaint: AtomicBool,
    pixels: Mutex<PixelBuffer>,
    // Guards nothing; pairs with `released` so a release cannot slip between
    // a waiter's check and its sleep.
    release_lock: Mutex<()>,
    released: Condvar,
}

/// A counted reference to a pixel buffer written by a raster worker and read
/// by the compositor.
pub struct SharedRasterBitmap {
    shared: Arc<BitmapShared>,
}

impl fmt::Debug for SharedRasterBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRasterBitmap")
            .field("generation", &self.shared.generation)
            .field("holders", &self.holders())
            .field("needs_repaint", &self.needs_repaint())
            .finish_non_exhaustive()
    }
}

impl SharedRasterBitmap {
    /// Allocates a `width × height` bitmap cleared to `clear`.
    ///
    /// The returned value is the only holder.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::AllocationFailed`] or
    /// [`RasterError::DimensionsOverflow`] if the pixel storage cannot be
    /// allocated.
    pub fn allocate(
        width: u32,
        height: u32,
        generation: u64,
        clear: Rgba8,
    ) -> Result<Self, RasterError> {
        let pixels = PixelBuffer::try_new(width, height, clear)?;
        Ok(Self {
            shared: Arc::new(BitmapShared {
                generation,
                holders: AtomicUsize::new(1),
                needs_repaint: AtomicBool::new(false),
                pixels: Mutex::new(pixels),
                release_lock: Mutex::new(()),
                released: Condvar::new(),
            }),
        })
    }

    /// Takes another reference. Never blocks.
    #[must_use = "dropping the new reference releases it immediately"]
    pub fn acquire(&self) -> Self {
        self.shared.holders.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Gives this reference back.
    ///
    /// Equivalent to dropping it; spelled out for call sites where the
    /// release is the point.
    pub fn release(self) {
        drop(self);
    }

    /// Number of live references, including this one.
    #[must_use]
    pub fn holders(&self) -> usize {
        self.shared.holders.load(Ordering::Acquire)
    }

    /// The generation number assigned when the bitmap was allocated.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    /// Returns `true` if a raster task gave up on this bitmap and the content
    /// no longer matches any single picture.
    #[must_use]
    pub fn needs_repaint(&self) -> bool {
        self.shared.needs_repaint.load(Ordering::Acquire)
    }

    pub(crate) fn mark_needs_repaint(&self) {
        self.shared.needs_repaint.store(true, Ordering::Release);
    }

    /// Clears the repaint mark, returning whether it was set.
    pub(crate) fn take_needs_repaint(&self) -> bool {
        self.shared.needs_repaint.swap(false, Ordering::AcqRel)
    }

    /// Current pixel dimensions.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        let pixels = self.shared.pixels.lock();
        (pixels.width(), pixels.height())
    }

    /// Returns `true` if both values refer to the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Runs `f` with shared access to the pixels.
    ///
    /// The lock is released when `f` returns or unwinds.
    pub fn lock_for_read<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> R {
        let pixels = self.shared.pixels.lock();
        f(&pixels)
    }

    pub(crate) fn lock_for_write<R>(&self, f: impl FnOnce(&mut PixelBuffer) -> R) -> R {
        let mut pixels = self.shared.pixels.lock();
        f(&mut pixels)
    }

    /// Re-allocates the pixels at a new size, cleared to `clear`.
    ///
    /// Only the sole holder may do this; a bitmap still referenced by a
    /// raster task must be replaced by a new generation instead.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::BitmapBusy`] if other references exist, or an
    /// allocation error. On error the existing pixels are left untouched.
    pub fn reallocate(&self, width: u32, height: u32, clear: Rgba8) -> Result<(), RasterError> {
        let holders = self.holders();
        if holders != 1 {
            return Err(RasterError::BitmapBusy { holders });
        }
        let fresh = PixelBuffer::try_new(width, height, clear)?;
        self.lock_for_write(|pixels| *pixels = fresh);
        Ok(())
    }

    /// Blocks until this is the only remaining reference.
    pub fn wait_until_sole_holder(&self) {
        let mut guard = self.shared.release_lock.lock();
        while self.holders() > 1 {
            self.shared.released.wait(&mut guard);
        }
    }

    /// Like [`wait_until_sole_holder`](Self::wait_until_sole_holder), giving
    /// up after `timeout`.
    ///
    /// Returns `true` if this became the only reference in time.
    #[must_use]
    pub fn wait_until_sole_holder_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.shared.release_lock.lock();
        while self.holders() > 1 {
            if self
                .shared
                .released
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.holders() == 1;
            }
        }
        true
    }
}

impl Drop for SharedRasterBitmap {
    fn drop(&mut self) {
        let previous = self.shared.holders.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "raster bitmap released more often than acquired");
        if previous == 1 {
            // Last holder: free the pixel storage now rather than when the
            // allocation itself goes away.
            *self.shared.pixels.lock() = PixelBuffer::empty();
        }
        let _guard = self.shared.release_lock.lock();
        self.shared.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    fn bitmap(width: u32, height: u32) -> SharedRasterBitmap {
        SharedRasterBitmap::allocate(width, height, 1, Rgba8::TRANSPARENT).unwrap()
    }

    #[test]
    fn acquire_and_release_track_holders() {
        let a = bitmap(4, 4);
        assert_eq!(a.holders(), 1);
        let b = a.acquire();
        assert_eq!(a.holders(), 2);
        assert!(a.ptr_eq(&b));
        b.release();
        assert_eq!(a.holders(), 1);
    }

    #[test]
    fn allocate_clears_to_color() {
        let red = Rgba8::opaque(255, 0, 0);
        let bmp = SharedRasterBitmap::allocate(3, 2, 7, red).unwrap();
        assert_eq!(bmp.generation(), 7);
        assert_eq!(bmp.size(), (3, 2));
        bmp.lock_for_read(|px| {
            assert!(px.pixels().iter().all(|p| *p == red), "not cleared");
        });
    }

    #[test]
    fn reallocate_requires_sole_holder() {
        let a = bitmap(4, 4);
        let task = a.acquire();
        assert_eq!(
            a.reallocate(8, 8, Rgba8::TRANSPARENT),
            Err(RasterError::BitmapBusy { holders: 2 })
        );
        assert_eq!(a.size(), (4, 4));
        drop(task);
        a.reallocate(8, 8, Rgba8::TRANSPARENT).unwrap();
        assert_eq!(a.size(), (8, 8));
    }

    #[test]
    fn repaint_mark_is_shared_and_taken_once() {
        let owner = bitmap(4, 4);
        let task = owner.acquire();
        assert!(!owner.needs_repaint());
        task.mark_needs_repaint();
        drop(task);
        assert!(owner.needs_repaint());
        assert!(owner.take_needs_repaint());
        assert!(!owner.take_needs_repaint());
        assert!(!owner.needs_repaint());
    }

    #[test]
    fn last_release_frees_pixels() {
        let a = bitmap(4, 4);
        let b = a.acquire();
        drop(a);
        assert_eq!(b.size(), (4, 4));
        // Peek at the shared storage after the final release.
        let shared = Arc::clone(&b.shared);
        drop(b);
        assert_eq!(shared.holders.load(Ordering::Acquire), 0);
        assert!(shared.pixels.lock().is_empty(), "pixels not freed");
    }

    #[test]
    fn wait_blocks_until_other_holder_releases() {
        let owner = bitmap(2, 2);
        let task = owner.acquire();
        let (started_tx, started_rx) = mpsc::channel();
        let worker = thread::spawn(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            task.release();
        });
        started_rx.recv().unwrap();
        owner.wait_until_sole_holder();
        assert_eq!(owner.holders(), 1);
        worker.join().unwrap();
    }

    #[test]
    fn bounded_wait_times_out_while_held() {
        let owner = bitmap(2, 2);
        let task = owner.acquire();
        assert!(!owner.wait_until_sole_holder_for(Duration::from_millis(10)));
        drop(task);
        assert!(owner.wait_until_sole_holder_for(Duration::from_millis(10)));
    }
}
