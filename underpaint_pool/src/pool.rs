// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The worker pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use underpaint_core::{RasterTask, RasterTaskSink};

use crate::config::PoolConfig;
use crate::error::PoolError;

/// Counters for tasks the pool has finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks that rasterized successfully.
    pub completed: u64,
    /// Tasks that returned an error.
    pub failed: u64,
    /// Tasks that panicked.
    pub panicked: u64,
}

impl PoolStats {
    /// Total number of tasks the workers have taken off the queue and
    /// finished, whatever the result.
    #[must_use]
    pub const fn finished(&self) -> u64 {
        self.completed + self.failed + self.panicked
    }
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
}

/// Runs raster tasks on a fixed set of worker threads.
#[derive(Debug)]
pub struct RasterWorkerPool {
    sender: Option<Sender<RasterTask>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl RasterWorkerPool {
    /// Starts `config.worker_count` workers.
    ///
    /// # Errors
    ///
    /// [`PoolError::NoWorkers`] for a zero worker count, or
    /// [`PoolError::Spawn`] if a thread could not be started. Workers that
    /// did start are shut down again before the error is returned.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.worker_count == 0 {
            return Err(PoolError::NoWorkers);
        }
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(config.worker_count),
            counters: Arc::default(),
        };
        for index in 0..config.worker_count {
            let receiver = receiver.clone();
            let counters = Arc::clone(&pool.counters);
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name))
                .spawn(move || worker_loop(&receiver, &counters))?;
            pool.workers.push(handle);
        }
        log::debug!("started {} raster workers", config.worker_count);
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Snapshot of the task counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.counters.completed.load(Ordering::Acquire),
            failed: self.counters.failed.load(Ordering::Acquire),
            panicked: self.counters.panicked.load(Ordering::Acquire),
        }
    }

    /// Number of tasks posted but not yet picked up by a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    /// Closes the queue, runs the tasks already posted, and joins the
    /// workers.
    pub fn shutdown(mut self) -> PoolStats {
        self.join();
        self.stats()
    }

    fn join(&mut self) {
        // Disconnecting ends each worker's receive loop once the queue drains.
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("raster worker").to_owned();
            if handle.join().is_err() {
                log::error!("{name} exited by panic");
            }
        }
    }
}

impl RasterTaskSink for RasterWorkerPool {
    fn post_raster_task(&self, task: RasterTask) {
        let Some(sender) = &self.sender else {
            return;
        };
        // Only fails when every worker is gone; dropping the task still
        // releases its bitmap reference.
        if let Err(err) = sender.send(task) {
            log::warn!(
                "no raster workers left, dropping task for generation {}",
                err.into_inner().generation()
            );
        }
    }
}

impl Drop for RasterWorkerPool {
    fn drop(&mut self) {
        self.join();
    }
}

fn worker_loop(receiver: &Receiver<RasterTask>, counters: &Counters) {
    for task in receiver {
        let generation = task.generation();
        match panic::catch_unwind(AssertUnwindSafe(move || task.run())) {
            Ok(Ok(())) => {
                counters.completed.fetch_add(1, Ordering::AcqRel);
            }
            Ok(Err(err)) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                log::warn!("raster task for generation {generation} failed: {err}");
            }
            Err(_) => {
                counters.panicked.fetch_add(1, Ordering::AcqRel);
                log::error!("raster task for generation {generation} panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Rect, Size};
    use underpaint_core::trace::Tracer;
    use underpaint_core::{
        DispatchOutcome, LayerRasterDispatcher, PictureRecorder, PixelBuffer, RasterConfig,
        RasterLayer, Rgba8, SharedRasterBitmap,
    };

    const RED: Rgba8 = Rgba8::opaque(255, 0, 0);

    struct Square(f64);

    impl RasterLayer for Square {
        fn bounds(&self) -> Size {
            Size::new(self.0, self.0)
        }

        fn position(&self) -> Point {
            Point::ORIGIN
        }

        fn draws_content(&self) -> bool {
            true
        }

        fn invalidated_region(&self) -> Rect {
            Rect::new(0.0, 0.0, self.0, self.0)
        }

        fn paint(&self, recorder: &mut PictureRecorder) {
            recorder.fill_rect(recorder.bounds(), RED);
        }
    }

    fn task(bitmap: &SharedRasterBitmap) -> RasterTask {
        let (w, h) = bitmap.size();
        let bounds = Rect::new(0.0, 0.0, f64::from(w), f64::from(h));
        let mut recorder = PictureRecorder::new(bounds);
        recorder.fill_rect(bounds, RED);
        RasterTask::new(bitmap.acquire(), recorder.finish(), bounds, Rgba8::TRANSPARENT)
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            RasterWorkerPool::new(PoolConfig::new(0)),
            Err(PoolError::NoWorkers)
        ));
    }

    #[test]
    fn shutdown_runs_queued_tasks() {
        let pool = RasterWorkerPool::new(PoolConfig::new(2)).unwrap();
        assert_eq!(pool.worker_count(), 2);
        let bitmaps: Vec<_> = (0..8)
            .map(|_| SharedRasterBitmap::allocate(8, 8, 1, Rgba8::TRANSPARENT).unwrap())
            .collect();
        for bitmap in &bitmaps {
            pool.post_raster_task(task(bitmap));
        }
        let stats = pool.shutdown();
        assert_eq!(stats.completed, 8);
        assert_eq!(stats.finished(), 8);
        for bitmap in &bitmaps {
            assert_eq!(bitmap.holders(), 1, "task did not release");
            bitmap.lock_for_read(|px| assert_eq!(px.pixel(7, 7), Some(RED)));
        }
    }

    #[test]
    fn dispatcher_rasterizes_through_pool() {
        let pool = Arc::new(RasterWorkerPool::new(PoolConfig::single_threaded()).unwrap());
        let mut dispatcher =
            LayerRasterDispatcher::new(Arc::clone(&pool), RasterConfig::default());
        let outcome = dispatcher
            .record_and_dispatch(&Square(16.0), &mut Tracer::none())
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Dispatched(_)));

        dispatcher.wait_for_raster();
        let mut surface = PixelBuffer::try_new(16, 16, Rgba8::TRANSPARENT).unwrap();
        assert!(dispatcher.draw_to_surface(&mut surface, Rect::new(0.0, 0.0, 16.0, 16.0)));
        assert!(surface.pixels().iter().all(|p| *p == RED), "surface not painted");
        drop(dispatcher);
        // Counters update after the release; read them once workers joined.
        let pool = Arc::try_unwrap(pool).unwrap();
        assert_eq!(pool.shutdown().completed, 1);
    }

    #[test]
    fn drop_drains_queue_and_joins() {
        let bitmap = SharedRasterBitmap::allocate(4, 4, 1, Rgba8::TRANSPARENT).unwrap();
        {
            let pool = RasterWorkerPool::new(PoolConfig::new(3).with_thread_name("test-raster"))
                .unwrap();
            for _ in 0..5 {
                pool.post_raster_task(task(&bitmap));
            }
        }
        assert_eq!(bitmap.holders(), 1, "queued tasks must release on drop");
        bitmap.lock_for_read(|px| assert_eq!(px.pixel(0, 0), Some(RED)));
    }
}
