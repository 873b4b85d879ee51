// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-flight deferred notifications.
//!
//! A [`CoalescedScheduler`] collapses any number of [`schedule`] calls into
//! one pending callback. The scheduler does not own a run loop: the caller's
//! event loop invokes [`fire`] when the notification is due, which keeps the
//! ordering relative to other work under the caller's control.
//!
//! ```
//! use underpaint_core::coalesce::{CoalescedScheduler, FireOutcome, Reschedule};
//!
//! let mut count = 0;
//! let mut scheduler = CoalescedScheduler::new(|_: &mut Reschedule| count += 1);
//! assert!(scheduler.schedule());
//! assert!(!scheduler.schedule());
//! assert_eq!(scheduler.fire(), FireOutcome::Fired);
//! assert_eq!(scheduler.fire(), FireOutcome::Idle);
//! drop(scheduler);
//! assert_eq!(count, 1);
//! ```
//!
//! [`schedule`]: CoalescedScheduler::schedule
//! [`fire`]: CoalescedScheduler::fire

/// Handed to the callback; lets it ask for another notification.
///
/// The scheduler is Idle while its callback runs, so a reschedule requested
/// here leaves exactly one fresh pending notification.
#[derive(Debug, Default)]
pub struct Reschedule {
    requested: bool,
}

impl Reschedule {
    /// Requests another notification after this one.
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Returns `true` if a reschedule was requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested
    }
}

/// Result of [`CoalescedScheduler::fire`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FireOutcome {
    /// Nothing was pending; the callback did not run.
    Idle,
    /// The callback ran and the scheduler is Idle.
    Fired,
    /// The callback ran and requested another notification.
    Rescheduled,
}

/// A pending flag plus the callback it guards.
pub struct CoalescedScheduler<F = Box<dyn FnMut(&mut Reschedule)>> {
    pending: bool,
    callback: F,
}

impl<F> core::fmt::Debug for CoalescedScheduler<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoalescedScheduler")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl CoalescedScheduler {
    /// Creates a scheduler with a boxed callback.
    #[must_use]
    pub fn boxed(callback: impl FnMut(&mut Reschedule) + 'static) -> Self {
        Self::new(Box::new(callback))
    }
}

impl<F: FnMut(&mut Reschedule)> CoalescedScheduler<F> {
    /// Creates an idle scheduler.
    #[must_use]
    pub const fn new(callback: F) -> Self {
        Self {
            pending: false,
            callback,
        }
    }

    /// Marks a notification pending.
    ///
    /// Returns `true` if this call moved the scheduler from Idle to Pending;
    /// the caller should then arrange one [`fire`](Self::fire).
    pub fn schedule(&mut self) -> bool {
        !core::mem::replace(&mut self.pending, true)
    }

    /// Drops the pending notification without running the callback.
    ///
    /// Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }

    /// Returns `true` if a notification is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Runs the callback if a notification is pending.
    pub fn fire(&mut self) -> FireOutcome {
        if !self.cancel() {
            return FireOutcome::Idle;
        }
        let mut reschedule = Reschedule::default();
        (self.callback)(&mut reschedule);
        if reschedule.requested {
            self.pending = true;
            FireOutcome::Rescheduled
        } else {
            FireOutcome::Fired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    fn counting() -> (Rc<Cell<u32>>, CoalescedScheduler) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let scheduler = CoalescedScheduler::boxed(move |_| c.set(c.get() + 1));
        (count, scheduler)
    }

    #[test]
    fn repeated_schedules_fire_once() {
        let (count, mut scheduler) = counting();
        assert!(scheduler.schedule());
        for _ in 0..9 {
            assert!(!scheduler.schedule(), "already pending");
        }
        assert_eq!(scheduler.fire(), FireOutcome::Fired);
        assert_eq!(scheduler.fire(), FireOutcome::Idle);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cancel_suppresses_callback() {
        let (count, mut scheduler) = counting();
        scheduler.schedule();
        assert!(scheduler.cancel());
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.fire(), FireOutcome::Idle);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let (count, mut scheduler) = counting();
        assert!(!scheduler.cancel());
        assert!(!scheduler.is_pending());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn schedule_after_fire_pends_again() {
        let (count, mut scheduler) = counting();
        scheduler.schedule();
        scheduler.fire();
        assert!(scheduler.schedule());
        assert_eq!(scheduler.fire(), FireOutcome::Fired);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn callback_can_reschedule() {
        let mut remaining = 2;
        let mut scheduler = CoalescedScheduler::new(|r: &mut Reschedule| {
            remaining -= 1;
            if remaining > 0 {
                r.request();
            }
        });
        scheduler.schedule();
        assert_eq!(scheduler.fire(), FireOutcome::Rescheduled);
        assert!(scheduler.is_pending());
        assert_eq!(scheduler.fire(), FireOutcome::Fired);
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.fire(), FireOutcome::Idle);
        drop(scheduler);
        assert_eq!(remaining, 0);
    }
}
