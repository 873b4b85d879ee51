// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The consumer-side reference ledger.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::resource::{ResourceId, ResourceReturnSink, ReturnedResource};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Entry {
    /// Times the producer sent the resource.
    received: u32,
    /// Consumer references keeping the resource alive.
    holders: u32,
}

/// Tracks producer-sent resources until no consumer references them.
///
/// An id is present exactly while its holder count is positive. Every
/// [`receive`](Self::receive) adds one received count and one holder;
/// [`add_refs`](Self::add_refs) adds holders only. When
/// [`release_refs`](Self::release_refs) brings the holder count to zero, the
/// entry is removed and its received count is returned to the producer.
///
/// Misuse (adding references to an unknown id, releasing more references
/// than are held) trips a debug assertion; release builds log it and keep
/// going. Releasing an id that is no longer tracked is a normal late or
/// duplicate return and is ignored.
#[derive(Clone, Debug, Default)]
pub struct TransferableResourceLedger {
    entries: HashMap<ResourceId, Entry>,
}

impl TransferableResourceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records resources arriving from the producer.
    ///
    /// Each occurrence of an id adds one received count and one holder.
    pub fn receive(&mut self, ids: impl IntoIterator<Item = ResourceId>) {
        for id in ids {
            let entry = self.entries.entry(id).or_default();
            entry.received = entry.received.saturating_add(1);
            entry.holders = entry.holders.saturating_add(1);
        }
    }

    /// Adds consumer references to resources that are already tracked.
    pub fn add_refs(&mut self, ids: impl IntoIterator<Item = ResourceId>) {
        for id in ids {
            debug_assert!(
                self.entries.contains_key(&id),
                "add_refs on untracked {id:?}"
            );
            match self.entries.get_mut(&id) {
                Some(entry) => entry.holders = entry.holders.saturating_add(1),
                None => log::warn!("ignoring add_refs on untracked {id:?}"),
            }
        }
    }

    /// Drops consumer references, returning fully released resources.
    ///
    /// `returns` pairs each id with the number of references to drop. Every
    /// resource whose holder count reaches zero is removed and reported to
    /// `sink` with its total received count, in a single batch. The sink is
    /// not called when nothing was released.
    pub fn release_refs<S>(&mut self, returns: &[ReturnedResource], sink: &mut S)
    where
        S: ResourceReturnSink + ?Sized,
    {
        let mut batch = Vec::new();
        for &ReturnedResource { id, count } in returns {
            let Some(entry) = self.entries.get_mut(&id) else {
                log::debug!("ignoring release of untracked {id:?}");
                continue;
            };
            debug_assert!(
                count <= entry.holders,
                "releasing {count} refs of {id:?} with {} held",
                entry.holders
            );
            if count > entry.holders {
                log::warn!(
                    "clamping release of {count} refs of {id:?} to {} held",
                    entry.holders
                );
            }
            entry.holders = entry.holders.saturating_sub(count);
            if entry.holders == 0 {
                let received = entry.received;
                self.entries.remove(&id);
                batch.push(ReturnedResource::new(id, received));
            }
        }
        if !batch.is_empty() {
            sink.return_resources(&batch);
        }
    }

    /// Returns every tracked resource to the producer, regardless of
    /// outstanding references.
    ///
    /// Used when the consumer goes away. The batch is sorted by id. The sink
    /// is not called when the ledger is empty.
    pub fn return_all<S>(&mut self, sink: &mut S)
    where
        S: ResourceReturnSink + ?Sized,
    {
        let mut batch: Vec<_> = self
            .entries
            .drain()
            .map(|(id, entry)| ReturnedResource::new(id, entry.received))
            .collect();
        if batch.is_empty() {
            return;
        }
        batch.sort_unstable_by_key(|r| r.id);
        sink.return_resources(&batch);
    }

    /// Consumer references held on `id`, or 0 if it is not tracked.
    #[must_use]
    pub fn holders(&self, id: ResourceId) -> u32 {
        self.entries.get(&id).map_or(0, |e| e.holders)
    }

    /// Times `id` was received since it was last returned, or 0 if it is
    /// not tracked.
    #[must_use]
    pub fn received(&self, id: ResourceId) -> u32 {
        self.entries.get(&id).map_or(0, |e| e.received)
    }

    /// Returns `true` if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of tracked resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no resources are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const A: ResourceId = ResourceId(1);
    const B: ResourceId = ResourceId(2);
    const C: ResourceId = ResourceId(3);

    fn ret(id: ResourceId, count: u32) -> ReturnedResource {
        ReturnedResource::new(id, count)
    }

    #[test]
    fn receive_then_release_returns_resource() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([A]);
        assert_eq!(ledger.holders(A), 1);
        ledger.release_refs(&[ret(A, 1)], &mut batches);
        assert_eq!(batches, [vec![ret(A, 1)]]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn duplicate_release_is_ignored() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([A]);
        ledger.release_refs(&[ret(A, 1)], &mut batches);
        ledger.release_refs(&[ret(A, 1)], &mut batches);
        assert_eq!(batches.len(), 1, "A reported twice");
    }

    #[test]
    fn add_refs_delays_return() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([A]);
        ledger.add_refs([A, A]);
        assert_eq!(ledger.holders(A), 3);
        assert_eq!(ledger.received(A), 1);

        ledger.release_refs(&[ret(A, 2)], &mut batches);
        assert!(batches.is_empty(), "still one holder");
        ledger.release_refs(&[ret(A, 1)], &mut batches);
        assert_eq!(batches, [vec![ret(A, 1)]]);
    }

    #[test]
    fn received_count_is_reported_on_return() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([A, B, A]);
        ledger.receive([A]);
        ledger.release_refs(&[ret(A, 3), ret(B, 1)], &mut batches);
        assert_eq!(batches, [vec![ret(A, 3), ret(B, 1)]]);
    }

    #[test]
    fn one_batch_per_release_and_none_when_empty() {
        let mut ledger = TransferableResourceLedger::new();
        let mut calls = 0;
        ledger.receive([A, B]);
        ledger.release_refs(&[ret(C, 1), ret(A, 0)], &mut |_: &[ReturnedResource]| calls += 1);
        assert_eq!(calls, 0);
        ledger.release_refs(&[ret(A, 1), ret(B, 1)], &mut |batch: &[ReturnedResource]| {
            assert_eq!(batch.len(), 2);
            calls += 1;
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn return_all_drains_sorted() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([C, A, B, A]);
        ledger.add_refs([B]);
        ledger.return_all(&mut batches);
        assert_eq!(batches, [vec![ret(A, 2), ret(B, 1), ret(C, 1)]]);
        assert!(ledger.is_empty());

        ledger.return_all(&mut batches);
        assert_eq!(batches.len(), 1, "empty ledger returns nothing");
    }

    #[test]
    fn resource_can_be_received_again_after_return() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([A]);
        ledger.release_refs(&[ret(A, 1)], &mut batches);
        ledger.receive([A]);
        assert!(ledger.contains(A));
        assert_eq!(ledger.received(A), 1, "count restarts after return");
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "add_refs on untracked")]
    fn add_refs_on_unknown_id_asserts() {
        let mut ledger = TransferableResourceLedger::new();
        ledger.add_refs([A]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "releasing 2 refs")]
    fn over_release_asserts() {
        let mut ledger = TransferableResourceLedger::new();
        let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
        ledger.receive([A]);
        ledger.release_refs(&[ret(A, 2)], &mut batches);
    }

    #[test]
    fn received_count_is_conserved_across_interleavings() {
        // Deterministic pseudo-random schedules over three ids.
        let mut state = 0x9e37_79b9_u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        let ids = [A, B, C];
        for _ in 0..100 {
            let mut ledger = TransferableResourceLedger::new();
            let mut batches: Vec<Vec<ReturnedResource>> = Vec::new();
            let mut sent = [0_u32; 3];
            let mut held = [0_u32; 3];
            for _ in 0..40 {
                let i = usize::try_from(next() % 3).unwrap();
                let id = ids[i];
                match next() % 3 {
                    0 => {
                        ledger.receive([id]);
                        sent[i] += 1;
                        held[i] += 1;
                    }
                    1 if held[i] > 0 => {
                        ledger.add_refs([id]);
                        held[i] += 1;
                    }
                    _ if held[i] > 0 => {
                        ledger.release_refs(&[ret(id, 1)], &mut batches);
                        held[i] -= 1;
                        if held[i] == 0 {
                            let last = batches.last().unwrap();
                            assert_eq!(last, &vec![ret(id, sent[i])]);
                            sent[i] = 0;
                        }
                    }
                    _ => {}
                }
                assert_eq!(ledger.holders(id), held[i]);
            }
        }
    }
}
