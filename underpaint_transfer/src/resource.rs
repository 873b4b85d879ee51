// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource ids and the return path to the producer.

use alloc::vec::Vec;
use core::fmt;

/// An opaque handle to a producer-owned resource (texture, buffer, etc.).
///
/// Ids are assigned by the producer and are unique within its scope. The
/// ledger never interprets them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

/// A resource handed back to its producer.
///
/// `count` is the number of times the producer sent the resource; the
/// producer drops that many of its own references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReturnedResource {
    /// The resource.
    pub id: ResourceId,
    /// Times the resource was received, or, when passed to
    /// [`release_refs`](crate::TransferableResourceLedger::release_refs),
    /// the number of consumer references being dropped.
    pub count: u32,
}

impl ReturnedResource {
    /// Creates an entry.
    #[must_use]
    pub const fn new(id: ResourceId, count: u32) -> Self {
        Self { id, count }
    }
}

/// Producer-side receiver for returned resources.
///
/// Each call delivers one non-empty batch.
pub trait ResourceReturnSink {
    /// Takes back `resources`.
    fn return_resources(&mut self, resources: &[ReturnedResource]);
}

/// Collects each batch, mostly useful in tests.
impl ResourceReturnSink for Vec<Vec<ReturnedResource>> {
    fn return_resources(&mut self, resources: &[ReturnedResource]) {
        self.push(resources.to_vec());
    }
}

impl<F: FnMut(&[ReturnedResource])> ResourceReturnSink for F {
    fn return_resources(&mut self, resources: &[ReturnedResource]) {
        self(resources);
    }
}
