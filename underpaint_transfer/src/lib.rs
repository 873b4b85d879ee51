// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource reference accounting across a frame-submission boundary.
//!
//! A producer (for example a child compositor) hands resources to a
//! consumer by opaque id. The consumer may reference the same resource from
//! several frames at once. This crate tracks, per id:
//!
//! - how many times the producer sent it, and
//! - how many consumer references still keep it alive,
//!
//! and returns it to the producer, with the full received count, once the
//! last consumer reference goes away.
//!
//! - [`ResourceId`]: opaque handle assigned by the producer
//! - [`ReturnedResource`]: one entry of a return batch
//! - [`ResourceReturnSink`]: producer-side receiver for return batches
//! - [`TransferableResourceLedger`]: the accounting itself
//!
//! The ledger is not synchronised; it lives on the consumer's compositing
//! thread and all mutation goes through `&mut self`.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod ledger;
mod resource;

pub use ledger::TransferableResourceLedger;
pub use resource::{ResourceId, ResourceReturnSink, ReturnedResource};
