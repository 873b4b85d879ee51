// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] turns the records of a [`RecorderSink`](super::recorder::RecorderSink)
//! into [Chrome Trace Event Format][format] JSON.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};

use crate::pretty::skip_name;
use crate::recorder::{Record, RecordedEvent};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of instant events, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Raster events land on one track per layer; tile events on track 0.
pub fn export(records: &[Record], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = records.iter().map(to_json).collect();
    serde_json::to_writer(&mut *writer, &events)?;
    writer.flush()
}

fn to_json(record: &Record) -> Value {
    let ts = micros(record.at);
    match record.event {
        RecordedEvent::RasterDispatch(e) => instant(
            "RasterDispatch",
            "Raster",
            ts,
            e.layer_id,
            json!({
                "generation": e.generation,
                "width": e.width,
                "height": e.height,
                "target": [e.target_rect.x0, e.target_rect.y0, e.target_rect.x1, e.target_rect.y1],
                "reallocated": e.reallocated,
            }),
        ),
        RecordedEvent::RasterSkip(e) => instant(
            "RasterSkip",
            "Raster",
            ts,
            e.layer_id,
            json!({ "reason": skip_name(e.reason) }),
        ),
        RecordedEvent::RasterDefer(e) => instant(
            "RasterDefer",
            "Raster",
            ts,
            e.layer_id,
            json!({
                "generation": e.generation,
                "holders": e.holders,
            }),
        ),
        RecordedEvent::RasterError(e) => instant(
            "RasterError",
            "Raster",
            ts,
            e.layer_id,
            json!({ "error": e.error.to_string() }),
        ),
        RecordedEvent::TileUpdate(e) => instant(
            "TileUpdate",
            "Tiles",
            ts,
            0,
            json!({
                "pass_index": e.pass_index,
                "dirty": [e.dirty_rect.x0, e.dirty_rect.y0, e.dirty_rect.x1, e.dirty_rect.y1],
                "urgent": e.urgent,
                "deferrable": e.deferrable,
            }),
        ),
        RecordedEvent::DirtyTilesCount { pass_index, count } => instant(
            "DirtyTiles",
            "Rich",
            ts,
            0,
            json!({
                "pass_index": pass_index,
                "count": count,
            }),
        ),
    }
}

fn instant(name: &str, cat: &str, ts: f64, tid: u64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": tid,
        "s": "t",
        "args": args,
    })
}

fn micros(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use underpaint_core::RasterError;
    use underpaint_core::dispatch::SkipReason;
    use underpaint_core::trace::{RasterDispatchEvent, RasterErrorEvent, RasterSkipEvent};

    fn record(at_us: u64, event: RecordedEvent) -> Record {
        Record {
            at: Duration::from_micros(at_us),
            event,
        }
    }

    fn exported(records: &[Record]) -> Vec<Value> {
        let mut out = Vec::new();
        export(records, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn empty_recording_exports_empty_array() {
        assert!(exported(&[]).is_empty());
    }

    #[test]
    fn dispatch_lands_on_layer_track() {
        let events = exported(&[record(
            1500,
            RecordedEvent::RasterDispatch(RasterDispatchEvent {
                layer_id: 4,
                generation: 1,
                target_rect: Rect::new(0.0, 0.0, 8.0, 8.0),
                width: 8,
                height: 8,
                reallocated: true,
            }),
        )]);
        let e = &events[0];
        assert_eq!(e["name"], "RasterDispatch");
        assert_eq!(e["ph"], "i");
        assert_eq!(e["tid"], 4);
        assert_eq!(e["ts"], 1500.0);
        assert_eq!(e["args"]["target"], json!([0.0, 0.0, 8.0, 8.0]));
    }

    #[test]
    fn skip_and_error_args_are_readable() {
        let events = exported(&[
            record(
                0,
                RecordedEvent::RasterSkip(RasterSkipEvent {
                    layer_id: 1,
                    reason: SkipReason::NoContent,
                }),
            ),
            record(
                10,
                RecordedEvent::RasterError(RasterErrorEvent {
                    layer_id: 1,
                    error: RasterError::AllocationFailed {
                        width: 4,
                        height: 4,
                    },
                }),
            ),
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["args"]["reason"], "no-content");
        let error = events[1]["args"]["error"].as_str().unwrap();
        assert!(error.contains("4x4"), "got: {error}");
    }
}
