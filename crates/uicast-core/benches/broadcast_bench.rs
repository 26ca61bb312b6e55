//! Criterion benchmarks for frame fan-out.
//!
//! A frame is encoded once and a shared handle is published to every
//! viewer's slot, so broadcast cost should grow with the viewer count only
//! by the per-slot publish, not by the frame size.
//!
//! Run with:
//! ```bash
//! cargo bench --package uicast-core --bench broadcast_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uicast_core::application::FrameBroadcaster;
use uicast_core::protocol::codec::encode_frame;
use uicast_core::{frame_slot, Frame, SlotReader, ViewerId};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_frame(size: usize) -> Frame {
    Frame {
        sequence: 1,
        draw_data: (0..size).map(|i| (i % 251) as u8).collect(),
    }
}

fn make_broadcaster(viewers: u64) -> (FrameBroadcaster, Vec<SlotReader>) {
    let mut broadcaster = FrameBroadcaster::new(None).expect("no bootstrap to encode");
    let readers = (1..=viewers)
        .map(|id| {
            let (writer, reader) = frame_slot();
            broadcaster
                .attach(ViewerId(id), writer)
                .expect("reader is alive");
            reader
        })
        .collect();
    (broadcaster, readers)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");
    for size in [1_024usize, 16 * 1_024, 256 * 1_024] {
        let frame = make_frame(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| encode_frame(black_box(frame)))
        });
    }
    group.finish();
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_64k_frame");
    let frame = make_frame(64 * 1_024);
    for viewers in [1u64, 8, 64] {
        let (mut broadcaster, _readers) = make_broadcaster(viewers);
        group.bench_with_input(BenchmarkId::from_parameter(viewers), &frame, |b, frame| {
            b.iter(|| broadcaster.broadcast(black_box(frame)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode_frame, bench_broadcast);
criterion_main!(benches);
