//! Benchmarks for serial framing and payload decoding
//!
//! Measures sustained framing throughput on synthetic captures:
//! - Clean streams of back-to-back data packets with one-second heartbeats
//! - Noisy streams where line garbage forces byte-by-byte resync
//! - Decoding and scaling of a single data payload
//!
//! Platform: Cross-platform (in-memory byte sources, CI-safe)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use radiometer::decode::PacketDecoder;
use radiometer::framing::{PacketFramer, SyncPreset};
use radiometer::source::MemorySource;
use radiometer::test_utils::{data_payload, synthetic_stream};
use std::hint::black_box;
use std::time::Duration;

/// Frame a whole stream, returning the number of events produced.
fn frame_all(stream: &[u8]) -> usize {
    let source = MemorySource::new(stream.to_vec());
    let mut framer =
        PacketFramer::new(source, SyncPreset::Mesobot.table()).with_read_timeout(Duration::ZERO);

    let mut events = 0;
    loop {
        let batch = framer.poll().expect("in-memory framing cannot fail");
        if batch.is_empty() && framer.is_source_exhausted() {
            break;
        }
        events += batch.len();
    }
    events
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    for (name, garbage) in [("clean", 0usize), ("noisy", 64)] {
        let stream = synthetic_stream(2000, 20, garbage);
        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::new("synthetic_2000", name), &stream, |b, stream| {
            b.iter(|| black_box(frame_all(black_box(stream))))
        });
    }

    group.finish();
}

fn bench_decoding(c: &mut Criterion) {
    let decoder = PacketDecoder::default();
    let samples: Vec<u16> = (0..50).map(|i| i * 37).collect();
    let payload = data_payload(1, 2, &samples);

    let mut group = c.benchmark_group("decoding");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("data_payload", |b| {
        b.iter(|| black_box(decoder.decode_data(0, black_box(&payload)).expect("valid payload")))
    });

    group.bench_function("data_to_percent_stream", |b| {
        b.iter(|| {
            let record = decoder.decode_data(0, black_box(&payload)).expect("valid payload");
            let time_high = decoder.time_high(&record);
            black_box(decoder.percent_full_scale(&time_high))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_framing, bench_decoding);
criterion_main!(benches);
