//! Frame codec benchmarks.
//!
//! Run with `cargo bench --features benchmark`.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use intake::test_utils::{frame_bytes, signed_header, unsigned_header};
use intake::{Encoding, HmacHash, encode_frame, scan_frame};

fn bench_scan_frame(c: &mut Criterion) {
    let payload = vec![0x5Au8; 1024];
    let unsigned = frame_bytes(&unsigned_header(&payload, Encoding::ProtocolBuffer), &payload);
    let signed = frame_bytes(
        &signed_header(&payload, Encoding::ProtocolBuffer, HmacHash::Sha1, "bench", 1, b"key"),
        &payload,
    );

    c.bench_function("scan_frame/unsigned_1k", |b| b.iter(|| scan_frame(black_box(&unsigned))));
    c.bench_function("scan_frame/signed_1k", |b| b.iter(|| scan_frame(black_box(&signed))));
}

fn bench_encode_frame(c: &mut Criterion) {
    let payload = vec![0x5Au8; 1024];
    let header = unsigned_header(&payload, Encoding::Json);

    c.bench_function("encode_frame/1k", |b| {
        b.iter(|| encode_frame(black_box(&header), black_box(&payload)))
    });
}

criterion_group!(benches, bench_scan_frame, bench_encode_frame);
criterion_main!(benches);
