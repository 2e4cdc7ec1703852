//! # Broker Hot-Path Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Identity map lookup | O(1), < 1µs |
//! | Identity map add/remove | O(1), < 1µs |
//! | Dispatcher resolve + driver call (read_mmio64) | < 10µs |
//! | Envelope encode/decode | < 10µs for small requests |

use ar_01_remote_identity::{
    IdentityMap, NativeToken, RemoteIdGenerator, IdSource, TokenEntry,
};
use ar_02_dispatcher::{Dispatcher, DispatcherConfig, SimulatedDriver};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_transport::{decode_envelope, encode_envelope, WireEnvelope};
use shared_types::{flags, ObjectType, Properties, RemoteId, Request};

fn bench_identity_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("ar-01-identity-map");
    let ids = RemoteIdGenerator::new();

    for size in [100u64, 10_000, 100_000] {
        let map = IdentityMap::new("token");
        let mut known = Vec::with_capacity(size as usize);
        for n in 0..size {
            let id = ids.next_id();
            map.add(id, TokenEntry { token: NativeToken(n) });
            known.push(id);
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("find_hit", size), &known, |b, known| {
            let mut i = 0usize;
            b.iter(|| {
                i = (i + 1) % known.len();
                black_box(map.find(&known[i]))
            })
        });
        group.bench_with_input(BenchmarkId::new("find_miss", size), &size, |b, _| {
            let missing = RemoteId::new(1, u64::MAX);
            b.iter(|| black_box(map.find(&missing)))
        });
    }

    group.bench_function("add_remove", |b| {
        let map = IdentityMap::new("token");
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let id = ids.next_id();
            map.add(id, TokenEntry { token: NativeToken(n) });
            black_box(map.remove(&id))
        })
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("ar-02-dispatcher");
    let d = Dispatcher::new(SimulatedDriver::new(1), DispatcherConfig::default());
    let filter = Properties {
        object_type: Some(ObjectType::Accelerator),
        ..Default::default()
    };
    let token = match d.enumerate(&[filter], 1) {
        Ok(found) => found.tokens[0].token_id,
        Err(e) => panic!("enumerate failed: {e}"),
    };
    let handle = match d.open(&token, flags::OPEN_SHARED) {
        Ok(header) => header.handle_id,
        Err(e) => panic!("open failed: {e}"),
    };

    group.bench_function("read_mmio64", |b| {
        b.iter(|| black_box(d.read_mmio64(&handle, 0, 0x8)))
    });
    group.bench_function("unknown_handle", |b| {
        let forged = RemoteId::new(2, 2);
        b.iter(|| black_box(d.read_mmio64(&forged, 0, 0x8)))
    });
    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-transport-envelope");
    for size in [0usize, 4096, 65_536] {
        let envelope = WireEnvelope::request(Request::BufMemCpyToRemote {
            handle_id: RemoteId::new(1, 2),
            dest_buf_id: RemoteId::new(1, 3),
            dest_offset: 0,
            src: vec![0xa5; size],
            n: size as u64,
        });
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode_decode", size), &envelope, |b, env| {
            b.iter(|| {
                let frame = match encode_envelope(env) {
                    Ok(frame) => frame,
                    Err(e) => panic!("encode failed: {e}"),
                };
                black_box(decode_envelope::<Request>(&frame).is_ok())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_identity_map, bench_dispatch, bench_envelope);
criterion_main!(benches);
