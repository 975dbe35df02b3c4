//! Batch decode throughput benchmarks.
//!
//! # Running
//! ```bash
//! cargo bench --package solcodec-batch
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use solcodec_batch::{BatchEngine, BatchRequest};
use solcodec_core::{account::AccountInfo, transaction::RawTransaction};
use solcodec_registry::MemoryRegistry;
use solcodec_solana::SolanaDecoder;
use std::path::PathBuf;
use std::sync::Arc;

// ─── Setup ────────────────────────────────────────────────────────────────────

fn fixture(rel: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("../../fixtures");
    p.push(rel);
    p
}

fn make_decoder() -> SolanaDecoder {
    let registry = MemoryRegistry::new();
    registry.load_directory(&fixture("idl")).expect("load IDL fixtures");
    SolanaDecoder::new(Arc::new(registry))
}

fn make_transactions(n: usize) -> Vec<RawTransaction> {
    let text = std::fs::read_to_string(fixture("tx/pump_buy.json")).expect("pump_buy fixture");
    let raw: RawTransaction = serde_json::from_str(&text).expect("raw transaction");
    (0..n as u64)
        .map(|slot| RawTransaction { slot, ..raw.clone() })
        .collect()
}

fn make_curves(n: usize) -> Vec<AccountInfo> {
    (0..n as u64)
        .map(|i| {
            let mut data = vec![23, 183, 248, 55, 96, 216, 172, 96];
            for v in [i, i * 2, i * 3, 0, 1_000_000_000] {
                data.extend_from_slice(&v.to_le_bytes());
            }
            data.push((i & 1) as u8);
            AccountInfo {
                pubkey: "3JF3sEqM796hk5WFqA6EtmEwJQ9quALszsfJyvXNQKy3".into(),
                owner: "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P".into(),
                lamports: 1_000,
                data,
                executable: false,
                rent_epoch: 0,
                slot: i,
            }
        })
        .collect()
}

// ─── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_sequential_transactions(c: &mut Criterion) {
    let decoder = make_decoder();
    let mut group = c.benchmark_group("sequential_transactions");
    for size in [100, 1_000, 10_000] {
        let batch = make_transactions(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| batch.iter().map(|raw| decoder.decode_transaction(raw)).count());
        });
    }
    group.finish();
}

fn bench_parallel_transactions(c: &mut Criterion) {
    let engine = BatchEngine::new(make_decoder());
    let mut group = c.benchmark_group("parallel_transactions_rayon");
    for size in [1_000, 10_000, 100_000] {
        let batch = make_transactions(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| engine.decode_transactions(BatchRequest::new(batch.clone())));
        });
    }
    group.finish();
}

fn bench_parallel_accounts(c: &mut Criterion) {
    let engine = BatchEngine::new(make_decoder());
    let mut group = c.benchmark_group("parallel_accounts_rayon");
    for size in [1_000, 100_000] {
        let batch = make_curves(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| engine.decode_accounts(BatchRequest::new(batch.clone())));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_transactions,
    bench_parallel_transactions,
    bench_parallel_accounts,
);
criterion_main!(benches);
