use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use extsort::{merge_runs, Dedup, MergeOptions, RunSpooler};
use record::Order;
use tempfile::tempdir;

const N: i64 = 10_000;
const MEMORY: usize = 1_000;

fn order(key: i64) -> Order {
    Order {
        timestamp: "2020-05-17 10:00:00 UTC".into(),
        order_id: key,
        product_id: key % 500,
        quantity: 1,
        category_id: key % 20,
        category_alias: "jewelry.ring".into(),
        price: 120.0,
        color: "red".into(),
        metal: "gold".into(),
        gem: "ruby".into(),
        ..Order::default()
    }
}

/// Keys in a scrambled but deterministic order.
fn scrambled() -> Vec<Order> {
    (0..N).map(|i| order((i * 7_919) % N)).collect()
}

fn spool_runs(c: &mut Criterion) {
    c.bench_function("spool_runs_10k", |b| {
        b.iter_batched(
            || (tempdir().unwrap(), scrambled()),
            |(dir, orders)| {
                let mut spool = RunSpooler::new(dir.path().join("runs"), "bench", MEMORY).unwrap();
                for o in orders {
                    spool.push(o).unwrap();
                }
                spool.finish().unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

fn merge_sorted_runs(c: &mut Criterion) {
    c.bench_function("merge_runs_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut spool = RunSpooler::new(dir.path().join("runs"), "bench", MEMORY).unwrap();
                for o in scrambled() {
                    spool.push(o).unwrap();
                }
                let runs = spool.finish().unwrap();
                (dir, runs)
            },
            |(dir, runs)| {
                let opts = MergeOptions {
                    index_gap: 1000,
                    dedup: Dedup::Keep,
                    write_buffer: 5000,
                };
                merge_runs::<Order>(
                    &runs,
                    &dir.path().join("orders.dat"),
                    &dir.path().join("orders.idx"),
                    opts,
                )
                .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, spool_runs, merge_sorted_runs);
criterion_main!(benches);
