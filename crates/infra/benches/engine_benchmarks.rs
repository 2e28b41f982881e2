use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use billbook_core::{AggregateId, TenantId};
use billbook_documents::{DocumentType, LineItem, aggregate_quantities, signed_deltas};
use billbook_infra::CounterAllocator;
use billbook_infra::StockDeltaReconciler;
use billbook_infra::collaborators::InMemoryProductCatalog;
use billbook_infra::stores::{InMemorySequenceStore, InMemoryStockStore};
use billbook_products::{ProductId, ProductRef};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

fn bench_allocation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("counter_allocation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocate_in_memory", |b| {
        let allocator = CounterAllocator::new(InMemorySequenceStore::new());
        let tenant = TenantId::new();
        b.iter(|| {
            let seq = rt
                .block_on(allocator.allocate(tenant, "PUR"))
                .expect("allocation");
            black_box(seq);
        });
    });

    group.finish();
}

fn bench_delta_computation(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta_computation");

    for size in [10usize, 100, 1000] {
        let products: Vec<ProductId> = (0..size)
            .map(|_| ProductId::new(AggregateId::new()))
            .collect();
        let prior = aggregate_quantities(products.iter().map(|p| (*p, 10i64)));
        let new = aggregate_quantities(products.iter().map(|p| (*p, 7i64)));

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("signed_deltas", size), &size, |b, _| {
            b.iter(|| black_box(signed_deltas(1, &prior, &new)));
        });
    }

    group.finish();
}

fn bench_reconcile_and_apply(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("reconcile_and_apply");

    for size in [10usize, 100] {
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let stock = Arc::new(InMemoryStockStore::new());
        let reconciler = StockDeltaReconciler::new(catalog, stock);
        let tenant = TenantId::new();
        let items: Vec<LineItem> = (0..size)
            .map(|_| {
                LineItem::new(
                    ProductRef::by_id(ProductId::new(AggregateId::new())),
                    5,
                    100,
                )
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("create_diff", size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let deltas = reconciler
                        .reconcile(tenant, DocumentType::Purchase, &[], &items)
                        .await
                        .expect("reconcile");
                    black_box(reconciler.apply(tenant, &deltas).await)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_allocation,
    bench_delta_computation,
    bench_reconcile_and_apply
);
criterion_main!(benches);
