use common::{OrderLineItem, OrderRequest};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use saga::SagaCoordinator;
use store::{InMemoryInventoryStore, InMemoryOrderStore};

fn order_of(width: usize) -> OrderRequest {
    (0..width)
        .map(|i| OrderLineItem::new(format!("SKU-{i:03}"), 1))
        .collect()
}

fn stocked_coordinator(width: usize) -> SagaCoordinator<InMemoryInventoryStore, InMemoryOrderStore> {
    let inventory =
        InMemoryInventoryStore::with_stock((0..width).map(|i| (format!("SKU-{i:03}"), u64::MAX / 2)));
    SagaCoordinator::new(inventory, InMemoryOrderStore::new())
}

fn bench_fulfill(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("saga/fulfill");

    for width in [1usize, 10, 50] {
        let coordinator = stocked_coordinator(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.to_async(&rt)
                .iter(|| async { coordinator.fulfill(order_of(width)).await.unwrap() });
        });
    }

    group.finish();
}

fn bench_rejection(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let coordinator = stocked_coordinator(10);
    let mut order = order_of(10).into_line_items();
    order.push(OrderLineItem::new("SKU-MISSING", 1));
    let order = OrderRequest::new(order);

    c.bench_function("saga/reject_unknown_item", |b| {
        b.to_async(&rt)
            .iter(|| async { coordinator.fulfill(order.clone()).await.unwrap_err() });
    });
}

criterion_group!(benches, bench_fulfill, bench_rejection);
criterion_main!(benches);
