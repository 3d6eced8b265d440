//! Benchmark for market listing and fulfillment.
//!
//! Run with: cargo bench --package hashrig_economy --bench market_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hashrig_economy::{Amount, FixedPoint, Item, ItemKind, Ledger, Levels, Market};

fn benchmark_list_and_buy(c: &mut Criterion) {
    let ledger = Ledger::new(Levels::new());
    let market = Market::new();
    ledger
        .credit("buyer", Amount::Real(FixedPoint::from_whole(1_000_000_000)))
        .unwrap();
    let price = FixedPoint::from_parts(0, 50_000_000);

    c.bench_function("list_then_fulfill", |b| {
        b.iter(|| {
            let item = Item::new(ItemKind::Gpu, 5);
            let id = item.id;
            ledger.add_item("seller", item);
            let listing = market.list_item(&ledger, "seller", id, price).unwrap();
            black_box(market.fulfill_listing(&ledger, "buyer", listing.id).unwrap());
        });
    });
}

fn benchmark_fulfill_in_deep_book(c: &mut Criterion) {
    c.bench_function("fulfill_last_of_1000", |b| {
        b.iter_batched(
            || {
                let ledger = Ledger::new(Levels::new());
                let market = Market::new();
                let mut last = None;
                for value in 0..1_000 {
                    let item = Item::new(ItemKind::Asic, value % 10 + 1);
                    let id = item.id;
                    ledger.add_item("seller", item);
                    last = Some(
                        market
                            .list_item(&ledger, "seller", id, FixedPoint::ZERO)
                            .unwrap()
                            .id,
                    );
                }
                (ledger, market, last.unwrap())
            },
            |(ledger, market, listing)| {
                black_box(market.fulfill_listing(&ledger, "buyer", listing).unwrap())
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, benchmark_list_and_buy, benchmark_fulfill_in_deep_book);
criterion_main!(benches);
