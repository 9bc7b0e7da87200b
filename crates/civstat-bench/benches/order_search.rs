// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_arima::{OrderSearchConfig, SearchStrategy, search_orders};
use civstat_bench::ar1;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const WEEKS: usize = 104;

fn benchmark_order_search(c: &mut Criterion) {
    let series = ar1(WEEKS, 0.7, 0xfeed_f00d_dead_beef);
    let mut group = c.benchmark_group("order_search");
    group.sample_size(10);

    for strategy in [SearchStrategy::Stepwise, SearchStrategy::Exhaustive] {
        let config = OrderSearchConfig {
            strategy,
            ..OrderSearchConfig::default()
        };
        group.bench_function(format!("{}_n{WEEKS}_d0", strategy.label()), |b| {
            b.iter(|| {
                search_orders(black_box(&series), black_box(&config), Some(0))
                    .expect("search should succeed")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_order_search);
criterion_main!(benches);
