use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use storefront_session::cache::{CacheOptions, TtlCache};
use storefront_session::tenant::resolver::{identify, tenant_path};
use storefront_session::tenant::RequestLocation;

fn benchmark_identify(c: &mut Criterion) {
    let locations: Vec<RequestLocation> = [
        "https://acme-other.platform.com/?tenant=acme",
        "https://platform.com/t/globex/products/42",
        "https://www.initech.platform.com/catalog",
        "http://localhost:4200/dashboard",
    ]
    .iter()
    .map(|s| s.parse().expect("Failed to parse location"))
    .collect();

    let mut group = c.benchmark_group("tenant_identification");

    group.bench_function("identify_all_sources", |b| {
        b.iter(|| {
            for location in &locations {
                black_box(identify(black_box(location), Some("umbrella")));
            }
        })
    });

    group.bench_function("tenant_path_rewrite", |b| {
        b.iter(|| tenant_path(black_box("/t/acme/products/42/reviews"), black_box("globex")))
    });

    group.finish();
}

fn benchmark_cache(c: &mut Criterion) {
    let cache = TtlCache::new(CacheOptions::default());
    for i in 0..100 {
        cache.set(format!("products?page={}", i), i);
    }

    c.bench_function("cache_hit", |b| {
        b.iter(|| cache.get(black_box("products?page=50")))
    });
}

criterion_group!(benches, benchmark_identify, benchmark_cache);
criterion_main!(benches);
