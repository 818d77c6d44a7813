//! Library engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use libcat_bench::{generate_books, library, linked_config, random_ids, random_word, rng};
use libcat_core::{EngineConfig, Library};

/// Benchmark adding a whole catalog, with and without auto-links.
fn bench_add_books(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_books");

    for count in [100, 1_000, 10_000].iter() {
        let books = generate_books(*count, &mut rng());
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("plain", count), &books, |b, books| {
            b.iter(|| {
                let library = Library::default();
                for book in books {
                    library.add_book(black_box(book.clone())).unwrap();
                }
                black_box(library.len());
            });
        });

        group.bench_with_input(BenchmarkId::new("linked", count), &books, |b, books| {
            b.iter(|| {
                let library = Library::new(linked_config()).unwrap();
                for book in books {
                    library.add_book(black_box(book.clone())).unwrap();
                }
                black_box(library.len());
            });
        });
    }
    group.finish();
}

/// Benchmark add-then-remove on a populated catalog.
fn bench_add_remove(c: &mut Criterion) {
    let library = library(linked_config(), 10_000);
    let mut book = generate_books(1, &mut rng()).remove(0);
    book.title = format!("{} (bench copy)", book.title);

    c.bench_function("add_remove_10k", |b| {
        b.iter(|| {
            let id = library.add_book(black_box(book.clone())).unwrap();
            black_box(library.remove_book(id).unwrap());
        });
    });
}

/// Benchmark prefix search and autocomplete.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for count in [1_000, 10_000].iter() {
        let library = library(EngineConfig::default(), *count);
        let mut rng = rng();
        let prefixes: Vec<String> = (0..64)
            .map(|_| random_word(&mut rng).chars().take(3).collect())
            .collect();

        group.bench_with_input(BenchmarkId::new("prefix", count), &prefixes, |b, prefixes| {
            let mut i = 0;
            b.iter(|| {
                let prefix = &prefixes[i % prefixes.len()];
                i += 1;
                black_box(library.search(black_box(prefix)));
            });
        });

        group.bench_with_input(
            BenchmarkId::new("autocomplete", count),
            &prefixes,
            |b, prefixes| {
                let field = libcat_core::SearchField::Title;
                let mut i = 0;
                b.iter(|| {
                    let prefix = &prefixes[i % prefixes.len()];
                    i += 1;
                    black_box(library.autocomplete(&field, black_box(prefix), 10).unwrap());
                });
            },
        );
    }
    group.finish();
}

/// Benchmark recommendations with second-degree fallback.
fn bench_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");
    let count = 10_000;
    let library = library(linked_config(), count);
    let ids = random_ids(count, 256, &mut rng());

    for k in [5, 20].iter() {
        group.bench_with_input(BenchmarkId::new("single", k), k, |b, &k| {
            let mut i = 0;
            b.iter(|| {
                let id = ids[i % ids.len()];
                i += 1;
                black_box(library.recommend(id, k).unwrap());
            });
        });
    }

    group.bench_function("personalized_5_seeds", |b| {
        b.iter(|| {
            black_box(library.recommend_for(black_box(&ids[..5]), 10).unwrap());
        });
    });
    group.finish();
}

/// Benchmark rebuilding the catalog from its entries.
fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    group.sample_size(10);

    for count in [1_000, 10_000].iter() {
        let source = library(linked_config(), *count);
        let entries = source.entries();
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &entries, |b, entries| {
            let target = Library::new(linked_config()).unwrap();
            b.iter(|| {
                target.rebuild_from(black_box(entries.clone())).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add_books,
    bench_add_remove,
    bench_search,
    bench_recommend,
    bench_rebuild,
);
criterion_main!(benches);
