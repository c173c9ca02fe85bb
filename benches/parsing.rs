//! Benchmarks for counting and parsing markup.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use markpane::document::{Document, count};

fn bench_parse_simple(c: &mut Criterion) {
    let src = "# Hello\n\n**World**";
    c.bench_function("parse_simple", |b| {
        b.iter(|| Document::parse(black_box(src)).unwrap())
    });
}

fn bench_count_panel(c: &mut Criterion) {
    let src = include_str!("../tests/fixtures/panel.md");
    c.bench_function("count_panel", |b| b.iter(|| count(black_box(src))));
}

fn bench_parse_panel(c: &mut Criterion) {
    let src = include_str!("../tests/fixtures/panel.md");
    c.bench_function("parse_panel", |b| {
        b.iter(|| Document::parse(black_box(src)).unwrap())
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let src = include_str!("../tests/fixtures/panel.md").repeat(200);
    c.bench_function("parse_large", |b| {
        b.iter(|| Document::parse(black_box(&src)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_parse_simple,
    bench_count_panel,
    bench_parse_panel,
    bench_parse_large
);
criterion_main!(benches);
