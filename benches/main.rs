use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reqwest::Method;

use postie::request::{normalize_headers, normalize_url};
use shared_types::KeyValuePair;

fn headers() -> Vec<KeyValuePair> {
    let mut pairs: Vec<KeyValuePair> = (0..32)
        .map(|i| KeyValuePair::new(format!("X-Header-{}", i % 20), format!("value-{}", i)))
        .collect();
    pairs.push(KeyValuePair::new("Content-Type", "application/json"));
    pairs.push(KeyValuePair::disabled("Authorization", "Bearer token"));
    pairs
}

fn normalization(c: &mut Criterion) {
    let pairs = headers();

    c.bench_function("normalize_headers GET", |b| {
        b.iter(|| normalize_headers(black_box(&Method::GET), black_box(&pairs)))
    });

    c.bench_function("normalize_headers POST", |b| {
        b.iter(|| normalize_headers(black_box(&Method::POST), black_box(&pairs)))
    });

    c.bench_function("normalize_url bare host", |b| {
        b.iter(|| normalize_url(black_box("api.example.com/v1/users?page=2")))
    });
}

criterion_group!(benches, normalization);
criterion_main!(benches);
