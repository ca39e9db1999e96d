use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sni_detector::protocols::{http_protocol, tls_protocol};
use sni_detector::SnifferBuilder;

#[path = "../tests/common/mod.rs"]
mod common;

fn bench_parsers(c: &mut Criterion) {
    let record = common::client_hello(Some("bench.example.com"));
    let request = common::http_request("bench.example.com");

    c.bench_function("tls_parse_packet", |b| {
        b.iter(|| tls_protocol().parse_packet(black_box(&record)))
    });
    c.bench_function("http_parse_packet", |b| {
        b.iter(|| http_protocol().parse_packet(black_box(&request)))
    });
}

fn bench_sniffer(c: &mut Criterion) {
    let sniffer = SnifferBuilder::new().enable_all().build().unwrap();
    let request = common::http_request("bench.example.com");

    c.bench_function("sniff_http_tls_first", |b| {
        b.iter(|| sniffer.sniff(black_box(&request)))
    });
    c.bench_function("sniff_http_port_hint", |b| {
        b.iter(|| sniffer.sniff_with_port_hint(black_box(&request), 80))
    });
}

criterion_group!(benches, bench_parsers, bench_sniffer);
criterion_main!(benches);
