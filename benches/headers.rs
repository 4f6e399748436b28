use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mimicnet::http::framing::{parse_headers, split_header_body};
use mimicnet::http::{HeaderCollector, HeaderSink};

const HEAD: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/html; charset=utf-8\r\n\
    Content-Length: 5120\r\n\
    Cache-Control: private, max-age=0\r\n\
    Set-Cookie: WMF-Last-Access=xxxxxxxxxxx; Path=/; HttpOnly\r\n\
    Set-Cookie: GeoIP=xxxxxxxxxxxxxxxxxxxxxxxxxxx; Path=/; secure\r\n\
    Strict-Transport-Security: max-age=106384710; includeSubDomains; preload\r\n\
    Vary: Accept-Encoding,Cookie,Authorization\r\n\
    Server: ATS/9.2.3\r\n\
    X-Cache: cp3066 miss, cp3066 hit/3\r\n\
    Date: Mon, 01 Jan 2024 00:00:00 GMT\r\n";

fn benchmark_parse_headers(c: &mut Criterion) {
    c.bench_function("parse_headers", |b| b.iter(|| parse_headers(black_box(HEAD))));
}

fn benchmark_header_collector(c: &mut Criterion) {
    c.bench_function("header_collector_lines", |b| {
        b.iter(|| {
            let collector = HeaderCollector::new();
            for line in HEAD.split_inclusive("\r\n") {
                collector.add_header_line(black_box(line));
            }
            black_box(collector.take())
        })
    });
}

fn benchmark_split_header_body(c: &mut Criterion) {
    let mut blob = HEAD.as_bytes().to_vec();
    blob.extend_from_slice(b"\r\n");
    blob.extend(std::iter::repeat(b'x').take(5120));

    c.bench_function("split_header_body", |b| {
        b.iter(|| split_header_body(black_box(&blob)).map(|(h, b)| h.len() + b.len()))
    });
}

criterion_group!(
    benches,
    benchmark_parse_headers,
    benchmark_header_collector,
    benchmark_split_header_body
);
criterion_main!(benches);
