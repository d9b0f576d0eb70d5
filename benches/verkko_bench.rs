// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use std::io::Write;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flate2::write::GzEncoder;
use flate2::Compression;

use verkko::http::decode_response;
use verkko::{parse_html, ExtractionEngine, QueryGroup, QuerySpec, RequestSpec};

fn listing_page(rows: usize) -> String {
    let mut html = String::from("<html><head><title>Listing</title></head><body><table>");
    for i in 0..rows {
        html.push_str(&format!(
            "<tr class=\"row item\"><td>{}</td><td><a href=\"/item/{}\">Item {}</a></td></tr>",
            i, i, i
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn html_parsing_benchmark(c: &mut Criterion) {
    let html = listing_page(200);

    c.bench_function("parse_html", |b| b.iter(|| black_box(parse_html(&html))));
}

fn extraction_benchmark(c: &mut Criterion) {
    let html = listing_page(200);
    let engine = ExtractionEngine::new();
    let spec = QuerySpec::keyed([(
        "rows",
        QueryGroup::new("//tr[@class~=\"item\"]", vec![])
            .field("id", "/td[1]")
            .field("link", "/td[2]/a/@href"),
    )]);

    c.bench_function("extract_rows", |b| {
        b.iter(|| black_box(engine.extract(html.as_bytes(), &spec)))
    });
}

fn multipart_benchmark(c: &mut Criterion) {
    let payload = Bytes::from(vec![b'x'; 64 * 1024]);

    c.bench_function("prepare_multipart", |b| {
        b.iter(|| {
            let prepared = RequestSpec::new("https://example.com/upload")
                .form("title", "report")
                .form("tags", vec!["a", "b", "c"])
                .file_bytes("doc", "report.bin", payload.clone())
                .prepare();
            black_box(prepared)
        })
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    let json = format!("[{}]", vec!["{\"a\":1}"; 1000].join(","));
    let _ = encoder.write_all(json.as_bytes());
    let body = Bytes::from(encoder.finish().unwrap_or_default());
    let headers = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Encoding: gzip\r\n\
                   Set-Cookie: a=1; Path=/\r\nSet-Cookie: b=2\r\n\r\n";

    c.bench_function("decode_gzip_json", |b| {
        b.iter(|| black_box(decode_response(200, headers, body.clone())))
    });
}

criterion_group!(
    benches,
    html_parsing_benchmark,
    extraction_benchmark,
    multipart_benchmark,
    decode_benchmark
);
criterion_main!(benches);
