use criterion::{criterion_group, criterion_main, Criterion};
use search_core::extract::extract_html;
use search_core::tokenizer::tokenize;

const PAGE: &str = "<html><head><title>Bench</title><style>p{color:red}</style></head>\
<body><p>The quick brown fox jumps over the lazy dog.</p>\
<script>var x = 1;</script><div><p>Pack my box with five dozen liquor jugs.</p></div></body></html>";

fn bench_tokenize(c: &mut Criterion) {
    let text = PAGE.repeat(200);
    c.bench_function("tokenize_page_text", |b| b.iter(|| tokenize(&text)));
}

fn bench_extract(c: &mut Criterion) {
    c.bench_function("extract_page", |b| b.iter(|| extract_html(PAGE)));
}

criterion_group!(benches, bench_tokenize, bench_extract);
criterion_main!(benches);
