//! Benchmarks for template rendering.
//!
//! - render/fresh: full render of a one-slot template into a new element
//! - render/patch: re-render of the same template into the same element
//! - render/list: full render of a list of nested templates
//!
//! Run with: cargo bench -p wecco-html --bench render_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use wecco_dom::Document;
use wecco_html::{Template, html, update_element};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Deterministic 16 character strings.
struct Strings(u64);

impl Strings {
    fn next(&mut self) -> String {
        (0..16)
            .map(|_| {
                self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                char::from(ALPHABET[(self.0 >> 33) as usize % ALPHABET.len()])
            })
            .collect()
    }
}

fn div(text: String) -> Template {
    html!("<div>" {text} "</div>")
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let doc = Document::new();
    let mut strings = Strings(7);

    group.bench_function("fresh", |b| {
        b.iter(|| {
            let e = doc.create_element("div");
            doc.body().append_child(&e).unwrap();
            update_element(&e, div(strings.next())).unwrap();
            e.remove().unwrap();
            black_box(e);
        })
    });

    let app = doc.create_element("div");
    doc.body().append_child(&app).unwrap();
    update_element(&app, div(strings.next())).unwrap();
    group.bench_function("patch", |b| {
        b.iter(|| {
            update_element(&app, div(strings.next())).unwrap();
            black_box(&app);
        })
    });

    for n in [10_usize, 100] {
        group.throughput(Throughput::Elements(n as u64));
        let items: Vec<String> = (0..n).map(|_| strings.next()).collect();
        group.bench_with_input(BenchmarkId::new("list", n), &items, |b, items| {
            b.iter(|| {
                let target = doc.create_element("ul");
                let rows: Vec<Template> = items.iter().map(|s| html!("<li>" {s.clone()} "</li>")).collect();
                html!("<ul>" {rows} "</ul>").apply_to(&target).unwrap();
                black_box(target);
            })
        });
    }

    group.finish();
    doc.collect_garbage();
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
