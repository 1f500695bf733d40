//! Pipeline benchmarks: one input per recovery path.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gm_parser::recover;
use gm_render::render_mermaid;

fn chain_document(nodes: usize) -> String {
    let node_items: Vec<String> = (0..nodes)
        .map(|i| format!(r#"{{"id":"stepNumber{i}","label":"Step {i}"}}"#))
        .collect();
    let edge_items: Vec<String> = (1..nodes)
        .map(|i| format!(r#"{{"from":"stepNumber{}","to":"stepNumber{i}"}}"#, i - 1))
        .collect();
    format!(
        r#"{{"nodes":[{}],"edges":[{}]}}"#,
        node_items.join(","),
        edge_items.join(",")
    )
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("recover");

    for nodes in [10, 100, 1000] {
        let strict = chain_document(nodes);
        group.bench_with_input(BenchmarkId::new("strict", nodes), &strict, |b, input| {
            b.iter(|| recover(black_box(input)))
        });

        let repaired = strict.replacen("}]", "},]", 1);
        group.bench_with_input(BenchmarkId::new("repaired", nodes), &repaired, |b, input| {
            b.iter(|| recover(black_box(input)))
        });

        let fragmented = format!("Part one:\n{strict}\nPart two:\n{strict}");
        group.bench_with_input(
            BenchmarkId::new("fragments", nodes),
            &fragmented,
            |b, input| b.iter(|| recover(black_box(input))),
        );
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let Ok(recovery) = recover(&chain_document(1000)) else {
        return;
    };
    c.bench_function("render/1000", |b| {
        b.iter(|| render_mermaid(black_box(&recovery.graph)))
    });
}

criterion_group!(benches, bench_paths, bench_render);
criterion_main!(benches);
