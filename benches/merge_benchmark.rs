//! Performance benchmarks for merging large SBOMs.
//!
//! Run with: cargo bench --bench merge_benchmark

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sbom_merge::model::{Bom, Component, Dependency, SpecVersion};
use sbom_merge::{merge_vex, MergeEngine, Vulnerability};
use std::hint::black_box;

/// Generate a BOM with `count` npm components in a chain of dependencies.
///
/// `offset` shifts the component range, so two BOMs generated with offsets
/// closer than `count` share components.
fn generate_bom(prefix: &str, count: usize, offset: usize) -> Bom {
    let mut bom = Bom::new(SpecVersion::V1_5);
    for i in offset..offset + count {
        let name = format!("component-{i}");
        let version = format!("1.{}.{}", i % 10, i % 100);
        bom.components.push(
            Component::new("library", name.clone())
                .with_bom_ref(format!("{prefix}-{i}"))
                .with_version(version.clone())
                .with_purl(format!("pkg:npm/{name}@{version}")),
        );
        if i + 1 < offset + count {
            bom.dependencies.push(Dependency::new(
                format!("{prefix}-{i}"),
                vec![format!("{prefix}-{}", i + 1)],
            ));
        }
    }
    bom
}

fn bench_merge_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_scaling");
    let engine = MergeEngine::new();

    for size in [100, 1_000, 5_000].iter() {
        // 90% overlap between the two inputs
        let first = generate_bom("a", *size, 0);
        let second = generate_bom("b", *size, size / 10);
        let inputs = [first, second];

        group.bench_with_input(BenchmarkId::new("two_documents", size), size, |b, _| {
            b.iter(|| {
                let _ = black_box(engine.merge(black_box(&inputs)));
            })
        });
    }

    group.finish();
}

fn bench_many_documents(c: &mut Criterion) {
    let inputs: Vec<Bom> = (0..20)
        .map(|i| generate_bom(&format!("doc{i}"), 250, i * 50))
        .collect();
    let engine = MergeEngine::new().hierarchical(true);

    c.bench_function("merge_20_documents", |b| {
        b.iter(|| {
            let _ = black_box(engine.merge(black_box(&inputs)));
        })
    });
}

fn bench_vex(c: &mut Criterion) {
    let sbom = generate_bom("a", 1_000, 0);
    let statements: Vec<Bom> = (0..10)
        .map(|round| {
            let mut vex = Bom::new(SpecVersion::V1_5);
            vex.vulnerabilities = (0..200)
                .map(|i| {
                    let mut vulnerability = Vulnerability::new(format!("CVE-2024-{i:04}"));
                    vulnerability.affects = vec![sbom_merge::model::Affects::new(format!(
                        "a-{}",
                        (i * 7 + round) % 1_000
                    ))];
                    vulnerability
                })
                .collect();
            vex
        })
        .collect();

    c.bench_function("merge_vex_10_documents", |b| {
        b.iter(|| {
            let _ = black_box(merge_vex(black_box(&sbom), black_box(&statements)));
        })
    });
}

criterion_group!(benches, bench_merge_scaling, bench_many_documents, bench_vex);
criterion_main!(benches);
