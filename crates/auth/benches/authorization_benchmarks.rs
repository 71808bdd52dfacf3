use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use applygate_auth::{GrantedSet, PermissionCatalog, PermissionCode};

fn build_catalog(modules: usize, actions: usize) -> PermissionCatalog {
    let mut builder = PermissionCatalog::builder();
    for m in 0..modules {
        for a in 0..actions {
            builder
                .register(&format!("module{m}.action{a}"), "benchmark permission")
                .unwrap();
        }
    }
    builder.build()
}

fn build_granted(patterns: usize) -> GrantedSet {
    let mut grants: Vec<String> = (0..patterns).map(|m| format!("module{m}.*")).collect();
    grants.push("*.action0".to_string());
    grants.push("module0.action1".to_string());
    GrantedSet::parse(grants).unwrap()
}

fn bench_has_permission(c: &mut Criterion) {
    let mut group = c.benchmark_group("has_permission");
    for patterns in [4usize, 16, 64] {
        let granted = build_granted(patterns);
        let hit = PermissionCode::parse("module0.action3").unwrap();
        let miss = PermissionCode::parse("nowhere.action3").unwrap();

        group.bench_with_input(BenchmarkId::new("hit", patterns), &granted, |b, g| {
            b.iter(|| black_box(g.has_permission(black_box(&hit))))
        });
        group.bench_with_input(BenchmarkId::new("miss", patterns), &granted, |b, g| {
            b.iter(|| black_box(g.has_permission(black_box(&miss))))
        });
    }
    group.finish();
}

fn bench_expand_wildcards(c: &mut Criterion) {
    let catalog = build_catalog(32, 8);
    let granted = build_granted(8);

    c.bench_function("expand_wildcards/32x8_catalog", |b| {
        b.iter(|| black_box(granted.expand_wildcards(black_box(&catalog))))
    });
}

criterion_group!(benches, bench_has_permission, bench_expand_wildcards);
criterion_main!(benches);
