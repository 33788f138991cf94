// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for FilterScope compilation and execution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use filterscope_core::{
    CompileOptions, CompilerConfig, Domain, FilterSet, FilterTriple, MemoryDatabase,
    ScopeCompiler, Value,
};

fn dashboard_filters() -> FilterSet {
    FilterSet::from_triples(vec![
        FilterTriple::new("region", "in", vec!["1", "4"]),
        FilterTriple::new("startDate", "win", "2023/01/01-2023/12/31"),
        FilterTriple::new("role", "in", vec!["Grantee Specialist", "Health Specialist"]),
        FilterTriple::new("topic", "nin", vec!["Coaching"]),
        FilterTriple::new("goalName", "nctn", "_pig"),
        FilterTriple::new("reportText", "ctn", "literacy"),
        FilterTriple::new("resourceUrl", "ctn", "eclkc"),
        FilterTriple::new("group", "in", vec!["My Group"]),
    ])
}

// ============================================================================
// Compilation Benchmarks
// ============================================================================

fn bench_compiler_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("compiler");
    group.bench_function("new", |b| {
        b.iter(|| black_box(ScopeCompiler::new(CompilerConfig::default()).unwrap()))
    });
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let compiler = ScopeCompiler::new(CompilerConfig::default()).unwrap();
    let options = CompileOptions::for_user(7);
    let filters = dashboard_filters();

    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Elements(filters.len() as u64));

    group.bench_function("dashboard", |b| {
        b.iter(|| black_box(compiler.compile(black_box(&filters), &options).unwrap()))
    });

    group.bench_function("dashboard_fingerprint", |b| {
        let result = compiler.compile(&filters, &options).unwrap();
        b.iter(|| black_box(result.fingerprint()))
    });

    group.bench_function("render_goal_sql", |b| {
        let result = compiler.compile(&filters, &options).unwrap();
        let scope = result.get(Domain::Goal).unwrap().clone();
        b.iter(|| black_box(scope.to_sql()))
    });

    group.finish();
}

// ============================================================================
// In-Memory Execution Benchmarks
// ============================================================================

fn grant_fixture(grants: i64, goals_per_grant: i64) -> MemoryDatabase {
    let mut db = MemoryDatabase::new();
    for grant in 1..=grants {
        db.insert(
            "Grants",
            vec![("id", Value::Int(grant)), ("regionId", Value::Int(grant % 12))],
        );
        for n in 0..goals_per_grant {
            let name = if n % 2 == 0 { "Feed the pig" } else { "Walk the dog" };
            db.insert(
                "Goals",
                vec![
                    ("id", Value::Int(grant * 1000 + n)),
                    ("grantId", Value::Int(grant)),
                    ("name", Value::text(name)),
                ],
            );
        }
    }
    db
}

fn bench_memory_select(c: &mut Criterion) {
    let compiler = ScopeCompiler::new(CompilerConfig::default()).unwrap();
    let options = CompileOptions::default();

    let mut group = c.benchmark_group("memory_select");
    for grants in [10i64, 50] {
        let db = grant_fixture(grants, 4);
        for condition in ["ctn", "nctn"] {
            let filters =
                FilterSet::from_triples(vec![FilterTriple::new("goalName", condition, "pig")]);
            let result = compiler.compile(&filters, &options).unwrap();
            let scope = result.get(Domain::Grant).unwrap().clone();
            group.throughput(Throughput::Elements(grants as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("goal_name_{}", condition), grants),
                &scope,
                |b, scope| b.iter(|| black_box(db.select(Domain::Grant, scope).unwrap())),
            );
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_compiler_construction,
    bench_compile,
    bench_memory_select,
);
criterion_main!(benches);
