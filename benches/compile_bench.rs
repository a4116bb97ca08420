//! Benchmarks for the timeql query pipeline
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use timeql::query::{ast, parse_query, tokenize, Interpreter};
use timeql::Compiler;

const REPORT: &str = r#"
// monthly billing overview
WHERE year = 2024 AND month = 6 AND project IN ("Acme", "Globex", "Initech")
SHOW project, SUM(hours) AS "Hours", invoiced, budgetProgress
GROUP BY project
HAVING SUM(hours) > 10
ORDER BY hours DESC
LIMIT 25
VIEW table
PERIOD last-6-months
"#;

/// A WHERE clause with `conditions` AND-ed comparisons
fn long_condition(conditions: usize) -> String {
    let mut query = String::from("WHERE year = 2024");
    for i in 0..conditions {
        query.push_str(&format!(" AND project = \"P{}\"", i));
    }
    query
}

fn bench_front_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_end");
    group.throughput(Throughput::Bytes(REPORT.len() as u64));

    group.bench_function("tokenize", |b| {
        b.iter(|| tokenize(black_box(REPORT)).unwrap())
    });

    group.bench_function("parse", |b| {
        b.iter(|| parse_query(black_box(REPORT)).unwrap())
    });

    group.finish();
}

fn bench_conditions(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditions");

    for size in [10, 100, 1000] {
        let source = long_condition(size);
        let query = parse_query(&source).unwrap();

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("parse_{}", size), |b| {
            b.iter(|| parse_query(black_box(&source)).unwrap())
        });

        group.bench_function(format!("stats_{}", size), |b| {
            b.iter(|| ast::stats(black_box(&query)))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let query = parse_query(REPORT).unwrap();
    let interpreter = Interpreter::default();

    group.bench_function("interpret", |b| {
        b.iter(|| interpreter.interpret(black_box(&query)).unwrap())
    });

    let compiler = Compiler::default();

    group.bench_function("compile", |b| {
        b.iter(|| compiler.compile(black_box(REPORT)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_front_end, bench_conditions, bench_pipeline);
criterion_main!(benches);
