use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grasql::{compile, fixtures, DialectName};

fn bench_simple_select(c: &mut Criterion) {
    let qcode = fixtures::simple_select();
    let mut group = c.benchmark_group("simple_select");
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite, DialectName::MongoDb] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{dialect:?}")), &dialect, |b, &dialect| {
            b.iter(|| compile(black_box(&qcode), dialect, "bench-seed").unwrap());
        });
    }
    group.finish();
}

fn bench_one_to_many_with_cursor(c: &mut Criterion) {
    let qcode = fixtures::one_to_many_with_cursor();
    let mut group = c.benchmark_group("one_to_many_with_cursor");
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite, DialectName::MsSql, DialectName::MongoDb] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{dialect:?}")), &dialect, |b, &dialect| {
            b.iter(|| compile(black_box(&qcode), dialect, "bench-seed").unwrap());
        });
    }
    group.finish();
}

fn bench_filtered_select(c: &mut Criterion) {
    let qcode = fixtures::filtered_select();
    let mut group = c.benchmark_group("filtered_select");
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{dialect:?}")), &dialect, |b, &dialect| {
            b.iter(|| compile(black_box(&qcode), dialect, "bench-seed").unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_simple_select, bench_one_to_many_with_cursor, bench_filtered_select);
criterion_main!(benches);
