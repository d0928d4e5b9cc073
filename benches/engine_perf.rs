mod fixtures;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use reinsight::config::RoleTable;
use reinsight::facets::FacetIndex;
use reinsight::filter::{self, FilterSelection};
use reinsight::kpi;
use reinsight::normalize::normalize_all;
use reinsight::roles::{apply_scope, scope};
use reinsight::time::{TimeBucketer, YearWindow};

use fixtures::{LARGE, MEDIUM, SMALL, make_index, make_records, make_rows, typical_selection};

// ── Group 1: normalize — raw records to canonical rows ──────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for scenario in [&SMALL, &MEDIUM, &LARGE] {
        let records = make_records(scenario);
        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(scenario.name), &records, |b, records| {
            b.iter(|| normalize_all(records))
        });
    }
    group.finish();
}

// ── Group 2: index_build — scope then index ─────────────────────────────────

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    let table = RoleTable::canonical();
    let property = scope(&["property_underwriter"], &table);
    for scenario in [&SMALL, &MEDIUM, &LARGE] {
        let rows = make_rows(scenario);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::new("unrestricted", scenario.name), &rows, |b, rows| {
            b.iter(|| FacetIndex::build(rows, 1))
        });
        group.bench_with_input(BenchmarkId::new("property_scope", scenario.name), &rows, |b, rows| {
            b.iter(|| {
                let visible = apply_scope(rows, &property);
                FacetIndex::build(&visible, 1)
            })
        });
    }
    group.finish();
}

// ── Group 3: filter_apply — selection against a prebuilt index ─────────────

fn bench_filter_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_apply");
    for scenario in [&SMALL, &MEDIUM, &LARGE] {
        let rows = make_rows(scenario);
        let index = make_index(&rows);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::new("empty", scenario.name), &index, |b, index| {
            b.iter(|| filter::apply(index, &FilterSelection::new()))
        });
        group.bench_with_input(BenchmarkId::new("typical", scenario.name), &index, |b, index| {
            b.iter_batched(typical_selection, |sel| filter::apply(index, &sel), BatchSize::SmallInput)
        });
    }
    group.finish();
}

// ── Group 4: aggregate — KPI snapshot and period rollups ────────────────────

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let bucketer = TimeBucketer::new(YearWindow::REPORTING);
    for scenario in [&SMALL, &MEDIUM, &LARGE] {
        let rows = make_rows(scenario);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(BenchmarkId::new("snapshot", scenario.name), &rows, |b, rows| {
            b.iter(|| kpi::aggregate(rows))
        });
        group.bench_with_input(BenchmarkId::new("by_quarter", scenario.name), &rows, |b, rows| {
            b.iter(|| kpi::rollup_by_quarter(rows, &bucketer))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_index_build, bench_filter_apply, bench_aggregate);
criterion_main!(benches);
