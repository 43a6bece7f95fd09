use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fleetstore::core::config::Config;
use fleetstore::core::store::Store;
use fleetstore::datastore::inventory;
use fleetstore::datastore::labels::{self, LabelSpec, MembershipPlan};
use fleetstore::datastore::results::{self, ResultRow};
use fleetstore::datastore::LabelId;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

fn bench_store(max_rows: usize) -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        max_query_report_rows: max_rows,
        audit_log: false,
        ..Config::default()
    };
    let store = Store::open_with_config(temp_dir.path(), config).unwrap();
    (temp_dir, store)
}

fn rows(query_id: i64, host_id: i64, n: usize) -> Vec<ResultRow> {
    (0..n)
        .map(|i| ResultRow::new(query_id, host_id, i as i64, format!(r#"{{"pid":{i}}}"#).into_bytes()))
        .collect()
}

/// Overwrite one host's rows at several batch sizes
fn bench_overwrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("results_overwrite");
    group.measurement_time(Duration::from_secs(10));

    for size in [10usize, 100, 1000] {
        let (_tmp, store) = bench_store(size * 2);
        let batch = rows(1, 1, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| black_box(results::overwrite_query_result_rows(&store, batch).unwrap()));
        });
    }

    group.finish();
}

/// Save into a query that is already full (admission drops everything)
fn bench_save_full_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("results_save_full");
    let (_tmp, store) = bench_store(100);
    results::save_query_result_rows(&store, &rows(1, 1, 100)).unwrap();
    let batch = rows(1, 2, 100);

    group.bench_function("drop_100", |b| {
        b.iter(|| black_box(results::save_query_result_rows(&store, &batch).unwrap()));
    });

    group.finish();
}

/// Reconcile one host against many labels
fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("labels_reconcile");
    group.measurement_time(Duration::from_secs(10));

    let (_tmp, store) = bench_store(10);
    let host = inventory::enroll_host(&store, "bench-host", "ubuntu", "22.04").unwrap();
    let names: Vec<String> = (0..500).map(|i| format!("label-{i}")).collect();
    let specs: Vec<LabelSpec> = names
        .iter()
        .map(|n| LabelSpec {
            name: n.clone(),
            query: "SELECT 1".into(),
            ..LabelSpec::default()
        })
        .collect();
    labels::apply_label_specs(&store, &specs).unwrap();
    let ids = labels::label_ids_by_name(&store, &names).unwrap();

    for count in [10usize, 100, 500] {
        let input: HashMap<LabelId, Option<bool>> = ids[..count]
            .iter()
            .map(|&id| (id, Some(id % 2 == 0)))
            .collect();

        group.bench_with_input(BenchmarkId::new("plan", count), &input, |b, input| {
            b.iter(|| black_box(MembershipPlan::from_results(host.id, input, 1).statements()));
        });
        group.bench_with_input(BenchmarkId::new("record", count), &input, |b, input| {
            b.iter(|| {
                black_box(labels::record_label_query_executions(&store, host.id, input, 1).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_overwrite, bench_save_full_query, bench_reconcile);
criterion_main!(benches);
