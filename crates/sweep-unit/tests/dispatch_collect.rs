use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use sweep_core::{Scalar, Value};
use sweep_grid::{Factor, Hypercube};
use sweep_unit::{
    collect_results, dispatch, load_workunit_source, parse_workunit_source, plan_workunits,
    registry_read, registry_write, snapshot_paths, write_workunit_source, DispatchOpts,
    DispatchReport, FactorSpace, Registry, SyntheticEvaluator, Workunit, WorkunitState,
    BIOMODEL_NUM, DISPATCH_REPORT, METHOD, STATUS_KEY, STATUS_SUCCESS,
};
use tempfile::tempdir;

fn space() -> Arc<FactorSpace> {
    Arc::new(FactorSpace::fitting())
}

fn specs() -> Vec<String> {
    vec![
        "biomodel_num--1__method--leastsq".to_string(),
        "method--leastsq__biomodel_num--1".to_string(),
        "biomodel_num--2--3__method--leastsq".to_string(),
        "solver--1".to_string(),
    ]
}

#[test]
fn dispatch_dedupes_and_isolates_bad_units() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let evaluator = SyntheticEvaluator::new(&space).with_failing([3]);
    let mut opts = DispatchOpts::new(dir.path());
    opts.concurrency = 2;

    let report = dispatch(Arc::clone(&space), &specs(), &evaluator, &opts).expect("dispatch");
    assert_eq!(report.workunits.len(), 3);
    assert_eq!(report.failed_units().count(), 1);
    assert_eq!(report.workunits[2].encoding, "solver--1");

    let pair = &report.workunits[1];
    assert_eq!(pair.conditions, 2);
    assert_eq!(pair.completed, 2);
    assert_eq!(pair.failures, 1);
    assert_eq!(pair.state, Some(WorkunitState::Exhausted));
    assert!(dir.path().join(format!("{}.csv", pair.encoding)).is_file());

    let bytes = fs::read(dir.path().join(DISPATCH_REPORT)).expect("report file");
    let on_disk: DispatchReport = serde_json::from_slice(&bytes).expect("report json");
    assert_eq!(on_disk, report);
}

#[test]
fn second_dispatch_resumes_without_work() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let evaluator = SyntheticEvaluator::new(&space);
    let opts = DispatchOpts::new(dir.path());
    let all = specs();
    let valid = &all[..3];

    let first = dispatch(Arc::clone(&space), valid, &evaluator, &opts).expect("first");
    let second = dispatch(Arc::clone(&space), valid, &evaluator, &opts).expect("second");
    assert_eq!(first.specs_hash, second.specs_hash);
    assert!(second.workunits.iter().all(|unit| unit.processed == 0));
    assert!(second
        .workunits
        .iter()
        .all(|unit| unit.completed == unit.conditions));

    let mut fresh = opts.clone();
    fresh.resume = false;
    let third = dispatch(Arc::clone(&space), valid, &evaluator, &fresh).expect("third");
    assert_eq!(third.workunits[1].processed, 2);
}

#[test]
fn collected_results_merge_all_snapshots() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let evaluator = SyntheticEvaluator::new(&space);
    let mut opts = DispatchOpts::new(dir.path().join("nested"));
    opts.write_csv = false;
    dispatch(Arc::clone(&space), &specs()[..3], &evaluator, &opts).expect("dispatch");

    assert_eq!(snapshot_paths(dir.path()).expect("paths").len(), 2);
    let table = collect_results(Arc::clone(&space), dir.path()).expect("collect");
    assert_eq!(table.len().expect("length"), 3);

    let sqlite = Registry::from_path(dir.path().join("results.sqlite"));
    let export = table.to_tabular_export(space.factor_names());
    registry_write(&sqlite, &export).expect("sqlite write");
    let read_back = registry_read(&sqlite).expect("sqlite read");
    assert_eq!(read_back.columns, export.columns);
    assert_eq!(read_back.rows.len(), 3);
    let status_idx = read_back
        .columns
        .iter()
        .position(|name| name == STATUS_KEY)
        .expect("status column");
    assert!(read_back
        .rows
        .iter()
        .all(|row| row[status_idx] == Some(Scalar::from(STATUS_SUCCESS))));

    let csv = Registry::from_path(dir.path().join("results.csv"));
    registry_write(&csv, &export).expect("csv write");
    assert_eq!(registry_read(&csv).expect("csv read").rows.len(), 3);
}

#[test]
fn source_lines_skip_comments_and_blanks() {
    let text = "# sweep for leastsq\n\n  biomodel_num--1__method--leastsq  \n#biomodel_num--2\nbiomodel_num--3\n";
    assert_eq!(
        parse_workunit_source(text),
        vec![
            "biomodel_num--1__method--leastsq".to_string(),
            "biomodel_num--3".to_string()
        ]
    );
}

#[test]
fn planned_units_partition_the_sweep() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let base = BTreeMap::from([
        (METHOD.to_string(), Value::from("leastsq")),
        ("ts_instance".to_string(), Value::list([1, 2])),
    ]);
    let partition =
        Hypercube::from_factors(vec![Factor::new(BIOMODEL_NUM, [1, 2, 3])]).expect("partition");
    let planned = plan_workunits(&space, &base, &partition).expect("plan");
    assert_eq!(planned.len(), 3);

    let path = dir.path().join("workunits.txt");
    write_workunit_source(&path, &planned).expect("write");
    let loaded = load_workunit_source(&path).expect("load");
    assert_eq!(loaded, planned);

    let mut seen = std::collections::HashSet::new();
    for spec in &loaded {
        let unit = Workunit::from_encoding(Arc::clone(&space), spec).expect("unit");
        assert_eq!(unit.len(), 2);
        for condition in unit.iterate() {
            assert!(seen.insert(condition.encode()), "conditions overlap");
        }
    }
    assert_eq!(seen.len(), 6);
}
