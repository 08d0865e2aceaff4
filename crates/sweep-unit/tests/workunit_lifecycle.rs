use std::sync::Arc;

use sweep_core::{Condition, Scalar, SweepError, Value};
use sweep_unit::{
    EvaluationFailure, FactorSpace, Metrics, SyntheticEvaluator, Workunit, WorkunitState,
    BIOMODEL_NUM, METHOD, RSSQ, STATUS_KEY, STATUS_SUCCESS,
};
use tempfile::tempdir;

fn space() -> Arc<FactorSpace> {
    Arc::new(FactorSpace::fitting())
}

fn five_biomodels(space: &Arc<FactorSpace>) -> Workunit {
    Workunit::from_args(
        Arc::clone(space),
        [(BIOMODEL_NUM, Value::list([1, 2, 3, 4, 5]))],
    )
    .expect("workunit")
}

fn rssq_evaluator(condition: &Condition) -> Result<Metrics, EvaluationFailure> {
    let biomodel = condition
        .get(BIOMODEL_NUM)
        .and_then(Scalar::as_int)
        .unwrap_or_default();
    Ok(Metrics::from([(RSSQ.to_string(), Scalar::Float(biomodel as f64 / 10.0))]))
}

#[test]
fn default_scenario_yields_single_condition() {
    let unit = Workunit::from_args(space(), [(METHOD, "leastsq")]).expect("workunit");
    assert!(unit.calc_multivalued_factors().is_empty());
    assert_eq!(unit.iterate().count(), 1);
    assert_eq!(
        unit.encoding(),
        "biomodel_num--1__columns_deleted--0__latincube_idx--1__max_fev--1000__\
         method--leastsq__noise_mag--0__range_max_frac--2.0__range_min_frac--0.5__ts_instance--1"
    );
    assert_eq!(unit.state(), WorkunitState::Fresh);
}

#[test]
fn universal_sentinel_stays_literal_in_identity() {
    let unit = Workunit::from_args(space(), [(BIOMODEL_NUM, "all")]).expect("workunit");
    assert_eq!(unit.len(), 1059);
    assert_eq!(unit.calc_multivalued_factors(), vec![BIOMODEL_NUM.to_string()]);
    assert!(unit.snapshot_filename().starts_with("wu_biomodel_num--all__"));
    assert!(unit.snapshot_filename().ends_with(".pcl"));
}

#[test]
fn exclusion_removes_matching_conditions() {
    let unit = Workunit::from_args(space(), [(BIOMODEL_NUM, Value::list([1, 2, 3]))])
        .expect("workunit")
        .exclude([(BIOMODEL_NUM, Value::list([2]))])
        .expect("exclusion");
    let biomodels: Vec<i64> = unit
        .iterate()
        .filter_map(|condition| condition.get(BIOMODEL_NUM).and_then(Scalar::as_int))
        .collect();
    assert_eq!(biomodels, vec![1, 3]);
    assert_eq!(unit.len(), 2);
}

#[test]
fn exclusion_rejects_unknown_factor() {
    let err = Workunit::from_args(space(), [(METHOD, "leastsq")])
        .expect("workunit")
        .exclude([("solver", 1)])
        .expect_err("unknown factor");
    assert!(matches!(err, SweepError::InvalidKey(_)));
}

#[test]
fn failing_condition_is_recorded_not_raised() {
    let space = space();
    let mut unit = five_biomodels(&space);
    let evaluator = |condition: &Condition| -> Result<Metrics, EvaluationFailure> {
        if condition.get(BIOMODEL_NUM) == Some(&Scalar::Int(2)) {
            return Err(EvaluationFailure::new("Cannot create model."));
        }
        rssq_evaluator(condition)
    };
    let summary = unit.run(&evaluator).expect("run");
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.failures, 1);
    assert_eq!(unit.results().len().expect("length"), 5);
    let status = unit.results().column(STATUS_KEY).expect("status column");
    assert_eq!(status[1], Some(Scalar::from("Cannot create model.")));
    assert_eq!(status[0], Some(Scalar::from(STATUS_SUCCESS)));
    assert_eq!(unit.results().column(RSSQ).expect("rssq column")[1], None);
    assert_eq!(unit.state(), WorkunitState::Exhausted);
}

#[test]
fn panicking_evaluator_does_not_stop_the_run() {
    let space = space();
    let mut unit = five_biomodels(&space);
    let evaluator = |condition: &Condition| -> Result<Metrics, EvaluationFailure> {
        if condition.get(BIOMODEL_NUM) == Some(&Scalar::Int(4)) {
            panic!("integrator blew up");
        }
        rssq_evaluator(condition)
    };
    let summary = unit.run(&evaluator).expect("run");
    assert_eq!(summary.failures, 1);
    let status = unit.results().column(STATUS_KEY).expect("status column");
    let text = status[3].as_ref().and_then(Scalar::as_str).expect("status text");
    assert!(text.contains("integrator blew up"));
}

#[test]
fn completed_run_resumes_with_nothing_pending() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let mut unit = five_biomodels(&space).persist_in(dir.path());
    unit.run(&SyntheticEvaluator::new(&space)).expect("run");
    let path = unit.snapshot_path().expect("bound").to_path_buf();
    assert!(path.is_file());

    let resumed = Workunit::deserialize(Arc::clone(&space), &path).expect("deserialize");
    assert_eq!(resumed.state(), WorkunitState::Resumed);
    assert_eq!(resumed.iterate().count(), 0);
    assert!(resumed.equals(&unit));
}

#[test]
fn interrupted_run_continues_from_next_condition() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let encoding = five_biomodels(&space).encoding();
    {
        let mut unit = Workunit::resume_or_new(Arc::clone(&space), &encoding, dir.path())
            .expect("fresh unit");
        assert_eq!(unit.state(), WorkunitState::Fresh);
        let first_two: Vec<Condition> = unit.iterate().take(2).collect();
        for condition in first_two {
            let mut record = sweep_core::ResultRecord::from_condition(
                unit.space().result_schema(),
                &condition,
            )
            .expect("record");
            record.set(STATUS_KEY, STATUS_SUCCESS).expect("status");
            unit.append_result(&record).expect("append");
            assert_eq!(unit.state(), WorkunitState::Persisted);
        }
    }

    let mut unit =
        Workunit::resume_or_new(Arc::clone(&space), &encoding, dir.path()).expect("resume");
    assert_eq!(unit.state(), WorkunitState::Resumed);
    assert_eq!(unit.pending_count(), 3);
    let summary = unit.run(&rssq_evaluator).expect("run");
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.skipped_completed, 2);
    assert_eq!(unit.results().len().expect("length"), 5);
}

#[test]
fn serialize_requires_a_bound_path() {
    let unit = Workunit::from_args(space(), [(METHOD, "leastsq")]).expect("workunit");
    let err = unit.serialize().expect_err("unbound");
    assert_eq!(err.info().code, "workunit.unbound");
}

#[test]
fn merge_keeps_rows_from_both_units() {
    let space = space();
    let mut left = Workunit::from_args(Arc::clone(&space), [(BIOMODEL_NUM, 1)]).expect("left");
    let mut right = Workunit::from_args(Arc::clone(&space), [(BIOMODEL_NUM, 2)]).expect("right");
    left.run(&rssq_evaluator).expect("left run");
    right.run(&rssq_evaluator).expect("right run");
    left.merge(&right).expect("merge");
    assert_eq!(left.results().len().expect("length"), 2);
    assert!(!left.equals(&right));
}

#[test]
fn csv_export_puts_factors_first() {
    let dir = tempdir().expect("tempdir");
    let mut unit = five_biomodels(&space());
    unit.run(&rssq_evaluator).expect("run");
    let path = dir.path().join("results.csv");
    unit.export_csv(&path).expect("export");
    let export = sweep_unit::read_csv(&path).expect("read");
    assert_eq!(export.columns[0], BIOMODEL_NUM);
    assert_eq!(export.rows.len(), 5);
    let status_idx = export
        .columns
        .iter()
        .position(|name| name == STATUS_KEY)
        .expect("status column");
    assert!(export.columns[..status_idx].contains(&METHOD.to_string()));
}

#[test]
fn failure_reasons_with_separators_are_kept_verbatim() {
    let space = space();
    for reason in [
        "ODE solver failed... retrying",
        "bad arg --x",
        "",
        "KeyError: '__init__'",
    ] {
        let mut unit = five_biomodels(&space);
        let evaluator = move |condition: &Condition| -> Result<Metrics, EvaluationFailure> {
            if condition.get(BIOMODEL_NUM) == Some(&Scalar::Int(2)) {
                return Err(EvaluationFailure::new(reason));
            }
            rssq_evaluator(condition)
        };
        let summary = unit.run(&evaluator).expect("run");
        assert_eq!(summary.processed, 5);
        assert_eq!(unit.results().len().expect("length"), 5);
        let status = unit.results().column(STATUS_KEY).expect("status column");
        assert_eq!(status[1], Some(Scalar::from(reason)));
        assert_eq!(status[4], Some(Scalar::from(STATUS_SUCCESS)));
    }
}

#[test]
fn separator_laden_status_survives_reload() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let mut unit = five_biomodels(&space).persist_in(dir.path());
    let evaluator = |_: &Condition| -> Result<Metrics, EvaluationFailure> {
        Err(EvaluationFailure::new("KeyError: '__init__'"))
    };
    unit.run(&evaluator).expect("run");
    let path = unit.snapshot_path().expect("bound").to_path_buf();
    let resumed = Workunit::deserialize(Arc::clone(&space), &path).expect("deserialize");
    assert!(resumed.equals(&unit));
    assert_eq!(resumed.pending_count(), 0);
}

#[test]
fn metric_overwriting_a_factor_is_recorded_as_failure() {
    let mut unit = Workunit::from_args(space(), [(BIOMODEL_NUM, 7)]).expect("workunit");
    let evaluator = |_: &Condition| -> Result<Metrics, EvaluationFailure> {
        Ok(Metrics::from([(BIOMODEL_NUM.to_string(), Scalar::Int(99))]))
    };
    let summary = unit.run(&evaluator).expect("run");
    assert_eq!(summary.failures, 1);
    assert_eq!(
        unit.results().column(BIOMODEL_NUM).expect("factor column"),
        &[Some(Scalar::Int(7))]
    );
    let status = unit.results().column(STATUS_KEY).expect("status column");
    let text = status[0].as_ref().and_then(Scalar::as_str).expect("status text");
    assert!(text.starts_with("Invalid metric"));
}

#[test]
fn non_finite_metrics_survive_reload() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let mut unit = Workunit::from_args(Arc::clone(&space), [(BIOMODEL_NUM, Value::list([1, 2, 3]))])
        .expect("workunit")
        .persist_in(dir.path());
    let evaluator = |condition: &Condition| -> Result<Metrics, EvaluationFailure> {
        let rssq = match condition.get(BIOMODEL_NUM).and_then(Scalar::as_int) {
            Some(1) => f64::NAN,
            Some(2) => f64::INFINITY,
            _ => f64::NEG_INFINITY,
        };
        Ok(Metrics::from([(RSSQ.to_string(), Scalar::Float(rssq))]))
    };
    unit.run(&evaluator).expect("run");
    let path = unit.snapshot_path().expect("bound").to_path_buf();

    let resumed = Workunit::deserialize(Arc::clone(&space), &path).expect("deserialize");
    assert!(resumed.equals(&unit));
    let rssq = resumed.results().column(RSSQ).expect("rssq column");
    assert!(matches!(rssq[0], Some(Scalar::Float(value)) if value.is_nan()));
    assert_eq!(rssq[1], Some(Scalar::Float(f64::INFINITY)));
    assert_eq!(rssq[2], Some(Scalar::Float(f64::NEG_INFINITY)));
}

#[test]
fn non_finite_factor_level_resumes() {
    let dir = tempdir().expect("tempdir");
    let space = space();
    let mut unit = Workunit::from_encoding(Arc::clone(&space), "biomodel_num--1__noise_mag--NaN")
        .expect("workunit")
        .persist_in(dir.path());
    unit.run(&rssq_evaluator).expect("run");
    let path = unit.snapshot_path().expect("bound").to_path_buf();

    let resumed = Workunit::deserialize(Arc::clone(&space), &path).expect("deserialize");
    assert!(resumed.equals(&unit));
    assert_eq!(resumed.iterate().count(), 0);
}
