use sweep_core::{CanonicalDict, Condition, Schema, SweepError, Value};
use sweep_grid::{expand, ExpansionTable, Exclusion, Factor, Hypercube};

fn schema() -> Schema {
    Schema::builder("toy")
        .field("biomodel_num", 1)
        .field("method", "leastsq")
        .build()
}

#[test]
fn universal_sentinel_uses_table() {
    let dict = CanonicalDict::new(&schema(), [("biomodel_num", "all")]).expect("dict");
    let table = ExpansionTable::new().with("biomodel_num", 1..=4);
    let cube = expand(&dict, &table).expect("expand");
    assert_eq!(cube.levels("biomodel_num").expect("levels").len(), 4);
    assert_eq!(cube.levels("method").expect("levels").len(), 1);
    assert_eq!(cube.multivalued_factors(), vec!["biomodel_num"]);
}

#[test]
fn missing_expansion_is_reported() {
    let dict = CanonicalDict::new(&schema(), [("method", "all")]).expect("dict");
    let err = expand(&dict, &ExpansionTable::new()).expect_err("no entry");
    assert!(matches!(err, SweepError::MissingExpansion(_)));
    assert_eq!(err.info().context.get("factor").map(String::as_str), Some("method"));
}

#[test]
fn empty_level_list_is_rejected() {
    let dict = CanonicalDict::new(&schema(), [("biomodel_num", Value::List(Vec::new()))]).expect("dict");
    let err = expand(&dict, &ExpansionTable::new()).expect_err("empty");
    assert!(matches!(err, SweepError::InvalidValue(_)));
}

#[test]
fn exclusion_skips_matching_projection() {
    let cube = Hypercube::from_factors(vec![
        Factor::new("biomodel_num", [1, 2, 3]),
        Factor::new("method", ["leastsq"]),
    ])
    .expect("cube");
    let excluded = Hypercube::from_factors(vec![Factor::new("biomodel_num", [2])]).expect("cube");
    let exclusion = Exclusion::from_hypercube(&excluded);
    let kept: Vec<String> = cube
        .conditions()
        .filter(|c| !exclusion.excludes(c))
        .map(|c| c.encode())
        .collect();
    assert_eq!(
        kept,
        vec!["biomodel_num--1__method--leastsq", "biomodel_num--3__method--leastsq"]
    );
}

#[test]
fn empty_exclusion_skips_nothing() {
    let exclusion = Exclusion::from_hypercube(&Hypercube::from_factors(Vec::new()).expect("cube"));
    let condition = Condition::new(&schema(), Vec::<(String, Value)>::new()).expect("condition");
    assert!(!exclusion.excludes(&condition));
}

#[test]
fn containment_checks_every_factor() {
    let cube = Hypercube::from_factors(vec![
        Factor::new("biomodel_num", [1, 2]),
        Factor::new("method", ["leastsq"]),
    ])
    .expect("cube");
    let inside = Condition::new(&schema(), [("biomodel_num", 2)]).expect("condition");
    let outside = Condition::new(&schema(), [("biomodel_num", 5)]).expect("condition");
    assert!(cube.contains(&inside));
    assert!(!cube.contains(&outside));
}

#[test]
fn hypercube_json_is_validated() {
    let err = serde_json::from_str::<Hypercube>(r#"[{"name":"a","levels":[]}]"#);
    assert!(err.is_err());
}

#[test]
fn hypercube_dict_keeps_every_factor() {
    let cube = Hypercube::from_factors(vec![
        Factor::new("biomodel_num", [1, 2]),
        Factor::new("method", ["leastsq"]),
    ])
    .expect("cube");
    let dict = cube.to_dict();
    assert!(!dict.is_empty());
    assert_eq!(dict.encode(), "biomodel_num--1--2__method--leastsq");
    let decoded = CanonicalDict::decode(&schema(), &dict.encode()).expect("decode");
    assert_eq!(decoded, dict);
    assert_eq!(expand(&decoded, &ExpansionTable::new()).expect("expand"), cube);
}
