use sweep_core::{CanonicalDict, ErrorInfo, ResultTable, Schema, SweepError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("key", "biomodel_num")
        .with_hint("check the workunit line")
}

#[test]
fn display_includes_context_and_hint() {
    let err = SweepError::Parse(sample_info("P001", "wrong separator arity"));
    let text = err.to_string();
    assert!(text.starts_with("parse error: wrong separator arity (code: P001)"));
    assert!(text.contains("key=biomodel_num"));
    assert!(text.contains("hint: check the workunit line"));
}

#[test]
fn errors_roundtrip_through_json() {
    let err = SweepError::MissingExpansion(sample_info("M001", "no expansion"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"MissingExpansion\""));
    let back: SweepError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, err);
}

#[test]
fn foreign_key_is_invalid_key() {
    let schema = Schema::builder("abc").optional("a").optional("b").build();
    let err = CanonicalDict::new(&schema, [("d", 10)]).expect_err("foreign key");
    assert!(matches!(err, SweepError::InvalidKey(_)));
    assert_eq!(err.info().context.get("key").map(String::as_str), Some("d"));
}

#[test]
fn unencodable_string_is_invalid_value() {
    let schema = Schema::builder("abc").optional("a").build();
    let err = CanonicalDict::new(&schema, [("a", "x--y")]).expect_err("separator in value");
    assert!(matches!(err, SweepError::InvalidValue(_)));
}

#[test]
fn diverging_columns_are_inconsistent_length() {
    let mut columns = std::collections::BTreeMap::new();
    columns.insert("a".to_string(), vec![None, None]);
    columns.insert("b".to_string(), vec![None]);
    let err = ResultTable::from_columns(columns).expect_err("diverging");
    assert!(matches!(err, SweepError::InconsistentLength(_)));
}
