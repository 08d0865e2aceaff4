use proptest::prelude::*;
use sweep_core::{CanonicalDict, Schema, Value};
use sweep_grid::{expand, ExpansionTable, Factor, Hypercube};

#[test]
fn product_of_level_counts() {
    let cube = Hypercube::from_factors(vec![
        Factor::new("a", [1, 2]),
        Factor::new("b", [10]),
        Factor::new("c", 0..10),
    ])
    .expect("cube");
    assert_eq!(cube.len(), 20);
    assert_eq!(cube.conditions().count(), 2 * 1 * 10);
    assert_eq!(cube.conditions().len(), 20);
}

#[test]
fn repeated_enumerations_are_identical() {
    let cube = Hypercube::from_factors(vec![
        Factor::new("method", ["leastsq", "differential_evolution"]),
        Factor::new("noise_mag", [0.0, 0.1, 0.5]),
    ])
    .expect("cube");
    let first: Vec<String> = cube.conditions().map(|c| c.encode()).collect();
    let second: Vec<String> = cube.conditions().map(|c| c.encode()).collect();
    assert_eq!(first, second);
}

#[test]
fn restart_from_index_matches_tail() {
    let cube = Hypercube::from_factors(vec![
        Factor::new("a", [1, 2, 3]),
        Factor::new("b", [1, 2]),
    ])
    .expect("cube");
    let all: Vec<String> = cube.conditions().map(|c| c.encode()).collect();
    let tail: Vec<String> = cube.conditions_from(2).map(|c| c.encode()).collect();
    assert_eq!(&all[2..], tail.as_slice());
    for (idx, encoding) in all.iter().enumerate() {
        assert_eq!(&cube.condition_at(idx).expect("in range").encode(), encoding);
    }
    assert!(cube.condition_at(all.len()).is_none());
}

#[test]
fn expanded_dict_enumerates_in_key_order() {
    let schema = Schema::builder("abc").optional("a").optional("b").optional("c").build();
    let dict = CanonicalDict::new(
        &schema,
        [
            ("a", Value::list([1, 2])),
            ("b", Value::from(10)),
            ("c", Value::from("all")),
        ],
    )
    .expect("dict");
    let table = ExpansionTable::new().with("c", 0..4);
    let cube = expand(&dict, &table).expect("expand");
    assert_eq!(cube.len(), 8);
    let first = cube.conditions().next().expect("first");
    assert_eq!(first.encode(), "a--1__b--10__c--0");
    let second = cube.conditions().nth(1).expect("second");
    assert_eq!(second.encode(), "a--1__b--10__c--1");
}

proptest! {
    #[test]
    fn count_matches_len(sizes in prop::collection::vec(1usize..5, 0..5)) {
        let factors = sizes
            .iter()
            .enumerate()
            .map(|(idx, &size)| Factor::new(format!("f{idx}"), (0..size as i64).collect::<Vec<_>>()))
            .collect();
        let cube = Hypercube::from_factors(factors).unwrap();
        let expected: usize = sizes.iter().product();
        prop_assert_eq!(cube.len(), expected);
        let encodings: std::collections::HashSet<String> =
            cube.conditions().map(|c| c.encode()).collect();
        prop_assert_eq!(encodings.len(), expected);
    }
}
