use criterion::{criterion_group, criterion_main, Criterion};
use sweep_grid::{Exclusion, Factor, Hypercube};

fn make_cube() -> Hypercube {
    Hypercube::from_factors(vec![
        Factor::new("biomodel_num", 1..=200),
        Factor::new("latincube_idx", 1..=10),
        Factor::new("method", ["leastsq", "differential_evolution"]),
        Factor::new("noise_mag", [0.0, 0.1]),
    ])
    .expect("cube")
}

fn bench_enumerate(c: &mut Criterion) {
    let cube = make_cube();
    let excluded =
        Hypercube::from_factors(vec![Factor::new("biomodel_num", (1..=200).step_by(7))])
            .expect("cube");
    let exclusion = Exclusion::from_hypercube(&excluded);
    c.bench_function("enumerate_hypercube", |b| {
        b.iter(|| cube.conditions().count());
    });
    c.bench_function("enumerate_with_exclusion", |b| {
        b.iter(|| cube.conditions().filter(|c| !exclusion.excludes(c)).count());
    });
}

criterion_group!(benches, bench_enumerate);
criterion_main!(benches);
