//! Benchmarks for the packing driver, parsing, and interpretation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use packsearch::eval::{first_fit_decreasing, pack_with_scorer, probe_fingerprint, random_instance};
use packsearch::lang::{parse, Interpreter};

const BEST_FIT: &str = "fn score_bin(item, remaining, bin, step) {\n    \
                        return -(remaining - item);\n}";

fn bench_pack_with_scorer(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_with_scorer");

    for n_items in [50, 200, 1000] {
        let instance = random_instance(7, n_items, 100);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_items", n_items)),
            &n_items,
            |b, _| {
                b.iter(|| {
                    pack_with_scorer(black_box(&instance), |item, remaining, _, _| {
                        Ok::<f64, ()>(-(remaining - item))
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_interpreted_scorer(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreted_scorer");

    let program = parse(BEST_FIT).expect("benchmark script parses");
    for n_items in [50, 200] {
        let instance = random_instance(7, n_items, 100);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_items", n_items)),
            &n_items,
            |b, _| {
                b.iter(|| {
                    let mut interp = Interpreter::new(&program, 0);
                    pack_with_scorer(black_box(&instance), |item, remaining, bin, step| {
                        interp.call("score_bin", &[item, remaining, bin, step])
                    })
                });
            },
        );
    }

    group.finish();
}

fn bench_baseline_and_probe(c: &mut Criterion) {
    let instance = random_instance(7, 200, 100);
    c.bench_function("first_fit_decreasing_200", |b| {
        b.iter(|| first_fit_decreasing(black_box(&instance)));
    });

    let probe = packsearch::eval::probe_instance(1, 100);
    let program = parse(BEST_FIT).expect("benchmark script parses");
    c.bench_function("probe_fingerprint", |b| {
        b.iter(|| {
            let mut interp = Interpreter::new(&program, 0);
            probe_fingerprint(black_box(&probe), |item, remaining, bin, step| {
                interp.call("score_bin", &[item, remaining, bin, step])
            })
        });
    });
}

criterion_group!(
    benches,
    bench_pack_with_scorer,
    bench_interpreted_scorer,
    bench_baseline_and_probe
);
criterion_main!(benches);
