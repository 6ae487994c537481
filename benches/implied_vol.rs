use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quantlens::implied::{black_price, NewtonRaphsonSolver};
use quantlens::types::OptionType;

fn single_solve(c: &mut Criterion) {
    let solver = NewtonRaphsonSolver::default();
    let mut group = c.benchmark_group("newton_solve");
    for strike in [80.0, 100.0, 120.0] {
        let price = black_price(100.0, strike, 0.5, 0.045, 0.3, OptionType::Call, 0.0).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(strike), &price, |b, &price| {
            b.iter(|| {
                solver.solve(
                    black_box(price),
                    100.0,
                    strike,
                    0.5,
                    0.045,
                    OptionType::Call,
                    0.0,
                )
            })
        });
    }
    group.finish();
}

fn chain_solve(c: &mut Criterion) {
    let solver = NewtonRaphsonSolver::default();
    let quotes: Vec<(f64, f64)> = (0..200)
        .map(|i| {
            let strike = 60.0 + 0.4 * i as f64;
            let vol = 0.2 + 0.25 * (1.0 - strike / 100.0).abs();
            let price = black_price(100.0, strike, 0.25, 0.045, vol, OptionType::Put, 0.0).unwrap();
            (strike, price)
        })
        .collect();
    c.bench_function("solve_200_puts", |b| {
        b.iter(|| {
            quotes
                .iter()
                .filter_map(|&(k, p)| {
                    solver
                        .solve(black_box(p), 100.0, k, 0.25, 0.045, OptionType::Put, 0.0)
                        .vol()
                })
                .count()
        })
    });
}

criterion_group!(benches, single_solve, chain_solve);
criterion_main!(benches);
