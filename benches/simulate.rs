use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use saddle_scm::{simulate, DateWindow, ScenarioModifier, SimConfig, SimulationCache};

fn bench_simulate(c: &mut Criterion) {
    let config = SimConfig::reference(2027);
    let may = DateWindow::new(
        NaiveDate::from_ymd_opt(2027, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2027, 5, 31).unwrap(),
    );
    let scenarios = [
        ScenarioModifier::demand_surge(may, vec![], Decimal::from(20)),
        ScenarioModifier::shipping_delay(may, vec![], 7),
    ];

    c.bench_function("baseline_year", |b| {
        b.iter(|| simulate(black_box(&config), &[]).unwrap())
    });

    c.bench_function("baseline_and_scenario", |b| {
        b.iter(|| simulate(black_box(&config), black_box(&scenarios)).unwrap())
    });

    let cache = SimulationCache::new();
    c.bench_function("cached_lookup", |b| {
        b.iter(|| cache.get_or_simulate(black_box(&config), &scenarios).unwrap())
    });
}

criterion_group!(benches, bench_simulate);
criterion_main!(benches);
