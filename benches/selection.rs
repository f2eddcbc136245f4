use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use autoguess::{
    BeliefState, CatalogIndex, Evidence, QuestionBank, QuestionSelector, RawRecord,
    ReasoningConfig, RuleSet, SelectionStrategy, SessionController,
};

const BRANDS: &[&str] = &["Maruti", "Tata", "Hyundai", "Honda", "Kia", "Mahindra", "Toyota", "BMW", "Skoda", "MG"];
const BODIES: &[&str] = &["hatchback", "sedan", "suv", "muv"];
const FUELS: &[&str] = &["petrol", "diesel", "cng", "electric"];
const PRICES: &[&str] = &["under_10l", "10-20l", "20-30l", "above_30l"];

/// Synthetic catalog of `size` distinct cars.
fn synthetic_catalog(size: usize) -> CatalogIndex {
    let records = (0..size).map(|i| {
        let price = PRICES[i % PRICES.len()];
        let fuel = FUELS[(i / 3) % FUELS.len()];
        let cc = if fuel == "electric" { 0 } else { 800 + (i * 37) % 1800 };
        RawRecord::new()
            .with("model", format!("Model {i} [{}]", 2005 + i % 20))
            .with("brand", BRANDS[i % BRANDS.len()])
            .with("body_type", BODIES[(i / 2) % BODIES.len()])
            .with("fuel_type", fuel)
            .with("price_range", price)
            .with("luxury", if price == "above_30l" && i % 2 == 0 { "yes" } else { "no" })
            .with("engine_cc", cc.to_string())
    });
    CatalogIndex::load(records).unwrap()
}

fn bench_catalog_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/catalog_load");
    for size in [100usize, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| synthetic_catalog(size));
        });
    }
    group.finish();
}

fn bench_score_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection/score_candidates");
    for size in [100usize, 1000] {
        let catalog = synthetic_catalog(size);
        let bank = QuestionBank::build(&catalog, true);
        let mut belief = BeliefState::for_catalog(&catalog);
        belief.apply_evidence(&catalog, &Evidence::new("body_type", "suv", 0.6));

        for strategy in [SelectionStrategy::Entropy, SelectionStrategy::Gini] {
            let selector = QuestionSelector::new(strategy);
            group.bench_with_input(BenchmarkId::new(strategy.as_str(), size), &size, |b, _| {
                b.iter(|| selector.score_candidates(&catalog, &belief, bank.iter()));
            });
        }
    }
    group.finish();
}

fn bench_full_session(c: &mut Criterion) {
    let catalog = Arc::new(synthetic_catalog(500));
    let rules = Arc::new(RuleSet::session_defaults());

    c.bench_function("selection/full_session_500", |b| {
        b.iter(|| {
            let mut session =
                SessionController::new(Arc::clone(&catalog), Arc::clone(&rules), ReasoningConfig::default());
            while let Some(question) = session.next_question() {
                let answer = question.options.first().and_then(|o| o.value.clone());
                session.record_answer(&question.id, answer, 0.9).unwrap();
            }
            session.best_guess()
        });
    });
}

criterion_group!(benches, bench_catalog_load, bench_score_candidates, bench_full_session);
criterion_main!(benches);
