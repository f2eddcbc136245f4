use autoguess::{BeliefState, CatalogIndex, EntityId, Evidence, RawRecord};

const TOLERANCE: f64 = 1e-9;

fn catalog() -> CatalogIndex {
    let rows = [
        ("Alto K10", "Maruti", "hatchback", "petrol", "under_10l", "no", "998"),
        ("Swift VXi", "Maruti", "hatchback", "petrol", "under_10l", "no", "1197"),
        ("Ertiga ZXi", "Maruti", "muv", "cng", "10-20l", "no", "1462"),
        ("Nexon EV", "Tata", "suv", "electric", "10-20l", "no", "0"),
        ("Harrier XZ", "Tata", "suv", "diesel", "20-30l", "no", "1956"),
        ("Verna SX", "Hyundai", "sedan", "petrol", "10-20l", "no", "1497"),
        ("X1 sDrive", "BMW", "suv", "diesel", "above_30l", "yes", "1995"),
        ("Zen LXi", "Maruti", "hatchback", "petrol", "under_10l", "no", "993"),
    ];
    CatalogIndex::load(rows.iter().map(|(model, brand, body, fuel, price, luxury, cc)| {
        RawRecord::new()
            .with("model", *model)
            .with("brand", *brand)
            .with("body_type", *body)
            .with("fuel_type", *fuel)
            .with("price_range", *price)
            .with("luxury", *luxury)
            .with("engine_cc", *cc)
    }))
    .unwrap()
}

/// Deterministic evidence stream mixing matches, misses and varied strengths.
fn evidence_stream() -> Vec<Evidence> {
    let observations = [
        ("brand", "maruti"),
        ("fuel_type", "hydrogen"),
        ("body_type", "SUV"),
        ("price_segment", "premium"),
        ("engine_band", "light"),
        ("era", "classic"),
        ("brand", "unknown"),
        ("persona", "eco"),
        ("usage_profile", "city"),
        ("family_size", "large"),
    ];
    let mut seed: u64 = 0x2545_f491;
    observations
        .iter()
        .map(|(attribute, value)| {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let confidence = 0.05 + f64::from(u32::try_from(seed >> 40).unwrap() % 95) / 100.0;
            let weight = f64::from(u32::try_from(seed >> 50).unwrap() % 15) / 10.0;
            Evidence::new(*attribute, *value, confidence).with_weight(weight)
        })
        .collect()
}

#[test]
fn mass_stays_normalized_and_entropy_non_negative() {
    let catalog = catalog();
    let mut belief = BeliefState::for_catalog(&catalog);
    for evidence in evidence_stream() {
        belief.apply_evidence(&catalog, &evidence);
        assert!((belief.total() - 1.0).abs() < TOLERANCE, "mass drifted after {evidence:?}");
        assert!(belief.entropy() >= 0.0);
        assert!(belief.gini_impurity() >= 0.0);
        assert!(belief.iter().all(|(_, p)| p > 0.0 && p.is_finite()));
    }
}

#[test]
fn unmatched_evidence_preserves_ranking() {
    let catalog = catalog();
    let mut belief = BeliefState::for_catalog(&catalog);
    belief.apply_evidence(&catalog, &Evidence::new("brand", "tata", 0.6));
    belief.apply_evidence(&catalog, &Evidence::new("fuel_type", "diesel", 0.3));
    let before = belief.ranked(None);

    belief.apply_evidence(&catalog, &Evidence::new("fuel_type", "hydrogen", 0.9).with_weight(2.0));
    let after = belief.ranked(None);

    let ids = |hs: &[autoguess::Hypothesis]| hs.iter().map(|h| h.entity_id).collect::<Vec<_>>();
    assert_eq!(ids(&before), ids(&after));
    for (b, a) in before.iter().zip(&after) {
        assert!((b.probability - a.probability).abs() < TOLERANCE);
    }
}

#[test]
fn matches_gain_on_non_matches() {
    let catalog = catalog();
    let matching = EntityId::new(3);
    let other = EntityId::new(0);
    for (confidence, weight) in [(0.01, 0.01), (0.3, 1.0), (1.0, 0.5), (1.0, 3.0)] {
        let mut belief = BeliefState::for_catalog(&catalog);
        belief.apply_evidence(&catalog, &Evidence::new("brand", "maruti", 0.4));
        let before = belief.probability(matching) / belief.probability(other);
        belief.apply_evidence(
            &catalog,
            &Evidence::new("fuel_type", "electric", confidence).with_weight(weight),
        );
        let after = belief.probability(matching) / belief.probability(other);
        assert!(after > before, "ratio did not grow at c={confidence} w={weight}");
    }
}

#[test]
fn entropy_is_zero_only_for_point_mass() {
    let catalog = catalog();
    let single = BeliefState::new([EntityId::new(2)]);
    assert_eq!(single.entropy(), 0.0);

    let mut belief = BeliefState::for_catalog(&catalog);
    for _ in 0..3 {
        belief.apply_evidence(&catalog, &Evidence::new("model", "zen lxi", 1.0));
    }
    assert_eq!(belief.best().unwrap().entity_id, EntityId::new(7));
    assert!(belief.entropy() > 0.0);
}

#[test]
fn simulation_leaves_receiver_untouched() {
    let catalog = catalog();
    let belief = BeliefState::for_catalog(&catalog);
    let before = belief.ranked(None);
    for evidence in evidence_stream() {
        let simulated = belief.simulate_evidence(&catalog, &evidence);
        assert!((simulated.total() - 1.0).abs() < TOLERANCE);
    }
    assert_eq!(belief.ranked(None), before);
}
