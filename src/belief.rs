//! Belief state: a probability distribution over catalog entities.
//!
//! The update rule is a tuned multiplicative heuristic, not a likelihood
//! model: matching entities are boosted, the rest penalized, and evidence
//! that no entity matches damps everything uniformly. The distribution is
//! re-normalized after every mutation and falls back to uniform if its mass
//! ever collapses.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogIndex, EntitySet};
use crate::entity::EntityId;
use crate::value::Value;

const MATCH_BOOST_RATE: f64 = 2.5;
const MISMATCH_PENALTY_RATE: f64 = 1.5;
const MISMATCH_PENALTY_FLOOR: f64 = 0.01;
const NO_MATCH_DAMPING_RATE: f64 = 0.4;
const NO_MATCH_DAMPING_FLOOR: f64 = 0.2;

/// One observation to fold into the belief state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Attribute observed.
    pub attribute: String,
    /// Observed value; `None` carries no information.
    pub value: Option<Value>,
    /// Confidence in (0, 1].
    pub confidence: f64,
    /// Non-negative strength multiplier.
    pub weight: f64,
}

impl Evidence {
    /// Creates evidence with weight 1.0.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<Value>, confidence: f64) -> Self {
        Self {
            attribute: attribute.into(),
            value: Some(value.into()),
            confidence,
            weight: 1.0,
        }
    }

    /// Creates evidence that carries no value.
    #[must_use]
    pub fn unknown(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: None,
            confidence: 0.0,
            weight: 1.0,
        }
    }

    /// Sets the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    /// Returns true if applying this evidence can change a belief state.
    #[must_use]
    pub fn is_informative(&self) -> bool {
        self.value.is_some() && self.confidence > 0.0
    }

    /// Deduplication key: lower-cased attribute and normalized value.
    #[must_use]
    pub fn key(&self) -> Option<(String, Value)> {
        self.value
            .as_ref()
            .map(|v| (self.attribute.to_lowercase(), v.normalized()))
    }
}

/// How a piece of evidence was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceOutcome {
    /// No value or non-positive confidence; nothing changed.
    Ignored,
    /// No entity matched; every probability was damped uniformly.
    Damped,
    /// Matching entities were boosted and the others penalized.
    Matched {
        /// Number of matching entities.
        matches: usize,
    },
}

/// A ranked entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub entity_id: EntityId,
    pub probability: f64,
}

/// Probability distribution over a fixed set of entities.
#[derive(Debug, Clone)]
pub struct BeliefState {
    ids: Arc<[EntityId]>,
    positions: Arc<HashMap<EntityId, usize>>,
    probabilities: Vec<f64>,
}

impl BeliefState {
    /// Creates a uniform distribution (`1/N` each). Duplicate IDs are ignored.
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut ordered = Vec::new();
        let mut positions = HashMap::new();
        for id in ids {
            if !positions.contains_key(&id) {
                positions.insert(id, ordered.len());
                ordered.push(id);
            }
        }
        let mut state = Self {
            ids: ordered.into(),
            positions: Arc::new(positions),
            probabilities: Vec::new(),
        };
        state.reset();
        state
    }

    /// Creates a uniform distribution over every catalog entity.
    #[must_use]
    pub fn for_catalog(catalog: &CatalogIndex) -> Self {
        Self::new(catalog.entity_ids())
    }

    /// Resets to the uniform prior.
    pub fn reset(&mut self) {
        let n = self.ids.len();
        #[allow(clippy::cast_precision_loss)]
        let base = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        self.probabilities = vec![base; n];
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Probability of one entity (0 if unknown).
    #[must_use]
    pub fn probability(&self, id: EntityId) -> f64 {
        self.positions
            .get(&id)
            .map_or(0.0, |&pos| self.probabilities[pos])
    }

    /// Iterates `(entity, probability)` in construction order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, f64)> + '_ {
        self.ids.iter().copied().zip(self.probabilities.iter().copied())
    }

    /// Total mass; 1 within floating tolerance for a non-empty state.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.probabilities.iter().sum()
    }

    /// Divides by the total mass, or resets to uniform if the mass collapsed.
    pub fn normalize(&mut self) {
        let total = self.total();
        if !(total > 0.0 && total.is_finite()) {
            if !self.is_empty() {
                tracing::warn!(total, "belief mass collapsed, resetting to uniform");
            }
            self.reset();
            return;
        }
        for p in &mut self.probabilities {
            *p /= total;
        }
    }

    /// Folds `evidence` into the distribution and re-normalizes.
    pub fn apply_evidence(&mut self, catalog: &CatalogIndex, evidence: &Evidence) -> EvidenceOutcome {
        let Some(value) = evidence.value.as_ref().filter(|_| evidence.confidence > 0.0) else {
            return EvidenceOutcome::Ignored;
        };
        let strength = evidence.confidence * evidence.weight;
        let matches = catalog.get_entities_matching(&evidence.attribute, value);

        let outcome = if matches.is_empty() {
            let damping = (1.0 - strength * NO_MATCH_DAMPING_RATE).max(NO_MATCH_DAMPING_FLOOR);
            for p in &mut self.probabilities {
                *p *= damping;
            }
            EvidenceOutcome::Damped
        } else {
            let boost = 1.0 + strength * MATCH_BOOST_RATE;
            let penalty = (1.0 - strength * MISMATCH_PENALTY_RATE).max(MISMATCH_PENALTY_FLOOR);
            for (id, p) in self.ids.iter().zip(self.probabilities.iter_mut()) {
                *p *= if matches.contains(id) { boost } else { penalty };
            }
            EvidenceOutcome::Matched {
                matches: matches.len(),
            }
        };
        self.normalize();
        outcome
    }

    /// Returns a copy with `evidence` applied, leaving `self` untouched.
    #[must_use]
    pub fn simulate_evidence(&self, catalog: &CatalogIndex, evidence: &Evidence) -> Self {
        let mut clone = self.clone();
        clone.apply_evidence(catalog, evidence);
        clone
    }

    /// Multiplies the probability of every entity in `entities` by `factor`
    /// and re-normalizes.
    pub fn scale(&mut self, entities: &EntitySet, factor: f64) {
        for id in entities {
            if let Some(&pos) = self.positions.get(id) {
                self.probabilities[pos] *= factor;
            }
        }
        self.normalize();
    }

    /// Shannon entropy in bits over non-zero probabilities.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        -self
            .probabilities
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| p * p.log2())
            .sum::<f64>()
    }

    /// Gini impurity: `1 - Σ p²`.
    #[must_use]
    pub fn gini_impurity(&self) -> f64 {
        1.0 - self.probabilities.iter().map(|p| p * p).sum::<f64>()
    }

    /// Entities by probability, highest first. Ties keep construction order.
    #[must_use]
    pub fn ranked(&self, top_n: Option<usize>) -> Vec<Hypothesis> {
        let mut order: Vec<usize> = (0..self.ids.len()).collect();
        order.sort_by(|&a, &b| self.probabilities[b].total_cmp(&self.probabilities[a]));
        order
            .into_iter()
            .take(top_n.unwrap_or(usize::MAX))
            .map(|pos| Hypothesis {
                entity_id: self.ids[pos],
                probability: self.probabilities[pos],
            })
            .collect()
    }

    /// The top-ranked entity.
    #[must_use]
    pub fn best(&self) -> Option<Hypothesis> {
        self.ranked(Some(1)).into_iter().next()
    }

    /// Probability of rank 1 minus rank 2; rank 1 alone if fewer than two.
    #[must_use]
    pub fn gap(&self) -> f64 {
        match self.ranked(Some(2)).as_slice() {
            [first, second] => first.probability - second.probability,
            [only] => only.probability,
            _ => 0.0,
        }
    }

    /// Summed probability of the given entities.
    #[must_use]
    pub fn probability_of(&self, entities: &EntitySet) -> f64 {
        entities.iter().map(|&id| self.probability(id)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;

    const EPS: f64 = 1e-9;

    fn car(model: &str, brand: &str, fuel: &str) -> RawRecord {
        RawRecord::new()
            .with("model", model)
            .with("brand", brand)
            .with("body_type", "hatchback")
            .with("fuel_type", fuel)
            .with("price_range", "under_10l")
            .with("luxury", "no")
            .with("engine_cc", "1197")
    }

    fn catalog() -> CatalogIndex {
        CatalogIndex::load(vec![
            car("A1", "A", "petrol"),
            car("A2", "A", "diesel"),
            car("B1", "B", "petrol"),
            car("C1", "C", "cng"),
        ])
        .unwrap()
    }

    #[test]
    fn uniform_prior() {
        let state = BeliefState::for_catalog(&catalog());
        assert_eq!(state.len(), 4);
        for (_, p) in state.iter() {
            assert!((p - 0.25).abs() < EPS);
        }
        assert!((state.entropy() - 2.0).abs() < EPS);
        assert!((state.gini_impurity() - 0.75).abs() < EPS);
    }

    #[test]
    fn empty_state_is_degenerate_but_safe() {
        let mut state = BeliefState::new(Vec::new());
        state.normalize();
        assert!(state.best().is_none());
        assert_eq!(state.gap(), 0.0);
        assert_eq!(state.entropy(), 0.0);
    }

    #[test]
    fn ignored_evidence_changes_nothing() {
        let c = catalog();
        let mut state = BeliefState::for_catalog(&c);
        let before = state.ranked(None);
        assert_eq!(
            state.apply_evidence(&c, &Evidence::unknown("brand")),
            EvidenceOutcome::Ignored
        );
        assert_eq!(
            state.apply_evidence(&c, &Evidence::new("brand", "a", 0.0)),
            EvidenceOutcome::Ignored
        );
        assert_eq!(state.ranked(None), before);
    }

    #[test]
    fn matching_evidence_boosts_matches() {
        let c = catalog();
        let mut state = BeliefState::for_catalog(&c);
        let outcome = state.apply_evidence(&c, &Evidence::new("brand", "A", 1.0));
        assert_eq!(outcome, EvidenceOutcome::Matched { matches: 2 });
        let a1 = state.probability(EntityId::new(0));
        let b1 = state.probability(EntityId::new(2));
        assert!(a1 > b1);
        assert!((state.total() - 1.0).abs() < EPS);
        // boost 3.5, penalty floor 0.01
        assert!((a1 / b1 - 350.0).abs() < 1e-6);
    }

    #[test]
    fn unmatched_evidence_damps_uniformly() {
        let c = catalog();
        let mut state = BeliefState::for_catalog(&c);
        state.apply_evidence(&c, &Evidence::new("brand", "A", 0.5));
        let before: Vec<f64> = state.iter().map(|(_, p)| p).collect();
        let outcome = state.apply_evidence(&c, &Evidence::new("fuel_type", "hydrogen", 1.0));
        assert_eq!(outcome, EvidenceOutcome::Damped);
        for ((_, after), before) in state.iter().zip(before) {
            assert!((after - before).abs() < EPS);
            assert!(after > 0.0);
        }
    }

    #[test]
    fn simulate_does_not_mutate() {
        let c = catalog();
        let state = BeliefState::for_catalog(&c);
        let simulated = state.simulate_evidence(&c, &Evidence::new("brand", "B", 0.8));
        assert!((state.probability(EntityId::new(2)) - 0.25).abs() < EPS);
        assert!(simulated.probability(EntityId::new(2)) > 0.25);
    }

    #[test]
    fn ranked_is_stable_on_ties() {
        let c = catalog();
        let mut state = BeliefState::for_catalog(&c);
        state.apply_evidence(&c, &Evidence::new("brand", "A", 1.0));
        let ranked = state.ranked(None);
        assert_eq!(ranked[0].entity_id, EntityId::new(0));
        assert_eq!(ranked[1].entity_id, EntityId::new(1));
        assert!((ranked[0].probability - ranked[1].probability).abs() < EPS);
        assert_eq!(state.gap(), ranked[0].probability - ranked[1].probability);
    }

    #[test]
    fn gap_with_single_entity_is_its_probability() {
        let state = BeliefState::new([EntityId::new(7)]);
        assert!((state.gap() - 1.0).abs() < EPS);
        assert_eq!(state.entropy(), 0.0);
    }

    #[test]
    fn scale_penalizes_and_renormalizes() {
        let c = catalog();
        let mut state = BeliefState::for_catalog(&c);
        let targets: EntitySet = [EntityId::new(3)].into_iter().collect();
        state.scale(&targets, 0.1);
        assert!((state.total() - 1.0).abs() < EPS);
        assert!(state.probability(EntityId::new(3)) < state.probability(EntityId::new(0)));
    }

    #[test]
    fn collapsed_mass_resets_to_uniform() {
        let c = catalog();
        let mut state = BeliefState::for_catalog(&c);
        let all: EntitySet = c.entity_ids().collect();
        state.scale(&all, 0.0);
        for (_, p) in state.iter() {
            assert!((p - 0.25).abs() < EPS);
        }
    }

    #[test]
    fn probability_of_sums_members() {
        let c = catalog();
        let state = BeliefState::for_catalog(&c);
        let a = c.get_entities_matching("brand", &Value::from("a"));
        assert!((state.probability_of(a) - 0.5).abs() < EPS);
    }

    #[test]
    fn evidence_key_normalizes() {
        let e = Evidence::new("Brand", " Maruti ", 0.9);
        assert_eq!(e.key(), Some(("brand".to_string(), Value::from("maruti"))));
        assert!(Evidence::unknown("brand").key().is_none());
    }
}
