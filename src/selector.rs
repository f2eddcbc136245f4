//! Question selection.
//!
//! Each turn the selector filters the bank down to a candidate pool, then
//! either discriminates between the leading hypotheses (backward mode) or
//! picks the candidate with the greatest expected impurity reduction
//! (forward mode).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::belief::{BeliefState, Evidence, Hypothesis};
use crate::catalog::CatalogIndex;
use crate::error::ValidationError;
use crate::question::{Question, QuestionBank};
use crate::record::fields;
use crate::rules::derived;
use crate::session::SessionState;
use crate::value::Value;

/// Fact strength at which an attribute counts as settled.
pub const SETTLED_STRENGTH: f64 = 0.95;
/// Leader probability that switches selection to backward mode.
pub const BACKWARD_ACTIVATION: f64 = 0.35;
/// Number of top hypotheses compared in backward mode.
pub const DISCRIMINATION_WINDOW: usize = 3;
/// Confidence of the hypothetical answers used for scoring.
pub const SIMULATED_CONFIDENCE: f64 = 0.8;
/// Confidence of the auto-applied non-luxury evidence.
pub const AUTO_NON_LUXURY_CONFIDENCE: f64 = 0.95;

/// Backward-mode attribute order.
pub const ATTRIBUTE_PRIORITY: &[&str] = &[
    fields::BRAND,
    fields::BODY_TYPE,
    fields::ERA,
    fields::FUEL_TYPE,
    fields::PRICE_RANGE,
    fields::LUXURY,
    derived::USAGE_PROFILE,
    derived::PERSONA,
    derived::FAMILY_SIZE,
    derived::ENGINE_BAND,
];

/// Price buckets that rule out a luxury badge.
const NON_LUXURY_PRICE_RANGES: &[&str] = &["under_10l", "10-20l", "20-30l"];

/// Splitting criterion for forward selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Shannon entropy reduction (information gain).
    #[default]
    Entropy,
    /// Gini impurity reduction.
    Gini,
}

impl SelectionStrategy {
    /// Impurity of a belief state under this criterion.
    #[must_use]
    pub fn impurity(self, belief: &BeliefState) -> f64 {
        match self {
            Self::Entropy => belief.entropy(),
            Self::Gini => belief.gini_impurity(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entropy => "entropy",
            Self::Gini => "gini",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entropy" => Ok(Self::Entropy),
            "gini" => Ok(Self::Gini),
            other => Err(ValidationError::InvalidConfig {
                reason: format!("unknown selection strategy '{other}'"),
            }),
        }
    }
}

/// How a question was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Highest expected impurity reduction.
    Forward,
    /// Separates the leader from its closest competitors.
    Backward,
}

/// A selected question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'b> {
    pub question: &'b Question,
    pub mode: SelectionMode,
    /// Forward score; `None` in backward mode.
    pub score: Option<f64>,
}

/// A candidate with its forward score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredQuestion<'b> {
    pub question: &'b Question,
    pub score: f64,
}

/// Chooses the next question for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionSelector {
    strategy: SelectionStrategy,
}

impl QuestionSelector {
    #[must_use]
    pub const fn new(strategy: SelectionStrategy) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub const fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Picks the next question, or `None` when the candidate pool is empty.
    ///
    /// Filtering may fold auto-applied evidence into `state`.
    pub fn select<'b>(
        &self,
        catalog: &CatalogIndex,
        bank: &'b QuestionBank,
        state: &mut SessionState,
    ) -> Option<Selection<'b>> {
        let pool = self.candidates(catalog, bank, state);
        if pool.is_empty() {
            tracing::debug!("candidate pool exhausted");
            return None;
        }

        if let Some(question) = self.backward_choice(catalog, bank, state, &pool) {
            tracing::debug!(question = %question.id, mode = "backward", "question selected");
            return Some(Selection {
                question,
                mode: SelectionMode::Backward,
                score: None,
            });
        }

        let scored = self.score_candidates(catalog, state.belief(), pool);
        let mut best: Option<ScoredQuestion<'b>> = None;
        for candidate in scored {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best.map(|chosen| {
            tracing::debug!(
                question = %chosen.question.id,
                mode = "forward",
                strategy = %self.strategy,
                score = chosen.score,
                "question selected"
            );
            Selection {
                question: chosen.question,
                mode: SelectionMode::Forward,
                score: Some(chosen.score),
            }
        })
    }

    /// The candidate pool: unasked, unsettled, and consistent with known facts.
    ///
    /// When the known price bracket rules out a luxury badge, non-luxury
    /// evidence is applied to `state` and the luxury question is dropped.
    pub fn candidates<'b>(
        &self,
        catalog: &CatalogIndex,
        bank: &'b QuestionBank,
        state: &mut SessionState,
    ) -> Vec<&'b Question> {
        let fuel_is_electric = state
            .known_fact(fields::FUEL_TYPE)
            .is_some_and(|v| v.matches(&Value::from("electric")));
        let body_is_hatchback = state
            .known_fact(fields::BODY_TYPE)
            .is_some_and(|v| v.matches(&Value::from("hatchback")));
        let price_rules_out_luxury = state
            .known_fact(fields::PRICE_RANGE)
            .and_then(Value::as_text)
            .is_some_and(|range| NON_LUXURY_PRICE_RANGES.contains(&range));

        let mut pool = Vec::new();
        for question in bank.iter() {
            if state.is_asked(&question.id) || state.strength(&question.attribute) >= SETTLED_STRENGTH {
                continue;
            }
            let attribute = question.attribute.as_str();
            if fuel_is_electric && matches!(attribute, fields::ENGINE_CC | derived::ENGINE_BAND) {
                continue;
            }
            if attribute == fields::LUXURY && price_rules_out_luxury {
                if state.apply_evidence(
                    catalog,
                    &Evidence::new(fields::LUXURY, false, AUTO_NON_LUXURY_CONFIDENCE),
                ) {
                    tracing::debug!("price bracket rules out luxury, non-luxury evidence applied");
                }
                continue;
            }
            if attribute == derived::FAMILY_SIZE
                && body_is_hatchback
                && question.offers(&Value::from("large"))
            {
                continue;
            }
            pool.push(question);
        }
        pool
    }

    /// Forward score of every candidate, in the given order.
    pub fn score_candidates<'b>(
        &self,
        catalog: &CatalogIndex,
        belief: &BeliefState,
        candidates: impl IntoIterator<Item = &'b Question>,
    ) -> Vec<ScoredQuestion<'b>> {
        let current = self.strategy.impurity(belief);
        candidates
            .into_iter()
            .map(|question| ScoredQuestion {
                question,
                score: self.reduction(catalog, belief, question, current),
            })
            .collect()
    }

    /// Expected impurity reduction of asking `question`.
    #[must_use]
    pub fn score(&self, catalog: &CatalogIndex, belief: &BeliefState, question: &Question) -> f64 {
        self.reduction(catalog, belief, question, self.strategy.impurity(belief))
    }

    fn reduction(
        &self,
        catalog: &CatalogIndex,
        belief: &BeliefState,
        question: &Question,
        current: f64,
    ) -> f64 {
        let masses: Vec<(&Value, f64)> = question
            .valued_options()
            .map(|(_, value)| {
                let matching = catalog.get_entities_matching(&question.attribute, value);
                (value, belief.probability_of(matching))
            })
            .collect();
        let total: f64 = masses.iter().map(|(_, mass)| mass).sum();
        if total <= 0.0 {
            return 0.0;
        }

        let expected: f64 = masses
            .into_iter()
            .filter(|(_, mass)| *mass > 0.0)
            .map(|(value, mass)| {
                let evidence = Evidence::new(question.attribute.as_str(), value.clone(), SIMULATED_CONFIDENCE)
                    .with_weight(question.weight);
                let simulated = belief.simulate_evidence(catalog, &evidence);
                (mass / total) * self.strategy.impurity(&simulated)
            })
            .sum();
        current - expected
    }

    fn backward_choice<'b>(
        &self,
        catalog: &CatalogIndex,
        bank: &QuestionBank,
        state: &SessionState,
        pool: &[&'b Question],
    ) -> Option<&'b Question> {
        let leader = state.belief().best()?;
        if leader.probability < BACKWARD_ACTIVATION {
            return None;
        }

        let ranked = state.belief().ranked(Some(DISCRIMINATION_WINDOW));
        let attributes: Vec<&str> = if ranked.len() < 2 {
            priority_attributes(bank).collect()
        } else {
            priority_attributes(bank)
                .filter(|attribute| discriminates(catalog, attribute, &ranked))
                .collect()
        };

        attributes
            .into_iter()
            .find_map(|attribute| pool.iter().copied().find(|q| q.attribute == attribute))
    }
}

fn priority_attributes(bank: &QuestionBank) -> impl Iterator<Item = &'static str> + '_ {
    ATTRIBUTE_PRIORITY
        .iter()
        .copied()
        .filter(move |attribute| bank.contains(attribute))
}

/// True if the leader has a value for `attribute` and no competitor shares it.
fn discriminates(catalog: &CatalogIndex, attribute: &str, ranked: &[Hypothesis]) -> bool {
    let Some((leader, competitors)) = ranked.split_first() else {
        return false;
    };
    let Some(value) = catalog
        .get_frame(leader.entity_id)
        .and_then(|frame| frame.get(attribute))
    else {
        return false;
    };
    competitors.iter().all(|competitor| {
        !catalog
            .get_frame(competitor.entity_id)
            .is_some_and(|frame| frame.has(attribute, value))
    })
}
