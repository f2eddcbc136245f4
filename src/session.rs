//! Reasoning sessions.
//!
//! A [`SessionController`] owns everything that changes during one game:
//! the belief state, the asked-question set, fact strengths, and the facts
//! known or derived so far. The catalog and rule set are shared read-only.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::belief::{BeliefState, Evidence, Hypothesis};
use crate::catalog::{CatalogIndex, EntitySet};
use crate::config::ReasoningConfig;
use crate::entity::{EntityId, SessionId};
use crate::error::SessionError;
use crate::frame::EntityDescription;
use crate::question::{Question, QuestionBank};
use crate::record::fields;
use crate::rules::{DerivedFact, Facts, RuleSet};
use crate::selector::{QuestionSelector, SelectionMode};
use crate::value::Value;

/// Confidence of evidence produced by session rules.
pub const DERIVED_EVIDENCE_CONFIDENCE: f64 = 0.55;
/// Weight of evidence produced by session rules.
pub const DERIVED_EVIDENCE_WEIGHT: f64 = 0.7;
/// Probability multiplier for classic-era entities when the era question is skipped.
pub const CLASSIC_ERA_SKIP_PENALTY: f64 = 0.1;
/// Number of hypotheses reported by [`SessionController::trace`].
pub const TRACE_HYPOTHESES: usize = 5;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Still asking questions.
    Collecting,
    /// Confident, out of questions, or out of budget.
    Terminal,
}

/// Mutable per-session reasoning state.
#[derive(Debug, Clone)]
pub struct SessionState {
    belief: BeliefState,
    asked: BTreeSet<String>,
    known: BTreeMap<String, Vec<Value>>,
    derived: Facts,
    strength: HashMap<String, f64>,
    applied: HashSet<(String, Value)>,
}

impl SessionState {
    #[must_use]
    pub fn new(belief: BeliefState) -> Self {
        Self {
            belief,
            asked: BTreeSet::new(),
            known: BTreeMap::new(),
            derived: Facts::new(),
            strength: HashMap::new(),
            applied: HashSet::new(),
        }
    }

    #[must_use]
    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    /// Returns true if the question has been answered.
    #[must_use]
    pub fn is_asked(&self, question_id: &str) -> bool {
        self.asked.contains(question_id)
    }

    #[must_use]
    pub fn asked_count(&self) -> usize {
        self.asked.len()
    }

    /// Highest confidence observed for an attribute, 0 if none.
    #[must_use]
    pub fn strength(&self, attribute: &str) -> f64 {
        self.strength
            .get(&attribute.to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }

    /// First recorded value of a known attribute.
    #[must_use]
    pub fn known_fact(&self, attribute: &str) -> Option<&Value> {
        self.known
            .get(&attribute.to_lowercase())
            .and_then(|values| values.first())
    }

    /// Every value recorded per attribute, in answer order.
    #[must_use]
    pub fn known_facts(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.known
    }

    /// Facts derived by session rules.
    #[must_use]
    pub fn derived_facts(&self) -> &Facts {
        &self.derived
    }

    /// Returns true if evidence with this key has already been applied.
    #[must_use]
    pub fn has_applied(&self, attribute: &str, value: &Value) -> bool {
        self.applied
            .contains(&(attribute.to_lowercase(), value.normalized()))
    }

    pub(crate) fn mark_asked(&mut self, question_id: &str) -> bool {
        self.asked.insert(question_id.to_string())
    }

    pub(crate) fn record_strength(&mut self, attribute: &str, confidence: f64) {
        let entry = self.strength.entry(attribute.to_lowercase()).or_insert(0.0);
        *entry = entry.max(confidence);
    }

    pub(crate) fn add_known_fact(&mut self, attribute: &str, value: Value) {
        let value = value.normalized();
        let values = self.known.entry(attribute.to_lowercase()).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Applies evidence unless its key was applied before. Returns true if
    /// the belief state was updated.
    pub(crate) fn apply_evidence(&mut self, catalog: &CatalogIndex, evidence: &Evidence) -> bool {
        if !evidence.is_informative() {
            return false;
        }
        let Some(key) = evidence.key() else {
            return false;
        };
        if !self.applied.insert(key) {
            return false;
        }
        let outcome = self.belief.apply_evidence(catalog, evidence);
        tracing::debug!(
            attribute = %evidence.attribute,
            value = ?evidence.value,
            confidence = evidence.confidence,
            weight = evidence.weight,
            outcome = ?outcome,
            "evidence applied"
        );
        true
    }

    pub(crate) fn scale(&mut self, entities: &EntitySet, factor: f64) {
        self.belief.scale(entities, factor);
    }

    /// Runs session rules over known and derived facts and folds every new
    /// fact back in as weak evidence.
    pub(crate) fn forward_chain(&mut self, catalog: &CatalogIndex, rules: &RuleSet) -> Vec<DerivedFact> {
        let base: Facts = self
            .known
            .iter()
            .filter_map(|(attribute, values)| values.first().map(|v| (attribute.clone(), v.clone())))
            .collect();
        let added = rules.forward_chain(&base, &mut self.derived);
        for fact in &added {
            let evidence = Evidence::new(fact.attribute.as_str(), fact.value.clone(), DERIVED_EVIDENCE_CONFIDENCE)
                .with_weight(DERIVED_EVIDENCE_WEIGHT);
            self.apply_evidence(catalog, &evidence);
        }
        added
    }
}

/// The current best answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    pub entity_id: EntityId,
    pub probability: f64,
    pub description: EntityDescription,
}

/// Session metrics for front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPerformance {
    pub session_id: SessionId,
    /// Questions handed out by `next_question`.
    pub questions_issued: usize,
    /// Distinct questions answered.
    pub questions_answered: usize,
    pub elapsed_seconds: f64,
    pub terminal: bool,
    pub conclusion_reached: bool,
    /// Probability of the best guess, 0 without one.
    pub final_confidence: f64,
}

/// A hypothesis with its model name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedHypothesis {
    pub entity_id: EntityId,
    pub model: String,
    pub probability: f64,
}

/// Snapshot of a session's reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrace {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    /// Known values per attribute, sorted.
    pub known: BTreeMap<String, Vec<Value>>,
    pub derived: Facts,
    pub hypotheses: Vec<TracedHypothesis>,
}

/// Drives one reasoning session.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use autoguess::{CatalogIndex, RawRecord, ReasoningConfig, RuleSet, SessionController};
///
/// let car = |model: &str, brand: &str| {
///     RawRecord::new()
///         .with("model", model)
///         .with("brand", brand)
///         .with("body_type", "hatchback")
///         .with("fuel_type", "petrol")
///         .with("price_range", "under_10l")
///         .with("luxury", "no")
///         .with("engine_cc", "1197")
/// };
/// let catalog = Arc::new(CatalogIndex::load(vec![car("Swift", "Maruti"), car("Tiago", "Tata")]).unwrap());
/// let mut session = SessionController::new(
///     catalog,
///     Arc::new(RuleSet::session_defaults()),
///     ReasoningConfig::default(),
/// );
///
/// let question = session.next_question().unwrap();
/// let value = question.options[0].value.clone();
/// session.record_answer(&question.id, value, 1.0).unwrap();
/// assert!(session.best_guess().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SessionController {
    id: SessionId,
    catalog: Arc<CatalogIndex>,
    rules: Arc<RuleSet>,
    bank: QuestionBank,
    selector: QuestionSelector,
    config: ReasoningConfig,
    state: SessionState,
    issued: usize,
    exhausted: bool,
    last_mode: Option<SelectionMode>,
    started_at: DateTime<Utc>,
}

impl SessionController {
    /// Starts a session. `config` is expected to be validated already.
    #[must_use]
    pub fn new(catalog: Arc<CatalogIndex>, rules: Arc<RuleSet>, config: ReasoningConfig) -> Self {
        let bank = QuestionBank::build(&catalog, config.include_derived_questions);
        let state = SessionState::new(BeliefState::for_catalog(&catalog));
        let id = SessionId::new();
        tracing::info!(
            session = %id,
            entities = catalog.len(),
            questions = bank.len(),
            strategy = %config.strategy,
            "session started"
        );
        Self {
            id,
            catalog,
            rules,
            bank,
            selector: QuestionSelector::new(config.strategy),
            config,
            state,
            issued: 0,
            exhausted: false,
            last_mode: None,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// How the most recent question was chosen.
    #[must_use]
    pub fn last_selection_mode(&self) -> Option<SelectionMode> {
        self.last_mode
    }

    /// Returns the next question, or `None` once the session is terminal.
    pub fn next_question(&mut self) -> Option<Question> {
        if self.phase() == SessionPhase::Terminal {
            return None;
        }
        let Some(selection) = self.selector.select(&self.catalog, &self.bank, &mut self.state) else {
            self.exhausted = true;
            tracing::info!(session = %self.id, reason = "no candidates", "session terminal");
            return None;
        };
        self.issued += 1;
        self.last_mode = Some(selection.mode);
        Some(selection.question.clone())
    }

    /// Records an answer to a bank question.
    ///
    /// A `None` value or non-positive confidence only marks the question as
    /// asked. Skipping the era question penalizes classic-era entities.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        value: Option<Value>,
        confidence: f64,
    ) -> Result<(), SessionError> {
        let question = self
            .bank
            .get(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion {
                id: question_id.to_string(),
            })?;
        let attribute = question.attribute.to_lowercase();
        let weight = question.weight;

        let first_answer = self.state.mark_asked(question_id);
        self.state.record_strength(&attribute, confidence);

        if question_id == fields::ERA && value.is_none() {
            if first_answer {
                let classic = self
                    .catalog
                    .get_entities_matching(fields::ERA, &Value::from("classic"));
                tracing::debug!(entities = classic.len(), "era skipped, penalizing classic models");
                self.state.scale(classic, CLASSIC_ERA_SKIP_PENALTY);
            }
            return Ok(());
        }

        let Some(value) = value.filter(|_| confidence > 0.0) else {
            return Ok(());
        };
        self.state.add_known_fact(&attribute, value.clone());
        let evidence = Evidence {
            attribute,
            value: Some(value),
            confidence,
            weight,
        };
        self.state.apply_evidence(&self.catalog, &evidence);
        self.state.forward_chain(&self.catalog, &self.rules);

        if self.is_confident() {
            tracing::info!(
                session = %self.id,
                answered = self.state.asked_count(),
                "session terminal"
            );
        }
        Ok(())
    }

    /// True once the question budget is spent, or when the leader is both
    /// likely enough and far enough ahead of the runner-up.
    #[must_use]
    pub fn is_confident(&self) -> bool {
        if self.state.asked_count() >= self.config.max_questions {
            return true;
        }
        let belief = self.state.belief();
        belief.best().is_some_and(|best| {
            best.probability >= self.config.confidence_threshold
                && belief.gap() >= self.config.gap_threshold
        })
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.exhausted || self.is_confident() {
            SessionPhase::Terminal
        } else {
            SessionPhase::Collecting
        }
    }

    /// Top hypotheses, highest first.
    #[must_use]
    pub fn hypotheses(&self, top_n: usize) -> Vec<Hypothesis> {
        self.state.belief().ranked(Some(top_n))
    }

    /// The leading entity, or `None` if no entity holds any probability.
    #[must_use]
    pub fn best_guess(&self) -> Option<Guess> {
        let best = self.state.belief().best().filter(|h| h.probability > 0.0)?;
        let description = self.catalog.describe_entity(best.entity_id)?;
        Some(Guess {
            entity_id: best.entity_id,
            probability: best.probability,
            description,
        })
    }

    #[must_use]
    pub fn performance(&self) -> SessionPerformance {
        let guess = self.best_guess();
        #[allow(clippy::cast_precision_loss)]
        let elapsed_seconds = (Utc::now() - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        SessionPerformance {
            session_id: self.id,
            questions_issued: self.issued,
            questions_answered: self.state.asked_count(),
            elapsed_seconds,
            terminal: self.phase() == SessionPhase::Terminal,
            conclusion_reached: guess.is_some(),
            final_confidence: guess.map_or(0.0, |g| g.probability),
        }
    }

    #[must_use]
    pub fn trace(&self) -> SessionTrace {
        let known = self
            .state
            .known_facts()
            .iter()
            .map(|(attribute, values)| {
                let mut sorted = values.clone();
                sorted.sort();
                (attribute.clone(), sorted)
            })
            .collect();
        let hypotheses = self
            .hypotheses(TRACE_HYPOTHESES)
            .into_iter()
            .map(|h| TracedHypothesis {
                entity_id: h.entity_id,
                model: self
                    .catalog
                    .get_frame(h.entity_id)
                    .map(|f| f.model.clone())
                    .unwrap_or_default(),
                probability: h.probability,
            })
            .collect();
        SessionTrace {
            session_id: self.id,
            phase: self.phase(),
            known,
            derived: self.state.derived_facts().clone(),
            hypotheses,
        }
    }

    /// Clears all session state and restarts the clock.
    pub fn reset(&mut self) {
        self.state = SessionState::new(BeliefState::for_catalog(&self.catalog));
        self.issued = 0;
        self.exhausted = false;
        self.last_mode = None;
        self.started_at = Utc::now();
        tracing::info!(session = %self.id, "session reset");
    }
}
