//! Reasoning configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::selector::SelectionStrategy;

/// Termination thresholds, question budget and selection strategy.
///
/// # Examples
///
/// ```
/// use autoguess::{ReasoningConfig, SelectionStrategy};
///
/// let config = ReasoningConfig::from_toml_str("strategy = \"gini\"\nmax_questions = 10").unwrap();
/// assert_eq!(config.strategy, SelectionStrategy::Gini);
/// assert_eq!(config.max_questions, 10);
/// assert_eq!(config.confidence_threshold, 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Minimum leader probability for a confident guess.
    pub confidence_threshold: f64,
    /// Minimum leader/runner-up gap for a confident guess.
    pub gap_threshold: f64,
    /// Answered questions after which a guess is forced.
    pub max_questions: usize,
    pub strategy: SelectionStrategy,
    /// Adds price segment, usage profile, persona and family size questions.
    pub include_derived_questions: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            gap_threshold: 0.08,
            max_questions: 6,
            strategy: SelectionStrategy::Entropy,
            include_derived_questions: false,
        }
    }
}

impl ReasoningConfig {
    /// Validate configuration.
    ///
    /// This must be called before starting sessions with it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_unit_interval("confidence_threshold", self.confidence_threshold)?;
        check_unit_interval("gap_threshold", self.gap_threshold)?;
        if self.max_questions == 0 {
            return Err(ValidationError::ZeroQuestionBudget);
        }
        Ok(())
    }

    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ValidationError> {
        let config: Self = toml::from_str(source).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ThresholdOutOfRange {
            name: name.to_string(),
            value,
        })
    }
}
