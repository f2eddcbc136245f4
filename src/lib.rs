//! # autoguess - a twenty-questions car guesser
//!
//! autoguess holds a catalog of cars, asks the user discriminating
//! questions, and converges on the most likely car.
//!
//! ## Core Concepts
//!
//! - **CatalogIndex**: frames with rule-derived attributes and an inverted attribute index
//! - **BeliefState**: probability distribution over catalog entities
//! - **QuestionSelector**: entropy / Gini scoring plus leader discrimination
//! - **SessionController**: one game; answers in, ranked hypotheses out
//!
//! ## Usage
//!
//! ```rust,no_run
//! use autoguess::{GuessEngine, ReasoningConfig};
//!
//! # fn main() -> autoguess::GuessResult<()> {
//! let engine = GuessEngine::from_json_path("data/cars.json", ReasoningConfig::default())?;
//! let mut session = engine.start_session();
//!
//! while let Some(question) = session.next_question() {
//!     // present `question.text` and `question.options`, read the choice
//!     let choice = question.options[0].value.clone();
//!     session.record_answer(&question.id, choice, 0.9)?;
//! }
//!
//! if let Some(guess) = session.best_guess() {
//!     println!("{} ({:.0}%)", guess.description.model, guess.probability * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod entity;
pub mod error;
pub mod value;

// Catalog and rules
pub mod catalog;
pub mod frame;
pub mod record;
pub mod rules;

// Reasoning
pub mod belief;
pub mod config;
pub mod engine;
pub mod question;
pub mod selector;
pub mod session;

// Re-export primary types at crate root for convenience
pub use belief::{BeliefState, Evidence, EvidenceOutcome, Hypothesis};
pub use catalog::{CatalogIndex, EntitySet};
pub use config::ReasoningConfig;
pub use engine::GuessEngine;
pub use entity::{EntityId, SessionId};
pub use error::{DataLoadError, GuessError, GuessResult, SessionError, ValidationError};
pub use frame::{EntityDescription, Frame};
pub use question::{AnswerOption, Question, QuestionBank};
pub use record::{read_json_records, CarRecord, RawRecord};
pub use rules::{Condition, Conclusion, FactView, Facts, Rule, RuleSet, RuleSummary};
pub use selector::{QuestionSelector, ScoredQuestion, Selection, SelectionMode, SelectionStrategy};
pub use session::{
    Guess, SessionController, SessionPerformance, SessionPhase, SessionState, SessionTrace,
    TracedHypothesis,
};
pub use value::Value;
