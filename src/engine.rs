//! Guessing engine: the shared context that spawns sessions.
//!
//! The engine owns the read-only catalog, the session rule set and a
//! validated configuration. Sessions hold `Arc` clones of the shared parts,
//! so an engine can serve any number of independent sessions.

use std::path::Path;
use std::sync::Arc;

use crate::catalog::CatalogIndex;
use crate::config::ReasoningConfig;
use crate::entity::EntityId;
use crate::error::GuessResult;
use crate::frame::EntityDescription;
use crate::rules::{RuleSet, RuleSummary};
use crate::session::SessionController;

/// Car guessing engine.
#[derive(Debug, Clone)]
pub struct GuessEngine {
    catalog: Arc<CatalogIndex>,
    session_rules: Arc<RuleSet>,
    config: ReasoningConfig,
}

impl GuessEngine {
    /// Create an engine with the default session rules.
    ///
    /// Fails if `config` does not validate.
    pub fn new(catalog: CatalogIndex, config: ReasoningConfig) -> GuessResult<Self> {
        Self::with_session_rules(Arc::new(catalog), RuleSet::session_defaults(), config)
    }

    /// Create an engine sharing an existing catalog, with explicit session rules.
    pub fn with_session_rules(
        catalog: Arc<CatalogIndex>,
        session_rules: RuleSet,
        config: ReasoningConfig,
    ) -> GuessResult<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            session_rules: Arc::new(session_rules),
            config,
        })
    }

    /// Load a JSON catalog file and create an engine.
    pub fn from_json_path(path: impl AsRef<Path>, config: ReasoningConfig) -> GuessResult<Self> {
        let catalog = CatalogIndex::from_json_path(path)?;
        Self::new(catalog, config)
    }

    /// Start an independent session.
    #[must_use]
    pub fn start_session(&self) -> SessionController {
        SessionController::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.session_rules),
            self.config,
        )
    }

    #[must_use]
    pub fn describe_entity(&self, id: EntityId) -> Option<EntityDescription> {
        self.catalog.describe_entity(id)
    }

    /// Describe an entity by model name.
    #[must_use]
    pub fn describe_model(&self, model: &str) -> Option<EntityDescription> {
        self.catalog
            .find_model(model)
            .and_then(|id| self.catalog.describe_entity(id))
    }

    /// Summaries of the catalog rules, in firing order.
    #[must_use]
    pub fn list_rules(&self) -> Vec<RuleSummary> {
        self.catalog.rules().summaries()
    }

    /// Summaries of the session rules, in firing order.
    #[must_use]
    pub fn list_session_rules(&self) -> Vec<RuleSummary> {
        self.session_rules.summaries()
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<CatalogIndex> {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }
}
