//! Frame: the attribute record for one catalog entity.
//!
//! A frame combines the base attributes loaded from the record with the
//! attributes derived by the catalog rule set. Both maps are fixed once the
//! catalog is built.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::record::fields;
use crate::rules::{derived, FactView, Facts};
use crate::value::Value;

/// Base and derived attributes of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Entity identifier.
    pub id: EntityId,
    /// Model name, original case.
    pub model: String,
    /// Brand, original case.
    pub brand_label: String,
    /// Free-text keywords, display only.
    #[serde(default)]
    pub keywords: String,
    base: Facts,
    derived: Facts,
}

impl Frame {
    pub(crate) fn new(
        id: EntityId,
        model: String,
        brand_label: String,
        keywords: String,
        base: Facts,
        derived: Facts,
    ) -> Self {
        Self {
            id,
            model,
            brand_label,
            keywords,
            base,
            derived,
        }
    }

    /// Returns an attribute value; derived attributes shadow base ones.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.facts().get(attribute)
    }

    /// Returns true if `attribute` equals `expected` after normalization.
    #[must_use]
    pub fn has(&self, attribute: &str, expected: &Value) -> bool {
        self.get(attribute).is_some_and(|v| v.matches(expected))
    }

    /// Loaded attributes.
    #[must_use]
    pub fn base(&self) -> &Facts {
        &self.base
    }

    /// Rule-derived attributes.
    #[must_use]
    pub fn derived(&self) -> &Facts {
        &self.derived
    }

    /// Snapshot view over both attribute maps.
    #[must_use]
    pub fn facts(&self) -> FactView<'_> {
        FactView::new(&self.base, &self.derived)
    }

    /// Iterates every attribute, base first, skipping base entries that a
    /// derived attribute shadows.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.base
            .iter()
            .filter(|(k, _)| !self.derived.contains_key(*k))
            .chain(self.derived.iter())
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// Flat, display-oriented description of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub id: EntityId,
    pub model: String,
    pub brand: String,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub price_range: Option<String>,
    pub luxury: Option<bool>,
    pub price_segment: Option<String>,
    pub usage_profile: Option<String>,
    pub persona: Option<String>,
    pub family_size: Option<String>,
    pub engine_band: Option<String>,
    pub drive_context: Option<String>,
    pub era: Option<String>,
    pub keywords: String,
}

impl From<&Frame> for EntityDescription {
    fn from(frame: &Frame) -> Self {
        let text = |attribute: &str| frame.get(attribute).map(ToString::to_string);
        Self {
            id: frame.id,
            model: frame.model.clone(),
            brand: frame.brand_label.clone(),
            body_type: text(fields::BODY_TYPE),
            fuel_type: text(fields::FUEL_TYPE),
            price_range: text(fields::PRICE_RANGE),
            luxury: frame.get(fields::LUXURY).and_then(Value::as_bool),
            price_segment: text(derived::PRICE_SEGMENT),
            usage_profile: text(derived::USAGE_PROFILE),
            persona: text(derived::PERSONA),
            family_size: text(derived::FAMILY_SIZE),
            engine_band: text(derived::ENGINE_BAND),
            drive_context: text(derived::DRIVE_CONTEXT),
            era: text(derived::ERA),
            keywords: frame.keywords.clone(),
        }
    }
}
