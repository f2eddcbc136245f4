//! Catalog index: frames plus an inverted attribute index.
//!
//! The catalog is built once, runs the rule set to a fixed point for every
//! record, and is read-only afterwards. It is shared by reference (usually
//! behind an `Arc`) across any number of concurrent sessions.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::entity::EntityId;
use crate::error::DataLoadError;
use crate::frame::{EntityDescription, Frame};
use crate::record::{fields, read_json_records, CarRecord, RawRecord};
use crate::rules::{derived, Facts, RuleSet};
use crate::value::{normalize_text, Value};

/// Set of entity IDs, ordered by load position.
pub type EntitySet = BTreeSet<EntityId>;

static NO_ENTITIES: EntitySet = BTreeSet::new();

/// Loaded catalog with derived attributes and an attribute → value → entities index.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    frames: Vec<Frame>,
    models: HashMap<String, EntityId>,
    index: BTreeMap<String, BTreeMap<Value, EntitySet>>,
    labels: BTreeMap<String, BTreeMap<Value, String>>,
    rules: RuleSet,
}

impl CatalogIndex {
    /// Builds a catalog using the default catalog rule set.
    pub fn load<I>(records: I) -> Result<Self, DataLoadError>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        Self::load_with_rules(records, RuleSet::catalog_defaults())
    }

    /// Builds a catalog with an explicit rule set.
    ///
    /// Fails if the stream is empty, a required field is missing or
    /// malformed, or two rows share a model name.
    pub fn load_with_rules<I>(records: I, rules: RuleSet) -> Result<Self, DataLoadError>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut catalog = Self {
            frames: Vec::new(),
            models: HashMap::new(),
            index: BTreeMap::new(),
            labels: BTreeMap::new(),
            rules,
        };

        for (row, raw) in records.into_iter().enumerate() {
            let record = CarRecord::parse(row, &raw)?;
            let key = normalize_text(&record.model);
            if catalog.models.contains_key(&key) {
                return Err(DataLoadError::DuplicateModel {
                    row,
                    model: record.model,
                });
            }
            let frame = catalog.build_frame(EntityId::from_index(row), record);
            catalog.models.insert(key, frame.id);
            catalog.index_frame(&frame);
            catalog.frames.push(frame);
        }

        if catalog.frames.is_empty() {
            return Err(DataLoadError::EmptyCatalog);
        }

        tracing::info!(
            entities = catalog.frames.len(),
            attributes = catalog.index.len(),
            rules = catalog.rules.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Reads records from a JSON array and builds the catalog.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, DataLoadError> {
        Self::load(read_json_records(reader)?)
    }

    /// Reads a JSON catalog file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DataLoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_reader(BufReader::new(file))
    }

    fn build_frame(&self, id: EntityId, record: CarRecord) -> Frame {
        let mut base = Facts::new();
        base.insert(fields::MODEL.to_string(), Value::from(normalize_text(&record.model)));
        base.insert(fields::BRAND.to_string(), Value::from(normalize_text(&record.brand)));
        base.insert(fields::BODY_TYPE.to_string(), Value::from(normalize_text(&record.body_type)));
        base.insert(fields::FUEL_TYPE.to_string(), Value::from(normalize_text(&record.fuel_type)));
        base.insert(
            fields::PRICE_RANGE.to_string(),
            Value::from(normalize_text(&record.price_range)),
        );
        base.insert(fields::LUXURY.to_string(), Value::Bool(record.luxury));
        base.insert(fields::ENGINE_CC.to_string(), Value::Int(record.engine_cc));
        if let Some(era) = &record.era {
            base.insert(fields::ERA.to_string(), Value::from(normalize_text(era)));
        }

        let mut derived_facts = Facts::new();
        self.rules.forward_chain(&base, &mut derived_facts);

        Frame::new(id, record.model, record.brand, record.keywords, base, derived_facts)
    }

    fn index_frame(&mut self, frame: &Frame) {
        for (attribute, value) in frame.attributes() {
            let key = value.normalized();
            let label = match attribute {
                fields::BRAND => frame.brand_label.clone(),
                fields::MODEL => frame.model.clone(),
                _ => format_label(attribute, &key),
            };
            self.index
                .entry(attribute.to_string())
                .or_default()
                .entry(key.clone())
                .or_default()
                .insert(frame.id);
            self.labels
                .entry(attribute.to_string())
                .or_default()
                .insert(key, label);
        }
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a successfully loaded catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Entity IDs in load order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.frames.iter().map(|f| f.id)
    }

    /// All frames in load order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns the frame of an entity.
    #[must_use]
    pub fn get_frame(&self, id: EntityId) -> Option<&Frame> {
        self.frames.get(id.index())
    }

    /// Finds an entity by model name (case-insensitive).
    #[must_use]
    pub fn find_model(&self, model: &str) -> Option<EntityId> {
        self.models.get(&normalize_text(model)).copied()
    }

    /// Rules used to derive frame attributes.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Names of every indexed attribute, sorted.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Distinct normalized values of an attribute, sorted.
    #[must_use]
    pub fn get_attribute_values(&self, attribute: &str) -> Vec<Value> {
        self.index
            .get(&attribute.to_lowercase())
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct values of an attribute with the number of entities holding
    /// each, most common first; ties keep sorted value order.
    #[must_use]
    pub fn value_counts(&self, attribute: &str) -> Vec<(Value, usize)> {
        let mut counts: Vec<(Value, usize)> = self
            .index
            .get(&attribute.to_lowercase())
            .map(|values| values.iter().map(|(v, ids)| (v.clone(), ids.len())).collect())
            .unwrap_or_default();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Entities whose `attribute` equals `value` after normalization.
    ///
    /// Unknown attributes or values yield an empty set.
    #[must_use]
    pub fn get_entities_matching(&self, attribute: &str, value: &Value) -> &EntitySet {
        self.index
            .get(&attribute.to_lowercase())
            .and_then(|values| values.get(&value.normalized()))
            .unwrap_or(&NO_ENTITIES)
    }

    /// Display label for an attribute value.
    #[must_use]
    pub fn describe_value(&self, attribute: &str, value: &Value) -> String {
        let attribute = attribute.to_lowercase();
        let key = value.normalized();
        self.labels
            .get(&attribute)
            .and_then(|labels| labels.get(&key))
            .cloned()
            .unwrap_or_else(|| format_label(&attribute, &key))
    }

    /// Display-oriented description of an entity.
    #[must_use]
    pub fn describe_entity(&self, id: EntityId) -> Option<EntityDescription> {
        self.get_frame(id).map(EntityDescription::from)
    }
}

fn format_label(attribute: &str, value: &Value) -> String {
    let text = match value {
        Value::Bool(flag) => {
            return match (attribute, flag) {
                (fields::LUXURY, true) => "Luxury".to_string(),
                (fields::LUXURY, false) => "Mass market".to_string(),
                (_, true) => "Yes".to_string(),
                (_, false) => "No".to_string(),
            };
        }
        Value::Int(n) => return n.to_string(),
        Value::Text(text) => text.as_str(),
    };

    let named = match attribute {
        fields::PRICE_RANGE => return price_range_label(text),
        fields::BODY_TYPE => return text.to_uppercase(),
        derived::PRICE_SEGMENT => match text {
            "budget" => Some("Budget"),
            "value" => Some("Value seeker"),
            "upper" => Some("Upper mid-range"),
            "premium" => Some("Premium"),
            _ => None,
        },
        derived::ENGINE_BAND => match text {
            "light" => Some("Light (<= 1.2L)"),
            "balanced" => Some("Balanced (1.2L-1.6L)"),
            "performance" => Some("Performance (>= 1.6L)"),
            _ => None,
        },
        derived::PERSONA => match text {
            "eco" => Some("Eco conscious"),
            "status" => Some("Status driven"),
            "saver" => Some("Value focused"),
            "family" => Some("Family centric"),
            _ => None,
        },
        derived::USAGE_PROFILE => match text {
            "city" => Some("City commuter"),
            "family" => Some("Family cruiser"),
            "adventure" => Some("Adventure tourer"),
            _ => None,
        },
        derived::FAMILY_SIZE => match text {
            "small" => Some("Best for couples"),
            "medium" => Some("Small family"),
            "large" => Some("Large family"),
            _ => None,
        },
        derived::ERA => match text {
            "current" => Some("Current (2020+)"),
            "recent" => Some("Recent (2015-2019)"),
            "older" => Some("Older (2010-2014)"),
            "classic" => Some("Classic (Pre-2010)"),
            _ => None,
        },
        _ => None,
    };
    named.map_or_else(|| title_case(text), str::to_string)
}

fn price_range_label(code: &str) -> String {
    let spaced = code.replace('_', " ");
    let expanded = match spaced.strip_suffix('l') {
        Some(head) if head.ends_with(|c: char| c.is_ascii_digit()) => format!("{head} lakhs"),
        _ => spaced,
    };
    title_case(&expanded)
}

/// Upper-cases the first letter of every alphabetic run.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
