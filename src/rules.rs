//! IF/THEN rules and fixed-point forward chaining.
//!
//! Conditions and conclusions are closed variants rather than opaque
//! callables, so a rule set can be enumerated, displayed and tested in
//! isolation. Rules are applied in list order; a derived attribute is
//! written at most once (the first rule to conclude it wins), which makes
//! the fact set grow monotonically and bounds the number of passes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::fields;
use crate::value::Value;

/// Names of the attributes the default rule sets derive.
pub mod derived {
    pub const PRICE_SEGMENT: &str = "price_segment";
    pub const ENGINE_BAND: &str = "engine_band";
    pub const USAGE_PROFILE: &str = "usage_profile";
    pub const PERSONA: &str = "persona";
    pub const FAMILY_SIZE: &str = "family_size";
    pub const DRIVE_CONTEXT: &str = "drive_context";
    pub const ERA: &str = "era";
}

/// Attribute name to (normalized) value.
pub type Facts = BTreeMap<String, Value>;

/// Predicate over the current value of one attribute (`None` when unknown).
pub type Predicate = fn(Option<&Value>) -> bool;

/// Computes a conclusion value from the current fact snapshot.
pub type Derivation = fn(&FactView<'_>) -> Option<Value>;

/// Read-only snapshot of base facts overlaid with derived facts.
///
/// Derived facts shadow base facts with the same name.
#[derive(Debug, Clone, Copy)]
pub struct FactView<'a> {
    base: &'a Facts,
    derived: &'a Facts,
}

impl<'a> FactView<'a> {
    /// Creates a view over `base` overlaid with `derived`.
    #[must_use]
    pub const fn new(base: &'a Facts, derived: &'a Facts) -> Self {
        Self { base, derived }
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&'a Value> {
        self.derived
            .get(attribute)
            .or_else(|| self.base.get(attribute))
    }

    /// Returns the text of an attribute, if it is text.
    #[must_use]
    pub fn text(&self, attribute: &str) -> Option<&'a str> {
        self.get(attribute).and_then(Value::as_text)
    }
}

/// A rule condition on a single attribute.
#[derive(Clone)]
pub enum Condition {
    /// The attribute equals this value (after normalization).
    Equals(Value),
    /// The attribute equals one of these values (after normalization).
    OneOf(Vec<Value>),
    /// The predicate accepts the attribute's current value.
    Predicate(Predicate),
}

impl Condition {
    /// Creates an equality condition.
    #[must_use]
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into().normalized())
    }

    /// Creates a set-membership condition.
    #[must_use]
    pub fn one_of<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::OneOf(values.into_iter().map(|v| v.into().normalized()).collect())
    }

    /// Returns true if the condition holds for `actual`.
    #[must_use]
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => actual.is_some_and(|v| v.matches(expected)),
            Self::OneOf(allowed) => actual.is_some_and(|v| allowed.iter().any(|a| v.matches(a))),
            Self::Predicate(predicate) => predicate(actual),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Self::OneOf(vs) => f.debug_tuple("OneOf").field(vs).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "= {v}"),
            Self::OneOf(vs) => {
                let joined: Vec<String> = vs.iter().map(ToString::to_string).collect();
                write!(f, "in [{}]", joined.join(", "))
            }
            Self::Predicate(_) => write!(f, "satisfies predicate"),
        }
    }
}

/// A rule conclusion for a single attribute.
#[derive(Clone)]
pub enum Conclusion {
    /// Always concludes this value.
    Constant(Value),
    /// Computes the value from the snapshot; `None` concludes nothing.
    Derived(Derivation),
}

impl Conclusion {
    /// Creates a constant conclusion.
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into().normalized())
    }

    /// Evaluates the conclusion against the snapshot.
    #[must_use]
    pub fn evaluate(&self, facts: &FactView<'_>) -> Option<Value> {
        match self {
            Self::Constant(v) => Some(v.clone()),
            Self::Derived(derive) => derive(facts).map(|v| v.normalized()),
        }
    }
}

impl fmt::Debug for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => write!(f, "{v}"),
            Self::Derived(_) => write!(f, "<computed>"),
        }
    }
}

/// An IF/THEN rule: when every condition holds, each conclusion target not
/// yet derived is set.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    conditions: Vec<(String, Condition)>,
    conclusions: Vec<(String, Conclusion)>,
    description: String,
}

impl Rule {
    /// Creates a rule with no conditions and no conclusions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            conclusions: Vec::new(),
            description: String::new(),
        }
    }

    /// Adds a condition on `attribute`.
    #[must_use]
    pub fn when(mut self, attribute: impl AsRef<str>, condition: Condition) -> Self {
        self.conditions
            .push((attribute.as_ref().to_lowercase(), condition));
        self
    }

    /// Adds a conclusion for `attribute`.
    #[must_use]
    pub fn then(mut self, attribute: impl AsRef<str>, conclusion: Conclusion) -> Self {
        self.conclusions
            .push((attribute.as_ref().to_lowercase(), conclusion));
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn conditions(&self) -> &[(String, Condition)] {
        &self.conditions
    }

    #[must_use]
    pub fn conclusions(&self) -> &[(String, Conclusion)] {
        &self.conclusions
    }

    /// Returns true if every condition holds in the snapshot.
    #[must_use]
    pub fn applies(&self, facts: &FactView<'_>) -> bool {
        self.conditions
            .iter()
            .all(|(attribute, condition)| condition.matches(facts.get(attribute)))
    }

    /// Returns a serializable summary of this rule.
    #[must_use]
    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            name: self.name.clone(),
            conditions: self
                .conditions
                .iter()
                .map(|(a, c)| format!("{a} {c}"))
                .collect(),
            conclusions: self
                .conclusions
                .iter()
                .map(|(a, c)| format!("{a} := {c}"))
                .collect(),
            description: self.description.clone(),
        }
    }
}

/// Serializable description of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub name: String,
    pub conditions: Vec<String>,
    pub conclusions: Vec<String>,
    pub description: String,
}

/// A newly derived fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFact {
    pub rule: String,
    pub attribute: String,
    pub value: Value,
}

/// An ordered list of rules. Order is the priority for first-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates a rule set from rules in priority order.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Appends a rule with the lowest priority.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Returns summaries of every rule, in order.
    #[must_use]
    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules.iter().map(Rule::summary).collect()
    }

    /// Runs the rules over `base` ∪ `derived` until a full pass adds nothing.
    ///
    /// New facts are written into `derived`; a key already present there is
    /// never overwritten. Returns the facts added by this call, in the order
    /// they were derived.
    pub fn forward_chain(&self, base: &Facts, derived: &mut Facts) -> Vec<DerivedFact> {
        let mut added = Vec::new();
        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = false;
            for rule in &self.rules {
                if !rule.applies(&FactView::new(base, derived)) {
                    continue;
                }
                for (target, conclusion) in &rule.conclusions {
                    if derived.contains_key(target) {
                        continue;
                    }
                    let Some(value) = conclusion.evaluate(&FactView::new(base, derived)) else {
                        continue;
                    };
                    tracing::trace!(rule = %rule.name, attribute = %target, value = %value, "rule fired");
                    derived.insert(target.clone(), value.clone());
                    added.push(DerivedFact {
                        rule: rule.name.clone(),
                        attribute: target.clone(),
                        value,
                    });
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        tracing::trace!(passes, derived = added.len(), "forward chaining reached fixed point");
        added
    }

    /// Rules run over every catalog record at load time.
    ///
    /// `luxury_implies_premium` comes first so a luxury flag always yields
    /// the premium segment regardless of the price bucket.
    #[must_use]
    pub fn catalog_defaults() -> Self {
        use derived::{
            DRIVE_CONTEXT, ENGINE_BAND, ERA, FAMILY_SIZE, PERSONA, PRICE_SEGMENT, USAGE_PROFILE,
        };
        use fields::{BODY_TYPE, ENGINE_CC, FUEL_TYPE, LUXURY, MODEL, PRICE_RANGE};

        Self::new(vec![
            Rule::new("luxury_implies_premium")
                .when(LUXURY, Condition::equals(true))
                .then(PRICE_SEGMENT, Conclusion::constant("premium"))
                .describe("Luxury flag promotes premium segment"),
            Rule::new("price_to_segment")
                .when(PRICE_RANGE, Condition::one_of(["under_10l"]))
                .then(PRICE_SEGMENT, Conclusion::constant("budget"))
                .describe("Budget pricing implies budget segment"),
            Rule::new("value_segment")
                .when(PRICE_RANGE, Condition::one_of(["10-20l", "under_20l"]))
                .then(PRICE_SEGMENT, Conclusion::constant("value"))
                .describe("Mid pricing implies value segment"),
            Rule::new("upper_segment")
                .when(PRICE_RANGE, Condition::one_of(["20-30l"]))
                .then(PRICE_SEGMENT, Conclusion::constant("upper"))
                .describe("Upper pricing implies upper mid-range"),
            Rule::new("premium_segment")
                .when(
                    PRICE_RANGE,
                    Condition::Predicate(|v| v.and_then(Value::as_text).is_some_and(|t| t.contains("above"))),
                )
                .then(PRICE_SEGMENT, Conclusion::constant("premium"))
                .describe("Above 30L is considered premium"),
            Rule::new("engine_light")
                .when(
                    ENGINE_CC,
                    Condition::Predicate(|v| v.and_then(Value::as_int).is_some_and(|cc| cc > 0 && cc < 1200)),
                )
                .then(ENGINE_BAND, Conclusion::constant("light"))
                .describe("Sub-1.2L engines are light"),
            Rule::new("engine_balanced")
                .when(
                    ENGINE_CC,
                    Condition::Predicate(|v| {
                        v.and_then(Value::as_int).is_some_and(|cc| (1200..=1600).contains(&cc))
                    }),
                )
                .then(ENGINE_BAND, Conclusion::constant("balanced"))
                .describe("1.2-1.6L engines are balanced"),
            Rule::new("engine_performance")
                .when(
                    ENGINE_CC,
                    Condition::Predicate(|v| v.and_then(Value::as_int).is_some_and(|cc| cc >= 1600)),
                )
                .then(ENGINE_BAND, Conclusion::constant("performance"))
                .describe("Large displacement implies performance"),
            Rule::new("usage_city")
                .when(BODY_TYPE, Condition::equals("hatchback"))
                .when(ENGINE_BAND, Condition::equals("light"))
                .then(USAGE_PROFILE, Conclusion::constant("city"))
                .describe("Light hatchbacks suit city use"),
            Rule::new("usage_family")
                .when(BODY_TYPE, Condition::equals("sedan"))
                .when(PRICE_SEGMENT, Condition::one_of(["value", "upper"]))
                .then(USAGE_PROFILE, Conclusion::constant("family"))
                .describe("Sedans in mid segment suit family trips"),
            Rule::new("usage_adventure")
                .when(BODY_TYPE, Condition::equals("suv"))
                .when(
                    ENGINE_BAND,
                    Condition::Predicate(|v| v.is_some_and(|band| !band.matches(&Value::from("light")))),
                )
                .then(USAGE_PROFILE, Conclusion::constant("adventure"))
                .describe("Bigger SUVs support adventure travel"),
            Rule::new("persona_eco")
                .when(FUEL_TYPE, Condition::equals("electric"))
                .then(PERSONA, Conclusion::constant("eco"))
                .then(DRIVE_CONTEXT, Conclusion::constant("urban"))
                .describe("Electric cars target eco urban buyers"),
            Rule::new("persona_status")
                .when(LUXURY, Condition::equals(true))
                .then(PERSONA, Conclusion::constant("status"))
                .describe("Luxury buyers seek status"),
            Rule::new("persona_value")
                .when(PRICE_SEGMENT, Condition::equals("budget"))
                .then(PERSONA, Conclusion::constant("saver"))
                .describe("Budget segment implies saver persona"),
            Rule::new("family_small")
                .when(BODY_TYPE, Condition::equals("hatchback"))
                .then(FAMILY_SIZE, Conclusion::constant("small"))
                .describe("Hatchbacks best for small families"),
            Rule::new("family_medium")
                .when(BODY_TYPE, Condition::equals("sedan"))
                .then(FAMILY_SIZE, Conclusion::constant("medium"))
                .describe("Sedans fit small families"),
            Rule::new("family_large")
                .when(BODY_TYPE, Condition::equals("suv"))
                .then(FAMILY_SIZE, Conclusion::constant("large"))
                .describe("SUVs handle large families"),
            Rule::new("drive_highway")
                .when(ENGINE_BAND, Condition::equals("performance"))
                .then(DRIVE_CONTEXT, Conclusion::constant("highway"))
                .describe("Performance engines thrive on highways"),
            Rule::new("era_from_model_year")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .when(
                    MODEL,
                    Condition::Predicate(|v| v.and_then(Value::as_text).and_then(model_year).is_some()),
                )
                .then(
                    ERA,
                    Conclusion::Derived(|facts| {
                        facts.text(MODEL).and_then(model_year).map(|y| Value::from(era_for_year(y)))
                    }),
                )
                .describe("Bracketed model years place the car in an era"),
            Rule::new("era_discontinued_model")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .when(MODEL, Condition::Predicate(|v| text_contains_any(v, DISCONTINUED_MODELS)))
                .then(ERA, Conclusion::constant("classic"))
                .describe("Discontinued model lines are classic"),
            Rule::new("era_legacy_emission")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .when(MODEL, Condition::Predicate(|v| text_contains_any(v, &["bs-ii", "bs ii"])))
                .then(ERA, Conclusion::constant("classic"))
                .describe("BS-II/BS-III emission standards are classic"),
            Rule::new("era_bs4_emission")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .when(MODEL, Condition::Predicate(|v| text_contains_any(v, &["bs-iv", "bs iv"])))
                .then(ERA, Conclusion::constant("older"))
                .describe("BS-IV emission standard marks an older generation"),
            Rule::new("era_bs6_emission")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .when(MODEL, Condition::Predicate(|v| text_contains_any(v, &["bs-vi", "bs vi", "bs6"])))
                .then(ERA, Conclusion::constant("current"))
                .describe("BS-VI emission standard marks a current model"),
            Rule::new("era_current_lineup")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .when(MODEL, Condition::Predicate(|v| text_contains_any(v, CURRENT_LINEUP)))
                .then(ERA, Conclusion::constant("current"))
                .describe("Model lines on sale today are current"),
            Rule::new("era_default")
                .when(ERA, Condition::Predicate(|v| v.is_none()))
                .then(ERA, Conclusion::constant("recent"))
                .describe("Models without era hints are assumed recent"),
        ])
    }

    /// Rules run over a session's known facts after every answer.
    #[must_use]
    pub fn session_defaults() -> Self {
        use derived::{ENGINE_BAND, FAMILY_SIZE, PERSONA, PRICE_SEGMENT};
        use fields::{BODY_TYPE, FUEL_TYPE, LUXURY};

        Self::new(vec![
            Rule::new("budget_implies_non_luxury")
                .when(PRICE_SEGMENT, Condition::equals("budget"))
                .then(LUXURY, Conclusion::constant(false))
                .describe("Budget focus hints at non-luxury preference"),
            Rule::new("premium_implies_luxury")
                .when(PRICE_SEGMENT, Condition::equals("premium"))
                .then(LUXURY, Conclusion::constant(true))
                .describe("Premium spend hints luxury interest"),
            Rule::new("eco_prefers_electric")
                .when(PERSONA, Condition::equals("eco"))
                .then(FUEL_TYPE, Conclusion::constant("electric"))
                .describe("Eco persona nudges electric powertrain"),
            Rule::new("large_family_needs_suv")
                .when(FAMILY_SIZE, Condition::equals("large"))
                .then(BODY_TYPE, Conclusion::constant("suv"))
                .describe("Large family requires SUV space"),
            Rule::new("electric_no_large_engine")
                .when(FUEL_TYPE, Condition::equals("electric"))
                .then(ENGINE_BAND, Conclusion::constant("small"))
                .describe("Electric vehicles don't have traditional large engines"),
            Rule::new("luxury_implies_premium_segment")
                .when(LUXURY, Condition::equals(true))
                .then(PRICE_SEGMENT, Conclusion::constant("premium"))
                .describe("Luxury cars are typically in premium price segment"),
        ])
    }
}

const DISCONTINUED_MODELS: &[&str] = &[
    "ritz", "zen", "esteem", "omni", "gypsy", "palio", "indigo", "logan", "sumo", "safari dicor",
    "venture", "ambassador", "figo aspire", "punto", "linea", "aveo", "optra", "sail",
];

const CURRENT_LINEUP: &[&str] = &[
    "nexon", "harrier", "safari", "punch", "altroz", "venue", "creta", "alcazar", "tucson",
    "ioniq", "seltos", "sonet", "carens", "carnival", "ev6", "hector", "astor", "zs ev",
    "gloster", "compass", "meridian", "xuv700", "xuv300", "scorpio-n", "thar", "grand vitara",
    "jimny", "fronx", "kushaq", "slavia", "kodiaq", "taigun", "virtus", "hyryder",
];

fn text_contains_any(value: Option<&Value>, needles: &[&str]) -> bool {
    value
        .and_then(Value::as_text)
        .is_some_and(|text| needles.iter().any(|n| text.contains(n)))
}

fn year_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[(\d{4})(?:-(\d{4}))?\]").ok())
        .as_ref()
}

/// Extracts the model year from a bracketed `[YYYY]` or `[YYYY-YYYY]` suffix.
/// For a range, the end year is used.
fn model_year(model: &str) -> Option<i32> {
    let captures = year_pattern()?.captures(model)?;
    captures
        .get(2)
        .or_else(|| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn era_for_year(year: i32) -> &'static str {
    match year {
        y if y >= 2020 => "current",
        y if y >= 2015 => "recent",
        y if y >= 2010 => "older",
        _ => "classic",
    }
}
