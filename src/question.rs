//! Question bank built from the catalog's attribute domains.
//!
//! Every question targets exactly one attribute and offers an ordered list of
//! options. The last option always carries no value ("skip"). Question IDs
//! are the attribute names, so a bank holds at most one question per
//! attribute.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogIndex;
use crate::record::fields;
use crate::rules::derived;
use crate::value::Value;

/// Number of brands offered by the brand question.
pub const BRAND_OPTION_LIMIT: usize = 8;

/// One answer choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Text shown to the user.
    pub label: String,
    /// Value recorded as evidence; `None` for skip options.
    pub value: Option<Value>,
    /// Optional secondary text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl AnswerOption {
    /// Creates an option with a value.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
            hint: None,
        }
    }

    /// Creates a skip option.
    #[must_use]
    pub fn skip(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            hint: None,
        }
    }

    /// Sets the hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Returns true if this option carries no value.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.value.is_none()
    }
}

/// A question about one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub attribute: String,
    pub text: String,
    pub options: Vec<AnswerOption>,
    /// Evidence weight applied to answers of this question.
    pub weight: f64,
}

impl Question {
    /// Creates a question whose ID is the attribute name.
    #[must_use]
    pub fn new(attribute: impl Into<String>, text: impl Into<String>, weight: f64) -> Self {
        let attribute = attribute.into();
        Self {
            id: attribute.clone(),
            attribute,
            text: text.into(),
            options: Vec::new(),
            weight,
        }
    }

    /// Appends an option.
    #[must_use]
    pub fn with_option(mut self, option: AnswerOption) -> Self {
        self.options.push(option);
        self
    }

    /// Options that carry a value.
    pub fn valued_options(&self) -> impl Iterator<Item = (&AnswerOption, &Value)> {
        self.options
            .iter()
            .filter_map(|option| option.value.as_ref().map(|value| (option, value)))
    }

    /// Returns true if any option's value matches `value`.
    #[must_use]
    pub fn offers(&self, value: &Value) -> bool {
        self.valued_options().any(|(_, v)| v.matches(value))
    }
}

/// The ordered set of questions a session can ask.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
    lookup: HashMap<String, usize>,
}

impl QuestionBank {
    /// Builds the standard bank from catalog domains.
    ///
    /// Order: brand, body type, era, price range, fuel, luxury, engine band,
    /// and, when `include_derived` is set, price segment, usage profile,
    /// persona and family size.
    #[must_use]
    pub fn build(catalog: &CatalogIndex, include_derived: bool) -> Self {
        let mut questions = vec![
            brand_question(catalog),
            simple_question(catalog, fields::BODY_TYPE, "Which body style fits best?", 1.3),
            era_question(),
            simple_question(
                catalog,
                fields::PRICE_RANGE,
                "What budget bracket do you have in mind?",
                1.2,
            ),
            simple_question(catalog, fields::FUEL_TYPE, "Preferred fuel or powertrain?", 1.1),
            luxury_question(),
            simple_question(
                catalog,
                derived::ENGINE_BAND,
                "What level of engine performance do you expect?",
                0.7,
            ),
        ];

        if include_derived {
            questions.extend([
                simple_question(
                    catalog,
                    derived::PRICE_SEGMENT,
                    "How would you describe the overall spend level?",
                    0.3,
                ),
                simple_question(
                    catalog,
                    derived::USAGE_PROFILE,
                    "What usage scenario fits your needs?",
                    0.3,
                ),
                simple_question(
                    catalog,
                    derived::PERSONA,
                    "Which buyer persona matches you most?",
                    0.3,
                ),
                simple_question(
                    catalog,
                    derived::FAMILY_SIZE,
                    "What passenger capacity do you need?",
                    0.3,
                ),
            ]);
        }

        Self::from_questions(questions)
    }

    /// Creates a bank from explicit questions. Later duplicates of an ID are
    /// dropped.
    #[must_use]
    pub fn from_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let mut bank = Self::default();
        for question in questions {
            if bank.lookup.contains_key(&question.id) {
                continue;
            }
            bank.lookup.insert(question.id.clone(), bank.questions.len());
            bank.questions.push(question);
        }
        bank
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Question> {
        self.lookup.get(id).map(|&i| &self.questions[i])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// Questions in bank order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn simple_question(catalog: &CatalogIndex, attribute: &str, text: &str, weight: f64) -> Question {
    let mut question = Question::new(attribute, text, weight);
    for value in catalog.get_attribute_values(attribute) {
        question.options.push(AnswerOption::new(
            catalog.describe_value(attribute, &value),
            value,
        ));
    }
    question.with_option(AnswerOption::skip("Not sure / skip"))
}

fn brand_question(catalog: &CatalogIndex) -> Question {
    let counts = catalog.value_counts(fields::BRAND);
    let mut question = Question::new(fields::BRAND, "Do you have a brand in mind?", 1.1);
    for (value, _) in counts.iter().take(BRAND_OPTION_LIMIT) {
        question.options.push(AnswerOption::new(
            catalog.describe_value(fields::BRAND, value),
            value.clone(),
        ));
    }
    let skip = if counts.len() > BRAND_OPTION_LIMIT {
        AnswerOption::skip("Another brand (not listed)").with_hint("open")
    } else {
        AnswerOption::skip("Any brand is fine")
    };
    question.with_option(skip)
}

fn era_question() -> Question {
    Question::new(fields::ERA, "What era or generation is the car from?", 1.25)
        .with_option(
            AnswerOption::new("Current (2020+)", "current")
                .with_hint("Latest generation, currently sold"),
        )
        .with_option(
            AnswerOption::new("Recent (2015-2019)", "recent")
                .with_hint("Recent models, might still be available"),
        )
        .with_option(AnswerOption::new("Older (2010-2014)", "older").with_hint("Older generation"))
        .with_option(
            AnswerOption::new("Classic (Pre-2010)", "classic")
                .with_hint("Vintage or discontinued models"),
        )
        .with_option(AnswerOption::skip("Any era / Not sure"))
}

fn luxury_question() -> Question {
    Question::new(fields::LUXURY, "Is a luxury badge important?", 1.1)
        .with_option(AnswerOption::new("Yes, luxury or premium", true))
        .with_option(AnswerOption::new("No, everyday practicality", false))
        .with_option(AnswerOption::skip("Not sure / flexible"))
}
