//! Catalog input records.
//!
//! A [`RawRecord`] is one loosely typed row as produced by whatever persisted
//! format the host uses. [`CarRecord::parse`] validates it against the fixed
//! base-attribute schema. [`read_json_records`] reads rows from a JSON array.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::DataLoadError;

/// Field names of the base schema.
pub mod fields {
    pub const MODEL: &str = "model";
    pub const BRAND: &str = "brand";
    pub const BODY_TYPE: &str = "body_type";
    pub const FUEL_TYPE: &str = "fuel_type";
    pub const PRICE_RANGE: &str = "price_range";
    pub const LUXURY: &str = "luxury";
    pub const ENGINE_CC: &str = "engine_cc";
    pub const KEYWORDS: &str = "keywords";
    pub const ERA: &str = "era";
}

/// One untyped input row: field name to raw text.
///
/// Field names are trimmed and lower-cased on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field and returns the record.
    #[must_use]
    pub fn with(mut self, field: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field.
    pub fn insert(&mut self, field: impl AsRef<str>, value: impl Into<String>) {
        self.fields
            .insert(field.as_ref().trim().to_lowercase(), value.into());
    }

    /// Returns the raw text of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// A validated catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarRecord {
    /// Model name, original case. Also the entity's display name.
    pub model: String,
    /// Brand, original case.
    pub brand: String,
    pub body_type: String,
    pub fuel_type: String,
    /// Price bucket code, e.g. `under_10l`.
    pub price_range: String,
    pub luxury: bool,
    /// Displacement in cc; 0 for non-combustion powertrains.
    pub engine_cc: i64,
    /// Free text, display only.
    #[serde(default)]
    pub keywords: String,
    /// Era bucket, when the source carries one. Derived by rules otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
}

impl CarRecord {
    /// Validates a raw row. `row` is the zero-based position used in errors.
    pub fn parse(row: usize, raw: &RawRecord) -> Result<Self, DataLoadError> {
        Ok(Self {
            model: required_text(row, raw, fields::MODEL)?,
            brand: required_text(row, raw, fields::BRAND)?,
            body_type: required_text(row, raw, fields::BODY_TYPE)?,
            fuel_type: required_text(row, raw, fields::FUEL_TYPE)?,
            price_range: required_text(row, raw, fields::PRICE_RANGE)?,
            luxury: parse_flag(row, fields::LUXURY, required(row, raw, fields::LUXURY)?)?,
            engine_cc: parse_cc(row, required(row, raw, fields::ENGINE_CC)?)?,
            keywords: raw
                .get(fields::KEYWORDS)
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
            era: raw
                .get(fields::ERA)
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        })
    }
}

fn required<'a>(row: usize, raw: &'a RawRecord, field: &str) -> Result<&'a str, DataLoadError> {
    raw.get(field).ok_or_else(|| DataLoadError::MissingField {
        row,
        field: field.to_string(),
    })
}

fn required_text(row: usize, raw: &RawRecord, field: &str) -> Result<String, DataLoadError> {
    let value = required(row, raw, field)?.trim();
    if value.is_empty() {
        return Err(DataLoadError::MalformedField {
            row,
            field: field.to_string(),
            value: String::new(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

fn parse_flag(row: usize, field: &str, value: &str) -> Result<bool, DataLoadError> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Ok(true),
        "no" | "n" | "false" | "0" => Ok(false),
        _ => Err(DataLoadError::MalformedField {
            row,
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected yes/no, true/false or 1/0".to_string(),
        }),
    }
}

fn parse_cc(row: usize, value: &str) -> Result<i64, DataLoadError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|cc| *cc >= 0)
        .ok_or_else(|| DataLoadError::MalformedField {
            row,
            field: fields::ENGINE_CC.to_string(),
            value: value.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
}

/// Reads raw records from a JSON array of flat objects.
///
/// Scalar fields (strings, numbers, booleans) become raw text; `null`
/// fields are treated as absent. Nested arrays or objects are rejected.
pub fn read_json_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, DataLoadError> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_reader(reader)
        .map_err(|e| DataLoadError::Parse {
            message: e.to_string(),
        })?;

    let mut records = Vec::with_capacity(rows.len());
    for (row, object) in rows.into_iter().enumerate() {
        let mut record = RawRecord::new();
        for (field, value) in object {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(DataLoadError::MalformedField {
                        row,
                        field,
                        value: String::new(),
                        reason: "nested values are not supported".to_string(),
                    });
                }
            };
            record.insert(field, text);
        }
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swift() -> RawRecord {
        RawRecord::new()
            .with("model", "Swift VXi")
            .with("brand", "Maruti")
            .with("body_type", "Hatchback")
            .with("fuel_type", "Petrol")
            .with("price_range", "under_10l")
            .with("luxury", "No")
            .with("engine_cc", "1197")
            .with("keywords", " city, compact ")
    }

    #[test]
    fn parse_valid_row() {
        let rec = CarRecord::parse(0, &swift()).unwrap();
        assert_eq!(rec.model, "Swift VXi");
        assert_eq!(rec.brand, "Maruti");
        assert!(!rec.luxury);
        assert_eq!(rec.engine_cc, 1197);
        assert_eq!(rec.keywords, "city, compact");
        assert!(rec.era.is_none());
    }

    #[test]
    fn parse_reports_missing_field_with_row() {
        let mut raw = swift();
        raw = raw.into_iter_without("brand");
        let err = CarRecord::parse(7, &raw).unwrap_err();
        match err {
            DataLoadError::MissingField { row, field } => {
                assert_eq!(row, 7);
                assert_eq!(field, "brand");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_accepts_luxury_variants() {
        for (text, expected) in [("yes", true), ("TRUE", true), ("1", true), ("no", false), ("0", false)] {
            let raw = swift().with("luxury", text);
            assert_eq!(CarRecord::parse(0, &raw).unwrap().luxury, expected, "{text}");
        }
    }

    #[test]
    fn parse_rejects_unknown_luxury_flag() {
        let raw = swift().with("luxury", "maybe");
        assert!(matches!(
            CarRecord::parse(0, &raw),
            Err(DataLoadError::MalformedField { .. })
        ));
    }

    #[test]
    fn parse_engine_cc_empty_is_zero_and_text_is_malformed() {
        let raw = swift().with("engine_cc", "");
        assert_eq!(CarRecord::parse(0, &raw).unwrap().engine_cc, 0);

        let raw = swift().with("engine_cc", "1.2L");
        assert!(CarRecord::parse(0, &raw).is_err());
    }

    #[test]
    fn parse_rejects_blank_required_text() {
        let raw = swift().with("model", "   ");
        assert!(CarRecord::parse(0, &raw).is_err());
    }

    #[test]
    fn parse_keeps_optional_era() {
        let raw = swift().with("era", " Current ");
        assert_eq!(CarRecord::parse(0, &raw).unwrap().era.as_deref(), Some("Current"));
    }

    #[test]
    fn field_names_are_normalized() {
        let raw = RawRecord::new().with(" Brand ", "Kia");
        assert_eq!(raw.get("brand"), Some("Kia"));
    }

    #[test]
    fn read_json_records_converts_scalars() {
        let json = r#"[
            {"model": "Nexon EV", "brand": "Tata", "body_type": "suv", "fuel_type": "electric",
             "price_range": "10-20l", "luxury": false, "engine_cc": 0, "keywords": null}
        ]"#;
        let records = read_json_records(json.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("luxury"), Some("false"));
        assert_eq!(records[0].get("engine_cc"), Some("0"));
        assert_eq!(records[0].get("keywords"), None);
        let parsed = CarRecord::parse(0, &records[0]).unwrap();
        assert_eq!(parsed.engine_cc, 0);
    }

    #[test]
    fn read_json_records_rejects_nested_values() {
        let json = r#"[{"model": ["a", "b"]}]"#;
        assert!(matches!(
            read_json_records(json.as_bytes()),
            Err(DataLoadError::MalformedField { .. })
        ));
    }

    #[test]
    fn read_json_records_rejects_non_array() {
        assert!(matches!(
            read_json_records("{}".as_bytes()),
            Err(DataLoadError::Parse { .. })
        ));
    }

    impl RawRecord {
        fn into_iter_without(self, field: &str) -> Self {
            self.fields
                .into_iter()
                .filter(|(k, _)| k != field)
                .collect()
        }
    }
}
