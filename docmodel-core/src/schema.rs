//! Schema definition and record validation.
//!
//! A [`Schema`] maps field names to type constraints. Validation always
//! operates on a batch: a single record is coerced into a one-element
//! [`RecordBatch`] first. With no schema, records pass through unmodified.
//!
//! Reserved fields (`_key`, `_id`, `_rev`, `createdAt`, `updatedAt`) are
//! implicitly optional in every schema with fixed types, and caller-supplied
//! schemas may not declare them. A schema is closed: fields not declared in
//! it (and not reserved) are rejected.
//!
//! All constraint violations across the whole batch aggregate into a single
//! [`Validation`](crate::error::ModelError::Validation) failure, so a create
//! or update call never commits a partial batch.

use bson::{Bson, Document};
use std::collections::BTreeMap;

use crate::error::{ModelError, ModelResult};

/// Field names managed by the model and the store, never by callers.
pub const RESERVED_FIELDS: [&str; 5] = ["_key", "_id", "_rev", "createdAt", "updatedAt"];

/// Type constraint for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A UTF-8 string.
    String,
    /// Any numeric value. Numeric strings normalize to numbers.
    Number,
    /// A boolean.
    Boolean,
    /// An embedded document.
    Object,
    /// An array of arbitrary values.
    Array,
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }
}

/// Constraint attached to a single schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// The expected value type.
    pub field_type: FieldType,
    /// Whether the field must be present on every record.
    pub required: bool,
}

/// An optional per-model schema: field name to type constraint.
///
/// # Example
///
/// ```
/// use docmodel_core::schema::{Schema, FieldType};
///
/// let schema = Schema::new()
///     .field("name", FieldType::String)
///     .required_field("age", FieldType::Number);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: BTreeMap<String, FieldRule>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an optional field. Reserved field names are ignored; they are
    /// always implicitly present with fixed types.
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();

        if !RESERVED_FIELDS.contains(&name.as_str()) {
            self.fields
                .insert(name, FieldRule { field_type, required: false });
        }

        self
    }

    /// Declares a required field. Reserved field names are ignored.
    pub fn required_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();

        if !RESERVED_FIELDS.contains(&name.as_str()) {
            self.fields
                .insert(name, FieldRule { field_type, required: true });
        }

        self
    }

    /// Returns the rule for a field, if declared.
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.get(name)
    }

    /// Iterates over the declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A batch of records. Single records coerce into a one-element batch, so
/// every write path downstream deals with exactly one shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch(Vec<Document>);

impl RecordBatch {
    /// Consumes the batch, returning the records.
    pub fn into_records(self) -> Vec<Document> {
        self.0
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Document> for RecordBatch {
    fn from(record: Document) -> Self {
        RecordBatch(vec![record])
    }
}

impl From<Vec<Document>> for RecordBatch {
    fn from(records: Vec<Document>) -> Self {
        RecordBatch(records)
    }
}

/// Validates and normalizes a batch of records against an optional schema.
///
/// With no schema, the batch passes through unmodified. With a schema, each
/// record is checked for required fields, per-field types, reserved-field
/// types, and undeclared fields. Numeric strings in `Number` fields are
/// normalized to numbers.
///
/// # Errors
///
/// Returns a single aggregate
/// [`Validation`](crate::error::ModelError::Validation) error describing
/// every offending field across the batch.
pub fn validate(
    data: impl Into<RecordBatch>,
    schema: Option<&Schema>,
) -> ModelResult<Vec<Document>> {
    let records = data.into().into_records();

    let Some(schema) = schema else {
        return Ok(records);
    };

    let mut normalized = Vec::with_capacity(records.len());
    let mut violations = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        normalized.push(validate_record(record, schema, index, &mut violations));
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(ModelError::validation(violations))
    }
}

/// Validates and normalizes a single record against an optional schema.
///
/// Same rules and violation messages as [`validate`], without the batch
/// framing around the result.
///
/// # Errors
///
/// Returns a [`Validation`](crate::error::ModelError::Validation) error
/// listing every offending field.
pub fn validate_one(record: Document, schema: Option<&Schema>) -> ModelResult<Document> {
    let Some(schema) = schema else {
        return Ok(record);
    };

    let mut violations = Vec::new();
    let record = validate_record(record, schema, 0, &mut violations);

    if violations.is_empty() {
        Ok(record)
    } else {
        Err(ModelError::validation(violations))
    }
}

fn validate_record(
    mut record: Document,
    schema: &Schema,
    index: usize,
    violations: &mut Vec<String>,
) -> Document {
    for (name, rule) in schema.fields() {
        match record.get(name) {
            None if rule.required => {
                violations.push(format!("record {index}: field `{name}` is required"));
            }
            None => {}
            Some(value) => {
                match normalize_value(value, rule.field_type) {
                    Ok(Some(converted)) => {
                        record.insert(name.to_string(), converted);
                    }
                    Ok(None) => {}
                    Err(actual) => violations.push(format!(
                        "record {index}: field `{name}` expected {}, got {actual}",
                        rule.field_type.name()
                    )),
                }
            }
        }
    }

    for key in record.keys() {
        if schema.rule(key).is_none() && !RESERVED_FIELDS.contains(&key.as_str()) {
            violations.push(format!("record {index}: field `{key}` is not allowed"));
        }
    }

    for (name, expected) in [
        ("_key", FieldType::String),
        ("_id", FieldType::String),
        ("_rev", FieldType::String),
        ("createdAt", FieldType::Number),
        ("updatedAt", FieldType::Number),
    ] {
        if let Some(value) = record.get(name) {
            if let Err(actual) = normalize_value(value, expected) {
                violations.push(format!(
                    "record {index}: reserved field `{name}` expected {}, got {actual}",
                    expected.name()
                ));
            }
        }
    }

    record
}

/// Checks a value against an expected type.
///
/// Returns `Ok(Some(converted))` when the value normalizes to a different
/// representation (numeric string to number), `Ok(None)` when it already
/// conforms, and `Err(actual_type_name)` on a mismatch.
fn normalize_value(value: &Bson, expected: FieldType) -> Result<Option<Bson>, &'static str> {
    let conforms = match expected {
        FieldType::String => matches!(value, Bson::String(_)),
        FieldType::Number => {
            matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
        }
        FieldType::Boolean => matches!(value, Bson::Boolean(_)),
        FieldType::Object => matches!(value, Bson::Document(_)),
        FieldType::Array => matches!(value, Bson::Array(_)),
    };

    if conforms {
        return Ok(None);
    }

    // Numeric strings convert for number fields.
    if expected == FieldType::Number {
        if let Bson::String(s) = value {
            if let Ok(num) = s.trim().parse::<f64>() {
                if num.is_finite() {
                    return Ok(Some(Bson::Double(num)));
                }
            }
        }
    }

    Err(type_name(value))
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::Boolean(_) => "boolean",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        _ => "unsupported",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn test_schema() -> Schema {
        Schema::new()
            .field("s", FieldType::String)
            .field("n", FieldType::Number)
            .field("o", FieldType::Object)
            .field("a", FieldType::Array)
    }

    #[test]
    fn no_schema_passes_through() {
        let single = validate(doc! { "x": 1 }, None).unwrap();
        assert_eq!(single, vec![doc! { "x": 1 }]);

        let many = validate(vec![doc! { "x": 1 }, doc! { "y": 2 }], None).unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn accepts_conforming_records() {
        let records = validate(
            vec![
                doc! { "s": "test", "n": 123, "o": {}, "a": [] },
                doc! { "s": "test1", "o": { "q": 1 }, "a": [1, 2, 3] },
            ],
            Some(&test_schema()),
        )
        .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn normalizes_numeric_strings() {
        let records = validate(doc! { "n": "1234" }, Some(&test_schema())).unwrap();
        assert_eq!(records[0].get("n"), Some(&Bson::Double(1234.0)));
    }

    #[test]
    fn aggregates_all_violations() {
        let err = validate(
            vec![
                doc! { "s": 5, "extra": 1 },
                doc! { "n": "not a number" },
            ],
            Some(&test_schema()),
        )
        .unwrap_err();

        match err {
            ModelError::Validation { violations } => {
                assert_eq!(violations.len(), 3);
                assert!(violations[0].contains("record 0"));
                assert!(violations[2].contains("record 1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validate_one_checks_a_single_record() {
        let record = validate_one(doc! { "n": "12" }, Some(&test_schema())).unwrap();
        assert_eq!(record.get("n"), Some(&Bson::Double(12.0)));

        assert!(matches!(
            validate_one(doc! { "mystery": 1 }, Some(&test_schema())),
            Err(ModelError::Validation { .. })
        ));
    }

    #[test]
    fn required_fields_are_enforced() {
        let schema = Schema::new().required_field("name", FieldType::String);

        let err = validate(doc! { }, Some(&schema)).unwrap_err();
        assert!(matches!(err, ModelError::Validation { .. }));

        assert!(validate(doc! { "name": "x" }, Some(&schema)).is_ok());
    }

    #[test]
    fn reserved_fields_are_implicitly_allowed() {
        let records = validate(
            doc! { "s": "x", "_key": "123", "createdAt": 1_700_000_000_000i64 },
            Some(&test_schema()),
        )
        .unwrap();

        assert_eq!(records[0].get_str("_key").unwrap(), "123");
    }

    #[test]
    fn reserved_fields_cannot_be_declared() {
        let schema = Schema::new().required_field("createdAt", FieldType::String);

        // The declaration is dropped; a record without createdAt validates.
        assert!(validate(doc! {}, Some(&schema)).is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = validate(doc! { "mystery": 1 }, Some(&test_schema())).unwrap_err();

        match err {
            ModelError::Validation { violations } => {
                assert!(violations[0].contains("not allowed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
