//! Schema model and validation.
//!
//! [`Schema`] is the compiled form of a request or response body schema. It
//! is deliberately small: scalar kinds with bounds, arrays, objects with
//! required properties, `any` and `null`. Validation never stops at the first
//! problem; every offending location is collected into [`FieldErrors`].
//!
//! [`ParamType`] covers path and query parameters, which arrive as strings and
//! are coerced to typed JSON values before reaching handlers.
//!
//! # Example
//!
//! ```
//! use solon_core::schema::Schema;
//!
//! let schema = Schema::object([
//!     ("name", Schema::string().min_length(1)),
//!     ("age", Schema::integer().minimum(0)),
//! ])
//! .require(["name", "age"]);
//!
//! let errors = schema.validate(&serde_json::json!({"age": -1}), "body");
//! assert!(errors.contains("body.name"));
//! assert!(errors.contains("body.age"));
//! ```

use crate::error::FieldErrors;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A body schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The kind of value accepted, with kind-specific constraints.
    #[serde(flatten)]
    pub kind: SchemaKind,
    /// Whether `null` is accepted in addition to `kind`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

const fn default_true() -> bool {
    true
}

/// The kind of a [`Schema`], tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaKind {
    /// A JSON string.
    String {
        /// Minimum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        /// Maximum length in characters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// A JSON number without a fractional part.
    Integer {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    /// Any JSON number.
    Number {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// `true` or `false`.
    Boolean,
    /// A JSON array.
    Array {
        /// Schema every item must satisfy.
        items: Box<Schema>,
        /// Minimum number of items.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        /// Maximum number of items.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
    /// A JSON object.
    Object {
        /// Known properties.
        #[serde(default)]
        properties: IndexMap<String, Schema>,
        /// Properties that must be present.
        #[serde(default)]
        required: Vec<String>,
        /// Whether properties not listed in `properties` are accepted.
        #[serde(default = "default_true")]
        additional_properties: bool,
    },
    /// Accepts any value.
    Any,
    /// Accepts only `null`.
    Null,
}

impl Schema {
    const fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// Creates a string schema.
    #[must_use]
    pub const fn string() -> Self {
        Self::of(SchemaKind::String {
            min_length: None,
            max_length: None,
        })
    }

    /// Creates an integer schema.
    #[must_use]
    pub const fn integer() -> Self {
        Self::of(SchemaKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    /// Creates a number schema.
    #[must_use]
    pub const fn number() -> Self {
        Self::of(SchemaKind::Number {
            minimum: None,
            maximum: None,
        })
    }

    /// Creates a boolean schema.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: Self) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// Creates an object schema from `(name, schema)` pairs. No property is required.
    #[must_use]
    pub fn object<'a>(properties: impl IntoIterator<Item = (&'a str, Self)>) -> Self {
        Self::of(SchemaKind::Object {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
            required: Vec::new(),
            additional_properties: true,
        })
    }

    /// Creates a schema accepting anything.
    #[must_use]
    pub const fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    /// Creates a schema accepting only `null`.
    #[must_use]
    pub const fn null() -> Self {
        Self::of(SchemaKind::Null)
    }

    /// Also accept `null`.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks object properties as required. No effect on other kinds.
    #[must_use]
    pub fn require<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        if let SchemaKind::Object { required, .. } = &mut self.kind {
            for name in names {
                if !required.iter().any(|existing| existing == name) {
                    required.push(name.to_string());
                }
            }
        }
        self
    }

    /// Rejects object properties that are not declared. No effect on other kinds.
    #[must_use]
    pub fn deny_additional(mut self) -> Self {
        if let SchemaKind::Object {
            additional_properties,
            ..
        } = &mut self.kind
        {
            *additional_properties = false;
        }
        self
    }

    /// Sets the minimum length of a string schema.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let SchemaKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length of a string schema.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let SchemaKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(len);
        }
        self
    }

    /// Sets the inclusive lower bound of an integer schema.
    #[must_use]
    pub fn minimum(mut self, min: i64) -> Self {
        if let SchemaKind::Integer { minimum, .. } = &mut self.kind {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the inclusive upper bound of an integer schema.
    #[must_use]
    pub fn maximum(mut self, max: i64) -> Self {
        if let SchemaKind::Integer { maximum, .. } = &mut self.kind {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the item count bounds of an array schema.
    #[must_use]
    pub fn items_between(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        if let SchemaKind::Array {
            min_items,
            max_items,
            ..
        } = &mut self.kind
        {
            *min_items = min;
            *max_items = max;
        }
        self
    }

    /// Checks that the schema is internally consistent.
    ///
    /// Returns a description of the first inconsistency found.
    pub fn check(&self, location: &str) -> Result<(), String> {
        match &self.kind {
            SchemaKind::String {
                min_length: Some(min),
                max_length: Some(max),
            } if min > max => Err(format!("{location}: min_length {min} exceeds max_length {max}")),
            SchemaKind::Integer {
                minimum: Some(min),
                maximum: Some(max),
            } if min > max => Err(format!("{location}: minimum {min} exceeds maximum {max}")),
            SchemaKind::Number {
                minimum: Some(min),
                maximum: Some(max),
            } if min > max => Err(format!("{location}: minimum {min} exceeds maximum {max}")),
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                if let (Some(min), Some(max)) = (min_items, max_items) {
                    if min > max {
                        return Err(format!(
                            "{location}: min_items {min} exceeds max_items {max}"
                        ));
                    }
                }
                items.check(&format!("{location}[]"))
            }
            SchemaKind::Object {
                properties,
                required,
                ..
            } => {
                for name in required {
                    if !properties.contains_key(name) {
                        return Err(format!(
                            "{location}: required property '{name}' is not declared"
                        ));
                    }
                }
                for (name, schema) in properties {
                    schema.check(&format!("{location}.{name}"))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Validates `value`, collecting every error under `location`.
    #[must_use]
    pub fn validate(&self, value: &Value, location: &str) -> FieldErrors {
        let mut errors = FieldErrors::new();
        self.validate_into(value, location, &mut errors);
        errors
    }

    fn validate_into(&self, value: &Value, location: &str, errors: &mut FieldErrors) {
        if value.is_null() && self.nullable {
            return;
        }

        match &self.kind {
            SchemaKind::Any => {}
            SchemaKind::Null => {
                if !value.is_null() {
                    errors.add(location, type_mismatch("null", value));
                }
            }
            SchemaKind::Boolean => {
                if !value.is_boolean() {
                    errors.add(location, type_mismatch("boolean", value));
                }
            }
            SchemaKind::String {
                min_length,
                max_length,
            } => {
                let Some(s) = value.as_str() else {
                    errors.add(location, type_mismatch("string", value));
                    return;
                };
                let len = s.chars().count();
                if let Some(min) = min_length {
                    if len < *min {
                        errors.add(location, format!("length {len} is less than minimum {min}"));
                    }
                }
                if let Some(max) = max_length {
                    if len > *max {
                        errors.add(location, format!("length {len} exceeds maximum {max}"));
                    }
                }
            }
            SchemaKind::Integer { minimum, maximum } => {
                let Some(n) = value.as_i64() else {
                    errors.add(location, type_mismatch("integer", value));
                    return;
                };
                if let Some(min) = minimum {
                    if n < *min {
                        errors.add(location, format!("value {n} is less than minimum {min}"));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        errors.add(location, format!("value {n} exceeds maximum {max}"));
                    }
                }
            }
            SchemaKind::Number { minimum, maximum } => {
                let Some(n) = value.as_f64() else {
                    errors.add(location, type_mismatch("number", value));
                    return;
                };
                if let Some(min) = minimum {
                    if n < *min {
                        errors.add(location, format!("value {n} is less than minimum {min}"));
                    }
                }
                if let Some(max) = maximum {
                    if n > *max {
                        errors.add(location, format!("value {n} exceeds maximum {max}"));
                    }
                }
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(array) = value.as_array() else {
                    errors.add(location, type_mismatch("array", value));
                    return;
                };
                if let Some(min) = min_items {
                    if array.len() < *min {
                        errors.add(
                            location,
                            format!("{} items is fewer than minimum {min}", array.len()),
                        );
                    }
                }
                if let Some(max) = max_items {
                    if array.len() > *max {
                        errors.add(
                            location,
                            format!("{} items exceeds maximum {max}", array.len()),
                        );
                    }
                }
                for (idx, item) in array.iter().enumerate() {
                    items.validate_into(item, &format!("{location}[{idx}]"), errors);
                }
            }
            SchemaKind::Object {
                properties,
                required,
                additional_properties,
            } => {
                let Some(object) = value.as_object() else {
                    errors.add(location, type_mismatch("object", value));
                    return;
                };
                for name in required {
                    if !object.contains_key(name) {
                        errors.add(format!("{location}.{name}"), "is required");
                    }
                }
                for (name, field) in object {
                    let field_location = format!("{location}.{name}");
                    match properties.get(name) {
                        Some(schema) => schema.validate_into(field, &field_location, errors),
                        None if !additional_properties => {
                            errors.add(field_location, "is not allowed");
                        }
                        None => {}
                    }
                }
            }
        }
    }
}

fn type_mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {}", value_type_name(value))
}

/// Returns a human-readable name for a JSON value type.
pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declared type of a path or query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Any string.
    #[default]
    String,
    /// A signed 64-bit integer.
    Integer,
    /// A finite floating point number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A UUID in hyphenated or simple form.
    Uuid,
}

impl ParamType {
    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
        }
    }

    /// Coerces a wire string into a typed JSON value.
    ///
    /// Returns `None` when `raw` is not a valid value of this type.
    ///
    /// ```
    /// use solon_core::schema::ParamType;
    ///
    /// assert_eq!(ParamType::Integer.coerce("42"), Some(serde_json::json!(42)));
    /// assert_eq!(ParamType::Integer.coerce("4.2"), None);
    /// assert_eq!(ParamType::Boolean.coerce("true"), Some(serde_json::json!(true)));
    /// ```
    #[must_use]
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_string())),
            Self::Integer => raw.parse::<i64>().ok().map(Value::from),
            Self::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Self::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::Uuid => uuid::Uuid::parse_str(raw)
                .ok()
                .map(|id| Value::String(id.to_string())),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> Schema {
        Schema::object([
            ("name", Schema::string().min_length(1)),
            ("email", Schema::string()),
            ("age", Schema::integer().minimum(0).maximum(150)),
            ("tags", Schema::array(Schema::string())),
        ])
        .require(["name", "email"])
    }

    #[test]
    fn test_valid_object() {
        let value = json!({"name": "Alice", "email": "a@example.com", "age": 30});
        assert!(user_schema().validate(&value, "body").is_empty());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let value = json!({"age": "old", "tags": ["a", 2]});
        let errors = user_schema().validate(&value, "body");

        assert!(errors.contains("body.name"));
        assert!(errors.contains("body.email"));
        assert!(errors.contains("body.age"));
        assert!(errors.contains("body.tags[1]"));
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.fields["body.age"], vec!["expected integer, got string"]);
    }

    #[test]
    fn test_bounds() {
        let errors = user_schema().validate(
            &json!({"name": "", "email": "e", "age": 200}),
            "body",
        );
        assert_eq!(errors.fields["body.name"], vec!["length 0 is less than minimum 1"]);
        assert_eq!(errors.fields["body.age"], vec!["value 200 exceeds maximum 150"]);
    }

    #[test]
    fn test_additional_properties() {
        let schema = Schema::object([("id", Schema::string())]).deny_additional();
        let errors = schema.validate(&json!({"id": "1", "extra": true}), "body");
        assert_eq!(errors.fields["body.extra"], vec!["is not allowed"]);

        let open = Schema::object([("id", Schema::string())]);
        assert!(open.validate(&json!({"id": "1", "extra": true}), "body").is_empty());
    }

    #[test]
    fn test_nullable() {
        assert!(!Schema::string().validate(&Value::Null, "body").is_empty());
        assert!(Schema::string().nullable().validate(&Value::Null, "body").is_empty());
        assert!(Schema::null().validate(&Value::Null, "body").is_empty());
        assert!(Schema::any().validate(&json!([1, "x"]), "body").is_empty());
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let errors = Schema::integer().validate(&json!(1.5), "body");
        assert_eq!(errors.fields["body"], vec!["expected integer, got number"]);
        assert!(Schema::number().validate(&json!(1), "body").is_empty());
    }

    #[test]
    fn test_deserialize_from_json() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "min_length": 1},
                "nickname": {"type": "string", "nullable": true}
            },
            "required": ["name"]
        }))
        .unwrap();

        assert_eq!(
            schema,
            Schema::object([
                ("name", Schema::string().min_length(1)),
                ("nickname", Schema::string().nullable()),
            ])
            .require(["name"])
        );
    }

    #[test]
    fn test_unknown_type_fails_to_deserialize() {
        let result: Result<Schema, _> = serde_json::from_value(json!({"type": "date"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_check_rejects_undeclared_required() {
        let schema = Schema::object([("a", Schema::string())]).require(["b"]);
        let err = schema.check("request").unwrap_err();
        assert!(err.contains("'b'"));

        let bad_bounds = Schema::integer().minimum(10).maximum(1);
        assert!(bad_bounds.check("request").is_err());
    }

    #[test]
    fn test_param_coercion() {
        assert_eq!(ParamType::String.coerce("abc"), Some(json!("abc")));
        assert_eq!(ParamType::Integer.coerce("-7"), Some(json!(-7)));
        assert_eq!(ParamType::Integer.coerce("seven"), None);
        assert_eq!(ParamType::Number.coerce("2.5"), Some(json!(2.5)));
        assert_eq!(ParamType::Number.coerce("NaN"), None);
        assert_eq!(ParamType::Boolean.coerce("false"), Some(json!(false)));
        assert_eq!(ParamType::Boolean.coerce("yes"), None);
        assert!(ParamType::Uuid
            .coerce("550e8400-e29b-41d4-a716-446655440000")
            .is_some());
        assert_eq!(ParamType::Uuid.coerce("not-a-uuid"), None);
    }
}
