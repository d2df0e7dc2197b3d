//! Argument checking against a [`CanonicalSchema`].

use super::schema::{runtime_type_name, CanonicalSchema, ParameterSpec, TypeTag};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidParameter {
    pub name: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterValidationError {
    /// Missing required parameters, in schema order.
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidParameter>,
    /// Full-schema violations reported in strict mode.
    pub violations: Vec<String>,
}

impl ParameterValidationError {
    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty() && self.violations.is_empty()
    }
}

impl fmt::Display for ParameterValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!(
                "missing required parameters: {}",
                self.missing.join(", ")
            ));
        }
        for invalid in &self.invalid {
            parts.push(format!(
                "parameter '{}' expects {}, got {}",
                invalid.name, invalid.expected, invalid.actual
            ));
        }
        parts.extend(self.violations.iter().cloned());
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ParameterValidationError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationMode {
    /// Check completed arguments against the full raw schema as well.
    pub strict: bool,
}

/// Returns `args` with declared defaults filled in for absent optional
/// parameters. Extra arguments the schema does not declare pass through.
pub fn validate_and_fill(
    schema: &CanonicalSchema,
    args: &Map<String, Value>,
) -> Result<Map<String, Value>, ParameterValidationError> {
    validate_with_mode(schema, args, ValidationMode::default())
}

pub fn validate_with_mode(
    schema: &CanonicalSchema,
    args: &Map<String, Value>,
    mode: ValidationMode,
) -> Result<Map<String, Value>, ParameterValidationError> {
    let mut error = ParameterValidationError {
        missing: schema
            .required
            .iter()
            .filter(|name| !args.contains_key(name.as_str()))
            .cloned()
            .collect(),
        ..Default::default()
    };

    for (name, value) in args {
        let Some(spec) = schema.parameter(name) else {
            continue;
        };
        if !spec.type_tag.accepts(value) {
            error.invalid.push(InvalidParameter {
                name: name.clone(),
                expected: spec.type_tag.label(),
                actual: runtime_type_name(value).to_string(),
            });
        }
    }

    if !error.is_empty() {
        return Err(error);
    }

    let mut completed = args.clone();
    for (name, spec) in &schema.properties {
        if completed.contains_key(name) {
            continue;
        }
        if let Some(default) = &spec.default {
            completed.insert(name.clone(), default.clone());
        }
    }

    if mode.strict {
        error.violations = strict_violations(schema.raw(), &completed);
        if !error.is_empty() {
            return Err(error);
        }
    }

    Ok(completed)
}

fn strict_violations(raw: &Value, completed: &Map<String, Value>) -> Vec<String> {
    let validator = match jsonschema::validator_for(raw) {
        Ok(validator) => validator,
        Err(err) => {
            tracing::warn!("Skipping strict validation; schema does not compile: {err}");
            return Vec::new();
        }
    };
    let instance = Value::Object(completed.clone());
    validator
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect()
}

/// Sample argument set: every required parameter plus optional ones that
/// declare a default.
pub fn generate_example(schema: &CanonicalSchema) -> Map<String, Value> {
    let mut example = Map::new();
    for name in &schema.required {
        if let Some(spec) = schema.parameter(name) {
            example.insert(name.clone(), example_value(name, spec));
        }
    }
    for (name, spec) in schema.optional() {
        if let Some(default) = &spec.default {
            example.insert(name.clone(), default.clone());
        }
    }
    example
}

fn example_value(name: &str, spec: &ParameterSpec) -> Value {
    if let Some(example) = spec.schema.get("example") {
        return example.clone();
    }
    if let Some(default) = &spec.default {
        return default.clone();
    }
    if let Some(first) = spec
        .schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return first.clone();
    }
    placeholder(name, &spec.type_tag, spec.schema.get("format").and_then(Value::as_str))
}

fn placeholder(name: &str, type_tag: &TypeTag, format: Option<&str>) -> Value {
    match type_tag {
        TypeTag::String => Value::String(match format {
            Some("date") => "2023-01-01".to_string(),
            Some("date-time") => "2023-01-01T12:00:00Z".to_string(),
            Some("email") => "user@example.com".to_string(),
            Some("uri") | Some("url") => "https://example.com".to_string(),
            Some(other) => format!("example_{other}"),
            None => format!("example_{name}"),
        }),
        TypeTag::Number | TypeTag::Integer => Value::from(0),
        TypeTag::Boolean => Value::Bool(false),
        TypeTag::Array => Value::Array(Vec::new()),
        TypeTag::Object => Value::Object(Map::new()),
        TypeTag::Null | TypeTag::Any => Value::Null,
        TypeTag::Union(tags) => tags
            .iter()
            .find(|tag| **tag != TypeTag::Null)
            .map(|tag| placeholder(name, tag, format))
            .unwrap_or(Value::Null),
    }
}
