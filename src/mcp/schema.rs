//! Tool descriptors and their canonical parameter schema.
//!
//! Servers describe tool parameters under different attribute names, and some
//! descriptors only produce their schema on demand. [`normalize`] walks the
//! known attributes in [`SchemaAttribute::PRIORITY`] order and validates the
//! first usable one into a [`CanonicalSchema`].

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type SchemaProducer = Arc<dyn Fn() -> Value + Send + Sync>;

/// Schema-bearing attributes, most explicit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaAttribute {
    InputSchema,
    Parameters,
    ParameterSchema,
    Schema,
}

impl SchemaAttribute {
    pub const PRIORITY: [SchemaAttribute; 4] = [
        SchemaAttribute::InputSchema,
        SchemaAttribute::Parameters,
        SchemaAttribute::ParameterSchema,
        SchemaAttribute::Schema,
    ];

    /// JSON keys that carry this attribute in a raw descriptor.
    pub fn json_keys(self) -> &'static [&'static str] {
        match self {
            SchemaAttribute::InputSchema => &["inputSchema", "input_schema"],
            SchemaAttribute::Parameters => &["parameters"],
            SchemaAttribute::ParameterSchema => &["parameter_schema", "parameterSchema"],
            SchemaAttribute::Schema => &["schema"],
        }
    }
}

#[derive(Clone)]
pub enum SchemaValue {
    Inline(Value),
    /// Produces the schema when invoked with no arguments.
    Deferred(SchemaProducer),
}

impl SchemaValue {
    fn resolve(&self) -> Value {
        match self {
            SchemaValue::Inline(value) => value.clone(),
            SchemaValue::Deferred(producer) => producer(),
        }
    }
}

impl fmt::Debug for SchemaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaValue::Inline(value) => f.debug_tuple("Inline").field(value).finish(),
            SchemaValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    attributes: BTreeMap<SchemaAttribute, SchemaValue>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schema(mut self, attribute: SchemaAttribute, schema: Value) -> Self {
        self.attributes
            .insert(attribute, SchemaValue::Inline(schema));
        self
    }

    pub fn with_deferred_schema(
        mut self,
        attribute: SchemaAttribute,
        producer: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.attributes
            .insert(attribute, SchemaValue::Deferred(Arc::new(producer)));
        self
    }

    pub fn attribute(&self, attribute: SchemaAttribute) -> Option<&SchemaValue> {
        self.attributes.get(&attribute)
    }

    /// Builds a descriptor from a raw JSON tool entry. Returns `None` when the
    /// entry has no string `name`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = object.get("name")?.as_str()?;
        let mut descriptor = ToolDescriptor::new(name);
        descriptor.description = object
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        for attribute in SchemaAttribute::PRIORITY {
            let found = attribute
                .json_keys()
                .iter()
                .find_map(|key| object.get(*key).filter(|value| !is_empty_schema(value)));
            if let Some(schema) = found {
                descriptor
                    .attributes
                    .insert(attribute, SchemaValue::Inline(schema.clone()));
            }
        }
        Some(descriptor)
    }
}

/// A normalized schema could not be produced for a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUnavailable {
    pub tool: String,
    pub reason: String,
}

impl fmt::Display for SchemaUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No usable schema for tool '{}': {}", self.tool, self.reason)
    }
}

impl std::error::Error for SchemaUnavailable {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
    Any,
    Union(Vec<TypeTag>),
}

impl TypeTag {
    fn from_name(name: &str) -> TypeTag {
        match name {
            "string" => TypeTag::String,
            "number" => TypeTag::Number,
            "integer" => TypeTag::Integer,
            "boolean" => TypeTag::Boolean,
            "array" => TypeTag::Array,
            "object" => TypeTag::Object,
            "null" => TypeTag::Null,
            _ => TypeTag::Any,
        }
    }

    pub fn from_schema(property: &Map<String, Value>) -> TypeTag {
        match property.get("type") {
            Some(Value::String(name)) => TypeTag::from_name(name),
            Some(Value::Array(names)) => {
                let mut tags: Vec<TypeTag> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(TypeTag::from_name)
                    .collect();
                if tags.iter().any(|tag| *tag == TypeTag::Any) || tags.is_empty() {
                    return TypeTag::Any;
                }
                if tags.len() == 1 {
                    tags.remove(0)
                } else {
                    TypeTag::Union(tags)
                }
            }
            _ => TypeTag::Any,
        }
    }

    /// Shallow runtime check; nested shapes are not inspected.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeTag::String => value.is_string(),
            TypeTag::Number => value.is_number(),
            TypeTag::Integer => match value {
                Value::Number(number) => {
                    number.is_i64()
                        || number.is_u64()
                        || number.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            TypeTag::Boolean => value.is_boolean(),
            TypeTag::Array => value.is_array(),
            TypeTag::Object => value.is_object(),
            TypeTag::Null => value.is_null(),
            TypeTag::Any => true,
            TypeTag::Union(tags) => tags.iter().any(|tag| tag.accepts(value)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            TypeTag::String => "string".to_string(),
            TypeTag::Number => "number".to_string(),
            TypeTag::Integer => "integer".to_string(),
            TypeTag::Boolean => "boolean".to_string(),
            TypeTag::Array => "array".to_string(),
            TypeTag::Object => "object".to_string(),
            TypeTag::Null => "null".to_string(),
            TypeTag::Any => "any".to_string(),
            TypeTag::Union(tags) => tags
                .iter()
                .map(TypeTag::label)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// JSON type name of a runtime value, in schema vocabulary.
pub fn runtime_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_i64() || number.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub type_tag: TypeTag,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// The property's full schema, for constraints and examples.
    pub schema: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSchema {
    pub properties: BTreeMap<String, ParameterSpec>,
    /// Required parameter names in declaration order.
    pub required: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    raw: Value,
}

impl CanonicalSchema {
    /// Validates a raw schema value: an object with a `properties` object and,
    /// optionally, a `required` array naming only declared properties.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Some(object) = value.as_object() else {
            return Err(format!(
                "schema must be an object, found {}",
                runtime_type_name(&value)
            ));
        };

        let Some(properties) = object.get("properties") else {
            return Err("schema has no `properties` mapping".to_string());
        };
        let Some(properties) = properties.as_object() else {
            return Err("schema `properties` is not a mapping".to_string());
        };

        let required: Vec<String> = match object.get("required") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => {
                let mut names = Vec::with_capacity(entries.len());
                for entry in entries {
                    let Some(name) = entry.as_str() else {
                        return Err("schema `required` entries must be strings".to_string());
                    };
                    if !properties.contains_key(name) {
                        return Err(format!(
                            "required parameter '{name}' is not declared in `properties`"
                        ));
                    }
                    if !names.iter().any(|existing| existing == name) {
                        names.push(name.to_string());
                    }
                }
                names
            }
            Some(_) => return Err("schema `required` is not a list".to_string()),
        };

        let properties = properties
            .iter()
            .map(|(name, property)| {
                let schema = property.as_object().cloned().unwrap_or_default();
                let spec = ParameterSpec {
                    type_tag: TypeTag::from_schema(&schema),
                    required: required.iter().any(|required| required == name),
                    default: schema.get("default").cloned(),
                    description: schema
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    schema,
                };
                (name.clone(), spec)
            })
            .collect();

        Ok(Self {
            properties,
            required,
            title: object.get("title").and_then(Value::as_str).map(str::to_string),
            description: object
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw: value,
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.properties.get(name)
    }

    /// Optional parameters in name order.
    pub fn optional(&self) -> impl Iterator<Item = (&String, &ParameterSpec)> {
        self.properties.iter().filter(|(_, spec)| !spec.required)
    }
}

fn is_empty_schema(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Schemas delivered as JSON text are decoded before validation.
fn decode_embedded(value: Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

pub fn normalize(descriptor: &ToolDescriptor) -> Result<CanonicalSchema, SchemaUnavailable> {
    let unavailable = |reason: String| SchemaUnavailable {
        tool: descriptor.name.clone(),
        reason,
    };

    let chosen = SchemaAttribute::PRIORITY.iter().find_map(|attribute| {
        let value = descriptor.attribute(*attribute)?.resolve();
        (!is_empty_schema(&value)).then_some(value)
    });

    let Some(value) = chosen else {
        return Err(unavailable(
            "descriptor carries no inputSchema, parameters, parameter_schema, or schema"
                .to_string(),
        ));
    };

    CanonicalSchema::from_value(decode_embedded(value)).map_err(unavailable)
}
