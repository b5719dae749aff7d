//! Schema - Define attribute schemas for resources
//!
//! Providers define a schema for each resource type. Schemas validate
//! declared configuration before any API call is made and tell the differ
//! which attributes are computed, which force replacement, and how values
//! compare semantically.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::resource::Attributes;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// String whose length (in characters) must fall within bounds
    BoundedString { min: usize, max: Option<usize> },
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Unordered collection of unique values
    Set(Box<AttributeType>),
    /// Ordered collection
    List(Box<AttributeType>),
    /// Map keyed by string; entries may be null
    Map(Box<AttributeType>),
    /// Nested record with its own attributes
    Object(Vec<AttributeSchema>),
}

impl AttributeType {
    /// String of `min..=max` characters
    pub fn length_between(min: usize, max: usize) -> Self {
        AttributeType::BoundedString {
            min,
            max: Some(max),
        }
    }

    /// String of at most `max` characters
    pub fn length_at_most(max: usize) -> Self {
        AttributeType::BoundedString { min: 0, max: Some(max) }
    }

    /// String of at least `min` characters
    pub fn length_at_least(min: usize) -> Self {
        AttributeType::BoundedString { min, max: None }
    }

    pub fn one_of(values: &[&str]) -> Self {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn set_of(inner: AttributeType) -> Self {
        AttributeType::Set(Box::new(inner))
    }

    pub fn list_of(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    pub fn map_of(inner: AttributeType) -> Self {
        AttributeType::Map(Box::new(inner))
    }

    /// Check if a non-null value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::BoundedString { min, max }, Value::String(s)) => {
                let length = s.chars().count();
                if length < *min || max.is_some_and(|max| length > max) {
                    Err(TypeError::LengthOutOfRange {
                        length,
                        min: *min,
                        max: *max,
                    })
                } else {
                    Ok(())
                }
            }

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Set(inner) | AttributeType::List(inner), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let result = if item.is_null() {
                        Err(TypeError::NullElement)
                    } else {
                        inner.validate(item)
                    };
                    result.map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Object(map)) => {
                for (k, v) in map {
                    if v.is_null() {
                        continue;
                    }
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Object(attributes), Value::Object(map)) => {
                let errors = validate_attributes(attributes.iter(), map);
                match errors.into_iter().next() {
                    Some(first) => Err(first),
                    None => Ok(()),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: json_type_name(value).to_string(),
            }),
        }
    }

    /// Canonical form of a value for semantic comparison
    ///
    /// Null, empty strings, empty collections and missing keys all
    /// normalize to `Null`; sets are sorted and deduplicated; nested defaults
    /// are filled in and computed nested attributes are dropped.
    pub fn normalize(&self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            // The catalog never echoes an empty string back
            (AttributeType::String | AttributeType::BoundedString { .. }, Value::String(s))
                if s.is_empty() =>
            {
                Value::Null
            }
            (AttributeType::Set(inner), Value::Array(items)) => {
                let mut items: Vec<Value> = items
                    .iter()
                    .map(|v| inner.normalize(v))
                    .filter(|v| !v.is_null())
                    .collect();
                items.sort_by_key(|v| v.to_string());
                items.dedup();
                empty_to_null(Value::Array(items))
            }
            (AttributeType::List(inner), Value::Array(items)) => {
                let items: Vec<Value> = items.iter().map(|v| inner.normalize(v)).collect();
                empty_to_null(Value::Array(items))
            }
            (AttributeType::Map(inner), Value::Object(map)) => {
                let map: serde_json::Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), inner.normalize(v)))
                    .filter(|(_, v)| !v.is_null())
                    .collect();
                empty_to_null(Value::Object(map))
            }
            (AttributeType::Object(attributes), Value::Object(map)) => {
                let mut normalized = serde_json::Map::new();
                for attr in attributes.iter().filter(|a| !a.computed) {
                    let v = map
                        .get(&attr.name)
                        .map(|v| attr.attr_type.normalize(v))
                        .unwrap_or(Value::Null);
                    let v = match (&v, &attr.default) {
                        (Value::Null, Some(default)) => default.clone(),
                        _ => v,
                    };
                    if !v.is_null() {
                        normalized.insert(attr.name.clone(), v);
                    }
                }
                Value::Object(normalized)
            }
            _ => value.clone(),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::BoundedString { .. } => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Object(_) => "Object".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

fn empty_to_null(value: Value) -> Value {
    match &value {
        Value::Array(items) if items.is_empty() => Value::Null,
        Value::Object(map) if map.is_empty() => Value::Null,
        _ => value,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_f64() => "Float",
        Value::Number(_) => "Int",
        Value::String(_) => "String",
        Value::Array(_) => "List",
        Value::Object(_) => "Object",
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("String length {length} is outside {}", format_bounds(*min, *max))]
    LengthOutOfRange {
        length: usize,
        min: usize,
        max: Option<usize>,
    },

    #[error("Expected at least {min} element(s), got {got}")]
    TooFewElements { min: usize, got: usize },

    #[error("Null elements are not allowed")]
    NullElement,

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be configured")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

fn format_bounds(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) => format!("{}..={}", min, max),
        None => format!("{}..", min),
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Set by the service; never configured
    pub computed: bool,
    /// Changing the value requires replacing the entity
    pub force_new: bool,
    /// Value must not be displayed
    pub sensitive: bool,
    /// Minimum number of elements for collection attributes
    pub min_items: Option<usize>,
    /// Value assumed when the attribute is not configured
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            force_new: false,
            sensitive: false,
            min_items: None,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    fn validate_value(&self, value: &Value) -> Result<(), TypeError> {
        self.attr_type.validate(value)?;
        if let (Some(min), Value::Array(items)) = (self.min_items, value)
            && items.len() < min
        {
            return Err(TypeError::TooFewElements {
                min,
                got: items.len(),
            });
        }
        Ok(())
    }
}

/// Validate a map of values against a group of attribute schemas
fn validate_attributes<'a>(
    schemas: impl Iterator<Item = &'a AttributeSchema> + Clone,
    values: &serde_json::Map<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    for schema in schemas.clone() {
        let value = values.get(&schema.name).filter(|v| !v.is_null());
        match value {
            None if schema.required && schema.default.is_none() => {
                errors.push(TypeError::MissingRequired {
                    name: schema.name.clone(),
                });
            }
            None => {}
            Some(_) if schema.computed => {
                errors.push(TypeError::ComputedAttribute {
                    name: schema.name.clone(),
                });
            }
            Some(v) => {
                if let Err(e) = schema.validate_value(v) {
                    errors.push(TypeError::AttributeError {
                        name: schema.name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
        }
    }

    for name in values.keys() {
        if !schemas.clone().any(|s| &s.name == name) {
            errors.push(TypeError::UnknownAttribute { name: name.clone() });
        }
    }

    errors
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: BTreeMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate declared attributes, collecting every error
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(self.attributes.values(), attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Attributes the user may configure
    pub fn configurable(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.values().filter(|a| !a.computed)
    }

    pub fn is_force_new(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.force_new)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.sensitive)
    }
}
