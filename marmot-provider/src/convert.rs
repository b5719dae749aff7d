//! Normalization helpers shared by the resource converters
//!
//! Outbound helpers turn declarative values into wire values, collapsing
//! empty containers to absent fields. Inbound helpers turn loosely-typed
//! wire values back into declarative ones.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use marmot_core::attr::{Attr, StringMap, StringSet};
use marmot_core::provider::{ProviderError, ProviderResult};
use serde_json::Value;

use crate::client::models::Dictionary;

/// Canonical timestamp layout: UTC with microsecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// A required string input, which must be present at the point of use
pub fn require<'a>(attr: &'a Attr<String>, name: &str) -> ProviderResult<&'a str> {
    match attr {
        Attr::Value(v) => Ok(v),
        Attr::Null => Err(ProviderError::configuration(format!(
            "{} is required",
            name
        ))),
        Attr::Unknown => Err(ProviderError::configuration(format!(
            "{} is not known yet; it must be resolved before this operation",
            name
        ))),
    }
}

/// A required string set; elements come out sorted
pub fn require_set(attr: &Attr<StringSet>, name: &str) -> ProviderResult<Vec<String>> {
    match attr {
        Attr::Value(set) => Ok(set.iter().cloned().collect()),
        Attr::Null => Err(ProviderError::configuration(format!(
            "{} is required",
            name
        ))),
        Attr::Unknown => Err(ProviderError::configuration(format!(
            "{} is not known yet; it must be resolved before this operation",
            name
        ))),
    }
}

/// An optional string set as a sorted list; null and unknown become empty
pub fn sorted_strings(attr: &Attr<StringSet>) -> Vec<String> {
    attr.as_value()
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default()
}

/// An optional string, sent only when present and non-empty
pub fn optional_string(attr: &Attr<String>) -> Option<String> {
    attr.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn present_entries(map: &StringMap) -> impl Iterator<Item = (&String, &String)> {
    map.iter().filter_map(|(k, v)| v.as_value().map(|v| (k, v)))
}

/// A string map as a weakly-typed wire dictionary
///
/// Null and unknown entries are dropped; a map left empty is absent.
pub fn map_to_dictionary(attr: &Attr<StringMap>) -> Option<Dictionary> {
    let dictionary: Dictionary = present_entries(attr.as_value()?)
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    (!dictionary.is_empty()).then_some(dictionary)
}

/// A string map as a plain wire string map, with the same collapsing rules
pub fn map_to_string_map(attr: &Attr<StringMap>) -> Option<BTreeMap<String, String>> {
    let map: BTreeMap<String, String> = present_entries(attr.as_value()?)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    (!map.is_empty()).then_some(map)
}

/// Coerce a scalar wire value to its string form
///
/// Returns `None` for values that carry nothing (null, empty string).
pub fn coerce_scalar(key: &str, value: &Value) -> ProviderResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i.to_string()))
            } else if let Some(u) = n.as_u64() {
                Ok(Some(u.to_string()))
            } else {
                Ok(n.as_f64().map(|f| format!("{:.6}", f)))
            }
        }
        Value::Array(_) | Value::Object(_) => Err(ProviderError::conversion(format!(
            "Value for key '{}' is not a scalar and cannot be represented as a string",
            key
        ))),
    }
}

/// Coerce a weakly-typed wire dictionary into a string map
///
/// A missing or null dictionary yields an empty map.
pub fn dictionary_to_strings(value: &Value) -> ProviderResult<BTreeMap<String, String>> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                if let Some(s) = coerce_scalar(k, v)? {
                    out.insert(k.clone(), s);
                }
            }
            Ok(out)
        }
        other => Err(ProviderError::conversion(format!(
            "Expected an object of metadata values, got {}",
            other
        ))),
    }
}

/// Declarative map from wire strings; empty becomes an explicit empty map
pub fn strings_to_map(map: BTreeMap<String, String>) -> Attr<StringMap> {
    Attr::Value(map.into_iter().map(|(k, v)| (k, Attr::Value(v))).collect())
}

/// Declarative map from wire strings; empty becomes `Null`
pub fn strings_to_map_or_null(map: BTreeMap<String, String>) -> Attr<StringMap> {
    if map.is_empty() {
        Attr::Null
    } else {
        strings_to_map(map)
    }
}

/// Declarative set from wire strings; empty becomes an explicit empty set
pub fn strings_to_set(values: &[String]) -> Attr<StringSet> {
    Attr::Value(values.iter().cloned().collect())
}

/// Normalize an RFC 3339 timestamp to [`TIMESTAMP_FORMAT`]
///
/// Unparsable input is returned unchanged; empty input stays empty.
pub fn normalize_timestamp(timestamp: &str) -> String {
    if timestamp.is_empty() {
        return String::new();
    }
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        Err(_) => timestamp.to_string(),
    }
}
