//! Attr - Tri-state attribute values
//!
//! Declarative attributes distinguish three situations that a plain `Option`
//! cannot: a value that is not known yet (planned computed values, unresolved
//! references), a value declared absent, and a present value.
//!
//! Stored state never holds `Unknown`. When serialized, both `Unknown` and
//! `Null` become JSON `null`; JSON `null` (or a missing key, with
//! `#[serde(default)]`) always decodes to `Null`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Set of strings. Iteration order is lexicographic and elements are unique.
pub type StringSet = BTreeSet<String>;

/// Map of strings whose entries may themselves be null or unknown.
pub type StringMap = BTreeMap<String, Attr<String>>;

/// Tri-state attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    /// Not known until the entity is applied
    Unknown,
    /// Declared absent
    Null,
    /// Declared present
    Value(T),
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Attr::Null
    }
}

impl<T> Attr<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Attr::Unknown)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Attr::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Attr::Unknown => Attr::Unknown,
            Attr::Null => Attr::Null,
            Attr::Value(v) => Attr::Value(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Unknown => Attr::Unknown,
            Attr::Null => Attr::Null,
            Attr::Value(v) => Attr::Value(f(v)),
        }
    }

    /// The present value, or `default` for null and unknown
    pub fn value_or(self, default: T) -> T {
        self.into_value().unwrap_or(default)
    }
}

impl<T: Default> Attr<T> {
    pub fn value_or_default(self) -> T {
        self.into_value().unwrap_or_default()
    }
}

impl Attr<String> {
    /// Empty strings collapse to `Null`; anything else is `Value`.
    pub fn from_non_empty(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() { Attr::Null } else { Attr::Value(s) }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().map(String::as_str)
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Attr::Value(v),
            None => Attr::Null,
        }
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Value(v) => v.serialize(serializer),
            Attr::Null | Attr::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Attr::from)
    }
}
