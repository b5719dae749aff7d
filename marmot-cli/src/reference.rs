//! Cross-resource references
//!
//! A string attribute value of the exact form `${<type>.<name>.<attribute>}`
//! stands for an attribute of another managed resource, read from state.
//! References that cannot be resolved yet are left in place; the plan shows
//! them as "(known after apply)".

use std::collections::BTreeMap;
use std::fmt;

use marmot_core::resource::{Resource, ResourceId, State};
use regex::Regex;
use serde_json::Value;

const REFERENCE_PATTERN: &str = r"^\$\{([a-z][a-z0-9_]*)\.([^.{}]+)\.([a-z][a-z0-9_]*)\}$";

/// A parsed `${type.name.attribute}` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: ResourceId,
    pub attribute: String,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${{{}.{}.{}}}",
            self.target.resource_type, self.target.name, self.attribute
        )
    }
}

/// A resource after reference substitution
#[derive(Debug, Clone)]
pub struct Resolved {
    pub resource: Resource,
    /// References left in place because their value is not known yet
    pub unresolved: Vec<Reference>,
}

impl Resolved {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

pub struct ReferenceResolver {
    pattern: Regex,
}

impl ReferenceResolver {
    pub fn new() -> Result<Self, String> {
        let pattern = Regex::new(REFERENCE_PATTERN)
            .map_err(|e| format!("Invalid reference pattern: {}", e))?;
        Ok(Self { pattern })
    }

    pub fn parse(&self, value: &str) -> Option<Reference> {
        let caps = self.pattern.captures(value)?;
        Some(Reference {
            target: ResourceId::new(&caps[1], &caps[2]),
            attribute: caps[3].to_string(),
        })
    }

    pub fn is_reference(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    /// Every reference held by a resource, nested values included
    pub fn references(&self, resource: &Resource) -> Vec<Reference> {
        let mut found = Vec::new();
        for value in resource.attributes.values() {
            self.collect(value, &mut found);
        }
        found
    }

    fn collect(&self, value: &Value, found: &mut Vec<Reference>) {
        match value {
            Value::String(s) => found.extend(self.parse(s)),
            Value::Array(items) => items.iter().for_each(|v| self.collect(v, found)),
            Value::Object(map) => map.values().for_each(|v| self.collect(v, found)),
            _ => {}
        }
    }

    /// Substitute references whose target attribute is known in `states`
    pub fn resolve(&self, resource: &Resource, states: &BTreeMap<ResourceId, State>) -> Resolved {
        let mut unresolved = Vec::new();
        let attributes = resource
            .attributes
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    self.resolve_value(value, states, &mut unresolved),
                )
            })
            .collect();

        Resolved {
            resource: Resource {
                id: resource.id.clone(),
                attributes,
            },
            unresolved,
        }
    }

    fn resolve_value(
        &self,
        value: &Value,
        states: &BTreeMap<ResourceId, State>,
        unresolved: &mut Vec<Reference>,
    ) -> Value {
        match value {
            Value::String(s) => match self.parse(s) {
                Some(reference) => {
                    let known = states
                        .get(&reference.target)
                        .filter(|state| state.exists)
                        .and_then(|state| state.attribute(&reference.attribute));
                    match known {
                        Some(v) => v.clone(),
                        None => {
                            unresolved.push(reference);
                            value.clone()
                        }
                    }
                }
                None => value.clone(),
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.resolve_value(v, states, unresolved))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v, states, unresolved)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Check that every reference targets a resource declared before its user
pub fn check_references(resolver: &ReferenceResolver, resources: &[Resource]) -> Vec<String> {
    let mut errors = Vec::new();

    for (index, resource) in resources.iter().enumerate() {
        for reference in resolver.references(resource) {
            if reference.target == resource.id {
                errors.push(format!("{}: {} refers to itself", resource.id, reference));
            } else if !resources[..index].iter().any(|r| r.id == reference.target) {
                let declared_later = resources[index..].iter().any(|r| r.id == reference.target);
                let reason = if declared_later {
                    "is declared after it"
                } else {
                    "is not declared"
                };
                errors.push(format!(
                    "{}: {} refers to {}, which {}",
                    resource.id, reference, reference.target, reason
                ));
            }
        }
    }

    errors
}
