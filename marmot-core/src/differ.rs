//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the configuration with the stored state of each resource and
//! generates the list of required Effects. Computed attributes are ignored;
//! values compare semantically through the resource schema, so an omitted
//! map and an empty one, or two orderings of the same set, are equal.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::plan::{Effect, Plan};
use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute differs -> needs delete and re-create
    Replace {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: &ResourceSchema) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else if changed.iter().any(|name| schema.is_force_new(name)) {
        Diff::Replace {
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find configurable attributes whose desired value differs from the stored one
fn find_changed_attributes(
    desired: &Attributes,
    current: &Attributes,
    schema: &ResourceSchema,
) -> Vec<String> {
    let mut changed = Vec::new();

    for attr in schema.configurable() {
        let normalize = |attrs: &Attributes| {
            attrs
                .get(&attr.name)
                .map(|v| attr.attr_type.normalize(v))
                .unwrap_or(Value::Null)
        };
        if normalize(desired) != normalize(current) {
            changed.push(attr.name.clone());
        }
    }

    changed
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Resources are visited in declaration order. Stored resources that are no
/// longer declared are deleted last, in reverse order of the stored list.
pub fn create_plan(
    desired: &[Resource],
    current_states: &BTreeMap<ResourceId, State>,
    stored_order: &[ResourceId],
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let d = match schemas.get(&resource.id.resource_type) {
            Some(schema) => diff(resource, &current, schema),
            None => {
                log::warn!("No schema for {}, skipping", resource.id);
                continue;
            }
        };

        match d {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                from,
                to,
                changed_attributes,
            }),
            Diff::Replace {
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Replace {
                from,
                to,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    for id in stored_order.iter().rev() {
        if desired.iter().any(|r| &r.id == id) {
            continue;
        }
        if let Some(state) = current_states.get(id)
            && state.exists
        {
            plan.add(Effect::Delete(state.clone()));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType};
    use serde_json::json;

    fn lineage_schema() -> ResourceSchema {
        ResourceSchema::new("marmot_lineage")
            .attribute(AttributeSchema::new("source", AttributeType::String).required().force_new())
            .attribute(AttributeSchema::new("target", AttributeType::String).required().force_new())
            .attribute(AttributeSchema::new("resource_id", AttributeType::String).computed())
    }

    fn asset_schema() -> ResourceSchema {
        ResourceSchema::new("marmot_asset")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("tags", AttributeType::set_of(AttributeType::String)))
            .attribute(AttributeSchema::new(
                "metadata",
                AttributeType::map_of(AttributeType::String),
            ))
            .attribute(AttributeSchema::new("mrn", AttributeType::String).computed())
    }

    fn stored(resource_type: &str, name: &str, attrs: Value) -> State {
        let Value::Object(attrs) = attrs else {
            panic!("expected object");
        };
        State::existing(ResourceId::new(resource_type, name), attrs).with_identifier("id-1")
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("marmot_asset", "orders");
        let current = State::not_found(ResourceId::new("marmot_asset", "orders"));

        let result = diff(&desired, &current, &asset_schema());
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_for_semantically_equal_values() {
        let desired = Resource::new("marmot_asset", "orders")
            .with_attribute("name", json!("orders"))
            .with_attribute("tags", json!(["pii", "core", "pii"]));
        // Stored state carries computed values and an explicit empty map
        let current = stored(
            "marmot_asset",
            "orders",
            json!({
                "name": "orders",
                "tags": ["core", "pii"],
                "metadata": {},
                "mrn": "mrn://kafka/topic/orders",
            }),
        );

        let result = diff(&desired, &current, &asset_schema());
        assert!(!result.is_change());
    }

    #[test]
    fn diff_treats_empty_string_as_absent() {
        let schema = asset_schema()
            .attribute(AttributeSchema::new(
                "description",
                AttributeType::length_at_most(1000),
            ))
            .attribute(AttributeSchema::new(
                "external_links",
                AttributeType::list_of(AttributeType::Object(vec![
                    AttributeSchema::new("icon", AttributeType::String),
                    AttributeSchema::new("name", AttributeType::String).required(),
                ])),
            ));
        let desired = Resource::new("marmot_asset", "orders")
            .with_attribute("name", json!("orders"))
            .with_attribute("description", json!(""))
            .with_attribute("external_links", json!([{"name": "Runbook", "icon": ""}]));
        // The catalog drops empty strings, so they come back as null
        let current = stored(
            "marmot_asset",
            "orders",
            json!({
                "name": "orders",
                "description": null,
                "external_links": [{"name": "Runbook", "icon": null}],
            }),
        );

        assert_eq!(diff(&desired, &current, &schema), Diff::NoChange(desired.id.clone()));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("marmot_asset", "orders")
            .with_attribute("name", json!("orders"))
            .with_attribute("metadata", json!({"owner": "payments"}));
        let current = stored("marmot_asset", "orders", json!({"name": "orders"}));

        match diff(&desired, &current, &asset_schema()) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["metadata".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_force_new_attribute_changes() {
        let desired = Resource::new("marmot_lineage", "flow")
            .with_attribute("source", json!("mrn://a"))
            .with_attribute("target", json!("mrn://c"));
        let current = stored(
            "marmot_lineage",
            "flow",
            json!({"source": "mrn://a", "target": "mrn://b", "resource_id": "l-1"}),
        );

        match diff(&desired, &current, &lineage_schema()) {
            Diff::Replace {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["target".to_string()]),
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn create_plan_from_resources() {
        let mut schemas = HashMap::new();
        schemas.insert("marmot_asset".to_string(), asset_schema());

        let resources = vec![
            Resource::new("marmot_asset", "new").with_attribute("name", json!("new")),
            Resource::new("marmot_asset", "existing").with_attribute("name", json!("renamed")),
        ];

        let orphan = stored("marmot_asset", "orphan", json!({"name": "orphan"}));
        let existing = stored("marmot_asset", "existing", json!({"name": "existing"}));
        let mut current_states = BTreeMap::new();
        current_states.insert(existing.id.clone(), existing.clone());
        current_states.insert(orphan.id.clone(), orphan.clone());
        let order = vec![orphan.id.clone(), existing.id.clone()];

        let plan = create_plan(&resources, &current_states, &order, &schemas);

        assert_eq!(plan.effects().len(), 3);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
        assert!(matches!(&plan.effects()[2], Effect::Delete(s) if s.id == orphan.id));
    }
}
