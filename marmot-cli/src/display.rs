//! Terminal rendering of plans and values

use std::collections::HashMap;

use colored::Colorize;
use marmot_core::plan::{Effect, Plan};
use marmot_core::resource::Attributes;
use marmot_core::schema::ResourceSchema;
use serde_json::Value;

use crate::reference::ReferenceResolver;

pub const KNOWN_AFTER_APPLY: &str = "(known after apply)";
const SENSITIVE: &str = "(sensitive)";

pub fn print_plan(
    plan: &Plan,
    schemas: &HashMap<String, ResourceSchema>,
    resolver: &ReferenceResolver,
) {
    if plan.is_empty() {
        println!("{}", "No changes. Catalog is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let schema = schemas.get(&effect.resource_id().resource_type);
        let symbol = match effect {
            Effect::Create(_) => "+".green().bold(),
            Effect::Update { .. } => "~".yellow().bold(),
            Effect::Replace { .. } => "-/+".magenta().bold(),
            Effect::Delete(_) => "-".red().bold(),
        };
        println!(
            "  {} {}",
            symbol,
            effect.resource_id().to_string().cyan().bold()
        );

        match effect {
            Effect::Create(r) => {
                for key in sorted_keys(&r.attributes) {
                    let value = &r.attributes[key];
                    if value.is_null() {
                        continue;
                    }
                    println!(
                        "      {}: {}",
                        key,
                        display_value(key, value, schema, resolver).green()
                    );
                }
                if let Some(schema) = schema {
                    for attr in schema.attributes.values().filter(|a| a.computed) {
                        println!("      {}: {}", attr.name, KNOWN_AFTER_APPLY.dimmed());
                    }
                }
            }
            Effect::Update {
                from,
                to,
                changed_attributes,
            }
            | Effect::Replace {
                from,
                to,
                changed_attributes,
            } => {
                for key in changed_attributes {
                    let old = from
                        .attributes
                        .get(key)
                        .filter(|v| !v.is_null())
                        .map(|v| display_value(key, v, schema, resolver))
                        .unwrap_or_else(|| "(none)".to_string());
                    let new = to
                        .attributes
                        .get(key)
                        .filter(|v| !v.is_null())
                        .map(|v| display_value(key, v, schema, resolver))
                        .unwrap_or_else(|| "(none)".to_string());
                    let forces = schema.is_some_and(|s| s.is_force_new(key))
                        && matches!(effect, Effect::Replace { .. });
                    if forces {
                        println!(
                            "      {}: {} → {} {}",
                            key,
                            old.red(),
                            new.green(),
                            "(forces replacement)".magenta()
                        );
                    } else {
                        println!("      {}: {} → {}", key, old.red(), new.green());
                    }
                }
            }
            Effect::Delete(state) => {
                if let Some(identifier) = &state.identifier {
                    println!("      {}: {}", "id".bold(), identifier.red());
                }
            }
        }
    }

    println!();
    println!("{}", format_summary(plan));
}

fn format_summary(plan: &Plan) -> String {
    let summary = plan.summary();
    format!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    )
}

/// Attribute keys with `name` first, the rest sorted
fn sorted_keys(attributes: &Attributes) -> Vec<&String> {
    let mut keys: Vec<_> = attributes.keys().collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

fn display_value(
    key: &str,
    value: &Value,
    schema: Option<&ResourceSchema>,
    resolver: &ReferenceResolver,
) -> String {
    if schema.is_some_and(|s| s.is_sensitive(key)) {
        return SENSITIVE.to_string();
    }
    format_value(value, resolver)
}

pub fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { to, .. } => format!("Update {}", to.id),
        Effect::Replace { to, .. } => format!("Replace {}", to.id),
        Effect::Delete(state) => format!("Delete {}", state.id),
    }
}

pub fn format_value(value: &Value, resolver: &ReferenceResolver) -> String {
    match value {
        Value::String(s) if resolver.is_reference(s) => KNOWN_AFTER_APPLY.to_string(),
        Value::String(s) => format!("\"{}\"", s),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let strs: Vec<_> = items.iter().map(|v| format_value(v, resolver)).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Object(map) => {
            let strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v, resolver)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marmot_core::resource::{Resource, ResourceId, State};
    use serde_json::json;

    #[test]
    fn format_plain_values() {
        let resolver = ReferenceResolver::new().unwrap();
        assert_eq!(format_value(&json!("orders"), &resolver), "\"orders\"");
        assert_eq!(format_value(&json!(3), &resolver), "3");
        assert_eq!(
            format_value(&json!(["Kafka", "S3"]), &resolver),
            "[\"Kafka\", \"S3\"]"
        );
        assert_eq!(
            format_value(&json!({"owner": "data"}), &resolver),
            "{owner: \"data\"}"
        );
    }

    #[test]
    fn references_display_as_known_after_apply() {
        let resolver = ReferenceResolver::new().unwrap();
        assert_eq!(
            format_value(&json!("${marmot_asset.orders.mrn}"), &resolver),
            KNOWN_AFTER_APPLY
        );
        assert_eq!(
            format_value(&json!(["${marmot_asset.orders.mrn}"]), &resolver),
            "[(known after apply)]"
        );
    }

    #[test]
    fn format_effects() {
        let resource = Resource::new("marmot_asset", "orders");
        assert_eq!(
            format_effect(&Effect::Create(resource)),
            "Create marmot_asset.orders"
        );
        let state = State::not_found(ResourceId::new("marmot_lineage", "flow"));
        assert_eq!(format_effect(&Effect::Delete(state)), "Delete marmot_lineage.flow");
    }

    #[test]
    fn name_sorts_first() {
        let attributes: Attributes =
            serde_json::from_value(json!({"description": "d", "name": "n", "type": "Topic"}))
                .unwrap();
        let keys: Vec<_> = sorted_keys(&attributes).into_iter().cloned().collect();
        assert_eq!(keys, vec!["name", "description", "type"]);
    }
}
