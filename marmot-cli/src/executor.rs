//! Plan execution against the provider and the state store
//!
//! Effects run sequentially in plan order. References are resolved again
//! before each effect, so a resource can use values computed for resources
//! created earlier in the same run. State is written after every effect.

use std::collections::HashMap;

use colored::Colorize;
use log::debug;
use marmot_core::differ::create_plan;
use marmot_core::plan::{Effect, Plan};
use marmot_core::provider::{Diagnostic, Provider, ProviderError};
use marmot_core::resource::{Resource, ResourceId, State};
use marmot_core::schema::ResourceSchema;
use marmot_state::{ResourceState, StateFile, StateStore};

use crate::display::format_effect;
use crate::reference::ReferenceResolver;

/// Outcome counts of an apply or destroy run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Plan the declared resources against the stored state
pub fn build_plan(
    resources: &[Resource],
    state: &StateFile,
    schemas: &HashMap<String, ResourceSchema>,
    resolver: &ReferenceResolver,
) -> Plan {
    let current = state.current_states();
    let desired: Vec<Resource> = resources
        .iter()
        .map(|r| resolver.resolve(r, &current).resource)
        .collect();
    create_plan(&desired, &current, &state.resource_ids(), schemas)
}

/// Delete plan for every stored resource, newest first
pub fn destroy_plan(state: &StateFile) -> Plan {
    let mut plan = Plan::new();
    for resource in state.resources.iter().rev() {
        plan.add(Effect::Delete(resource.to_state()));
    }
    plan
}

/// Re-read every stored resource; returns the ids that no longer exist
///
/// Gone resources are dropped from `state` so that the next plan
/// re-creates them.
pub async fn refresh_state(
    provider: &dyn Provider,
    state: &mut StateFile,
) -> Result<Vec<ResourceId>, String> {
    let mut removed = Vec::new();

    for stored in state.resources.clone() {
        let id = stored.resource_id();
        let current = provider
            .read(&stored.to_state())
            .await
            .map_err(|e| format!("Failed to refresh {}: {}", id, describe(&e)))?;

        if !record(state, &current, provider.name()) {
            debug!("{} no longer exists", id);
            removed.push(id);
        }
    }

    Ok(removed)
}

/// Apply each effect in order, persisting state after every one
///
/// A failed effect is reported and the run continues. Failure to persist
/// state aborts the run.
pub async fn apply_plan(
    plan: &Plan,
    provider: &dyn Provider,
    store: &dyn StateStore,
    state: &mut StateFile,
    resolver: &ReferenceResolver,
) -> Result<ApplyReport, String> {
    let mut report = ApplyReport::default();

    for effect in plan.effects() {
        match apply_effect(effect, provider, state, resolver).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                report.succeeded += 1;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                report.failed += 1;
            }
        }
        persist(store, state).await?;
    }

    Ok(report)
}

async fn apply_effect(
    effect: &Effect,
    provider: &dyn Provider,
    state: &mut StateFile,
    resolver: &ReferenceResolver,
) -> Result<(), String> {
    match effect {
        Effect::Create(resource) => {
            let resource = resolve_complete(resolver, resource, state)?;
            let created = provider
                .create(&resource)
                .await
                .map_err(|e| describe(&e))?;
            record(state, &created, provider.name());
        }
        Effect::Update { from, to, .. } => {
            let to = resolve_complete(resolver, to, state)?;
            let updated = provider
                .update(from, &to)
                .await
                .map_err(|e| describe(&e))?;
            record(state, &updated, provider.name());
        }
        Effect::Replace { from, to, .. } => {
            let to = resolve_complete(resolver, to, state)?;
            provider.delete(from).await.map_err(|e| describe(&e))?;
            state.remove_resource(&from.id);
            let created = provider.create(&to).await.map_err(|e| describe(&e))?;
            record(state, &created, provider.name());
        }
        Effect::Delete(current) => {
            provider.delete(current).await.map_err(|e| describe(&e))?;
            state.remove_resource(&current.id);
        }
    }
    Ok(())
}

/// Resolve references, failing if any is still unknown
fn resolve_complete(
    resolver: &ReferenceResolver,
    resource: &Resource,
    state: &StateFile,
) -> Result<Resource, String> {
    let resolved = resolver.resolve(resource, &state.current_states());
    if !resolved.is_complete() {
        let names: Vec<_> = resolved.unresolved.iter().map(|r| r.to_string()).collect();
        return Err(format!("Unresolved reference: {}", names.join(", ")));
    }
    Ok(resolved.resource)
}

/// Store an observed state; returns false (and forgets the resource) if it is gone
pub fn record(state: &mut StateFile, observed: &State, provider: &str) -> bool {
    match ResourceState::from_state(observed, provider) {
        Some(stored) => {
            state.upsert_resource(stored);
            true
        }
        None => {
            state.remove_resource(&observed.id);
            false
        }
    }
}

pub async fn persist(store: &dyn StateStore, state: &mut StateFile) -> Result<(), String> {
    state.increment_serial();
    store
        .save(state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

fn describe(err: &ProviderError) -> String {
    Diagnostic::from(err).to_string()
}
