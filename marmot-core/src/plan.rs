//! Plan - Collection of Effects
//!
//! A Plan is an ordered list of Effects to be executed.
//! No side effects occur until the Plan is applied.

use std::fmt;

use crate::resource::{Resource, ResourceId, State};

/// A single change to apply
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Create(Resource),
    Update {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Delete then re-create, because a force-new attribute changed
    Replace {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    Delete(State),
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Create(r) => &r.id,
            Effect::Update { to, .. } | Effect::Replace { to, .. } => &to.id,
            Effect::Delete(state) => &state.id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Effect::Create(_) => "create",
            Effect::Update { .. } => "update",
            Effect::Replace { .. } => "replace",
            Effect::Delete(_) => "delete",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.resource_id())
    }
}

/// Plan containing Effects to be executed
#[derive(Debug, Clone, Default)]
pub struct Plan {
    effects: Vec<Effect>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for effect in &self.effects {
            match effect {
                Effect::Create(_) => summary.create += 1,
                Effect::Update { .. } => summary.update += 1,
                Effect::Replace { .. } => summary.replace += 1,
                Effect::Delete(_) => summary.delete += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan: {} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan() {
        let plan = Plan::new();
        assert!(plan.is_empty());
        assert_eq!(plan.summary(), PlanSummary::default());
    }

    #[test]
    fn plan_summary() {
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("marmot_asset", "orders")));
        plan.add(Effect::Create(Resource::new("marmot_asset", "payments")));
        plan.add(Effect::Delete(State::not_found(ResourceId::new(
            "marmot_lineage",
            "old",
        ))));

        let summary = plan.summary();
        assert_eq!(summary.create, 2);
        assert_eq!(summary.delete, 1);
        assert_eq!(
            summary.to_string(),
            "Plan: 2 to create, 0 to update, 0 to replace, 1 to delete"
        );
    }

    #[test]
    fn effect_display() {
        let effect = Effect::Create(Resource::new("marmot_glossary_term", "revenue"));
        assert_eq!(effect.to_string(), "create marmot_glossary_term.revenue");
    }
}
