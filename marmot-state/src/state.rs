//! State file structures for persisting catalog state

use std::collections::BTreeMap;

use marmot_core::resource::{Attributes, ResourceId, State};
use serde::{Deserialize, Serialize};

/// The state file persisted by a [`StateStore`](crate::StateStore)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Marmot that last modified this state
    pub marmot_version: String,
    /// Managed resources in the order they were first stored
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            marmot_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and record the writing version
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.marmot_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(id))
    }

    /// Add or replace a resource, keeping its position if already stored
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        let id = resource.resource_id();
        match self.resources.iter_mut().find(|r| r.matches(&id)) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(id))?;
        Some(self.resources.remove(pos))
    }

    /// Stored resource ids in storage order
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.resources.iter().map(ResourceState::resource_id).collect()
    }

    /// Stored resources as provider states
    pub fn current_states(&self) -> BTreeMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| (r.resource_id(), r.to_state()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Stored state of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "marmot_asset")
    pub resource_type: String,
    /// Local name given in configuration
    pub name: String,
    /// Provider name (e.g., "marmot")
    pub provider: String,
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// All attributes, declared and computed
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceState {
    /// Record a provider state; `None` if the entity does not exist
    pub fn from_state(state: &State, provider: impl Into<String>) -> Option<Self> {
        state.exists.then(|| Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            provider: provider.into(),
            identifier: state.identifier.clone(),
            attributes: state.attributes.clone(),
        })
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn to_state(&self) -> State {
        let state = State::existing(self.resource_id(), self.attributes.clone());
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        }
    }

    fn matches(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }
}
