//! Provider - Trait abstracting resource operations
//!
//! A Provider maps declared resources onto a remote service. Each operation
//! performs its own API calls and returns the resulting stored state.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Error type for Provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A required input is missing at the point of use
    #[error("{0}")]
    Configuration(String),

    /// The API call itself failed
    #[error("{message}: {source}")]
    Client {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The API call succeeded but returned an unusable result
    #[error("{0}")]
    ApiContract(String),

    /// A value could not be converted between the declarative and wire models
    #[error("{0}")]
    Conversion(String),

    /// The operation is not supported for this resource
    #[error("{0}")]
    Usage(String),

    /// Declared attributes do not match the resource schema
    #[error("{}", join_errors(.0))]
    Validation(Vec<TypeError>),
}

fn join_errors(errors: &[TypeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn client(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Client {
            message: message.into(),
            source: Box::new(cause),
        }
    }

    pub fn api_contract(message: impl Into<String>) -> Self {
        Self::ApiContract(message.into())
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Short, user-facing title of this error class
    pub fn summary(&self) -> &'static str {
        match self {
            ProviderError::Configuration(_) => "Configuration Error",
            ProviderError::Client { .. } => "Client Error",
            ProviderError::ApiContract(_) => "API Error",
            ProviderError::Conversion(_) => "Type Conversion Error",
            ProviderError::Usage(_) => "Usage Error",
            ProviderError::Validation(_) => "Invalid Configuration",
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// User-visible error produced by configuration or validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: String,
    /// Attribute the diagnostic refers to, if any
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn for_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{} ({}): {}", self.summary, attr, self.detail),
            None => write!(f, "{}: {}", self.summary, self.detail),
        }
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        Diagnostic::error(err.summary(), err.to_string())
    }
}

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "marmot_asset")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// All operations are async and perform side effects on the remote service.
/// Implementations hold no mutable state shared between resource instances.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "marmot")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Refresh a stored resource
    ///
    /// Returns `State::not_found()` if the entity no longer exists remotely.
    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the server-assigned id
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    ///
    /// The identifier is always taken from `from`, never from `to`.
    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    ///
    /// Deleting an entity that no longer exists succeeds.
    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>>;

    /// Adopt an existing remote entity by its identifier
    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(current)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(from, to)
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(current)
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}
