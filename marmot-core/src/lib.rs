//! Marmot Core
//!
//! Declarative state model and provider contract shared by the Marmot
//! catalog provider, its state store and its command-line driver.

pub mod attr;
pub mod differ;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
