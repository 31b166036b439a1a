//! Minimal Azure Resource Manager REST client: just enough to create or update a resource, wait
//! for the long-running operation to finish and invoke resource actions.

pub mod client;
pub mod error;
pub mod resource_id;

pub use client::ArmClient;
pub use error::ArmError;
pub use resource_id::ResourceId;

use std::collections::BTreeMap;

/// Tag attached to every resource provisioned by the gateway.
pub const ENVIRONMENT_TAG: (&str, &str) = ("Environment", "Dev");

/// Default tags of provisioned resources.
pub fn default_tags() -> BTreeMap<String, String> {
    BTreeMap::from([(ENVIRONMENT_TAG.0.to_string(), ENVIRONMENT_TAG.1.to_string())])
}
