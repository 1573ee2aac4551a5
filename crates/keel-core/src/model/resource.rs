use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::property::PropertyMap;
use super::urn::Urn;

/// ResourceState - the unit of persisted state
///
/// A resource state is immutable once placed into a snapshot: mutations
/// (such as tombstoning during a replace) are expressed by producing a
/// shallow clone with the changed field, never by editing the stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Stable identifier for this resource (required, non-empty)
    pub urn: Urn,

    /// Resource type token
    #[serde(rename = "type")]
    pub type_: String,

    /// Provider-assigned ID; empty for resources not yet created
    #[serde(default)]
    pub id: String,

    /// Managed by a provider (true) vs. a component resource (false)
    #[serde(default)]
    pub custom: bool,

    /// Read-only reference to a resource managed out of band
    #[serde(default)]
    pub external: bool,

    /// Tombstone flag - pending deletion, retained for dependents
    #[serde(default)]
    pub delete: bool,

    /// Forbids deletion of this resource
    #[serde(default)]
    pub protect: bool,

    /// Parent resource URN, if any
    #[serde(default)]
    pub parent: Option<Urn>,

    /// Provider reference string `<providerURN>::<providerID>`, or empty
    #[serde(default)]
    pub provider: String,

    /// Ordered list of resources this resource depends on
    #[serde(default)]
    pub dependencies: Vec<Urn>,

    /// Map from input property name to the URNs that property depends on
    #[serde(default)]
    pub property_dependencies: BTreeMap<String, Vec<Urn>>,

    /// Input properties
    #[serde(default)]
    pub inputs: PropertyMap,

    /// Output properties
    #[serde(default)]
    pub outputs: PropertyMap,

    /// Provider initialization errors carried on the state
    #[serde(default)]
    pub init_errors: Vec<String>,

    /// ID used to import this resource, if it was imported
    #[serde(default)]
    pub import_id: String,

    /// Leave the live resource in place when deleting the state entry
    #[serde(default)]
    pub retain_on_delete: bool,

    /// URN of a resource whose deletion implies this one is gone
    #[serde(default)]
    pub deleted_with: Option<Urn>,

    /// Output property names the provider must additionally treat as secret
    #[serde(default)]
    pub additional_secret_outputs: Vec<String>,

    /// Previous URNs this resource was known by
    #[serde(default)]
    pub aliases: Vec<Urn>,

    /// Provider operation timeout overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_timeouts: Option<CustomTimeouts>,

    /// Program source position that registered this resource
    ///
    /// Informational only; never makes a change meaningful.
    #[serde(default)]
    pub source_position: String,

    /// Timestamp when this resource was first created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Timestamp when this resource state was last modified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl ResourceState {
    /// Create a resource state with the given URN and type
    ///
    /// All other fields start at their zero values.
    pub fn new(urn: impl Into<Urn>, type_: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            type_: type_.into(),
            id: String::new(),
            custom: false,
            external: false,
            delete: false,
            protect: false,
            parent: None,
            provider: String::new(),
            dependencies: Vec::new(),
            property_dependencies: BTreeMap::new(),
            inputs: PropertyMap::new(),
            outputs: PropertyMap::new(),
            init_errors: Vec::new(),
            import_id: String::new(),
            retain_on_delete: false,
            deleted_with: None,
            additional_secret_outputs: Vec::new(),
            aliases: Vec::new(),
            custom_timeouts: None,
            source_position: String::new(),
            created: None,
            modified: None,
        }
    }

    /// Check whether this resource has been assigned a provider ID
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Shallow clone with the tombstone flag set
    ///
    /// Used when a replaced resource must be retained at its base position
    /// pending deletion. The stored original is never mutated in place.
    pub fn as_deleted(&self) -> ResourceState {
        let mut clone = self.clone();
        clone.delete = true;
        clone
    }
}

/// Provider operation timeout overrides, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CustomTimeouts {
    #[serde(default)]
    pub create: f64,
    #[serde(default)]
    pub update: f64,
    #[serde(default)]
    pub delete: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resource_state() {
        let state = ResourceState::new("stack::proj::::t::a", "t");
        assert_eq!(state.urn.as_str(), "stack::proj::::t::a");
        assert_eq!(state.type_, "t");
        assert!(!state.has_id());
        assert!(!state.delete);
        assert!(state.dependencies.is_empty());
        assert!(state.inputs.is_empty());
    }

    #[test]
    fn test_as_deleted_is_a_clone() {
        let state = ResourceState::new("a", "t");
        let deleted = state.as_deleted();

        assert!(deleted.delete);
        assert!(!state.delete);
        assert_eq!(deleted.urn, state.urn);
    }

    #[test]
    fn test_serde_round_trip_defaults() {
        let state = ResourceState::new("a", "t");
        let json = serde_json::to_string(&state).unwrap();
        let back: ResourceState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn test_type_field_renamed() {
        let state = ResourceState::new("a", "custom:module:Thing");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json.get("type").and_then(|v| v.as_str()),
            Some("custom:module:Thing")
        );
    }
}
