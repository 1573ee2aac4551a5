//! Snapshot integrity verification
//!
//! A single forward pass over the resource list checks that:
//! - URNs of live (non-tombstoned) resources are unique
//! - every dependency, property dependency, and parent reference resolves
//!   to a resource that appears earlier in the list
//! - every custom resource's provider reference resolves to an earlier
//!   custom resource with a matching URN and ID
//!
//! Verification is deterministic and side-effect free. Whether a violation
//! is fatal is a policy decision made by the caller, not here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::resource::ResourceState;
use crate::model::snapshot::Snapshot;
use crate::model::urn::{ProviderReference, Urn};

/// The invariant a snapshot violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityErrorKind {
    DuplicateUrn,
    MissingDependency,
    ParentNotFound,
    ProviderNotFound,
}

impl IntegrityErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            IntegrityErrorKind::DuplicateUrn => "duplicate URN",
            IntegrityErrorKind::MissingDependency => "missing dependency",
            IntegrityErrorKind::ParentNotFound => "parent not found",
            IntegrityErrorKind::ProviderNotFound => "provider not found",
        }
    }
}

/// A single integrity violation, naming the offending resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityError {
    pub kind: IntegrityErrorKind,
    pub urn: Urn,
    pub message: String,
}

impl IntegrityError {
    pub fn new(kind: IntegrityErrorKind, urn: impl Into<Urn>, message: impl Into<String>) -> Self {
        Self {
            kind,
            urn: urn.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} for {}: {}", self.kind.label(), self.urn, self.message)
    }
}

/// Verify a candidate snapshot, returning every violation found
///
/// An empty list means the snapshot satisfies all checked invariants.
pub fn verify_snapshot(snapshot: &Snapshot) -> Vec<IntegrityError> {
    let mut errors = Vec::new();

    // URNs of all resources emitted so far (tombstoned included: a
    // dependency on a pending-deletion resource is still resolvable)
    let mut seen: HashSet<&Urn> = HashSet::new();
    // URNs of live resources, for duplicate detection
    let mut live: HashSet<&Urn> = HashSet::new();
    // Earlier resources by URN, for provider resolution
    let mut by_urn: HashMap<&Urn, &ResourceState> = HashMap::new();

    for resource in &snapshot.resources {
        if !resource.delete && !live.insert(&resource.urn) {
            errors.push(IntegrityError::new(
                IntegrityErrorKind::DuplicateUrn,
                resource.urn.clone(),
                "URN appears more than once among live resources",
            ));
        }

        if let Some(parent) = &resource.parent {
            if !seen.contains(parent) {
                errors.push(IntegrityError::new(
                    IntegrityErrorKind::ParentNotFound,
                    resource.urn.clone(),
                    format!("parent {} does not appear earlier in the snapshot", parent),
                ));
            }
        }

        for dependency in &resource.dependencies {
            if !seen.contains(dependency) {
                errors.push(IntegrityError::new(
                    IntegrityErrorKind::MissingDependency,
                    resource.urn.clone(),
                    format!(
                        "dependency {} does not appear earlier in the snapshot",
                        dependency
                    ),
                ));
            }
        }

        for (property, dependencies) in &resource.property_dependencies {
            for dependency in dependencies {
                if !seen.contains(dependency) {
                    errors.push(IntegrityError::new(
                        IntegrityErrorKind::MissingDependency,
                        resource.urn.clone(),
                        format!(
                            "dependency {} of property '{}' does not appear earlier in the snapshot",
                            dependency, property
                        ),
                    ));
                }
            }
        }

        if resource.custom && !resource.provider.is_empty() {
            check_provider(resource, &by_urn, &mut errors);
        }

        seen.insert(&resource.urn);
        // Prefer the live entry when a tombstoned duplicate precedes it
        if !resource.delete || !by_urn.contains_key(&resource.urn) {
            by_urn.insert(&resource.urn, resource);
        }
    }

    errors
}

fn check_provider(
    resource: &ResourceState,
    by_urn: &HashMap<&Urn, &ResourceState>,
    errors: &mut Vec<IntegrityError>,
) {
    let reference = match ProviderReference::parse(&resource.provider) {
        Some(r) => r,
        None => {
            errors.push(IntegrityError::new(
                IntegrityErrorKind::ProviderNotFound,
                resource.urn.clone(),
                format!("malformed provider reference '{}'", resource.provider),
            ));
            return;
        }
    };

    match by_urn.get(&reference.urn) {
        None => {
            errors.push(IntegrityError::new(
                IntegrityErrorKind::ProviderNotFound,
                resource.urn.clone(),
                format!(
                    "provider {} does not appear earlier in the snapshot",
                    reference.urn
                ),
            ));
        }
        Some(provider) if !provider.custom => {
            errors.push(IntegrityError::new(
                IntegrityErrorKind::ProviderNotFound,
                resource.urn.clone(),
                format!("provider {} is not a custom resource", reference.urn),
            ));
        }
        Some(provider) if provider.id != reference.id => {
            errors.push(IntegrityError::new(
                IntegrityErrorKind::ProviderNotFound,
                resource.urn.clone(),
                format!(
                    "provider {} has ID '{}', reference names '{}'",
                    reference.urn, provider.id, reference.id
                ),
            ));
        }
        Some(_) => {}
    }
}
