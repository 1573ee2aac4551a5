use serde::{Deserialize, Serialize};

/// Uniform Resource Name - the stable identifier for a resource within a stack
///
/// A URN is structured as `stack::project::parentType::type::name`, but the
/// type treats the string as opaque: equality, ordering, and hashing operate
/// on the full string, and no shape is enforced. Component accessors return
/// `None` when the string does not carry all five segments (tests routinely
/// use shorthand names).
///
/// Changing a resource's parent changes its URN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Urn(String);

impl Urn {
    /// Build a URN from its five components
    pub fn new(stack: &str, project: &str, parent_type: &str, type_: &str, name: &str) -> Self {
        Self(format!(
            "{}::{}::{}::{}::{}",
            stack, project, parent_type, type_, name
        ))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components(&self) -> Option<[&str; 5]> {
        let mut parts = self.0.splitn(5, "::");
        let stack = parts.next()?;
        let project = parts.next()?;
        let parent_type = parts.next()?;
        let type_ = parts.next()?;
        let name = parts.next()?;
        Some([stack, project, parent_type, type_, name])
    }

    /// The stack component, if the URN is fully structured
    pub fn stack(&self) -> Option<&str> {
        self.components().map(|c| c[0])
    }

    /// The project component, if the URN is fully structured
    pub fn project(&self) -> Option<&str> {
        self.components().map(|c| c[1])
    }

    /// The parent-type component, if the URN is fully structured
    pub fn parent_type(&self) -> Option<&str> {
        self.components().map(|c| c[2])
    }

    /// The type component, if the URN is fully structured
    pub fn type_(&self) -> Option<&str> {
        self.components().map(|c| c[3])
    }

    /// The name component, if the URN is fully structured
    pub fn name(&self) -> Option<&str> {
        self.components().map(|c| c[4])
    }
}

impl From<&str> for Urn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Urn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a provider resource: `<providerURN>::<providerID>`
///
/// The provider URN itself contains `::` separators, so the ID is split off
/// at the last occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReference {
    pub urn: Urn,
    pub id: String,
}

impl ProviderReference {
    /// Parse a provider reference string, `None` if it has no ID segment
    pub fn parse(reference: &str) -> Option<Self> {
        let (urn, id) = reference.rsplit_once("::")?;
        if urn.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self {
            urn: Urn::from(urn),
            id: id.to_string(),
        })
    }

    /// Render the reference back to its string form
    pub fn to_reference(&self) -> String {
        format!("{}::{}", self.urn, self.id)
    }
}
