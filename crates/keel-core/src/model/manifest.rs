use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Snapshot manifest: deployment-time metadata stamped on every saved snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Timestamp of the save
    pub time: DateTime<Utc>,

    /// Hex SHA-256 of the tool version, used as a consistency check when
    /// reloading a snapshot
    pub magic: String,

    /// Version of the tool that produced the snapshot
    pub version: String,

    /// Plugins that participated in the deployment
    #[serde(default)]
    pub plugins: Vec<PluginInfo>,
}

impl Manifest {
    /// Create a manifest for the given tool version, stamping the current time
    pub fn new(version: impl Into<String>, plugins: Vec<PluginInfo>) -> Self {
        let version = version.into();
        let magic = Self::magic_for(&version);
        Self {
            time: Utc::now(),
            magic,
            version,
            plugins,
        }
    }

    /// Compute the magic number for a version string
    pub fn magic_for(version: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(version.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Clone with a fresh timestamp, keeping version, magic, and plugins
    pub fn restamp(&self) -> Manifest {
        Manifest {
            time: Utc::now(),
            magic: self.magic.clone(),
            version: self.version.clone(),
            plugins: self.plugins.clone(),
        }
    }
}

/// A plugin that participated in producing a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub kind: String,
}
