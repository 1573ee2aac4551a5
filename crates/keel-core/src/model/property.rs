//! Property values - the tagged union over resource input/output data
//!
//! Equality is structural: object keys live in a `BTreeMap`, so two maps
//! with the same entries compare equal regardless of insertion order, and
//! an empty container round-tripped through the wire encoding stays equal
//! to the original.
//!
//! ## Wire encoding
//!
//! Plain JSON shapes map directly (null, bool, number, string, array,
//! object). The non-JSON variants are encoded as single-key sentinel
//! objects so the tagged structure survives a round trip:
//!
//! - `Secret(v)`   → `{"$secret": <encoded v>}`
//! - `Computed`    → `{"$computed": true}`
//! - `Asset(a)`    → `{"$asset": {...}}`
//! - `Archive(a)`  → `{"$archive": {...}}`

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Map from property name to property value
pub type PropertyMap = BTreeMap<String, PropertyValue>;

const SECRET_KEY: &str = "$secret";
const COMPUTED_KEY: &str = "$computed";
const ASSET_KEY: &str = "$asset";
const ARCHIVE_KEY: &str = "$archive";

/// A single property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
    /// Secret-wrapped value; the wrapping must survive persistence
    Secret(Box<PropertyValue>),
    /// Sentinel for a value not yet known during a deployment
    Computed,
    Asset(Asset),
    Archive(Archive),
}

impl PropertyValue {
    /// Convenience constructor for string properties
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Convenience constructor for secret-wrapped properties
    pub fn secret(value: PropertyValue) -> Self {
        Self::Secret(Box::new(value))
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Encode to the wire JSON representation
    pub fn to_json_value(&self) -> Value {
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Array(items) => {
                Value::Array(items.iter().map(|v| v.to_json_value()).collect())
            }
            PropertyValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
            PropertyValue::Secret(inner) => {
                let mut obj = serde_json::Map::new();
                obj.insert(SECRET_KEY.to_string(), inner.to_json_value());
                Value::Object(obj)
            }
            PropertyValue::Computed => {
                let mut obj = serde_json::Map::new();
                obj.insert(COMPUTED_KEY.to_string(), Value::Bool(true));
                Value::Object(obj)
            }
            PropertyValue::Asset(asset) => {
                let mut obj = serde_json::Map::new();
                obj.insert(
                    ASSET_KEY.to_string(),
                    serde_json::to_value(asset).unwrap_or(Value::Null),
                );
                Value::Object(obj)
            }
            PropertyValue::Archive(archive) => {
                let mut obj = serde_json::Map::new();
                obj.insert(
                    ARCHIVE_KEY.to_string(),
                    serde_json::to_value(archive).unwrap_or(Value::Null),
                );
                Value::Object(obj)
            }
        }
    }

    /// Decode from the wire JSON representation
    pub fn from_json_value(value: &Value) -> Result<Self, serde_json::Error> {
        Ok(match value {
            Value::Null => PropertyValue::Null,
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => {
                let n = n.as_f64().ok_or_else(|| {
                    serde_json::Error::custom("property number is not representable as f64")
                })?;
                PropertyValue::Number(n)
            }
            Value::String(s) => PropertyValue::String(s.clone()),
            Value::Array(items) => PropertyValue::Array(
                items
                    .iter()
                    .map(Self::from_json_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(obj) => {
                if obj.len() == 1 {
                    if let Some(inner) = obj.get(SECRET_KEY) {
                        return Ok(PropertyValue::secret(Self::from_json_value(inner)?));
                    }
                    if obj.contains_key(COMPUTED_KEY) {
                        return Ok(PropertyValue::Computed);
                    }
                    if let Some(inner) = obj.get(ASSET_KEY) {
                        return Ok(PropertyValue::Asset(serde_json::from_value(inner.clone())?));
                    }
                    if let Some(inner) = obj.get(ARCHIVE_KEY) {
                        return Ok(PropertyValue::Archive(serde_json::from_value(
                            inner.clone(),
                        )?));
                    }
                }
                let mut map = PropertyMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), Self::from_json_value(v)?);
                }
                PropertyValue::Object(map)
            }
        })
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PropertyValue::from_json_value(&value).map_err(D::Error::custom)
    }
}

/// A file asset referenced by resource state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Content hash, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(flatten)]
    pub source: AssetSource,
}

/// Where an asset's content comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetSource {
    Text { text: String },
    Path { path: String },
    Uri { uri: String },
}

/// An archive (a collection of assets) referenced by resource state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    /// Content hash, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(flatten)]
    pub source: ArchiveSource,
}

/// Where an archive's content comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArchiveSource {
    Path { path: String },
    Uri { uri: String },
    Assets { assets: BTreeMap<String, Asset> },
}
