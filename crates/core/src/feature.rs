//! GeoJSON features and deduplication keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::Geometry;
use crate::merger::identifier_from_parts;

/// Feature attributes.
pub type Properties = Map<String, Value>;

/// Attribute names probed for a provider object id when the response does
/// not name its object id field.
const OBJECT_ID_FIELDS: &[&str] = &["OBJECTID", "objectid", "ObjectID", "FID", "fid"];

/// Attribute names probed, in order, for an identifier-based key.
const IDENTIFIER_FIELDS: &[&str] = &["lotidstring", "lotplan", "label"];

/// A GeoJSON feature. Geometry is never null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// Returns a string property.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Key used to collapse duplicate records within one jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Provider object id.
    ObjectId(String),
    /// Lotidstring, lotplan, label or the identifier built from their parts
    /// when the provider exposes no object id.
    Identifier(String),
}

impl DedupKey {
    /// Derives a key from a provider record.
    ///
    /// Tries the named object id field, the common object id attributes,
    /// then the GeoJSON feature `id`, then identifier attributes, then an
    /// identifier built from lot/plan or volume/folio parts.
    pub fn derive(
        properties: &Properties,
        object_id_field: Option<&str>,
        feature_id: Option<&Value>,
    ) -> Option<Self> {
        let object_id = object_id_field
            .and_then(|field| properties.get(field))
            .and_then(scalar_key)
            .or_else(|| {
                OBJECT_ID_FIELDS
                    .iter()
                    .find_map(|field| properties.get(*field).and_then(scalar_key))
            })
            .or_else(|| feature_id.and_then(scalar_key));

        if let Some(id) = object_id {
            return Some(DedupKey::ObjectId(id));
        }

        IDENTIFIER_FIELDS
            .iter()
            .find_map(|field| properties.get(*field).and_then(scalar_key))
            .or_else(|| identifier_from_parts(properties))
            .map(|id| DedupKey::Identifier(id.to_uppercase()))
    }
}

/// A feature paired with its dedup key. Features without a key are never collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedFeature {
    pub key: Option<DedupKey>,
    pub feature: Feature,
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
