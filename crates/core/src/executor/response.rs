//! ArcGIS REST response shapes.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::feature::{DedupKey, Feature, KeyedFeature, Properties};
use crate::geometry::{Geometry, translate_value};

/// Fails with [`TransportError::Service`] if the body is an ArcGIS error object.
///
/// ArcGIS reports many failures as HTTP 200 with
/// `{"error": {"code": 400, "message": "...", "details": [...]}}`.
pub(crate) fn check_service_error(value: Value) -> TransportResult<Value> {
    let Some(error) = value.get("error").filter(|e| e.is_object()) else {
        return Ok(value);
    };

    let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
    let mut message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown service error")
        .to_string();

    let details: Vec<&str> = error
        .get("details")
        .and_then(Value::as_array)
        .map(|details| details.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !details.is_empty() {
        message = format!("{message} ({})", details.join("; "));
    }

    Err(TransportError::Service { code, message })
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> TransportResult<T> {
    serde_json::from_value(value).map_err(TransportError::decode)
}

/// `returnCountOnly=true` response.
#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

/// `returnIdsOnly=true` response. `objectIds` is null when nothing matches.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdsResponse {
    #[serde(default)]
    pub object_id_field_name: Option<String>,
    #[serde(default)]
    pub object_ids: Option<Vec<Value>>,
}

impl IdsResponse {
    /// Object ids rendered for the `objectIds` parameter.
    pub fn ids(&self) -> Vec<String> {
        self.object_ids
            .iter()
            .flatten()
            .filter_map(|id| match id {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

/// One Esri JSON record: attributes plus native geometry.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderRecord {
    #[serde(default)]
    pub attributes: Properties,
    #[serde(default)]
    pub geometry: Option<Value>,
}

/// `f=json` feature set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EsriFeatureSet {
    #[serde(default)]
    pub features: Vec<ProviderRecord>,
    #[serde(default)]
    pub exceeded_transfer_limit: bool,
    #[serde(default)]
    pub object_id_field_name: Option<String>,
}

/// `f=geojson` feature, as produced by the server.
#[derive(Debug, Deserialize)]
pub(crate) struct GeoJsonRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

/// `f=geojson` feature collection. The transfer-limit flag appears either at
/// the top level or under `properties`, depending on server version.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeoJsonFeatureSet {
    #[serde(default)]
    pub features: Vec<GeoJsonRecord>,
    #[serde(default)]
    pub exceeded_transfer_limit: bool,
    #[serde(default)]
    pub properties: Option<Value>,
}

/// Features decoded from one response.
#[derive(Debug, Default)]
pub(crate) struct RecordBatch {
    pub features: Vec<KeyedFeature>,
    /// Records dropped for lacking usable geometry.
    pub dropped: usize,
    pub exceeded_transfer_limit: bool,
}

impl EsriFeatureSet {
    pub fn into_batch(self, object_id_field: Option<&str>) -> RecordBatch {
        let field = object_id_field.or(self.object_id_field_name.as_deref());
        let mut batch = RecordBatch {
            exceeded_transfer_limit: self.exceeded_transfer_limit,
            ..Default::default()
        };

        for record in self.features {
            let Some(geometry) = record.geometry.as_ref().and_then(translate_value) else {
                batch.dropped += 1;
                continue;
            };
            let key = DedupKey::derive(&record.attributes, field, None);
            batch.features.push(KeyedFeature {
                key,
                feature: Feature::new(geometry, record.attributes),
            });
        }

        batch
    }
}

impl GeoJsonFeatureSet {
    pub fn into_batch(self) -> RecordBatch {
        let exceeded = self.exceeded_transfer_limit
            || self
                .properties
                .as_ref()
                .and_then(|p| p.get("exceededTransferLimit"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
        let mut batch = RecordBatch {
            exceeded_transfer_limit: exceeded,
            ..Default::default()
        };

        for record in self.features {
            let Some(geometry) = record.geometry.as_ref().and_then(Geometry::from_geojson) else {
                batch.dropped += 1;
                continue;
            };
            let properties = record.properties.unwrap_or_default();
            let key = DedupKey::derive(&properties, None, record.id.as_ref());
            batch.features.push(KeyedFeature {
                key,
                feature: Feature::new(geometry, properties),
            });
        }

        batch
    }
}
