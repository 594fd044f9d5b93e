//! Response bodies shaped like the state cadastre services.

use serde_json::{Value, json};

/// A unit square ring anchored at `(x, y)`.
pub fn square(x: f64, y: f64) -> Value {
    json!([[[x, y], [x + 0.001, y], [x + 0.001, y + 0.001], [x, y]]])
}

/// An NSW cadastre record as returned by an `f=json` query.
pub fn nsw_record(objectid: i64, lot: &str, plan: &str) -> Value {
    json!({
        "attributes": {
            "objectid": objectid,
            "cadid": 100_000 + objectid,
            "lotnumber": lot,
            "sectionnumber": null,
            "planlabel": plan,
            "lotidstring": format!("{lot}//{plan}"),
            "shape_Area": 612.4,
            "shape_Length": 101.2
        },
        "geometry": {"rings": square(151.0, -33.8)}
    })
}

/// A Queensland LPPF feature as returned by an `f=geojson` query.
pub fn qld_feature(id: i64, lotplan: &str) -> Value {
    json!({
        "type": "Feature",
        "id": id,
        "geometry": {"type": "Polygon", "coordinates": square(153.0, -27.4)},
        "properties": {
            "objectid": id,
            "lot": 1.0,
            "plan": "RP912949",
            "lotidstring": lotplan,
            "lotplan": lotplan,
            "locality": " BRISBANE CITY "
        }
    })
}

pub fn count(n: u64) -> Value {
    json!({"count": n})
}

pub fn ids(ids: &[i64]) -> Value {
    json!({"objectIdFieldName": "objectid", "objectIds": ids})
}

pub fn esri_set(records: Vec<Value>) -> Value {
    json!({
        "objectIdFieldName": "objectid",
        "geometryType": "esriGeometryPolygon",
        "spatialReference": {"wkid": 4326},
        "features": records
    })
}

pub fn geojson_set(features: Vec<Value>) -> Value {
    json!({"type": "FeatureCollection", "features": features})
}
