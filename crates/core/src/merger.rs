//! Result merging and property sanitization.
//!
//! Records from every expression of one jurisdiction flow through a
//! [`ResultMerger`] in expression order, so the first record seen for a
//! [`DedupKey`] wins. [`ResultMerger::finish`] then sanitizes the survivors:
//!
//! | Step | Effect |
//! |------|--------|
//! | Stringify | identifier attributes become strings (`13.0` → `"13"`) |
//! | Trim | every string attribute is trimmed |
//! | Plan codes | plan-bearing attributes are uppercased without whitespace |
//! | Synthesize | `lotidstring` and `label` are derived when absent |
//! | Strip | object ids and shape area/length bookkeeping are removed |
//! | Provenance | `source` and `state` are added |
//!
//! [`combine`] concatenates jurisdictions in NSW, QLD, SA order. Duplicates
//! across jurisdictions are kept, distinguished by their provenance tags.

use std::collections::HashSet;

use serde_json::{Number, Value};

use crate::diagnostics::Diagnostic;
use crate::feature::{DedupKey, Feature, FeatureCollection, KeyedFeature, Properties};
use crate::jurisdiction::Jurisdiction;

const IDENTIFIER_ATTRIBUTES: &[&str] = &[
    "lotnumber",
    "sectionnumber",
    "planlabel",
    "lotidstring",
    "lot",
    "plan",
    "lotplan",
    "parcel",
    "volume",
    "folio",
    "section",
    "planparcel",
    "plannumber",
];

const PLAN_ATTRIBUTES: &[&str] = &["planlabel", "plan", "lotidstring", "lotplan"];

const BOOKKEEPING_ATTRIBUTES: &[&str] = &[
    "objectid",
    "fid",
    "globalid",
    "shape_area",
    "shape_length",
    "shape__area",
    "shape__length",
    "st_area(shape)",
    "st_length(shape)",
];

/// Per-jurisdiction first-seen-wins deduplicator.
#[derive(Debug)]
pub struct ResultMerger {
    jurisdiction: Jurisdiction,
    seen: HashSet<DedupKey>,
    features: Vec<Feature>,
    duplicates: usize,
}

impl ResultMerger {
    pub fn new(jurisdiction: Jurisdiction) -> Self {
        Self {
            jurisdiction,
            seen: HashSet::new(),
            features: Vec::new(),
            duplicates: 0,
        }
    }

    /// Adds a feature unless its key was already seen. Returns true if kept.
    pub fn push(&mut self, keyed: KeyedFeature) -> bool {
        if let Some(key) = keyed.key {
            if !self.seen.insert(key) {
                self.duplicates += 1;
                return false;
            }
        }
        self.features.push(keyed.feature);
        true
    }

    pub fn extend(&mut self, features: impl IntoIterator<Item = KeyedFeature>) {
        for feature in features {
            self.push(feature);
        }
    }

    /// Number of features dropped as duplicates so far.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sanitizes and returns the kept features in arrival order.
    pub fn finish(self) -> Vec<Feature> {
        let jurisdiction = self.jurisdiction;
        self.features
            .into_iter()
            .map(|mut feature| {
                sanitize(&mut feature.properties, jurisdiction);
                feature
            })
            .collect()
    }
}

/// Concatenates per-jurisdiction results in [`Jurisdiction::ALL`] order and
/// truncates to `max_records`.
///
/// Returns a warning diagnostic when truncation happened.
pub fn combine(
    mut results: Vec<(Jurisdiction, Vec<Feature>)>,
    max_records: usize,
) -> (FeatureCollection, Option<Diagnostic>) {
    results.sort_by_key(|(jurisdiction, _)| *jurisdiction);

    let mut features: Vec<Feature> = results
        .into_iter()
        .flat_map(|(_, features)| features)
        .collect();

    let total = features.len();
    if total <= max_records {
        return (FeatureCollection::new(features), None);
    }

    features.truncate(max_records);
    let diagnostic = Diagnostic::warning(format!(
        "result truncated to {max_records} of {total} feature(s)"
    ));
    (FeatureCollection::new(features), Some(diagnostic))
}

/// Normalizes a feature's properties in place.
pub fn sanitize(properties: &mut Properties, jurisdiction: Jurisdiction) {
    properties.retain(|name, _| !is_bookkeeping(name));
    normalize_values(properties);

    if attribute(properties, "lotidstring").is_none() {
        if let Some(lotidstring) = lotidstring_from_parts(properties) {
            properties.insert("lotidstring".to_string(), Value::String(lotidstring));
        }
    }

    if attribute(properties, "label").is_none() {
        if let Some(label) = derive_label(properties) {
            properties.insert("label".to_string(), Value::String(label));
        }
    }

    properties.insert(
        "source".to_string(),
        Value::String(jurisdiction.source_tag().to_string()),
    );
    properties.insert(
        "state".to_string(),
        Value::String(jurisdiction.as_str().to_string()),
    );
}

/// Identifier synthesized from lot/plan parts or volume/folio, as the
/// sanitized feature would carry it in `lotidstring` or `label`.
pub(crate) fn identifier_from_parts(properties: &Properties) -> Option<String> {
    let mut normalized = properties.clone();
    normalize_values(&mut normalized);
    lotidstring_from_parts(&normalized).or_else(|| derive_label(&normalized))
}

/// Stringifies identifier numbers, cleans plan codes and trims strings.
fn normalize_values(properties: &mut Properties) {
    for (name, value) in properties.iter_mut() {
        let lower = name.to_ascii_lowercase();

        if IDENTIFIER_ATTRIBUTES.contains(&lower.as_str()) {
            if let Value::Number(n) = value {
                *value = Value::String(number_to_string(n));
            }
        }

        if let Value::String(s) = value {
            *s = if PLAN_ATTRIBUTES.contains(&lower.as_str()) {
                s.chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_uppercase()
            } else {
                s.trim().to_string()
            };
        }
    }
}

fn is_bookkeeping(name: &str) -> bool {
    BOOKKEEPING_ATTRIBUTES
        .iter()
        .any(|field| field.eq_ignore_ascii_case(name))
}

fn number_to_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Non-empty string attribute, matched case-insensitively.
fn attribute<'a>(properties: &'a Properties, name: &str) -> Option<&'a str> {
    properties
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
        .filter(|s| !s.is_empty())
}

fn first_attribute<'a>(properties: &'a Properties, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| attribute(properties, name))
}

fn lotidstring_from_parts(properties: &Properties) -> Option<String> {
    let lot = first_attribute(properties, &["lotnumber", "lot", "parcel"])?;
    let plan = first_attribute(properties, &["planlabel", "plan"])?;
    let lot = lot.to_uppercase();
    Some(match first_attribute(properties, &["sectionnumber", "section"]) {
        Some(section) => format!("{lot}/{}/{plan}", section.to_uppercase()),
        None => format!("{lot}//{plan}"),
    })
}

fn derive_label(properties: &Properties) -> Option<String> {
    if let Some(id) = first_attribute(properties, &["lotidstring", "lotplan"]) {
        return Some(id.to_string());
    }
    let volume = attribute(properties, "volume")?;
    let folio = attribute(properties, "folio")?;
    Some(format!("{volume}/{folio}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use serde_json::json;

    fn feature(properties: Value) -> Feature {
        Feature::new(
            Geometry::Point(vec![0.0, 0.0]),
            properties.as_object().cloned().unwrap(),
        )
    }

    fn keyed(key: &str, properties: Value) -> KeyedFeature {
        KeyedFeature {
            key: Some(DedupKey::ObjectId(key.to_string())),
            feature: feature(properties),
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let mut merger = ResultMerger::new(Jurisdiction::Nsw);
        assert!(merger.push(keyed("1", json!({"chunk": "first"}))));
        assert!(merger.push(keyed("2", json!({"chunk": "first"}))));
        assert!(!merger.push(keyed("1", json!({"chunk": "second"}))));
        assert_eq!(merger.duplicates(), 1);

        let features = merger.finish();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].property_str("chunk"), Some("first"));
    }

    #[test]
    fn test_unkeyed_features_are_kept() {
        let mut merger = ResultMerger::new(Jurisdiction::Sa);
        let unkeyed = KeyedFeature {
            key: None,
            feature: feature(json!({})),
        };
        merger.extend([unkeyed.clone(), unkeyed]);
        assert_eq!(merger.len(), 2);
    }

    #[test]
    fn test_records_without_object_id_collapse_on_lot_plan() {
        let mut merger = ResultMerger::new(Jurisdiction::Nsw);
        for properties in [
            json!({"lotnumber": 13, "planlabel": "DP1242624", "chunk": "first"}),
            json!({"lotnumber": "13", "planlabel": "dp 1242624", "chunk": "second"}),
        ] {
            let properties = properties.as_object().cloned().unwrap();
            let key = DedupKey::derive(&properties, None, None);
            merger.push(KeyedFeature {
                key,
                feature: Feature::new(Geometry::Point(vec![0.0, 0.0]), properties),
            });
        }

        assert_eq!(merger.duplicates(), 1);
        let features = merger.finish();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].property_str("chunk"), Some("first"));
        assert_eq!(features[0].property_str("lotidstring"), Some("13//DP1242624"));
    }

    #[test]
    fn test_sanitize_nsw_record() {
        let mut properties = json!({
            "objectid": 9,
            "Shape__Area": 12.5,
            "st_length(shape)": 4.0,
            "lotnumber": 13.0,
            "sectionnumber": null,
            "planlabel": " dp 1242624",
            "lotidstring": "13//DP1242624",
            "address": "  1 Main St  "
        })
        .as_object()
        .cloned()
        .unwrap();

        sanitize(&mut properties, Jurisdiction::Nsw);

        assert_eq!(
            Value::Object(properties),
            json!({
                "lotnumber": "13",
                "sectionnumber": null,
                "planlabel": "DP1242624",
                "lotidstring": "13//DP1242624",
                "address": "1 Main St",
                "label": "13//DP1242624",
                "source": "NSW_Cadastre",
                "state": "NSW"
            })
        );
    }

    #[test]
    fn test_synthesizes_lotidstring_and_label() {
        let mut properties = json!({"lotnumber": 7, "sectionnumber": "b", "planlabel": "dp55"})
            .as_object()
            .cloned()
            .unwrap();
        sanitize(&mut properties, Jurisdiction::Nsw);
        assert_eq!(properties["lotidstring"], json!("7/B/DP55"));
        assert_eq!(properties["label"], json!("7/B/DP55"));

        let mut properties =
            json!({"parcel": "A12", "plan": "D1234", "volume": 5100, "folio": 123.0})
                .as_object()
                .cloned()
                .unwrap();
        sanitize(&mut properties, Jurisdiction::Sa);
        assert_eq!(properties["lotidstring"], json!("A12//D1234"));
        assert_eq!(properties["volume"], json!("5100"));
        assert_eq!(properties["folio"], json!("123"));
        assert_eq!(properties["state"], json!("SA"));

        let mut properties = json!({"volume": "5100", "folio": "123"})
            .as_object()
            .cloned()
            .unwrap();
        sanitize(&mut properties, Jurisdiction::Sa);
        assert_eq!(properties["label"], json!("5100/123"));
    }

    #[test]
    fn test_existing_label_kept() {
        let mut properties = json!({"lotplan": "1RP912949", "label": " Lot 1 "})
            .as_object()
            .cloned()
            .unwrap();
        sanitize(&mut properties, Jurisdiction::Qld);
        assert_eq!(properties["label"], json!("Lot 1"));
        assert_eq!(properties["source"], json!("QLD_LPPF"));
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(&Number::from(13)), "13");
        assert_eq!(number_to_string(&Number::from_f64(13.0).unwrap()), "13");
        assert_eq!(number_to_string(&Number::from_f64(13.5).unwrap()), "13.5");
    }

    #[test]
    fn test_combine_orders_and_truncates() {
        let results = vec![
            (Jurisdiction::Sa, vec![feature(json!({"n": 3}))]),
            (Jurisdiction::Nsw, vec![feature(json!({"n": 1})), feature(json!({"n": 2}))]),
        ];

        let (collection, diagnostic) = combine(results.clone(), 10);
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.features[0].properties["n"], json!(1));
        assert_eq!(collection.features[2].properties["n"], json!(3));
        assert!(diagnostic.is_none());

        let (collection, diagnostic) = combine(results, 2);
        assert_eq!(collection.len(), 2);
        assert_eq!(
            diagnostic.map(|d| d.message),
            Some("result truncated to 2 of 3 feature(s)".to_string())
        );
    }
}
