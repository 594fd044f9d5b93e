//! End-to-end searches against a fake feature service.

mod common;

use std::sync::Arc;

use common::fixtures::{count, esri_set, geojson_set, ids, nsw_record, qld_feature};
use common::transport::{MockTransport, Reply};
use parcelkit_core::{
    DiagnosticLevel, EngineConfig, FetchMode, IdentifierEntry, Jurisdiction, JurisdictionConfig,
    OutputFormat, ParcelSearch, SearchRequest, TransportError,
};
use serde_json::json;

fn nsw_url() -> &'static str {
    Jurisdiction::Nsw.default_layer_url()
}

fn qld_url() -> &'static str {
    Jurisdiction::Qld.default_layer_url()
}

fn sa_url() -> &'static str {
    Jurisdiction::Sa.default_layer_url()
}

fn unavailable() -> TransportError {
    TransportError::Status {
        status: 503,
        body: "Service Unavailable".to_string(),
    }
}

fn search_with(config: EngineConfig, transport: &MockTransport) -> ParcelSearch {
    ParcelSearch::with_transport(config, Arc::new(transport.clone()))
        .expect("valid configuration")
}

#[tokio::test(start_paused = true)]
async fn test_mixed_nsw_qld_search_with_retry() {
    let transport = MockTransport::new();
    transport
        .fail(nsw_url(), unavailable())
        .body(nsw_url(), count(1))
        .body(nsw_url(), ids(&[7]))
        .body(
            nsw_url(),
            esri_set(vec![nsw_record(7, "13", "DP1242624")]),
        );
    transport.body(qld_url(), geojson_set(vec![qld_feature(55, "1RP912949")]));

    let search = search_with(EngineConfig::default(), &transport);
    let request = SearchRequest::new("13//DP1242624, 1RP912949")
        .with_jurisdictions([Jurisdiction::Nsw, Jurisdiction::Qld]);
    let outcome = search.search(&request).await;

    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(
        outcome.entries[0],
        IdentifierEntry::LotPlan {
            lot: "13".to_string(),
            plan: "DP1242624".to_string(),
        }
    );
    assert_eq!(outcome.entries[1].kind(), "lotplan");

    let nsw = transport.requests_to(nsw_url());
    assert_eq!(nsw.len(), 4, "503 once, then count, ids and fetch");
    assert_eq!(
        nsw[0].get("where"),
        Some("UPPER(lotidstring) IN ('13//DP1242624')")
    );
    assert_eq!(nsw[0].get("returnCountOnly"), Some("true"));
    assert_eq!(nsw[1].get("returnCountOnly"), Some("true"));
    assert_eq!(nsw[2].get("returnIdsOnly"), Some("true"));
    assert_eq!(nsw[3].get("objectIds"), Some("7"));

    let qld = transport.requests_to(qld_url());
    assert_eq!(qld.len(), 1);
    assert_eq!(qld[0].get("where"), Some("UPPER(lotidstring) IN ('1RP912949')"));
    assert_eq!(qld[0].get("f"), Some("geojson"));
    assert_eq!(qld[0].get("resultRecordCount"), Some("2000"));

    assert!(transport.requests_to(sa_url()).is_empty());
    assert_eq!(transport.pending(), 0);

    assert!(outcome.complete);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.collection.len(), 2);

    let nsw_feature = &outcome.collection.features[0];
    assert_eq!(nsw_feature.geometry.type_name(), "Polygon");
    assert_eq!(nsw_feature.property_str("state"), Some("NSW"));
    assert_eq!(nsw_feature.property_str("source"), Some("NSW_Cadastre"));
    assert_eq!(nsw_feature.property_str("label"), Some("13//DP1242624"));
    assert!(!nsw_feature.properties.contains_key("objectid"));
    assert!(!nsw_feature.properties.contains_key("shape_Area"));

    let qld_feature = &outcome.collection.features[1];
    assert_eq!(qld_feature.property_str("state"), Some("QLD"));
    assert_eq!(qld_feature.property_str("lot"), Some("1"));
    assert_eq!(qld_feature.property_str("locality"), Some("BRISBANE CITY"));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_do_not_fail_other_jurisdictions() {
    let transport = MockTransport::new();
    for _ in 0..4 {
        transport.fail(nsw_url(), unavailable());
    }
    transport.body(qld_url(), geojson_set(vec![qld_feature(55, "1RP912949")]));

    let search = search_with(EngineConfig::default(), &transport);
    let outcome = search
        .search(
            &SearchRequest::new("1//SP12345\n1RP912949")
                .with_jurisdictions([Jurisdiction::Nsw, Jurisdiction::Qld]),
        )
        .await;

    assert_eq!(transport.requests_to(nsw_url()).len(), 4);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].jurisdiction, Jurisdiction::Nsw);
    assert_eq!(outcome.failures[0].attempts, 4);
    assert_eq!(
        outcome.failures[0].expression,
        "UPPER(lotidstring) IN ('1//SP12345')"
    );

    let error = outcome
        .diagnostics
        .iter()
        .find(|d| d.level == DiagnosticLevel::Error)
        .expect("chunk failure diagnostic");
    assert_eq!(error.jurisdiction, Some(Jurisdiction::Nsw));
    assert_eq!(
        error.expression.as_deref(),
        Some("UPPER(lotidstring) IN ('1//SP12345')")
    );

    // SP is a Queensland plan type too, so QLD receives both entries
    assert_eq!(
        transport.requests_to(qld_url())[0].get("where"),
        Some("UPPER(lotidstring) IN ('1RP912949', '1SP12345')")
    );
    assert_eq!(outcome.collection.len(), 1);
    assert_eq!(
        outcome.collection.features[0].property_str("source"),
        Some("QLD_LPPF")
    );
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_chunks_keep_first_attributes() {
    let transport = MockTransport::new();
    let mut first = nsw_record(7, "1", "DP1");
    first["attributes"]["note"] = json!("first chunk");
    let mut second = nsw_record(7, "1", "DP1");
    second["attributes"]["note"] = json!("second chunk");
    transport
        .body(nsw_url(), esri_set(vec![first]))
        .body(nsw_url(), esri_set(vec![second, nsw_record(8, "2", "DP1")]));

    let mut config = EngineConfig {
        concurrency: 1,
        ..Default::default()
    };
    config.nsw = JurisdictionConfig {
        chunk_size: 1,
        strategy: FetchMode::Direct,
        output_format: OutputFormat::Json,
        ..JurisdictionConfig::defaults_for(Jurisdiction::Nsw)
    };

    let search = search_with(config, &transport);
    let outcome = search
        .search(&SearchRequest::new("1//DP1, 2//DP1").with_jurisdictions([Jurisdiction::Nsw]))
        .await;

    assert_eq!(transport.requests_to(nsw_url()).len(), 2);
    assert_eq!(outcome.collection.len(), 2);
    assert_eq!(
        outcome.collection.features[0].property_str("note"),
        Some("first chunk")
    );
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.message == "1 duplicate record(s) removed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_keeps_collected_features() {
    let transport = MockTransport::new();
    transport.push(nsw_url(), Reply::Hang);
    transport.body(qld_url(), geojson_set(vec![qld_feature(55, "1RP912949")]));

    let config = EngineConfig {
        deadline_ms: Some(10_000),
        ..Default::default()
    };
    let search = search_with(config, &transport);
    let outcome = search
        .search(
            &SearchRequest::new("13//DP1242624\n1RP912949")
                .with_jurisdictions([Jurisdiction::Nsw, Jurisdiction::Qld]),
        )
        .await;

    assert!(!outcome.complete);
    assert_eq!(outcome.collection.len(), 1);
    assert!(outcome.diagnostics.iter().any(|d| {
        d.jurisdiction == Some(Jurisdiction::Nsw)
            && d.level == DiagnosticLevel::Warning
            && d.message.contains("deadline expired")
    }));
}

#[tokio::test(start_paused = true)]
async fn test_sa_title_reference_with_service_error() {
    let transport = MockTransport::new();
    transport.body(
        sa_url(),
        json!({"error": {"code": 400, "message": "Invalid query", "details": []}}),
    );

    let search = search_with(EngineConfig::default(), &transport);
    let outcome = search
        .search(&SearchRequest::new("5100/123").with_jurisdictions([Jurisdiction::Sa]))
        .await;

    let requests = transport.requests_to(sa_url());
    assert_eq!(requests.len(), 1, "client-side service errors are not retried");
    assert_eq!(
        requests[0].get("where"),
        Some("(volume='5100' AND folio='123')")
    );
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(
        outcome.failures[0].source,
        TransportError::Service {
            code: 400,
            message: "Invalid query".to_string(),
        }
    );
    assert!(outcome.collection.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_input_sends_nothing() {
    let transport = MockTransport::new();
    let search = search_with(EngineConfig::default(), &transport);

    let outcome = search.search(&SearchRequest::new("")).await;

    assert!(transport.requests().is_empty());
    assert!(outcome.collection.is_empty());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].message, "no parsable identifiers");
    assert_eq!(
        serde_json::to_value(&outcome.collection).unwrap(),
        json!({"type": "FeatureCollection", "features": []})
    );
}
