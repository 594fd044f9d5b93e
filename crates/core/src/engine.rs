//! The parcel search facade.
//!
//! [`ParcelSearch`] wires the parser, the per-jurisdiction query builders, the
//! executor and the merger together. It is constructed once from an
//! [`EngineConfig`] and is stateless between searches.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostic;
use crate::error::{ChunkError, ConfigResult};
use crate::executor::QueryExecutor;
use crate::feature::FeatureCollection;
use crate::identifier::{IdentifierEntry, parse_entries};
use crate::jurisdiction::Jurisdiction;
use crate::merger::combine;
use crate::query::{FilterExpression, builder_for};
use crate::transport::{FeatureTransport, ReqwestTransport};

/// One bulk lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Free text containing one or more identifiers.
    pub text: String,
    /// Jurisdictions to query.
    pub jurisdictions: Vec<Jurisdiction>,
    /// Overrides the configured record cap for this search.
    pub max_records: Option<usize>,
}

impl SearchRequest {
    /// A request against every jurisdiction.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            jurisdictions: Jurisdiction::ALL.to_vec(),
            max_records: None,
        }
    }

    pub fn with_jurisdictions(
        mut self,
        jurisdictions: impl IntoIterator<Item = Jurisdiction>,
    ) -> Self {
        self.jurisdictions = jurisdictions.into_iter().collect();
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    fn enabled(&self) -> Vec<Jurisdiction> {
        Jurisdiction::ALL
            .into_iter()
            .filter(|j| self.jurisdictions.contains(j))
            .collect()
    }
}

/// Result of a search. Partial upstream failures are reported, never raised.
#[derive(Debug)]
pub struct SearchOutcome {
    pub collection: FeatureCollection,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<ChunkError>,
    /// Parsed identifier entries, including unknown tokens.
    pub entries: Vec<IdentifierEntry>,
    /// False if the deadline cut the search short.
    pub complete: bool,
}

impl SearchOutcome {
    fn empty(entries: Vec<IdentifierEntry>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            collection: FeatureCollection::default(),
            diagnostics,
            failures: Vec::new(),
            entries,
            complete: true,
        }
    }
}

/// Federated cadastral parcel search.
pub struct ParcelSearch {
    config: EngineConfig,
    executor: QueryExecutor,
}

impl ParcelSearch {
    /// Creates a search engine that talks HTTP through `reqwest`.
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.http)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a search engine with an injected transport.
    pub fn with_transport(
        config: EngineConfig,
        transport: Arc<dyn FeatureTransport>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let executor = QueryExecutor::new(transport, &config);
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses `request.text`, queries every enabled jurisdiction in parallel
    /// and merges the results.
    pub async fn search(&self, request: &SearchRequest) -> SearchOutcome {
        let started = Instant::now();
        let entries = parse_entries(&request.text);
        let mut diagnostics = Vec::new();

        for entry in entries.iter().filter(|e| !e.is_parsable()) {
            diagnostics.push(Diagnostic::warning(format!(
                "unrecognised identifier '{entry}'"
            )));
        }

        let parsable: Vec<IdentifierEntry> =
            entries.iter().filter(|e| e.is_parsable()).cloned().collect();
        if parsable.is_empty() {
            diagnostics.push(Diagnostic::warning("no parsable identifiers"));
            return SearchOutcome::empty(entries, diagnostics);
        }

        let enabled = request.enabled();
        if enabled.is_empty() {
            diagnostics.push(Diagnostic::warning("no jurisdictions enabled"));
            return SearchOutcome::empty(entries, diagnostics);
        }

        for entry in &parsable {
            if !enabled.iter().any(|j| j.accepts(entry)) {
                diagnostics.push(Diagnostic::warning(format!(
                    "'{entry}' ({}) is not handled by any enabled jurisdiction",
                    entry.kind()
                )));
            }
        }

        let plans: Vec<(Jurisdiction, Vec<FilterExpression>)> = enabled
            .iter()
            .map(|&jurisdiction| {
                let builder = builder_for(jurisdiction, self.config.jurisdiction(jurisdiction));
                let expressions = builder.build(&parsable);
                let ids: usize = expressions.iter().map(|e| e.ids().len()).sum();
                debug!(
                    jurisdiction = %jurisdiction,
                    ids = ids,
                    expressions = expressions.len(),
                    "Built filter expressions"
                );
                if ids > 0 {
                    diagnostics.push(
                        Diagnostic::info(format!(
                            "{ids} identifier(s) in {} expression(s)",
                            expressions.len()
                        ))
                        .with_jurisdiction(jurisdiction),
                    );
                }
                (jurisdiction, expressions)
            })
            .collect();

        let max_records = request.max_records.unwrap_or(self.config.max_records).max(1);
        let executor = self.executor.with_max_records(max_records);
        let deadline = self.config.deadline().map(|d| started + d);

        let results = join_all(plans.iter().map(|(jurisdiction, expressions)| {
            executor.run(
                *jurisdiction,
                self.config.jurisdiction(*jurisdiction),
                expressions,
                deadline,
            )
        }))
        .await;

        let mut failures = Vec::new();
        let mut complete = true;
        let mut per_jurisdiction = Vec::new();
        for result in results {
            complete &= result.completed;
            diagnostics.extend(result.diagnostics);
            failures.extend(result.failures);
            per_jurisdiction.push((result.jurisdiction, result.features));
        }

        let (collection, truncation) = combine(per_jurisdiction, max_records);
        if let Some(truncation) = truncation {
            warn!(max_records = max_records, "Merged result truncated");
            diagnostics.push(truncation);
        }
        if collection.is_empty() && failures.is_empty() && complete {
            diagnostics.push(Diagnostic::info("no matching parcels found"));
        }

        info!(
            features = collection.len(),
            failures = failures.len(),
            complete = complete,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Parcel search completed"
        );

        SearchOutcome {
            collection,
            diagnostics,
            failures,
            entries,
            complete,
        }
    }
}
