//! Executes a jurisdiction's filter expressions against its feature service.
//!
//! Expressions are dispatched through a bounded pool of `concurrency`
//! in-flight requests. Results are consumed in expression order regardless of
//! completion order, so deduplication is deterministic: the first expression
//! containing a key wins.
//!
//! A failed expression never aborts the others. It is reported as a
//! [`ChunkError`] and a diagnostic, and the remaining expressions carry on.

mod response;
mod retry;
mod strategy;

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

pub use strategy::{
    ChunkOutcome, DirectFetch, FetchStrategy, QueryContext, ResolveThenFetch, strategy_for,
};

use crate::config::{EngineConfig, JurisdictionConfig, RetryConfig};
use crate::diagnostics::Diagnostic;
use crate::error::ChunkError;
use crate::feature::Feature;
use crate::jurisdiction::Jurisdiction;
use crate::merger::ResultMerger;
use crate::query::FilterExpression;
use crate::transport::FeatureTransport;

/// Everything one jurisdiction produced.
#[derive(Debug)]
pub struct JurisdictionResult {
    pub jurisdiction: Jurisdiction,
    /// Deduplicated, sanitized features in expression order.
    pub features: Vec<Feature>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<ChunkError>,
    /// False if the deadline expired before every expression finished.
    pub completed: bool,
}

/// Runs expressions through a [`FetchStrategy`] with bounded concurrency.
#[derive(Clone)]
pub struct QueryExecutor {
    transport: Arc<dyn FeatureTransport>,
    retry: RetryConfig,
    max_records: usize,
    concurrency: usize,
}

impl QueryExecutor {
    pub fn new(transport: Arc<dyn FeatureTransport>, config: &EngineConfig) -> Self {
        Self {
            transport,
            retry: config.retry.clone(),
            max_records: config.max_records,
            concurrency: config.concurrency,
        }
    }

    /// Returns a copy that requests at most `max_records` records per query.
    pub fn with_max_records(&self, max_records: usize) -> Self {
        Self {
            max_records: max_records.max(1),
            ..self.clone()
        }
    }

    /// Executes `expressions` for `jurisdiction`.
    ///
    /// Match-nothing expressions are skipped without a request. If `deadline`
    /// passes, in-flight requests are dropped and whatever was collected so far
    /// is returned with `completed = false`.
    pub async fn run(
        &self,
        jurisdiction: Jurisdiction,
        config: &JurisdictionConfig,
        expressions: &[FilterExpression],
        deadline: Option<Instant>,
    ) -> JurisdictionResult {
        let mut result = JurisdictionResult {
            jurisdiction,
            features: Vec::new(),
            diagnostics: Vec::new(),
            failures: Vec::new(),
            completed: true,
        };

        let pending: Vec<&FilterExpression> = expressions
            .iter()
            .filter(|expression| !expression.is_match_nothing())
            .collect();
        if pending.is_empty() {
            result
                .diagnostics
                .push(Diagnostic::info("no identifiers to query").with_jurisdiction(jurisdiction));
            return result;
        }

        let strategy = strategy_for(config.strategy);
        let ctx = QueryContext {
            jurisdiction,
            config,
            retry: &self.retry,
            max_records: self.max_records,
            transport: self.transport.as_ref(),
        };

        debug!(
            jurisdiction = %jurisdiction,
            strategy = strategy.name(),
            expressions = pending.len(),
            concurrency = self.concurrency,
            "Executing filter expressions"
        );

        let total = pending.len();
        let mut finished = 0;
        let mut merger = ResultMerger::new(jurisdiction);
        let mut stream = futures::stream::iter(pending)
            .map(|expression| {
                let ctx = &ctx;
                let strategy = strategy.as_ref();
                async move { strategy.fetch(ctx, expression).await }
            })
            .buffered(self.concurrency.max(1));

        loop {
            let next = match deadline {
                Some(deadline) => match timeout_at(deadline, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            jurisdiction = %jurisdiction,
                            finished = finished,
                            total = total,
                            "Deadline expired, returning partial results"
                        );
                        result.completed = false;
                        result.diagnostics.push(
                            Diagnostic::warning(format!(
                                "deadline expired after {finished} of {total} expression(s); results are incomplete"
                            ))
                            .with_jurisdiction(jurisdiction),
                        );
                        break;
                    }
                },
                None => stream.next().await,
            };

            let Some(outcome) = next else {
                break;
            };
            finished += 1;

            let failure = match outcome {
                Ok(outcome) => {
                    merger.extend(outcome.features);
                    result.diagnostics.extend(outcome.diagnostics);
                    outcome.failure
                }
                Err(err) => Some(err),
            };
            if let Some(err) = failure {
                warn!(
                    jurisdiction = %jurisdiction,
                    attempts = err.attempts,
                    error = %err.source,
                    "Filter expression failed"
                );
                result.diagnostics.push(Diagnostic::from(&err));
                result.failures.push(err);
            }
        }

        if merger.duplicates() > 0 {
            result.diagnostics.push(
                Diagnostic::info(format!(
                    "{} duplicate record(s) removed",
                    merger.duplicates()
                ))
                .with_jurisdiction(jurisdiction),
            );
        }

        result.features = merger.finish();
        result
    }
}
