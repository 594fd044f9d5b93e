//! Execution strategies for one filter expression.
//!
//! | Strategy | Requests per expression |
//! |----------|-------------------------|
//! | [`DirectFetch`] | one filtered query returning geometry and attributes |
//! | [`ResolveThenFetch`] | count, ids, then one query per id batch |
//!
//! Both send every request through the same retry wrapper.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::{FetchMode, JurisdictionConfig, OutputFormat, RetryConfig};
use crate::diagnostics::Diagnostic;
use crate::error::{ChunkError, TransportResult};
use crate::feature::KeyedFeature;
use crate::jurisdiction::Jurisdiction;
use crate::query::FilterExpression;
use crate::transport::{FeatureTransport, QueryRequest};

use super::response::{
    CountResponse, EsriFeatureSet, GeoJsonFeatureSet, IdsResponse, RecordBatch,
    check_service_error, decode,
};
use super::retry::with_retry;

/// Shared, read-only state for executing one jurisdiction's expressions.
pub struct QueryContext<'a> {
    pub jurisdiction: Jurisdiction,
    pub config: &'a JurisdictionConfig,
    pub retry: &'a RetryConfig,
    pub max_records: usize,
    pub transport: &'a dyn FeatureTransport,
}

impl QueryContext<'_> {
    /// Sends `request` with retries, attributing failures to `expression`.
    async fn send(
        &self,
        expression: &FilterExpression,
        request: QueryRequest,
    ) -> Result<Value, ChunkError> {
        with_retry(self.retry, || self.attempt(&request))
            .await
            .map_err(|failure| ChunkError {
                jurisdiction: self.jurisdiction,
                expression: expression.to_string(),
                attempts: failure.attempts,
                source: failure.error,
            })
    }

    async fn attempt(&self, request: &QueryRequest) -> TransportResult<Value> {
        let body = self.transport.query(request).await?;
        check_service_error(body)
    }

    fn request(&self) -> QueryRequest {
        QueryRequest::new(&self.config.layer_url)
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &self,
        expression: &FilterExpression,
        body: Value,
    ) -> Result<T, ChunkError> {
        decode(body).map_err(|source| ChunkError {
            jurisdiction: self.jurisdiction,
            expression: expression.to_string(),
            attempts: 1,
            source,
        })
    }
}

/// Result of one executed expression.
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    pub features: Vec<KeyedFeature>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when a later request failed after some records were already fetched.
    pub failure: Option<ChunkError>,
}

impl ChunkOutcome {
    fn absorb(
        &mut self,
        ctx: &QueryContext<'_>,
        expression: &FilterExpression,
        batch: RecordBatch,
    ) {
        if batch.dropped > 0 {
            debug!(
                jurisdiction = %ctx.jurisdiction,
                dropped = batch.dropped,
                "Dropped records without usable geometry"
            );
            self.diagnostics.push(
                Diagnostic::info(format!(
                    "{} record(s) without usable geometry dropped",
                    batch.dropped
                ))
                .with_jurisdiction(ctx.jurisdiction)
                .with_expression(expression.as_str()),
            );
        }
        if batch.exceeded_transfer_limit {
            debug!(
                jurisdiction = %ctx.jurisdiction,
                max_records = ctx.max_records,
                "Service truncated the response at its transfer limit"
            );
            self.diagnostics.push(
                Diagnostic::info("transfer limit exceeded; the service truncated this response")
                    .with_jurisdiction(ctx.jurisdiction)
                    .with_expression(expression.as_str()),
            );
        }
        self.features.extend(batch.features);
    }
}

/// Executes one filter expression.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        ctx: &QueryContext<'_>,
        expression: &FilterExpression,
    ) -> Result<ChunkOutcome, ChunkError>;
}

/// Returns the strategy for `mode`.
pub fn strategy_for(mode: FetchMode) -> Box<dyn FetchStrategy> {
    match mode {
        FetchMode::Direct => Box::new(DirectFetch),
        FetchMode::ResolveThenFetch => Box::new(ResolveThenFetch),
    }
}

/// One filtered query per expression, capped at `max_records`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectFetch;

#[async_trait]
impl FetchStrategy for DirectFetch {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(
        &self,
        ctx: &QueryContext<'_>,
        expression: &FilterExpression,
    ) -> Result<ChunkOutcome, ChunkError> {
        let format = ctx.config.output_format;
        let request = ctx
            .request()
            .param("where", expression.as_str())
            .param("outFields", "*")
            .param("returnGeometry", "true")
            .param("outSR", ctx.config.out_sr)
            .param("resultRecordCount", ctx.max_records)
            .param("f", format.as_param());

        let body = ctx.send(expression, request).await?;
        let batch = match format {
            OutputFormat::Json => ctx
                .decode::<EsriFeatureSet>(expression, body)?
                .into_batch(None),
            OutputFormat::Geojson => ctx
                .decode::<GeoJsonFeatureSet>(expression, body)?
                .into_batch(),
        };

        debug!(
            jurisdiction = %ctx.jurisdiction,
            records = batch.features.len(),
            "Direct query completed"
        );

        let mut outcome = ChunkOutcome::default();
        outcome.diagnostics.push(
            Diagnostic::info(format!("{} record(s) returned", batch.features.len()))
                .with_jurisdiction(ctx.jurisdiction)
                .with_expression(expression.as_str()),
        );
        outcome.absorb(ctx, expression, batch);
        Ok(outcome)
    }
}

/// Count, resolve object ids, then fetch records by id in `max_records` batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveThenFetch;

#[async_trait]
impl FetchStrategy for ResolveThenFetch {
    fn name(&self) -> &'static str {
        "resolve_then_fetch"
    }

    async fn fetch(
        &self,
        ctx: &QueryContext<'_>,
        expression: &FilterExpression,
    ) -> Result<ChunkOutcome, ChunkError> {
        let mut outcome = ChunkOutcome::default();

        let count_request = ctx
            .request()
            .param("where", expression.as_str())
            .param("returnCountOnly", "true")
            .param("f", "json");
        let count: CountResponse =
            ctx.decode(expression, ctx.send(expression, count_request).await?)?;

        debug!(jurisdiction = %ctx.jurisdiction, count = count.count, "Count query completed");
        outcome.diagnostics.push(
            Diagnostic::info(format!("{} record(s) matched", count.count))
                .with_jurisdiction(ctx.jurisdiction)
                .with_expression(expression.as_str()),
        );
        if count.count == 0 {
            return Ok(outcome);
        }

        let ids_request = ctx
            .request()
            .param("where", expression.as_str())
            .param("returnIdsOnly", "true")
            .param("f", "json");
        let ids: IdsResponse = ctx.decode(expression, ctx.send(expression, ids_request).await?)?;
        let object_ids = ids.ids();
        let object_id_field = ids.object_id_field_name.as_deref();

        debug!(
            jurisdiction = %ctx.jurisdiction,
            ids = object_ids.len(),
            object_id_field = object_id_field.unwrap_or("-"),
            "Resolved object ids"
        );

        for batch_ids in object_ids.chunks(ctx.max_records.max(1)) {
            let fetch_request = ctx
                .request()
                .param("objectIds", batch_ids.join(","))
                .param("outFields", "*")
                .param("returnGeometry", "true")
                .param("outSR", ctx.config.out_sr)
                .param("f", "json");
            let fetched = match ctx.send(expression, fetch_request).await {
                Ok(body) => ctx.decode::<EsriFeatureSet>(expression, body),
                Err(err) => Err(err),
            };
            match fetched {
                Ok(set) => outcome.absorb(ctx, expression, set.into_batch(object_id_field)),
                Err(err) => {
                    // earlier batches stay in the outcome
                    debug!(
                        jurisdiction = %ctx.jurisdiction,
                        kept = outcome.features.len(),
                        "Id batch failed, keeping records already fetched"
                    );
                    outcome.failure = Some(err);
                    break;
                }
            }
        }

        Ok(outcome)
    }
}
