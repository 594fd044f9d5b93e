//! Parcelkit core: federated cadastral parcel lookup.
//!
//! This crate resolves free-text land parcel identifiers, such as NSW
//! `LOT//PLAN`, Queensland lotplans or South Australian title references,
//! against the public ArcGIS feature services of each state and returns the
//! matching parcel geometries as a single GeoJSON feature collection.
//!
//! # Pipeline
//!
//! ```text
//! raw text ─▶ identifier ─▶ query ─▶ executor ─▶ geometry ─▶ merger ─▶ FeatureCollection
//!             (parse)       (chunk)  (retry)     (Esri→GeoJSON) (dedup, sanitize)
//! ```
//!
//! # Architecture
//!
//! - [`identifier`] - Identifier parsing, normalization and lot range expansion
//! - [`jurisdiction`] - Jurisdictions, entry routing and provenance tags
//! - [`query`] - Per-jurisdiction `where` clause builders with chunking
//! - [`transport`] - The [`FeatureTransport`] seam and its `reqwest` implementation
//! - [`executor`] - Direct and resolve-then-fetch strategies with retry and a bounded pool
//! - [`geometry`] - Esri JSON to GeoJSON geometry translation
//! - [`merger`] - Deduplication and property sanitization
//! - [`engine`] - The [`ParcelSearch`] facade
//!
//! # Errors
//!
//! Only invalid configuration is an error. Upstream failures are isolated to
//! the filter expression that caused them and reported in
//! [`SearchOutcome::failures`] and [`SearchOutcome::diagnostics`].
//!
//! # Quick Start
//!
//! ```no_run
//! use parcelkit_core::{EngineConfig, Jurisdiction, ParcelSearch, SearchRequest};
//!
//! # async fn run() -> Result<(), parcelkit_core::ConfigError> {
//! let search = ParcelSearch::new(EngineConfig::default())?;
//!
//! let request = SearchRequest::new("13//DP1242624, 1RP912949")
//!     .with_jurisdictions([Jurisdiction::Nsw, Jurisdiction::Qld]);
//! let outcome = search.search(&request).await;
//!
//! for diagnostic in &outcome.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! println!("{}", serde_json::to_string(&outcome.collection).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod executor;
pub mod feature;
pub mod geometry;
pub mod identifier;
pub mod jurisdiction;
pub mod merger;
pub mod query;
pub mod transport;

pub use config::{
    EngineConfig, FetchMode, HttpConfig, JurisdictionConfig, OutputFormat, RetryConfig,
};
pub use diagnostics::{Diagnostic, DiagnosticLevel};
pub use engine::{ParcelSearch, SearchOutcome, SearchRequest};
pub use error::{ChunkError, ConfigError, ConfigResult, TransportError, TransportResult};
pub use feature::{DedupKey, Feature, FeatureCollection};
pub use geometry::{EsriGeometry, Geometry};
pub use identifier::{IdentifierEntry, parse_entries};
pub use jurisdiction::Jurisdiction;
pub use transport::{FeatureTransport, QueryRequest, ReqwestTransport};
