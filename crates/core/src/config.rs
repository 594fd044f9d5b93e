//! Engine configuration.
//!
//! All settings are read-only for the lifetime of a [`crate::ParcelSearch`].
//! Every struct deserializes with per-field defaults, so a partial JSON
//! document (or none at all) yields a working configuration.
//!
//! # Defaults
//!
//! | Setting | Default |
//! |---------|---------|
//! | `max_records` | 2000 |
//! | `concurrency` | 4 (1..=8) |
//! | `deadline_ms` | none |
//! | `http.connect_timeout_ms` | 10000 |
//! | `http.read_timeout_ms` | 90000 |
//! | `retry.max_retries` | 3 |
//! | `retry.initial_delay_ms` | 2000 |
//! | `retry.backoff_multiplier` | 2.0 |
//! | `retry.max_delay_ms` | 8000 |
//!
//! # Example
//!
//! ```rust
//! use parcelkit_core::config::EngineConfig;
//!
//! let config = EngineConfig {
//!     concurrency: 2,
//!     deadline_ms: Some(30_000),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::jurisdiction::Jurisdiction;

/// Upper bound for the per-jurisdiction worker pool.
pub const MAX_CONCURRENCY: usize = 8;

/// Upper bound for `max_records` and `chunk_size`.
const MAX_RECORDS_LIMIT: usize = 100_000;
const MAX_CHUNK_SIZE: usize = 500;

/// How a jurisdiction's expressions are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One filtered request returning geometry and attributes.
    #[default]
    Direct,
    /// Count, then object ids, then records by id in batches.
    ResolveThenFetch,
}

/// Response encoding requested with `f=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Esri JSON, translated locally.
    #[default]
    Json,
    /// GeoJSON produced by the server.
    Geojson,
}

impl OutputFormat {
    /// Value of the `f` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Geojson => "geojson",
        }
    }
}

/// Per-jurisdiction service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    /// Layer `query` endpoint.
    pub layer_url: String,

    /// Maximum identifiers per filter expression.
    pub chunk_size: usize,

    /// Execution strategy.
    #[serde(default)]
    pub strategy: FetchMode,

    /// Response format for the direct strategy. Resolve-then-fetch always uses Esri JSON.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Attribute the builder filters on. For SA this is the parcel column.
    pub id_field: String,

    /// Output spatial reference (WKID).
    #[serde(default = "default_out_sr")]
    pub out_sr: u32,
}

fn default_out_sr() -> u32 {
    4326
}

impl JurisdictionConfig {
    /// Built-in settings for `jurisdiction`.
    pub fn defaults_for(jurisdiction: Jurisdiction) -> Self {
        let (chunk_size, strategy, output_format, id_field) = match jurisdiction {
            Jurisdiction::Nsw => (
                150,
                FetchMode::ResolveThenFetch,
                OutputFormat::Json,
                "lotidstring",
            ),
            Jurisdiction::Qld => (100, FetchMode::Direct, OutputFormat::Geojson, "lotidstring"),
            Jurisdiction::Sa => (80, FetchMode::Direct, OutputFormat::Geojson, "parcel"),
        };

        Self {
            layer_url: jurisdiction.default_layer_url().to_string(),
            chunk_size,
            strategy,
            output_format,
            id_field: id_field.to_string(),
            out_sr: default_out_sr(),
        }
    }

    fn validate(&self, jurisdiction: Jurisdiction) -> ConfigResult<()> {
        let url = Url::parse(&self.layer_url).map_err(|e| ConfigError::InvalidLayerUrl {
            jurisdiction,
            url: self.layer_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidLayerUrl {
                jurisdiction,
                url: self.layer_url.clone(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        check_range(
            &format!("{}.chunk_size", jurisdiction.as_str().to_lowercase()),
            self.chunk_size,
            1,
            MAX_CHUNK_SIZE,
        )?;

        if self.id_field.trim().is_empty() {
            return Err(ConfigError::EmptyIdField { jurisdiction });
        }

        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-request timeout, covering the response body.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    90_000
}

fn default_user_agent() -> String {
    concat!("parcelkit/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Retry policy for transient transport failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cap on records per request and on the merged result.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Expressions in flight per jurisdiction.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Overall deadline for one search, in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default = "default_nsw")]
    pub nsw: JurisdictionConfig,

    #[serde(default = "default_qld")]
    pub qld: JurisdictionConfig,

    #[serde(default = "default_sa")]
    pub sa: JurisdictionConfig,
}

fn default_max_records() -> usize {
    2000
}

fn default_concurrency() -> usize {
    4
}

fn default_nsw() -> JurisdictionConfig {
    JurisdictionConfig::defaults_for(Jurisdiction::Nsw)
}

fn default_qld() -> JurisdictionConfig {
    JurisdictionConfig::defaults_for(Jurisdiction::Qld)
}

fn default_sa() -> JurisdictionConfig {
    JurisdictionConfig::defaults_for(Jurisdiction::Sa)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            concurrency: default_concurrency(),
            deadline_ms: None,
            http: HttpConfig::default(),
            retry: RetryConfig::default(),
            nsw: default_nsw(),
            qld: default_qld(),
            sa: default_sa(),
        }
    }
}

impl EngineConfig {
    /// Settings for `jurisdiction`.
    pub fn jurisdiction(&self, jurisdiction: Jurisdiction) -> &JurisdictionConfig {
        match jurisdiction {
            Jurisdiction::Nsw => &self.nsw,
            Jurisdiction::Qld => &self.qld,
            Jurisdiction::Sa => &self.sa,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("max_records", self.max_records, 1, MAX_RECORDS_LIMIT)?;
        check_range("concurrency", self.concurrency, 1, MAX_CONCURRENCY)?;

        if self.http.connect_timeout_ms == 0 {
            return Err(out_of_range("http.connect_timeout_ms", 0, 1, u64::MAX));
        }
        if self.http.read_timeout_ms == 0 {
            return Err(out_of_range("http.read_timeout_ms", 0, 1, u64::MAX));
        }

        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier {
                value: self.retry.backoff_multiplier,
            });
        }

        for jurisdiction in Jurisdiction::ALL {
            self.jurisdiction(jurisdiction).validate(jurisdiction)?;
        }

        Ok(())
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Retry delays are a few milliseconds and timeouts are short.
    pub fn for_testing() -> Self {
        Self {
            http: HttpConfig {
                connect_timeout_ms: 1_000,
                read_timeout_ms: 5_000,
                user_agent: "parcelkit-test".to_string(),
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 5,
                max_delay_ms: 20,
                backoff_multiplier: 2.0,
            },
            ..Default::default()
        }
    }
}

fn check_range(field: &str, value: usize, min: usize, max: usize) -> ConfigResult<()> {
    if value < min || value > max {
        return Err(out_of_range(field, value as u64, min as u64, max as u64));
    }
    Ok(())
}

fn out_of_range(field: &str, value: u64, min: u64, max: u64) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        min,
        max,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_records, 2000);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.deadline_ms, None);
        assert_eq!(config.retry.initial_delay(), Duration::from_secs(2));
        assert_eq!(config.http.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.nsw.chunk_size, 150);
        assert_eq!(config.nsw.strategy, FetchMode::ResolveThenFetch);
        assert_eq!(config.qld.chunk_size, 100);
        assert_eq!(config.sa.chunk_size, 80);
        assert_eq!(config.sa.strategy, FetchMode::Direct);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = EngineConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "concurrency".to_string(),
                min: 1,
                max: 8,
                value: 0,
            })
        );

        config.concurrency = 9;
        assert!(config.validate().is_err());

        config.concurrency = 8;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_layer_url() {
        let mut config = EngineConfig::default();
        config.qld.layer_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLayerUrl {
                jurisdiction: Jurisdiction::Qld,
                ..
            })
        ));

        config.qld.layer_url = "ftp://example.com/query".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLayerUrl { .. })
        ));
    }

    #[test]
    fn test_chunk_size_and_id_field() {
        let mut config = EngineConfig::default();
        config.sa.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { ref field, .. }) if field == "sa.chunk_size"
        ));

        let mut config = EngineConfig::default();
        config.nsw.id_field = "  ".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyIdField {
                jurisdiction: Jurisdiction::Nsw
            })
        );
    }

    #[test]
    fn test_backoff_multiplier() {
        let mut config = EngineConfig::default();
        config.retry.backoff_multiplier = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBackoffMultiplier { .. })
        ));

        config.retry.backoff_multiplier = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"concurrency": 2, "retry": {"max_retries": 1}, "sa": {"layer_url": "http://localhost/query", "chunk_size": 10, "id_field": "parcel"}}"#,
        )
        .unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.max_records, 2000);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.initial_delay_ms, 2_000);
        assert_eq!(config.sa.chunk_size, 10);
        assert_eq!(config.sa.out_sr, 4326);
        assert_eq!(config.sa.strategy, FetchMode::Direct);
        assert_eq!(config.nsw, JurisdictionConfig::defaults_for(Jurisdiction::Nsw));
    }

    #[test]
    fn test_output_format_param() {
        assert_eq!(OutputFormat::Json.as_param(), "json");
        assert_eq!(OutputFormat::Geojson.as_param(), "geojson");
    }
}
