//! Parcelkit command line front end.
//!
//! Resolves cadastral identifiers to parcel geometries and prints a GeoJSON
//! `FeatureCollection` on stdout. Diagnostics and logs go to stderr.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PARCELKIT_MAX_RECORDS` | 2000 | Maximum features returned |
//! | `PARCELKIT_CONCURRENCY` | 4 | In-flight requests per jurisdiction |
//! | `PARCELKIT_DEADLINE_MS` | none | Overall search deadline |
//! | `PARCELKIT_LOG_LEVEL` | warn | Log level |
//! | `PARCELKIT_PRETTY` | false | Pretty-print the output |

use std::io::{self, IsTerminal, Read};

use clap::Parser;
use parcelkit_core::{
    Diagnostic, EngineConfig, Jurisdiction, ParcelSearch, SearchRequest,
    config::MAX_CONCURRENCY,
};
use tracing::{debug, info};

/// Command line configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "parcelkit")]
#[command(about = "Look up cadastral parcels by lot/plan or title reference")]
#[command(version)]
pub struct Config {
    /// Identifiers such as `13//DP1242624`, `1RP912949` or `5100/123`.
    /// Read from stdin when none are given.
    pub identifiers: Vec<String>,

    /// Query New South Wales.
    #[arg(long)]
    pub nsw: bool,

    /// Query Queensland.
    #[arg(long)]
    pub qld: bool,

    /// Query South Australia.
    #[arg(long)]
    pub sa: bool,

    /// Maximum number of features returned.
    #[arg(long, env = "PARCELKIT_MAX_RECORDS", default_value = "2000")]
    pub max_records: usize,

    /// In-flight requests per jurisdiction.
    #[arg(long, env = "PARCELKIT_CONCURRENCY", default_value = "4")]
    pub concurrency: usize,

    /// Overall deadline in milliseconds.
    #[arg(long, env = "PARCELKIT_DEADLINE_MS")]
    pub deadline_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "PARCELKIT_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Pretty-print the FeatureCollection.
    #[arg(long, env = "PARCELKIT_PRETTY", default_value = "false")]
    pub pretty: bool,
}

impl Config {
    /// Jurisdictions selected by flags. No flags selects all of them.
    pub fn jurisdictions(&self) -> Vec<Jurisdiction> {
        let selected: Vec<Jurisdiction> = [
            (self.nsw, Jurisdiction::Nsw),
            (self.qld, Jurisdiction::Qld),
            (self.sa, Jurisdiction::Sa),
        ]
        .into_iter()
        .filter_map(|(enabled, jurisdiction)| enabled.then_some(jurisdiction))
        .collect();

        if selected.is_empty() {
            Jurisdiction::ALL.to_vec()
        } else {
            selected
        }
    }

    /// Builds the engine configuration from defaults and the CLI overrides.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_records: self.max_records,
            concurrency: self.concurrency,
            deadline_ms: self.deadline_ms,
            ..Default::default()
        }
    }

    /// Validates the configuration and returns every error found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_records == 0 {
            errors.push("Max records cannot be 0".to_string());
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            errors.push(format!("Concurrency must be between 1 and {MAX_CONCURRENCY}"));
        }

        if self.deadline_ms == Some(0) {
            errors.push("Deadline cannot be 0".to_string());
        }

        // remaining engine limits, once the flag checks above pass
        if errors.is_empty() {
            if let Err(err) = self.engine_config().validate() {
                errors.push(err.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Identifier text from the arguments, or from stdin when there are none.
    fn input(&self) -> io::Result<String> {
        if !self.identifiers.is_empty() {
            return Ok(self.identifiers.join("\n"));
        }

        let stdin = io::stdin();
        if stdin.is_terminal() {
            return Ok(String::new());
        }
        let mut text = String::new();
        stdin.lock().read_to_string(&mut text)?;
        Ok(text)
    }
}

/// Initializes tracing on stderr so stdout carries only GeoJSON.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("parcelkit_core={level},parcelkit={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let search = ParcelSearch::new(config.engine_config())
        .map_err(|e| anyhow::anyhow!("Invalid engine configuration: {}", e))?;

    let text = config.input()?;
    let request = SearchRequest::new(text)
        .with_jurisdictions(config.jurisdictions())
        .with_max_records(config.max_records);

    debug!(jurisdictions = ?request.jurisdictions, "Starting parcel search");
    let outcome = search.search(&request).await;
    report(&outcome.diagnostics);

    let json = if config.pretty {
        serde_json::to_string_pretty(&outcome.collection)?
    } else {
        serde_json::to_string(&outcome.collection)?
    };
    println!("{json}");

    info!(
        features = outcome.collection.len(),
        failures = outcome.failures.len(),
        "Done"
    );
    Ok(())
}
