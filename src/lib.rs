// Fee Estimator - Core Library
// Architectural project fees in UF and CLP, shared by the terminal form and the API server

pub mod config;
pub mod construction;
pub mod engine;
pub mod error;
pub mod form;
pub mod format;
pub mod index_rate;
pub mod rates;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{EstimatorConfig, DEFAULT_AREA_SQM, DEFAULT_INDEX_RATE};
pub use construction::ConstructionReferenceEstimator;
pub use engine::{
    clamp_index_rate, clamp_non_negative, surcharge_factor,
    FeeEngine, FeeEstimate, FeeEstimates, MIN_INDEX_RATE,
};
pub use error::{EstimatorError, EstimatorResult, FetchError};
pub use form::{FeeCard, FormDisplay, FormSnapshot, FormState, IndexRateSource};
pub use format::{format_clp, format_number, format_uf};
pub use index_rate::{parse_index_payload, IndexRateProvider, IndexRateQuote, DEFAULT_INDEX_ENDPOINT};
pub use rates::{CategoryRate, RateTable, RateTriple, Tier, DEFAULT_CATEGORY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the stderr log subscriber; `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
