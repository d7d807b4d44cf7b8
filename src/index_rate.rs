// 🌐 Index Rate Provider - today's UF value in CLP from a public service
// Best effort only: every failure leaves the manual value in charge.
//
// Expected payload: { "serie": [ { "fecha": "...", "valor": 39428.51 }, ... ] }
// Only serie[0] (the most recent entry) is read.

use crate::error::FetchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const DEFAULT_INDEX_ENDPOINT: &str = "https://mindicador.cl/api/uf";

/// A successfully fetched index value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexRateQuote {
    /// CLP per UF, rounded to whole pesos
    pub value: f64,
    /// Date the service reports for the value, when it sent a readable one
    pub as_of: Option<DateTime<Utc>>,
}

/// Extract and validate `serie[0].valor` from a decoded response body
pub fn parse_index_payload(body: &Value) -> Result<IndexRateQuote, FetchError> {
    let series = body
        .get("serie")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::MalformedResponse("missing 'serie' array".to_string()))?;

    let latest = series
        .first()
        .ok_or_else(|| FetchError::MalformedResponse("empty 'serie' array".to_string()))?;

    let raw = latest
        .get("valor")
        .ok_or_else(|| FetchError::MalformedResponse("missing 'valor' in serie[0]".to_string()))?;

    let value = match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FetchError::NonNumeric(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FetchError::NonNumeric(s.clone()))?,
        other => return Err(FetchError::NonNumeric(other.to_string())),
    };

    if !value.is_finite() {
        return Err(FetchError::NonNumeric(value.to_string()));
    }
    if value <= 0.0 {
        return Err(FetchError::NonPositive(value));
    }

    let as_of = latest
        .get("fecha")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    Ok(IndexRateQuote {
        value: value.round(),
        as_of,
    })
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Fetches the current index value. No retries, no caching: every call
/// goes to the network.
#[derive(Debug, Clone)]
pub struct IndexRateProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl IndexRateProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_current_rate(&self) -> Result<IndexRateQuote, FetchError> {
        debug!("Fetching index rate from {}", self.endpoint);

        let response = self.client.get(&self.endpoint).send().await.map_err(|e| {
            warn!("Index rate request failed: {}", e);
            FetchError::Transport(e.to_string())
        })?;

        if !response.status().is_success() {
            warn!("Index rate service answered HTTP {}", response.status());
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            warn!("Index rate payload is not JSON: {}", e);
            FetchError::MalformedResponse(e.to_string())
        })?;

        match parse_index_payload(&body) {
            Ok(quote) => {
                info!("Index rate fetched: {} CLP/UF", quote.value);
                Ok(quote)
            }
            Err(e) => {
                warn!("Index rate payload rejected: {}", e);
                Err(e)
            }
        }
    }
}

impl Default for IndexRateProvider {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_ENDPOINT)
    }
}

// ============================================================================
// TESTS
// ============================================================================
