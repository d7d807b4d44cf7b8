// ⚠️ Error types - what can go wrong in the estimator
// Numeric input never errors (it is clamped); only lookups and the fetch can fail.

use thiserror::Error;

/// Errors raised by the pricing layer itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    /// Category name is not a key of the rate table
    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),
}

/// Why the automatic index-rate fetch did not produce a value.
///
/// Always recoverable: the caller keeps the previous manual value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Index service answered HTTP {0}")]
    HttpStatus(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Index value is not numeric: {0}")]
    NonNumeric(String),

    #[error("Index value is not positive: {0}")]
    NonPositive(f64),
}

impl FetchError {
    /// Notice shown to the user when the automatic value cannot be used
    pub fn user_notice(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "Error de conexión al obtener UF. Ingresa manual.",
            _ => "No se pudo leer la UF automática. Ingresa manual.",
        }
    }
}

pub type EstimatorResult<T> = Result<T, EstimatorError>;
