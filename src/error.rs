use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChainError>;

/// Failures of a single refresh cycle. Nothing here is recovered inside the
/// pipeline; the caller decides what the user sees.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Network failure, timeout, or a non-success HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Body is not JSON or lacks `records.data` / `records.expiryDates`.
    #[error("Format error: {0}")]
    Format(String),

    /// A record field is missing or not convertible to its numeric type.
    #[error("Coercion error: field '{field}' has value {value}")]
    Coercion { field: &'static str, value: String },

    #[error("Expiry '{expiry}' not found in option chain")]
    NotFound { expiry: String },

    #[error("Unsupported index '{0}' (expected NIFTY or BANKNIFTY)")]
    UnsupportedIndex(String),
}

impl ChainError {
    /// Only transport failures are worth retrying; a malformed payload or a
    /// bad record will be just as bad on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Transport(_))
    }

    pub(crate) fn coercion(field: &'static str, value: impl Into<String>) -> Self {
        ChainError::Coercion {
            field,
            value: value.into(),
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChainError::Transport(format!("request timed out: {}", err))
        } else {
            ChainError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Format(err.to_string())
    }
}
