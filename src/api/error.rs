use thiserror::Error;

/// Boxed source error carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single HTTP round trip, before any decoding.
///
/// Only `Timeout` is retried by the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),

    #[error("request failed: {0}")]
    Request(#[source] BoxError),

    #[error("exhausted retries after {attempts} timed out attempts")]
    ExhaustedRetries { attempts: u32 },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // The token travels in the query string, never let it reach a log line.
        let timed_out = err.is_timeout();
        let err = err.without_url();

        if timed_out {
            TransportError::Timeout(Box::new(err))
        } else {
            TransportError::Request(Box::new(err))
        }
    }
}

/// Outcome classification of a session read operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Application error embedded in an otherwise well-formed payload.
    #[error("server error ({code}): {message}")]
    Server { code: i64, message: String },
}
