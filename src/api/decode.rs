//! Payload decoding.
//!
//! A response body carries the domain fields and, possibly, an `error`
//! object in the same JSON envelope:
//!
//! ```json
//! { "error": { "message": "Token was invalid or missing from the request.", "code": 40101 } }
//! ```
//!
//! `decode_envelope` splits the body into both halves and
//! `Envelope::into_result` applies the rule once for every endpoint:
//! a populated server error wins over whatever the domain half holds.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use super::error::ApiError;

/// Application error reported by the server inside a payload.
///
/// `code = -1` with an empty message is the "no error" state.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerError {
    pub message: String,
    pub code: i64,
}

impl ServerError {
    pub fn none() -> Self {
        Self {
            message: String::new(),
            code: -1,
        }
    }

    pub fn is_none(&self) -> bool {
        self.message.is_empty()
    }
}

impl Default for ServerError {
    fn default() -> Self {
        Self::none()
    }
}

/// Both halves of a decoded payload.
#[derive(Debug)]
pub struct Envelope<T> {
    pub payload: Result<T, serde_json::Error>,
    pub error: ServerError,
}

impl<T> Envelope<T> {
    /// Server error first, then the domain decode result.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.error.is_none() {
            return Err(ApiError::Server {
                code: self.error.code,
                message: self.error.message,
            });
        }

        self.payload.map_err(ApiError::Decode)
    }
}

/// Parses `bytes` and extracts the domain value and the server error.
///
/// Fails with `ApiError::Decode` only when the body is not JSON at all.
/// A malformed domain half is kept in `payload` so that a server error
/// sent alongside still takes precedence.
pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<Envelope<T>, ApiError> {
    let value: Value = serde_json::from_slice(bytes)?;

    let error = match value.get("error") {
        Some(raw) if !raw.is_null() => ServerError::deserialize(raw)?,
        _ => ServerError::none(),
    };

    let payload = T::deserialize(value);

    Ok(Envelope { payload, error })
}
