use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown when the service gives no usable explanation.
pub const DEFAULT_PREDICTION_FAILURE: &str = "Failed to get prediction";
pub const DEFAULT_HISTORY_FAILURE: &str = "Failed to get historical data";
pub const DEFAULT_MODELS_FAILURE: &str = "Failed to get trained models";
pub const TIMEOUT_MESSAGE: &str = "Prediction request timed out";

/// Local input errors raised by `submit` before anything reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("a prediction request is already in flight")]
    AlreadyInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Connection, DNS or TLS failure before a response arrived.
    Transport,
    /// Non-2xx HTTP status.
    Status,
    /// 2xx response carrying an explicit `success: false`.
    Rejected,
    /// Response body did not match the expected shape.
    Decode,
    Timeout,
}

/// Remote or transport failure. `message` is always fit for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, TIMEOUT_MESSAGE)
    }
}
