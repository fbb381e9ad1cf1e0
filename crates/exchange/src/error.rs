use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("exchange rejected request ({code}): {msg}")]
    Exchange { code: i64, msg: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Failures worth a second attempt on idempotent reads.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::Http { status, .. } => *status == 429 || *status >= 500,
            // -1001 disconnected, -1007 backend timeout
            GatewayError::Exchange { code, .. } => matches!(code, -1001 | -1007),
            GatewayError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Decode(e.to_string())
    }
}
