// ── Core error types ──
//
// User-facing errors from sensorlink-core. Consumers never see raw HTTP
// plumbing; the `From<sensorlink_api::Error>` impl translates it into
// domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Wrong username/password, or a bearer token the backend refused.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// Credentials were accepted but the account may not do this.
    #[error("Not authorized: {message}")]
    NotAuthorized { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Attach a device identifier to a bare "not found".
    pub fn for_device(self, id: impl std::fmt::Display) -> Self {
        match self {
            Self::NotFound { .. } => Self::DeviceNotFound {
                identifier: id.to_string(),
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sensorlink_api::Error> for CoreError {
    fn from(err: sensorlink_api::Error) -> Self {
        use sensorlink_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::InvalidCredentials { message },
            Api::Forbidden { message } => CoreError::NotAuthorized { message },
            Api::Transport(ref e) => {
                // Timeouts with a known duration arrive as `Api::Timeout`.
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::UnsupportedScheme { scheme } => CoreError::Config {
                message: format!("Unsupported URL scheme `{scheme}` (expected http or https)"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::NotFound { message } => CoreError::NotFound { message },
            Api::Api { status, message } if (400..500).contains(&status) => {
                if status == 422 {
                    CoreError::ValidationFailed { message }
                } else {
                    CoreError::Rejected { message }
                }
            }
            Api::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            Api::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
