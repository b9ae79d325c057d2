// ── Runtime connection configuration ──
//
// These types describe how to reach a backend and how a device feed
// behaves. They carry credential data and tuning, but never touch disk.
// The CLI builds a `ClientConfig` from its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::link::LinkConfig;

/// How to authenticate with the backend.
#[derive(Debug, Clone, Default)]
pub enum AuthCredentials {
    /// No authentication (open lab backend).
    #[default]
    None,
    /// A bearer token from an earlier login.
    Token(SecretString),
    /// Log in with username and password on first use.
    Credentials {
        username: String,
        password: SecretString,
    },
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed device gateways).
    DangerAcceptInvalid,
}

/// Per-device feed tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Readings kept in the history buffer and requested at bootstrap.
    pub history_capacity: usize,
    /// Upper bound on the bootstrap fetch.
    pub bootstrap_timeout: Duration,
    pub link: LinkConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            bootstrap_timeout: Duration::from_secs(10),
            link: LinkConfig::default(),
        }
    }
}

/// Configuration for talking to one backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST root, e.g. `http://192.168.1.20:8000`.
    pub api_url: Url,
    /// Base for device streams. Inferred from `api_url` when unset.
    pub stream_url: Option<Url>,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// HTTP request timeout.
    pub timeout: Duration,
    pub feed: FeedConfig,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            stream_url: None,
            auth: AuthCredentials::None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            feed: FeedConfig::default(),
        }
    }
}
