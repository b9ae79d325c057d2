// ── Dashboard abstraction ──
//
// Entry point for consumers: owns the REST client built from a
// `ClientConfig`, handles login, and opens per-device feeds.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;
use sensorlink_api::transport::{TlsMode, TransportConfig};
use sensorlink_api::{
    ApiClient, Device, DeviceCreate, DeviceId, DeviceUpdate, Health, SensorReading, Session,
    WsConnector,
};
use tracing::{debug, info};
use url::Url;

use crate::config::{AuthCredentials, ClientConfig, TlsVerification};
use crate::error::CoreError;
use crate::feed::DeviceFeed;

/// Cheaply cloneable handle to one backend.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: ClientConfig,
    api: Arc<ApiClient>,
    session: RwLock<Option<Session>>,
}

impl Dashboard {
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let api = ApiClient::new(config.api_url.as_str(), &transport)?;
        if let AuthCredentials::Token(token) = &config.auth {
            api.set_token(token.clone());
        }
        Ok(Self {
            inner: Arc::new(DashboardInner {
                config,
                api: Arc::new(api),
                session: RwLock::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.inner.api
    }

    /// Log in with the configured credentials, if any.
    pub async fn authenticate(&self) -> Result<Option<Session>, CoreError> {
        match &self.inner.config.auth {
            AuthCredentials::Credentials { username, password } => {
                self.login(username, password).await.map(Some)
            }
            AuthCredentials::Token(_) => {
                debug!("using stored bearer token, skipping login");
                Ok(None)
            }
            AuthCredentials::None => Ok(None),
        }
    }

    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Session, CoreError> {
        let session = self.inner.api.login(username, password).await?;
        info!(username = %session.username, role = ?session.role, "authenticated");
        *self.inner.session.write().expect("session lock poisoned") = Some(session.clone());
        Ok(session)
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.session.read().expect("session lock poisoned").clone()
    }

    // ── Devices ──────────────────────────────────────────────────

    pub async fn list_devices(&self, skip: u32, limit: u32) -> Result<Vec<Device>, CoreError> {
        Ok(self.inner.api.list_devices(skip, limit).await?)
    }

    pub async fn get_device(&self, id: DeviceId) -> Result<Device, CoreError> {
        self.inner
            .api
            .get_device(id)
            .await
            .map_err(|e| CoreError::from(e).for_device(id))
    }

    pub async fn create_device(&self, body: &DeviceCreate) -> Result<Device, CoreError> {
        if body.device_name.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "device name must not be empty".into(),
            });
        }
        if body.ip_address.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "IP address must not be empty".into(),
            });
        }
        Ok(self.inner.api.create_device(body).await?)
    }

    pub async fn update_device(
        &self,
        id: DeviceId,
        body: &DeviceUpdate,
    ) -> Result<Device, CoreError> {
        if body.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "nothing to update".into(),
            });
        }
        self.inner
            .api
            .update_device(id, body)
            .await
            .map_err(|e| CoreError::from(e).for_device(id))
    }

    pub async fn delete_device(&self, id: DeviceId) -> Result<(), CoreError> {
        self.inner
            .api
            .delete_device(id)
            .await
            .map(|_| ())
            .map_err(|e| CoreError::from(e).for_device(id))
    }

    // ── Readings & health ────────────────────────────────────────

    /// Most recent readings, newest first.
    pub async fn readings(&self, id: DeviceId, limit: u32) -> Result<Vec<SensorReading>, CoreError> {
        self.inner
            .api
            .list_readings(id, limit)
            .await
            .map_err(|e| CoreError::from(e).for_device(id))
    }

    pub async fn health(&self) -> Result<Health, CoreError> {
        Ok(self.inner.api.health().await?)
    }

    // ── Live feeds ───────────────────────────────────────────────

    /// Stream URL for a device, from `stream_url` if configured, else the
    /// API root.
    pub fn stream_url(&self, id: DeviceId) -> Result<Url, CoreError> {
        let base = self
            .inner
            .config
            .stream_url
            .as_ref()
            .unwrap_or_else(|| self.inner.api.base_url());
        Ok(sensorlink_api::stream_url(base, id)?)
    }

    /// Start a live feed for one device.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(&self, id: DeviceId) -> Result<DeviceFeed<WsConnector>, CoreError> {
        let url = self.stream_url(id)?;
        Ok(DeviceFeed::start(
            Arc::clone(&self.inner.api),
            Arc::new(self.stream_connector()),
            url,
            id,
            self.inner.config.feed,
        ))
    }

    /// Stream connector carrying the current token and the same TLS mode
    /// as the REST client.
    fn stream_connector(&self) -> WsConnector {
        WsConnector::new()
            .with_bearer(self.inner.api.token())
            .with_tls(build_transport(&self.inner.config).tls)
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Build, authenticate, run `f`.
    pub async fn oneshot<F, Fut, T>(config: ClientConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Dashboard) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let dashboard = Dashboard::new(config)?;
        dashboard.authenticate().await?;
        f(dashboard).await
    }
}

fn build_transport(config: &ClientConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}
