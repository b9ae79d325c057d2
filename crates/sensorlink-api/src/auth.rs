// Login
//
// `POST /auth/login` exchanges a username and password for a session. The
// backend's `detail` text on 401/403 is surfaced as-is so the caller can
// tell a wrong password from a disabled account.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{LoginRequest, LoginResponse, Session};

impl ApiClient {
    /// Authenticate and, when the backend issues one, keep the bearer token
    /// for subsequent requests.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Session, Error> {
        let url = self.url("auth/login")?;
        debug!(username, "logging in");

        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };
        let resp: LoginResponse = self.post(url, &body).await?;

        if let Some(token) = &resp.access_token {
            self.set_token(token.clone());
        }
        info!(username, token = resp.access_token.is_some(), "login succeeded");

        Ok(Session {
            token: resp.access_token,
            username: resp.username.unwrap_or_else(|| username.to_owned()),
            role: resp.role,
            message: resp.message,
        })
    }

    /// Drop the bearer token. The backend keeps no server-side session.
    pub fn logout(&self) {
        self.clear_token();
    }
}
