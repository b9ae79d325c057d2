use crate::client::ApiClient;
use crate::error::Error;
use crate::models::Health;

impl ApiClient {
    /// `GET /health`
    pub async fn health(&self) -> Result<Health, Error> {
        let url = self.url("health")?;
        self.get(url).await
    }
}
