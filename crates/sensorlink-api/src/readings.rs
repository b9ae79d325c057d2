use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{DeviceId, SensorReading};

impl ApiClient {
    /// Most recent readings for a device, newest first.
    ///
    /// `GET /devices/{id}/readings?limit=N`
    pub async fn list_readings(
        &self,
        device: DeviceId,
        limit: u32,
    ) -> Result<Vec<SensorReading>, Error> {
        let mut url = self.url(&format!("devices/{device}/readings"))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get(url).await
    }
}
