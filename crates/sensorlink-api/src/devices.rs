// Device endpoints
//
// CRUD over `/devices/`. The collection path keeps its trailing slash; the
// backend redirects without it.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{DeletedDevice, Device, DeviceCreate, DeviceId, DeviceUpdate};

impl ApiClient {
    /// List devices, `skip`/`limit` paginated.
    ///
    /// `GET /devices/?skip=..&limit=..`
    pub async fn list_devices(&self, skip: u32, limit: u32) -> Result<Vec<Device>, Error> {
        let mut url = self.url("devices/")?;
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("limit", &limit.to_string());
        let devices: Vec<Device> = self.get(url).await?;
        debug!(count = devices.len(), "listed devices");
        Ok(devices)
    }

    /// `GET /devices/{id}`
    pub async fn get_device(&self, id: DeviceId) -> Result<Device, Error> {
        let url = self.url(&format!("devices/{id}"))?;
        self.get(url).await
    }

    /// `POST /devices/`
    pub async fn create_device(&self, body: &DeviceCreate) -> Result<Device, Error> {
        let url = self.url("devices/")?;
        self.post(url, body).await
    }

    /// `PUT /devices/{id}` with only the fields set in `body`.
    pub async fn update_device(&self, id: DeviceId, body: &DeviceUpdate) -> Result<Device, Error> {
        let url = self.url(&format!("devices/{id}"))?;
        self.put(url, body).await
    }

    /// `DELETE /devices/{id}`
    pub async fn delete_device(&self, id: DeviceId) -> Result<DeletedDevice, Error> {
        let url = self.url(&format!("devices/{id}"))?;
        self.delete(url).await
    }
}
