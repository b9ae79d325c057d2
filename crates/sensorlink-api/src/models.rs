// Backend wire models
//
// Devices, sensor readings, and the auth/health payloads. Sensor values are
// carried as decimal strings because the backend serializes `Decimal`
// columns that way; some firmware posts plain JSON numbers instead, so the
// deserializers accept both. Timestamps without an offset are read as UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

// ── Identifiers ──────────────────────────────────────────────────────

/// Server-assigned device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i64);

impl DeviceId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DeviceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for DeviceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// A registered device as returned by `GET /devices/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_name: String,
    pub ip_address: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub date_installed: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for `POST /devices/`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceCreate {
    pub device_name: String,
    pub ip_address: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub date_installed: Option<DateTime<Utc>>,
}

/// Body for `PUT /devices/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "timestamp::option")]
    pub date_installed: Option<DateTime<Utc>>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.device_name.is_none()
            && self.ip_address.is_none()
            && self.kind.is_none()
            && self.date_installed.is_none()
    }
}

/// Response to `DELETE /devices/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedDevice {
    #[serde(default)]
    pub message: Option<String>,
    pub id: DeviceId,
}

// ── Sensor readings ──────────────────────────────────────────────────

/// Named sensor channels a reading can carry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SensorField {
    Distance,
    Temperature,
    Humidity,
    Light,
    Pressure,
    Motion,
    CustomData,
}

/// One sensor reading. Every channel is optional; values are decimal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    #[serde(default, deserialize_with = "decimal_text")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "decimal_text")]
    pub humidity: Option<String>,
    #[serde(default, deserialize_with = "decimal_text")]
    pub pressure: Option<String>,
    #[serde(default, deserialize_with = "decimal_text")]
    pub light: Option<String>,
    #[serde(default, deserialize_with = "decimal_text")]
    pub motion: Option<String>,
    #[serde(default, deserialize_with = "decimal_text")]
    pub distance: Option<String>,
    #[serde(default)]
    pub custom_data: Option<String>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    /// A reading with no channels set.
    pub fn empty(id: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            temperature: None,
            humidity: None,
            pressure: None,
            light: None,
            motion: None,
            distance: None,
            custom_data: None,
            timestamp,
        }
    }

    /// Raw text of a channel, if the reading carries it.
    pub fn raw(&self, field: SensorField) -> Option<&str> {
        match field {
            SensorField::Distance => self.distance.as_deref(),
            SensorField::Temperature => self.temperature.as_deref(),
            SensorField::Humidity => self.humidity.as_deref(),
            SensorField::Light => self.light.as_deref(),
            SensorField::Pressure => self.pressure.as_deref(),
            SensorField::Motion => self.motion.as_deref(),
            SensorField::CustomData => self.custom_data.as_deref(),
        }
    }

    /// Builder-style setter, mostly for fixtures.
    pub fn with(mut self, field: SensorField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            SensorField::Distance => self.distance = value,
            SensorField::Temperature => self.temperature = value,
            SensorField::Humidity => self.humidity = value,
            SensorField::Light => self.light = value,
            SensorField::Pressure => self.pressure = value,
            SensorField::Motion => self.motion = value,
            SensorField::CustomData => self.custom_data = value,
        }
        self
    }

    /// Numeric value of a channel. Blank, unparseable or non-finite text
    /// counts as absent.
    pub fn value(&self, field: SensorField) -> Option<f64> {
        self.raw(field)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

/// Accept `"21.5"`, `21.5`, or `null` for a decimal column.
fn decimal_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

// ── Auth / health ────────────────────────────────────────────────────

/// Body for `POST /auth/login`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response to `POST /auth/login`.
///
/// Backends differ on the token key; `access_token` and `token` are both
/// accepted.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: Option<SecretString>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer credential, absent when the backend only acknowledges the login.
    pub token: Option<SecretString>,
    pub username: String,
    pub role: Option<String>,
    pub message: Option<String>,
}

/// Response to `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

// ── Timestamps ───────────────────────────────────────────────────────

/// RFC 3339 timestamps, tolerating naive values (read as UTC).
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => s.serialize_str(&dt.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| {
                    super::parse(&raw).ok_or_else(|| {
                        serde::de::Error::custom(format!("invalid timestamp: {raw}"))
                    })
                })
                .transpose()
        }
    }

    #[cfg(test)]
    pub(crate) fn naive(raw: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .map(|n| n.and_utc())
            .unwrap_or_default()
    }
}
