//! A discovered Roku device
//!
//! Built from a discovery reply's LOCATION header. The base URL never
//! changes; the device-info document is fetched on demand and cached,
//! except for the power state which is always fetched fresh.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::api::ecp::normalize_base_url;
use crate::api::{EcpClient, EcpError};
use crate::models::{
    DeviceClass, DeviceInfo, DeviceSummary, Key, FRIENDLY_DEVICE_NAME, FRIENDLY_MODEL_NAME,
    POWER_MODE,
};

/// Header carrying the device's control base URL
pub const LOCATION_HEADER: &str = "LOCATION";

/// Reasons a discovery reply cannot become a descriptor
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("reply has no LOCATION header")]
    MissingLocation,

    #[error("LOCATION is not an http URL: {0}")]
    InvalidLocation(String),
}

/// One discovered device
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    base_url: String,
    client: EcpClient,
    name: Option<String>,
    info: Option<DeviceInfo>,
}

impl DeviceDescriptor {
    /// Create a descriptor for a known base URL
    pub fn new(client: EcpClient, base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            client,
            name: None,
            info: None,
        }
    }

    /// Build a descriptor from a discovery reply's header map.
    ///
    /// Header names are matched case-insensitively.
    pub fn from_headers(
        client: EcpClient,
        headers: &HashMap<String, String>,
    ) -> Result<Self, DescriptorError> {
        let location = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(LOCATION_HEADER))
            .map(|(_, v)| v.trim())
            .ok_or(DescriptorError::MissingLocation)?;

        let lower = location.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(DescriptorError::InvalidLocation(location.to_string()));
        }

        Ok(Self::new(client, location))
    }

    /// Control base URL, always ending in '/'
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Friendly name if it has already been fetched
    pub fn cached_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Device-info document from the last fetch, if any
    pub fn cached_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Friendly device name, fetched on first use
    pub async fn name(&mut self) -> Result<String, EcpError> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        let name = self.query_device_info(FRIENDLY_DEVICE_NAME).await?;
        self.name = Some(name.clone());
        Ok(name)
    }

    /// Look up one device-info field.
    ///
    /// The document is fetched when nothing is cached yet, and always for
    /// the power state so that it is never served stale.
    pub async fn query_device_info(&mut self, key: &str) -> Result<String, EcpError> {
        let info = match self.info.take() {
            Some(info) if key != POWER_MODE => info,
            _ => self.client.fetch_device_info(&self.base_url).await?,
        };

        let value = info.get(key).map(str::to_string);
        self.info = Some(info);
        value.ok_or_else(|| EcpError::MissingField(key.to_string()))
    }

    /// Whole device-info document, served from the cache when present
    pub async fn device_info(&mut self) -> Result<&DeviceInfo, EcpError> {
        let info = match self.info.take() {
            Some(info) => info,
            None => self.client.fetch_device_info(&self.base_url).await?,
        };
        Ok(self.info.insert(info))
    }

    pub async fn is_power_on(&mut self) -> Result<bool, EcpError> {
        Ok(self.query_device_info(POWER_MODE).await? == "PowerOn")
    }

    pub async fn model_name(&mut self) -> Result<String, EcpError> {
        self.query_device_info(FRIENDLY_MODEL_NAME).await
    }

    /// TV, Stick or unknown
    pub async fn description(&mut self) -> Result<DeviceClass, EcpError> {
        Ok(DeviceClass::from_info(self.device_info().await?))
    }

    pub async fn is_tv(&mut self) -> Result<bool, EcpError> {
        Ok(self.description().await? == DeviceClass::Tv)
    }

    pub async fn is_stick(&mut self) -> Result<bool, EcpError> {
        Ok(self.description().await? == DeviceClass::Stick)
    }

    /// Serializable summary for CLI output
    pub async fn summary(&mut self) -> Result<DeviceSummary, EcpError> {
        let name = self.name().await?;
        let info = self.device_info().await?.clone();
        Ok(DeviceSummary {
            name,
            url: self.base_url.clone(),
            model: info.get(FRIENDLY_MODEL_NAME).map(str::to_string),
            class: DeviceClass::from_info(&info),
            power_on: info.get(POWER_MODE).map(|p| p == "PowerOn"),
        })
    }

    // actions

    pub async fn send_keypress(&self, key: Key) -> bool {
        self.client.send_keypress(&self.base_url, key).await
    }

    pub async fn send_keydown(&self, key: Key) -> bool {
        self.client.send_keydown(&self.base_url, key).await
    }

    pub async fn send_keyup(&self, key: Key) -> bool {
        self.client.send_keyup(&self.base_url, key).await
    }

    pub async fn launch_channel(&self, channel_id: &str) -> bool {
        self.client.launch_channel(&self.base_url, channel_id).await
    }

    pub async fn send_char(&self, ch: Option<char>, keysym: &str) -> bool {
        self.client.send_char(&self.base_url, ch, keysym).await
    }

    /// Power off when on, power on otherwise
    pub async fn toggle_power(&mut self) -> Result<bool, EcpError> {
        let key = if self.is_power_on().await? {
            Key::PowerOff
        } else {
            Key::PowerOn
        };
        debug!("toggling power on {} with {}", self.base_url, key);
        Ok(self.send_keypress(key).await)
    }
}
