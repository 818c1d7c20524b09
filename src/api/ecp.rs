//! Roku External Control Protocol (ECP) client
//!
//! Stateless wrapper around the device's REST control API:
//! `keypress/`, `keydown/`, `keyup/`, `launch/` and `query/device-info`.
//!
//! Key commands follow remote-control semantics: a rejected or lost
//! command is logged and reported as `false`, never raised.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::api::device_info::{parse_device_info, DeviceInfoError};
use crate::models::{DeviceInfo, Key};

/// Characters that must be percent-encoded inside a `Lit_` command
const ENCODED_PUNCTUATION: &str = "@#$&+=:;,?/ ";

/// ECP error types
#[derive(Error, Debug)]
pub enum EcpError {
    #[error("Device returned HTTP {0}")]
    Status(u16),

    #[error("Invalid device-info document: {0}")]
    InvalidDocument(#[from] DeviceInfoError),

    #[error("Field not present in device-info: {0}")]
    MissingField(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Which key endpoint a key command goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Down,
    Up,
}

impl KeyAction {
    fn path(&self) -> &'static str {
        match self {
            KeyAction::Press => "keypress",
            KeyAction::Down => "keydown",
            KeyAction::Up => "keyup",
        }
    }
}

/// Normalise a base URL so that `{base}keypress/...` is well formed
pub fn normalize_base_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// Map a typed character / keysym pair to an ECP key command.
///
/// Printable characters become `Lit_<char>` (punctuation from a fixed set is
/// percent-encoded). Otherwise a handful of named keysyms map to remote keys.
/// Anything else yields `None`.
pub fn char_command(ch: Option<char>, keysym: &str) -> Option<String> {
    if let Some(c) = ch {
        if ENCODED_PUNCTUATION.contains(c) {
            let mut buf = [0u8; 4];
            let encoded = urlencoding::encode(c.encode_utf8(&mut buf));
            return Some(format!("Lit_{}", encoded));
        }
        if !c.is_control() {
            return Some(format!("Lit_{}", c));
        }
    }

    let key = match keysym {
        "BackSpace" | "Delete" => Key::Backspace,
        "Up" => Key::Up,
        "Down" => Key::Down,
        "Left" => Key::Left,
        "Right" => Key::Right,
        "Home" | "Escape" => Key::Home,
        "Pause" => Key::Play,
        "Return" => Key::Select,
        _ => return None,
    };
    Some(key.as_str().to_string())
}

/// ECP client
#[derive(Debug, Clone)]
pub struct EcpClient {
    client: reqwest::Client,
}

impl EcpClient {
    /// Create a new client with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// POST a command path under the base URL and log the outcome.
    /// Returns true when the device accepted it (200 or 202).
    async fn post_command(&self, method: &str, base_url: &str, path: &str) -> bool {
        let url = format!("{}{}", normalize_base_url(base_url), path);

        match self.client.post(&url).send().await {
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if status == StatusCode::OK || status == StatusCode::ACCEPTED {
                    info!("{} url {} status {} {}", method, url, status.as_u16(), body);
                    true
                } else {
                    error!(
                        "error in {} url {} status {} {}",
                        method,
                        url,
                        status.as_u16(),
                        body
                    );
                    false
                }
            }
            Err(e) => {
                error!("error in {} url {}: {}", method, url, e);
                false
            }
        }
    }

    /// Send a raw key command (a `Key` name or a `Lit_` literal)
    pub async fn send_key_command(&self, base_url: &str, action: KeyAction, command: &str) -> bool {
        let method = match action {
            KeyAction::Press => "send_keypress",
            KeyAction::Down => "send_keydown",
            KeyAction::Up => "send_keyup",
        };
        self.post_command(method, base_url, &format!("{}/{}", action.path(), command))
            .await
    }

    /// POST `{base}keypress/{key}`
    pub async fn send_keypress(&self, base_url: &str, key: Key) -> bool {
        self.send_key_command(base_url, KeyAction::Press, key.as_str())
            .await
    }

    /// POST `{base}keydown/{key}`
    pub async fn send_keydown(&self, base_url: &str, key: Key) -> bool {
        self.send_key_command(base_url, KeyAction::Down, key.as_str())
            .await
    }

    /// POST `{base}keyup/{key}`
    pub async fn send_keyup(&self, base_url: &str, key: Key) -> bool {
        self.send_key_command(base_url, KeyAction::Up, key.as_str())
            .await
    }

    /// POST `{base}launch/{channel_id}`
    pub async fn launch_channel(&self, base_url: &str, channel_id: &str) -> bool {
        let channel = urlencoding::encode(channel_id);
        self.post_command("launch", base_url, &format!("launch/{}", channel))
            .await
    }

    /// Send a typed character. Unmapped keys are ignored and return false
    /// without touching the network.
    pub async fn send_char(&self, base_url: &str, ch: Option<char>, keysym: &str) -> bool {
        match char_command(ch, keysym) {
            Some(command) => {
                self.send_key_command(base_url, KeyAction::Press, &command)
                    .await
            }
            None => {
                debug!("ignoring unmapped key {:?} / {}", ch, keysym);
                false
            }
        }
    }

    /// GET `{base}query/device-info` and parse the document (uncached)
    pub async fn fetch_device_info(&self, base_url: &str) -> Result<DeviceInfo, EcpError> {
        let url = format!("{}query/device-info", normalize_base_url(base_url));
        debug!("fetching device info from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("device-info query {} returned status {}", url, status.as_u16());
            return Err(EcpError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_device_info(&body).map_err(|e| {
            error!("bad device-info document from {}: {}", url, e);
            EcpError::from(e)
        })
    }
}

impl Default for EcpClient {
    fn default() -> Self {
        Self::new()
    }
}
