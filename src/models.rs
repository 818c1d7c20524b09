//! Data structures and types for rokuremote
//!
//! Shared models used across the application organized by domain:
//! - **Keys**: the remote-control key set understood by the device
//! - **Inputs**: selectable input sources on Roku TVs
//! - **Device info**: the `query/device-info` document
//! - **Output**: serializable device summaries for the CLI

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Remote Keys
// =============================================================================

/// A named remote-control key, sent as `keypress/<name>` (or keydown/keyup)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    PowerOn,
    PowerOff,
    Home,
    Rev,
    Fwd,
    Play,
    Select,
    Left,
    Right,
    Down,
    Up,
    Back,
    /// Labelled "guide" on the remote
    LiveTv,
    InstantReplay,
    Info,
    Backspace,
    Search,
    Enter,
    VolumeDown,
    VolumeMute,
    VolumeUp,
    ChannelUp,
    ChannelDown,
    InputTuner,
    InputHdmi1,
    InputHdmi2,
    InputHdmi3,
    InputHdmi4,
    InputAv1,
}

impl Key {
    /// Every key, in remote-layout order
    pub const ALL: [Key; 29] = [
        Key::PowerOn,
        Key::PowerOff,
        Key::Home,
        Key::Rev,
        Key::Fwd,
        Key::Play,
        Key::Select,
        Key::Left,
        Key::Right,
        Key::Down,
        Key::Up,
        Key::Back,
        Key::LiveTv,
        Key::InstantReplay,
        Key::Info,
        Key::Backspace,
        Key::Search,
        Key::Enter,
        Key::VolumeDown,
        Key::VolumeMute,
        Key::VolumeUp,
        Key::ChannelUp,
        Key::ChannelDown,
        Key::InputTuner,
        Key::InputHdmi1,
        Key::InputHdmi2,
        Key::InputHdmi3,
        Key::InputHdmi4,
        Key::InputAv1,
    ];

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::PowerOn => "PowerOn",
            Key::PowerOff => "PowerOff",
            Key::Home => "Home",
            Key::Rev => "Rev",
            Key::Fwd => "Fwd",
            Key::Play => "Play",
            Key::Select => "Select",
            Key::Left => "Left",
            Key::Right => "Right",
            Key::Down => "Down",
            Key::Up => "Up",
            Key::Back => "Back",
            Key::LiveTv => "LiveTV",
            Key::InstantReplay => "InstantReplay",
            Key::Info => "Info",
            Key::Backspace => "Backspace",
            Key::Search => "Search",
            Key::Enter => "Enter",
            Key::VolumeDown => "VolumeDown",
            Key::VolumeMute => "VolumeMute",
            Key::VolumeUp => "VolumeUp",
            Key::ChannelUp => "ChannelUp",
            Key::ChannelDown => "ChannelDown",
            Key::InputTuner => "InputTuner",
            Key::InputHdmi1 => "InputHDMI1",
            Key::InputHdmi2 => "InputHDMI2",
            Key::InputHdmi3 => "InputHDMI3",
            Key::InputHdmi4 => "InputHDMI4",
            Key::InputAv1 => "InputAV1",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a key name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    /// Accepts the wire name in any case ("VolumeUp", "volumeup") as well as
    /// kebab-case ("volume-up") and the "guide" alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        if folded == "guide" {
            return Ok(Key::LiveTv);
        }

        Key::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

// =============================================================================
// Input Sources
// =============================================================================

/// TV input source, selected through the matching `Input*` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputSource {
    Hdmi1,
    Hdmi2,
    Hdmi3,
    Hdmi4,
    Tuner,
    Av1,
}

impl InputSource {
    pub const ALL: [InputSource; 6] = [
        InputSource::Hdmi1,
        InputSource::Hdmi2,
        InputSource::Hdmi3,
        InputSource::Hdmi4,
        InputSource::Tuner,
        InputSource::Av1,
    ];

    /// Key that switches the device to this input
    pub fn key(&self) -> Key {
        match self {
            InputSource::Hdmi1 => Key::InputHdmi1,
            InputSource::Hdmi2 => Key::InputHdmi2,
            InputSource::Hdmi3 => Key::InputHdmi3,
            InputSource::Hdmi4 => Key::InputHdmi4,
            InputSource::Tuner => Key::InputTuner,
            InputSource::Av1 => Key::InputAv1,
        }
    }

    /// Next input in the cycle (wraps around)
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|i| i == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Hdmi1 => write!(f, "HDMI-1"),
            InputSource::Hdmi2 => write!(f, "HDMI-2"),
            InputSource::Hdmi3 => write!(f, "HDMI-3"),
            InputSource::Hdmi4 => write!(f, "HDMI-4"),
            InputSource::Tuner => write!(f, "Tuner"),
            InputSource::Av1 => write!(f, "AV-1"),
        }
    }
}

// =============================================================================
// Device Info
// =============================================================================

/// Key of the friendly device name in the device-info document
pub const FRIENDLY_DEVICE_NAME: &str = "friendly-device-name";
/// Key of the model name in the device-info document
pub const FRIENDLY_MODEL_NAME: &str = "friendly-model-name";
/// Power state key; its value changes underneath us so it is never cached
pub const POWER_MODE: &str = "power-mode";
pub const IS_TV: &str = "is-tv";
pub const IS_STICK: &str = "is-stick";

/// The `query/device-info` document as a flat key/value map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceInfo {
    fields: HashMap<String, String>,
}

impl DeviceInfo {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Interpret a field as a boolean ("true" in any case)
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

/// Coarse device class, derived from `is-tv` / `is-stick`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Tv,
    Stick,
    Unknown,
}

impl DeviceClass {
    pub fn from_info(info: &DeviceInfo) -> Self {
        if info.flag(IS_TV) {
            DeviceClass::Tv
        } else if info.flag(IS_STICK) {
            DeviceClass::Stick
        } else {
            DeviceClass::Unknown
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Tv => write!(f, "TV"),
            DeviceClass::Stick => write!(f, "Stick"),
            DeviceClass::Unknown => write!(f, "unknown"),
        }
    }
}

// =============================================================================
// Output Models
// =============================================================================

/// A resolved device as reported by `discover`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub class: DeviceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_on: Option<bool>,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} ({} {}) - {}", self.name, model, self.class, self.url),
            None => write!(f, "{} ({}) - {}", self.name, self.class, self.url),
        }
    }
}
