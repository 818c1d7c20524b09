//! rokuremote - remote control for Roku devices
//!
//! Finds devices on the local network with SSDP and drives them through
//! their External Control Protocol (ECP) REST API, from an interactive
//! terminal remote or from scriptable subcommands.
//!
//! # Modules
//!
//! - `models` - Keys, inputs, device-info documents
//! - `api` - ECP client and device-info parsing
//! - `device` - A discovered device with cached info
//! - `discovery` - SSDP sweeps, sessions, and the registration bridge
//! - `remote` - Device list, selection, and timers for the interactive remote
//! - `cli` / `commands` - Scriptable subcommands
//! - `ui` - TUI components

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod discovery;
pub mod logging;
pub mod models;
pub mod remote;
pub mod ui;

// Re-export commonly used types
pub use api::{EcpClient, EcpError, KeyAction};
pub use config::{ChannelPreset, Config};
pub use device::{DescriptorError, DeviceDescriptor};
pub use discovery::{DiscoveryEngine, DiscoveryError, Registration, SessionId};
pub use models::{DeviceClass, DeviceInfo, DeviceSummary, InputSource, Key};
pub use remote::{RegisterOutcome, Remote, RemoteSettings};
