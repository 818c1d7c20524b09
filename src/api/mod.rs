//! Device control API
//!
//! - ECP: key presses, channel launches and device-info queries
//! - Device info: parser for the `query/device-info` document

pub mod device_info;
pub mod ecp;

pub use ecp::{EcpClient, EcpError, KeyAction};
