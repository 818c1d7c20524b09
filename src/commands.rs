//! CLI Command Handlers
//!
//! Implements all CLI commands on top of discovery and the ECP client.
//! Each handler takes CLI args and Output, returns ExitCode.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{EcpClient, EcpError, KeyAction};
use crate::cli::{
    CommandOk, DiscoverCmd, ExitCode, InfoCmd, InputCmd, KeyCmd, LaunchCmd, Output, PowerCmd,
    PowerState, TypeCmd,
};
use crate::config::Config;
use crate::device::DeviceDescriptor;
use crate::discovery::{publishing_callback, registration_bridge, DiscoveryEngine, DiscoveryReply};
use crate::models::{DeviceSummary, InputSource, Key};

/// Extra time allowed after the listen window for name lookups
const RESOLVE_GRACE: Duration = Duration::from_secs(6);

/// Shared context for commands that talk to one device
pub struct Context {
    pub config: Config,
    pub engine: DiscoveryEngine,
    pub client: EcpClient,
    /// Device requested with --device
    pub device: Option<String>,
}

impl Context {
    pub fn new(config: Config, device: Option<String>) -> Self {
        Self {
            config,
            engine: DiscoveryEngine::new(),
            client: EcpClient::new(),
            device,
        }
    }

    /// Explicit --device, else the configured default
    fn wanted_device(&self) -> Option<&str> {
        self.device
            .as_deref()
            .or(self.config.default_device.as_deref())
            .filter(|d| !d.trim().is_empty())
    }
}

/// Map a control error onto an exit code
fn ecp_exit_code(e: &EcpError) -> ExitCode {
    match e {
        EcpError::RequestFailed(_) => ExitCode::NetworkError,
        EcpError::Status(_) => ExitCode::CommandFailed,
        EcpError::InvalidDocument(_) | EcpError::MissingField(_) => ExitCode::Error,
    }
}

fn is_url(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// =============================================================================
// Device Resolution
// =============================================================================

/// Find the device to control.
///
/// A base URL is used as-is. A name (or no name at all) runs a discovery
/// sweep and takes the first device whose friendly name matches (or the
/// first device found).
pub async fn resolve_device(
    ctx: &Context,
    output: &Output,
) -> Result<DeviceDescriptor, ExitCode> {
    let wanted = ctx.wanted_device();

    if let Some(url) = wanted.filter(|w| is_url(w)) {
        debug!("using device at {}", url);
        return Ok(DeviceDescriptor::new(ctx.client.clone(), url));
    }

    match wanted {
        Some(name) => output.info(format!("Looking for {}...", name)),
        None => output.info("Looking for a device..."),
    }

    let timeout = ctx.config.discovery_timeout();
    let (publisher, mut mailbox) = registration_bridge();
    let callback = publishing_callback(ctx.client.clone(), publisher);

    let handle = match ctx
        .engine
        .start_discovery(ctx.config.search_target(), timeout, callback, true)
    {
        Ok(Some(handle)) => handle,
        Ok(None) => {
            return Err(output.error("Discovery is already running", ExitCode::Error));
        }
        Err(e) => {
            return Err(output.error(format!("Discovery failed: {}", e), ExitCode::NetworkError));
        }
    };

    // The mailbox closes once the sweep ends and drops its publisher
    let search = async {
        while let Some(registration) = mailbox.recv().await {
            let mut descriptor = registration.descriptor;
            let name = match descriptor.name().await {
                Ok(name) => name,
                Err(e) => {
                    warn!("could not query {}: {}", descriptor.base_url(), e);
                    continue;
                }
            };
            match wanted {
                Some(w) if !w.eq_ignore_ascii_case(&name) => {
                    debug!("skipping {} ({})", name, descriptor.base_url());
                }
                _ => return Some(descriptor),
            }
        }
        None
    };

    let found = tokio::time::timeout(timeout + RESOLVE_GRACE, search)
        .await
        .ok()
        .flatten();

    // Cut the sweep short once we have what we need
    if ctx.engine.current_session() == Some(handle.session()) {
        ctx.engine.stop_discovery();
    }

    match found {
        Some(descriptor) => Ok(descriptor),
        None => {
            let msg = match wanted {
                Some(name) => format!("Device not found: {}", name),
                None => "No devices found".to_string(),
            };
            Err(output.error(msg, ExitCode::DeviceNotFound))
        }
    }
}

/// Display label for a resolved device
fn device_label(device: &DeviceDescriptor) -> String {
    device
        .cached_name()
        .unwrap_or(device.base_url())
        .to_string()
}

fn print_ok(output: &Output, device: &DeviceDescriptor, sent: Vec<String>) -> ExitCode {
    let result = CommandOk {
        status: "ok".to_string(),
        device: device_label(device),
        sent,
    };
    if output.json {
        if let Err(e) = output.print(&result) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        output.info(format!("✓ {} ({})", result.sent.join(" "), result.device));
    }
    ExitCode::Success
}

// =============================================================================
// Discover Command
// =============================================================================

/// Raw discovery reply for `discover --raw`
#[derive(Debug, Serialize)]
pub struct RawReply {
    pub from: String,
    pub headers: BTreeMap<String, String>,
}

pub async fn discover_cmd(cmd: DiscoverCmd, ctx: &Context, output: &Output) -> ExitCode {
    let timeout = match cmd.timeout {
        Some(0) => return output.error("Timeout must be positive", ExitCode::InvalidArgs),
        Some(secs) => Duration::from_secs(secs),
        None => ctx.config.discovery_timeout(),
    };
    let target = cmd
        .target
        .as_deref()
        .unwrap_or(ctx.config.search_target())
        .to_string();

    output.info(format!(
        "Discovering {} devices ({}s)...",
        target,
        timeout.as_secs()
    ));

    if cmd.raw {
        return discover_raw(ctx, &target, timeout, output).await;
    }

    let (publisher, mut mailbox) = registration_bridge();
    let callback = publishing_callback(ctx.client.clone(), publisher);
    let report = match ctx.engine.start_discovery(&target, timeout, callback, true) {
        Ok(Some(handle)) => handle.wait().await,
        Ok(None) => return output.error("Discovery is already running", ExitCode::Error),
        Err(e) => return output.error(format!("Discovery failed: {}", e), ExitCode::InvalidArgs),
    };
    if let Err(e) = report {
        return output.error(format!("Discovery failed: {}", e), ExitCode::NetworkError);
    }

    let mut devices: Vec<DeviceSummary> = Vec::new();
    while let Some(registration) = mailbox.drain() {
        let mut descriptor = registration.descriptor;
        match descriptor.summary().await {
            Ok(summary) => {
                if devices.iter().any(|d| d.name == summary.name) {
                    debug!("{} is already listed", summary.name);
                    continue;
                }
                devices.push(summary);
            }
            Err(e) => warn!("could not query {}: {}", descriptor.base_url(), e),
        }
    }

    if devices.is_empty() {
        output.info("No devices found");
    }
    if let Err(e) = output.print_lines(&devices) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

/// Sweep callback that queues raw replies for listing
fn raw_collector() -> (
    impl Fn(DiscoveryReply) -> bool + Send + Sync + 'static,
    mpsc::UnboundedReceiver<DiscoveryReply>,
) {
    let (tx, rx) = mpsc::unbounded_channel::<DiscoveryReply>();
    let collect = move |reply: DiscoveryReply| {
        let queued = tx.send(reply).is_ok();
        if !queued {
            debug!("raw reply dropped, listing already closed");
        }
        queued
    };
    (collect, rx)
}

async fn discover_raw(ctx: &Context, target: &str, timeout: Duration, output: &Output) -> ExitCode {
    let (collect, mut rx) = raw_collector();
    let callback = move |reply: DiscoveryReply| {
        collect(reply);
    };

    let report = match ctx.engine.start_discovery(target, timeout, callback, true) {
        Ok(Some(handle)) => handle.wait().await,
        Ok(None) => return output.error("Discovery is already running", ExitCode::Error),
        Err(e) => return output.error(format!("Discovery failed: {}", e), ExitCode::InvalidArgs),
    };
    if let Err(e) = report {
        return output.error(format!("Discovery failed: {}", e), ExitCode::NetworkError);
    }

    let mut replies = Vec::new();
    while let Ok(reply) = rx.try_recv() {
        replies.push(RawReply {
            from: reply.from.to_string(),
            headers: reply.headers.into_iter().collect(),
        });
    }

    if let Err(e) = output.print(&replies) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Key Command
// =============================================================================

pub async fn key_cmd(cmd: KeyCmd, ctx: &Context, output: &Output) -> ExitCode {
    let device = match resolve_device(ctx, output).await {
        Ok(d) => d,
        Err(code) => return code,
    };

    let action = KeyAction::from(cmd.action);
    let mut sent = Vec::new();
    for key in cmd.keys {
        let ok = match action {
            KeyAction::Press => device.send_keypress(key).await,
            KeyAction::Down => device.send_keydown(key).await,
            KeyAction::Up => device.send_keyup(key).await,
        };
        if !ok {
            return output.error(
                format!("{} rejected key {}", device_label(&device), key),
                ExitCode::CommandFailed,
            );
        }
        sent.push(key.to_string());
    }

    print_ok(output, &device, sent)
}

// =============================================================================
// Type Command
// =============================================================================

pub async fn type_cmd(cmd: TypeCmd, ctx: &Context, output: &Output) -> ExitCode {
    let device = match resolve_device(ctx, output).await {
        Ok(d) => d,
        Err(code) => return code,
    };

    let mut sent = Vec::new();
    for ch in cmd.text.chars() {
        let keysym = match ch {
            '\n' | '\r' => "Return".to_string(),
            '\u{8}' => "BackSpace".to_string(),
            c => c.to_string(),
        };
        if !device.send_char(Some(ch), &keysym).await {
            return output.error(
                format!("{} rejected character {:?}", device_label(&device), ch),
                ExitCode::CommandFailed,
            );
        }
        sent.push(ch.to_string());
    }

    if cmd.enter {
        if !device.send_keypress(Key::Select).await {
            return output.error(
                format!("{} rejected key {}", device_label(&device), Key::Select),
                ExitCode::CommandFailed,
            );
        }
        sent.push(Key::Select.to_string());
    }

    print_ok(output, &device, sent)
}

// =============================================================================
// Launch Command
// =============================================================================

pub async fn launch_cmd(cmd: LaunchCmd, ctx: &Context, output: &Output) -> ExitCode {
    let channel = cmd.channel_id.trim();
    if channel.is_empty() {
        return output.error("Channel id must not be empty", ExitCode::InvalidArgs);
    }

    let device = match resolve_device(ctx, output).await {
        Ok(d) => d,
        Err(code) => return code,
    };

    if !device.launch_channel(channel).await {
        return output.error(
            format!("{} could not launch channel {}", device_label(&device), channel),
            ExitCode::CommandFailed,
        );
    }
    print_ok(output, &device, vec![format!("launch/{}", channel)])
}

// =============================================================================
// Info Command
// =============================================================================

pub async fn info_cmd(cmd: InfoCmd, ctx: &Context, output: &Output) -> ExitCode {
    let mut device = match resolve_device(ctx, output).await {
        Ok(d) => d,
        Err(code) => return code,
    };

    if let Some(field) = cmd.field {
        return match device.query_device_info(&field).await {
            Ok(value) => {
                if output.json {
                    let mut map = BTreeMap::new();
                    map.insert(field, value);
                    if let Err(e) = output.print(&map) {
                        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                    }
                } else {
                    println!("{}", value);
                }
                ExitCode::Success
            }
            Err(e) => output.error(format!("Info failed: {}", e), ecp_exit_code(&e)),
        };
    }

    match device.device_info().await {
        Ok(info) => {
            let fields: BTreeMap<&String, &String> = info.fields().iter().collect();
            if output.json {
                if let Err(e) = output.print(&fields) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                for (key, value) in fields {
                    println!("{}: {}", key, value);
                }
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Info failed: {}", e), ecp_exit_code(&e)),
    }
}

// =============================================================================
// Power Command
// =============================================================================

pub async fn power_cmd(cmd: PowerCmd, ctx: &Context, output: &Output) -> ExitCode {
    let mut device = match resolve_device(ctx, output).await {
        Ok(d) => d,
        Err(code) => return code,
    };

    let (sent, key) = match cmd.state {
        PowerState::On => (device.send_keypress(Key::PowerOn).await, Key::PowerOn),
        PowerState::Off => (device.send_keypress(Key::PowerOff).await, Key::PowerOff),
        PowerState::Toggle => {
            // Read the state first so we can report which key went out
            let on = match device.is_power_on().await {
                Ok(on) => on,
                Err(e) => {
                    return output.error(format!("Power query failed: {}", e), ecp_exit_code(&e))
                }
            };
            let key = if on { Key::PowerOff } else { Key::PowerOn };
            (device.send_keypress(key).await, key)
        }
    };

    if !sent {
        return output.error(
            format!("{} rejected key {}", device_label(&device), key),
            ExitCode::CommandFailed,
        );
    }
    print_ok(output, &device, vec![key.to_string()])
}

// =============================================================================
// Input Command
// =============================================================================

pub async fn input_cmd(cmd: InputCmd, ctx: &Context, output: &Output) -> ExitCode {
    let device = match resolve_device(ctx, output).await {
        Ok(d) => d,
        Err(code) => return code,
    };

    let input = InputSource::from(cmd.source);
    if !device.send_keypress(input.key()).await {
        return output.error(
            format!("{} could not switch to {}", device_label(&device), input),
            ExitCode::CommandFailed,
        );
    }
    print_ok(output, &device, vec![input.key().to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SessionId;

    #[test]
    fn test_is_url() {
        assert!(is_url("http://10.0.0.5:8060/"));
        assert!(is_url(" HTTPS://roku.local "));
        assert!(!is_url("Living Room"));
    }

    #[test]
    fn test_wanted_device_prefers_flag_over_config() {
        let config = Config {
            default_device: Some("Bedroom".to_string()),
            ..Default::default()
        };
        let ctx = Context::new(config.clone(), Some("Den".to_string()));
        assert_eq!(ctx.wanted_device(), Some("Den"));

        let ctx = Context::new(config, None);
        assert_eq!(ctx.wanted_device(), Some("Bedroom"));

        let ctx = Context::new(Config::default(), Some(" ".to_string()));
        assert_eq!(ctx.wanted_device(), None);
    }

    fn reply(port: u16) -> DiscoveryReply {
        DiscoveryReply {
            session: SessionId::new(1),
            from: std::net::SocketAddr::from(([10, 0, 0, 5], port)),
            headers: [("LOCATION".to_string(), "http://10.0.0.5:8060/".to_string())].into(),
        }
    }

    #[test]
    fn test_raw_collector_queues_replies() {
        let (collect, mut rx) = raw_collector();
        assert!(collect(reply(1900)));
        assert!(collect(reply(1901)));
        assert_eq!(rx.try_recv().unwrap().from.port(), 1900);
        assert_eq!(rx.try_recv().unwrap().from.port(), 1901);
    }

    #[test]
    fn test_raw_collector_after_listing_closed() {
        let (collect, rx) = raw_collector();
        drop(rx);
        assert!(!collect(reply(1900)));
    }

    #[test]
    fn test_ecp_exit_codes() {
        assert_eq!(ecp_exit_code(&EcpError::Status(500)), ExitCode::CommandFailed);
        assert_eq!(
            ecp_exit_code(&EcpError::MissingField("x".to_string())),
            ExitCode::Error
        );
    }
}
