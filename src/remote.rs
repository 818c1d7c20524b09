//! Remote state and foreground logic
//!
//! Owns the device list and the current selection, consumes registrations
//! coming out of discovery, and turns user actions into control requests.
//! Everything here runs on the foreground loop; discovery tasks only talk to
//! it through the registration bridge.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::api::EcpClient;
use crate::config::Config;
use crate::device::DeviceDescriptor;
use crate::discovery::{
    publishing_callback, registration_bridge, DiscoveryEngine, Mailbox, Publisher, Registration,
    SessionId,
};
use crate::models::{InputSource, Key};

/// Outcome of handing one registration to the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New device added to the list
    Added { name: String, selected: bool },
    /// A device with this name is already listed
    Duplicate(String),
    /// Came from a sweep older than the last forced rediscovery
    Stale(SessionId),
    /// The device did not answer the name query
    Unreachable(String),
}

/// Timing and discovery settings for the remote
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub search_target: String,
    pub discovery_timeout: Duration,
    pub power_poll_interval: Duration,
    pub rediscover_interval: Duration,
}

impl From<&Config> for RemoteSettings {
    fn from(config: &Config) -> Self {
        Self {
            search_target: config.search_target().to_string(),
            discovery_timeout: config.discovery_timeout(),
            power_poll_interval: config.power_poll_interval(),
            rediscover_interval: config.rediscover_interval(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Foreground remote-control state
pub struct Remote {
    settings: RemoteSettings,
    engine: DiscoveryEngine,
    client: EcpClient,
    publisher: Publisher,
    mailbox: Mailbox,

    /// Devices in registration order
    devices: Vec<DeviceDescriptor>,
    /// Index into `devices`
    selected: Option<usize>,
    /// Registrations from sessions older than this are ignored
    accept_from: Option<SessionId>,
    /// Last known power state of the selected device
    power: Option<bool>,
    /// Status line for display
    pub status: String,

    next_power_poll: Option<Instant>,
    next_rediscover: Instant,
}

impl Remote {
    pub fn new(settings: RemoteSettings, engine: DiscoveryEngine, client: EcpClient) -> Self {
        let (publisher, mailbox) = registration_bridge();
        let next_rediscover = Instant::now() + settings.rediscover_interval;
        Self {
            settings,
            engine,
            client,
            publisher,
            mailbox,
            devices: Vec::new(),
            selected: None,
            accept_from: None,
            power: None,
            status: "discovering...".to_string(),
            next_power_poll: None,
            next_rediscover,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Friendly names in list order
    pub fn device_names(&self) -> Vec<&str> {
        self.devices.iter().filter_map(|d| d.cached_name()).collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&DeviceDescriptor> {
        self.selected.and_then(|i| self.devices.get(i))
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected().and_then(|d| d.cached_name())
    }

    pub fn power(&self) -> Option<bool> {
        self.power
    }

    pub fn is_discovering(&self) -> bool {
        self.engine.is_busy()
    }

    /// Publisher feeding this remote's mailbox
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Start a discovery sweep.
    ///
    /// A forced sweep forgets every known device and ignores anything the
    /// previous sweeps still deliver. Returns the new session, or None when
    /// a sweep is already running (unforced) or could not start.
    pub fn discover(&mut self, force: bool) -> Option<SessionId> {
        debug!("discover(force={})", force);

        let callback = publishing_callback(self.client.clone(), self.publisher.clone());
        let handle = match self.engine.start_discovery(
            &self.settings.search_target,
            self.settings.discovery_timeout,
            callback,
            force,
        ) {
            Ok(Some(handle)) => handle,
            Ok(None) => return None,
            Err(e) => {
                error!("could not start discovery: {}", e);
                self.status = format!("discovery failed: {}", e);
                return None;
            }
        };

        let session = handle.session();
        if force {
            self.devices.clear();
            self.selected = None;
            self.power = None;
            self.next_power_poll = None;
            self.accept_from = Some(session);
        }
        self.status = "discovering...".to_string();
        Some(session)
    }

    /// Handle every registration waiting in the mailbox
    pub async fn drain_registrations(&mut self) -> Vec<RegisterOutcome> {
        let mut outcomes = Vec::new();
        while let Some(registration) = self.mailbox.drain() {
            outcomes.push(self.register(registration).await);
        }
        outcomes
    }

    /// Add a discovered device unless it is stale or already known.
    /// The first device added while nothing is selected becomes the
    /// selection.
    pub async fn register(&mut self, registration: Registration) -> RegisterOutcome {
        let Registration {
            session,
            mut descriptor,
        } = registration;

        if self.accept_from.is_some_and(|floor| session < floor) {
            debug!(
                "ignoring {} from stale {}",
                descriptor.base_url(),
                session
            );
            return RegisterOutcome::Stale(session);
        }

        let name = match descriptor.name().await {
            Ok(name) => name,
            Err(e) => {
                warn!("could not query {}: {}", descriptor.base_url(), e);
                return RegisterOutcome::Unreachable(descriptor.base_url().to_string());
            }
        };

        if self.devices.iter().any(|d| d.cached_name() == Some(name.as_str())) {
            info!("Roku {} is already registered", name);
            return RegisterOutcome::Duplicate(name);
        }

        info!("registering {} at {}", name, descriptor.base_url());
        self.devices.push(descriptor);

        let selected = self.selected.is_none();
        if selected {
            self.select(self.devices.len() - 1).await;
        } else {
            self.status = format!("found {}", name);
        }

        RegisterOutcome::Added { name, selected }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    async fn select(&mut self, index: usize) {
        if index >= self.devices.len() {
            return;
        }
        self.selected = Some(index);
        if let Some(name) = self.selected_name() {
            self.status = format!("selected {}", name);
        }
        self.poll_power().await;
    }

    /// Select a device by friendly name. Returns false if unknown.
    pub async fn select_by_name(&mut self, name: &str) -> bool {
        match self
            .devices
            .iter()
            .position(|d| d.cached_name() == Some(name))
        {
            Some(index) => {
                self.select(index).await;
                true
            }
            None => false,
        }
    }

    pub async fn select_next(&mut self) {
        if self.devices.is_empty() {
            return;
        }
        let next = self.selected.map(|i| (i + 1) % self.devices.len()).unwrap_or(0);
        self.select(next).await;
    }

    pub async fn select_prev(&mut self) {
        if self.devices.is_empty() {
            return;
        }
        let len = self.devices.len();
        let prev = self.selected.map(|i| (i + len - 1) % len).unwrap_or(0);
        self.select(prev).await;
    }

    // =========================================================================
    // Power / timers
    // =========================================================================

    /// Refresh the selected device's power state. A device that stops
    /// answering triggers a forced rediscovery.
    pub async fn poll_power(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        let result = match self.devices.get_mut(index) {
            Some(device) => device.is_power_on().await,
            None => return,
        };

        match result {
            Ok(on) => {
                debug!("power is {}", if on { "on" } else { "off" });
                self.power = Some(on);
                self.next_power_poll = Some(Instant::now() + self.settings.power_poll_interval);
            }
            Err(e) => {
                error!(
                    "{}: power query failed ({}), rediscovering",
                    self.selected_name().unwrap_or("device"),
                    e
                );
                self.discover(true);
            }
        }
    }

    /// Run timers that are due: power polling and periodic rediscovery
    pub async fn tick(&mut self, now: Instant) {
        if self.next_power_poll.is_some_and(|due| now >= due) {
            self.poll_power().await;
        }
        if now >= self.next_rediscover {
            self.next_rediscover = now + self.settings.rediscover_interval;
            self.discover(false);
        }
    }

    // =========================================================================
    // Actions (no-ops without a selected device)
    // =========================================================================

    pub async fn press(&self, key: Key) -> bool {
        match self.selected() {
            Some(device) => device.send_keypress(key).await,
            None => false,
        }
    }

    pub async fn type_char(&self, ch: Option<char>, keysym: &str) -> bool {
        match self.selected() {
            Some(device) => device.send_char(ch, keysym).await,
            None => false,
        }
    }

    pub async fn launch(&self, channel_id: &str) -> bool {
        match self.selected() {
            Some(device) => device.launch_channel(channel_id).await,
            None => false,
        }
    }

    pub async fn switch_input(&self, input: InputSource) -> bool {
        self.press(input.key()).await
    }

    /// Toggle power on the selected device and refresh the power state
    pub async fn toggle_power(&mut self) -> bool {
        let Some(index) = self.selected else {
            return false;
        };
        let sent = match self.devices.get_mut(index) {
            Some(device) => device.toggle_power().await,
            None => return false,
        };

        match sent {
            Ok(sent) => {
                self.poll_power().await;
                sent
            }
            Err(e) => {
                error!("power toggle failed: {}", e);
                self.discover(true);
                false
            }
        }
    }
}
