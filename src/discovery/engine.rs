//! Discovery engine
//!
//! One sweep = one M-SEARCH multicast followed by a bounded listen window.
//! Each sweep runs as its own tokio task and is identified by a
//! [`SessionId`]. The engine tracks the single active session; starting a
//! sweep while one is active is refused unless forced, and a forced start
//! supersedes the running sweep, which notices and stops reporting.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::discovery::ssdp::{build_msearch, multicast_target, parse_response};

/// Receive buffer size; SSDP replies are far smaller
const RECV_BUFFER_SIZE: usize = 8192;

/// Multicast hop limit for the M-SEARCH
const MULTICAST_TTL: u32 = 2;

/// Identity of one discovery sweep. Later sweeps have larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session #{}", self.0)
    }
}

/// Discovery error types
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Discovery timeout must be positive")]
    InvalidTimeout,

    #[error("Search target must not be empty")]
    EmptySearchTarget,

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),

    #[error("Discovery task failed: {0}")]
    Task(String),
}

/// One well-formed reply, as handed to the sweep callback
#[derive(Debug, Clone)]
pub struct DiscoveryReply {
    pub session: SessionId,
    pub from: SocketAddr,
    /// Upper-cased header name to value, last value wins
    pub headers: HashMap<String, String>,
}

/// Outcome of a finished sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub session: SessionId,
    /// Callback invocations
    pub replies: usize,
    /// Datagrams that did not parse as responses
    pub dropped: usize,
    /// True when a forced restart cut this sweep short
    pub superseded: bool,
}

/// Handle to a running sweep
#[derive(Debug)]
pub struct SweepHandle {
    session: SessionId,
    task: JoinHandle<Result<SweepReport, DiscoveryError>>,
}

impl SweepHandle {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Wait for the sweep to end
    pub async fn wait(self) -> Result<SweepReport, DiscoveryError> {
        self.task
            .await
            .map_err(|e| DiscoveryError::Task(e.to_string()))?
    }
}

/// SSDP discovery engine
#[derive(Debug, Clone)]
pub struct DiscoveryEngine {
    /// Active session, None when idle
    active: Arc<watch::Sender<Option<SessionId>>>,
    next_id: Arc<AtomicU64>,
    bind_addr: Option<IpAddr>,
    target: SocketAddr,
}

impl DiscoveryEngine {
    /// Engine that multicasts to the standard SSDP group from the local
    /// outbound address
    pub fn new() -> Self {
        let (active, _) = watch::channel(None);
        Self {
            active: Arc::new(active),
            next_id: Arc::new(AtomicU64::new(0)),
            bind_addr: None,
            target: multicast_target(),
        }
    }

    /// Send the M-SEARCH to a different address (for testing)
    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    /// Bind sweeps to a fixed local address instead of the outbound one
    pub fn with_bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Session currently running, if any
    pub fn current_session(&self) -> Option<SessionId> {
        *self.active.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.current_session().is_some()
    }

    /// Start a sweep in the background.
    ///
    /// Returns `Ok(None)` without any network traffic when a sweep is
    /// already running and `force` is false. With `force`, the running
    /// sweep is superseded and its remaining replies are discarded.
    /// `callback` runs on the sweep task, once per well-formed reply.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_discovery<F>(
        &self,
        search_target: &str,
        timeout: Duration,
        callback: F,
        force: bool,
    ) -> Result<Option<SweepHandle>, DiscoveryError>
    where
        F: Fn(DiscoveryReply) + Send + Sync + 'static,
    {
        if timeout.is_zero() {
            return Err(DiscoveryError::InvalidTimeout);
        }
        if search_target.trim().is_empty() {
            return Err(DiscoveryError::EmptySearchTarget);
        }

        debug!(
            "discover({}, force={}, timeout={:?})",
            search_target, force, timeout
        );

        let session = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let started = self.active.send_if_modified(|active| {
            if active.is_some() && !force {
                return false;
            }
            if let Some(previous) = active {
                info!("forcing discovery: {} superseded by {}", previous, session);
            }
            *active = Some(session);
            true
        });

        if !started {
            info!("discovery already in progress");
            return Ok(None);
        }

        let sweep = Sweep {
            session,
            search_target: search_target.to_string(),
            timeout,
            bind_addr: self.bind_addr,
            target: self.target,
        };
        let active = Arc::clone(&self.active);
        let watcher = self.active.subscribe();

        let task = tokio::spawn(async move {
            let result = sweep.run(callback, watcher).await;

            active.send_if_modified(|current| {
                if *current == Some(session) {
                    *current = None;
                    true
                } else {
                    false
                }
            });

            match &result {
                Ok(report) => info!(
                    "stopping discovery {} ({} replies, {} dropped)",
                    session, report.replies, report.dropped
                ),
                Err(e) => error!("discovery {} failed: {}", session, e),
            }
            result
        });

        Ok(Some(SweepHandle { session, task }))
    }

    /// Stop the running sweep, if any. It closes its socket and delivers
    /// nothing further.
    pub fn stop_discovery(&self) -> Option<SessionId> {
        let mut stopped = None;
        self.active.send_if_modified(|active| {
            stopped = active.take();
            stopped.is_some()
        });
        if let Some(session) = stopped {
            info!("stopping discovery {} on request", session);
        }
        stopped
    }
}

impl Default for DiscoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of one sweep, moved into its task
struct Sweep {
    session: SessionId,
    search_target: String,
    timeout: Duration,
    bind_addr: Option<IpAddr>,
    target: SocketAddr,
}

impl Sweep {
    async fn run<F>(
        self,
        callback: F,
        mut watcher: watch::Receiver<Option<SessionId>>,
    ) -> Result<SweepReport, DiscoveryError>
    where
        F: Fn(DiscoveryReply),
    {
        let bind_ip = self.bind_addr.unwrap_or_else(local_outbound_addr);
        info!(
            "discovery {} running, ip address is {}",
            self.session, bind_ip
        );

        let deadline = tokio::time::Instant::now() + self.timeout;
        let socket = open_socket(bind_ip)?;

        // MX is whole seconds, at least 1
        let mx = self.timeout.as_secs_f64().ceil().max(1.0) as u64;
        let request = build_msearch(self.target, &self.search_target, mx);
        socket.send_to(request.as_bytes(), self.target).await?;
        debug!("M-SEARCH sent to {} (ST={}, MX={})", self.target, self.search_target, mx);
        trace!("M-SEARCH payload:\n{}", request);

        let mut report = SweepReport {
            session: self.session,
            replies: 0,
            dropped: 0,
            superseded: false,
        };
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,

                changed = watcher.changed() => {
                    if changed.is_err() || *watcher.borrow_and_update() != Some(self.session) {
                        debug!("{} superseded, closing socket", self.session);
                        report.superseded = true;
                        break;
                    }
                }

                received = socket.recv_from(&mut buf) => {
                    let (n, from) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("discovery receive error: {}", e);
                            continue;
                        }
                    };

                    let data = String::from_utf8_lossy(&buf[..n]);
                    match parse_response(&data) {
                        Ok(response) => {
                            if *watcher.borrow() != Some(self.session) {
                                report.superseded = true;
                                break;
                            }
                            debug!(
                                "received response from {}: status {} {}",
                                from, response.status_code, response.reason
                            );
                            for (name, value) in &response.headers {
                                debug!("header: ({}, {})", name, value);
                            }
                            report.replies += 1;
                            callback(DiscoveryReply {
                                session: self.session,
                                from,
                                headers: response.header_map(),
                            });
                        }
                        Err(e) => {
                            report.dropped += 1;
                            trace!("dropping datagram from {}: {}", from, e);
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Local address used to reach the network, falling back to all
/// interfaces when it cannot be determined
fn local_outbound_addr() -> IpAddr {
    match local_ip_address::local_ip() {
        Ok(ip @ IpAddr::V4(_)) => ip,
        Ok(ip) => {
            warn!("local address {} is not IPv4, binding to all interfaces", ip);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
        Err(e) => {
            warn!("could not determine local address ({}), binding to all interfaces", e);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }
}

/// UDP socket on an ephemeral port, ready to multicast
fn open_socket(bind_ip: IpAddr) -> io::Result<UdpSocket> {
    let domain = match bind_ip {
        IpAddr::V4(_) => Domain::IPV4,
        IpAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if bind_ip.is_ipv4() {
        socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
    }
    socket.bind(&SocketAddr::new(bind_ip, 0).into())?;
    socket.set_nonblocking(true)?;

    UdpSocket::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ordering_and_display() {
        assert!(SessionId::new(2) > SessionId::new(1));
        assert_eq!(SessionId::new(3).to_string(), "session #3");
        assert_eq!(SessionId::new(3).get(), 3);
    }

    #[tokio::test]
    async fn test_rejects_invalid_arguments() {
        let engine = DiscoveryEngine::new();
        assert!(matches!(
            engine.start_discovery("roku:ecp", Duration::ZERO, |_| {}, false),
            Err(DiscoveryError::InvalidTimeout)
        ));
        assert!(matches!(
            engine.start_discovery("  ", Duration::from_secs(1), |_| {}, false),
            Err(DiscoveryError::EmptySearchTarget)
        ));
        assert!(!engine.is_busy());
    }

    #[tokio::test]
    async fn test_idle_engine_reports_no_session() {
        let engine = DiscoveryEngine::new();
        assert_eq!(engine.current_session(), None);
        assert!(!engine.is_busy());
    }
}
