//! Device discovery
//!
//! - SSDP: M-SEARCH construction and response parsing
//! - Engine: background sweeps with session tracking
//! - Bridge: hands discovered devices to the foreground loop

pub mod bridge;
pub mod engine;
pub mod ssdp;

pub use bridge::{registration_bridge, Mailbox, Publisher, Registration};
pub use engine::{
    DiscoveryEngine, DiscoveryError, DiscoveryReply, SessionId, SweepHandle, SweepReport,
};
pub use ssdp::ROKU_SEARCH_TARGET;

use tracing::debug;

use crate::api::EcpClient;
use crate::device::DeviceDescriptor;

/// Sweep callback that turns each reply into a descriptor and publishes it.
/// Replies without a usable LOCATION are skipped.
pub fn publishing_callback(
    client: EcpClient,
    publisher: Publisher,
) -> impl Fn(DiscoveryReply) + Send + Sync + 'static {
    move |reply: DiscoveryReply| {
        match DeviceDescriptor::from_headers(client.clone(), &reply.headers) {
            Ok(descriptor) => {
                publisher.publish(reply.session, descriptor);
            }
            Err(e) => debug!("ignoring reply from {}: {}", reply.from, e),
        }
    }
}
