//! Registration bridge
//!
//! Moves discovered devices from discovery tasks to the foreground loop.
//! The producer side never blocks; the channel itself is the wake-up signal
//! the foreground waits on (or polls once per tick).

use tokio::sync::mpsc;
use tracing::debug;

use crate::device::DeviceDescriptor;
use crate::discovery::engine::SessionId;

/// A discovered device tagged with the sweep that found it
#[derive(Debug)]
pub struct Registration {
    pub session: SessionId,
    pub descriptor: DeviceDescriptor,
}

/// Create a connected publisher / mailbox pair
pub fn registration_bridge() -> (Publisher, Mailbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Publisher { tx }, Mailbox { rx })
}

/// Producer half, cloned into discovery callbacks
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::UnboundedSender<Registration>,
}

impl Publisher {
    /// Queue a descriptor for the foreground. Returns false once the
    /// mailbox has been dropped.
    pub fn publish(&self, session: SessionId, descriptor: DeviceDescriptor) -> bool {
        debug!("publishing {} from {}", descriptor.base_url(), session);
        self.tx
            .send(Registration {
                session,
                descriptor,
            })
            .is_ok()
    }
}

/// Consumer half, owned by the foreground
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::UnboundedReceiver<Registration>,
}

impl Mailbox {
    /// Pop the next pending registration without waiting
    pub fn drain(&mut self) -> Option<Registration> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next registration. Returns None when every publisher
    /// is gone and the queue is empty.
    pub async fn recv(&mut self) -> Option<Registration> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EcpClient;

    fn descriptor(url: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(EcpClient::new(), url)
    }

    #[test]
    fn test_drain_empty() {
        let (_publisher, mut mailbox) = registration_bridge();
        assert!(mailbox.drain().is_none());
    }

    #[test]
    fn test_fifo_order_preserved() {
        let (publisher, mut mailbox) = registration_bridge();
        let session = SessionId::new(1);
        for i in 1..=5 {
            assert!(publisher.publish(session, descriptor(&format!("http://10.0.0.{}:8060/", i))));
        }

        let urls: Vec<String> = std::iter::from_fn(|| mailbox.drain())
            .map(|r| r.descriptor.base_url().to_string())
            .collect();
        assert_eq!(
            urls,
            (1..=5)
                .map(|i| format!("http://10.0.0.{}:8060/", i))
                .collect::<Vec<_>>()
        );
        assert!(mailbox.drain().is_none());
    }

    #[test]
    fn test_publish_after_mailbox_dropped() {
        let (publisher, mailbox) = registration_bridge();
        drop(mailbox);
        assert!(!publisher.publish(SessionId::new(1), descriptor("http://h/")));
    }

    #[tokio::test]
    async fn test_publish_from_other_thread_wakes_receiver() {
        let (publisher, mut mailbox) = registration_bridge();
        let handle = std::thread::spawn(move || {
            publisher.publish(SessionId::new(7), descriptor("http://10.0.0.9:8060/"));
        });

        let registration = mailbox.recv().await.unwrap();
        assert_eq!(registration.session, SessionId::new(7));
        assert_eq!(registration.descriptor.base_url(), "http://10.0.0.9:8060/");

        handle.join().unwrap();
        // Publisher dropped with the thread: channel closes
        assert!(mailbox.recv().await.is_none());
    }
}
