//! Discovery engine tests
//!
//! Sweeps run against fake devices on loopback: the engine is bound to
//! 127.0.0.1 and its M-SEARCH is aimed at a local UDP socket that answers
//! like a Roku would.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use rokuremote::api::EcpClient;
use rokuremote::discovery::{
    publishing_callback, registration_bridge, DiscoveryEngine, DiscoveryReply,
};

fn roku_reply(location: &str, serial: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Cache-Control: max-age=3600\r\n\
         ST: roku:ecp\r\n\
         USN: uuid:roku:ecp:{serial}\r\n\
         Ext: \r\n\
         Server: Roku/12.0.0 UPnP/1.0 Roku/12.0.0\r\n\
         LOCATION: {location}\r\n\
         \r\n"
    )
}

/// Local socket that waits for one M-SEARCH, sleeps `delay`, then sends
/// `replies` back to the sender. Resolves to the M-SEARCH text.
async fn fake_device(replies: Vec<String>, delay: Duration) -> (SocketAddr, JoinHandle<String>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        let (n, from) = socket.recv_from(&mut buf).await.unwrap();
        tokio::time::sleep(delay).await;
        for reply in replies {
            socket.send_to(reply.as_bytes(), from).await.unwrap();
        }
        String::from_utf8_lossy(&buf[..n]).to_string()
    });
    (addr, task)
}

/// Local socket that never answers and counts every datagram it receives
async fn counting_device() -> (SocketAddr, Arc<AtomicUsize>, JoinHandle<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    let task = tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        while socket.recv_from(&mut buf).await.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    (addr, received, task)
}

fn engine_for(device: SocketAddr) -> DiscoveryEngine {
    DiscoveryEngine::new()
        .with_bind_addr(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_target(device)
}

/// Callback that records every reply, plus the shared record
fn recorder() -> (
    impl Fn(DiscoveryReply) + Send + Sync + 'static,
    Arc<Mutex<Vec<DiscoveryReply>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (move |reply: DiscoveryReply| sink.lock().unwrap().push(reply), seen)
}

// =============================================================================
// Single Sweep
// =============================================================================

#[tokio::test]
async fn test_msearch_is_well_formed() {
    let (device, task) = fake_device(vec![], Duration::ZERO).await;
    let engine = engine_for(device);

    let handle = engine
        .start_discovery("roku:ecp", Duration::from_millis(1500), |_| {}, false)
        .unwrap()
        .expect("sweep should start");
    handle.wait().await.unwrap();

    let msearch = task.await.unwrap();
    assert!(msearch.starts_with("M-SEARCH * HTTP/1.1\r\n"));
    assert!(msearch.contains("MAN: \"ssdp:discover\"\r\n"));
    assert!(msearch.contains("ST: roku:ecp\r\n"));
    // MX is the timeout rounded up to whole seconds
    assert!(msearch.contains("MX: 2\r\n"));
    assert!(msearch.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_replies_arrive_in_order_and_garbage_is_dropped() {
    let (device, _task) = fake_device(
        vec![
            roku_reply("http://10.0.0.5:8060/", "X004A"),
            "NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\n\r\n".to_string(),
            "HTTP/1.1 200 OK\r\nthis line has no colon\r\n\r\n".to_string(),
            roku_reply("http://10.0.0.6:8060/", "X004B"),
        ],
        Duration::ZERO,
    )
    .await;
    let engine = engine_for(device);
    let (callback, seen) = recorder();

    let handle = engine
        .start_discovery("roku:ecp", Duration::from_secs(1), callback, false)
        .unwrap()
        .unwrap();
    let session = handle.session();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.session, session);
    assert_eq!(report.replies, 2);
    assert_eq!(report.dropped, 2);
    assert!(!report.superseded);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].headers["LOCATION"], "http://10.0.0.5:8060/");
    assert_eq!(seen[1].headers["LOCATION"], "http://10.0.0.6:8060/");
    assert_eq!(seen[0].headers["CACHE-CONTROL"], "max-age=3600");
    assert!(seen.iter().all(|r| r.session == session));
    assert!(seen.iter().all(|r| r.from == device));
}

#[tokio::test]
async fn test_sweep_ends_after_timeout() {
    let (device, _task) = fake_device(vec![], Duration::ZERO).await;
    let engine = engine_for(device);

    let started = Instant::now();
    let handle = engine
        .start_discovery("roku:ecp", Duration::from_millis(500), |_| {}, false)
        .unwrap()
        .unwrap();
    let report = handle.wait().await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(450), "ended early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "ended late: {:?}", elapsed);
    assert_eq!(report.replies, 0);
    assert!(!engine.is_busy());
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_second_sweep_is_refused_while_busy() {
    let (device, received, listener) = counting_device().await;
    let engine = engine_for(device);

    let first = engine
        .start_discovery("roku:ecp", Duration::from_millis(800), |_| {}, false)
        .unwrap()
        .unwrap();
    assert!(engine.is_busy());

    let second = engine
        .start_discovery("roku:ecp", Duration::from_millis(800), |_| {}, false)
        .unwrap();
    assert!(second.is_none());
    assert_eq!(engine.current_session(), Some(first.session()));

    first.wait().await.unwrap();
    assert!(!engine.is_busy());

    // Only the first sweep ever reached the network
    assert_eq!(received.load(Ordering::SeqCst), 1);
    listener.abort();
}

#[tokio::test]
async fn test_forced_sweep_supersedes_running_one() {
    // The first device answers only after the restart
    let (slow_device, _slow) = fake_device(
        vec![roku_reply("http://10.0.0.5:8060/", "X004A")],
        Duration::from_millis(300),
    )
    .await;
    let engine = engine_for(slow_device);
    let (first_callback, first_seen) = recorder();

    let started = Instant::now();
    let first = engine
        .start_discovery("roku:ecp", Duration::from_secs(5), first_callback, false)
        .unwrap()
        .unwrap();

    // Give the first sweep time to send its M-SEARCH
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (second_callback, _second_seen) = recorder();
    let second = engine
        .start_discovery("roku:ecp", Duration::from_millis(500), second_callback, true)
        .unwrap()
        .expect("forced sweep always starts");
    assert!(second.session() > first.session());
    assert_eq!(engine.current_session(), Some(second.session()));

    let first_report = first.wait().await.unwrap();
    assert!(first_report.superseded);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(first_seen.lock().unwrap().is_empty());

    second.wait().await.unwrap();
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_stop_discovery() {
    let (device, _task) = fake_device(vec![], Duration::ZERO).await;
    let engine = engine_for(device);

    let handle = engine
        .start_discovery("roku:ecp", Duration::from_secs(5), |_| {}, false)
        .unwrap()
        .unwrap();
    let session = handle.session();

    assert_eq!(engine.stop_discovery(), Some(session));
    assert!(!engine.is_busy());

    let report = tokio::time::timeout(Duration::from_secs(1), handle.wait())
        .await
        .expect("stopped sweep should end promptly")
        .unwrap();
    assert!(report.superseded);
    assert_eq!(engine.stop_discovery(), None);
}

// =============================================================================
// Bridge
// =============================================================================

#[tokio::test]
async fn test_discovered_devices_reach_the_mailbox_in_order() {
    let (device, _task) = fake_device(
        vec![
            roku_reply("http://10.0.0.5:8060/", "X004A"),
            roku_reply("http://10.0.0.6:8060", "X004B"),
            // No LOCATION: not a usable device
            "HTTP/1.1 200 OK\r\nST: roku:ecp\r\n\r\n".to_string(),
        ],
        Duration::ZERO,
    )
    .await;
    let engine = engine_for(device);
    let (publisher, mut mailbox) = registration_bridge();
    let callback = publishing_callback(EcpClient::new(), publisher);

    let handle = engine
        .start_discovery("roku:ecp", Duration::from_secs(1), callback, false)
        .unwrap()
        .unwrap();
    let session = handle.session();
    let report = handle.wait().await.unwrap();
    assert_eq!(report.replies, 3);

    let first = mailbox.drain().expect("first registration");
    let second = mailbox.drain().expect("second registration");
    assert!(mailbox.drain().is_none());

    assert_eq!(first.session, session);
    assert_eq!(first.descriptor.base_url(), "http://10.0.0.5:8060/");
    assert_eq!(second.descriptor.base_url(), "http://10.0.0.6:8060/");
}
