//! Resolver behaviour against a scripted service browser

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use purecool_discovery::{
    Announcement, Browse, DeviceLabel, DiscoveryError, NetworkAddress, ResolveMode, Resolver,
    ServiceBrowser, SERVICE_TYPE,
};

/// What the scripted browse does once its announcements run out
#[derive(Clone, Copy)]
enum WhenEmpty {
    WaitOut,
    Disconnect,
}

struct MockBrowser {
    announcements: Mutex<VecDeque<Announcement>>,
    when_empty: WhenEmpty,
    browse_count: Arc<AtomicU32>,
    stopped_count: Arc<AtomicU32>,
    waits: Arc<AtomicU32>,
}

impl MockBrowser {
    fn new(announcements: Vec<Announcement>, when_empty: WhenEmpty) -> Self {
        Self {
            announcements: Mutex::new(announcements.into()),
            when_empty,
            browse_count: Arc::new(AtomicU32::new(0)),
            stopped_count: Arc::new(AtomicU32::new(0)),
            waits: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl ServiceBrowser for MockBrowser {
    fn browse(&self, service_type: &str) -> purecool_discovery::Result<Box<dyn Browse>> {
        assert_eq!(service_type, SERVICE_TYPE);
        self.browse_count.fetch_add(1, Ordering::SeqCst);
        let pending = std::mem::take(&mut *self.announcements.lock().unwrap());
        Ok(Box::new(MockBrowse {
            pending,
            when_empty: self.when_empty,
            stopped_count: Arc::clone(&self.stopped_count),
            waits: Arc::clone(&self.waits),
        }))
    }
}

struct MockBrowse {
    pending: VecDeque<Announcement>,
    when_empty: WhenEmpty,
    stopped_count: Arc<AtomicU32>,
    waits: Arc<AtomicU32>,
}

impl Browse for MockBrowse {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Announcement, RecvTimeoutError> {
        if let Some(next) = self.pending.pop_front() {
            return Ok(next);
        }
        match self.when_empty {
            WhenEmpty::WaitOut => {
                self.waits.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(timeout);
                Err(RecvTimeoutError::Timeout)
            }
            WhenEmpty::Disconnect => Err(RecvTimeoutError::Disconnected),
        }
    }
}

impl Drop for MockBrowse {
    fn drop(&mut self) {
        self.stopped_count.fetch_add(1, Ordering::SeqCst);
    }
}

struct FailingBrowser;

impl ServiceBrowser for FailingBrowser {
    fn browse(&self, _service_type: &str) -> purecool_discovery::Result<Box<dyn Browse>> {
        Err(DiscoveryError::Browser("no multicast interface".to_string()))
    }
}

fn announcement(instance: &str, host: &str) -> Announcement {
    Announcement {
        instance: instance.to_string(),
        host: host.to_string(),
        port: 1883,
    }
}

fn target() -> DeviceLabel {
    DeviceLabel::new("ptype", "serial-1")
}

fn discover(retry_count: u32, retry_timeout_ms: u64) -> ResolveMode {
    ResolveMode::Discover {
        retry_count,
        retry_timeout: Duration::from_millis(retry_timeout_ms),
    }
}

#[test]
fn test_direct_mode_never_browses() {
    let browser = Arc::new(MockBrowser::new(vec![], WhenEmpty::WaitOut));
    let resolver = Resolver::new(browser.clone());

    let mode = ResolveMode::Direct {
        host: "192.168.0.2".to_string(),
        port: None,
    };
    let address = resolver.resolve("device-1", &target(), &mode).unwrap();

    assert_eq!(address, NetworkAddress::new("device-1", "192.168.0.2", 1883));
    assert_eq!(address.to_string(), "NetworkAddress(device-1,192.168.0.2,1883)");
    assert_eq!(browser.browse_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_direct_mode_keeps_explicit_port() {
    let resolver = Resolver::new(Arc::new(MockBrowser::new(vec![], WhenEmpty::WaitOut)));
    let mode = ResolveMode::Direct {
        host: "fan.local".to_string(),
        port: Some(8883),
    };
    let address = resolver.resolve("device-1", &target(), &mode).unwrap();
    assert_eq!(address.port, 8883);
}

#[test]
fn test_first_matching_announcement_wins() {
    let browser = Arc::new(MockBrowser::new(
        vec![
            announcement("ptype_serial-2._dyson_mqtt._tcp.local.", "192.168.0.3"),
            announcement("other._http._tcp.local.", "192.168.0.4"),
            announcement("ptype_serial-1._dyson_mqtt._tcp.local.", "192.168.0.2"),
            announcement("ptype_serial-1._dyson_mqtt._tcp.local.", "192.168.0.9"),
        ],
        WhenEmpty::WaitOut,
    ));
    let resolver = Resolver::new(browser.clone());

    let address = resolver.resolve("device-1", &target(), &discover(5, 50)).unwrap();

    assert_eq!(address, NetworkAddress::new("serial-1", "192.168.0.2", 1883));
    assert_eq!(browser.browse_count.load(Ordering::SeqCst), 1);
    assert_eq!(browser.stopped_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exhausted_attempts_time_out() {
    let browser = Arc::new(MockBrowser::new(
        vec![announcement("ptype_serial-2._dyson_mqtt._tcp.local.", "192.168.0.3")],
        WhenEmpty::WaitOut,
    ));
    let resolver = Resolver::new(browser.clone());

    let started = Instant::now();
    let result = resolver.resolve("device-1", &target(), &discover(3, 20));

    assert_eq!(result, Err(DiscoveryError::Timeout));
    assert_eq!(browser.waits.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(browser.stopped_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_attempts_time_out_immediately() {
    let browser = Arc::new(MockBrowser::new(vec![], WhenEmpty::WaitOut));
    let resolver = Resolver::new(browser.clone());

    let result = resolver.resolve("device-1", &target(), &discover(0, 1_000));

    assert_eq!(result, Err(DiscoveryError::Timeout));
    assert_eq!(browser.waits.load(Ordering::SeqCst), 0);
    assert_eq!(browser.stopped_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ended_browse_stops_early() {
    let browser = Arc::new(MockBrowser::new(vec![], WhenEmpty::Disconnect));
    let resolver = Resolver::new(browser.clone());

    let started = Instant::now();
    let result = resolver.resolve("device-1", &target(), &discover(5, 1_000));

    assert_eq!(result, Err(DiscoveryError::Timeout));
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(browser.stopped_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_browser_failure_is_reported() {
    let resolver = Resolver::new(Arc::new(FailingBrowser));
    let result = resolver.resolve("device-1", &target(), &discover(1, 10));
    assert!(matches!(result, Err(DiscoveryError::Browser(_))));
}
