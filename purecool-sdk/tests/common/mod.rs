//! Mock transport and discovery for session tests
//!
//! The mock event loop is fed by a channel the test keeps a handle to, so
//! tests can play the broker: acknowledge, refuse, stay silent, push status
//! messages or drop the connection.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use purecool_discovery::{Announcement, Browse, ServiceBrowser};
use purecool_sdk::transport::{
    BrokerOptions, Connector, EventLoop, TransportClient, TransportEvent,
};
use purecool_sdk::{DeviceDescriptor, TransportError};

pub const PASSWORD1_BLOB: &str =
    "1/aJ5t52WvAfn+z+fjDuef86kQDQPefbQ6/70ZGysII1Ke1i0ZHakFH84DZuxsSQ4KTT2vbCm7uYeTORULKLKQ==";

pub const STATUS_TOPIC: &str = "475/serial-1/status/current";
pub const COMMAND_TOPIC: &str = "475/serial-1/command";

pub const CURRENT_STATE: &str = concat!(
    r#"{"msg":"CURRENT-STATE","time":"2017-03-05T11:01:27.000Z","#,
    r#""mode-reason":"LAPP","state-reason":"MODE","#,
    r#""product-state":{"fmod":"AUTO","fnst":"FAN","fnsp":"AUTO","qtar":"0004","#,
    r#""oson":"OFF","rhtm":"ON","filf":"2087","ercd":"02C0","nmod":"ON","wacd":"NONE"},"#,
    r#""scheduler":{"srsc":"cbd0","dstv":"0001","tzid":"0001"}}"#,
);

pub const ENVIRONMENT: &str = concat!(
    r#"{"msg":"ENVIRONMENTAL-CURRENT-SENSOR-DATA","time":"2017-03-05T11:03:00.000Z","#,
    r#""data":{"tact":"2955","hact":"0045","pact":"0004","vact":"0001","sltm":"OFF"}}"#,
);

pub fn descriptor() -> DeviceDescriptor {
    DeviceDescriptor::new(
        "serial-1",
        "device-1",
        "475",
        "21.03.08",
        true,
        true,
        false,
        PASSWORD1_BLOB,
    )
}

/// How the mock broker answers a connection
#[derive(Debug, Clone, Copy)]
pub enum Broker {
    Accept,
    Refuse(u8),
    Silent,
    /// Accepts, but the event loop only reports it after this delay
    Late(Duration),
}

#[derive(Default)]
pub struct MockClient {
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
    pub subscribed: Mutex<Vec<String>>,
    pub disconnects: AtomicU32,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockClient {
    /// `msg` field of every published payload, in order
    pub fn published_kinds(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| {
                let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
                json["msg"].as_str().unwrap().to_string()
            })
            .collect()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.published_kinds().iter().filter(|k| *k == kind).count()
    }

    pub fn last_payload(&self, kind: &str) -> Option<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .map(|(_, payload)| serde_json::from_slice::<serde_json::Value>(payload).unwrap())
            .find(|json| json["msg"] == kind)
    }
}

impl TransportClient for MockClient {
    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.published.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Some(events) = self.events.lock().unwrap().take() {
            let _ = events.send(TransportEvent::Closed("client disconnect".to_string()));
        }
        Ok(())
    }
}

struct MockEventLoop {
    rx: mpsc::Receiver<TransportEvent>,
    delay: Option<Duration>,
}

impl EventLoop for MockEventLoop {
    fn next_event(&mut self) -> Option<TransportEvent> {
        if let Some(delay) = self.delay.take() {
            std::thread::sleep(delay);
        }
        self.rx.recv().ok()
    }
}

pub struct MockConnector {
    broker: Broker,
    pub opens: AtomicU32,
    pub client: Arc<MockClient>,
    pub last_options: Mutex<Option<BrokerOptions>>,
    broker_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockConnector {
    pub fn new(broker: Broker) -> Arc<Self> {
        Arc::new(Self {
            broker,
            opens: AtomicU32::new(0),
            client: Arc::new(MockClient::default()),
            last_options: Mutex::new(None),
            broker_tx: Mutex::new(None),
        })
    }

    /// Push an event as if the broker sent it; false once the loop is gone
    pub fn push(&self, event: TransportEvent) -> bool {
        match self.broker_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn push_status(&self, payload: &str) -> bool {
        self.push(TransportEvent::Message {
            topic: STATUS_TOPIC.to_string(),
            payload: payload.as_bytes().to_vec(),
        })
    }
}

impl Connector for MockConnector {
    fn open(
        &self,
        options: &BrokerOptions,
    ) -> Result<(Arc<dyn TransportClient>, Box<dyn EventLoop>), TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());

        let (tx, rx) = mpsc::channel();
        let mut delay = None;
        match self.broker {
            Broker::Accept => {
                let _ = tx.send(TransportEvent::ConnAck(0));
            }
            Broker::Late(after) => {
                let _ = tx.send(TransportEvent::ConnAck(0));
                delay = Some(after);
            }
            Broker::Refuse(code) => {
                let _ = tx.send(TransportEvent::ConnAck(code));
            }
            Broker::Silent => {}
        }
        *self.client.events.lock().unwrap() = Some(tx.clone());
        *self.broker_tx.lock().unwrap() = Some(tx);

        let client: Arc<dyn TransportClient> = self.client.clone();
        Ok((client, Box::new(MockEventLoop { rx, delay })))
    }
}

pub struct MockBrowser {
    announcements: Mutex<VecDeque<Announcement>>,
    pub browses: AtomicU32,
}

impl MockBrowser {
    pub fn new(announcements: Vec<Announcement>) -> Arc<Self> {
        Arc::new(Self {
            announcements: Mutex::new(announcements.into()),
            browses: AtomicU32::new(0),
        })
    }

    pub fn announcing_fan() -> Arc<Self> {
        Self::new(vec![Announcement {
            instance: "475_serial-1._dyson_mqtt._tcp.local.".to_string(),
            host: "192.168.0.7".to_string(),
            port: 1883,
        }])
    }
}

impl ServiceBrowser for MockBrowser {
    fn browse(&self, _service_type: &str) -> purecool_discovery::Result<Box<dyn Browse>> {
        self.browses.fetch_add(1, Ordering::SeqCst);
        let pending = std::mem::take(&mut *self.announcements.lock().unwrap());
        Ok(Box::new(MockBrowse { pending }))
    }
}

struct MockBrowse {
    pending: VecDeque<Announcement>,
}

impl Browse for MockBrowse {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Announcement, RecvTimeoutError> {
        match self.pending.pop_front() {
            Some(next) => Ok(next),
            None => {
                std::thread::sleep(timeout);
                Err(RecvTimeoutError::Timeout)
            }
        }
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
