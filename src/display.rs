use rumqttc::QoS;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub const NO_DATA_YET: &str = "No data yet";

/// Receives everything the MQTT event loop has to show to a human.
pub trait MessageSink: Send + Sync {
    fn on_connected(&self, _host: &str) {}

    /// `granted` is `None` when the broker rejected the subscription.
    fn on_subscribed(&self, _topic: &str, _granted: Option<QoS>) {}

    fn on_message(&self, topic: &str, text: &str);
}

/// The label showing the most recent message from the other side, together
/// with how many messages have arrived. Both change under one lock.
#[derive(Debug, Clone)]
pub struct LatestMessage {
    inner: Arc<Mutex<(String, u64)>>,
}

impl Default for LatestMessage {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new((NO_DATA_YET.to_string(), 0))),
        }
    }
}

impl LatestMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.0 = text.to_string();
        inner.1 += 1;
    }

    pub fn text(&self) -> String {
        self.snapshot().0
    }

    /// Text and received count, read together.
    pub fn snapshot(&self) -> (String, u64) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Prints incoming messages on the console and keeps the label current.
pub struct ConsoleDisplay {
    prefix: &'static str,
    label: LatestMessage,
}

impl ConsoleDisplay {
    pub fn new(prefix: &'static str, label: LatestMessage) -> Self {
        Self { prefix, label }
    }
}

impl MessageSink for ConsoleDisplay {
    fn on_connected(&self, host: &str) {
        info!("CONNECTED to MQTT broker {}", host);
    }

    fn on_subscribed(&self, topic: &str, granted: Option<QoS>) {
        match granted {
            Some(qos) => {
                info!("Broker granted quality-of-service (QoS): {}", qos as u8);
                info!("SUBSCRIBED to {}", topic);
            }
            None => warn!("Broker rejected your subscription to {}", topic),
        }
    }

    fn on_message(&self, _topic: &str, text: &str) {
        println!("{}{}", self.prefix, text);
        self.label.set(text);
    }
}

/// Decodes a payload for display; invalid UTF-8 is replaced rather than dropped.
pub fn decode_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}
