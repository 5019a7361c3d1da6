//! Helpers for tests that need a broker on the loopback interface.

use rumqttc::QoS;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};

use crate::config::Config;
use crate::display::MessageSink;
use crate::mqtt_service::{ClientState, MqttService};

pub const CONNACK_ACCEPTED: u8 = 0x00;
pub const CONNACK_NOT_AUTHORIZED: u8 = 0x05;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct RecordingSink {
    pub connected: Mutex<Vec<String>>,
    pub subscribed: Mutex<Vec<(String, Option<QoS>)>>,
    pub messages: Mutex<Vec<(String, String)>>,
}

impl MessageSink for RecordingSink {
    fn on_connected(&self, host: &str) {
        self.connected.lock().unwrap().push(host.to_string());
    }

    fn on_subscribed(&self, topic: &str, granted: Option<QoS>) {
        self.subscribed.lock().unwrap().push((topic.to_string(), granted));
    }

    fn on_message(&self, topic: &str, text: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), text.to_string()));
    }
}

/// Config for unique id `tester` pointing at `127.0.0.1:port` with the
/// shortest reconnect delay, plus any overrides.
pub fn local_config(port: u16, overrides: &[(&str, &str)]) -> Config {
    let overrides: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Config::from_lookup(move |key| {
        if let Some((_, v)) = overrides.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            "LINK_UNIQUE_ID" => Some("tester".to_string()),
            "MQTT_HOST" => Some("127.0.0.1".to_string()),
            "MQTT_PORT" => Some(port.to_string()),
            "MQTT_RETRY_INTERVAL_MS" => Some("100".to_string()),
            _ => None,
        }
    })
    .unwrap()
}

pub async fn local_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let (listener, port) = local_listener().await;
    drop(listener);
    port
}

/// Accepts one client, consumes its CONNECT and answers with a CONNACK
/// carrying `code`.
pub async fn accept_with_connack(listener: &TcpListener, code: u8) -> TcpStream {
    let (mut stream, _) = timeout(STEP_TIMEOUT, listener.accept())
        .await
        .expect("no client connected")
        .unwrap();
    let mut connect = [0u8; 512];
    let read = stream.read(&mut connect).await.unwrap();
    assert_eq!(connect[0] >> 4, 1, "first packet should be CONNECT, got {} bytes", read);
    stream.write_all(&[0x20, 0x02, 0x00, code]).await.unwrap();
    stream
}

/// Everything the client writes until it closes the connection.
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    timeout(STEP_TIMEOUT, stream.read_to_end(&mut received))
        .await
        .expect("client never closed the connection")
        .unwrap();
    received
}

pub fn occurrences(haystack: &[u8], needle: &str) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle.as_bytes())
        .count()
}

pub async fn wait_for_state(service: &MqttService, expected: ClientState) {
    timeout(STEP_TIMEOUT, async {
        while service.state().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("service never reached {:?}", expected));
}
