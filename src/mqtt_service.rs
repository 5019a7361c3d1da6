use crate::config::Config;
use crate::display::{decode_payload, MessageSink};
use crate::error::LinkError;
use crate::topics::Topics;
use log::{debug, error, info, warn};
use rumqttc::{
    AsyncClient, ConnectionError, Event, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60);
const PUBLISH_ATTEMPTS: usize = 5;
const PUBLISH_RETRY_DELAY_MS: u64 = 1000;
const REQUEST_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

pub struct MqttService {
    client_state: Mutex<ClientState>,
    client: Mutex<Option<AsyncClient>>,
    shutdown: AtomicBool,
    sink: Arc<dyn MessageSink>,
    pub(crate) config: Config,
    pub(crate) topics: Topics,
}

impl MqttService {
    pub fn new(config: Config, topics: Topics, sink: Arc<dyn MessageSink>) -> Arc<Self> {
        Arc::new(Self {
            client_state: Mutex::new(ClientState::Disconnected),
            client: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            sink,
            config,
            topics,
        })
    }

    /// Connects, subscribes and drives the event loop until shutdown or until
    /// the retry budget is spent.
    pub async fn start(self: Arc<Self>, mqtt_client_id: &str) -> Result<(), LinkError> {
        let mqtt_host = self.config.mqtt_host.clone();
        let mqtt_port = self.config.mqtt_port;
        info!("Connecting to the broker {}:{}...", mqtt_host, mqtt_port);

        let initial_retry_interval = Duration::from_millis(self.config.mqtt_retry_interval_ms);
        let max_retries = self.config.mqtt_max_retries;
        let mut retry_interval = initial_retry_interval;
        let mut retries = 0;

        loop {
            if self.is_shutting_down() {
                break;
            }
            if max_retries != -1 && retries >= max_retries {
                error!("Maximum number of retries ({}) reached. Stopping the service.", max_retries);
                // A broker refusal stays visible as the final state.
                if !matches!(self.state().await, ClientState::Error(_)) {
                    self.set_state(ClientState::Error("retries exhausted".to_string())).await;
                }
                return Err(LinkError::RetriesExhausted {
                    host: mqtt_host,
                    attempts: retries,
                });
            }

            debug!("Configuring MQTT broker at {}:{}...", mqtt_host, mqtt_port);

            let mut mqtt_options = MqttOptions::new(mqtt_client_id, mqtt_host.as_str(), mqtt_port);
            mqtt_options.set_keep_alive(Duration::from_secs(self.config.mqtt_keep_alive_secs));
            mqtt_options.set_clean_session(true);

            if !self.config.mqtt_username.is_empty() && !self.config.mqtt_password.is_empty() {
                mqtt_options.set_credentials(&self.config.mqtt_username, &self.config.mqtt_password);
            }

            let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

            {
                let mut client_lock = self.client.lock().await;
                *client_lock = Some(client.clone());
            }
            self.set_state(ClientState::Connecting).await;

            let subscribe_topic = self.topics.subscribe.clone();
            if let Err(e) = client.subscribe(&subscribe_topic, QoS::AtMostOnce).await {
                error!("Failed to subscribe to topic '{}': {}", subscribe_topic, e);
                self.set_state(ClientState::Error(e.to_string())).await;
                retries += 1;
                sleep(retry_interval).await;
                retry_interval = (retry_interval * 2).min(MAX_RETRY_INTERVAL);
                continue;
            }

            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) if self.is_shutting_down() => {
                        self.set_state(ClientState::Disconnected).await;
                        return Ok(());
                    }
                    Ok(event) => {
                        if let Event::Incoming(Packet::ConnAck(_)) = event {
                            retry_interval = initial_retry_interval;
                            retries = 0;
                        }
                        self.handle_event(event).await;
                    }
                    Err(_) if self.is_shutting_down() => {
                        self.set_state(ClientState::Disconnected).await;
                        return Ok(());
                    }
                    Err(ConnectionError::ConnectionRefused(code)) => {
                        error!("Failed to connect to broker, return code {:?}", code);
                        self.set_state(ClientState::Error(format!("{:?}", code))).await;
                        break;
                    }
                    Err(e) => {
                        error!("Error in MQTT event loop: {:?}", e);
                        self.set_state(ClientState::Disconnected).await;
                        break;
                    }
                }
            }

            warn!("Lost connection to MQTT broker. Retrying in {:?}...", retry_interval);
            retries += 1;
            sleep(retry_interval).await;
            retry_interval = (retry_interval * 2).min(MAX_RETRY_INTERVAL);
        }

        Ok(())
    }

    pub(crate) async fn handle_event(&self, event: Event) {
        match event {
            Event::Incoming(Packet::Publish(publish)) => {
                let text = decode_payload(&publish.payload);

                if publish.topic == self.topics.subscribe {
                    self.sink.on_message(&publish.topic, &text);
                } else {
                    warn!("Unknown topic received: {}", publish.topic);
                }
            }
            // Refusals surface as `ConnectionError::ConnectionRefused` from `poll`.
            Event::Incoming(Packet::ConnAck(_)) => {
                self.set_state(ClientState::Connected).await;
                self.sink.on_connected(&self.config.mqtt_host);
            }
            Event::Incoming(Packet::SubAck(suback)) => {
                let granted = match suback.return_codes.first() {
                    Some(SubscribeReasonCode::Success(qos)) => Some(*qos),
                    _ => None,
                };
                self.sink.on_subscribed(&self.topics.subscribe, granted);
                if granted.is_some() {
                    info!("PUBLISHING to {}", self.topics.publish);
                }
            }
            Event::Outgoing(_) => {
                debug!("Outgoing event.");
            }
            _ => {
                debug!("Unhandled event: {:?}", event);
            }
        }
    }

    /// Publishes `message` to this side's outgoing topic.
    pub async fn publish_message(&self, message: &str) -> Result<(), LinkError> {
        let topic = self.topics.publish.as_str();
        let strategy = FixedInterval::from_millis(PUBLISH_RETRY_DELAY_MS).take(PUBLISH_ATTEMPTS - 1);

        let result = Retry::start(strategy, move || async move {
            let client = self.client.lock().await.clone();
            match client {
                Some(client) => client
                    .publish(topic, QoS::AtMostOnce, false, message.as_bytes().to_vec())
                    .await
                    .map_err(LinkError::from),
                None => {
                    error!("MQTT client is not connected. Retrying...");
                    Err(LinkError::NotConnected)
                }
            }
        })
        .await;

        match &result {
            Ok(()) => debug!("Message published to '{}': {}", topic, message),
            Err(e) => error!(
                "Failed to publish message to topic '{}' after multiple retries: {}",
                topic, e
            ),
        }
        result
    }

    /// Requests a clean DISCONNECT; `start` returns once it has gone out.
    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.shutdown.store(true, Ordering::SeqCst);
        let client = self.client.lock().await.clone();
        if let Some(client) = client {
            client.disconnect().await?;
        }
        Ok(())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> ClientState {
        self.client_state.lock().await.clone()
    }

    async fn set_state(&self, state: ClientState) {
        let mut client_state = self.client_state.lock().await;
        *client_state = state;
    }
}
