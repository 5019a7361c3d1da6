use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("MQTT client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("Giving up on broker {host} after {attempts} connection attempts")]
    RetriesExhausted { host: String, attempts: i32 },
    #[error("MQTT client is not connected")]
    NotConnected,
    #[error("Invalid command line: {0}")]
    Usage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MQTT service task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
