use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::LinkError;
use crate::mqtt_service::MqttService;
use crate::topics::Role;

/// Initialize logging; `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Unique per process so a pc and a device sharing a topic prefix never
/// kick each other off the broker.
pub fn client_id(unique_id: &str, role: Role) -> String {
    let uuid = Uuid::new_v4().to_string();
    format!("{}_{}_{}", unique_id, role, &uuid[..8])
}

/// Start the MQTT service on its own task.
pub fn start_mqtt_service(mqtt_service: Arc<MqttService>, role: Role) -> JoinHandle<Result<(), LinkError>> {
    let mqtt_client_id = client_id(&mqtt_service.config.unique_id, role);
    info!("Starting MQTT service as '{}'...", mqtt_client_id);

    tokio::spawn(async move { mqtt_service.start(&mqtt_client_id).await })
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to handle termination signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Termination signal received, shutting down...");
}
