mod config;
mod device;
mod display;
mod error;
mod mqtt_service;
mod pc;
mod sensor;
mod service_utils;
#[cfg(test)]
mod test_support;
mod topics;

use crate::config::Config;
use crate::display::{ConsoleDisplay, LatestMessage};
use crate::error::LinkError;
use crate::mqtt_service::MqttService;
use crate::service_utils::{init_logging, start_mqtt_service};
use crate::topics::{Role, Topics};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

const SERVICE_STOP_TIMEOUT: Duration = Duration::from_secs(5);

fn role_from_args(args: &[String], default: Role) -> Result<Role, LinkError> {
    match args {
        [] => Ok(default),
        [role] => role.parse::<Role>().map_err(LinkError::Usage),
        _ => Err(LinkError::Usage("usage: devicelink [pc|device]".to_string())),
    }
}

async fn run() -> Result<(), LinkError> {
    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let role = role_from_args(&args, config.role)?;

    let topics = Topics::for_role(&config.unique_id, role, config.swap_topics);
    info!("Running as {} (subscribe '{}', publish '{}')", role, topics.subscribe, topics.publish);

    let label = LatestMessage::new();
    let prefix = match role {
        Role::Pc => "Received message: ",
        Role::Device => "\tReceived a message: ",
    };
    let sink = Arc::new(ConsoleDisplay::new(prefix, label.clone()));

    let mqtt_service = MqttService::new(config, topics, sink);
    let mut service_task = start_mqtt_service(mqtt_service.clone(), role);

    let role_task = async {
        match role {
            Role::Pc => pc::run(mqtt_service.clone(), label).await,
            Role::Device => device::run(mqtt_service.clone()).await,
        }
    };

    let role_result = tokio::select! {
        result = role_task => Some(result),
        joined = &mut service_task => {
            // The service only ends on its own when it gave up reconnecting.
            joined??;
            None
        }
    };

    if let Some(result) = role_result {
        result?;
        match timeout(SERVICE_STOP_TIMEOUT, &mut service_task).await {
            Ok(joined) => joined??,
            Err(_) => {
                warn!("MQTT service did not stop in time, aborting it.");
                service_task.abort();
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => {
            info!("All services shut down successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
