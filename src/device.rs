use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::error::LinkError;
use crate::mqtt_service::MqttService;
use crate::sensor::{SensorSchedule, SimulatedSensor};
use crate::service_utils::shutdown_signal;

/// Runs the schedule, handing each due reading to `publish`. Returns how many
/// readings went out.
pub async fn publish_readings<R, P, Fut>(
    mut schedule: SensorSchedule,
    tick: Duration,
    mut read: R,
    mut publish: P,
) -> Result<u32, LinkError>
where
    R: FnMut() -> i32,
    P: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), LinkError>>,
{
    let mut sent = 0;

    loop {
        let pass = schedule.tick();

        if pass.publish {
            let message_to_send = read().to_string();
            info!("Sending (publishing) message: {}", message_to_send);
            publish(message_to_send).await?;
            sent += 1;
        }

        if pass.finished {
            debug!("Device loop ran {} passes.", schedule.passes());
            return Ok(sent);
        }

        sleep(tick).await;
    }
}

/// Device side: publish simulated readings until the run ends, then disconnect.
/// Incoming messages are printed by the service's sink as they arrive.
pub async fn run(service: Arc<MqttService>) -> Result<(), LinkError> {
    let config = &service.config;
    let sensor = SimulatedSensor::new(config.sensor_min, config.sensor_max);
    let schedule = SensorSchedule::new(config.device_publish_every, config.device_max_ticks);
    let tick = Duration::from_millis(config.device_tick_ms);

    let publisher = service.clone();
    let readings = publish_readings(schedule, tick, || sensor.read(), move |text| {
        let publisher = publisher.clone();
        async move { publisher.publish_message(&text).await }
    });

    tokio::select! {
        result = readings => {
            let sent = result?;
            info!("Device run finished after {} readings.", sent);
        }
        _ = shutdown_signal() => info!("Device run interrupted."),
    }

    service.disconnect().await?;
    info!("Disconnected from MQTT broker: {}", config.mqtt_host);
    Ok(())
}
