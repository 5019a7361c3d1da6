use std::io::{self, BufRead};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::display::LatestMessage;
use crate::error::LinkError;
use crate::mqtt_service::MqttService;
use crate::service_utils::shutdown_signal;

pub const SHOW: &str = ":show";
pub const STATUS: &str = ":status";
pub const QUIT: &str = ":quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Show,
    Status,
    Quit,
}

/// Interprets one line of the entry box. Anything that is not a command is
/// sent as-is, including an empty line.
pub fn parse_line(line: &str) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.trim() {
        SHOW => Command::Show,
        STATUS => Command::Status,
        QUIT => Command::Quit,
        _ => Command::Send(line.to_string()),
    }
}

/// Publish (send to the other device) the given string.
pub async fn send_via_mqtt(service: &MqttService, message: &str) -> Result<(), LinkError> {
    info!("Sending {}", message);
    service.publish_message(message).await
}

/// Reads stdin on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_entry_reader() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Desktop side: stdin is the entry box, `label` holds the latest reply.
pub async fn run(service: Arc<MqttService>, label: LatestMessage) -> Result<(), LinkError> {
    println!(
        "Type a message and press Enter to send it ({} shows the latest message, {} the connection, {} exits).",
        SHOW, STATUS, QUIT
    );
    println!("{}", label.text());

    run_with_entry(service, label, spawn_entry_reader()).await
}

/// The entry loop proper; ends on `:quit`, end of input or Ctrl-C, then
/// disconnects.
pub async fn run_with_entry(
    service: Arc<MqttService>,
    label: LatestMessage,
    mut entry: mpsc::Receiver<io::Result<String>>,
) -> Result<(), LinkError> {
    loop {
        let line = tokio::select! {
            line = entry.recv() => line.transpose()?,
            _ = shutdown_signal() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_line(&line) {
            Command::Send(text) => {
                if let Err(e) = send_via_mqtt(&service, &text).await {
                    warn!("Message was not sent: {}", e);
                }
            }
            Command::Show => println!("{}", label.text()),
            Command::Status => {
                let (_, received) = label.snapshot();
                println!("{:?}, {} message(s) received", service.state().await, received);
            }
            Command::Quit => break,
        }
    }

    service.disconnect().await
}
