use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::topics::Role;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub unique_id: String,
    pub role: Role,
    pub swap_topics: bool,

    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_keep_alive_secs: u64,
    pub mqtt_max_retries: i32,
    pub mqtt_retry_interval_ms: u64,

    pub device_tick_ms: u64,
    pub device_publish_every: u32,
    pub device_max_ticks: u32,
    pub sensor_min: i32,
    pub sensor_max: i32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable {0} is missing or invalid.")]
    MissingOrInvalid(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
}

impl Config {
    /// Validate timeout values and other critical configurations.
    fn validate(&self) -> Result<(), ConfigError> {
        const MIN_TIMEOUT: u64 = 100;
        const MAX_TIMEOUT: u64 = 1_000_000;

        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&self.mqtt_retry_interval_ms) {
            return Err(ConfigError::ParsingError(format!(
                "MQTT_RETRY_INTERVAL_MS must be between {} and {} ms",
                MIN_TIMEOUT, MAX_TIMEOUT
            )));
        }

        if self.unique_id.is_empty() || self.unique_id.contains(['/', '+', '#']) {
            return Err(ConfigError::MissingOrInvalid("LINK_UNIQUE_ID".to_string()));
        }

        if self.mqtt_host.is_empty() {
            return Err(ConfigError::MissingOrInvalid("MQTT_HOST".to_string()));
        }

        if self.mqtt_max_retries < -1 || self.mqtt_max_retries == 0 {
            return Err(ConfigError::ParsingError(
                "MQTT_MAX_RETRIES must be -1 (unlimited) or a positive count".to_string(),
            ));
        }

        if self.device_publish_every == 0 {
            return Err(ConfigError::ParsingError(
                "DEVICE_PUBLISH_EVERY must be at least 1".to_string(),
            ));
        }

        if self.sensor_min > self.sensor_max {
            return Err(ConfigError::ParsingError(format!(
                "SENSOR_MIN ({}) must not exceed SENSOR_MAX ({})",
                self.sensor_min, self.sensor_max
            )));
        }

        Ok(())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load environment variables from .env file

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            unique_id: string_or("LINK_UNIQUE_ID", "devicelink-demo"),
            role: parse_or(&lookup, "LINK_ROLE", Role::Pc)?,
            swap_topics: parse_bool_or(&lookup, "LINK_SWAP_TOPICS", false)?,

            // MQTT Configuration
            mqtt_host: string_or("MQTT_HOST", "broker.emqx.io"),
            mqtt_port: parse_or(&lookup, "MQTT_PORT", 1883)?,
            mqtt_username: string_or("MQTT_USERNAME", ""),
            mqtt_password: string_or("MQTT_PASSWORD", ""),
            mqtt_keep_alive_secs: parse_or(&lookup, "MQTT_KEEP_ALIVE_SECS", 10)?,
            mqtt_max_retries: parse_or(&lookup, "MQTT_MAX_RETRIES", -1)?,
            mqtt_retry_interval_ms: parse_or(&lookup, "MQTT_RETRY_INTERVAL_MS", 5000)?,

            // Simulated device
            device_tick_ms: parse_or(&lookup, "DEVICE_TICK_MS", 300)?,
            device_publish_every: parse_or(&lookup, "DEVICE_PUBLISH_EVERY", 10)?,
            device_max_ticks: parse_or(&lookup, "DEVICE_MAX_TICKS", 30)?,
            sensor_min: parse_or(&lookup, "SENSOR_MIN", 1)?,
            sensor_max: parse_or(&lookup, "SENSOR_MAX", 100)?,
        };

        config.validate()?;

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::ParsingError(format!("{} has an invalid value: '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") | Some("") => Ok(false),
        Some(other) => Err(ConfigError::ParsingError(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
