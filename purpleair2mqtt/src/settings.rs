// Copyright 2025 The purpleair2mqtt Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration loaded from YAML with environment overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use purpleair_mqtt::MqttBridgeConfig;
use purpleair_sensor::SensorPollerConfig;
use reqwest::Url;
use serde::{Deserialize, Deserializer};

pub const DEFAULT_CONFIG_FILE: &str = "/app/config/config.yaml";
pub const ENV_PREFIX: &str = "PURPLEAIR2MQTT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mqtt: MqttSettings,
    pub purple_air: PurpleAirSettings,
    pub home_assistant: HomeAssistantSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    /// Wide enough to reject out-of-range values instead of truncating them.
    pub port: i64,
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub status_topic: String,
    pub sensor_topic_root: String,
    pub keep_alive_seconds: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: None,
            username: None,
            password: None,
            status_topic: "alerts/purpleair2mqtt".to_string(),
            sensor_topic_root: "sensors/purpleair2mqtt".to_string(),
            keep_alive_seconds: 60,
        }
    }
}

impl MqttSettings {
    pub fn port(&self) -> Result<u16> {
        u16::try_from(self.port)
            .with_context(|| format!("mqtt.port {} is not a valid TCP port", self.port))
    }
}

impl fmt::Debug for MqttSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "*******"))
            .field("status_topic", &self.status_topic)
            .field("sensor_topic_root", &self.sensor_topic_root)
            .field("keep_alive_seconds", &self.keep_alive_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PurpleAirSettings {
    /// A YAML list, or a comma separated string when set from the environment.
    #[serde(deserialize_with = "url_list")]
    pub urls: Vec<String>,
    pub refresh_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub retry_attempts: usize,
}

impl Default for PurpleAirSettings {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            refresh_interval_seconds: 300,
            request_timeout_seconds: 10,
            retry_attempts: 2,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlList {
    List(Vec<String>),
    Joined(String),
}

fn url_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match UrlList::deserialize(deserializer)? {
        UrlList::List(urls) => urls,
        UrlList::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(String::from)
            .collect(),
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomeAssistantSettings {
    pub discovery_enabled: bool,
    pub discovery_topic: String,
}

impl Default for HomeAssistantSettings {
    fn default() -> Self {
        Self {
            discovery_enabled: true,
            discovery_topic: "homeassistant".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `env_logger` filter, e.g. `info` or `purpleair_mqtt=debug`.
    pub level: String,
    /// Log file; stderr when unset.
    pub path: Option<PathBuf>,
    pub rotate: bool,
    pub max_keep: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
            rotate: false,
            max_keep: 10,
        }
    }
}

/// Environment overrides such as `PURPLEAIR2MQTT__MQTT__HOST`.
///
/// Values stay strings and are converted while deserializing, so a numeric
/// looking password keeps its exact text.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

/// Loads the configuration from `$CONFIG_FILE` (or the default path) and the environment.
///
/// The file is only required when `CONFIG_FILE` was set explicitly.
pub fn load() -> Result<(AppConfig, PathBuf)> {
    let explicit = std::env::var_os("CONFIG_FILE").map(PathBuf::from);
    let required = explicit.is_some();
    let path = explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let config = AppConfig::from_file(&path, required)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok((config, path))
}

impl AppConfig {
    pub fn from_file(path: &Path, required: bool) -> Result<Self> {
        let file = File::from(path).format(FileFormat::Yaml).required(required);
        Self::build(config::Config::builder().add_source(file), environment())
    }

    fn build(builder: ConfigBuilder<DefaultState>, env: Environment) -> Result<Self> {
        let config: AppConfig = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.purple_air.refresh_interval_seconds == 0 {
            bail!("purple_air.refresh_interval_seconds must be greater than 0");
        }
        self.mqtt.port()?;
        for url in &self.purple_air.urls {
            let parsed = Url::parse(url).with_context(|| format!("Invalid sensor URL {url}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Sensor URL {url} must use http or https");
            }
        }
        Ok(())
    }

    pub fn poller_config(&self) -> SensorPollerConfig {
        let purple_air = &self.purple_air;
        SensorPollerConfig::builder(purple_air.urls.clone())
            .refresh_interval(Duration::from_secs(purple_air.refresh_interval_seconds))
            .request_timeout(Duration::from_secs(purple_air.request_timeout_seconds))
            .retry_attempts(purple_air.retry_attempts)
            .build()
    }

    pub fn bridge_config(&self) -> Result<MqttBridgeConfig> {
        let mqtt = &self.mqtt;
        let mut builder = MqttBridgeConfig::builder(&mqtt.host)
            .port(mqtt.port()?)
            .status_topic(&mqtt.status_topic)
            .sensor_topic_root(&mqtt.sensor_topic_root)
            .keep_alive(Duration::from_secs(mqtt.keep_alive_seconds));

        if let Some(client_id) = &mqtt.client_id {
            builder = builder.client_id(client_id);
        }
        if let Some(username) = &mqtt.username {
            builder = builder.username(username);
        }
        if let Some(password) = &mqtt.password {
            builder = builder.password(password);
        }

        builder = if self.home_assistant.discovery_enabled {
            builder.discovery_prefix(&self.home_assistant.discovery_topic)
        } else {
            builder.without_discovery()
        };
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use config::Map;

    use super::*;

    fn yaml(yaml: &str) -> ConfigBuilder<DefaultState> {
        config::Config::builder().add_source(File::from_str(yaml, FileFormat::Yaml))
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let vars: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    fn from_yaml(source: &str) -> Result<AppConfig> {
        AppConfig::build(yaml(source), env(&[]))
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::from_file(Path::new("/nonexistent/purpleair2mqtt.yaml"), false).unwrap();

        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.status_topic, "alerts/purpleair2mqtt");
        assert_eq!(config.mqtt.sensor_topic_root, "sensors/purpleair2mqtt");
        assert!(config.purple_air.urls.is_empty());
        assert_eq!(config.purple_air.refresh_interval_seconds, 300);
        assert!(config.home_assistant.discovery_enabled);
        assert_eq!(config.home_assistant.discovery_topic, "homeassistant");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_keep, 10);
    }

    #[test]
    fn test_missing_required_file_fails() {
        assert!(AppConfig::from_file(Path::new("/nonexistent/purpleair2mqtt.yaml"), true).is_err());
    }

    #[test]
    fn test_full_yaml() {
        let config = from_yaml(
            r#"
mqtt:
  host: broker.local
  port: 8883
  username: hass
  password: secret
  sensor_topic_root: air
purple_air:
  urls:
    - http://10.0.0.12/json
    - http://10.0.0.13/json?live=true
  refresh_interval_seconds: 60
home_assistant:
  discovery_enabled: false
logging:
  level: debug
  path: /var/log/purpleair2mqtt.log
  rotate: true
  max_keep: 3
"#,
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.sensor_topic_root, "air");
        // Keys missing from a present section keep their defaults.
        assert_eq!(config.mqtt.status_topic, "alerts/purpleair2mqtt");
        assert_eq!(config.purple_air.urls.len(), 2);
        assert_eq!(config.purple_air.refresh_interval_seconds, 60);
        assert!(!config.home_assistant.discovery_enabled);
        assert_eq!(config.logging.path, Some(PathBuf::from("/var/log/purpleair2mqtt.log")));
        assert!(config.logging.rotate);
        assert_eq!(config.logging.max_keep, 3);

        let bridge = config.bridge_config().unwrap();
        assert_eq!(bridge.host, "broker.local");
        assert_eq!(bridge.port, 8883);
        assert_eq!(bridge.username.as_deref(), Some("hass"));
        assert!(bridge.discovery.is_none());

        let poller = config.poller_config();
        assert_eq!(poller.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = from_yaml("purple_air:\n  refresh_interval_seconds: 0\n").unwrap_err();
        assert!(err.to_string().contains("refresh_interval_seconds"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(from_yaml("purple_air:\n  urls: ['not a url']\n").is_err());
        assert!(from_yaml("purple_air:\n  urls: ['ftp://10.0.0.12/json']\n").is_err());
    }

    #[test]
    fn test_discovery_prefix_passed_through() {
        let config = from_yaml("home_assistant:\n  discovery_topic: ha\n").unwrap();
        let bridge = config.bridge_config().unwrap();
        assert_eq!(bridge.discovery.unwrap().prefix, "ha");
    }

    #[test]
    fn test_out_of_range_port_rejected() {
        let err = from_yaml("mqtt:\n  port: 70000\n").unwrap_err();
        assert!(format!("{err:#}").contains("70000"));
        assert!(from_yaml("mqtt:\n  port: -1\n").is_err());
        assert_eq!(from_yaml("mqtt:\n  port: 65535\n").unwrap().mqtt.port, 65535);
    }

    #[test]
    fn test_environment_overrides_file() {
        let config = AppConfig::build(
            yaml("mqtt:\n  host: broker.local\n  port: 1883\n"),
            env(&[
                ("PURPLEAIR2MQTT__MQTT__HOST", "mosquitto"),
                ("PURPLEAIR2MQTT__MQTT__PORT", "8883"),
                ("PURPLEAIR2MQTT__HOME_ASSISTANT__DISCOVERY_ENABLED", "false"),
                ("PURPLEAIR2MQTT__PURPLE_AIR__REFRESH_INTERVAL_SECONDS", "30"),
                ("UNRELATED__MQTT__HOST", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "mosquitto");
        assert_eq!(config.mqtt.port, 8883);
        assert!(!config.home_assistant.discovery_enabled);
        assert_eq!(config.purple_air.refresh_interval_seconds, 30);
    }

    #[test]
    fn test_environment_url_list() {
        let config = AppConfig::build(
            yaml("{}"),
            env(&[(
                "PURPLEAIR2MQTT__PURPLE_AIR__URLS",
                "http://10.0.0.12/json, http://10.0.0.13/json?live=true",
            )]),
        )
        .unwrap();

        assert_eq!(
            config.purple_air.urls,
            vec!["http://10.0.0.12/json", "http://10.0.0.13/json?live=true"]
        );
    }

    #[test]
    fn test_environment_password_kept_verbatim() {
        let config = AppConfig::build(
            yaml("{}"),
            env(&[
                ("PURPLEAIR2MQTT__MQTT__USERNAME", "hass"),
                ("PURPLEAIR2MQTT__MQTT__PASSWORD", "0123"),
            ]),
        )
        .unwrap();

        assert_eq!(config.mqtt.password.as_deref(), Some("0123"));
        assert_eq!(config.bridge_config().unwrap().password.as_deref(), Some("0123"));
    }

    #[test]
    fn test_environment_port_range_checked() {
        let err = AppConfig::build(yaml("{}"), env(&[("PURPLEAIR2MQTT__MQTT__PORT", "70000")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = from_yaml("mqtt:\n  password: hunter2\n").unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
