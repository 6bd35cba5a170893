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

//! Configuration types for the MQTT bridge.

use std::fmt;
use std::time::Duration;

/// Home Assistant MQTT discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Discovery prefix Home Assistant listens on (default: `homeassistant`).
    pub prefix: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            prefix: "homeassistant".to_string(),
        }
    }
}

/// Configuration for the MQTT bridge.
#[derive(Clone)]
pub struct MqttBridgeConfig {
    /// MQTT broker hostname or IP.
    pub host: String,
    /// MQTT broker port (default: 1883).
    pub port: u16,
    /// MQTT client ID. Defaults to `"purpleair2mqtt-{uuid}"`.
    pub client_id: String,
    /// Optional MQTT username for authentication.
    pub username: Option<String>,
    /// Optional MQTT password for authentication.
    pub password: Option<String>,
    /// Retained availability topic carrying `online`/`offline`.
    pub status_topic: String,
    /// Root under which each sensor's raw JSON is published.
    pub sensor_topic_root: String,
    pub keep_alive: Duration,
    /// Home Assistant discovery; `None` disables it.
    pub discovery: Option<DiscoveryConfig>,
}

impl fmt::Debug for MqttBridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttBridgeConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "*******"))
            .field("status_topic", &self.status_topic)
            .field("sensor_topic_root", &self.sensor_topic_root)
            .field("keep_alive", &self.keep_alive)
            .field("discovery", &self.discovery)
            .finish()
    }
}

impl MqttBridgeConfig {
    /// Start building a new config for the given broker.
    pub fn builder(host: impl Into<String>) -> MqttBridgeConfigBuilder {
        MqttBridgeConfigBuilder {
            host: host.into(),
            port: 1883,
            client_id: format!("purpleair2mqtt-{}", uuid::Uuid::new_v4()),
            username: None,
            password: None,
            status_topic: "alerts/purpleair2mqtt".to_string(),
            sensor_topic_root: "sensors/purpleair2mqtt".to_string(),
            keep_alive: Duration::from_secs(60),
            discovery: Some(DiscoveryConfig::default()),
        }
    }
}

/// Builder for [`MqttBridgeConfig`].
pub struct MqttBridgeConfigBuilder {
    host: String,
    port: u16,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    status_topic: String,
    sensor_topic_root: String,
    keep_alive: Duration,
    discovery: Option<DiscoveryConfig>,
}

impl MqttBridgeConfigBuilder {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn status_topic(mut self, topic: impl Into<String>) -> Self {
        self.status_topic = topic.into();
        self
    }

    pub fn sensor_topic_root(mut self, root: impl Into<String>) -> Self {
        self.sensor_topic_root = root.into();
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn discovery_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.discovery = Some(DiscoveryConfig {
            prefix: prefix.into(),
        });
        self
    }

    pub fn without_discovery(mut self) -> Self {
        self.discovery = None;
        self
    }

    /// Build the config.
    pub fn build(self) -> MqttBridgeConfig {
        MqttBridgeConfig {
            host: self.host,
            port: self.port,
            client_id: self.client_id,
            username: self.username,
            password: self.password,
            status_topic: self.status_topic,
            sensor_topic_root: self.sensor_topic_root,
            keep_alive: self.keep_alive,
            discovery: self.discovery,
        }
    }
}
