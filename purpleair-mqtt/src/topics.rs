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

//! Topic layout for state, availability and discovery messages.

use handlebars::Handlebars;
use serde_json::json;

use crate::config::MqttBridgeConfig;
use crate::error::BridgeError;

const STATE_TEMPLATE: &str = "state";
const DISCOVERY_TEMPLATE: &str = "discovery";

/// Payloads of the retained availability topic.
pub struct Availability;

impl Availability {
    pub const ONLINE: &'static str = "online";
    pub const OFFLINE: &'static str = "offline";
}

/// Renders every topic the bridge publishes to.
pub struct Topics {
    registry: Handlebars<'static>,
    status_topic: String,
    sensor_topic_root: String,
    discovery_prefix: Option<String>,
    ha_status_topic: Option<String>,
}

impl Topics {
    pub fn new(config: &MqttBridgeConfig) -> Result<Self, BridgeError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        // Topics are not HTML.
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(STATE_TEMPLATE, "{{root}}/{{sensor_id}}")?;
        registry.register_template_string(
            DISCOVERY_TEMPLATE,
            "{{prefix}}/sensor/purpleair2mqtt_{{sensor_id}}/{{key}}/config",
        )?;

        let discovery_prefix = config.discovery.as_ref().map(|d| d.prefix.clone());
        let ha_status_topic = discovery_prefix.as_ref().map(|p| format!("{p}/status"));

        Ok(Self {
            registry,
            status_topic: config.status_topic.clone(),
            sensor_topic_root: config.sensor_topic_root.clone(),
            discovery_prefix,
            ha_status_topic,
        })
    }

    pub fn status_topic(&self) -> &str {
        &self.status_topic
    }

    pub fn discovery_enabled(&self) -> bool {
        self.discovery_prefix.is_some()
    }

    /// Home Assistant's birth/last-will topic, when discovery is enabled.
    pub fn ha_status_topic(&self) -> Option<&str> {
        self.ha_status_topic.as_deref()
    }

    /// Topic carrying the raw JSON of one sensor.
    pub fn state_topic(&self, sensor_id: &str) -> Result<String, BridgeError> {
        let data = json!({ "root": self.sensor_topic_root, "sensor_id": sensor_id });
        Ok(self.registry.render(STATE_TEMPLATE, &data)?)
    }

    /// Discovery config topic for one key of one sensor.
    ///
    /// Returns `None` when discovery is disabled.
    pub fn discovery_topic(&self, sensor_id: &str, key: &str) -> Result<Option<String>, BridgeError> {
        let Some(prefix) = &self.discovery_prefix else {
            return Ok(None);
        };
        let data = json!({ "prefix": prefix, "sensor_id": sensor_id, "key": key });
        Ok(Some(self.registry.render(DISCOVERY_TEMPLATE, &data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(discovery: bool) -> Topics {
        let builder = MqttBridgeConfig::builder("localhost")
            .status_topic("alerts/pa")
            .sensor_topic_root("sensors/pa");
        let builder = if discovery {
            builder.discovery_prefix("homeassistant")
        } else {
            builder.without_discovery()
        };
        Topics::new(&builder.build()).unwrap()
    }

    #[test]
    fn test_state_topic() {
        let topics = topics(true);
        assert_eq!(topics.state_topic("84f3eb7bc8a1").unwrap(), "sensors/pa/84f3eb7bc8a1");
        assert_eq!(topics.status_topic(), "alerts/pa");
    }

    #[test]
    fn test_discovery_topic_keeps_dots() {
        let topics = topics(true);
        assert_eq!(
            topics.discovery_topic("84f3eb7bc8a1", "pm2.5_aqi").unwrap().as_deref(),
            Some("homeassistant/sensor/purpleair2mqtt_84f3eb7bc8a1/pm2.5_aqi/config")
        );
        assert_eq!(topics.ha_status_topic(), Some("homeassistant/status"));
    }

    #[test]
    fn test_no_html_escaping() {
        let config = MqttBridgeConfig::builder("localhost")
            .sensor_topic_root("a&b/<c>")
            .build();
        let topics = Topics::new(&config).unwrap();
        assert_eq!(topics.state_topic("x").unwrap(), "a&b/<c>/x");
    }

    #[test]
    fn test_discovery_disabled() {
        let topics = topics(false);
        assert!(!topics.discovery_enabled());
        assert!(topics.ha_status_topic().is_none());
        assert!(topics.discovery_topic("id", "pressure").unwrap().is_none());
    }
}
