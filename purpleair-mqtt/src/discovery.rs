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

//! Home Assistant MQTT discovery records for Purple Air sensors.
//!
//! Keys and names follow PurpleAir's sensor JSON documentation
//! (<https://community.purpleair.com/t/sensor-json-documentation/6917>).

use log::debug;
use purpleair_sensor::SensorReading;
use serde_json::{json, Map, Value};

use crate::error::BridgeError;
use crate::topics::{Availability, Topics};

/// Describes how one key of the sensor JSON maps onto a Home Assistant entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub device_class: Option<&'static str>,
    pub unit: Option<&'static str>,
    /// `None` for textual values, which Home Assistant rejects as measurements.
    pub state_class: Option<&'static str>,
    pub enabled_by_default: bool,
    pub diagnostic: bool,
    /// Replaces the default `{{ value_json['<key>'] }}` template.
    pub value_template: Option<&'static str>,
}

impl SensorDescriptor {
    const fn reading(key: &'static str, name: &'static str, unit: Option<&'static str>) -> Self {
        Self {
            key,
            name,
            device_class: None,
            unit,
            state_class: Some("measurement"),
            enabled_by_default: true,
            diagnostic: false,
            value_template: None,
        }
    }

    const fn diagnostic(key: &'static str, name: &'static str) -> Self {
        Self {
            key,
            name,
            device_class: None,
            unit: None,
            state_class: Some("measurement"),
            enabled_by_default: false,
            diagnostic: true,
            value_template: None,
        }
    }

    const fn class(mut self, device_class: &'static str) -> Self {
        self.device_class = Some(device_class);
        self
    }

    const fn disabled(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    const fn textual(mut self) -> Self {
        self.state_class = None;
        self
    }

    const fn template(mut self, value_template: &'static str) -> Self {
        self.value_template = Some(value_template);
        self
    }
}

const UG_M3: Option<&str> = Some("ug/m3");
const UM_DL: Option<&str> = Some("um/dl");

static CATALOG: &[SensorDescriptor] = &[
    SensorDescriptor::reading("Adc", "Air Quality Index", Some("AQI")),
    SensorDescriptor::reading("current_temp_f", "Current Temperature", Some("°F")).class("temperature"),
    SensorDescriptor::reading("current_humidity", "Current Humidity", Some("%")).class("humidity"),
    SensorDescriptor::reading("current_dewpoint_f", "Current Dewpoint", Some("°F")).class("temperature"),
    SensorDescriptor::reading("pressure", "Air Pressure", Some("mbar")).class("pressure"),
    // Channel B
    SensorDescriptor::reading("p25aqic_b", "PM2.5 AQI Color B", None).disabled().textual(),
    SensorDescriptor::reading("pm2.5_aqi_b", "PM2.5 AQI B", None),
    SensorDescriptor::reading("pm1_0_cf_1_b", "1.0um CF=1 Mass B", UG_M3),
    SensorDescriptor::reading("pm2_5_cf_1_b", "2.5um CF=1 Mass B", UG_M3),
    SensorDescriptor::reading("pm10_0_cf_1_b", "10.0um CF=1 Mass B", UG_M3),
    SensorDescriptor::reading("pm1_0_atm_b", "1.0um ATM Mass B", UG_M3),
    SensorDescriptor::reading("pm2_5_atm_b", "2.5um ATM Mass B", UG_M3),
    SensorDescriptor::reading("pm10_0_atm_b", "10.0um ATM Mass B", UG_M3),
    SensorDescriptor::reading("p_0_3_um_b", "0.3um Particle Count B", UM_DL),
    SensorDescriptor::reading("p_0_5_um_b", "0.5um Particle Count B", UM_DL),
    SensorDescriptor::reading("p_1_0_um_b", "1.0um Particle Count B", UM_DL),
    SensorDescriptor::reading("p_2_5_um_b", "2.5um Particle Count B", UM_DL),
    SensorDescriptor::reading("p_5_0_um_b", "5.0um Particle Count B", UM_DL),
    SensorDescriptor::reading("p_10_0_um_b", "10.0um Particle Count B", UM_DL),
    // Channel A
    SensorDescriptor::reading("p25aqic", "PM2.5 AQI Color A", None).disabled().textual(),
    SensorDescriptor::reading("pm2.5_aqi", "PM2.5 AQI A", None),
    SensorDescriptor::reading("pm1_0_cf_1", "1.0um CF=1 Mass A", UG_M3),
    SensorDescriptor::reading("pm2_5_cf_1", "2.5um CF=1 Mass A", UG_M3),
    SensorDescriptor::reading("pm10_0_cf_1", "10.0um CF=1 Mass A", UG_M3),
    SensorDescriptor::reading("pm1_0_atm", "1.0um ATM Mass A", UG_M3),
    SensorDescriptor::reading("pm2_5_atm", "2.5um ATM Mass A", UG_M3),
    SensorDescriptor::reading("pm10_0_atm", "10.0um ATM Mass A", UG_M3),
    SensorDescriptor::reading("p_0_3_um", "0.3um Particle Count A", UM_DL),
    SensorDescriptor::reading("p_0_5_um", "0.5um Particle Count A", UM_DL),
    SensorDescriptor::reading("p_1_0_um", "1.0um Particle Count A", UM_DL),
    SensorDescriptor::reading("p_2_5_um", "2.5um Particle Count A", UM_DL),
    SensorDescriptor::reading("p_5_0_um", "5.0um Particle Count A", UM_DL),
    SensorDescriptor::reading("p_10_0_um", "10.0um Particle Count A", UM_DL),
    // Diagnostics
    SensorDescriptor::diagnostic("Geo", "Name of the PurpleAir WiFi network for device setup").textual(),
    SensorDescriptor::diagnostic("Mem", "Free Heap Memory"),
    SensorDescriptor::diagnostic("memfrag", "Fragmentation of Heap Memory"),
    SensorDescriptor::diagnostic("memfb", "Max Free Block Size"),
    SensorDescriptor::diagnostic("memcs", "Free Stack Space"),
    SensorDescriptor::diagnostic("loggingrate", "Logging Rate"),
    SensorDescriptor::diagnostic("uptime", "Uptime").template("{{ value_json['uptime'] | int }}"),
    SensorDescriptor::diagnostic("rssi", "WiFi Signal Strength"),
    SensorDescriptor::diagnostic("hardwareversion", "Hardware Version").textual(),
    SensorDescriptor::diagnostic("hardwarediscovered", "Hardware Discovered").textual(),
    SensorDescriptor::diagnostic("status_0", "NTP time sync"),
    SensorDescriptor::diagnostic("status_1", "Location lookup"),
    SensorDescriptor::diagnostic("status_2", "Update check"),
    SensorDescriptor::diagnostic("status_3", "Connection to PurpleAir servers"),
    SensorDescriptor::diagnostic("status_6", "Data Processor #1 Status"),
    SensorDescriptor::diagnostic("ssid", "WiFi SSID").textual(),
];

/// Every sensor key that gets a Home Assistant entity.
pub fn catalog() -> &'static [SensorDescriptor] {
    CATALOG
}

pub fn descriptor(key: &str) -> Option<&'static SensorDescriptor> {
    CATALOG.iter().find(|d| d.key == key)
}

/// Builds one retained discovery record per known key present in `reading`.
///
/// Returns an empty list when discovery is disabled.
pub fn discovery_messages(
    reading: &SensorReading,
    topics: &Topics,
) -> Result<Vec<(String, Vec<u8>)>, BridgeError> {
    let sensor_id = &reading.sensor_id;
    let state_topic = topics.state_topic(sensor_id)?;
    let device = json!({
        "identifiers": [format!("purpleair_{sensor_id}")],
        "manufacturer": "PurpleAir",
        "model": "PurpleAir Sensor",
        "name": reading.geo(),
        "hw_version": reading.hardware_version(),
        "sw_version": reading.firmware_version(),
    });

    let mut messages = Vec::new();
    for key in reading.fields.keys() {
        let Some(descriptor) = descriptor(key) else {
            debug!("[{sensor_id}] Skipping unknown sensor key {key}");
            continue;
        };
        let Some(topic) = topics.discovery_topic(sensor_id, key)? else {
            return Ok(Vec::new());
        };

        let record = entity_config(descriptor, sensor_id, &state_topic, topics.status_topic(), &device);
        let payload = serde_json::to_vec(&record)?;
        debug!("[{sensor_id}] Discovery for {topic}: {record}");
        messages.push((topic, payload));
    }
    Ok(messages)
}

fn entity_config(
    descriptor: &SensorDescriptor,
    sensor_id: &str,
    state_topic: &str,
    status_topic: &str,
    device: &Value,
) -> Value {
    let unique_id = format!("purpleair_{sensor_id}_{}", descriptor.key);

    let mut record = Map::new();
    record.insert("name".into(), descriptor.name.into());
    record.insert("unique_id".into(), unique_id.clone().into());
    record.insert("object_id".into(), unique_id.into());
    record.insert("state_topic".into(), state_topic.into());
    // Bracket access so keys like `pm2.5_aqi` resolve in Jinja.
    let value_template = match descriptor.value_template {
        Some(template) => template.to_string(),
        None => format!("{{{{ value_json['{}'] }}}}", descriptor.key),
    };
    record.insert("value_template".into(), value_template.into());
    record.insert("enabled_by_default".into(), descriptor.enabled_by_default.into());
    if let Some(class) = descriptor.device_class {
        record.insert("device_class".into(), class.into());
    }
    if let Some(unit) = descriptor.unit {
        record.insert("unit_of_measurement".into(), unit.into());
    }
    if let Some(state_class) = descriptor.state_class {
        record.insert("state_class".into(), state_class.into());
    }
    if descriptor.diagnostic {
        record.insert("entity_category".into(), "diagnostic".into());
    }
    record.insert(
        "availability".into(),
        json!([{
            "topic": status_topic,
            "payload_available": Availability::ONLINE,
            "payload_not_available": Availability::OFFLINE,
        }]),
    );
    record.insert("device".into(), device.clone());
    Value::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MqttBridgeConfig;

    fn topics() -> Topics {
        let config = MqttBridgeConfig::builder("localhost")
            .status_topic("alerts/purpleair2mqtt")
            .sensor_topic_root("sensors/purpleair2mqtt")
            .build();
        Topics::new(&config).unwrap()
    }

    fn reading() -> SensorReading {
        SensorReading::parse(
            r#"{
                "SensorId": "84:f3:eb:7b:c8:a1",
                "Geo": "PurpleAir-c8a1",
                "version": "7.02",
                "hardwareversion": "2.0",
                "current_temp_f": 71,
                "pm2.5_aqi": 12,
                "DateTime": "2025/01/01T00:00:00z"
            }"#,
        )
        .unwrap()
    }

    fn find<'a>(messages: &'a [(String, Vec<u8>)], key: &str) -> Option<Value> {
        messages
            .iter()
            .find(|(topic, _)| topic.ends_with(&format!("/{key}/config")))
            .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
    }

    #[test]
    fn test_catalog_keys_are_unique() {
        let mut keys: Vec<_> = catalog().iter().map(|d| d.key).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_descriptor_lookup() {
        let temp = descriptor("current_temp_f").unwrap();
        assert_eq!(temp.device_class, Some("temperature"));
        assert_eq!(temp.unit, Some("°F"));
        assert!(descriptor("SensorId").is_none());
    }

    #[test]
    fn test_only_known_keys_are_announced() {
        let messages = discovery_messages(&reading(), &topics()).unwrap();

        // Geo, hardwareversion, current_temp_f, pm2.5_aqi
        assert_eq!(messages.len(), 4);
        assert!(find(&messages, "DateTime").is_none());
        assert!(find(&messages, "SensorId").is_none());
        assert!(find(&messages, "version").is_none());
    }

    #[test]
    fn test_record_contents() {
        let messages = discovery_messages(&reading(), &topics()).unwrap();
        let record = find(&messages, "current_temp_f").unwrap();

        assert_eq!(record["name"], "Current Temperature");
        assert_eq!(record["unique_id"], "purpleair_84f3eb7bc8a1_current_temp_f");
        assert_eq!(record["state_topic"], "sensors/purpleair2mqtt/84f3eb7bc8a1");
        assert_eq!(record["value_template"], "{{ value_json['current_temp_f'] }}");
        assert_eq!(record["device_class"], "temperature");
        assert_eq!(record["state_class"], "measurement");
        assert_eq!(record["availability"][0]["topic"], "alerts/purpleair2mqtt");
        assert_eq!(record["availability"][0]["payload_available"], "online");
        assert_eq!(record["availability"][0]["payload_not_available"], "offline");
        assert_eq!(record["device"]["identifiers"][0], "purpleair_84f3eb7bc8a1");
        assert_eq!(record["device"]["name"], "PurpleAir-c8a1");
        assert_eq!(record["device"]["hw_version"], "2.0");
        assert_eq!(record["device"]["sw_version"], "7.02");
        assert!(record.get("entity_category").is_none());
    }

    #[test]
    fn test_textual_diagnostic_record() {
        let messages = discovery_messages(&reading(), &topics()).unwrap();
        let record = find(&messages, "hardwareversion").unwrap();

        assert_eq!(record["entity_category"], "diagnostic");
        assert_eq!(record["enabled_by_default"], false);
        assert!(record.get("state_class").is_none());
    }

    #[test]
    fn test_dotted_key_template() {
        let messages = discovery_messages(&reading(), &topics()).unwrap();
        let record = find(&messages, "pm2.5_aqi").unwrap();
        assert_eq!(record["value_template"], "{{ value_json['pm2.5_aqi'] }}");
    }

    #[test]
    fn test_descriptor_template_override() {
        let reading = SensorReading::parse(r#"{"SensorId":"aa:bb","uptime":7200,"rssi":-61}"#).unwrap();
        let messages = discovery_messages(&reading, &topics()).unwrap();

        let uptime = find(&messages, "uptime").unwrap();
        assert_eq!(uptime["value_template"], "{{ value_json['uptime'] | int }}");
        let rssi = find(&messages, "rssi").unwrap();
        assert_eq!(rssi["value_template"], "{{ value_json['rssi'] }}");
    }

    #[test]
    fn test_disabled_discovery_yields_nothing() {
        let config = MqttBridgeConfig::builder("localhost").without_discovery().build();
        let topics = Topics::new(&config).unwrap();
        assert!(discovery_messages(&reading(), &topics).unwrap().is_empty());
    }
}
