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

//! Parsing of the sensor's `/json` payload into a [`SensorReading`].

use serde_json::{Map, Value};

use crate::error::SensorError;

/// A single successful response from a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// `SensorId` with separators removed, safe to use inside MQTT topics.
    pub sensor_id: String,
    /// Response body exactly as received.
    pub raw: String,
    /// Parsed top-level object.
    pub fields: Map<String, Value>,
}

impl SensorReading {
    /// Parses a response body.
    ///
    /// The body must be a JSON object carrying a non-empty `SensorId`
    /// (usually the device MAC address, e.g. `84:f3:eb:7b:c8:a1`).
    pub fn parse(body: impl Into<String>) -> Result<Self, SensorError> {
        let raw = body.into();
        let fields = match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            _ => return Err(SensorError::NotAnObject),
        };

        let sensor_id = fields
            .get("SensorId")
            .and_then(Value::as_str)
            .map(strip_separators)
            .filter(|id| !id.is_empty())
            .ok_or(SensorError::MissingSensorId)?;

        Ok(Self {
            sensor_id,
            raw,
            fields,
        })
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Device name as advertised on its setup WiFi network.
    pub fn geo(&self) -> Option<&str> {
        self.field("Geo").and_then(Value::as_str)
    }

    pub fn hardware_version(&self) -> Option<&str> {
        self.field("hardwareversion").and_then(Value::as_str)
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.field("version").and_then(Value::as_str)
    }
}

/// Removes spaces, commas, colons and dashes.
pub fn strip_separators(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | ':' | '-'))
        .collect()
}
