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

//! MQTT publishing for Purple Air readings.
//!
//! Publishes each sensor's raw JSON as a retained message, keeps a retained
//! `online`/`offline` availability topic (backed by the MQTT last will) and
//! announces sensors through Home Assistant MQTT discovery.
//!
//! # Example
//!
//! ```ignore
//! use purpleair_mqtt::{MqttBridge, MqttBridgeConfig};
//!
//! let config = MqttBridgeConfig::builder("broker.local")
//!     .port(1883)
//!     .sensor_topic_root("sensors/purpleair2mqtt")
//!     .discovery_prefix("homeassistant")
//!     .build();
//!
//! let (bridge, publisher) = MqttBridge::connect(&config)?;
//! publisher.publish_reading(&reading).await?;
//! bridge.shutdown().await;
//! ```

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod publisher;
pub mod topics;

pub use bridge::{classify, BrokerEvent, MqttBridge};
pub use config::{DiscoveryConfig, MqttBridgeConfig, MqttBridgeConfigBuilder};
pub use discovery::{catalog, descriptor, discovery_messages, SensorDescriptor};
pub use error::BridgeError;
pub use publisher::{Publish, ReadingPublisher};
pub use topics::{Availability, Topics};
