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

//! Polling client for Purple Air sensors.
//!
//! Fetches the sensor's local `/json` endpoint and turns each response into a
//! [`SensorReading`] keyed by a topic-safe sensor id.
//!
//! # Example
//!
//! ```ignore
//! use purpleair_sensor::{SensorClient, SensorPollerConfig};
//!
//! let config = SensorPollerConfig::builder(vec!["http://10.0.0.12/json".into()])
//!     .refresh_interval(std::time::Duration::from_secs(120))
//!     .build();
//!
//! let client = SensorClient::new(config)?;
//! for (url, result) in client.poll_all().await {
//!     // publish `result` or log the failure for `url`
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod reading;

pub use client::SensorClient;
pub use config::{SensorPollerConfig, SensorPollerConfigBuilder};
pub use error::SensorError;
pub use reading::{strip_separators, SensorReading};
