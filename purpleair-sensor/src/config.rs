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

//! Configuration types for the sensor poller.

use std::time::Duration;

/// Configuration for polling one or more Purple Air sensors.
#[derive(Debug, Clone)]
pub struct SensorPollerConfig {
    /// Local JSON endpoints, e.g. `http://10.0.0.12/json`. Polled in order.
    pub urls: Vec<String>,
    /// Delay between two poll cycles (default: 300s).
    pub refresh_interval: Duration,
    /// Per-request timeout (default: 10s).
    pub request_timeout: Duration,
    /// How many times a transport failure is retried before giving up (default: 2).
    pub retry_attempts: usize,
    /// Constant delay between retries (default: 1s).
    pub retry_delay: Duration,
}

impl SensorPollerConfig {
    /// Start building a new config for the given sensor URLs.
    pub fn builder(urls: Vec<String>) -> SensorPollerConfigBuilder {
        SensorPollerConfigBuilder {
            urls,
            refresh_interval: Duration::from_secs(300),
            request_timeout: Duration::from_secs(10),
            retry_attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Builder for [`SensorPollerConfig`].
pub struct SensorPollerConfigBuilder {
    urls: Vec<String>,
    refresh_interval: Duration,
    request_timeout: Duration,
    retry_attempts: usize,
    retry_delay: Duration,
}

impl SensorPollerConfigBuilder {
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn retry_attempts(mut self, attempts: usize) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Build the config.
    pub fn build(self) -> SensorPollerConfig {
        SensorPollerConfig {
            urls: self.urls,
            refresh_interval: self.refresh_interval,
            request_timeout: self.request_timeout,
            retry_attempts: self.retry_attempts,
            retry_delay: self.retry_delay,
        }
    }
}
