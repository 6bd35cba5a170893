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

//! HTTP client for the sensor's local JSON API.

use backon::{ConstantBuilder, Retryable};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};

use crate::config::SensorPollerConfig;
use crate::error::SensorError;
use crate::reading::SensorReading;

/// Fetches readings from the configured sensors.
#[derive(Clone)]
pub struct SensorClient {
    http: Client,
    config: SensorPollerConfig,
}

impl SensorClient {
    pub fn new(config: SensorPollerConfig) -> Result<Self, SensorError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SensorPollerConfig {
        &self.config
    }

    /// Fetches a single reading, retrying transport failures with a constant backoff.
    pub async fn fetch(&self, url: &str) -> Result<SensorReading, SensorError> {
        let backoff = ConstantBuilder::default()
            .with_delay(self.config.retry_delay)
            .with_max_times(self.config.retry_attempts);

        (|| self.fetch_once(url))
            .retry(backoff)
            .when(SensorError::is_transient)
            .notify(|e, dur| {
                warn!("[{url}] Sensor request failed, retrying in {dur:?}: {e}");
            })
            .await
    }

    async fn fetch_once(&self, url: &str) -> Result<SensorReading, SensorError> {
        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;
        if status != StatusCode::OK {
            return Err(SensorError::UnexpectedStatus { status, body });
        }

        debug!("[{url}] Received {body}");
        SensorReading::parse(body)
    }

    /// Fetches every configured sensor in order.
    ///
    /// Each URL gets its own result so one unreachable sensor never hides the others.
    pub async fn poll_all(&self) -> Vec<(String, Result<SensorReading, SensorError>)> {
        info!("Retrieving data from {} Purple Air device(s)", self.config.urls.len());

        let mut results = Vec::with_capacity(self.config.urls.len());
        for url in &self.config.urls {
            let result = self.fetch(url).await;
            results.push((url.clone(), result));
        }
        results
    }
}
