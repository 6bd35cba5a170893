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

use thiserror::Error;

/// Errors produced while fetching or parsing a sensor reading.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("invalid sensor json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sensor json is not an object")]
    NotAnObject,
    #[error("sensor json has no usable SensorId")]
    MissingSensorId,
}

impl SensorError {
    /// Only transport-level failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, SensorError::Http(_))
    }
}
