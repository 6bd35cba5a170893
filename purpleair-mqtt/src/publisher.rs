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

//! Turns sensor readings into retained MQTT messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use log::{debug, error, info};
use purpleair_sensor::SensorReading;
use rumqttc::{AsyncClient, QoS};

use crate::discovery;
use crate::error::BridgeError;
use crate::topics::Topics;

/// Something that can put a message on the broker.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BridgeError>;
}

#[async_trait]
impl Publish for AsyncClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BridgeError> {
        AsyncClient::publish(self, topic, QoS::AtLeastOnce, retain, payload).await?;
        Ok(())
    }
}

/// Publishes readings, announcing each sensor to Home Assistant the first time it is seen.
pub struct ReadingPublisher<P> {
    client: P,
    topics: Arc<Topics>,
    /// Sensor ids whose discovery records have been published.
    discovered: Arc<DashSet<String>>,
    /// Bumped by every [`ReadingPublisher::forget_discovered`].
    generation: Arc<AtomicU64>,
}

impl<P: Clone> Clone for ReadingPublisher<P> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            topics: self.topics.clone(),
            discovered: self.discovered.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl<P: Publish> ReadingPublisher<P> {
    pub fn new(client: P, topics: Arc<Topics>) -> Self {
        Self {
            client,
            topics,
            discovered: Arc::new(DashSet::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn is_discovered(&self, sensor_id: &str) -> bool {
        self.discovered.contains(sensor_id)
    }

    /// Makes every sensor re-announce itself with its next reading.
    pub fn forget_discovered(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.discovered.clear();
    }

    /// Publishes discovery (once per sensor) followed by the raw reading.
    ///
    /// A failed discovery publish is logged and retried on the next reading;
    /// the state is published regardless.
    pub async fn publish_reading(&self, reading: &SensorReading) -> Result<(), BridgeError> {
        let sensor_id = &reading.sensor_id;

        if self.topics.discovery_enabled() && !self.is_discovered(sensor_id) {
            let generation = self.generation.load(Ordering::SeqCst);
            match self.announce(reading).await {
                Ok(count) => {
                    info!("[{sensor_id}] Published discovery for {count} entities");
                    self.discovered.insert(sensor_id.clone());
                    // A reset that raced the announcement wins.
                    if self.generation.load(Ordering::SeqCst) != generation {
                        debug!("[{sensor_id}] Discovery was reset while announcing");
                        self.discovered.remove(sensor_id);
                    }
                }
                Err(e) => error!("[{sensor_id}] Failed to publish discovery: {e}"),
            }
        }

        let topic = self.topics.state_topic(sensor_id)?;
        debug!("[{sensor_id}] Publishing state to {topic}");
        self.client
            .publish(&topic, reading.raw.clone().into_bytes(), true)
            .await
    }

    async fn announce(&self, reading: &SensorReading) -> Result<usize, BridgeError> {
        let messages = discovery::discovery_messages(reading, &self.topics)?;
        let count = messages.len();
        for (topic, payload) in messages {
            self.client.publish(&topic, payload, true).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// A message captured by [`RecordingClient`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct Recorded {
        pub topic: String,
        pub payload: Vec<u8>,
        pub retain: bool,
    }

    type Hook = Box<dyn FnOnce() + Send>;

    /// In-memory [`Publish`] that records messages and can be told to fail.
    #[derive(Clone, Default)]
    pub struct RecordingClient {
        pub messages: Arc<Mutex<Vec<Recorded>>>,
        pub fail_discovery: Arc<Mutex<bool>>,
        /// Runs once, on the next discovery publish.
        pub on_discovery: Arc<Mutex<Option<Hook>>>,
    }

    impl RecordingClient {
        pub fn take(&self) -> Vec<Recorded> {
            std::mem::take(&mut *self.messages.lock().unwrap())
        }
    }

    #[async_trait]
    impl Publish for RecordingClient {
        async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BridgeError> {
            if *self.fail_discovery.lock().unwrap() && topic.ends_with("/config") {
                let err = serde_json::from_str::<serde_json::Value>("broker gone").unwrap_err();
                return Err(BridgeError::Serialize(err));
            }
            if topic.ends_with("/config") {
                let hook = self.on_discovery.lock().unwrap().take();
                if let Some(hook) = hook {
                    hook();
                }
            }
            self.messages.lock().unwrap().push(Recorded {
                topic: topic.to_string(),
                payload,
                retain,
            });
            Ok(())
        }
    }
}
