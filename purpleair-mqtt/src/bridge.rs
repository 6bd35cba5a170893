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

//! Broker session: availability, reconnects and Home Assistant birth messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use tokio::task::JoinHandle;

use crate::config::MqttBridgeConfig;
use crate::error::BridgeError;
use crate::publisher::ReadingPublisher;
use crate::topics::{Availability, Topics};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// What an event loop notification means to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A (re)connection was acknowledged.
    Connected,
    /// Home Assistant published its birth message.
    HomeAssistantOnline,
    HomeAssistantOffline,
    Other,
}

/// Maps a rumqttc notification onto a [`BrokerEvent`].
pub fn classify(event: &Event, topics: &Topics) -> BrokerEvent {
    match event {
        Event::Incoming(Incoming::ConnAck(_)) => BrokerEvent::Connected,
        Event::Incoming(Incoming::Publish(publish))
            if topics.ha_status_topic() == Some(publish.topic.as_str()) =>
        {
            match publish.payload.as_ref() {
                b"online" => BrokerEvent::HomeAssistantOnline,
                b"offline" => BrokerEvent::HomeAssistantOffline,
                _ => BrokerEvent::Other,
            }
        }
        _ => BrokerEvent::Other,
    }
}

/// Owns the MQTT client and the task driving its event loop.
pub struct MqttBridge {
    client: AsyncClient,
    topics: Arc<Topics>,
    stopping: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl MqttBridge {
    /// Connects to the broker and spawns the event loop.
    ///
    /// The returned publisher shares the client, so readings can be published
    /// while the bridge keeps the session alive.
    pub fn connect(
        config: &MqttBridgeConfig,
    ) -> Result<(Self, ReadingPublisher<AsyncClient>), BridgeError> {
        info!(
            "Connecting to MQTT broker {}:{} as {}",
            config.host, config.port, config.client_id
        );

        let topics = Arc::new(Topics::new(config)?);

        let mut mqtt_opts = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqtt_opts.set_keep_alive(config.keep_alive);
        mqtt_opts.set_last_will(LastWill::new(
            topics.status_topic(),
            Availability::OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));

        match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                mqtt_opts.set_credentials(user, pass);
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("MQTT credentials incomplete: both username and password must be set to enable auth");
            }
            (None, None) => {}
        }

        let (client, eventloop) = AsyncClient::new(mqtt_opts, 100);
        let publisher = ReadingPublisher::new(client.clone(), topics.clone());
        let stopping = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(drive(
            eventloop,
            client.clone(),
            publisher.clone(),
            stopping.clone(),
        ));

        let bridge = Self {
            client,
            topics,
            stopping,
            handle,
        };
        Ok((bridge, publisher))
    }

    /// Marks the bridge offline, disconnects and waits for the event loop to drain.
    pub async fn shutdown(mut self) {
        info!("Shutting down MQTT bridge");
        self.stopping.store(true, Ordering::SeqCst);

        if let Err(e) = self
            .client
            .publish(
                self.topics.status_topic(),
                QoS::AtLeastOnce,
                true,
                Availability::OFFLINE,
            )
            .await
        {
            warn!("Failed to publish offline status: {e}");
        }
        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to request disconnect: {e}");
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut self.handle).await {
            Ok(_) => info!("Disconnected."),
            Err(_) => {
                warn!("MQTT event loop did not stop within {SHUTDOWN_TIMEOUT:?}, aborting");
                self.handle.abort();
            }
        }
    }
}

async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    publisher: ReadingPublisher<AsyncClient>,
    stopping: Arc<AtomicBool>,
) {
    let topics = publisher.topics();
    loop {
        match eventloop.poll().await {
            Ok(event) => match classify(&event, topics) {
                BrokerEvent::Connected => on_connected(&client, topics, &stopping),
                BrokerEvent::HomeAssistantOnline => {
                    info!("Home Assistant came online, re-announcing sensors");
                    publisher.forget_discovered();
                }
                BrokerEvent::HomeAssistantOffline => debug!("Home Assistant went offline"),
                BrokerEvent::Other => {}
            },
            Err(e) => {
                if stopping.load(Ordering::SeqCst) {
                    debug!("MQTT event loop stopped: {e}");
                    break;
                }
                // rumqttc reconnects on the next poll
                warn!("MQTT connection error (will reconnect): {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Announces the session from its own task. The event loop drains the request
/// queue, which can be full after an outage, so it must not wait on it.
fn on_connected(client: &AsyncClient, topics: &Topics, stopping: &Arc<AtomicBool>) {
    info!("MQTT session is connected");

    let client = client.clone();
    let status_topic = topics.status_topic().to_string();
    let ha_status_topic = topics.ha_status_topic().map(str::to_string);
    let stopping = stopping.clone();

    tokio::spawn(async move {
        if stopping.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = client
            .publish(&status_topic, QoS::AtLeastOnce, true, Availability::ONLINE)
            .await
        {
            error!("Failed to publish online status: {e}");
        }

        match ha_status_topic {
            Some(topic) => {
                info!("Subscribing to topic {topic}");
                if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                    error!("Failed to subscribe to {topic}: {e}");
                }
            }
            None => debug!("Home Assistant discovery is disabled, not subscribing"),
        }
    });
}
