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

mod logging;
mod settings;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use purpleair_mqtt::{MqttBridge, Publish, ReadingPublisher};
use purpleair_sensor::SensorClient;
use tokio::time::{Interval, MissedTickBehavior};

use settings::{AppConfig, LoggingSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, source) = settings::load().map_err(fatal)?;
    logging::init(&config.logging).map_err(fatal)?;

    info!("Read configuration from {}", source.display());
    debug!("Configuration: {config:?}");

    if let Err(e) = run(config).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

/// Reports an error raised before the configured logger is up through a stderr logger.
fn fatal(e: anyhow::Error) -> anyhow::Error {
    // Fails harmlessly when a logger is already installed.
    let _ = logging::init(&LoggingSettings::default());
    error!("{e:#}");
    e
}

async fn run(config: AppConfig) -> Result<()> {
    let sensors =
        SensorClient::new(config.poller_config()).context("Failed to build sensor client")?;
    if sensors.config().urls.is_empty() {
        warn!("No Purple Air URLs configured, nothing will be published");
    }

    let (bridge, publisher) =
        MqttBridge::connect(&config.bridge_config()?).context("Failed to set up MQTT bridge")?;

    let mut ticker = tokio::time::interval(sensors.config().refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                match res {
                    Ok(()) => info!("Shutdown signal received"),
                    Err(e) => error!("{e:#}"),
                }
                break;
            }
            _ = next_cycle(&mut ticker, &sensors, &publisher) => {}
        }
    }

    bridge.shutdown().await;
    Ok(())
}

async fn next_cycle<P: Publish>(
    ticker: &mut Interval,
    sensors: &SensorClient,
    publisher: &ReadingPublisher<P>,
) {
    ticker.tick().await;
    poll_cycle(sensors, publisher).await;
}

/// Fetches every sensor once and publishes what came back.
async fn poll_cycle<P: Publish>(sensors: &SensorClient, publisher: &ReadingPublisher<P>) {
    for (url, result) in sensors.poll_all().await {
        match result {
            Ok(reading) => {
                if let Err(e) = publisher.publish_reading(&reading).await {
                    error!("[{}] Failed to publish reading: {e}", reading.sensor_id);
                }
            }
            Err(e) => error!("Failed to retrieve data from {url}: {e}"),
        }
    }
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to wait for Ctrl+C signal")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl+C signal")?;

    Ok(())
}
