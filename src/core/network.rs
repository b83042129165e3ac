//! Connectivity checks used to gate refreshes

use super::config::NetworkConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Disconnected,
    Metered,
    Unmetered,
}

#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    async fn status(&self) -> NetworkStatus;
}

/// Reports the network as reachable when a probe URL answers in time.
///
/// Whether the link is metered cannot be observed from here, so it comes
/// from configuration.
pub struct ProbeNetworkMonitor {
    client: reqwest::Client,
    probe_url: String,
    metered: bool,
}

impl ProbeNetworkMonitor {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.probe_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            probe_url: config.probe_url.clone(),
            metered: config.metered,
        })
    }
}

#[async_trait]
impl NetworkMonitor for ProbeNetworkMonitor {
    async fn status(&self) -> NetworkStatus {
        match self.client.head(&self.probe_url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Network probe answered");
                if self.metered {
                    NetworkStatus::Metered
                } else {
                    NetworkStatus::Unmetered
                }
            }
            Err(err) => {
                debug!(error = %err, "Network probe failed");
                NetworkStatus::Disconnected
            }
        }
    }
}

/// Always reports the same status.
pub struct StaticNetworkMonitor(pub NetworkStatus);

#[async_trait]
impl NetworkMonitor for StaticNetworkMonitor {
    async fn status(&self) -> NetworkStatus {
        self.0
    }
}
