// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Orvibo S20 smart socket.

use super::packet::{self, MacAddress};
use crate::config::{DeviceConfig, TransportConfig};
use crate::endpoint::{open_local_endpoint, LocalEndpoint};
use crate::error::DeviceError;
use crate::exchange::{ExchangeOutcome, Verdict};
use std::collections::HashSet;
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::{debug, info};

/// A device that answered a discovery broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub mac: MacAddress,
    pub address: SocketAddr,
    pub device_type: String,
}

/// Broadcast a discovery request and collect every reply of one attempt.
///
/// Replies are deduplicated by MAC and kept in arrival order. Device types
/// are reported, not filtered.
pub async fn discover(
    endpoint: &LocalEndpoint,
    config: &DeviceConfig,
) -> Result<Vec<DiscoveredDevice>, DeviceError> {
    let target = SocketAddr::new(config.broadcast_address.into(), config.port);
    let request = packet::discovery_request();
    let outcome = endpoint
        .exchange(
            Some(request.as_slice()),
            target,
            config.discovery_params(),
            |d| {
                if packet::parse_discovery_reply(&d.payload).is_some() {
                    Verdict::AddAndContinueWaiting
                } else {
                    Verdict::ContinueWaiting
                }
            },
        )
        .await?;

    let mut seen = HashSet::new();
    let devices: Vec<DiscoveredDevice> = outcome
        .map(ExchangeOutcome::into_datagrams)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|d| {
            let reply = packet::parse_discovery_reply(&d.payload)?;
            seen.insert(reply.mac).then(|| DiscoveredDevice {
                mac: reply.mac,
                address: d.peer,
                device_type: reply.device_type,
            })
        })
        .collect();

    info!("Discovery found {} device(s) via {}", devices.len(), target);
    Ok(devices)
}

/// Orvibo S20 smart socket.
#[derive(Debug)]
pub struct S20 {
    address: SocketAddr,
    mac: MacAddress,
    endpoint: LocalEndpoint,
    config: DeviceConfig,
    state: Option<bool>,
    subscribed_at: Option<Instant>,
}

impl S20 {
    /// Drive the socket at `address` through an existing endpoint.
    pub fn new(
        endpoint: LocalEndpoint,
        address: SocketAddr,
        mac: MacAddress,
        config: DeviceConfig,
    ) -> Self {
        Self {
            address,
            mac,
            endpoint,
            config,
            state: None,
            subscribed_at: None,
        }
    }

    /// Open a local endpoint on `config.local_port` and drive the socket through it.
    pub async fn open(
        address: SocketAddr,
        mac: MacAddress,
        transport: &TransportConfig,
        config: DeviceConfig,
    ) -> Result<Self, DeviceError> {
        let endpoint = open_local_endpoint(
            &transport.bind_address.to_string(),
            config.local_port,
            transport,
        )
        .await?;
        Ok(Self::new(endpoint, address, mac, config))
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Last known power state; `None` until a subscribe or state change succeeds.
    pub fn state(&self) -> Option<bool> {
        self.state
    }

    pub fn endpoint(&self) -> &LocalEndpoint {
        &self.endpoint
    }

    /// Subscribe to the socket, refreshing the power state.
    ///
    /// Returns `Ok(false)` when the socket never answered.
    pub async fn subscribe(&mut self) -> Result<bool, DeviceError> {
        let mac = self.mac;
        let request = packet::subscribe_request(&mac);
        let outcome = self
            .endpoint
            .exchange(
                Some(request.as_slice()),
                self.address,
                self.config.command_params(),
                |d| match packet::parse_subscribe_reply(&d.payload, &mac) {
                    Some(_) => Verdict::ReturnImmediately,
                    None => Verdict::ContinueWaiting,
                },
            )
            .await?;

        let state = outcome
            .and_then(ExchangeOutcome::matched)
            .and_then(|d| packet::parse_subscribe_reply(&d.payload, &mac));
        match state {
            Some(on) => {
                debug!("Subscribed to {} ({}), state={}", mac, self.address, on);
                self.state = Some(on);
                self.subscribed_at = Some(Instant::now());
                Ok(true)
            }
            None => {
                debug!("Subscribe to {} ({}) unanswered", mac, self.address);
                Ok(false)
            }
        }
    }

    /// Subscribe unless a recent enough subscription exists.
    pub async fn subscribe_if_necessary(&mut self) -> Result<bool, DeviceError> {
        let fresh = self
            .subscribed_at
            .is_some_and(|at| at.elapsed() < self.config.resubscribe_after());
        if fresh {
            return Ok(true);
        }
        self.subscribe().await
    }

    /// Switch the socket on or off.
    ///
    /// Returns `Ok(true)` once the socket confirmed the change, `Ok(false)`
    /// when it could not be subscribed or never confirmed.
    pub async fn state_change(&mut self, on: bool) -> Result<bool, DeviceError> {
        if !self.subscribe_if_necessary().await? {
            return Ok(false);
        }
        let mac = self.mac;
        let request = packet::state_change_request(&mac, on);
        let outcome = self
            .endpoint
            .exchange(
                Some(request.as_slice()),
                self.address,
                self.config.command_params(),
                |d| {
                    if packet::is_state_change_reply(&d.payload, &mac) {
                        Verdict::ReturnImmediately
                    } else {
                        Verdict::ContinueWaiting
                    }
                },
            )
            .await?;

        let confirmed = outcome.is_some();
        if confirmed {
            info!("{} switched {}", mac, if on { "on" } else { "off" });
            self.state = Some(on);
        }
        Ok(confirmed)
    }
}
