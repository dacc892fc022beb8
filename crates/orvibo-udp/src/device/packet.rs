// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Orvibo packet encoding.
//!
//! Every packet starts with the magic `68 64`, a big-endian u16 total length
//! and a two-letter command id:
//!
//! | Command       | Id   | Request body                                  |
//! |---------------|------|-----------------------------------------------|
//! | discovery     | `qa` | (none)                                        |
//! | subscribe     | `cl` | mac, 6 x `0x20`, reversed mac, 6 x `0x20`     |
//! | state change  | `dc` | mac, 6 x `0x20`, 4 x `0x00`, state (`0`/`1`)  |

use crate::error::DeviceError;
use std::fmt;
use std::str::FromStr;

pub const MAGIC: [u8; 2] = [0x68, 0x64];
pub const DISCOVERY_ID: [u8; 2] = *b"qa";
pub const SUBSCRIBE_ID: [u8; 2] = *b"cl";
pub const STATE_CHANGE_ID: [u8; 2] = *b"dc";

const PADDING_1: [u8; 6] = [0x20; 6];
const PADDING_2: [u8; 4] = [0x00; 4];

const HEADER_LEN: usize = 6;
const MAC_RANGE: std::ops::Range<usize> = 6..12;
const DISCOVERY_MAC_RANGE: std::ops::Range<usize> = 7..13;
const DISCOVERY_TYPE_RANGE: std::ops::Range<usize> = 31..37;

/// Device MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    fn reversed(&self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for MacAddress {
    type Err = DeviceError;

    /// Accepts `accf2393349c`, `ac:cf:23:93:34:9c` and `ac-cf-23-93-34-9c`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DeviceError::InvalidMac(s.to_string()));
        }
        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| DeviceError::InvalidMac(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

fn packet(command: [u8; 2], body: &[&[u8]]) -> Vec<u8> {
    let len = HEADER_LEN + body.iter().map(|part| part.len()).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(&MAGIC);
    // Orvibo packets are far below u16::MAX.
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.extend_from_slice(&command);
    for part in body {
        out.extend_from_slice(part);
    }
    out
}

/// Broadcast discovery request.
pub fn discovery_request() -> Vec<u8> {
    packet(DISCOVERY_ID, &[])
}

/// Subscribe request; the reply carries the current power state.
pub fn subscribe_request(mac: &MacAddress) -> Vec<u8> {
    packet(
        SUBSCRIBE_ID,
        &[mac.as_bytes(), &PADDING_1, &mac.reversed(), &PADDING_1],
    )
}

/// Power state change request.
pub fn state_change_request(mac: &MacAddress, on: bool) -> Vec<u8> {
    packet(
        STATE_CHANGE_ID,
        &[mac.as_bytes(), &PADDING_1, &PADDING_2, &[u8::from(on)]],
    )
}

/// Discovery reply as sent by a device.
pub fn discovery_reply(mac: &MacAddress, device_type: &[u8; 6]) -> Vec<u8> {
    packet(
        DISCOVERY_ID,
        &[
            &[0x00],
            mac.as_bytes(),
            &PADDING_1,
            &mac.reversed(),
            &PADDING_1,
            device_type,
            &[0x00; 4],
        ],
    )
}

/// Subscribe reply as sent by a device.
pub fn subscribe_reply(mac: &MacAddress, on: bool) -> Vec<u8> {
    packet(
        SUBSCRIBE_ID,
        &[
            mac.as_bytes(),
            &PADDING_1,
            &mac.reversed(),
            &PADDING_1,
            &[0x00; 5],
            &[u8::from(on)],
        ],
    )
}

/// State change confirmation as sent by a device.
pub fn state_change_reply(mac: &MacAddress, on: bool) -> Vec<u8> {
    state_change_request(mac, on)
}

/// Command id of a well-framed packet.
pub fn command_id(data: &[u8]) -> Option<[u8; 2]> {
    if data.len() < HEADER_LEN || data[..2] != MAGIC {
        return None;
    }
    Some([data[4], data[5]])
}

fn addressed_to(data: &[u8], command: [u8; 2], mac: &MacAddress) -> bool {
    command_id(data) == Some(command) && data.get(MAC_RANGE) == Some(&mac.as_bytes()[..])
}

/// A device's answer to a discovery broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReply {
    pub mac: MacAddress,
    /// Model identifier, e.g. `SOC002` for an S20 socket.
    pub device_type: String,
}

/// Parse a discovery reply. Our own broadcast, looped back, is too short
/// to qualify.
pub fn parse_discovery_reply(data: &[u8]) -> Option<DiscoveryReply> {
    if command_id(data)? != DISCOVERY_ID || data.len() < DISCOVERY_TYPE_RANGE.end {
        return None;
    }
    Some(DiscoveryReply {
        mac: MacAddress::from_slice(&data[DISCOVERY_MAC_RANGE])?,
        device_type: String::from_utf8_lossy(&data[DISCOVERY_TYPE_RANGE]).into_owned(),
    })
}

/// Power state from `mac`'s subscribe reply.
pub fn parse_subscribe_reply(data: &[u8], mac: &MacAddress) -> Option<bool> {
    if !addressed_to(data, SUBSCRIBE_ID, mac) || data.len() <= MAC_RANGE.end {
        return None;
    }
    data.last().map(|state| *state != 0)
}

/// Whether `data` confirms a state change on `mac`.
pub fn is_state_change_reply(data: &[u8], mac: &MacAddress) -> bool {
    addressed_to(data, STATE_CHANGE_ID, mac)
}
