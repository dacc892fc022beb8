// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Orvibo device commands built on endpoint exchanges.

pub mod packet;
mod s20;

pub use packet::{DiscoveryReply, MacAddress};
pub use s20::{discover, DiscoveredDevice, S20};
