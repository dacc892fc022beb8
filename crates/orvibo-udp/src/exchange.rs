// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Retrying request/response exchange.
//!
//! One exchange sends a request (optional), then waits for inbound datagrams
//! and lets a caller-supplied classifier decide what each one means:
//!
//! ```text
//! Idle -> Sending -> Waiting -+-> Matched            (ReturnImmediately)
//!            ^                |
//!            |                +-> AttemptTimedOut -+-> Matched   (collected datagrams)
//!            |                                     +-> Retrying --+
//!            +------------------------------------------------- -+
//!                                                  +-> Exhausted (no result)
//! ```
//!
//! The per-attempt timeout is a budget: every receive is bounded by what is
//! left of the attempt, so a stream of unrelated traffic cannot stretch an
//! attempt past its deadline.

use crate::endpoint::{Datagram, Endpoint};
use crate::error::{EndpointError, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What the classifier makes of one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The answer. Stop and return it.
    ReturnImmediately,
    /// A partial result, e.g. one discovery reply among many. Keep it and keep waiting.
    AddAndContinueWaiting,
    /// Unrelated traffic. Ignore it.
    ContinueWaiting,
}

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// A datagram classified [`Verdict::ReturnImmediately`].
    Matched(Datagram),
    /// Everything classified [`Verdict::AddAndContinueWaiting`] during the
    /// attempt, in arrival order.
    Collected(Vec<Datagram>),
}

impl ExchangeOutcome {
    /// All datagrams carried by the outcome, in arrival order.
    pub fn into_datagrams(self) -> Vec<Datagram> {
        match self {
            ExchangeOutcome::Matched(datagram) => vec![datagram],
            ExchangeOutcome::Collected(datagrams) => datagrams,
        }
    }

    /// The matched datagram, if the exchange ended on a definitive answer.
    pub fn matched(self) -> Option<Datagram> {
        match self {
            ExchangeOutcome::Matched(datagram) => Some(datagram),
            ExchangeOutcome::Collected(_) => None,
        }
    }
}

/// Timeout budget and attempt count of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeParams {
    /// Budget of each attempt.
    pub timeout: Duration,
    /// Number of attempts. A listen-only exchange makes at most one.
    pub retries: u32,
}

impl Default for ExchangeParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            retries: 3,
        }
    }
}

impl ExchangeParams {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }
}

enum AttemptEnd {
    Matched(Datagram),
    TimedOut,
}

impl Endpoint {
    /// Run a request/response exchange on this endpoint.
    ///
    /// For each attempt: send `request` to `target` (if there is a request),
    /// then classify inbound datagrams until the attempt's budget runs out.
    /// Returns `Ok(None)` when every attempt came back empty; only endpoint
    /// closure is an error.
    ///
    /// Without a request a single waiting pass is made whatever
    /// `params.retries` says, since there is nothing to resend.
    pub async fn exchange<F>(
        &self,
        request: Option<&[u8]>,
        target: Option<SocketAddr>,
        params: ExchangeParams,
        mut classify: F,
    ) -> Result<Option<ExchangeOutcome>>
    where
        F: FnMut(&Datagram) -> Verdict,
    {
        for attempt in 1..=params.retries {
            if let Some(payload) = request {
                debug!(
                    "Exchange attempt {}/{}: sending {} bytes to {:?}",
                    attempt,
                    params.retries,
                    payload.len(),
                    target
                );
                match self.send(payload, target) {
                    Ok(()) => {}
                    Err(err @ (EndpointError::Closed | EndpointError::NotConnected)) => {
                        return Err(err)
                    }
                    // Lost like any other datagram; the next attempt resends it.
                    Err(err) => warn!("Exchange send failed: {}", err),
                }
            }

            let mut collected = Vec::new();
            match self
                .wait_attempt(params.timeout, &mut classify, &mut collected)
                .await?
            {
                AttemptEnd::Matched(datagram) => {
                    debug!("Exchange matched datagram from {}", datagram.peer);
                    return Ok(Some(ExchangeOutcome::Matched(datagram)));
                }
                AttemptEnd::TimedOut => {
                    debug!(
                        "Exchange attempt {}/{} timed out with {} collected",
                        attempt,
                        params.retries,
                        collected.len()
                    );
                }
            }

            if !collected.is_empty() {
                return Ok(Some(ExchangeOutcome::Collected(collected)));
            }
            if request.is_none() {
                break;
            }
        }
        Ok(None)
    }

    async fn wait_attempt<F>(
        &self,
        timeout: Duration,
        classify: &mut F,
        collected: &mut Vec<Datagram>,
    ) -> Result<AttemptEnd>
    where
        F: FnMut(&Datagram) -> Verdict,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(AttemptEnd::TimedOut);
            }
            let datagram = match tokio::time::timeout(remaining, self.receive()).await {
                Ok(received) => received?,
                Err(_) => return Ok(AttemptEnd::TimedOut),
            };
            match classify(&datagram) {
                Verdict::ReturnImmediately => return Ok(AttemptEnd::Matched(datagram)),
                Verdict::AddAndContinueWaiting => collected.push(datagram),
                Verdict::ContinueWaiting => {}
            }
        }
    }
}
