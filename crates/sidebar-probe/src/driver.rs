//! State driver: perform the transition, then wait for it to settle.
//!
//! Geometry is only trusted once the animated transition has finished. Two
//! strategies are available:
//!
//! - [`SettleStrategy::Fixed`]: sleep for a configured delay (600ms default).
//! - [`SettleStrategy::PollUntilStable`]: re-measure a probe locator until two
//!   consecutive measurements agree, bounded by a hard timeout.
//!
//! The driver never decides which layout state the page is in.

use crate::config::{HarnessConfig, SettleMode};
use crate::gateway::{BrowserGateway, ElementHandle};
use crate::geometry::BoundingBox;
use crate::locator::{locate, Locator};
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How to wait after an action
#[derive(Debug, Clone)]
pub enum SettleStrategy {
    /// Sleep for a fixed duration
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Re-measure `probe` until two consecutive samples agree
    PollUntilStable {
        /// Element(s) whose geometry is watched
        probe: Locator,
        /// Delay between samples
        interval_ms: u64,
        /// Hard upper bound
        timeout_ms: u64,
        /// Per-component tolerance for "same geometry"
        tolerance_px: f64,
        /// Delay used when the probe cannot be found
        fallback_delay_ms: u64,
    },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::Fixed {
            delay_ms: crate::config::DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl SettleStrategy {
    /// Strategy described by `config`. Poll mode needs a probe; without one
    /// the fixed delay is used.
    #[must_use]
    pub fn from_config(config: &HarnessConfig, probe: Option<Locator>) -> Self {
        match (config.settle_mode, probe) {
            (SettleMode::Poll, Some(probe)) => Self::PollUntilStable {
                probe,
                interval_ms: config.poll_interval_ms,
                timeout_ms: config.poll_timeout_ms,
                tolerance_px: config.stability_tolerance_px,
                fallback_delay_ms: config.settle_delay_ms,
            },
            _ => Self::Fixed {
                delay_ms: config.settle_delay_ms,
            },
        }
    }
}

/// How the settle wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleKind {
    /// Fixed delay elapsed
    Delay,
    /// Two consecutive samples agreed
    Stable,
    /// Poll probe was missing; fixed delay used instead
    FellBack,
}

/// Result of a settle wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleOutcome {
    /// How the wait ended
    pub kind: SettleKind,
    /// Samples taken (zero for fixed delays)
    pub samples: usize,
    /// Wall time spent waiting
    pub waited_ms: u64,
}

/// Drives one transition at a time
#[derive(Debug, Clone, Default)]
pub struct StateDriver {
    strategy: SettleStrategy,
}

impl StateDriver {
    /// Create a driver
    #[must_use]
    pub const fn new(strategy: SettleStrategy) -> Self {
        Self { strategy }
    }

    /// Driver with a fixed delay
    #[must_use]
    pub const fn fixed(delay_ms: u64) -> Self {
        Self::new(SettleStrategy::Fixed { delay_ms })
    }

    /// Configured strategy
    #[must_use]
    pub const fn strategy(&self) -> &SettleStrategy {
        &self.strategy
    }

    /// Click `handle` and wait for the page to settle.
    ///
    /// # Errors
    ///
    /// Click failures (including stale handles) and poll timeouts.
    pub async fn transition<G>(&self, gateway: &G, handle: &ElementHandle) -> ProbeResult<SettleOutcome>
    where
        G: BrowserGateway + ?Sized,
    {
        gateway.click(handle).await?;
        self.settle(gateway).await
    }

    /// Wait for the page to settle without acting
    pub async fn settle<G>(&self, gateway: &G) -> ProbeResult<SettleOutcome>
    where
        G: BrowserGateway + ?Sized,
    {
        match &self.strategy {
            SettleStrategy::Fixed { delay_ms } => Ok(fixed_delay(*delay_ms, SettleKind::Delay).await),
            SettleStrategy::PollUntilStable {
                probe,
                interval_ms,
                timeout_ms,
                tolerance_px,
                fallback_delay_ms,
            } => {
                poll_until_stable(
                    gateway,
                    probe,
                    *interval_ms,
                    *timeout_ms,
                    *tolerance_px,
                    *fallback_delay_ms,
                )
                .await
            }
        }
    }
}

async fn fixed_delay(delay_ms: u64, kind: SettleKind) -> SettleOutcome {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    SettleOutcome {
        kind,
        samples: 0,
        waited_ms: delay_ms,
    }
}

async fn poll_until_stable<G>(
    gateway: &G,
    probe: &Locator,
    interval_ms: u64,
    timeout_ms: u64,
    tolerance_px: f64,
    fallback_delay_ms: u64,
) -> ProbeResult<SettleOutcome>
where
    G: BrowserGateway + ?Sized,
{
    let start = Instant::now();
    let interval = Duration::from_millis(interval_ms);
    let timeout = Duration::from_millis(timeout_ms);
    let mut previous: Option<Vec<Option<BoundingBox>>> = None;
    let mut samples = 0;

    loop {
        tokio::time::sleep(interval).await;

        let located = locate(gateway, probe, None).await?;
        if located.is_empty() && previous.is_none() {
            warn!(probe = %probe.name, "settle probe not found, using fixed delay");
            return Ok(fixed_delay(fallback_delay_ms, SettleKind::FellBack).await);
        }

        let current: Vec<Option<BoundingBox>> = located.matches.iter().map(|c| c.bbox).collect();
        samples += 1;
        debug!(probe = %probe.name, sample = samples, "settle poll");

        if previous
            .as_ref()
            .is_some_and(|prev| same_geometry(prev, &current, tolerance_px))
        {
            return Ok(SettleOutcome {
                kind: SettleKind::Stable,
                samples,
                waited_ms: elapsed_ms(start),
            });
        }

        if start.elapsed() >= timeout {
            return Err(ProbeError::timeout(
                format!("settle poll for '{}'", probe.name),
                timeout_ms,
            ));
        }
        previous = Some(current);
    }
}

fn same_geometry(a: &[Option<BoundingBox>], b: &[Option<BoundingBox>], tolerance: f64) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Some(x), Some(y)) => x.approx_eq(y, tolerance),
            (None, None) => true,
            _ => false,
        })
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
