//! Periodic sampling with drop-latest backpressure
//!
//! A ticker task writes each tick into a single-slot `watch` channel. The
//! worker loop waits for a tick it hasn't seen, runs the job to completion,
//! and only then looks at the slot again. Ticks that arrive while the job is
//! running overwrite each other, so at most one is ever pending and the
//! ticker never blocks. The effective rate is therefore
//! `min(tick rate, job rate)`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

use crate::error::{Result, ScreenhueError};
use crate::metrics::SamplingMetrics;

/// One clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Sequence number, starting at 1
    pub seq: u64,
    /// When the clock fired
    pub at: Instant,
}

/// Drives a job on a fixed cadence, one run at a time
#[derive(Debug, Clone)]
pub struct SampleScheduler {
    interval: Duration,
    metrics: Option<Arc<SamplingMetrics>>,
}

impl SampleScheduler {
    /// Create a scheduler ticking every `interval`
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(ScreenhueError::config("Sampling interval cannot be zero"));
        }
        Ok(Self {
            interval,
            metrics: None,
        })
    }

    /// Record ticks and coalescing into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<SamplingMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `job` once per effective tick
    ///
    /// Never completes on its own; stop it by dropping the future (for
    /// example by aborting the task that owns it).
    pub async fn run<F, Fut>(&self, mut job: F)
    where
        F: FnMut(Tick) -> Fut,
        Fut: Future<Output = ()>,
    {
        let (tick_tx, mut tick_rx) = watch::channel(Tick {
            seq: 0,
            at: Instant::now(),
        });

        let interval = self.interval;
        tokio::spawn(async move {
            let mut clock = tokio::time::interval(interval);
            clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    at = clock.tick() => {
                        seq += 1;
                        // Overwrites any tick the worker hasn't picked up yet.
                        tick_tx.send_replace(Tick { seq, at });
                    }
                    _ = tick_tx.closed() => break,
                }
            }
        });

        let mut last_seq = 0u64;
        while tick_rx.changed().await.is_ok() {
            let tick = *tick_rx.borrow_and_update();
            let coalesced = tick.seq.saturating_sub(last_seq + 1);
            if coalesced > 0 {
                trace!("Coalesced {} ticks while busy", coalesced);
            }
            if let Some(ref metrics) = self.metrics {
                metrics.record_tick(coalesced);
            }
            last_seq = tick.seq;

            job(tick).await;
        }
    }
}
