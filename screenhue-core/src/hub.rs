//! Broadcast hub
//!
//! One upstream pipeline, any number of subscribers. The upstream task owns
//! the scheduler loop and publishes each [`ColorEvent`] once into a bounded
//! `broadcast` channel; every [`Subscription`] reads from its own cursor into
//! that channel. A subscriber that falls more than `buffer_capacity` events
//! behind skips ahead to the oldest retained event instead of holding up the
//! producer or anyone else.
//!
//! With [`Lifecycle::OnDemand`] the upstream starts on the first subscription
//! and is aborted when the last one goes away. With
//! [`Lifecycle::Continuous`] it runs from [`BroadcastHub::start`] (or the
//! first subscription) until [`BroadcastHub::shutdown`].

use futures_util::Stream;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::capture::ScreenCapturer;
use crate::config::{Lifecycle, SamplingConfig};
use crate::error::{Result, ScreenhueError};
use crate::event::ColorEvent;
use crate::metrics::{MetricsSnapshot, SamplingMetrics, create_metrics};
use crate::pipeline::SamplePipeline;
use crate::scheduler::SampleScheduler;
use crate::types::{Handle, ScreenBounds};

/// Fan-out of one sampling pipeline to many subscribers
///
/// Cheap to clone; all clones share the same upstream.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    pipeline: Arc<SamplePipeline>,
    scheduler: SampleScheduler,
    lifecycle: Lifecycle,
    metrics: Arc<SamplingMetrics>,
    state: Mutex<HubState>,
}

struct HubState {
    /// `None` once the hub has shut down
    sender: Option<broadcast::Sender<Arc<ColorEvent>>>,
    subscribers: usize,
    upstream: Option<JoinHandle<()>>,
}

impl HubState {
    fn upstream_running(&self) -> bool {
        self.upstream
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl BroadcastHub {
    /// Build a hub around `capturer`
    ///
    /// Fails if the configuration can never produce events, for example when
    /// the primary algorithm is not enabled.
    pub fn new(capturer: Box<dyn ScreenCapturer>, config: &SamplingConfig) -> Result<Self> {
        let metrics = create_metrics();
        let pipeline = SamplePipeline::new(capturer, config, metrics.clone())?;
        let scheduler = SampleScheduler::new(config.interval())?.with_metrics(metrics.clone());
        let (sender, _) = broadcast::channel(config.buffer_capacity);

        info!(
            "Broadcast hub ready: sampling every {}ms, {} lifecycle, buffer {}",
            config.interval_ms, config.lifecycle, config.buffer_capacity
        );

        Ok(Self {
            inner: Arc::new(HubInner {
                pipeline: Arc::new(pipeline),
                scheduler,
                lifecycle: config.lifecycle,
                metrics,
                state: Mutex::new(HubState {
                    sender: Some(sender),
                    subscribers: 0,
                    upstream: None,
                }),
            }),
        })
    }

    /// Start sampling without waiting for a subscriber
    ///
    /// Only meaningful for the continuous lifecycle; an on-demand hub ignores
    /// it and keeps waiting for its first subscriber. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        let sender = state.sender.clone().ok_or(ScreenhueError::HubClosed)?;

        if self.inner.lifecycle == Lifecycle::OnDemand {
            debug!("Hub is on-demand; sampling starts with the first subscriber");
            return Ok(());
        }

        if !state.upstream_running() {
            state.upstream = Some(self.inner.spawn_upstream(sender));
        }
        Ok(())
    }

    /// Attach a new subscriber
    ///
    /// The subscription sees only events published after this call. Must be
    /// called from within a tokio runtime.
    pub fn subscribe(&self) -> Result<Subscription> {
        let mut state = self.inner.state.lock();
        let sender = state.sender.clone().ok_or(ScreenhueError::HubClosed)?;

        let receiver = sender.subscribe();
        state.subscribers += 1;
        let id = Handle::new();
        debug!(
            "Subscriber {} attached ({} active)",
            id, state.subscribers
        );

        if !state.upstream_running() {
            state.upstream = Some(self.inner.spawn_upstream(sender));
        }

        Ok(Subscription {
            id,
            receiver,
            hub: Arc::clone(&self.inner),
            detached: false,
        })
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers
    }

    /// Whether the upstream pipeline is currently sampling
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().upstream_running()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().sender.is_none()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle
    }

    /// Capture area of the underlying capturer
    pub fn bounds(&self) -> ScreenBounds {
        self.inner.pipeline.bounds()
    }

    pub fn pipeline(&self) -> &Arc<SamplePipeline> {
        &self.inner.pipeline
    }

    pub fn metrics(&self) -> &Arc<SamplingMetrics> {
        &self.inner.metrics
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Stop sampling and end every subscription
    ///
    /// Live subscriptions drain what they already have buffered and then
    /// report end of stream. Later calls to `subscribe` fail with
    /// [`ScreenhueError::HubClosed`].
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        let Some(sender) = state.sender.take() else {
            return;
        };
        if let Some(upstream) = state.upstream.take() {
            upstream.abort();
        }
        info!(
            "Broadcast hub shut down with {} subscriber(s) attached",
            state.subscribers
        );
        drop(sender);
    }
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BroadcastHub")
            .field("pipeline", &self.inner.pipeline)
            .field("lifecycle", &self.inner.lifecycle)
            .field("subscribers", &state.subscribers)
            .field("running", &state.upstream_running())
            .field("shut_down", &state.sender.is_none())
            .finish()
    }
}

impl HubInner {
    fn spawn_upstream(&self, sender: broadcast::Sender<Arc<ColorEvent>>) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let scheduler = self.scheduler.clone();
        let metrics = Arc::clone(&self.metrics);

        info!(
            "Starting sampler on {} ({})",
            pipeline.capturer_name(),
            pipeline.bounds()
        );

        tokio::spawn(async move {
            scheduler
                .run(|tick| {
                    let pipeline = Arc::clone(&pipeline);
                    let sender = sender.clone();
                    let metrics = Arc::clone(&metrics);
                    async move {
                        // Failures are logged and counted by the pipeline;
                        // the next tick simply tries again.
                        let Ok(event) = pipeline.sample_async().await else {
                            return;
                        };
                        let delivered = sender.send(Arc::new(event)).unwrap_or(0);
                        metrics.record_published();
                        trace!("Tick {} delivered to {} subscriber(s)", tick.seq, delivered);
                    }
                })
                .await;
        })
    }

    fn detach(&self, id: Handle) {
        let mut state = self.state.lock();
        state.subscribers = state.subscribers.saturating_sub(1);
        debug!("Subscriber {} detached ({} active)", id, state.subscribers);

        if state.subscribers == 0 && self.lifecycle == Lifecycle::OnDemand {
            if let Some(upstream) = state.upstream.take() {
                upstream.abort();
                info!("Last subscriber left, sampler stopped");
            }
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        if let Some(upstream) = self.state.get_mut().upstream.take() {
            upstream.abort();
        }
    }
}

/// One consumer's view of the event stream
///
/// Dropping the subscription detaches it.
pub struct Subscription {
    id: Handle,
    receiver: broadcast::Receiver<Arc<ColorEvent>>,
    hub: Arc<HubInner>,
    detached: bool,
}

impl Subscription {
    pub fn id(&self) -> Handle {
        self.id
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the hub has shut down and everything buffered has
    /// been read. If this subscriber fell behind, the events it missed are
    /// skipped and counted.
    pub async fn next(&mut self) -> Option<Arc<ColorEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting
    ///
    /// `Ok(None)` means nothing is buffered right now;
    /// [`ScreenhueError::HubClosed`] means nothing ever will be.
    pub fn try_next(&mut self) -> Result<Option<Arc<ColorEvent>>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(ScreenhueError::HubClosed),
            }
        }
    }

    fn lagged(&self, skipped: u64) {
        self.hub.metrics.record_lagged(skipped);
        warn!(
            "Subscriber {} fell behind, skipped {} events",
            self.id, skipped
        );
    }

    /// Convert into a stream of events that ends with the hub
    pub fn into_stream(self) -> impl Stream<Item = Arc<ColorEvent>> + Send + 'static {
        futures_util::stream::unfold(self, |mut subscription| async move {
            subscription
                .next()
                .await
                .map(|event| (event, subscription))
        })
    }

    /// Detach explicitly
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.detached {
            self.detached = true;
            self.hub.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.receiver.len())
            .finish()
    }
}
