//! Integration tests for the broadcast hub
//!
//! These run against the real clock with short intervals, so bounds are
//! deliberately loose.

mod mocks;

use mocks::ScriptedCapturer;
use screenhue_core::config::{Lifecycle, SamplingConfig};
use screenhue_core::error::ScreenhueError;
use screenhue_core::hub::{BroadcastHub, Subscription};
use screenhue_core::reduce::Algorithm;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_test::assert_pending;

const INTERVAL: Duration = Duration::from_millis(20);

fn fast_config() -> SamplingConfig {
    SamplingConfig::default()
        .with_interval(INTERVAL)
        .with_pixel_density(1)
}

/// Red channel of the next event, which is the capture number
async fn next_capture(subscription: &mut Subscription) -> u8 {
    timeout(Duration::from_secs(2), subscription.next())
        .await
        .expect("timed out waiting for an event")
        .expect("hub closed unexpectedly")
        .color()
        .red
}

#[tokio::test]
async fn test_no_captures_without_subscribers() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    sleep(INTERVAL * 8).await;

    assert_eq!(probe.calls(), 0);
    assert!(!hub.is_running());
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn test_subscribers_share_one_upstream() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    // Nothing yields between these two calls, so both see the first event.
    let mut first = hub.subscribe().unwrap();
    let mut second = hub.subscribe().unwrap();
    assert_eq!(hub.subscriber_count(), 2);

    let mut seen_first = Vec::new();
    let mut seen_second = Vec::new();
    for _ in 0..5 {
        seen_first.push(next_capture(&mut first).await);
        seen_second.push(next_capture(&mut second).await);
    }

    assert_eq!(seen_first, seen_second);
    assert_eq!(seen_first, vec![1, 2, 3, 4, 5]);
    assert_eq!(probe.max_in_flight(), 1);
}

#[tokio::test]
async fn test_second_subscriber_does_not_double_rate() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    let mut first = hub.subscribe().unwrap();
    next_capture(&mut first).await;
    let _second = hub.subscribe().unwrap();

    let window = Duration::from_millis(400);
    let before = probe.calls();
    sleep(window).await;
    let during = probe.calls() - before;

    let ticks = (window.as_millis() / INTERVAL.as_millis()) as u64;
    assert!(during <= ticks + 3, "{} captures in {} ticks", during, ticks);
    assert!(during >= ticks / 2, "only {} captures in {} ticks", during, ticks);
}

#[tokio::test]
async fn test_detached_subscriber_leaves_others_untouched() {
    let (capturer, _probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    let mut stays = hub.subscribe().unwrap();
    let mut leaves = hub.subscribe().unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(next_capture(&mut stays).await);
        next_capture(&mut leaves).await;
    }

    leaves.unsubscribe();
    assert_eq!(hub.subscriber_count(), 1);
    assert!(hub.is_running());

    for _ in 0..5 {
        seen.push(next_capture(&mut stays).await);
    }
    let expected: Vec<u8> = (1..=8).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_last_subscriber_stops_sampling() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    let mut subscription = hub.subscribe().unwrap();
    next_capture(&mut subscription).await;
    drop(subscription);

    assert_eq!(hub.subscriber_count(), 0);
    assert!(!hub.is_running());

    // Let a capture that was already in flight finish.
    sleep(INTERVAL * 2).await;
    let stopped_at = probe.calls();
    sleep(INTERVAL * 8).await;
    assert_eq!(probe.calls(), stopped_at);

    let mut again = hub.subscribe().unwrap();
    let capture = next_capture(&mut again).await;
    assert!(u64::from(capture) > stopped_at);
}

#[tokio::test]
async fn test_shutdown_ends_subscriptions() {
    let (capturer, _probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    let mut subscription = hub.subscribe().unwrap();
    next_capture(&mut subscription).await;

    hub.shutdown();
    assert!(hub.is_shut_down());

    let ended = timeout(Duration::from_secs(2), async {
        while subscription.next().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok(), "subscription never ended");
    assert!(matches!(hub.subscribe(), Err(ScreenhueError::HubClosed)));

    // Idempotent
    hub.shutdown();
}

#[tokio::test]
async fn test_failing_capturer_keeps_ticking() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.failing().boxed(), &fast_config()).unwrap();

    let mut subscription = hub.subscribe().unwrap();
    sleep(INTERVAL * 8).await;

    assert!(probe.calls() >= 3, "only {} attempts", probe.calls());
    assert!(matches!(subscription.try_next(), Ok(None)));
    {
        let mut next = tokio_test::task::spawn(subscription.next());
        assert_pending!(next.poll());
    }

    let snapshot = hub.snapshot();
    assert_eq!(snapshot.events_published, 0);
    assert!(snapshot.capture_failures >= 3);
    assert!(snapshot.consecutive_failures >= 3);
    assert!(hub.is_running());
}

#[tokio::test]
async fn test_missing_primary_fails_before_ticking() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let config = fast_config()
        .with_algorithms([Algorithm::AverageRgb])
        .with_primary(Algorithm::AverageHue);

    let err = BroadcastHub::new(capturer.boxed(), &config).unwrap_err();
    assert!(matches!(err.root(), ScreenhueError::Config(_)));
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn test_continuous_lifecycle_runs_without_subscribers() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let config = fast_config().with_lifecycle(Lifecycle::Continuous);
    let hub = BroadcastHub::new(capturer.boxed(), &config).unwrap();

    hub.start().unwrap();
    sleep(INTERVAL * 6).await;
    assert!(probe.calls() > 0);

    // A subscriber coming and going does not stop it.
    drop(hub.subscribe().unwrap());
    assert!(hub.is_running());

    hub.shutdown();
    assert!(!hub.is_running());
    assert!(matches!(hub.start(), Err(ScreenhueError::HubClosed)));
}

#[tokio::test]
async fn test_on_demand_start_is_a_no_op() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    hub.start().unwrap();
    sleep(INTERVAL * 4).await;
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn test_slow_subscriber_skips_ahead() {
    let (capturer, _probe) = ScriptedCapturer::new(8, 8);
    let config = SamplingConfig::default()
        .with_interval(Duration::from_millis(10))
        .with_buffer_capacity(2);
    let hub = BroadcastHub::new(capturer.boxed(), &config).unwrap();

    let mut slow = hub.subscribe().unwrap();
    let mut fast = hub.subscribe().unwrap();

    let mut seen = Vec::new();
    for _ in 0..10 {
        seen.push(next_capture(&mut fast).await);
    }
    let expected: Vec<u8> = (1..=10).collect();
    assert_eq!(seen, expected);

    // Ten events went by with a buffer of two.
    let first_slow = next_capture(&mut slow).await;
    assert!(first_slow > 1);
    assert!(hub.snapshot().subscriber_lag_drops > 0);
}

#[tokio::test]
async fn test_slow_capture_never_overlaps() {
    let (capturer, probe) = ScriptedCapturer::new(8, 8);
    let capturer = capturer.with_latency(Duration::from_millis(30));
    let config = SamplingConfig::default().with_interval(Duration::from_millis(5));
    let hub = BroadcastHub::new(capturer.boxed(), &config).unwrap();

    let mut subscription = hub.subscribe().unwrap();
    let window = Duration::from_millis(300);
    let _ = timeout(window, async {
        while subscription.next().await.is_some() {}
    })
    .await;

    assert_eq!(probe.max_in_flight(), 1);
    assert!(probe.calls() <= 300 / 30 + 2, "{} captures", probe.calls());
    assert!(hub.snapshot().ticks_coalesced > 0);
}

#[tokio::test]
async fn test_subscription_stream() {
    use futures_util::StreamExt;

    let (capturer, _probe) = ScriptedCapturer::new(8, 8);
    let hub = BroadcastHub::new(capturer.boxed(), &fast_config()).unwrap();

    let stream = hub.subscribe().unwrap().into_stream();
    let events: Vec<_> = timeout(Duration::from_secs(2), stream.take(3).collect())
        .await
        .unwrap();

    let captures: Vec<u8> = events.iter().map(|e| e.color().red).collect();
    assert_eq!(captures, vec![1, 2, 3]);
}
