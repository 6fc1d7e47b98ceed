//! End-to-end relay runs over in-memory queues
//!
//! Time is paused so long polls and idle windows elapse instantly.

use sqspipe_core::application::{RelayConfig, RelayController, ShutdownReason, StartOutcome};
use sqspipe_core::port::queue_client::mocks::InMemoryQueue;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn relay(
    source: &Arc<InMemoryQueue>,
    destination: &Arc<InMemoryQueue>,
    workers: usize,
    max_idle: Duration,
) -> RelayController {
    RelayController::new(
        source.clone(),
        destination.clone(),
        RelayConfig::new(workers, max_idle),
    )
    .with_interrupt(std::future::pending())
}

/// Drain: every message arrives exactly once and the run completes
#[tokio::test(start_paused = true)]
async fn test_drain_relays_every_message() {
    let source = Arc::new(InMemoryQueue::with_messages("orders-dlq", 25));
    let destination = Arc::new(InMemoryQueue::new("orders"));
    let mut relay = relay(&source, &destination, 2, Duration::from_secs(60));

    assert_eq!(relay.start().await.unwrap(), StartOutcome::Started);
    let summary = relay.wait().await;

    assert_eq!(summary.stop_reason, ShutdownReason::Completed);
    assert_eq!(summary.remaining, 0);
    assert_eq!(summary.relayed, 25);
    assert_eq!(summary.workers.len(), 2);
    assert_eq!(
        summary.workers.iter().map(|w| w.relayed).sum::<u64>(),
        25
    );

    let bodies: HashSet<String> = destination.bodies().into_iter().collect();
    assert_eq!(destination.visible_len(), 25);
    assert_eq!(bodies.len(), 25);
    assert!(bodies.contains("message-0"));
    assert!(bodies.contains("message-24"));
    assert_eq!(source.visible_len() + source.in_flight_len(), 0);
    assert_eq!(source.deleted().len(), 25);
}

/// Empty source: nothing is started and no message is touched
#[tokio::test(start_paused = true)]
async fn test_empty_source_exits_immediately() {
    let source = Arc::new(InMemoryQueue::new("orders-dlq"));
    let destination = Arc::new(InMemoryQueue::new("orders"));
    let mut relay = relay(&source, &destination, 4, Duration::from_secs(60));

    assert_eq!(relay.start().await.unwrap(), StartOutcome::Empty);
    assert!(relay.is_done());

    let summary = relay.wait().await;
    assert!(summary.workers.is_empty());
    assert_eq!(source.calls().receive, 0);
    assert_eq!(destination.calls().send, 0);
}

/// Partial send: only confirmed messages are deleted; the rest come back
/// after the visibility timeout and are relayed on a later round
#[tokio::test(start_paused = true)]
async fn test_partial_send_redelivers_rejected_entries() {
    let source = Arc::new(InMemoryQueue::with_messages("orders-dlq", 10));
    let destination = Arc::new(InMemoryQueue::new("orders"));
    destination.reject_next_send_entries(3);
    let mut relay = relay(&source, &destination, 1, Duration::from_secs(60));

    relay.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(relay.remaining(), 3);
    assert_eq!(source.deleted().len(), 7);
    assert_eq!(source.in_flight_len(), 3);

    let summary = relay.wait().await;
    assert_eq!(summary.stop_reason, ShutdownReason::Completed);
    assert_eq!(summary.remaining, 0);
    assert_eq!(summary.relayed, 10);

    let bodies: HashSet<String> = destination.bodies().into_iter().collect();
    assert_eq!(destination.visible_len(), 10);
    assert_eq!(bodies.len(), 10);
}

/// Idle timeout fires once, just after the window, and later signals are no-ops
#[tokio::test(start_paused = true)]
async fn test_idle_timeout_stops_relay() {
    let source = Arc::new(InMemoryQueue::new("orders-dlq"));
    source.set_approximate_count(Some(5));
    let destination = Arc::new(InMemoryQueue::new("orders"));
    let max_idle = Duration::from_secs(5);
    let mut relay = relay(&source, &destination, 2, max_idle);
    let shutdown = relay.shutdown_handle();

    let started = Instant::now();
    relay.start().await.unwrap();
    let summary = relay.wait().await;
    let elapsed = started.elapsed();

    assert_eq!(summary.stop_reason, ShutdownReason::IdleTimeout);
    assert!(elapsed >= max_idle);
    assert!(elapsed < max_idle + Duration::from_secs(1));
    assert_eq!(summary.remaining, 5);
    assert_eq!(summary.relayed, 0);

    assert!(!shutdown.shutdown(ShutdownReason::Interrupt));
    assert_eq!(shutdown.token().reason(), Some(ShutdownReason::IdleTimeout));
}

/// Activity keeps pushing the idle deadline out
#[tokio::test(start_paused = true)]
async fn test_steady_traffic_keeps_relay_alive() {
    let source = Arc::new(InMemoryQueue::new("orders-dlq"));
    source.set_approximate_count(Some(100));
    let destination = Arc::new(InMemoryQueue::new("orders"));
    let mut relay = relay(&source, &destination, 1, Duration::from_secs(5));

    relay.start().await.unwrap();
    let feeder = {
        let source = source.clone();
        tokio::spawn(async move {
            for i in 0..6 {
                tokio::time::sleep(Duration::from_secs(3)).await;
                source.push(format!("late-{i}"));
            }
        })
    };

    let started = Instant::now();
    let summary = relay.wait().await;
    feeder.await.unwrap();

    assert_eq!(summary.stop_reason, ShutdownReason::IdleTimeout);
    assert_eq!(summary.relayed, 6);
    assert_eq!(summary.remaining, 94);
    // Last message at 18s, then one idle window
    assert!(started.elapsed() >= Duration::from_secs(23));
    assert_eq!(destination.visible_len(), 6);
}

/// External interrupt ends the run without waiting out the long poll
#[tokio::test(start_paused = true)]
async fn test_interrupt_ends_long_poll() {
    let source = Arc::new(InMemoryQueue::new("orders-dlq"));
    source.set_approximate_count(Some(40));
    let destination = Arc::new(InMemoryQueue::new("orders"));
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let mut relay = RelayController::new(
        source.clone(),
        destination,
        RelayConfig::new(3, Duration::from_secs(60)),
    )
    .with_interrupt(async move {
        let _ = rx.await;
    });
    relay.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    tx.send(()).unwrap();

    let started = Instant::now();
    let summary = relay.wait().await;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(summary.stop_reason, ShutdownReason::Interrupt);
    assert_eq!(summary.remaining, 40);
    assert_eq!(source.calls().receive, 3);
}
