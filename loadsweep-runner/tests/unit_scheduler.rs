use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loadsweep_common::PhaseSpec;
use loadsweep_runner::scheduler::{RateScheduler, SchedulerState};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn spec(target_rps: u32, duration_secs: u32) -> PhaseSpec {
    PhaseSpec { target_rps, duration_secs }
}

#[tokio::test]
async fn test_spawns_exactly_rate_times_duration() {
    let completed = Arc::new(AtomicU64::new(0));
    let mut scheduler = RateScheduler::new(spec(50, 2), CancellationToken::new());

    let counter = Arc::clone(&completed);
    let started = Instant::now();
    let outcome = scheduler
        .run(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
    let elapsed = started.elapsed();

    // Exactly rate * duration units, no matter how fast they complete.
    assert_eq!(outcome.spawned, 100);
    assert!(!outcome.cancelled);
    assert_eq!(completed.load(Ordering::SeqCst), 100);
    assert_eq!(scheduler.state(), SchedulerState::Done);
    // Two one-second windows; allow slack for a loaded machine.
    assert!(elapsed >= Duration::from_millis(1900), "ran in {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3500), "ran in {elapsed:?}");
}

#[tokio::test]
async fn test_state_is_idle_before_and_done_after() {
    let scheduler = RateScheduler::new(spec(2, 1), CancellationToken::new());
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    let mut scheduler = scheduler;
    scheduler.run(|| async {}).await;
    assert_eq!(scheduler.state(), SchedulerState::Done);
}

#[tokio::test]
async fn test_cancellation_stops_spawns_but_drains_in_flight() {
    let finished = Arc::new(AtomicU64::new(0));
    let cancel = CancellationToken::new();
    let mut scheduler = RateScheduler::new(spec(5, 10), cancel.clone());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(450)).await;
            cancel.cancel();
        }
    });

    let counter = Arc::clone(&finished);
    let started = Instant::now();
    let outcome = scheduler
        .run(move || {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
    let elapsed = started.elapsed();

    assert!(outcome.cancelled);
    assert!(outcome.spawned >= 1, "nothing spawned before the cancel");
    assert!(outcome.spawned < 50, "cancellation did not stop the spawns");
    // The drain ran: every spawned unit finished before run() returned.
    assert_eq!(finished.load(Ordering::SeqCst), outcome.spawned);
    assert_eq!(scheduler.state(), SchedulerState::Done);
    // Nowhere near the full 10 second phase.
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
}

#[tokio::test]
async fn test_already_cancelled_token_spawns_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut scheduler = RateScheduler::new(spec(5, 5), cancel);

    let outcome = scheduler.run(|| async {}).await;

    assert_eq!(outcome.spawned, 0);
    assert!(outcome.cancelled);
    assert_eq!(scheduler.state(), SchedulerState::Done);
}

#[tokio::test]
async fn test_drain_waits_for_slow_units() {
    let finished = Arc::new(AtomicU64::new(0));
    let mut scheduler = RateScheduler::new(spec(3, 1), CancellationToken::new());

    let counter = Arc::clone(&finished);
    let outcome = scheduler
        .run(move || {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

    // run() only returns once every unit, including stragglers spawned late
    // in the window, has completed.
    assert_eq!(outcome.spawned, 3);
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}
