use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use loadsweep_common::PhaseSpec;

const WINDOW: Duration = Duration::from_secs(1);

/// Lifecycle of one scheduler, visible through [`RateScheduler::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// Pacing inside the given one-second window (0-based).
    Running(u32),
    /// All spawns issued; waiting for in-flight units to finish.
    Draining,
    Done,
}

/// What one scheduler run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// Units actually spawned; equals the planned count unless cancelled.
    pub spawned: u64,
    /// True when cancellation cut the phase short.
    pub cancelled: bool,
}

/// Open-loop pacing engine for a single phase.
///
/// Each one-second window spawns exactly `target_rps` units spaced
/// `1 / target_rps` apart, then re-synchronizes to the window boundary: a
/// fast window sleeps out the remainder, an overrun window rolls straight
/// into the next one without backfilling the missed ticks. Spawning hands
/// the unit to the runtime and never waits on it; unit completion is only
/// awaited in the drain, after the last window.
///
/// Pacing accuracy degrades in the thousands-per-second range because the
/// per-spawn overhead accumulates; the scheduler does not burst to catch up.
pub struct RateScheduler {
    spec: PhaseSpec,
    cancel: CancellationToken,
    state: SchedulerState,
}

impl RateScheduler {
    pub fn new(spec: PhaseSpec, cancel: CancellationToken) -> Self {
        Self { spec, cancel, state: SchedulerState::Idle }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run the pacing loop, spawning one unit per tick, then drain.
    ///
    /// Cancellation stops new spawns immediately (checked before every spawn,
    /// and every sleep is interruptible), but the drain always runs to
    /// completion so that every spawned unit gets to record its sample.
    pub async fn run<F, Fut>(&mut self, mut unit: F) -> ScheduleOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let inter_arrival = WINDOW.div_f64(self.spec.target_rps as f64);
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut spawned: u64 = 0;
        let mut cancelled = false;

        'windows: for window in 0..self.spec.duration_secs {
            self.state = SchedulerState::Running(window);
            let window_start = Instant::now();

            for _ in 0..self.spec.target_rps {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break 'windows;
                }
                tasks.spawn(unit());
                spawned += 1;
                if self.pause(inter_arrival).await {
                    cancelled = true;
                    break 'windows;
                }
            }

            let elapsed = window_start.elapsed();
            if elapsed < WINDOW {
                // Re-synchronize to the one-second boundary.
                if self.pause(WINDOW - elapsed).await {
                    cancelled = true;
                    break 'windows;
                }
            } else if elapsed > WINDOW {
                debug!(
                    window,
                    overrun_ms = (elapsed - WINDOW).as_millis() as u64,
                    "window overran; continuing without backfill"
                );
            }

            // Reap finished units so the outstanding set tracks in-flight
            // work instead of growing with every spawn.
            while tasks.try_join_next().is_some() {}
        }

        self.state = SchedulerState::Draining;
        debug!(spawned, in_flight = tasks.len(), "draining in-flight units");
        while tasks.join_next().await.is_some() {}
        self.state = SchedulerState::Done;

        ScheduleOutcome { spawned, cancelled }
    }

    /// Sleep for `duration` unless cancellation arrives first; returns true
    /// once cancelled.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.cancel.cancelled() => true,
        }
    }
}
