use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use loadsweep_common::{LoadStats, PhaseSpec, RequestTemplate};

use crate::issuer::RequestIssuer;
use crate::scheduler::RateScheduler;
use crate::sink::MetricsSink;
use crate::stats::summarize;
use crate::transport::RequestSender;

/// Summary of one completed (or interrupted) phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseResult {
    pub index: usize,
    pub spec: PhaseSpec,
    pub stats: LoadStats,
}

/// Runs a single phase: paces the spawns, drains every in-flight unit, and
/// summarizes the phase's slice of the sink.
///
/// The transport handle is scoped to the phase: the runner and its issuer
/// clones share it via `Arc`, the drain guarantees every clone is gone by the
/// time `run` returns, and the runner consumes itself, so the handle (and its
/// connection pool) is released on every exit path.
pub struct PhaseRunner {
    index: usize,
    spec: PhaseSpec,
    sender: Arc<dyn RequestSender>,
    payload: Arc<RequestTemplate>,
    sink: Arc<MetricsSink>,
    cancel: CancellationToken,
}

impl PhaseRunner {
    pub fn new(
        index: usize,
        spec: PhaseSpec,
        sender: Arc<dyn RequestSender>,
        payload: Arc<RequestTemplate>,
        sink: Arc<MetricsSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self { index, spec, sender, payload, sink, cancel }
    }

    /// Drive the phase to completion and summarize its samples. The reported
    /// duration spans first spawn through end of drain, and the achieved rate
    /// is computed over that same span.
    pub async fn run(self) -> PhaseResult {
        info!(
            phase = self.index,
            target_rps = self.spec.target_rps,
            duration_secs = self.spec.duration_secs,
            "phase starting"
        );
        let started = Instant::now();

        let issuer = RequestIssuer::new(
            self.index,
            Arc::clone(&self.sender),
            Arc::clone(&self.payload),
            Arc::clone(&self.sink),
        );
        let mut scheduler = RateScheduler::new(self.spec, self.cancel.clone());
        let outcome = scheduler
            .run(move || {
                let issuer = issuer.clone();
                async move { issuer.issue().await }
            })
            .await;

        let samples = self.sink.for_phase(self.index);
        let stats = summarize(&samples, started.elapsed());

        info!(
            phase = self.index,
            sent = stats.requests_sent,
            failed = stats.failed,
            achieved_rps = stats.achieved_rps,
            cancelled = outcome.cancelled,
            "phase complete"
        );

        PhaseResult { index: self.index, spec: self.spec, stats }
    }
}
