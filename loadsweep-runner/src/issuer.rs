use std::sync::Arc;
use std::time::Instant;

use loadsweep_common::{Outcome, RequestTemplate, Sample};

use crate::sink::MetricsSink;
use crate::transport::RequestSender;

/// Turns the transport into a timed, outcome-recording unit of work.
///
/// Every call to [`issue`](Self::issue) appends exactly one sample, success
/// or failure; a failing request never propagates past the unit that
/// issued it.
#[derive(Clone)]
pub struct RequestIssuer {
    phase: usize,
    sender: Arc<dyn RequestSender>,
    payload: Arc<RequestTemplate>,
    sink: Arc<MetricsSink>,
}

impl RequestIssuer {
    pub fn new(
        phase: usize,
        sender: Arc<dyn RequestSender>,
        payload: Arc<RequestTemplate>,
        sink: Arc<MetricsSink>,
    ) -> Self {
        Self { phase, sender, payload, sink }
    }

    /// Send one request, measure elapsed time to completion or failure, and
    /// record the outcome tagged with the issuing phase.
    pub async fn issue(&self) {
        let start = Instant::now();
        let outcome = match self.sender.send(&self.payload).await {
            Ok(status) => Outcome::Success { status },
            Err(err) => Outcome::Failure { error: err.to_string() },
        };
        let latency_ms = start.elapsed().as_secs_f64() * 1_000.0;
        self.sink.record(Sample { latency_ms, outcome, phase: self.phase });
    }
}
