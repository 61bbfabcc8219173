use std::sync::{Mutex, MutexGuard};

use loadsweep_common::Sample;

/// Append-only collector shared by every in-flight request unit.
///
/// The lock is held only for the push or the copy-out, never across an await,
/// so concurrent units cannot lose or duplicate records. Append order follows
/// completion order, which may differ from issue order across concurrent
/// units: `for_phase` gives exact per-phase attribution via the tag each
/// sample carries, while `last` keeps the tail-slice view of the stream.
#[derive(Debug, Default)]
pub struct MetricsSink {
    samples: Mutex<Vec<Sample>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample. Safe to call from any number of units at once.
    pub fn record(&self, sample: Sample) {
        self.locked().push(sample);
    }

    /// The most recently appended `n` samples, or fewer if the sink holds
    /// fewer than `n` in total.
    pub fn last(&self, n: usize) -> Vec<Sample> {
        let samples = self.locked();
        let start = samples.len().saturating_sub(n);
        samples[start..].to_vec()
    }

    /// Every sample recorded so far, in append order.
    pub fn all(&self) -> Vec<Sample> {
        self.locked().clone()
    }

    /// Samples tagged with the given phase index, in append order.
    pub fn for_phase(&self, phase: usize) -> Vec<Sample> {
        self.locked().iter().filter(|s| s.phase == phase).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locked(&self) -> MutexGuard<'_, Vec<Sample>> {
        self.samples.lock().expect("metrics sink lock poisoned")
    }
}
