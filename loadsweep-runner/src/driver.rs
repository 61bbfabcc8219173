use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use loadsweep_client::{ClientConfig, ResponsesClient};
use loadsweep_common::{
    LoadStats, LoadSweepError, PhaseSpec, RequestTemplate, Result, MIN_POOL_CONNECTIONS,
};

use crate::phase::{PhaseResult, PhaseRunner};
use crate::sink::MetricsSink;
use crate::stats::summarize;
use crate::transport::RequestSender;

/// Everything a run needs: target endpoint, payload, and the phase ladder.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub input: String,
    pub phases: Vec<PhaseSpec>,
    pub request_timeout: Duration,
}

impl DriverConfig {
    /// Reject configurations that cannot produce a meaningful run.
    fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(LoadSweepError::InvalidConfig(
                "phase list is empty".to_string(),
            ));
        }
        for spec in &self.phases {
            PhaseSpec::new(spec.target_rps, spec.duration_secs)?;
        }
        if self.request_timeout.is_zero() {
            return Err(LoadSweepError::InvalidConfig(
                "request timeout must be positive".to_string(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(LoadSweepError::InvalidConfig("base URL is empty".to_string()));
        }
        Ok(())
    }
}

/// Factory handing each phase a fresh transport with its own connection pool.
pub type SenderFactory = dyn Fn(&PhaseSpec) -> Result<Arc<dyn RequestSender>> + Send + Sync;

/// Completed run: per-phase results in order, a global summary over every
/// sample, and whether an interrupt cut the sweep short.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub phases: Vec<PhaseResult>,
    pub global: LoadStats,
    pub interrupted: bool,
}

/// Runs the configured phases sequentially and aggregates the global summary.
pub struct LoadTestDriver {
    config: DriverConfig,
    sink: Arc<MetricsSink>,
    cancel: CancellationToken,
    make_sender: Box<SenderFactory>,
}

impl LoadTestDriver {
    /// Build a driver that sends real HTTP requests to the configured
    /// endpoint; each phase gets a fresh client whose pool is sized
    /// `max(MIN_POOL_CONNECTIONS, 2 * target_rps)`. Fails fast on an invalid
    /// configuration, before any phase starts.
    pub fn new(config: DriverConfig) -> Result<Self> {
        let base_url = config.base_url.clone();
        let api_key = config.api_key.clone();
        let request_timeout = config.request_timeout;
        let make_sender: Box<SenderFactory> = Box::new(move |spec| {
            let client = ResponsesClient::new(ClientConfig {
                base_url: base_url.clone(),
                api_key: api_key.clone(),
                request_timeout,
                max_connections: MIN_POOL_CONNECTIONS.max(2 * spec.target_rps as usize),
            })?;
            Ok(Arc::new(client) as Arc<dyn RequestSender>)
        });
        Self::with_sender_factory(config, make_sender)
    }

    /// Build a driver around an arbitrary transport factory. Lets tests
    /// substitute mock senders; validation is identical to [`Self::new`].
    pub fn with_sender_factory(
        config: DriverConfig,
        make_sender: Box<SenderFactory>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sink: Arc::new(MetricsSink::new()),
            cancel: CancellationToken::new(),
            make_sender,
        })
    }

    /// Token that stops the sweep: new spawns cease immediately, in-flight
    /// units drain, and a partial report is still produced.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Read-only handle to the run's sample stream.
    pub fn sink(&self) -> Arc<MetricsSink> {
        Arc::clone(&self.sink)
    }

    /// Run every phase in order. Phases never overlap: each phase's drain
    /// completes before the next scheduler starts, so rate and latency
    /// attribution stay per-phase. A transport factory failure aborts the
    /// whole run; per-request failures are recorded as data and never abort
    /// anything.
    pub async fn run(&self) -> Result<RunReport> {
        let payload = Arc::new(RequestTemplate {
            model: self.config.model.clone(),
            input: self.config.input.clone(),
        });
        let started = Instant::now();
        let mut phases = Vec::with_capacity(self.config.phases.len());
        let mut interrupted = false;

        for (index, spec) in self.config.phases.iter().enumerate() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                warn!(
                    remaining = self.config.phases.len() - index,
                    "sweep interrupted; skipping remaining phases"
                );
                break;
            }
            let sender = (self.make_sender)(spec)?;
            let runner = PhaseRunner::new(
                index,
                *spec,
                sender,
                Arc::clone(&payload),
                Arc::clone(&self.sink),
                self.cancel.clone(),
            );
            phases.push(runner.run().await);
        }

        if self.cancel.is_cancelled() {
            interrupted = true;
        }

        let global = summarize(&self.sink.all(), started.elapsed());
        info!(
            phases = phases.len(),
            total_requests = global.requests_sent,
            interrupted,
            "sweep finished"
        );

        Ok(RunReport { phases, global, interrupted })
    }
}
